//! Canonical renaming of exported stacks.
//!
//! Downstream registration expects every stack in one flat directory named
//! `spim_TL{t}_Channel{c}_Angle{a}.tif`. The exporter's manifest carries the
//! side/channel/timepoint tags, so the primary path here never parses them
//! back out of file names; [`scan`] exists to adopt trees written without a
//! manifest.

use crate::export::{StackEntry, StackManifest};
use crate::{Error, Result};
use spimprep_core::{Side, StackLayout};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Dye directory names, in logical channel order.
const DYE_DIR_NAMES: [&str; 2] = ["GFP", "mCherry"];
/// Legacy index-named directory names, in logical channel order.
const OUTPUT_DIR_NAMES: [&str; 2] = ["output 6 only", "output 7 only"];

fn remove_dir_if_empty(dir: &Path) -> Result<()> {
    match fs::remove_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Moves every manifest entry to its canonical registration name and drops
/// the drained side/dye directories. Returns the canonical paths in manifest
/// order.
///
/// # Errors
/// Fails on the first rename that cannot be performed; already-moved files
/// stay moved.
pub fn finalize(manifest: &StackManifest) -> Result<Vec<PathBuf>> {
    let mut canonical = Vec::with_capacity(manifest.entries.len());
    let mut drained: Vec<PathBuf> = Vec::new();

    for entry in &manifest.entries {
        let name =
            StackLayout::canonical_file_name(entry.timepoint, entry.channel, entry.side.angle());
        let target = manifest.stacks_dir.join(name);
        fs::rename(&entry.path, &target)?;
        if let Some(parent) = entry.path.parent() {
            if !drained.iter().any(|d| d == parent) {
                drained.push(parent.to_path_buf());
            }
        }
        canonical.push(target);
    }

    // Dye directories first, then their side parents once both dyes are gone.
    for dir in &drained {
        remove_dir_if_empty(dir)?;
        if let Some(parent) = dir.parent() {
            if parent != manifest.stacks_dir {
                remove_dir_if_empty(parent)?;
            }
        }
    }

    Ok(canonical)
}

fn sorted_listing(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            Error::LayoutMismatch(format!("missing directory {}", dir.display()))
        } else {
            e.into()
        }
    })?;
    let mut names = Vec::new();
    for entry in entries {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Picks the channel directory convention from the first listed entry.
fn channel_dir_names(side_dir: &Path) -> Result<[&'static str; 2]> {
    let listing = sorted_listing(side_dir)?;
    let first = listing.first().ok_or_else(|| {
        Error::LayoutMismatch(format!("side directory {} is empty", side_dir.display()))
    })?;
    if first.contains("output") {
        Ok(OUTPUT_DIR_NAMES)
    } else if DYE_DIR_NAMES.contains(&first.as_str()) {
        Ok(DYE_DIR_NAMES)
    } else {
        Err(Error::LayoutMismatch(format!(
            "unexpected entry {first:?} in side directory {}",
            side_dir.display()
        )))
    }
}

fn parse_timepoint(name: &str, side: Side) -> Result<u32> {
    let prefix = format!("SPIM{side}-");
    name.strip_prefix(&prefix)
        .and_then(|rest| rest.strip_suffix(".tif"))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| Error::LayoutMismatch(format!("unexpected stack file name {name:?}")))
}

/// Rebuilds a manifest from a tree written without one.
///
/// Each side directory must hold exactly the dye pair (`GFP`/`mCherry`) or
/// the legacy index pair (`output 6 only`/`output 7 only`), mapped to
/// logical channels 1 and 2. The result feeds [`finalize`] like any other
/// manifest.
///
/// # Errors
/// Returns [`Error::LayoutMismatch`] when a side directory is missing or
/// empty, its first entry is not a recognized channel directory, or a stack
/// file name cannot be parsed.
pub fn scan(stacks_dir: &Path) -> Result<StackManifest> {
    let mut entries = Vec::new();
    for side in [Side::A, Side::B] {
        let side_dir = stacks_dir.join(format!("SPIM{side}"));
        let channel_dirs = channel_dir_names(&side_dir)?;
        for (channel, dir_name) in (1u32..).zip(channel_dirs.iter()) {
            let channel_dir = side_dir.join(dir_name);
            for file_name in sorted_listing(&channel_dir)? {
                let timepoint = parse_timepoint(&file_name, side)?;
                entries.push(StackEntry {
                    path: channel_dir.join(&file_name),
                    side,
                    channel,
                    timepoint,
                });
            }
        }
    }
    Ok(StackManifest {
        stacks_dir: stacks_dir.to_path_buf(),
        entries,
    })
}
