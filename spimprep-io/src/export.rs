//! Export pass: assemble, normalize, and write every stack.

use crate::writer::write_volume;
use crate::Result;
use spimprep_core::{assemble, normalize, Calibration, CropRect, PlaneSource, Side, StackLayout};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Options for one export pass.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Crop rectangle applied to every plane.
    pub crop: CropRect,
    /// Timepoints to export; 0 selects the acquired timepoint count.
    pub timepoints: u32,
    /// Acquisition position. Single-position acquisitions use 0.
    pub position: u32,
}

/// Record of one written stack, tagged at write time so the renaming pass
/// never has to re-derive channel or angle from path text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    /// Where the exporter wrote the stack.
    pub path: PathBuf,
    /// Camera side the stack was acquired on.
    pub side: Side,
    /// 1-based logical channel.
    pub channel: u32,
    /// Timepoint index.
    pub timepoint: u32,
}

/// Every stack written by one export pass, plus the tree it lives in.
#[derive(Debug, Clone)]
pub struct StackManifest {
    /// The `MVR_STACKS` directory holding the exported tree.
    pub stacks_dir: PathBuf,
    /// Written stacks in export order.
    pub entries: Vec<StackEntry>,
}

/// Writes the timepoint count marker downstream tools poll.
///
/// The file name and its content are both the decimal count; the file is
/// flushed to disk before any stack is written.
fn write_timepoint_count(series_dir: &Path, count: u32) -> Result<()> {
    let path = series_dir.join(count.to_string());
    let mut file = fs::File::create(path)?;
    file.write_all(count.to_string().as_bytes())?;
    file.sync_all()?;
    Ok(())
}

/// Drives the full export: plan the layout, create its directories, record
/// the timepoint count, then assemble/normalize/write one stack per
/// (channel, timepoint) pair in deterministic order.
///
/// Emits one progress line per written stack.
///
/// # Errors
/// Fails fast on the first metadata, decode, or filesystem error. No
/// partial-file cleanup is performed; a partially written tree is the
/// expected failure artifact and a rerun starts from scratch.
pub fn export<S: PlaneSource>(
    source: &mut S,
    series_dir: &Path,
    options: &ExportOptions,
    calibration: Option<&Calibration>,
) -> Result<StackManifest> {
    let metadata = source.metadata().clone();
    let layout = StackLayout::new(&metadata, series_dir)?;

    let num_timepoints = if options.timepoints == 0 {
        source.last_acquired_timepoint()
    } else {
        options.timepoints
    };

    for dir in layout.directories() {
        fs::create_dir_all(dir)?;
    }
    write_timepoint_count(series_dir, num_timepoints)?;

    let mut entries =
        Vec::with_capacity(metadata.channel_count as usize * num_timepoints as usize);
    for channel in 0..metadata.channel_count {
        let target = &layout.targets()[channel as usize];
        for timepoint in 0..num_timepoints {
            let volume = assemble(source, channel, timepoint, options.position, options.crop)?;
            let volume = normalize(volume)?;
            let path = target
                .directory
                .join(StackLayout::stack_file_name(target.side, timepoint));
            write_volume(&path, &volume, calibration)?;
            println!("Saved {}", path.display());
            entries.push(StackEntry {
                path,
                side: target.side,
                channel: target.logical_channel,
                timepoint,
            });
        }
    }

    Ok(StackManifest {
        stacks_dir: layout.stacks_dir().to_path_buf(),
        entries,
    })
}
