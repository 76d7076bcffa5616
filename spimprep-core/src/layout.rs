//! Output directory and naming scheme derived from acquisition metadata.

use crate::error::Result;
use crate::metadata::{AcquisitionMetadata, Side};
use std::path::{Path, PathBuf};

/// Directory holding all registration input stacks, under the series
/// directory.
pub const STACKS_DIR_NAME: &str = "MVR_STACKS";

/// Where one channel's stacks go, tagged with the labels the renaming pass
/// needs so nothing is ever re-derived from path text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTarget {
    /// Camera side this channel was acquired on.
    pub side: Side,
    /// 1-based logical channel for the registration naming convention.
    pub logical_channel: u32,
    /// Directory the exporter writes this channel's stacks into.
    pub directory: PathBuf,
}

/// Maps every channel index of an acquisition to its output target.
///
/// With multiple dyes the tree is `MVR_STACKS/SPIM{side}/{dye}`; with a
/// single dye the channels only encode sides and the dye level is omitted.
#[derive(Debug, Clone)]
pub struct StackLayout {
    stacks_dir: PathBuf,
    targets: Vec<StackTarget>,
}

impl StackLayout {
    /// Plans the output tree for one acquisition.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidMetadata`] when the metadata fails
    /// validation, before anything is created on disk.
    pub fn new(metadata: &AcquisitionMetadata, base_dir: &Path) -> Result<Self> {
        metadata.validate()?;

        let stacks_dir = base_dir.join(STACKS_DIR_NAME);
        let uses_channels = metadata.uses_channels();
        let mut targets = Vec::with_capacity(metadata.channel_count as usize);
        for channel in 0..metadata.channel_count {
            let side = metadata.side_of(channel);
            let mut directory = stacks_dir.join(format!("SPIM{side}"));
            if uses_channels {
                directory.push(metadata.dye_label(channel));
            }
            targets.push(StackTarget {
                side,
                logical_channel: metadata.logical_channel(channel),
                directory,
            });
        }
        Ok(Self {
            stacks_dir,
            targets,
        })
    }

    /// The `MVR_STACKS` directory this layout lives under.
    #[must_use]
    pub fn stacks_dir(&self) -> &Path {
        &self.stacks_dir
    }

    /// Output targets in channel order.
    #[must_use]
    pub fn targets(&self) -> &[StackTarget] {
        &self.targets
    }

    /// Distinct output directories, in first-use order.
    #[must_use]
    pub fn directories(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            if !dirs.contains(&target.directory.as_path()) {
                dirs.push(&target.directory);
            }
        }
        dirs
    }

    /// Intermediate stack file name, e.g. `SPIMA-37.tif`.
    #[must_use]
    pub fn stack_file_name(side: Side, timepoint: u32) -> String {
        format!("SPIM{side}-{timepoint}.tif")
    }

    /// Canonical registration file name, e.g. `spim_TL37_Channel2_Angle90.tif`.
    #[must_use]
    pub fn canonical_file_name(timepoint: u32, channel: u32, angle: u32) -> String {
        format!("spim_TL{timepoint}_Channel{channel}_Angle{angle}.tif")
    }
}
