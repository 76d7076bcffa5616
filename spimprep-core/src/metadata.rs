//! Acquisition metadata and side/channel addressing.

use crate::error::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two detection arms of a dual-view light-sheet microscope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    /// Arm A.
    A,
    /// Arm B.
    B,
}

impl Side {
    /// Returns the opposite arm.
    #[inline]
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Registration angle convention: side A is the 90 degree view.
    #[inline]
    #[must_use]
    pub fn angle(self) -> u32 {
        match self {
            Side::A => 90,
            Side::B => 0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// Immutable description of one acquisition, read once at the system boundary.
///
/// All later pipeline stages work on these typed fields; nothing downstream
/// goes back to the raw key/value metadata of the container format.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AcquisitionMetadata {
    /// Number of interleaved channels (sides x dyes).
    pub channel_count: u32,
    /// Number of z slices per volume.
    pub slice_count: u32,
    /// Number of camera sides (1 or 2).
    pub side_count: u32,
    /// Side acquired by channel 0.
    pub first_side: Side,
    /// Per-channel display names, e.g. "488-GFP".
    pub channel_names: Vec<String>,
    /// Number of timepoints actually acquired.
    pub last_acquired_timepoint: u32,
}

impl AcquisitionMetadata {
    /// Validates and builds the metadata record.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMetadata`] for an unsupported side count, a
    /// channel count the side count does not divide, or a channel name list
    /// that does not cover every channel when dye labels are in use.
    pub fn new(
        channel_count: u32,
        slice_count: u32,
        side_count: u32,
        first_side: Side,
        channel_names: Vec<String>,
        last_acquired_timepoint: u32,
    ) -> Result<Self> {
        let metadata = Self {
            channel_count,
            slice_count,
            side_count,
            first_side,
            channel_names,
            last_acquired_timepoint,
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Checks the invariants the rest of the pipeline relies on.
    ///
    /// # Errors
    /// See [`AcquisitionMetadata::new`].
    pub fn validate(&self) -> Result<()> {
        if self.side_count != 1 && self.side_count != 2 {
            return Err(Error::InvalidMetadata {
                reason: format!("unsupported side count {}", self.side_count),
            });
        }
        if self.channel_count == 0 {
            return Err(Error::InvalidMetadata {
                reason: "acquisition has no channels".to_owned(),
            });
        }
        if self.channel_count % self.side_count != 0 {
            return Err(Error::InvalidMetadata {
                reason: format!(
                    "side count {} does not divide channel count {}",
                    self.side_count, self.channel_count
                ),
            });
        }
        if self.uses_channels() && self.channel_names.len() != self.channel_count as usize {
            return Err(Error::InvalidMetadata {
                reason: format!(
                    "{} channel names for {} channels",
                    self.channel_names.len(),
                    self.channel_count
                ),
            });
        }
        Ok(())
    }

    /// True when channels multiplex more than one dye with the sides.
    #[inline]
    #[must_use]
    pub fn uses_channels(&self) -> bool {
        self.channel_count / self.side_count > 1
    }

    /// Side acquired by the given channel index.
    #[inline]
    #[must_use]
    pub fn side_of(&self, channel: u32) -> Side {
        if channel % self.side_count == 0 {
            self.first_side
        } else {
            self.first_side.other()
        }
    }

    /// 1-based logical channel used by the registration naming convention.
    ///
    /// Channels interleave side fastest, so this is the dye index plus one.
    #[inline]
    #[must_use]
    pub fn logical_channel(&self, channel: u32) -> u32 {
        channel / self.side_count + 1
    }

    /// Dye label for a channel: the display name with the excitation prefix
    /// (text up to and including the first `-`) stripped. A name without a
    /// separator is used whole.
    #[must_use]
    pub fn dye_label(&self, channel: u32) -> &str {
        let name = self
            .channel_names
            .get(channel as usize)
            .map_or("", String::as_str);
        name.split_once('-').map_or(name, |(_, dye)| dye)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual_view() -> AcquisitionMetadata {
        AcquisitionMetadata::new(
            4,
            50,
            2,
            Side::A,
            vec![
                "488-GFP".to_owned(),
                "488-GFP".to_owned(),
                "561-mCherry".to_owned(),
                "561-mCherry".to_owned(),
            ],
            100,
        )
        .unwrap()
    }

    #[test]
    fn test_sides_alternate_by_channel_index() {
        let metadata = dual_view();
        assert_eq!(metadata.side_of(0), Side::A);
        assert_eq!(metadata.side_of(1), Side::B);
        assert_eq!(metadata.side_of(2), Side::A);
        assert_eq!(metadata.side_of(3), Side::B);
    }

    #[test]
    fn test_first_side_b_flips_assignment() {
        let metadata = AcquisitionMetadata::new(
            2,
            10,
            2,
            Side::B,
            vec![],
            5,
        )
        .unwrap();
        assert_eq!(metadata.side_of(0), Side::B);
        assert_eq!(metadata.side_of(1), Side::A);
    }

    #[test]
    fn test_unsupported_side_count_rejected() {
        let result = AcquisitionMetadata::new(4, 10, 3, Side::A, vec![], 5);
        assert!(matches!(result, Err(Error::InvalidMetadata { .. })));
    }

    #[test]
    fn test_indivisible_channel_count_rejected() {
        let result = AcquisitionMetadata::new(3, 10, 2, Side::A, vec![], 5);
        assert!(matches!(result, Err(Error::InvalidMetadata { .. })));
    }

    #[test]
    fn test_uses_channels_flag() {
        assert!(dual_view().uses_channels());
        let single_dye =
            AcquisitionMetadata::new(2, 10, 2, Side::A, vec![], 5).unwrap();
        assert!(!single_dye.uses_channels());
    }

    #[test]
    fn test_logical_channel_is_dye_index_plus_one() {
        let metadata = dual_view();
        assert_eq!(metadata.logical_channel(0), 1);
        assert_eq!(metadata.logical_channel(1), 1);
        assert_eq!(metadata.logical_channel(2), 2);
        assert_eq!(metadata.logical_channel(3), 2);
    }

    #[test]
    fn test_dye_label_strips_excitation_prefix() {
        let metadata = dual_view();
        assert_eq!(metadata.dye_label(0), "GFP");
        assert_eq!(metadata.dye_label(2), "mCherry");
    }

    #[test]
    fn test_dye_label_without_separator_used_whole() {
        let metadata = AcquisitionMetadata::new(
            2,
            10,
            1,
            Side::A,
            vec!["GFP".to_owned(), "mCherry".to_owned()],
            5,
        )
        .unwrap();
        assert_eq!(metadata.dye_label(0), "GFP");
        assert_eq!(metadata.dye_label(1), "mCherry");
    }

    #[test]
    fn test_side_angles() {
        assert_eq!(Side::A.angle(), 90);
        assert_eq!(Side::B.angle(), 0);
    }
}
