//! Error types for spimprep-core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for acquisition splitting.
#[derive(Error, Debug)]
pub enum Error {
    /// Metadata describes an acquisition this pipeline cannot process.
    #[error("invalid metadata: {reason}")]
    InvalidMetadata {
        /// What made the metadata unusable.
        reason: String,
    },

    /// Crop rectangle extends outside the source plane.
    #[error(
        "invalid crop: {width}x{height}+{x}+{y} does not fit inside a \
         {plane_width}x{plane_height} plane"
    )]
    InvalidCrop {
        /// Crop origin x.
        x: u32,
        /// Crop origin y.
        y: u32,
        /// Crop width.
        width: u32,
        /// Crop height.
        height: u32,
        /// Source plane width.
        plane_width: u32,
        /// Source plane height.
        plane_height: u32,
    },

    /// Pixel buffer length does not match the stated plane dimensions.
    #[error("pixel count mismatch: expected {expected}, got {got}")]
    PixelCount {
        /// width * height of the plane.
        expected: usize,
        /// Length of the supplied buffer.
        got: usize,
    },

    /// Plane dimensions do not match the volume they are stacked into.
    #[error(
        "plane shape {got_width}x{got_height} does not match volume \
         {expected_width}x{expected_height}"
    )]
    ShapeMismatch {
        /// Volume width.
        expected_width: u32,
        /// Volume height.
        expected_height: u32,
        /// Plane width.
        got_width: u32,
        /// Plane height.
        got_height: u32,
    },

    /// Plane source failure (decode or metadata access).
    #[error("plane source error: {0}")]
    Source(String),
}
