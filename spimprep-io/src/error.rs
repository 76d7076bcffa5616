//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF codec error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Malformed or missing acquisition metadata.
    #[error("metadata read error: {0}")]
    MetadataRead(String),

    /// Acquisition layout the reader cannot address.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Output tree does not match the expected side/channel shape.
    #[error("layout mismatch: {0}")]
    LayoutMismatch(String),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] spimprep_core::Error),
}
