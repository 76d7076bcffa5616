//! spimprep-io: Acquisition decoding and stack output for spimprep.
//!
//! This crate owns every filesystem-facing piece of the pipeline: the
//! memory-mapped OME-TIFF plane source, series directory preparation, the
//! export pass, the multi-page stack writer, and the canonical renaming of
//! the finished tree.
//!

mod error;
pub mod export;
pub mod reader;
pub mod rename;
pub mod series;
pub mod writer;

pub use error::{Error, Result};
pub use export::{export, ExportOptions, StackEntry, StackManifest};
pub use reader::{MappedFileReader, OmeTiffSource, ACQUISITION_FILE_NAME};
pub use rename::{finalize, scan};
pub use series::{acquisition_path, prepare_series_dir, OME_DIR_NAME};
pub use writer::write_volume;
