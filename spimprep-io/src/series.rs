//! Series directory preparation.

use crate::reader::ACQUISITION_FILE_NAME;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory the raw acquisition files are parked in.
pub const OME_DIR_NAME: &str = "OMES";

/// Moves every pre-existing entry of the series directory into `OMES/`.
///
/// Skipped entirely when `OMES/` already exists, so re-running the tool over
/// a prepared series directory changes nothing. Returns the `OMES/` path.
///
/// # Errors
/// Returns an error when the directory cannot be listed or an entry cannot
/// be moved.
pub fn prepare_series_dir(series_dir: &Path) -> Result<PathBuf> {
    let ome_dir = series_dir.join(OME_DIR_NAME);
    if ome_dir.exists() {
        return Ok(ome_dir);
    }

    // Snapshot the listing before creating OMES so it never contains itself.
    let entries: Vec<fs::DirEntry> =
        fs::read_dir(series_dir)?.collect::<std::io::Result<Vec<_>>>()?;
    fs::create_dir(&ome_dir)?;
    for entry in entries {
        fs::rename(entry.path(), ome_dir.join(entry.file_name()))?;
    }
    Ok(ome_dir)
}

/// Path of the packed acquisition inside a prepared series directory.
#[must_use]
pub fn acquisition_path(series_dir: &Path) -> PathBuf {
    series_dir.join(OME_DIR_NAME).join(ACQUISITION_FILE_NAME)
}
