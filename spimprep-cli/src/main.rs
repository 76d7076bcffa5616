//!
//! Command-line splitter for packed diSPIM acquisition series.
#![allow(clippy::uninlined_format_args)]

use clap::Parser;
use spimprep_core::CropRect;
use spimprep_io::{
    acquisition_path, export, finalize, prepare_series_dir, ExportOptions, OmeTiffSource,
};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    SpimprepIo(#[from] spimprep_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] spimprep_core::Error),
}

/// Splits a packed diSPIM acquisition into registration-ready stacks.
///
/// The series directory is reshuffled so the raw files live under OMES/,
/// every (channel, timepoint) pair is cropped, background-subtracted and
/// written as its own 3-D stack, and the finished tree is renamed into the
/// flat spim_TL{t}_Channel{c}_Angle{a}.tif convention.
#[derive(Parser)]
#[command(name = "spimprep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Acquisition series directory
    series_dir: PathBuf,

    /// Crop origin x in source-plane pixels
    x: u32,

    /// Crop origin y in source-plane pixels
    y: u32,

    /// Crop width in pixels
    width: u32,

    /// Crop height in pixels
    height: u32,

    /// Timepoints to export (auto-detected when omitted)
    timepoints: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let start = Instant::now();

    prepare_series_dir(&cli.series_dir)?;
    let mut source = OmeTiffSource::open(acquisition_path(&cli.series_dir))?;
    let calibration = source.calibration().copied();

    let options = ExportOptions {
        crop: CropRect {
            x: cli.x,
            y: cli.y,
            width: cli.width,
            height: cli.height,
        },
        timepoints: cli.timepoints.unwrap_or(0),
        position: 0,
    };

    let manifest = export(&mut source, &cli.series_dir, &options, calibration.as_ref())?;
    let canonical = finalize(&manifest)?;

    println!(
        "Exported {} stacks in {:.2}s",
        canonical.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
