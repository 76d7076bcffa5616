//! Multi-page stack writer.

use crate::Result;
use spimprep_core::{Calibration, Volume};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::colortype::Gray16;
use tiff::encoder::{Rational, TiffEncoder};
use tiff::tags::ResolutionUnit;

fn resolution_unit(raw: u16) -> ResolutionUnit {
    match raw {
        2 => ResolutionUnit::Inch,
        3 => ResolutionUnit::Centimeter,
        _ => ResolutionUnit::None,
    }
}

/// Writes one volume as a multi-page 16-bit grayscale TIFF.
///
/// One page per slice, in slice order. Calibration, when present, is copied
/// onto every page.
///
/// # Errors
/// Returns an error when the file cannot be created or a page cannot be
/// encoded.
pub fn write_volume(path: &Path, volume: &Volume, calibration: Option<&Calibration>) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(file)?;
    for plane in volume.planes() {
        let mut image = encoder.new_image::<Gray16>(plane.width(), plane.height())?;
        if let Some(calibration) = calibration {
            image.x_resolution(Rational {
                n: calibration.x_resolution.0,
                d: calibration.x_resolution.1,
            });
            image.y_resolution(Rational {
                n: calibration.y_resolution.0,
                d: calibration.y_resolution.1,
            });
            image.resolution_unit(resolution_unit(calibration.resolution_unit));
        }
        image.write_data(plane.pixels())?;
    }
    Ok(())
}
