//! Memory-mapped OME-TIFF plane source.
//!

use crate::{Error, Result};
use memmap2::Mmap;
use serde::Deserialize;
use spimprep_core::{AcquisitionMetadata, Calibration, Plane, PlaneSource, Side};
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;

/// File name the acquisition software uses for the first position.
pub const ACQUISITION_FILE_NAME: &str = "MMStack_Pos0.ome.tif";

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire
/// acquisition into memory.
pub struct MappedFileReader {
    mmap: Arc<Mmap>,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap: Arc::new(mmap),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn into_shared(self) -> SharedMmap {
        SharedMmap(self.mmap)
    }
}

#[derive(Clone)]
struct SharedMmap(Arc<Mmap>);

impl AsRef<[u8]> for SharedMmap {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

/// Raw summary metadata as stored in the acquisition container.
///
/// The container keeps these as loosely typed JSON; conversion into
/// [`AcquisitionMetadata`] is the single point where they become typed and
/// validated.
#[derive(Debug, Deserialize)]
struct AcquisitionSummary {
    #[serde(rename = "Channels")]
    channels: u32,
    #[serde(rename = "Slices")]
    slices: u32,
    #[serde(rename = "Frames", default)]
    frames: u32,
    #[serde(rename = "NumberOfSides")]
    number_of_sides: String,
    #[serde(rename = "FirstSide")]
    first_side: String,
    #[serde(rename = "ChNames", default)]
    ch_names: Vec<String>,
}

impl AcquisitionSummary {
    fn into_metadata(self) -> Result<AcquisitionMetadata> {
        let side_count: u32 = self.number_of_sides.parse().map_err(|_| {
            Error::Core(spimprep_core::Error::InvalidMetadata {
                reason: format!("unsupported NumberOfSides value {:?}", self.number_of_sides),
            })
        })?;
        // Anything other than "B" selects side A, matching the acquisition
        // software's own interpretation of this field.
        let first_side = if self.first_side == "B" {
            Side::B
        } else {
            Side::A
        };
        let metadata = AcquisitionMetadata::new(
            self.channels,
            self.slices,
            side_count,
            first_side,
            self.ch_names,
            self.frames,
        )?;
        Ok(metadata)
    }
}

fn read_summary<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<AcquisitionSummary> {
    let value = decoder
        .find_tag(Tag::ImageDescription)?
        .ok_or_else(|| Error::MetadataRead("acquisition has no image description".to_owned()))?;
    let text = value.into_string()?;
    let root: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| Error::MetadataRead(format!("summary metadata is not valid JSON: {e}")))?;
    let summary = root.get("Summary").cloned().unwrap_or(root);
    serde_json::from_value(summary)
        .map_err(|e| Error::MetadataRead(format!("summary metadata is incomplete: {e}")))
}

fn rational_tag<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<(u32, u32)>> {
    Ok(match decoder.find_tag(tag)? {
        Some(Value::Rational(n, d)) => Some((n, d)),
        _ => None,
    })
}

fn read_calibration<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<Calibration>> {
    let x = rational_tag(decoder, Tag::XResolution)?;
    let y = rational_tag(decoder, Tag::YResolution)?;
    let (Some(x_resolution), Some(y_resolution)) = (x, y) else {
        return Ok(None);
    };
    let resolution_unit = match decoder.find_tag(Tag::ResolutionUnit)? {
        Some(value) => value.into_u16()?,
        None => 1,
    };
    Ok(Some(Calibration {
        x_resolution,
        y_resolution,
        resolution_unit,
    }))
}

/// Plane source decoding a packed multi-page acquisition.
///
/// Pages interleave channel fastest, then slice, then timepoint; one file
/// holds one position. Summary metadata is read once at open time from the
/// first page's image description and validated into typed form.
pub struct OmeTiffSource {
    decoder: Decoder<Cursor<SharedMmap>>,
    metadata: AcquisitionMetadata,
    calibration: Option<Calibration>,
    plane_width: u32,
    plane_height: u32,
}

impl OmeTiffSource {
    /// Opens the acquisition and reads its summary metadata.
    ///
    /// # Errors
    /// Returns [`Error::MetadataRead`] when the summary metadata is missing
    /// or malformed, [`Error::Core`] when it fails validation, and
    /// [`Error::InvalidFormat`] when the pixel format is not 16-bit
    /// grayscale.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        let mut decoder =
            Decoder::new(Cursor::new(reader.into_shared()))?.with_limits(Limits::unlimited());

        match decoder.colortype()? {
            ColorType::Gray(16) => {}
            other => {
                return Err(Error::InvalidFormat(format!(
                    "unsupported pixel format {other:?}, expected 16-bit grayscale"
                )))
            }
        }

        let summary = read_summary(&mut decoder)?;
        let metadata = summary.into_metadata()?;
        let calibration = read_calibration(&mut decoder)?;
        let (plane_width, plane_height) = decoder.dimensions()?;

        Ok(Self {
            decoder,
            metadata,
            calibration,
            plane_width,
            plane_height,
        })
    }

    /// Spatial calibration of the acquisition, when the container carries
    /// one.
    #[must_use]
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    /// Dimensions of every plane in the acquisition.
    #[must_use]
    pub fn plane_dimensions(&self) -> (u32, u32) {
        (self.plane_width, self.plane_height)
    }

    fn page_index(&self, channel: u32, slice: u32, timepoint: u32) -> usize {
        let channels = self.metadata.channel_count as usize;
        let slices = self.metadata.slice_count as usize;
        (timepoint as usize * slices + slice as usize) * channels + channel as usize
    }

    fn read_plane(
        &mut self,
        channel: u32,
        slice: u32,
        timepoint: u32,
        position: u32,
    ) -> Result<Plane> {
        if position != 0 {
            return Err(Error::InvalidFormat(format!(
                "position {position} requested from a single-position acquisition"
            )));
        }
        if channel >= self.metadata.channel_count || slice >= self.metadata.slice_count {
            return Err(Error::InvalidFormat(format!(
                "plane address (channel {channel}, slice {slice}) out of range for \
                 {}x{} acquisition",
                self.metadata.channel_count, self.metadata.slice_count
            )));
        }

        let index = self.page_index(channel, slice, timepoint);
        self.decoder.seek_to_image(index)?;
        let (width, height) = self.decoder.dimensions()?;
        match self.decoder.read_image()? {
            DecodingResult::U16(pixels) => Ok(Plane::new(width, height, pixels)?),
            _ => Err(Error::InvalidFormat(
                "unsupported sample format, expected 16-bit grayscale".to_owned(),
            )),
        }
    }
}

impl PlaneSource for OmeTiffSource {
    fn metadata(&self) -> &AcquisitionMetadata {
        &self.metadata
    }

    fn plane(
        &mut self,
        channel: u32,
        slice: u32,
        timepoint: u32,
        position: u32,
    ) -> spimprep_core::Result<Plane> {
        self.read_plane(channel, slice, timepoint, position)
            .map_err(|e| spimprep_core::Error::Source(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tiff::encoder::colortype::Gray16;
    use tiff::encoder::TiffEncoder;

    fn summary_json(channels: u32, slices: u32, frames: u32, sides: &str) -> String {
        let names: Vec<String> = (0..channels)
            .map(|c| {
                if c % 2 == 0 {
                    "488-GFP".to_owned()
                } else {
                    "561-mCherry".to_owned()
                }
            })
            .collect();
        serde_json::json!({
            "Summary": {
                "Channels": channels,
                "Slices": slices,
                "Frames": frames,
                "NumberOfSides": sides,
                "FirstSide": "A",
                "ChNames": names,
            }
        })
        .to_string()
    }

    /// Writes a packed acquisition whose pixel values encode the page index.
    fn write_acquisition(path: &Path, channels: u32, slices: u32, frames: u32, sides: &str) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let description = summary_json(channels, slices, frames, sides);
        let pages = channels * slices * frames;
        for page in 0..pages {
            let pixels = vec![u16::try_from(page).unwrap(); 4 * 3];
            let mut image = encoder.new_image::<Gray16>(4, 3).unwrap();
            if page == 0 {
                image
                    .encoder()
                    .write_tag(Tag::ImageDescription, description.as_str())
                    .unwrap();
            }
            image.write_data(&pixels).unwrap();
        }
    }

    #[test]
    fn test_open_reads_typed_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ACQUISITION_FILE_NAME);
        write_acquisition(&path, 4, 3, 2, "2");

        let source = OmeTiffSource::open(&path).unwrap();
        let metadata = source.metadata();
        assert_eq!(metadata.channel_count, 4);
        assert_eq!(metadata.slice_count, 3);
        assert_eq!(metadata.side_count, 2);
        assert_eq!(metadata.first_side, Side::A);
        assert_eq!(metadata.last_acquired_timepoint, 2);
        assert_eq!(source.plane_dimensions(), (4, 3));
    }

    #[test]
    fn test_plane_addressing_interleaves_channel_fastest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ACQUISITION_FILE_NAME);
        write_acquisition(&path, 4, 3, 2, "2");

        let mut source = OmeTiffSource::open(&path).unwrap();
        // Page index is (t * slices + z) * channels + c.
        assert_eq!(source.plane(0, 0, 0, 0).unwrap().pixel(0, 0), 0);
        assert_eq!(source.plane(2, 0, 0, 0).unwrap().pixel(0, 0), 2);
        assert_eq!(source.plane(1, 2, 0, 0).unwrap().pixel(0, 0), 9);
        assert_eq!(source.plane(3, 1, 1, 0).unwrap().pixel(0, 0), 19);
    }

    #[test]
    fn test_nonzero_position_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ACQUISITION_FILE_NAME);
        write_acquisition(&path, 2, 2, 1, "2");

        let mut source = OmeTiffSource::open(&path).unwrap();
        let result = source.read_plane(0, 0, 0, 1);
        assert!(matches!(result, Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_unsupported_side_count_fails_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ACQUISITION_FILE_NAME);
        write_acquisition(&path, 3, 2, 1, "3");

        let result = OmeTiffSource::open(&path);
        assert!(matches!(
            result,
            Err(Error::Core(spimprep_core::Error::InvalidMetadata { .. }))
        ));
    }

    #[test]
    fn test_missing_summary_is_a_metadata_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.tif");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            let image = encoder.new_image::<Gray16>(2, 2).unwrap();
            image.write_data(&[0u16; 4]).unwrap();
        }

        let result = OmeTiffSource::open(&path);
        assert!(matches!(result, Err(Error::MetadataRead(_))));
    }

    #[test]
    fn test_malformed_summary_json_is_a_metadata_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.tif");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            let mut image = encoder.new_image::<Gray16>(2, 2).unwrap();
            image
                .encoder()
                .write_tag(Tag::ImageDescription, "not json")
                .unwrap();
            image.write_data(&[0u16; 4]).unwrap();
        }

        let result = OmeTiffSource::open(&path);
        assert!(matches!(result, Err(Error::MetadataRead(_))));
    }

    #[test]
    fn test_mapped_reader_exposes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.bin");
        {
            let mut file = File::create(&path).unwrap();
            file.write_all(b"spimprep").unwrap();
        }
        let reader = MappedFileReader::open(&path).unwrap();
        assert_eq!(reader.len(), 8);
        assert!(!reader.is_empty());
        assert_eq!(reader.as_bytes(), b"spimprep");
        assert_eq!(reader.path(), path);
    }
}
