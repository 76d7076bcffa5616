//! Volume assembly from an addressable plane source.

use crate::error::Result;
use crate::metadata::AcquisitionMetadata;
use crate::plane::{CropRect, Plane};
use crate::volume::Volume;

/// Source of addressable 2-D planes plus acquisition-wide metadata.
///
/// Implementations decode one packed acquisition. All indices are zero
/// based; `position` is a real dimension even though single-position
/// acquisitions only ever ask for 0.
pub trait PlaneSource {
    /// Acquisition-wide metadata, read once at open time.
    fn metadata(&self) -> &AcquisitionMetadata;

    /// Decodes the plane at (channel, slice, timepoint, position).
    ///
    /// # Errors
    /// Returns an error when the address is out of range or the plane cannot
    /// be decoded.
    fn plane(&mut self, channel: u32, slice: u32, timepoint: u32, position: u32) -> Result<Plane>;

    /// Number of timepoints actually acquired.
    fn last_acquired_timepoint(&self) -> u32 {
        self.metadata().last_acquired_timepoint
    }
}

/// Pulls every slice of one (channel, timepoint) pair, crops each plane, and
/// stacks the result in ascending slice order.
///
/// The output volume always holds exactly `slice_count` slices; pixel values
/// are untouched apart from the spatial crop.
///
/// # Errors
/// Propagates plane source failures, and [`crate::Error::InvalidCrop`] when
/// the rectangle does not fit inside the source planes.
pub fn assemble<S: PlaneSource + ?Sized>(
    source: &mut S,
    channel: u32,
    timepoint: u32,
    position: u32,
    crop: CropRect,
) -> Result<Volume> {
    let slice_count = source.metadata().slice_count;
    let mut volume = Volume::new(crop.width, crop.height);
    for slice in 0..slice_count {
        let plane = source.plane(channel, slice, timepoint, position)?;
        volume.push(plane.crop(crop)?)?;
    }
    Ok(volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::metadata::Side;

    /// Source whose pixel values encode the plane address, so ordering is
    /// checkable after assembly.
    struct TaggedSource {
        metadata: AcquisitionMetadata,
        width: u32,
        height: u32,
    }

    impl TaggedSource {
        fn new(slice_count: u32) -> Self {
            Self {
                metadata: AcquisitionMetadata::new(2, slice_count, 2, Side::A, vec![], 4)
                    .unwrap(),
                width: 16,
                height: 12,
            }
        }
    }

    impl PlaneSource for TaggedSource {
        fn metadata(&self) -> &AcquisitionMetadata {
            &self.metadata
        }

        fn plane(
            &mut self,
            channel: u32,
            slice: u32,
            timepoint: u32,
            _position: u32,
        ) -> Result<Plane> {
            let value = u16::try_from(channel * 1000 + slice * 10 + timepoint).unwrap();
            Ok(Plane::filled(self.width, self.height, value))
        }
    }

    #[test]
    fn test_volume_shape_matches_crop_and_slice_count() {
        let mut source = TaggedSource::new(7);
        let crop = CropRect {
            x: 2,
            y: 3,
            width: 5,
            height: 4,
        };
        let volume = assemble(&mut source, 0, 0, 0, crop).unwrap();
        assert_eq!(volume.len(), 7);
        assert_eq!(volume.width(), 5);
        assert_eq!(volume.height(), 4);
    }

    #[test]
    fn test_slice_order_preserved() {
        let mut source = TaggedSource::new(5);
        let crop = CropRect {
            x: 0,
            y: 0,
            width: 3,
            height: 3,
        };
        let volume = assemble(&mut source, 1, 2, 0, crop).unwrap();
        let values: Vec<u16> = volume.planes().iter().map(|p| p.pixel(0, 0)).collect();
        assert_eq!(values, vec![1002, 1012, 1022, 1032, 1042]);
    }

    #[test]
    fn test_invalid_crop_propagates() {
        let mut source = TaggedSource::new(3);
        let crop = CropRect {
            x: 10,
            y: 0,
            width: 10,
            height: 4,
        };
        let result = assemble(&mut source, 0, 0, 0, crop);
        assert!(matches!(result, Err(Error::InvalidCrop { .. })));
    }
}
