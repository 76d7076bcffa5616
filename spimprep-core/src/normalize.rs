//! Background subtraction over assembled volumes.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use crate::error::Result;
use crate::plane::Plane;
use crate::volume::Volume;
use rayon::prelude::*;

/// First slice of the removal window, in 1-based slice numbers.
const SUBJECT_FIRST_SLICE: usize = 4;
/// The removal window ends this many slices before the stack end.
const SUBJECT_END_MARGIN: usize = 2;

/// 1-based inclusive range of slices assumed to contain the imaged subject.
///
/// The subject occupies the interior of the z-stack; the slices outside this
/// window are background-only and usable for the estimate. `None` when the
/// stack is too short for the window to exist, in which case every slice
/// counts as background.
fn subject_window(slice_count: usize) -> Option<(usize, usize)> {
    let last = slice_count.saturating_sub(SUBJECT_END_MARGIN);
    (SUBJECT_FIRST_SLICE <= last).then_some((SUBJECT_FIRST_SLICE, last))
}

fn background_planes(volume: &Volume) -> Vec<&Plane> {
    match subject_window(volume.len()) {
        None => volume.planes().iter().collect(),
        Some((first, last)) => volume
            .planes()
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                let number = index + 1;
                number < first || number > last
            })
            .map(|(_, plane)| plane)
            .collect(),
    }
}

/// Per-pixel mean over the background slices of the volume.
///
/// This is the average projection of the stack with the subject window
/// removed; it approximates the static illumination/background pattern.
#[must_use]
pub fn background_estimate(volume: &Volume) -> Vec<f64> {
    let len = volume.width() as usize * volume.height() as usize;
    let kept = background_planes(volume);
    if kept.is_empty() {
        return vec![0.0; len];
    }
    let mut sums = vec![0.0f64; len];
    for plane in &kept {
        for (sum, &pixel) in sums.iter_mut().zip(plane.pixels()) {
            *sum += f64::from(pixel);
        }
    }
    let count = kept.len() as f64;
    for sum in &mut sums {
        *sum /= count;
    }
    sums
}

fn subtract(plane: &Plane, background: &[u16]) -> Result<Plane> {
    let pixels = plane
        .pixels()
        .iter()
        .zip(background)
        .map(|(&pixel, &estimate)| pixel.saturating_sub(estimate))
        .collect();
    Plane::new(plane.width(), plane.height(), pixels)
}

/// Subtracts the background estimate from every slice of the volume.
///
/// The estimate is rounded back to the input bit depth and removed with
/// saturating arithmetic, so no pixel ever goes below zero. Slice count and
/// dimensions are unchanged. The per-slice subtraction runs in parallel;
/// slices are disjoint, so the output does not depend on scheduling.
///
/// # Errors
/// Only the internal shape invariants can fail here; a volume built by
/// [`crate::assemble`] always normalizes cleanly.
pub fn normalize(volume: Volume) -> Result<Volume> {
    if volume.is_empty() {
        return Ok(volume);
    }
    let background: Vec<u16> = background_estimate(&volume)
        .iter()
        .map(|mean| mean.round() as u16)
        .collect();
    let planes = volume
        .planes()
        .par_iter()
        .map(|plane| subtract(plane, &background))
        .collect::<Result<Vec<_>>>()?;
    Volume::from_planes(volume.width(), volume.height(), planes)
}
