//! spimprep-core: Core types and algorithms for diSPIM acquisition splitting.
//!
//! This crate provides the pure pieces of the pipeline: acquisition metadata
//! and side/channel addressing, plane and volume types, output layout
//! planning, volume assembly, and background normalization. Everything that
//! touches the filesystem lives in spimprep-io.
//!

pub mod assemble;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod normalize;
pub mod plane;
pub mod volume;

pub use assemble::{assemble, PlaneSource};
pub use error::{Error, Result};
pub use layout::{StackLayout, StackTarget, STACKS_DIR_NAME};
pub use metadata::{AcquisitionMetadata, Side};
pub use normalize::{background_estimate, normalize};
pub use plane::{Calibration, CropRect, Plane};
pub use volume::Volume;
