//! Sample extraction and compositing for volsample.
//!
//! This crate turns mesh cells into samples on a regular lattice over the
//! NDC cube and composites them into an image:
//! - [`camera_cell`]: cells after the view transform
//! - [`Extractor`]: per-topology extraction by plane slicing, plus point splatting
//! - [`Volume`] with [`SamplePointArbitrator`] and [`CellList`]: the sample lattice
//! - [`Gradients`], [`LightingModel`] and [`RayFunction`]: shading and compositing
//! - [`ExtractionPass`]: one cancellable, optionally slab-parallel pass over a mesh

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![allow(clippy::module_name_repetitions)]

pub mod arbitrator;
pub mod camera_cell;
pub mod cell_list;
pub mod extractor;
pub mod gradients;
pub mod lighting;
pub mod pass;
pub mod ray_function;
pub mod tables;
pub mod volume;

pub use arbitrator::SamplePointArbitrator;
pub use camera_cell::{
    CameraSpaceCell, CellRef, HexahedronCell, PointCell, PyramidCell, TetrahedronCell, WedgeCell,
};
pub use cell_list::CellList;
pub use extractor::{ndc_bounds, CameraCell, Extractor};
pub use gradients::{GradientStencil, Gradients};
pub use lighting::LightingModel;
pub use pass::{CancelToken, ExtractionPass, ExtractionStats};
pub use ray_function::{RayFunction, RayImage};
pub use volume::{bin_center, Placement, Sample, Volume};
