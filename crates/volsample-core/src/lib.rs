//! Core abstractions for volsample.
//!
//! This crate provides the types shared by point location and sample extraction:
//! - [`Mesh`] capability with [`UnstructuredMesh`] and [`RectilinearMesh`] implementations
//! - Cell topologies and parametric point-in-cell tests ([`cell`])
//! - The [`ViewTransform`] into the NDC cube and the [`OpacityMap`] transfer function
//! - Configuration options and the error type

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Index and count conversions are bounded by mesh sizes
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![allow(clippy::module_name_repetitions)]

pub mod bounds;
pub mod cell;
pub mod error;
pub mod mesh;
pub mod opacity_map;
pub mod options;
pub mod rectilinear;
pub mod view;

pub use bounds::Bounds;
pub use cell::{CellConnectivity, CellType, Weights, MAX_CELL_POINTS};
pub use error::{Result, VolSampleError};
pub use mesh::{Centering, Mesh, UnstructuredMesh, Variable};
pub use opacity_map::OpacityMap;
pub use options::{
    ArbitratorOptions, BihOptions, ClassicOptions, LocatorKind, LocatorOptions, MAX_CLASSIC_LEVEL,
    MinMax, OverlapPolicy, PointKernelOptions, RectCentering, RenderOptions, VARIABLE_LIMIT,
};
pub use rectilinear::RectilinearMesh;
pub use view::ViewTransform;

// Re-export glam types for convenience
pub use glam::{DMat4, DVec3, UVec3, Vec3, Vec4};
