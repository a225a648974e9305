//! volsample: volume-rendering sample extraction and point location.
//!
//! volsample samples unstructured and rectilinear meshes onto a regular
//! lattice over the NDC cube, ready for ray compositing, and answers
//! point-in-cell queries against the same meshes.
//!
//! # Quick Start
//!
//! ```no_run
//! use volsample::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut mesh = RectilinearMesh::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0], vec![0.0, 1.0])?;
//!     mesh.add_variable(Variable::scalar("density", Centering::Cell, vec![0.2, 0.9]))?;
//!
//!     let options = RenderOptions::default()
//!         .with_resolution(UVec3::splat(32))
//!         .with_variable("density");
//!     let view = ViewTransform::fit_bounds(&mesh.bounds());
//!     let (image, stats) = render(&mesh, view, &options, &RayFunction::default())?;
//!     println!("{} samples, {}x{} image", stats.samples_written, image.width(), image.height());
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! - [`volsample_core`]: meshes, cells, options, errors
//! - [`volsample_locate`]: [`ClassicLocator`], [`BihLocator`] and [`RectLocator`]
//! - [`volsample_extract`]: [`Extractor`], [`Volume`], [`Gradients`], [`RayFunction`]

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub use volsample_core::{
    cell, ArbitratorOptions, BihOptions, Bounds, Centering, CellConnectivity, CellType,
    ClassicOptions, DMat4, DVec3, LocatorKind, LocatorOptions, Mesh, MinMax, OpacityMap,
    OverlapPolicy, PointKernelOptions, RectCentering, RectilinearMesh, RenderOptions, Result,
    UVec3, UnstructuredMesh, Variable, Vec3, Vec4, ViewTransform, VolSampleError, Weights,
    VARIABLE_LIMIT,
};

pub use volsample_locate::{
    BihLocator, CellHit, CellLocator, ClassicLocator, Locator, RectLocator, VOLUMETRIC,
};

pub use volsample_extract::{
    bin_center, ndc_bounds, CameraCell, CameraSpaceCell, CancelToken, CellList, CellRef,
    ExtractionPass, ExtractionStats, Extractor, GradientStencil, Gradients, HexahedronCell,
    LightingModel, Placement, PointCell, PyramidCell, RayFunction, RayImage, Sample,
    SamplePointArbitrator, TetrahedronCell, Volume, WedgeCell,
};

/// Installs `env_logger` as the `log` backend, honouring `RUST_LOG`.
///
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Extracts `mesh` and composites the volume into an image.
///
/// Gradients of the first variable shade the samples unless the ray
/// function's lighting is flat.
pub fn render<M: Mesh + ?Sized>(
    mesh: &M,
    view: ViewTransform,
    options: &RenderOptions,
    ray: &RayFunction,
) -> Result<(RayImage, ExtractionStats)> {
    let (volume, stats) = ExtractionPass::new(mesh, view, options)?.run()?;
    let gradients = (!ray.lighting().is_flat).then(|| {
        let mut gradients = Gradients::from_volume(&volume, 0, GradientStencil::default());
        gradients.normalize();
        gradients
    });
    let image = ray.render(&volume, gradients.as_ref());
    log::debug!("rendered {}x{} image", image.width(), image.height());
    Ok((image, stats))
}
