//! Per-topology extraction of camera-space cells into a [`Volume`].
//!
//! Volumetric cells are sliced by every lattice depth plane they span. The
//! cross-section on a plane is triangulated from [`crate::tables`] and each
//! triangle is rasterized onto the bins of that plane with a top-left fill
//! rule. A bin centre on a plane belongs to a cell when the cell's depth range
//! is `(zmin, zmax]` around it and its `(x, y)` lies in the cross-section, so
//! cells sharing faces sample every bin exactly once.
//!
//! Point cells are splatted with a radial kernel instead.

mod hexahedron;
mod point;
mod pyramid;
mod raster;
mod tetrahedron;
mod wedge;

use volsample_core::{Bounds, PointKernelOptions, RenderOptions};

use crate::camera_cell::{CellRef, HexahedronCell, PointCell, PyramidCell, TetrahedronCell, WedgeCell};
use crate::volume::Volume;

/// Any camera-space cell an extractor accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCell {
    Hexahedron(HexahedronCell),
    Pyramid(PyramidCell),
    Wedge(WedgeCell),
    Tetrahedron(TetrahedronCell),
    Point(PointCell),
}

/// Writes camera-space cells into a volume.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extractor {
    point_kernel: PointKernelOptions,
}

impl Extractor {
    pub fn new(point_kernel: PointKernelOptions) -> Self {
        Self { point_kernel }
    }

    pub fn from_options(options: &RenderOptions) -> Self {
        Self::new(options.point_kernel)
    }

    pub fn point_kernel(&self) -> &PointKernelOptions {
        &self.point_kernel
    }

    /// Extracts any supported cell. Returns the number of bins written.
    pub fn extract(&self, cell: &CameraCell, source: CellRef, volume: &mut Volume) -> usize {
        match cell {
            CameraCell::Hexahedron(c) => self.extract_hexahedron(c, source, volume),
            CameraCell::Pyramid(c) => self.extract_pyramid(c, source, volume),
            CameraCell::Wedge(c) => self.extract_wedge(c, source, volume),
            CameraCell::Tetrahedron(c) => self.extract_tetrahedron(c, source, volume),
            CameraCell::Point(c) => self.extract_point(c, source, volume),
        }
    }
}

/// The NDC cube.
pub fn ndc_bounds() -> Bounds {
    Bounds::new(glam::DVec3::splat(-1.0), glam::DVec3::ONE)
}

/// Inclusive range of bins out of `n` whose centres may lie in `[lo, hi]`.
pub(crate) fn bin_span(lo: f64, hi: f64, n: usize) -> Option<(usize, usize)> {
    let scale = 0.5 * n as f64;
    let first = ((lo + 1.0) * scale - 0.5).floor().max(0.0);
    let last = ((hi + 1.0) * scale - 0.5).ceil().min(n as f64 - 1.0);
    if first.is_nan() || last.is_nan() || first > last {
        return None;
    }
    Some((first as usize, last as usize))
}

/// Depth planes of `volume`'s window that `[zmin, zmax]` may reach.
pub(crate) fn plane_span(volume: &Volume, zmin: f64, zmax: f64) -> Option<(usize, usize)> {
    let (first, last) = bin_span(zmin, zmax, volume.dims()[2])?;
    let window = volume.depth_window();
    let first = first.max(window.start);
    let last = last.min(window.end - 1);
    (first <= last).then_some((first, last))
}
