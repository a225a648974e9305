//! Cells after the view transform, ready for extraction.
//!
//! A camera-space cell holds its point positions in NDC and the values of
//! every extracted variable at each point. One is built per mesh cell, handed
//! to an extractor and dropped.

use glam::DVec3;
use volsample_core::{Bounds, VARIABLE_LIMIT};

/// Identifies the mesh cell a sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellRef {
    pub cell: usize,
    pub domain: u32,
}

impl CellRef {
    pub fn new(cell: usize, domain: u32) -> Self {
        Self { cell, domain }
    }
}

/// A cell with `N` points in camera space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSpaceCell<const N: usize> {
    pub pts: [DVec3; N],
    pub vals: [[f64; VARIABLE_LIMIT]; N],
    pub nvars: usize,
}

pub type HexahedronCell = CameraSpaceCell<8>;
pub type PyramidCell = CameraSpaceCell<5>;
pub type WedgeCell = CameraSpaceCell<6>;
pub type TetrahedronCell = CameraSpaceCell<4>;

impl<const N: usize> CameraSpaceCell<N> {
    /// Creates a cell with all values zero.
    ///
    /// # Panics
    /// Panics if `nvars` exceeds [`VARIABLE_LIMIT`].
    pub fn new(pts: [DVec3; N], nvars: usize) -> Self {
        assert!(nvars <= VARIABLE_LIMIT, "{nvars} variables exceed the limit of {VARIABLE_LIMIT}");
        Self {
            pts,
            vals: [[0.0; VARIABLE_LIMIT]; N],
            nvars,
        }
    }

    /// Creates a cell whose every point carries the same `values`.
    pub fn uniform(pts: [DVec3; N], values: &[f64]) -> Self {
        let mut cell = Self::new(pts, values.len());
        for p in 0..N {
            cell.set_values(p, values);
        }
        cell
    }

    /// Sets the variable values at point `p`.
    pub fn set_values(&mut self, p: usize, values: &[f64]) {
        self.vals[p][..values.len()].copy_from_slice(values);
    }

    /// Variable values at point `p`.
    pub fn values(&self, p: usize) -> &[f64] {
        &self.vals[p][..self.nvars]
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(self.pts.iter().copied())
    }

    /// Returns true if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.pts.iter().all(|p| p.is_finite())
    }

    /// Reorders the points into a hexahedron with `map[slot]` as the source
    /// point of each hexahedron slot.
    pub fn as_hexahedron(&self, map: &[usize; 8]) -> HexahedronCell {
        HexahedronCell {
            pts: map.map(|p| self.pts[p]),
            vals: map.map(|p| self.vals[p]),
            nvars: self.nvars,
        }
    }
}

/// A point sample splatted through a radial kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointCell {
    pub center: DVec3,
    pub vals: [f64; VARIABLE_LIMIT],
    pub nvars: usize,
}

impl PointCell {
    /// # Panics
    /// Panics if `values` holds more than [`VARIABLE_LIMIT`] entries.
    pub fn new(center: DVec3, values: &[f64]) -> Self {
        assert!(values.len() <= VARIABLE_LIMIT, "{} variables exceed the limit", values.len());
        let mut vals = [0.0; VARIABLE_LIMIT];
        vals[..values.len()].copy_from_slice(values);
        Self {
            center,
            vals,
            nvars: values.len(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.vals[..self.nvars]
    }

    /// Box covered by the kernel footprint.
    pub fn bounds(&self, radius: f64) -> Bounds {
        Bounds::new(self.center - DVec3::splat(radius), self.center + DVec3::splat(radius))
    }
}
