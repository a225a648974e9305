//! Cell topologies and parametric point-in-cell primitives.
//!
//! Vertex ordering follows the usual unstructured-grid conventions:
//!
//! ```text
//! hexahedron   0-1-2-3 bottom quad (counter-clockwise), 4-5-6-7 top quad above it
//! pyramid      0-1-2-3 base quad, 4 apex
//! wedge        0-1-2 bottom triangle, 3-4-5 top triangle
//! tetrahedron  0-1-2 base triangle, 3 apex
//! ```
//!
//! Interpolation weights are the isoparametric shape functions evaluated at the
//! parametric coordinates of the query point, so they sum to one and reproduce
//! linear fields exactly.

#![allow(clippy::many_single_char_names)]

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;

/// Largest number of points any supported cell has.
pub const MAX_CELL_POINTS: usize = 8;

/// Parametric slack accepted by containment tests.
pub const PARAMETRIC_TOLERANCE: f64 = 1e-9;

const NEWTON_MAX_ITERATIONS: usize = 30;
const NEWTON_CONVERGENCE: f64 = 1e-12;

/// Relative bounding-box volume below which a cell counts as degenerate.
pub const DEGENERATE_VOLUME_RATIO: f64 = 1e-12;

/// Topology of a mesh cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    /// A single point (particle data).
    Vertex,
    Line,
    Triangle,
    Quad,
    Tetrahedron,
    Pyramid,
    Wedge,
    Hexahedron,
}

impl CellType {
    /// Number of points a cell of this type references.
    pub fn num_points(self) -> usize {
        match self {
            Self::Vertex => 1,
            Self::Line => 2,
            Self::Triangle => 3,
            Self::Quad | Self::Tetrahedron => 4,
            Self::Pyramid => 5,
            Self::Wedge => 6,
            Self::Hexahedron => 8,
        }
    }

    /// Returns true for the 3D topologies that can contain a point.
    pub fn is_volumetric(self) -> bool {
        matches!(
            self,
            Self::Tetrahedron | Self::Pyramid | Self::Wedge | Self::Hexahedron
        )
    }
}

/// Point ids of one cell, stored inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellConnectivity {
    cell_type: CellType,
    ids: [usize; MAX_CELL_POINTS],
}

impl CellConnectivity {
    /// Creates connectivity from a slice of point ids.
    ///
    /// # Panics
    /// Panics if `ids.len()` does not match the point count of `cell_type`.
    pub fn new(cell_type: CellType, ids: &[usize]) -> Self {
        assert_eq!(
            ids.len(),
            cell_type.num_points(),
            "{cell_type:?} needs {} point ids",
            cell_type.num_points()
        );
        let mut stored = [0; MAX_CELL_POINTS];
        stored[..ids.len()].copy_from_slice(ids);
        Self {
            cell_type,
            ids: stored,
        }
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// Point ids in topology order.
    pub fn point_ids(&self) -> &[usize] {
        &self.ids[..self.cell_type.num_points()]
    }

    pub fn len(&self) -> usize {
        self.cell_type.num_points()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Interpolation weights for the points of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    values: [f64; MAX_CELL_POINTS],
    len: usize,
}

impl Weights {
    /// Wraps the first `len` entries of `values`.
    pub fn new(values: [f64; MAX_CELL_POINTS], len: usize) -> Self {
        debug_assert!(len <= MAX_CELL_POINTS);
        Self { values, len }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn sum(&self) -> f64 {
        self.as_slice().iter().sum()
    }

    /// Interpolates per-point `values` (one per cell point) with these weights.
    pub fn interpolate(&self, values: &[f64]) -> f64 {
        self.as_slice()
            .iter()
            .zip(values)
            .map(|(w, v)| w * v)
            .sum()
    }
}

/// Returns the arithmetic mean of the points.
pub fn centroid(points: &[DVec3]) -> DVec3 {
    if points.is_empty() {
        return DVec3::ZERO;
    }
    points.iter().copied().sum::<DVec3>() / points.len() as f64
}

/// Returns true when the cell's bounding box has (relatively) no volume,
/// or when any coordinate is not finite.
pub fn is_degenerate(points: &[DVec3]) -> bool {
    if points.iter().any(|p| !p.is_finite()) {
        return true;
    }
    let bounds = Bounds::from_points(points.iter().copied());
    let diagonal = bounds.diagonal();
    diagonal <= 0.0 || bounds.volume() <= DEGENERATE_VOLUME_RATIO * diagonal.powi(3)
}

/// Finds the weights of `x` inside a cell, or `None` if `x` lies outside it.
///
/// `points` are the cell's point coordinates in topology order. Cells whose
/// isoparametric map is singular never contain anything.
pub fn evaluate_position(cell_type: CellType, points: &[DVec3], x: DVec3) -> Option<Weights> {
    debug_assert_eq!(points.len(), cell_type.num_points());
    match cell_type {
        CellType::Tetrahedron => tetra_weights(points, x),
        CellType::Hexahedron | CellType::Wedge | CellType::Pyramid => {
            let pcoords = invert_map(cell_type, points, x)?;
            if !parametric_inside(cell_type, pcoords) {
                return None;
            }
            Some(shape_functions(cell_type, pcoords))
        }
        CellType::Vertex | CellType::Line | CellType::Triangle | CellType::Quad => None,
    }
}

fn tetra_weights(points: &[DVec3], x: DVec3) -> Option<Weights> {
    let p0 = points[0];
    let m = DMat3::from_cols(points[1] - p0, points[2] - p0, points[3] - p0);
    let det = m.determinant();
    let scale = (points[1] - p0)
        .length()
        .max((points[2] - p0).length())
        .max((points[3] - p0).length());
    if !det.is_finite() || det.abs() <= DEGENERATE_VOLUME_RATIO * scale.powi(3) {
        return None;
    }
    let rst = m.inverse() * (x - p0);
    if !parametric_inside(CellType::Tetrahedron, rst) {
        return None;
    }
    Some(shape_functions(CellType::Tetrahedron, rst))
}

fn parametric_inside(cell_type: CellType, p: DVec3) -> bool {
    let lo = -PARAMETRIC_TOLERANCE;
    let hi = 1.0 + PARAMETRIC_TOLERANCE;
    let in_unit = |v: f64| v >= lo && v <= hi;
    match cell_type {
        CellType::Tetrahedron => in_unit(p.x) && in_unit(p.y) && in_unit(p.z) && p.x + p.y + p.z <= hi,
        CellType::Wedge => in_unit(p.x) && in_unit(p.y) && in_unit(p.z) && p.x + p.y <= hi,
        _ => in_unit(p.x) && in_unit(p.y) && in_unit(p.z),
    }
}

fn initial_guess(cell_type: CellType) -> DVec3 {
    match cell_type {
        CellType::Wedge => DVec3::new(1.0 / 3.0, 1.0 / 3.0, 0.5),
        CellType::Pyramid => DVec3::new(0.5, 0.5, 0.2),
        _ => DVec3::splat(0.5),
    }
}

/// Newton inversion of the isoparametric map.
fn invert_map(cell_type: CellType, points: &[DVec3], x: DVec3) -> Option<DVec3> {
    let scale = Bounds::from_points(points.iter().copied()).diagonal();
    if scale <= 0.0 || !scale.is_finite() {
        return None;
    }
    let singular = DEGENERATE_VOLUME_RATIO * scale.powi(3);

    let mut p = initial_guess(cell_type);
    for _ in 0..NEWTON_MAX_ITERATIONS {
        let weights = shape_functions(cell_type, p);
        let derivs = shape_derivatives(cell_type, p);

        let mut position = DVec3::ZERO;
        let mut jacobian = DMat3::ZERO;
        for (i, point) in points.iter().enumerate() {
            position += *point * weights.values[i];
            jacobian.x_axis += *point * derivs[i].x;
            jacobian.y_axis += *point * derivs[i].y;
            jacobian.z_axis += *point * derivs[i].z;
        }

        let det = jacobian.determinant();
        if !det.is_finite() || det.abs() <= singular {
            return None;
        }
        let delta = jacobian.inverse() * (x - position);
        p += delta;
        if !p.is_finite() {
            return None;
        }
        if delta.length_squared() < NEWTON_CONVERGENCE * NEWTON_CONVERGENCE {
            return Some(p);
        }
    }
    // Far-away points may not converge; that only happens well outside the cell.
    None
}

/// Shape function values at parametric coordinates `p`.
pub fn shape_functions(cell_type: CellType, p: DVec3) -> Weights {
    let (r, s, t) = (p.x, p.y, p.z);
    let mut w = [0.0; MAX_CELL_POINTS];
    match cell_type {
        CellType::Tetrahedron => {
            w[0] = 1.0 - r - s - t;
            w[1] = r;
            w[2] = s;
            w[3] = t;
        }
        CellType::Pyramid => {
            w[0] = (1.0 - r) * (1.0 - s) * (1.0 - t);
            w[1] = r * (1.0 - s) * (1.0 - t);
            w[2] = r * s * (1.0 - t);
            w[3] = (1.0 - r) * s * (1.0 - t);
            w[4] = t;
        }
        CellType::Wedge => {
            let u = 1.0 - r - s;
            w[0] = u * (1.0 - t);
            w[1] = r * (1.0 - t);
            w[2] = s * (1.0 - t);
            w[3] = u * t;
            w[4] = r * t;
            w[5] = s * t;
        }
        CellType::Hexahedron => {
            w[0] = (1.0 - r) * (1.0 - s) * (1.0 - t);
            w[1] = r * (1.0 - s) * (1.0 - t);
            w[2] = r * s * (1.0 - t);
            w[3] = (1.0 - r) * s * (1.0 - t);
            w[4] = (1.0 - r) * (1.0 - s) * t;
            w[5] = r * (1.0 - s) * t;
            w[6] = r * s * t;
            w[7] = (1.0 - r) * s * t;
        }
        CellType::Vertex => w[0] = 1.0,
        CellType::Line | CellType::Triangle | CellType::Quad => {}
    }
    Weights::new(w, cell_type.num_points())
}

/// Shape function derivatives (d/dr, d/ds, d/dt) at parametric coordinates `p`.
fn shape_derivatives(cell_type: CellType, p: DVec3) -> [DVec3; MAX_CELL_POINTS] {
    let (r, s, t) = (p.x, p.y, p.z);
    let mut d = [DVec3::ZERO; MAX_CELL_POINTS];
    match cell_type {
        CellType::Tetrahedron => {
            d[0] = DVec3::new(-1.0, -1.0, -1.0);
            d[1] = DVec3::X;
            d[2] = DVec3::Y;
            d[3] = DVec3::Z;
        }
        CellType::Pyramid => {
            d[0] = DVec3::new(-(1.0 - s) * (1.0 - t), -(1.0 - r) * (1.0 - t), -(1.0 - r) * (1.0 - s));
            d[1] = DVec3::new((1.0 - s) * (1.0 - t), -r * (1.0 - t), -r * (1.0 - s));
            d[2] = DVec3::new(s * (1.0 - t), r * (1.0 - t), -r * s);
            d[3] = DVec3::new(-s * (1.0 - t), (1.0 - r) * (1.0 - t), -(1.0 - r) * s);
            d[4] = DVec3::Z;
        }
        CellType::Wedge => {
            let u = 1.0 - r - s;
            d[0] = DVec3::new(-(1.0 - t), -(1.0 - t), -u);
            d[1] = DVec3::new(1.0 - t, 0.0, -r);
            d[2] = DVec3::new(0.0, 1.0 - t, -s);
            d[3] = DVec3::new(-t, -t, u);
            d[4] = DVec3::new(t, 0.0, r);
            d[5] = DVec3::new(0.0, t, s);
        }
        CellType::Hexahedron => {
            d[0] = DVec3::new(-(1.0 - s) * (1.0 - t), -(1.0 - r) * (1.0 - t), -(1.0 - r) * (1.0 - s));
            d[1] = DVec3::new((1.0 - s) * (1.0 - t), -r * (1.0 - t), -r * (1.0 - s));
            d[2] = DVec3::new(s * (1.0 - t), r * (1.0 - t), -r * s);
            d[3] = DVec3::new(-s * (1.0 - t), (1.0 - r) * (1.0 - t), -(1.0 - r) * s);
            d[4] = DVec3::new(-(1.0 - s) * t, -(1.0 - r) * t, (1.0 - r) * (1.0 - s));
            d[5] = DVec3::new((1.0 - s) * t, -r * t, r * (1.0 - s));
            d[6] = DVec3::new(s * t, r * t, r * s);
            d[7] = DVec3::new(-s * t, (1.0 - r) * t, (1.0 - r) * s);
        }
        CellType::Vertex | CellType::Line | CellType::Triangle | CellType::Quad => {}
    }
    d
}
