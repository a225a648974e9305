//! Rectilinear meshes: three monotone coordinate lines.

use std::collections::HashMap;

use glam::DVec3;

use crate::bounds::Bounds;
use crate::cell::{CellConnectivity, CellType};
use crate::error::{Result, VolSampleError};
use crate::mesh::{Centering, Mesh, Variable};

/// Direction of a strictly monotone coordinate array.
///
/// Returns `Some(true)` for ascending, `Some(false)` for descending and `None`
/// if the array is too short, not strictly monotone, or holds non-finite values.
pub fn monotonic_direction(coords: &[f64]) -> Option<bool> {
    if coords.len() < 2 || coords.iter().any(|c| !c.is_finite()) {
        return None;
    }
    if coords.windows(2).all(|w| w[0] < w[1]) {
        Some(true)
    } else if coords.windows(2).all(|w| w[0] > w[1]) {
        Some(false)
    } else {
        None
    }
}

/// A structured mesh of hexahedra whose points are the tensor product of
/// three coordinate arrays. Each array may run in either direction.
#[derive(Debug, Clone)]
pub struct RectilinearMesh {
    coords: [Vec<f64>; 3],
    ascending: [bool; 3],
    ghost: Option<Vec<bool>>,
    variables: HashMap<String, Variable>,
}

impl RectilinearMesh {
    /// Creates a mesh from the x, y and z coordinate lines.
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self> {
        let coords = [x, y, z];
        let mut ascending = [true; 3];
        for (axis, line) in coords.iter().enumerate() {
            ascending[axis] = monotonic_direction(line).ok_or_else(|| {
                VolSampleError::InvalidOptions(format!(
                    "coordinate array {axis} must hold at least two strictly monotone values"
                ))
            })?;
        }
        Ok(Self {
            coords,
            ascending,
            ghost: None,
            variables: HashMap::new(),
        })
    }

    /// Coordinate array for `axis`.
    pub fn coords(&self, axis: usize) -> &[f64] {
        &self.coords[axis]
    }

    /// Whether each coordinate array ascends.
    pub fn ascending(&self) -> [bool; 3] {
        self.ascending
    }

    /// Number of points along each axis.
    pub fn point_dims(&self) -> [usize; 3] {
        [self.coords[0].len(), self.coords[1].len(), self.coords[2].len()]
    }

    /// Number of cells along each axis.
    pub fn cell_dims(&self) -> [usize; 3] {
        let d = self.point_dims();
        [d[0] - 1, d[1] - 1, d[2] - 1]
    }

    /// Flat id of cell `(i, j, k)`.
    pub fn cell_id(&self, i: usize, j: usize, k: usize) -> usize {
        let d = self.cell_dims();
        i + d[0] * (j + d[1] * k)
    }

    /// Logical `(i, j, k)` of a flat cell id.
    pub fn cell_ijk(&self, id: usize) -> [usize; 3] {
        let d = self.cell_dims();
        [id % d[0], (id / d[0]) % d[1], id / (d[0] * d[1])]
    }

    fn point_id(&self, i: usize, j: usize, k: usize) -> usize {
        let d = self.point_dims();
        i + d[0] * (j + d[1] * k)
    }

    /// Marks cells as ghosts; one flag per cell.
    pub fn set_ghost_cells(&mut self, ghost: Vec<bool>) -> Result<()> {
        if ghost.len() != self.num_cells() {
            return Err(VolSampleError::SizeMismatch {
                expected: self.num_cells(),
                actual: ghost.len(),
            });
        }
        self.ghost = Some(ghost);
        Ok(())
    }

    /// Attaches a variable, replacing any variable with the same name.
    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        let expected = match variable.centering() {
            Centering::Point => self.num_points(),
            Centering::Cell => self.num_cells(),
        };
        if variable.num_tuples() != expected {
            return Err(VolSampleError::SizeMismatch {
                expected,
                actual: variable.num_tuples(),
            });
        }
        self.variables.insert(variable.name().to_string(), variable);
        Ok(())
    }
}

impl Mesh for RectilinearMesh {
    fn num_points(&self) -> usize {
        self.point_dims().iter().product()
    }

    fn num_cells(&self) -> usize {
        self.cell_dims().iter().product()
    }

    fn point(&self, id: usize) -> DVec3 {
        let d = self.point_dims();
        let i = id % d[0];
        let j = (id / d[0]) % d[1];
        let k = id / (d[0] * d[1]);
        DVec3::new(self.coords[0][i], self.coords[1][j], self.coords[2][k])
    }

    fn cell(&self, id: usize) -> CellConnectivity {
        let [i, j, k] = self.cell_ijk(id);
        CellConnectivity::new(
            CellType::Hexahedron,
            &[
                self.point_id(i, j, k),
                self.point_id(i + 1, j, k),
                self.point_id(i + 1, j + 1, k),
                self.point_id(i, j + 1, k),
                self.point_id(i, j, k + 1),
                self.point_id(i + 1, j, k + 1),
                self.point_id(i + 1, j + 1, k + 1),
                self.point_id(i, j + 1, k + 1),
            ],
        )
    }

    fn is_ghost(&self, id: usize) -> bool {
        self.ghost.as_ref().is_some_and(|g| g[id])
    }

    fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    fn bounds(&self) -> Bounds {
        let span = |c: &[f64]| {
            let (a, b) = (c[0], c[c.len() - 1]);
            (a.min(b), a.max(b))
        };
        let (x0, x1) = span(&self.coords[0]);
        let (y0, y1) = span(&self.coords[1]);
        let (z0, z1) = span(&self.coords[2]);
        Bounds::new(DVec3::new(x0, y0, z0), DVec3::new(x1, y1, z1))
    }
}
