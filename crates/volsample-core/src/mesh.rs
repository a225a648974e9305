//! Mesh capability consumed by locators and extraction.
//!
//! A [`Mesh`] provides random access to cells, point coordinates, named
//! variables and ghost markers. The extraction and location code never looks
//! at anything else, so any storage layout can be adapted to it.

use std::collections::HashMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::cell::{CellConnectivity, CellType};
use crate::error::{Result, VolSampleError};

/// Where the tuples of a variable live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Centering {
    /// One tuple per mesh point.
    Point,
    /// One tuple per mesh cell.
    Cell,
}

/// A named array of float tuples attached to a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    centering: Centering,
    components: usize,
    data: Vec<f64>,
}

impl Variable {
    /// Creates a variable. `data.len()` must be a multiple of `components`.
    pub fn new(
        name: impl Into<String>,
        centering: Centering,
        components: usize,
        data: Vec<f64>,
    ) -> Result<Self> {
        if components == 0 || data.len() % components != 0 {
            return Err(VolSampleError::SizeMismatch {
                expected: data.len().next_multiple_of(components.max(1)),
                actual: data.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            centering,
            components,
            data,
        })
    }

    /// Creates a single-component variable.
    pub fn scalar(name: impl Into<String>, centering: Centering, data: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            centering,
            components: 1,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn centering(&self) -> Centering {
        self.centering
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of tuples.
    pub fn num_tuples(&self) -> usize {
        self.data.len() / self.components
    }

    /// Returns tuple `index`.
    pub fn tuple(&self, index: usize) -> &[f64] {
        let start = index * self.components;
        &self.data[start..start + self.components]
    }

    /// Scalar view of a tuple: the component itself for scalars, the
    /// magnitude for multi-component tuples.
    pub fn scalar_value(&self, index: usize) -> f64 {
        let tuple = self.tuple(index);
        if tuple.len() == 1 {
            tuple[0]
        } else {
            tuple.iter().map(|v| v * v).sum::<f64>().sqrt()
        }
    }

    /// Minimum and maximum of the scalar view, ignoring non-finite entries.
    pub fn range(&self) -> Option<(f64, f64)> {
        (0..self.num_tuples())
            .map(|i| self.scalar_value(i))
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Random-access mesh capability.
pub trait Mesh: Sync {
    fn num_points(&self) -> usize;

    fn num_cells(&self) -> usize;

    /// Coordinates of point `id`.
    fn point(&self, id: usize) -> DVec3;

    /// Topology and point ids of cell `id`.
    fn cell(&self, id: usize) -> CellConnectivity;

    /// Returns true if the cell is a ghost copy owned by another domain.
    fn is_ghost(&self, _id: usize) -> bool {
        false
    }

    /// Looks up a variable by name.
    fn variable(&self, name: &str) -> Option<&Variable>;

    /// Bounding box of all points.
    fn bounds(&self) -> Bounds {
        Bounds::from_points((0..self.num_points()).map(|i| self.point(i)))
    }

    /// Coordinates of the points of cell `id`, in topology order.
    fn cell_points(&self, id: usize, out: &mut Vec<DVec3>) {
        out.clear();
        out.extend(self.cell(id).point_ids().iter().map(|&p| self.point(p)));
    }

    /// Bounding box of cell `id`.
    fn cell_bounds(&self, id: usize) -> Bounds {
        Bounds::from_points(self.cell(id).point_ids().iter().map(|&p| self.point(p)))
    }
}

/// A mesh with explicit points and typed cells.
#[derive(Debug, Clone, Default)]
pub struct UnstructuredMesh {
    points: Vec<DVec3>,
    cells: Vec<CellConnectivity>,
    ghost: Vec<bool>,
    variables: HashMap<String, Variable>,
}

impl UnstructuredMesh {
    /// Creates a mesh from points and cells.
    ///
    /// Every point id referenced by a cell must be in range.
    pub fn new(points: Vec<DVec3>, cells: Vec<CellConnectivity>) -> Result<Self> {
        if let Some(&bad) = cells
            .iter()
            .flat_map(|c| c.point_ids())
            .find(|&&id| id >= points.len())
        {
            return Err(VolSampleError::SizeMismatch {
                expected: points.len(),
                actual: bad + 1,
            });
        }
        let ghost = vec![false; cells.len()];
        Ok(Self {
            points,
            cells,
            ghost,
            variables: HashMap::new(),
        })
    }

    /// Marks cells as ghosts; one flag per cell.
    pub fn set_ghost_cells(&mut self, ghost: Vec<bool>) -> Result<()> {
        if ghost.len() != self.cells.len() {
            return Err(VolSampleError::SizeMismatch {
                expected: self.cells.len(),
                actual: ghost.len(),
            });
        }
        self.ghost = ghost;
        Ok(())
    }

    /// Attaches a variable, replacing any variable with the same name.
    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        let expected = match variable.centering() {
            Centering::Point => self.points.len(),
            Centering::Cell => self.cells.len(),
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

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }
}

impl Mesh for UnstructuredMesh {
    fn num_points(&self) -> usize {
        self.points.len()
    }

    fn num_cells(&self) -> usize {
        self.cells.len()
    }

    fn point(&self, id: usize) -> DVec3 {
        self.points[id]
    }

    fn cell(&self, id: usize) -> CellConnectivity {
        self.cells[id]
    }

    fn is_ghost(&self, id: usize) -> bool {
        self.ghost[id]
    }

    fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }
}

/// Checks that every cell of `mesh` has one of the `allowed` types,
/// reporting the first offender otherwise.
pub fn check_cell_types<M: Mesh + ?Sized>(mesh: &M, allowed: &[CellType]) -> Result<()> {
    for id in 0..mesh.num_cells() {
        let cell_type = mesh.cell(id).cell_type();
        if !allowed.contains(&cell_type) {
            return Err(VolSampleError::UnsupportedCell { cell: id, cell_type });
        }
    }
    Ok(())
}
