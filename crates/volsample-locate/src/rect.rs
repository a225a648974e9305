//! Binary-search locators for rectilinear meshes.
//!
//! Each axis is searched independently. An axis is either node centred
//! (brackets between coordinate lines) or zone centred (brackets between
//! zone midpoints). Cell location uses node centring on all three axes;
//! face lattices normal to axis `a` use node centring on `a` and zone centring
//! elsewhere; edge lattices parallel to `a` use the opposite.
//!
//! Coordinate arrays may descend. The search direction is fixed per axis when
//! the locator is built. [`CellLocator::find_cell`] reports ids in the array
//! order of the mesh, so its weights line up with the mesh's own points;
//! [`RectLocator::logical_cell`] reports the id the same lattice would have
//! with every axis ascending, which is the same for a mesh and its mirror.

use glam::DVec3;
use volsample_core::cell::MAX_CELL_POINTS;
use volsample_core::{Bounds, Mesh, RectCentering, RectilinearMesh, Weights};

use crate::{CellHit, CellLocator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisCentering {
    Node,
    Zone,
}

/// Sorted sample positions along one axis.
#[derive(Debug, Clone)]
struct AxisSearch {
    samples: Vec<f64>,
    ascending: bool,
    lo: f64,
    hi: f64,
}

impl AxisSearch {
    fn new(coords: &[f64], ascending: bool, centering: AxisCentering) -> Self {
        let samples = match centering {
            AxisCentering::Node => coords.to_vec(),
            AxisCentering::Zone => coords.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect(),
        };
        let (first, last) = (coords[0], coords[coords.len() - 1]);
        Self {
            samples,
            ascending,
            lo: first.min(last),
            hi: first.max(last),
        }
    }

    /// Lower bracket index and the fraction toward the next sample.
    ///
    /// A point exactly on a sample line belongs to the bracket physically
    /// above it, whichever way the array runs. Points between the mesh
    /// boundary and the first zone centre clamp to the end bracket.
    fn bracket(&self, x: f64) -> Option<(usize, f64)> {
        if !(x >= self.lo && x <= self.hi) {
            return None;
        }
        let n = self.samples.len();
        if n == 1 {
            return Some((0, 0.0));
        }
        let after = if self.ascending {
            self.samples.partition_point(|&c| c <= x)
        } else {
            self.samples.partition_point(|&c| c > x)
        };
        let i = after.saturating_sub(1).min(n - 2);
        let (a, b) = (self.samples[i], self.samples[i + 1]);
        let frac = ((x - a) / (b - a)).clamp(0.0, 1.0);
        Some((i, frac))
    }

    /// Bracket index counted from the low-coordinate end of the axis.
    fn ascending_index(&self, i: usize) -> usize {
        if self.ascending || self.samples.len() < 2 {
            i
        } else {
            self.samples.len() - 2 - i
        }
    }
}

/// Rectilinear locator for cells, faces or edges.
pub struct RectLocator<'m> {
    mesh: &'m RectilinearMesh,
    centering: RectCentering,
    axes: [AxisSearch; 3],
}

impl<'m> RectLocator<'m> {
    /// Builds the per-axis search arrays for `centering`.
    ///
    /// # Panics
    /// Panics if a face or edge axis is not 0, 1 or 2.
    pub fn build(mesh: &'m RectilinearMesh, centering: RectCentering) -> Self {
        let axis_centering = |axis: usize| match centering {
            RectCentering::Cell => AxisCentering::Node,
            RectCentering::Face(a) => {
                assert!(a < 3, "face axis {a} out of range");
                if axis == a {
                    AxisCentering::Node
                } else {
                    AxisCentering::Zone
                }
            }
            RectCentering::Edge(a) => {
                assert!(a < 3, "edge axis {a} out of range");
                if axis == a {
                    AxisCentering::Zone
                } else {
                    AxisCentering::Node
                }
            }
        };
        let ascending = mesh.ascending();
        let axes = std::array::from_fn(|axis| {
            AxisSearch::new(mesh.coords(axis), ascending[axis], axis_centering(axis))
        });
        log::debug!(
            "rect locator: {:?} centering, ascending {:?}, dims {:?}",
            centering,
            ascending,
            mesh.point_dims()
        );
        Self {
            mesh,
            centering,
            axes,
        }
    }

    pub fn centering(&self) -> RectCentering {
        self.centering
    }

    /// Number of samples along each axis of the located lattice.
    ///
    /// For cell centring this is the cell count per axis; otherwise it is the
    /// size of the face or edge data array.
    pub fn lattice_dims(&self) -> [usize; 3] {
        match self.centering {
            RectCentering::Cell => self.mesh.cell_dims(),
            RectCentering::Face(_) | RectCentering::Edge(_) => {
                std::array::from_fn(|a| self.axes[a].samples.len())
            }
        }
    }

    /// Per-axis lower bracket indices and fractions for `pos`.
    pub fn brackets(&self, pos: DVec3) -> Option<([usize; 3], DVec3)> {
        let (i, fx) = self.axes[0].bracket(pos.x)?;
        let (j, fy) = self.axes[1].bracket(pos.y)?;
        let (k, fz) = self.axes[2].bracket(pos.z)?;
        Some(([i, j, k], DVec3::new(fx, fy, fz)))
    }

    /// Bracket indices of `pos` counted as if every axis ascended.
    pub fn logical_ijk(&self, pos: DVec3) -> Option<[usize; 3]> {
        let (ijk, _) = self.brackets(pos)?;
        Some(std::array::from_fn(|a| self.axes[a].ascending_index(ijk[a])))
    }

    /// Id of the element containing `pos` on the ascending-ordered lattice.
    ///
    /// Unlike [`CellLocator::find_cell`], this does not depend on which way
    /// the coordinate arrays run.
    pub fn logical_cell(&self, pos: DVec3) -> Option<usize> {
        let [i, j, k] = self.logical_ijk(pos)?;
        let d = self.lattice_dims();
        Some(i + d[0] * (j + d[1] * k))
    }
}

fn trilinear(f: DVec3) -> Weights {
    let (r, s, t) = (f.x, f.y, f.z);
    let mut w = [0.0; MAX_CELL_POINTS];
    w[0] = (1.0 - r) * (1.0 - s) * (1.0 - t);
    w[1] = r * (1.0 - s) * (1.0 - t);
    w[2] = r * s * (1.0 - t);
    w[3] = (1.0 - r) * s * (1.0 - t);
    w[4] = (1.0 - r) * (1.0 - s) * t;
    w[5] = r * (1.0 - s) * t;
    w[6] = r * s * t;
    w[7] = (1.0 - r) * s * t;
    Weights::new(w, MAX_CELL_POINTS)
}

impl CellLocator for RectLocator<'_> {
    fn find_cell(&self, pos: DVec3, ignore_ghost_cells: bool) -> Option<CellHit> {
        let ([i, j, k], frac) = self.brackets(pos)?;
        let cell = match self.centering {
            RectCentering::Cell => {
                let cell = self.mesh.cell_id(i, j, k);
                if ignore_ghost_cells && self.mesh.is_ghost(cell) {
                    return None;
                }
                cell
            }
            RectCentering::Face(_) | RectCentering::Edge(_) => {
                let d = self.lattice_dims();
                i + d[0] * (j + d[1] * k)
            }
        };
        Some(CellHit {
            cell,
            weights: trilinear(frac),
        })
    }

    fn bounds(&self) -> Bounds {
        self.mesh.bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mesh(x: Vec<f64>) -> RectilinearMesh {
        RectilinearMesh::new(x, vec![0.0, 1.0], vec![0.0, 1.0]).unwrap()
    }

    #[test]
    fn test_bracket_ascending() {
        let axis = AxisSearch::new(&[0.0, 1.0, 2.0, 3.0], true, AxisCentering::Node);
        assert_eq!(axis.bracket(2.5), Some((2, 0.5)));
        assert_eq!(axis.bracket(0.0), Some((0, 0.0)));
        assert_eq!(axis.bracket(1.0), Some((1, 0.0)));
        assert_eq!(axis.bracket(3.0), Some((2, 1.0)));
        assert_eq!(axis.bracket(3.5), None);
        assert_eq!(axis.bracket(f64::NAN), None);
    }

    #[test]
    fn test_bracket_descending() {
        let axis = AxisSearch::new(&[3.0, 2.0, 1.0, 0.0], false, AxisCentering::Node);
        assert_eq!(axis.bracket(2.5), Some((0, 0.5)));
        // On a line: the bracket physically above it, as for ascending data
        assert_eq!(axis.bracket(1.0), Some((1, 1.0)));
        assert_eq!(axis.bracket(0.0), Some((2, 1.0)));
        assert_eq!(axis.bracket(3.0), Some((0, 0.0)));
    }

    #[test]
    fn test_zone_bracket_clamps_at_boundary() {
        let axis = AxisSearch::new(&[0.0, 1.0, 2.0], true, AxisCentering::Zone);
        assert_eq!(axis.samples, vec![0.5, 1.5]);
        assert_eq!(axis.bracket(0.25), Some((0, 0.0)));
        assert_eq!(axis.bracket(1.0), Some((0, 0.5)));
        assert_eq!(axis.bracket(1.9), Some((0, 1.0)));
    }

    #[test]
    fn test_cell_weights() {
        let m = mesh(vec![0.0, 2.0]);
        let locator = RectLocator::build(&m, RectCentering::Cell);
        let hit = locator.find_cell(DVec3::new(0.5, 0.5, 0.5), false).unwrap();
        assert_eq!(hit.cell, 0);
        let w = hit.weights.as_slice();
        assert!((w[0] - 0.75 * 0.25).abs() < 1e-12);
        assert!((w[1] - 0.25 * 0.25).abs() < 1e-12);
        assert!((hit.weights.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_face_and_edge_ids() {
        let m = RectilinearMesh::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 2.0], vec![0.0, 1.0])
            .unwrap();
        let faces = RectLocator::build(&m, RectCentering::Face(0));
        assert_eq!(faces.lattice_dims(), [4, 2, 1]);
        let hit = faces.find_cell(DVec3::new(2.2, 1.6, 0.5), false).unwrap();
        // x bracket 2 (node), y bracket 0 between zone centres 0.5 and 1.5 clamps to 1.0
        assert_eq!(hit.cell, 2);
        assert!((hit.weights.sum() - 1.0).abs() < 1e-12);

        let edges = RectLocator::build(&m, RectCentering::Edge(0));
        assert_eq!(edges.lattice_dims(), [3, 3, 2]);
        let hit = edges.find_cell(DVec3::new(2.2, 1.6, 0.5), false).unwrap();
        // x bracket 1 between zone centres 1.5 and 2.5, y bracket 1, z bracket 0
        assert_eq!(hit.cell, 1 + 3 * 1);
    }

    #[test]
    fn test_ghost_cells_skipped() {
        let mut m = mesh(vec![0.0, 1.0, 2.0]);
        m.set_ghost_cells(vec![true, false]).unwrap();
        let locator = RectLocator::build(&m, RectCentering::Cell);
        assert!(locator.find_cell(DVec3::new(0.5, 0.5, 0.5), true).is_none());
        assert_eq!(locator.find_cell(DVec3::new(0.5, 0.5, 0.5), false).unwrap().cell, 0);
        assert_eq!(locator.find_cell(DVec3::new(1.5, 0.5, 0.5), true).unwrap().cell, 1);
    }

    #[test]
    fn test_logical_cell_ignores_direction() {
        let up = mesh(vec![0.0, 1.0, 2.0, 3.0]);
        let down = mesh(vec![3.0, 2.0, 1.0, 0.0]);
        let a = RectLocator::build(&up, RectCentering::Cell);
        let d = RectLocator::build(&down, RectCentering::Cell);
        for x in [0.0, 0.5, 1.0, 2.0, 2.5, 3.0] {
            let p = DVec3::new(x, 0.5, 0.5);
            assert_eq!(d.logical_cell(p), a.logical_cell(p), "x = {x}");
            assert_eq!(a.logical_cell(p), Some(a.find_cell(p, false).unwrap().cell));
        }
        assert_eq!(d.logical_ijk(DVec3::new(0.5, 0.5, 0.5)), Some([0, 0, 0]));
        assert_eq!(d.find_cell(DVec3::new(0.5, 0.5, 0.5), false).unwrap().cell, 2);
        assert_eq!(d.logical_cell(DVec3::new(-0.5, 0.5, 0.5)), None);
    }

    proptest! {
        #[test]
        fn prop_descending_bracket_mirrors_ascending(x in 0.0f64..3.0) {
            prop_assume!(x.fract() != 0.0);
            let up = AxisSearch::new(&[0.0, 1.0, 2.0, 3.0], true, AxisCentering::Node);
            let down = AxisSearch::new(&[3.0, 2.0, 1.0, 0.0], false, AxisCentering::Node);
            let (i, a) = up.bracket(x).unwrap();
            let (j, d) = down.bracket(x).unwrap();
            prop_assert_eq!(j, 2 - i);
            prop_assert!((a + d - 1.0).abs() < 1e-12);
        }
    }
}
