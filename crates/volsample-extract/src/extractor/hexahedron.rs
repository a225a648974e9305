//! Hexahedron extraction by plane slicing.

use volsample_core::VARIABLE_LIMIT;

use super::raster::{rasterize_triangle, SliceVertex};
use super::{ndc_bounds, plane_span, Extractor};
use crate::camera_cell::{CellRef, HexahedronCell};
use crate::tables::{triangle_count, triangle_edge, CUBE_TO_HEX, EDGE_CORNERS};
use crate::volume::{bin_center, Volume};

/// Where the plane `z = zc` crosses the edge between points `a` and `b`.
///
/// The endpoints are put in a fixed order first, so neighbouring cells that
/// share the edge compute bit-identical crossings.
fn crossing(cell: &HexahedronCell, a: usize, b: usize, zc: f64) -> SliceVertex {
    let (pa, pb) = (cell.pts[a], cell.pts[b]);
    let (a, b) = if (pa.z, pa.y, pa.x) <= (pb.z, pb.y, pb.x) { (a, b) } else { (b, a) };
    let (pa, pb) = (cell.pts[a], cell.pts[b]);
    let t = (zc - pa.z) / (pb.z - pa.z);
    let mut vals = [0.0; VARIABLE_LIMIT];
    for (v, value) in vals.iter_mut().enumerate().take(cell.nvars) {
        *value = cell.vals[a][v] + t * (cell.vals[b][v] - cell.vals[a][v]);
    }
    SliceVertex {
        xy: pa.truncate() + t * (pb.truncate() - pa.truncate()),
        vals,
    }
}

/// Bit `c` is set when cube corner `c` lies below the plane.
fn below_code(cell: &HexahedronCell, zc: f64) -> usize {
    CUBE_TO_HEX
        .iter()
        .enumerate()
        .filter(|&(_, &p)| cell.pts[p].z < zc)
        .fold(0, |code, (c, _)| code | (1 << c))
}

impl Extractor {
    /// Samples every bin centre inside `cell`. Returns the number of bins written.
    ///
    /// Cells outside the NDC cube or with non-finite points write nothing.
    pub fn extract_hexahedron(&self, cell: &HexahedronCell, source: CellRef, volume: &mut Volume) -> usize {
        if !cell.is_finite() {
            return 0;
        }
        let bounds = cell.bounds();
        if !bounds.intersects(&ndc_bounds()) {
            return 0;
        }
        let Some((k0, k1)) = plane_span(volume, bounds.min.z, bounds.max.z) else {
            return 0;
        };
        let nz = volume.dims()[2];

        let mut written = 0;
        for k in k0..=k1 {
            let zc = bin_center(k, nz);
            let code = below_code(cell, zc);
            for t in 0..triangle_count(code) {
                let tri: [SliceVertex; 3] = std::array::from_fn(|v| {
                    let [a, b] = EDGE_CORNERS[triangle_edge(code, t, v)];
                    crossing(cell, CUBE_TO_HEX[a], CUBE_TO_HEX[b], zc)
                });
                written += rasterize_triangle(&tri, k, cell.nvars, source, volume);
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::testing::{box_hex, cube_corners, hit_once, volume};
    use glam::DVec3;

    #[test]
    fn test_unit_cube_fills_lattice() {
        let mut v = volume(4);
        let cell = HexahedronCell::uniform(cube_corners(), &[1.0]);
        let written = Extractor::default().extract_hexahedron(&cell, CellRef::new(0, 0), &mut v);
        assert_eq!(written, 64);
        assert!(hit_once(&v));
        assert!(v.samples().all(|(_, s)| (s.values[0] - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_outside_ndc_writes_nothing() {
        let mut v = volume(4);
        let cell = box_hex(DVec3::new(-1.0, -1.0, 4.0), DVec3::new(1.0, 1.0, 6.0), 1.0);
        assert_eq!(Extractor::default().extract_hexahedron(&cell, CellRef::default(), &mut v), 0);
        assert_eq!(v.num_samples(), 0);
    }

    #[test]
    fn test_shared_faces_sample_once() {
        // A 2x2x2 block of boxes meeting on bin-centre planes.
        let mut v = volume(8);
        let extractor = Extractor::default();
        let mut id = 0;
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..2 {
                    let lo = DVec3::new(i as f64 - 1.0, j as f64 - 1.0, k as f64 - 1.0) + DVec3::splat(0.125);
                    let hi = lo + DVec3::ONE;
                    extractor.extract_hexahedron(&box_hex(lo, hi, id as f64), CellRef::new(id, 0), &mut v);
                    id += 1;
                }
            }
        }
        assert!(hit_once(&v));
        // The fill rule keeps the low x boundary and the high y and z ones:
        // x in [-0.875, 1.125), y and z in (-0.875, 1.125].
        assert_eq!(v.num_samples(), 8 * 7 * 7);
        assert!(v.sample(v.index(0, 3, 3)).is_some());
        assert!(v.sample(v.index(3, 0, 3)).is_none());
        assert!(v.sample(v.index(3, 3, 0)).is_none());
        assert!(v.sample(v.index(7, 7, 7)).is_some());
    }

    #[test]
    fn test_linear_field_is_interpolated() {
        let mut cell = HexahedronCell::new(cube_corners(), 2);
        for p in 0..8 {
            let x = cell.pts[p];
            cell.set_values(p, &[x.x + 2.0 * x.y - x.z, 5.0]);
        }
        let extractor = Extractor::default();
        let mut two = Volume::new(glam::UVec3::splat(6), 2).unwrap();
        extractor.extract_hexahedron(&cell, CellRef::default(), &mut two);
        assert_eq!(two.num_samples(), 216);
        for (index, s) in two.samples() {
            let [i, j, k] = two.ijk(index);
            let p = two.center(i, j, k);
            assert!((s.values[0] - (p.x + 2.0 * p.y - p.z)).abs() < 1e-9);
            assert!((s.values[1] - 5.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_flat_cell_writes_nothing() {
        let mut v = volume(4);
        let cell = box_hex(DVec3::new(-1.0, -1.0, 0.25), DVec3::new(1.0, 1.0, 0.25), 1.0);
        // Depth range (0.25, 0.25] holds no plane.
        assert_eq!(Extractor::default().extract_hexahedron(&cell, CellRef::default(), &mut v), 0);
    }

    #[test]
    fn test_non_finite_cell_skipped() {
        let mut v = volume(4);
        let mut cell = HexahedronCell::uniform(cube_corners(), &[1.0]);
        cell.pts[3].x = f64::NAN;
        assert_eq!(Extractor::default().extract_hexahedron(&cell, CellRef::default(), &mut v), 0);
    }

    #[test]
    fn test_depth_window_restricts_planes() {
        let mut v = volume(4).with_depth_window(1..3).unwrap();
        let cell = HexahedronCell::uniform(cube_corners(), &[1.0]);
        assert_eq!(Extractor::default().extract_hexahedron(&cell, CellRef::default(), &mut v), 32);
    }
}
