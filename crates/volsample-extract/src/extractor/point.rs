//! Radial splatting of point cells.

use glam::DVec3;

use super::{bin_span, ndc_bounds, plane_span, Extractor};
use crate::camera_cell::{CellRef, PointCell};
use crate::volume::{bin_center, Volume};

impl Extractor {
    /// Splats a point into every bin centre within the kernel radius.
    ///
    /// A bin at normalized distance `r` from the point receives weight
    /// `correction * epsilon / (r^2 + epsilon)` clamped to `[0, 1]`. Weights
    /// below the kernel's `min_weight` are dropped.
    pub fn extract_point(&self, cell: &PointCell, source: CellRef, volume: &mut Volume) -> usize {
        let kernel = &self.point_kernel;
        if !cell.center.is_finite() || kernel.radius <= 0.0 {
            return 0;
        }
        let bounds = cell.bounds(kernel.radius);
        if !bounds.intersects(&ndc_bounds()) {
            return 0;
        }
        let [nx, ny, nz] = volume.dims();
        let (Some((i0, i1)), Some((j0, j1)), Some((k0, k1))) = (
            bin_span(bounds.min.x, bounds.max.x, nx),
            bin_span(bounds.min.y, bounds.max.y, ny),
            plane_span(volume, bounds.min.z, bounds.max.z),
        ) else {
            return 0;
        };

        let mut written = 0;
        for k in k0..=k1 {
            for j in j0..=j1 {
                for i in i0..=i1 {
                    let p = DVec3::new(bin_center(i, nx), bin_center(j, ny), bin_center(k, nz));
                    let r = (p - cell.center).length() / kernel.radius;
                    if r > 1.0 {
                        continue;
                    }
                    let weight = (kernel.correction * kernel.epsilon / (r * r + kernel.epsilon)).clamp(0.0, 1.0);
                    if weight < kernel.min_weight {
                        continue;
                    }
                    if volume
                        .accumulate(volume.index(i, j, k), cell.values(), weight, source)
                        .wrote()
                    {
                        written += 1;
                    }
                }
            }
        }
        log::trace!("point {} splatted into {} bins", source.cell, written);
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::testing::volume;
    use volsample_core::PointKernelOptions;

    fn kernel(radius: f64) -> Extractor {
        Extractor::new(PointKernelOptions {
            radius,
            ..PointKernelOptions::default()
        })
    }

    #[test]
    fn test_point_at_bin_centre_has_full_weight() {
        let mut v = volume(4);
        let centre = v.center(1, 2, 3);
        let cell = PointCell::new(centre, &[2.0]);
        assert_eq!(kernel(0.1).extract_point(&cell, CellRef::default(), &mut v), 1);
        let s = v.sample(v.index(1, 2, 3)).unwrap();
        assert!((s.weight - 1.0).abs() < 1e-12);
        assert_eq!(s.values[0], 2.0);
    }

    #[test]
    fn test_weight_falls_off_with_distance() {
        let mut v = volume(8);
        let cell = PointCell::new(v.center(4, 4, 4), &[1.0]);
        let written = kernel(0.3).extract_point(&cell, CellRef::default(), &mut v);
        // The centre bin plus its six face neighbours at distance 0.25.
        assert_eq!(written, 7);
        let centre = v.sample(v.index(4, 4, 4)).unwrap().weight;
        let side = v.sample(v.index(5, 4, 4)).unwrap().weight;
        assert!(centre > side && side > 0.0);
    }

    #[test]
    fn test_min_weight_drops_faint_bins() {
        let mut v = volume(8);
        let cell = PointCell::new(v.center(4, 4, 4), &[1.0]);
        let extractor = Extractor::new(PointKernelOptions {
            radius: 0.3,
            min_weight: 0.9,
            ..PointKernelOptions::default()
        });
        assert_eq!(extractor.extract_point(&cell, CellRef::default(), &mut v), 1);
    }

    #[test]
    fn test_point_outside_or_nan() {
        let mut v = volume(4);
        let far = PointCell::new(DVec3::new(0.0, 0.0, 3.0), &[1.0]);
        let nan = PointCell::new(DVec3::new(f64::NAN, 0.0, 0.0), &[1.0]);
        assert_eq!(kernel(0.5).extract_point(&far, CellRef::default(), &mut v), 0);
        assert_eq!(kernel(0.5).extract_point(&nan, CellRef::default(), &mut v), 0);
        assert_eq!(v.num_samples(), 0);
    }
}
