//! Uniform bucket-grid locator.
//!
//! The mesh bounding box is split into `2^level` buckets per axis. Every cell
//! is listed in each bucket its bounding box overlaps, so a query only tests
//! the cells of the one bucket containing the point. Bucket lists are stored
//! as one contiguous id array with per-bucket offsets.

use glam::DVec3;
use volsample_core::mesh::check_cell_types;
use volsample_core::{Bounds, ClassicOptions, Mesh, OverlapPolicy, Result, VolSampleError};

use crate::probe::Probe;
use crate::{CellHit, CellLocator, VOLUMETRIC};

/// Bucket-grid point locator.
pub struct ClassicLocator<'m, M: Mesh + ?Sized> {
    mesh: &'m M,
    bounds: Bounds,
    level: u32,
    divisions: usize,
    bucket_size: DVec3,
    offsets: Vec<usize>,
    cell_ids: Vec<usize>,
    overlap: OverlapPolicy,
}

/// Smallest level whose `8^level` buckets bring the average down to `cells_per_bucket`.
fn automatic_level(num_cells: usize, options: &ClassicOptions) -> u32 {
    let target_buckets = num_cells.div_ceil(options.cells_per_bucket.max(1));
    let mut level = 0;
    while level < options.max_level && 8_usize.checked_pow(level).is_some_and(|b| b < target_buckets) {
        level += 1;
    }
    level
}

impl<'m, M: Mesh + ?Sized> ClassicLocator<'m, M> {
    /// Builds the bucket grid over every cell of `mesh`.
    pub fn build(mesh: &'m M, options: &ClassicOptions, overlap: OverlapPolicy) -> Result<Self> {
        options.validate()?;
        check_cell_types(mesh, &VOLUMETRIC)?;

        let bounds = mesh.bounds();
        let level = options
            .level
            .map_or_else(|| automatic_level(mesh.num_cells(), options), |l| l.min(options.max_level));
        let divisions = 1_usize << level;
        let bucket_size = bounds.extent() / divisions as f64;

        let mut locator = Self {
            mesh,
            bounds,
            level,
            divisions,
            bucket_size,
            offsets: Vec::new(),
            cell_ids: Vec::new(),
            overlap,
        };

        // Two passes: count, then fill in cell order so candidate lists ascend.
        let num_buckets = divisions
            .checked_mul(divisions)
            .and_then(|n| n.checked_mul(divisions))
            .ok_or_else(|| VolSampleError::InvalidOptions(format!("classic level {level} is too deep")))?;
        let ranges: Vec<[[usize; 2]; 3]> = (0..mesh.num_cells())
            .map(|cell| locator.bucket_range(&mesh.cell_bounds(cell)))
            .collect();

        let mut counts = vec![0_usize; num_buckets + 1];
        for range in &ranges {
            locator.for_each_bucket(range, |b| counts[b + 1] += 1);
        }
        for b in 0..num_buckets {
            counts[b + 1] += counts[b];
        }
        let mut cursor = counts.clone();
        let mut cell_ids = vec![0; counts[num_buckets]];
        for (cell, range) in ranges.iter().enumerate() {
            locator.for_each_bucket(range, |b| {
                cell_ids[cursor[b]] = cell;
                cursor[b] += 1;
            });
        }
        locator.offsets = counts;
        locator.cell_ids = cell_ids;

        log::debug!(
            "classic locator: level {} ({}^3 buckets), {} cells, {} bucket entries",
            level,
            divisions,
            mesh.num_cells(),
            locator.cell_ids.len()
        );
        Ok(locator)
    }

    /// Subdivision level in use.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Buckets per axis.
    pub fn number_of_divisions(&self) -> usize {
        self.divisions
    }

    /// Candidate cells listed in the bucket containing `pos`.
    pub fn candidates(&self, pos: DVec3) -> &[usize] {
        if !self.bounds.contains(pos) {
            return &[];
        }
        let b = self.bucket_index([self.axis_bucket(pos, 0), self.axis_bucket(pos, 1), self.axis_bucket(pos, 2)]);
        &self.cell_ids[self.offsets[b]..self.offsets[b + 1]]
    }

    fn axis_bucket(&self, pos: DVec3, axis: usize) -> usize {
        let size = self.bucket_size[axis];
        if size <= 0.0 {
            return 0;
        }
        let t = ((pos[axis] - self.bounds.min[axis]) / size).floor();
        if t <= 0.0 {
            0
        } else {
            (t as usize).min(self.divisions - 1)
        }
    }

    fn bucket_range(&self, cell_bounds: &Bounds) -> [[usize; 2]; 3] {
        std::array::from_fn(|axis| {
            [
                self.axis_bucket(cell_bounds.min, axis),
                self.axis_bucket(cell_bounds.max, axis),
            ]
        })
    }

    fn bucket_index(&self, ijk: [usize; 3]) -> usize {
        ijk[0] + self.divisions * (ijk[1] + self.divisions * ijk[2])
    }

    fn for_each_bucket(&self, range: &[[usize; 2]; 3], mut f: impl FnMut(usize)) {
        for k in range[2][0]..=range[2][1] {
            for j in range[1][0]..=range[1][1] {
                for i in range[0][0]..=range[0][1] {
                    f(self.bucket_index([i, j, k]));
                }
            }
        }
    }
}

impl<M: Mesh + ?Sized> CellLocator for ClassicLocator<'_, M> {
    fn find_cell(&self, pos: DVec3, ignore_ghost_cells: bool) -> Option<CellHit> {
        let candidates = self.candidates(pos);
        if candidates.is_empty() {
            return None;
        }
        let mut probe = Probe::new(self.mesh, pos, ignore_ghost_cells, self.overlap, true);
        for &cell in candidates {
            if probe.offer(cell) {
                break;
            }
        }
        log::trace!("classic locator tested {} of {} candidates", probe.tested(), candidates.len());
        probe.into_hit()
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{hex_grid, overlapping_tets};

    #[test]
    fn test_automatic_level() {
        let options = ClassicOptions::default();
        assert_eq!(automatic_level(1, &options), 0);
        assert_eq!(automatic_level(25, &options), 0);
        assert_eq!(automatic_level(26, &options), 1);
        assert_eq!(automatic_level(25 * 64, &options), 2);
        let capped = ClassicOptions {
            max_level: 1,
            ..options
        };
        assert_eq!(automatic_level(1_000_000, &capped), 1);
    }

    #[test]
    fn test_centroids_found() {
        let mesh = hex_grid(4, 3, 2);
        let options = ClassicOptions {
            level: Some(2),
            ..ClassicOptions::default()
        };
        let locator = ClassicLocator::build(&mesh, &options, OverlapPolicy::FirstEncountered).unwrap();
        assert_eq!(locator.number_of_divisions(), 4);
        for cell in 0..mesh.num_cells() {
            let hit = locator.find_cell(mesh.cell_bounds(cell).center(), false).unwrap();
            assert_eq!(hit.cell, cell);
            assert!((hit.weights.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_outside_is_not_found() {
        let mesh = hex_grid(2, 2, 2);
        let locator =
            ClassicLocator::build(&mesh, &ClassicOptions::default(), OverlapPolicy::FirstEncountered).unwrap();
        assert!(locator.find_cell(DVec3::new(-0.5, 0.5, 0.5), false).is_none());
        assert!(locator.candidates(DVec3::splat(10.0)).is_empty());
    }

    #[test]
    fn test_overlap_policy() {
        let mesh = overlapping_tets();
        let p = DVec3::splat(0.4);
        let first =
            ClassicLocator::build(&mesh, &ClassicOptions::default(), OverlapPolicy::FirstEncountered).unwrap();
        assert_eq!(first.find_cell(p, false).unwrap().cell, 0);
        let nearest =
            ClassicLocator::build(&mesh, &ClassicOptions::default(), OverlapPolicy::NearestCentroid).unwrap();
        assert_eq!(nearest.find_cell(p, false).unwrap().cell, 1);
        // Only the large cell covers this point.
        assert_eq!(nearest.find_cell(DVec3::new(2.0, 0.5, 0.5), false).unwrap().cell, 0);
    }

    #[test]
    fn test_too_deep_level_is_rejected() {
        let mesh = hex_grid(1, 1, 1);
        let options = ClassicOptions {
            level: Some(30),
            max_level: 30,
            ..ClassicOptions::default()
        };
        assert!(matches!(
            ClassicLocator::build(&mesh, &options, OverlapPolicy::FirstEncountered),
            Err(VolSampleError::InvalidOptions(_))
        ));
        let capped = ClassicOptions {
            max_level: 60,
            ..ClassicOptions::default()
        };
        assert_eq!(automatic_level(usize::MAX, &capped), 20);
    }

    #[test]
    fn test_candidate_lists_ascend() {
        let mesh = hex_grid(3, 3, 3);
        let options = ClassicOptions {
            level: Some(1),
            ..ClassicOptions::default()
        };
        let locator = ClassicLocator::build(&mesh, &options, OverlapPolicy::FirstEncountered).unwrap();
        let candidates = locator.candidates(DVec3::splat(1.5));
        assert!(!candidates.is_empty());
        assert!(candidates.windows(2).all(|w| w[0] < w[1]));
    }
}
