//! The sample lattice extraction writes into.
//!
//! A [`Volume`] covers the NDC cube with `nx * ny * nz` bins. Bin `(i, j, k)`
//! is centred at `((i + 0.5) / nx * 2 - 1, ...)` and has lattice index
//! `i + nx * (j + ny * k)`, so depth planes are contiguous.
//!
//! A volume may store only a window of depth planes. Contributions outside
//! the window are rejected, which lets disjoint windows be filled
//! independently and then merged back into one lattice.

use std::ops::Range;

use glam::{DVec3, UVec3};
use volsample_core::{OpacityMap, RenderOptions, Result, VolSampleError, VARIABLE_LIMIT};

use crate::arbitrator::SamplePointArbitrator;
use crate::camera_cell::CellRef;
use crate::cell_list::CellList;

/// NDC coordinate of the centre of bin `i` out of `n`.
#[inline]
pub fn bin_center(i: usize, n: usize) -> f64 {
    (i as f64 + 0.5) / n as f64 * 2.0 - 1.0
}

/// The accumulated contribution held by one bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub values: [f64; VARIABLE_LIMIT],
    /// Opacity of the first variable through the volume's opacity map.
    pub opacity: f64,
    /// Sum of contribution weights; exact cell samples weigh 1.
    pub weight: f64,
    /// Arbitration key of the current values, NaN without an arbitrator.
    pub key: f64,
    /// Number of contributions that reached this bin.
    pub hits: u32,
    /// Cell that supplied (or first supplied) the current values.
    pub source: CellRef,
}

impl Sample {
    /// Fraction of the bin covered, in `[0, 1]`.
    pub fn coverage(&self) -> f64 {
        self.weight.min(1.0)
    }

    /// Opacity scaled by coverage.
    pub fn effective_opacity(&self) -> f64 {
        self.opacity * self.coverage()
    }
}

/// What [`Volume::accumulate`] did with a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The bin was empty.
    Inserted,
    /// The arbitrator preferred the newcomer.
    Replaced,
    /// The arbitrator preferred the occupant.
    Kept,
    /// No arbitrator: the contribution was averaged in by weight.
    Blended,
    /// Non-finite values, a non-positive weight, or a bin outside the window.
    Rejected,
}

impl Placement {
    /// Returns true if the bin's values changed.
    pub fn wrote(self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced | Self::Blended)
    }
}

/// Dense lattice of samples plus optional per-bin candidate lists.
#[derive(Debug, Clone)]
pub struct Volume {
    dims: [usize; 3],
    nvars: usize,
    window: Range<usize>,
    opacity_map: OpacityMap,
    arbitrator: Option<SamplePointArbitrator>,
    bins: Vec<Option<Sample>>,
    cell_list: Option<CellList>,
}

impl Volume {
    /// Creates an empty volume covering the whole lattice.
    pub fn new(resolution: UVec3, nvars: usize) -> Result<Self> {
        if resolution.min_element() == 0 {
            return Err(VolSampleError::InvalidOptions(format!(
                "resolution must be positive, got {resolution}"
            )));
        }
        if nvars > VARIABLE_LIMIT {
            return Err(VolSampleError::TooManyVariables {
                requested: nvars,
                limit: VARIABLE_LIMIT,
            });
        }
        if nvars == 0 {
            return Err(VolSampleError::InvalidOptions(
                "a volume needs at least one variable".into(),
            ));
        }
        let dims = [resolution.x as usize, resolution.y as usize, resolution.z as usize];
        Ok(Self {
            dims,
            nvars,
            window: 0..dims[2],
            opacity_map: OpacityMap::default(),
            arbitrator: None,
            bins: vec![None; dims[0] * dims[1] * dims[2]],
            cell_list: None,
        })
    }

    /// Creates a volume configured by `options`.
    pub fn from_options(options: &RenderOptions) -> Result<Self> {
        options.validate()?;
        let volume = Self::new(options.resolution, options.variables.len())?
            .with_opacity_map(options.opacity_map.clone())
            .with_arbitrator(SamplePointArbitrator::from_options(&options.arbitrator));
        Ok(if options.record_candidates {
            volume.with_cell_list()
        } else {
            volume
        })
    }

    pub fn with_opacity_map(mut self, map: OpacityMap) -> Self {
        self.opacity_map = map;
        self
    }

    pub fn with_arbitrator(mut self, arbitrator: Option<SamplePointArbitrator>) -> Self {
        self.arbitrator = arbitrator;
        self
    }

    /// Records every contributing cell per bin.
    pub fn with_cell_list(mut self) -> Self {
        self.cell_list = Some(CellList::new(self.bins.len()));
        self
    }

    /// Restricts storage to depth planes `window`, discarding current contents.
    pub fn with_depth_window(mut self, window: Range<usize>) -> Result<Self> {
        if window.start >= window.end || window.end > self.dims[2] {
            return Err(VolSampleError::InvalidOptions(format!(
                "depth window {window:?} outside 0..{}",
                self.dims[2]
            )));
        }
        let plane = self.dims[0] * self.dims[1];
        self.bins = vec![None; plane * window.len()];
        if self.cell_list.is_some() {
            self.cell_list = Some(CellList::new(self.bins.len()));
        }
        self.window = window;
        Ok(self)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn nvars(&self) -> usize {
        self.nvars
    }

    /// Depth planes stored by this volume.
    pub fn depth_window(&self) -> Range<usize> {
        self.window.clone()
    }

    /// Number of bins in the whole lattice.
    pub fn lattice_len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Number of stored bins.
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Number of occupied bins.
    pub fn num_samples(&self) -> usize {
        self.bins.iter().filter(|b| b.is_some()).count()
    }

    pub fn opacity_map(&self) -> &OpacityMap {
        &self.opacity_map
    }

    pub fn arbitrator(&self) -> Option<&SamplePointArbitrator> {
        self.arbitrator.as_ref()
    }

    /// The recorded candidates, keyed by storage slot (see [`Volume::local_index`]).
    ///
    /// Use [`Volume::candidates`] to look a bin up by lattice index.
    pub fn cell_list(&self) -> Option<&CellList> {
        self.cell_list.as_ref()
    }

    /// Cells that contributed to lattice bin `index`, in arrival order.
    ///
    /// Empty when candidates are not recorded or the bin lies outside the window.
    pub fn candidates(&self, index: usize) -> impl Iterator<Item = CellRef> + '_ {
        self.cell_list
            .as_ref()
            .zip(self.local_index(index))
            .into_iter()
            .flat_map(|(list, local)| list.candidates(local))
    }

    /// Lattice index of bin `(i, j, k)`.
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dims[0] * (j + self.dims[1] * k)
    }

    /// Bin coordinates of a lattice index.
    pub fn ijk(&self, index: usize) -> [usize; 3] {
        let plane = self.dims[0] * self.dims[1];
        [index % self.dims[0], (index % plane) / self.dims[0], index / plane]
    }

    /// NDC position of the centre of bin `(i, j, k)`.
    pub fn center(&self, i: usize, j: usize, k: usize) -> DVec3 {
        DVec3::new(
            bin_center(i, self.dims[0]),
            bin_center(j, self.dims[1]),
            bin_center(k, self.dims[2]),
        )
    }

    /// Storage slot of a lattice index, if it lies in the window.
    #[inline]
    pub fn local_index(&self, index: usize) -> Option<usize> {
        let plane = self.dims[0] * self.dims[1];
        let start = self.window.start * plane;
        let end = self.window.end * plane;
        (start..end).contains(&index).then(|| index - start)
    }

    /// The sample in a bin, if the bin is stored and occupied.
    pub fn sample(&self, index: usize) -> Option<&Sample> {
        self.local_index(index).and_then(|l| self.bins[l].as_ref())
    }

    /// Occupied bins as `(lattice index, sample)`.
    pub fn samples(&self) -> impl Iterator<Item = (usize, &Sample)> {
        let offset = self.window.start * self.dims[0] * self.dims[1];
        self.bins
            .iter()
            .enumerate()
            .filter_map(move |(l, b)| b.as_ref().map(|s| (offset + l, s)))
    }

    /// Samples in storage order, including empty bins.
    pub fn bins(&self) -> &[Option<Sample>] {
        &self.bins
    }

    /// Adds one contribution to bin `index`.
    ///
    /// `weight` is clamped to 1. Non-finite values and bins outside the depth
    /// window are rejected without touching the volume.
    ///
    /// # Panics
    /// Panics if `index` lies outside the lattice or `values` does not hold
    /// one entry per variable.
    pub fn accumulate(&mut self, index: usize, values: &[f64], weight: f64, source: CellRef) -> Placement {
        assert!(index < self.lattice_len(), "bin {index} outside lattice of {}", self.lattice_len());
        assert_eq!(values.len(), self.nvars, "one value per variable");
        if weight.is_nan() || weight <= 0.0 || values.iter().any(|v| !v.is_finite()) {
            return Placement::Rejected;
        }
        let Some(local) = self.local_index(index) else {
            return Placement::Rejected;
        };
        let weight = weight.min(1.0);
        if let Some(list) = &mut self.cell_list {
            list.push(local, source);
        }

        let key = self.arbitrator.as_ref().map_or(f64::NAN, |a| a.key(values));
        let Some(sample) = &mut self.bins[local] else {
            let mut stored = [0.0; VARIABLE_LIMIT];
            stored[..values.len()].copy_from_slice(values);
            self.bins[local] = Some(Sample {
                values: stored,
                opacity: self.opacity_map.opacity(values[0]),
                weight,
                key,
                hits: 1,
                source,
            });
            return Placement::Inserted;
        };

        sample.hits += 1;
        match &self.arbitrator {
            Some(arbitrator) => {
                if !arbitrator.should_overwrite(sample.key, key) {
                    return Placement::Kept;
                }
                sample.values[..values.len()].copy_from_slice(values);
                sample.opacity = self.opacity_map.opacity(values[0]);
                sample.weight = weight;
                sample.key = key;
                sample.source = source;
                Placement::Replaced
            }
            None => {
                let total = sample.weight + weight;
                for (old, new) in sample.values.iter_mut().zip(values) {
                    *old = (*old * sample.weight + new * weight) / total;
                }
                sample.weight = total;
                sample.opacity = self.opacity_map.opacity(sample.values[0]);
                Placement::Blended
            }
        }
    }

    /// Joins volumes holding adjacent depth windows of the same lattice.
    ///
    /// Windows are sorted by depth and must tile a contiguous range.
    pub fn merge_windows(mut parts: Vec<Volume>) -> Result<Volume> {
        parts.sort_by_key(|v| v.window.start);
        let mut iter = parts.into_iter();
        let Some(mut merged) = iter.next() else {
            return Err(VolSampleError::InvalidOptions("no volumes to merge".into()));
        };
        for part in iter {
            if part.dims != merged.dims || part.nvars != merged.nvars {
                return Err(VolSampleError::SizeMismatch {
                    expected: merged.lattice_len(),
                    actual: part.lattice_len(),
                });
            }
            if part.window.start != merged.window.end {
                return Err(VolSampleError::InvalidOptions(format!(
                    "depth windows {:?} and {:?} are not adjacent",
                    merged.window, part.window
                )));
            }
            merged.window.end = part.window.end;
            merged.bins.extend_from_slice(&part.bins);
            match (&mut merged.cell_list, &part.cell_list) {
                (Some(list), Some(other)) => list.append(other),
                (None, None) => {}
                _ => {
                    return Err(VolSampleError::InvalidOptions(
                        "cannot merge volumes with and without cell lists".into(),
                    ))
                }
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volsample_core::MinMax;

    fn opacity_volume() -> Volume {
        Volume::new(UVec3::splat(2), 1)
            .unwrap()
            .with_opacity_map(OpacityMap::linear_ramp(glam::Vec3::ONE, 0.0, 1.0))
            .with_arbitrator(Some(SamplePointArbitrator::OpacityMap {
                variable: 0,
                map: OpacityMap::linear_ramp(glam::Vec3::ONE, 0.0, 1.0),
            }))
    }

    #[test]
    fn test_index_round_trip() {
        let volume = Volume::new(UVec3::new(3, 4, 5), 1).unwrap();
        let index = volume.index(2, 3, 4);
        assert_eq!(index, 59);
        assert_eq!(volume.ijk(index), [2, 3, 4]);
        assert!((volume.center(0, 0, 0).x + 2.0 / 3.0).abs() < 1e-15);
        assert!((bin_center(3, 4) - 0.75).abs() < 1e-15);
    }

    #[test]
    fn test_construction_errors() {
        assert!(Volume::new(UVec3::new(0, 1, 1), 1).is_err());
        assert!(matches!(
            Volume::new(UVec3::ONE, VARIABLE_LIMIT + 1),
            Err(VolSampleError::TooManyVariables { .. })
        ));
        assert!(Volume::new(UVec3::ONE, 1).unwrap().with_depth_window(0..2).is_err());
    }

    #[test]
    fn test_opacity_arbitration() {
        let mut volume = opacity_volume();
        assert_eq!(volume.accumulate(0, &[0.3], 1.0, CellRef::new(0, 0)), Placement::Inserted);
        assert_eq!(volume.accumulate(0, &[0.8], 1.0, CellRef::new(1, 0)), Placement::Replaced);
        assert_eq!(volume.accumulate(0, &[0.1], 1.0, CellRef::new(2, 0)), Placement::Kept);
        let sample = volume.sample(0).unwrap();
        assert_eq!(sample.source.cell, 1);
        assert_eq!(sample.hits, 3);
        assert!((sample.opacity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_blend_without_arbitrator() {
        let mut volume = Volume::new(UVec3::splat(2), 2).unwrap();
        volume.accumulate(3, &[1.0, 10.0], 0.5, CellRef::new(0, 0));
        assert_eq!(volume.accumulate(3, &[3.0, 20.0], 0.5, CellRef::new(1, 0)), Placement::Blended);
        let sample = volume.sample(3).unwrap();
        assert!((sample.values[0] - 2.0).abs() < 1e-12);
        assert!((sample.values[1] - 15.0).abs() < 1e-12);
        assert_eq!(sample.coverage(), 1.0);
        assert_eq!(sample.source.cell, 0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut volume = Volume::new(UVec3::splat(2), 1).unwrap();
        assert_eq!(volume.accumulate(1, &[f64::NAN], 1.0, CellRef::default()), Placement::Rejected);
        assert_eq!(volume.accumulate(1, &[1.0], f64::NAN, CellRef::default()), Placement::Rejected);
        assert_eq!(volume.accumulate(1, &[1.0], 0.0, CellRef::default()), Placement::Rejected);
        assert_eq!(volume.num_samples(), 0);
        assert_eq!(volume.accumulate(1, &[1.0], 1.0, CellRef::default()), Placement::Inserted);
    }

    #[test]
    fn test_raw_min_arbitration() {
        let mut volume = Volume::new(UVec3::ONE, 1)
            .unwrap()
            .with_arbitrator(Some(SamplePointArbitrator::RawMinMax {
                variable: 0,
                mode: MinMax::Min,
            }));
        volume.accumulate(0, &[5.0], 1.0, CellRef::new(0, 0));
        volume.accumulate(0, &[-50.0], 1.0, CellRef::new(1, 0));
        volume.accumulate(0, &[7.0], 1.0, CellRef::new(2, 0));
        assert_eq!(volume.sample(0).unwrap().values[0], -50.0);
    }

    #[test]
    fn test_windows_merge() {
        let full = Volume::new(UVec3::new(2, 1, 4), 1).unwrap().with_cell_list();
        let mut low = full.clone().with_depth_window(0..1).unwrap();
        let mut high = full.with_depth_window(1..4).unwrap();
        let top = high.index(1, 0, 3);
        assert_eq!(low.accumulate(top, &[1.0], 1.0, CellRef::new(0, 0)), Placement::Rejected);
        assert_eq!(high.accumulate(top, &[1.0], 1.0, CellRef::new(4, 0)), Placement::Inserted);
        assert_eq!(low.accumulate(1, &[2.0], 1.0, CellRef::new(5, 0)), Placement::Inserted);

        let merged = Volume::merge_windows(vec![high, low]).unwrap();
        assert_eq!(merged.depth_window(), 0..4);
        assert_eq!(merged.num_bins(), 8);
        assert_eq!(merged.sample(top).unwrap().source.cell, 4);
        assert_eq!(merged.sample(1).unwrap().values[0], 2.0);
        let list = merged.cell_list().unwrap();
        assert_eq!(list.candidates(top).next(), Some(CellRef::new(4, 0)));
        let indices: Vec<usize> = merged.samples().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![1, top]);
    }

    #[test]
    fn test_candidates_by_lattice_index() {
        let mut high = Volume::new(UVec3::new(2, 1, 4), 1)
            .unwrap()
            .with_cell_list()
            .with_depth_window(2..4)
            .unwrap();
        let bin = high.index(1, 0, 2);
        high.accumulate(bin, &[1.0], 1.0, CellRef::new(7, 0));
        high.accumulate(bin, &[3.0], 1.0, CellRef::new(9, 0));
        let cells: Vec<usize> = high.candidates(bin).map(|c| c.cell).collect();
        assert_eq!(cells, vec![7, 9]);
        // Lattice index 1 is below the window; its storage slot belongs to `bin`.
        assert_eq!(high.local_index(bin), Some(1));
        assert_eq!(high.candidates(1).count(), 0);
        assert_eq!(Volume::new(UVec3::ONE, 1).unwrap().candidates(0).count(), 0);
    }

    #[test]
    fn test_merge_rejects_gaps() {
        let full = Volume::new(UVec3::new(1, 1, 4), 1).unwrap();
        let a = full.clone().with_depth_window(0..1).unwrap();
        let b = full.with_depth_window(2..4).unwrap();
        assert!(Volume::merge_windows(vec![a, b]).is_err());
    }
}
