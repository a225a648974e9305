//! Configuration options for extraction passes and cell locators.
//!
//! These are the knobs the surrounding pipeline passes in. Everything is
//! serde-serializable so a filter can persist and restore its settings.

use glam::UVec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolSampleError};
use crate::opacity_map::OpacityMap;

/// Maximum number of variables extracted together into one volume.
pub const VARIABLE_LIMIT: usize = 10;

/// Point-kernel weights below this are dropped.
pub const DEFAULT_MIN_WEIGHT: f64 = 0.01;

/// How often (in cells) an extraction pass polls its cancel token.
pub const DEFAULT_CANCEL_CHECK_INTERVAL: usize = 1024;

/// Deepest bucket-grid level accepted: `2^10` buckets per axis.
pub const MAX_CLASSIC_LEVEL: u32 = 10;

/// Direction of a raw-value comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MinMax {
    /// Smaller values win.
    Min,
    /// Larger values win.
    #[default]
    Max,
}

/// Policy for resolving several cells that land in the same lattice bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum ArbitratorOptions {
    /// No arbitration: contributions to a bin are averaged by weight.
    #[default]
    None,
    /// Higher opacity (through `map`) of `variable` wins.
    OpacityMap { variable: usize, map: OpacityMap },
    /// Compares `variable` normalized into `range` (clamped to `[0, 1]`).
    /// Higher wins, or lower when `less_than` is set.
    RelativeValue {
        variable: usize,
        less_than: bool,
        range: (f64, f64),
    },
    /// Compares the raw, unclamped value of `variable`.
    RawMinMax { variable: usize, mode: MinMax },
}

impl ArbitratorOptions {
    /// Index of the variable the arbitrator compares, if any.
    pub fn variable(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::OpacityMap { variable, .. }
            | Self::RelativeValue { variable, .. }
            | Self::RawMinMax { variable, .. } => Some(*variable),
        }
    }
}

/// Radial kernel used to splat point cells into the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointKernelOptions {
    /// Kernel radius in camera space.
    pub radius: f64,
    /// Smoothing term: weight is `epsilon / (r^2 + epsilon)` for normalized distance `r`.
    pub epsilon: f64,
    /// Gain applied to the kernel weight before clamping to `[0, 1]`.
    pub correction: f64,
    /// Contributions whose weight falls below this are dropped.
    pub min_weight: f64,
}

impl Default for PointKernelOptions {
    fn default() -> Self {
        Self {
            radius: 0.05,
            epsilon: 0.25,
            correction: 1.0,
            min_weight: DEFAULT_MIN_WEIGHT,
        }
    }
}

/// Options for one extraction pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Lattice resolution (bins along x, y, z of the NDC cube).
    pub resolution: UVec3,
    /// Names of the variables to extract; the first drives opacity.
    pub variables: Vec<String>,
    /// Transfer function for sample opacity and compositing color.
    pub opacity_map: OpacityMap,
    /// Bin arbitration policy.
    pub arbitrator: ArbitratorOptions,
    /// Point-cell splatting kernel.
    pub point_kernel: PointKernelOptions,
    /// Whether to keep every contributing cell per bin (for picking).
    pub record_candidates: bool,
    /// Whether ghost cells are skipped.
    pub ignore_ghost_cells: bool,
    /// Domain id recorded as the source of every sample.
    pub domain: u32,
    /// Cells between cancellation checks.
    pub cancel_check_interval: usize,
    /// Number of depth slabs extracted concurrently (1 = serial).
    pub parallel_slabs: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            resolution: UVec3::splat(64),
            variables: Vec::new(),
            opacity_map: OpacityMap::default(),
            arbitrator: ArbitratorOptions::None,
            point_kernel: PointKernelOptions::default(),
            record_candidates: false,
            ignore_ghost_cells: true,
            domain: 0,
            cancel_check_interval: DEFAULT_CANCEL_CHECK_INTERVAL,
            parallel_slabs: 1,
        }
    }
}

impl RenderOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lattice resolution.
    pub fn with_resolution(mut self, resolution: UVec3) -> Self {
        self.resolution = resolution;
        self
    }

    /// Adds a variable to extract.
    pub fn with_variable(mut self, name: impl Into<String>) -> Self {
        self.variables.push(name.into());
        self
    }

    /// Sets the transfer function.
    pub fn with_opacity_map(mut self, map: OpacityMap) -> Self {
        self.opacity_map = map;
        self
    }

    /// Sets the arbitration policy.
    pub fn with_arbitrator(mut self, arbitrator: ArbitratorOptions) -> Self {
        self.arbitrator = arbitrator;
        self
    }

    /// Sets the point kernel.
    pub fn with_point_kernel(mut self, kernel: PointKernelOptions) -> Self {
        self.point_kernel = kernel;
        self
    }

    /// Enables or disables per-bin candidate recording.
    pub fn with_record_candidates(mut self, record: bool) -> Self {
        self.record_candidates = record;
        self
    }

    /// Sets whether ghost cells are skipped.
    pub fn with_ignore_ghost_cells(mut self, ignore: bool) -> Self {
        self.ignore_ghost_cells = ignore;
        self
    }

    /// Sets the domain id.
    pub fn with_domain(mut self, domain: u32) -> Self {
        self.domain = domain;
        self
    }

    /// Sets the number of concurrently extracted depth slabs.
    pub fn with_parallel_slabs(mut self, slabs: usize) -> Self {
        self.parallel_slabs = slabs;
        self
    }

    /// Sets the cancellation polling interval.
    pub fn with_cancel_check_interval(mut self, cells: usize) -> Self {
        self.cancel_check_interval = cells;
        self
    }

    /// Checks that the options describe a runnable pass.
    pub fn validate(&self) -> Result<()> {
        if self.resolution.min_element() == 0 {
            return Err(VolSampleError::InvalidOptions(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if self.variables.is_empty() {
            return Err(VolSampleError::InvalidOptions(
                "at least one variable must be extracted".into(),
            ));
        }
        if self.variables.len() > VARIABLE_LIMIT {
            return Err(VolSampleError::TooManyVariables {
                requested: self.variables.len(),
                limit: VARIABLE_LIMIT,
            });
        }
        if let Some(variable) = self.arbitrator.variable() {
            if variable >= self.variables.len() {
                return Err(VolSampleError::InvalidOptions(format!(
                    "arbitrator compares variable {variable} but only {} are extracted",
                    self.variables.len()
                )));
            }
        }
        let kernel = &self.point_kernel;
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if !(positive(kernel.radius) && positive(kernel.epsilon) && positive(kernel.correction)) {
            return Err(VolSampleError::InvalidOptions(
                "point kernel radius, epsilon and correction must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&kernel.min_weight) {
            return Err(VolSampleError::InvalidOptions(format!(
                "point kernel min_weight must lie in [0, 1], got {}",
                kernel.min_weight
            )));
        }
        if self.cancel_check_interval == 0 || self.parallel_slabs == 0 {
            return Err(VolSampleError::InvalidOptions(
                "cancel_check_interval and parallel_slabs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Which cell of several overlapping candidates a locator reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverlapPolicy {
    /// The containing cell with the lowest id, i.e. the first in mesh order.
    #[default]
    FirstEncountered,
    /// The containing candidate whose centroid is closest to the query.
    NearestCentroid,
}

/// Centering convention for rectilinear locators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RectCentering {
    /// Locate cells; weights address the 8 cell nodes.
    #[default]
    Cell,
    /// Locate within the lattice of faces normal to `axis`.
    Face(usize),
    /// Locate within the lattice of edges parallel to `axis`.
    Edge(usize),
}

/// Which spatial index to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LocatorKind {
    /// Uniform bucket grid.
    Classic,
    /// Bounding interval hierarchy.
    #[default]
    Bih,
    /// Per-axis binary search on a rectilinear mesh.
    Rect(RectCentering),
}

/// Options for the bucket-grid locator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassicOptions {
    /// Subdivision level; `2^level` buckets per axis. Chosen from the cell count when unset.
    pub level: Option<u32>,
    /// Target number of cells per bucket when choosing the level.
    pub cells_per_bucket: usize,
    /// Upper bound on the chosen level.
    pub max_level: u32,
}

impl Default for ClassicOptions {
    fn default() -> Self {
        Self {
            level: None,
            cells_per_bucket: 25,
            max_level: 8,
        }
    }
}

impl ClassicOptions {
    pub fn validate(&self) -> Result<()> {
        if self.cells_per_bucket == 0 {
            return Err(VolSampleError::InvalidOptions(
                "classic cells_per_bucket must be positive".into(),
            ));
        }
        let level = self.level.unwrap_or(0).max(self.max_level);
        if level > MAX_CLASSIC_LEVEL {
            return Err(VolSampleError::InvalidOptions(format!(
                "classic level must not exceed {MAX_CLASSIC_LEVEL}, got {level}"
            )));
        }
        Ok(())
    }
}

/// Options for the BIH locator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BihOptions {
    /// Leaves hold at most this many cells (unless the depth cutoff is hit).
    pub max_cells_per_leaf: usize,
    /// Number of candidate split positions sampled per node.
    pub number_of_buckets: usize,
    /// Depth at which splitting stops regardless of leaf size.
    pub max_depth: usize,
}

impl Default for BihOptions {
    fn default() -> Self {
        Self {
            max_cells_per_leaf: 8,
            number_of_buckets: 16,
            max_depth: 48,
        }
    }
}

/// Options for building a cell locator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LocatorOptions {
    pub kind: LocatorKind,
    pub classic: ClassicOptions,
    pub bih: BihOptions,
    pub overlap: OverlapPolicy,
}

impl LocatorOptions {
    /// Creates options for the given locator kind.
    pub fn new(kind: LocatorKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Sets the overlap policy.
    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Sets the classic locator options.
    pub fn with_classic(mut self, classic: ClassicOptions) -> Self {
        self.classic = classic;
        self
    }

    /// Sets the BIH locator options.
    pub fn with_bih(mut self, bih: BihOptions) -> Self {
        self.bih = bih;
        self
    }

    /// Checks option consistency.
    pub fn validate(&self) -> Result<()> {
        self.classic.validate()?;
        if self.bih.max_cells_per_leaf == 0 || self.bih.number_of_buckets < 2 {
            return Err(VolSampleError::InvalidOptions(
                "BIH needs max_cells_per_leaf >= 1 and number_of_buckets >= 2".into(),
            ));
        }
        if let LocatorKind::Rect(RectCentering::Face(axis) | RectCentering::Edge(axis)) = self.kind {
            if axis > 2 {
                return Err(VolSampleError::InvalidOptions(format!(
                    "rect centering axis must be 0, 1 or 2, got {axis}"
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
