//! Transfer functions mapping variable values to color and opacity.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Viridis control points, used for the default ramp.
const VIRIDIS: [Vec3; 11] = [
    Vec3::new(0.267, 0.004, 0.329),
    Vec3::new(0.282, 0.140, 0.457),
    Vec3::new(0.253, 0.265, 0.529),
    Vec3::new(0.206, 0.371, 0.553),
    Vec3::new(0.163, 0.471, 0.558),
    Vec3::new(0.127, 0.566, 0.550),
    Vec3::new(0.134, 0.658, 0.517),
    Vec3::new(0.266, 0.749, 0.440),
    Vec3::new(0.477, 0.821, 0.318),
    Vec3::new(0.741, 0.873, 0.150),
    Vec3::new(0.993, 0.906, 0.144),
];

/// A table of RGBA entries spread evenly over `[min, max]`.
///
/// Values outside the range clamp to the end entries. The alpha channel is
/// the opacity used for arbitration and compositing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpacityMap {
    entries: Vec<Vec4>,
    min: f64,
    max: f64,
}

impl OpacityMap {
    /// Creates a map from explicit entries.
    pub fn new(entries: Vec<Vec4>, min: f64, max: f64) -> Self {
        if entries.is_empty() {
            log::warn!("opacity map built from an empty table; every lookup is transparent");
        }
        Self { entries, min, max }
    }

    /// A map returning `rgba` everywhere.
    pub fn constant(rgba: Vec4) -> Self {
        Self::new(vec![rgba], 0.0, 1.0)
    }

    /// A single-color map whose opacity rises linearly from 0 at `min` to 1 at `max`.
    pub fn linear_ramp(color: Vec3, min: f64, max: f64) -> Self {
        Self::new(vec![color.extend(0.0), color.extend(1.0)], min, max)
    }

    /// Viridis colors with opacity rising linearly over `[min, max]`.
    pub fn viridis_ramp(min: f64, max: f64) -> Self {
        let n = VIRIDIS.len() - 1;
        let entries = VIRIDIS
            .iter()
            .enumerate()
            .map(|(i, c)| c.extend(i as f32 / n as f32))
            .collect();
        Self::new(entries, min, max)
    }

    pub fn entries(&self) -> &[Vec4] {
        &self.entries
    }

    /// The value range covered by the table.
    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Sets the value range covered by the table.
    pub fn set_range(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
    }

    /// Position of `value` in the table, in `[0, 1]`.
    fn normalized(&self, value: f64) -> f32 {
        let span = self.max - self.min;
        if !value.is_finite() || span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0) as f32
    }

    /// Interpolated RGBA for `value`.
    pub fn lookup(&self, value: f64) -> Vec4 {
        if self.entries.is_empty() {
            return Vec4::ZERO;
        }
        if self.entries.len() == 1 {
            return self.entries[0];
        }

        let t = self.normalized(value);
        let n = self.entries.len() - 1;
        let idx = (t * n as f32).floor() as usize;
        let idx = idx.min(n - 1);
        let frac = t * n as f32 - idx as f32;

        self.entries[idx].lerp(self.entries[idx + 1], frac)
    }

    /// Opacity (alpha) for `value`.
    pub fn opacity(&self, value: f64) -> f64 {
        f64::from(self.lookup(value).w)
    }
}

impl Default for OpacityMap {
    fn default() -> Self {
        Self::viridis_ramp(0.0, 1.0)
    }
}
