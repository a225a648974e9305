//! Per-bin gradient vectors for lighting.
//!
//! [`Gradients`] is index-aligned with the stored bins of a [`Volume`]. The
//! stencils treat empty bins as zero and clamp at the lattice border, so
//! surfaces of the sampled region get gradients pointing inward.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::volume::Volume;

/// Finite-difference stencil used by [`Gradients::from_volume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GradientStencil {
    /// Two-point central difference (one-sided at the border).
    Central,
    /// 3x3x3 Sobel operator.
    #[default]
    Sobel,
}

/// One 3-vector per lattice bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    vectors: Vec<DVec3>,
}

impl Gradients {
    /// Creates `len` zero gradients.
    pub fn new(len: usize) -> Self {
        Self {
            vectors: vec![DVec3::ZERO; len],
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn set_gradient(&mut self, index: usize, gradient: DVec3) {
        self.vectors[index] = gradient;
    }

    pub fn gradient(&self, index: usize) -> DVec3 {
        self.vectors[index]
    }

    pub fn as_slice(&self) -> &[DVec3] {
        &self.vectors
    }

    /// Adds `delta` to one component of gradient `index`.
    ///
    /// # Panics
    /// Panics if `index` or `axis` is out of range.
    pub fn partial_add_gradient(&mut self, index: usize, axis: usize, delta: f64) {
        assert!(index < self.vectors.len(), "gradient {index} out of range");
        assert!(axis < 3, "axis {axis} out of range");
        self.vectors[index][axis] += delta;
    }

    /// Scales every non-zero gradient to unit length.
    pub fn normalize(&mut self) {
        for g in &mut self.vectors {
            let norm = g.length();
            if norm > 0.0 && norm.is_finite() {
                *g /= norm;
            }
        }
    }

    /// Gradients of `variable` over the stored bins of `volume`, in NDC units.
    pub fn from_volume(volume: &Volume, variable: usize, stencil: GradientStencil) -> Self {
        let [nx, ny, nz_full] = volume.dims();
        let nz = volume.depth_window().len();
        let bins = volume.bins();
        let field = |i: usize, j: usize, k: usize| -> f64 {
            bins[i + nx * (j + ny * k)].map_or(0.0, |s| s.values[variable])
        };
        let dims = [nx, ny, nz];
        let spacing = DVec3::new(2.0 / nx as f64, 2.0 / ny as f64, 2.0 / nz_full as f64);
        let mut gradients = Self::new(bins.len());

        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let index = i + nx * (j + ny * k);
                    let at = [i, j, k];
                    match stencil {
                        GradientStencil::Central => {
                            for axis in 0..3 {
                                let lo = at[axis].saturating_sub(1);
                                let hi = (at[axis] + 1).min(dims[axis] - 1);
                                if hi == lo {
                                    continue;
                                }
                                let mut a = at;
                                let mut b = at;
                                a[axis] = lo;
                                b[axis] = hi;
                                let delta = (field(b[0], b[1], b[2]) - field(a[0], a[1], a[2]))
                                    / ((hi - lo) as f64 * spacing[axis]);
                                gradients.partial_add_gradient(index, axis, delta);
                            }
                        }
                        GradientStencil::Sobel => {
                            sobel(&mut gradients, index, at, dims, spacing, &field);
                        }
                    }
                }
            }
        }
        log::debug!(
            "gradients: {:?} stencil over {} bins of variable {}",
            stencil,
            gradients.len(),
            variable
        );
        gradients
    }
}

fn clamp_offset(at: usize, offset: isize, n: usize) -> usize {
    at.saturating_add_signed(offset).min(n - 1)
}

fn sobel(
    gradients: &mut Gradients,
    index: usize,
    at: [usize; 3],
    dims: [usize; 3],
    spacing: DVec3,
    field: &impl Fn(usize, usize, usize) -> f64,
) {
    const SMOOTH: [f64; 3] = [1.0, 2.0, 1.0];
    for dk in -1..=1_isize {
        for dj in -1..=1_isize {
            for di in -1..=1_isize {
                let d = [di, dj, dk];
                let value = field(
                    clamp_offset(at[0], di, dims[0]),
                    clamp_offset(at[1], dj, dims[1]),
                    clamp_offset(at[2], dk, dims[2]),
                );
                for axis in 0..3 {
                    if d[axis] == 0 {
                        continue;
                    }
                    let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
                    let weight = d[axis] as f64 * SMOOTH[(d[b] + 1) as usize] * SMOOTH[(d[c] + 1) as usize];
                    gradients.partial_add_gradient(index, axis, weight * value / (32.0 * spacing[axis]));
                }
            }
        }
    }
}
