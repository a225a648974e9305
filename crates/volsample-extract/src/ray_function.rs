//! Front-to-back compositing of the sample lattice into an image.
//!
//! Each `(i, j)` column of the volume is one ray, marched from the near
//! plane (`k = 0`) toward the far plane. Colors come from the volume's
//! opacity map, shaded with the lighting model when gradients are supplied.

use bytemuck::cast_slice;
use glam::{Vec3, Vec4};
use rayon::prelude::*;

use crate::gradients::Gradients;
use crate::lighting::LightingModel;
use crate::volume::Volume;

/// Accumulated opacity past which a ray stops marching.
pub const DEFAULT_EARLY_TERMINATION: f64 = 0.99;

/// Composited RGBA pixels, premultiplied by alpha, row-major from `y = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct RayImage {
    width: usize,
    height: usize,
    pixels: Vec<[f32; 4]>,
}

impl RayImage {
    /// A transparent image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Vec4 {
        Vec4::from_array(self.pixels[x + self.width * y])
    }

    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    /// Raw bytes of the pixel buffer, ready for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        cast_slice(&self.pixels)
    }
}

/// Per-ray compositing with optional lighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayFunction {
    lighting: LightingModel,
    early_termination: f64,
    background: Vec4,
}

impl Default for RayFunction {
    fn default() -> Self {
        Self::new(LightingModel::default())
    }
}

impl RayFunction {
    pub fn new(lighting: LightingModel) -> Self {
        Self {
            lighting,
            early_termination: DEFAULT_EARLY_TERMINATION,
            background: Vec4::ZERO,
        }
    }

    /// Sets the opacity at which rays terminate.
    pub fn with_early_termination(mut self, threshold: f64) -> Self {
        self.early_termination = threshold;
        self
    }

    /// Sets the straight-alpha color blended behind every ray.
    pub fn with_background(mut self, background: Vec4) -> Self {
        self.background = background;
        self
    }

    pub fn lighting(&self) -> &LightingModel {
        &self.lighting
    }

    /// Composites one ray, returning premultiplied RGBA.
    ///
    /// `gradients` must be index-aligned with the stored bins of `volume`.
    pub fn composite_ray(&self, volume: &Volume, gradients: Option<&Gradients>, i: usize, j: usize) -> Vec4 {
        let [nx, ny, _] = volume.dims();
        let bins = volume.bins();
        let map = volume.opacity_map();
        let mut color = Vec3::ZERO;
        let mut alpha = 0.0_f64;

        for k in 0..volume.depth_window().len() {
            let local = i + nx * (j + ny * k);
            let Some(sample) = &bins[local] else {
                continue;
            };
            let a = sample.effective_opacity().clamp(0.0, 1.0);
            if a <= 0.0 {
                continue;
            }
            let base = map.lookup(sample.values[0]).truncate();
            let shaded = match gradients {
                Some(g) => self.lighting.shade(base, g.gradient(local)),
                None => base,
            };
            let w = ((1.0 - alpha) * a) as f32;
            color += shaded * w;
            alpha += (1.0 - alpha) * a;
            if alpha >= self.early_termination {
                break;
            }
        }

        let rest = (1.0 - alpha) as f32 * self.background.w;
        color += self.background.truncate() * rest;
        Vec4::new(color.x, color.y, color.z, alpha as f32 + rest)
    }

    /// Composites every ray of `volume` in parallel, one row per task.
    pub fn render(&self, volume: &Volume, gradients: Option<&Gradients>) -> RayImage {
        let [nx, ny, _] = volume.dims();
        let mut image = RayImage::new(nx, ny);
        image.pixels.par_chunks_mut(nx).enumerate().for_each(|(j, row)| {
            for (i, pixel) in row.iter_mut().enumerate() {
                *pixel = self.composite_ray(volume, gradients, i, j).to_array();
            }
        });
        log::debug!("composited {}x{} rays", nx, ny);
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_cell::CellRef;
    use glam::UVec3;
    use volsample_core::OpacityMap;

    fn column(values: &[f64], map: OpacityMap) -> Volume {
        let mut volume = Volume::new(UVec3::new(1, 1, values.len() as u32), 1)
            .unwrap()
            .with_opacity_map(map);
        for (k, v) in values.iter().enumerate() {
            volume.accumulate(k, &[*v], 1.0, CellRef::default());
        }
        volume
    }

    #[test]
    fn test_front_to_back() {
        let map = OpacityMap::constant(Vec4::new(1.0, 0.0, 0.0, 0.5));
        let volume = column(&[0.0, 0.0], map);
        let rgba = RayFunction::new(LightingModel::flat()).composite_ray(&volume, None, 0, 0);
        assert!((rgba.w - 0.75).abs() < 1e-6);
        assert!((rgba.x - 0.75).abs() < 1e-6);
        assert_eq!(rgba.y, 0.0);
    }

    #[test]
    fn test_early_termination() {
        let map = OpacityMap::linear_ramp(Vec3::ONE, 0.0, 1.0);
        let volume = column(&[1.0, 0.5], map);
        let rgba = RayFunction::new(LightingModel::flat()).composite_ray(&volume, None, 0, 0);
        // The opaque first sample hides the second.
        assert!((rgba.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_background_and_bytes() {
        let volume = Volume::new(UVec3::new(2, 3, 1), 1).unwrap();
        let ray = RayFunction::new(LightingModel::flat()).with_background(Vec4::new(0.0, 0.0, 1.0, 1.0));
        let image = ray.render(&volume, None);
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 3);
        assert_eq!(image.pixel(1, 2), Vec4::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(image.as_bytes().len(), 2 * 3 * 16);
    }
}
