//! Phong shading of composited samples.

use glam::{DVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Shading parameters applied to each sample's color.
///
/// Gradients are treated as two-sided normals, so a sample is lit the same
/// from either side of the surface it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightingModel {
    /// Whether shading is skipped entirely.
    pub is_flat: bool,
    /// Ambient light factor (0.0 - 1.0).
    pub ambient: f32,
    /// Diffuse reflection factor (0.0 - 1.0).
    pub diffuse: f32,
    /// Specular reflection intensity (0.0 - 1.0).
    pub specular: f32,
    /// Specular exponent.
    pub shininess: f32,
    /// Direction toward the light, in NDC.
    pub light_direction: Vec3,
}

impl Default for LightingModel {
    fn default() -> Self {
        Self {
            is_flat: false,
            ambient: 0.2,
            diffuse: 0.7,
            specular: 0.3,
            shininess: 32.0,
            light_direction: Vec3::new(0.0, 0.0, -1.0),
        }
    }
}

impl LightingModel {
    /// An unlit model: colors pass through unchanged.
    pub fn flat() -> Self {
        Self {
            is_flat: true,
            ..Self::default()
        }
    }

    /// Shades `color` at a sample with gradient `gradient`.
    ///
    /// Zero gradients (flat regions) receive ambient plus full diffuse light.
    pub fn shade(&self, color: Vec3, gradient: DVec3) -> Vec3 {
        if self.is_flat {
            return color;
        }
        let normal = gradient.as_vec3().normalize_or_zero();
        if normal == Vec3::ZERO {
            return color * (self.ambient + self.diffuse).min(1.0);
        }
        let light = self.light_direction.normalize_or_zero();
        // Rays march toward +z, so the viewer looks from -z.
        let view = Vec3::NEG_Z;
        let n_dot_l = normal.dot(light).abs();
        let half = (light + view).normalize_or_zero();
        let n_dot_h = normal.dot(half).abs();
        let specular = self.specular * n_dot_h.powf(self.shininess);
        (color * (self.ambient + self.diffuse * n_dot_l) + Vec3::splat(specular)).min(Vec3::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_passthrough() {
        let c = Vec3::new(0.3, 0.4, 0.5);
        assert_eq!(LightingModel::flat().shade(c, DVec3::X), c);
    }

    #[test]
    fn test_facing_light_is_brightest() {
        let model = LightingModel::default();
        let c = Vec3::splat(0.5);
        let facing = model.shade(c, DVec3::new(0.0, 0.0, -1.0));
        let grazing = model.shade(c, DVec3::X);
        assert!(facing.x > grazing.x);
        // Two-sided: flipping the gradient changes nothing.
        assert_eq!(facing, model.shade(c, DVec3::new(0.0, 0.0, 1.0)));
        assert!(facing.max_element() <= 1.0);
    }

    #[test]
    fn test_zero_gradient() {
        let model = LightingModel::default();
        let shaded = model.shade(Vec3::ONE, DVec3::ZERO);
        assert!((shaded.x - 0.9).abs() < 1e-6);
    }
}
