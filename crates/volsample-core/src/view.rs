//! Object-space to camera-space (normalized device coordinate) transforms.

use glam::{DMat4, DVec3, DVec4};
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;

/// A 4x4 transform mapping object space into the NDC cube `[-1, 1]^3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    matrix: DMat4,
}

impl ViewTransform {
    pub fn new(matrix: DMat4) -> Self {
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self::new(DMat4::IDENTITY)
    }

    /// Orthographic transform that fits `bounds` exactly into the NDC cube.
    ///
    /// Flat axes are mapped to the plane `0`.
    pub fn fit_bounds(bounds: &Bounds) -> Self {
        let center = bounds.center();
        let extent = bounds.extent();
        let inv_half = |e: f64| if e > 0.0 { 2.0 / e } else { 0.0 };
        let scale = DVec3::new(inv_half(extent.x), inv_half(extent.y), inv_half(extent.z));
        Self::new(DMat4::from_scale(scale) * DMat4::from_translation(-center))
    }

    /// Perspective camera looking from `eye` at `target` (OpenGL depth convention).
    pub fn perspective(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y_radians: f64,
        aspect: f64,
        near: f64,
        far: f64,
    ) -> Self {
        let view = DMat4::look_at_rh(eye, target, up);
        let proj = DMat4::perspective_rh_gl(fov_y_radians, aspect, near, far);
        Self::new(proj * view)
    }

    pub fn matrix(&self) -> DMat4 {
        self.matrix
    }

    /// Transforms a point, performing the homogeneous divide.
    ///
    /// Returns `None` for points on or behind the projection plane (`w <= 0`).
    pub fn to_ndc(&self, point: DVec3) -> Option<DVec3> {
        let h = self.matrix * DVec4::new(point.x, point.y, point.z, 1.0);
        if h.w <= f64::EPSILON || !h.is_finite() {
            return None;
        }
        Some(h.truncate() / h.w)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_bounds() {
        let view = ViewTransform::fit_bounds(&Bounds::new(DVec3::new(0.0, 0.0, 10.0), DVec3::new(4.0, 2.0, 12.0)));
        let lo = view.to_ndc(DVec3::new(0.0, 0.0, 10.0)).unwrap();
        let hi = view.to_ndc(DVec3::new(4.0, 2.0, 12.0)).unwrap();
        assert!((lo - DVec3::splat(-1.0)).length() < 1e-12);
        assert!((hi - DVec3::splat(1.0)).length() < 1e-12);
    }

    #[test]
    fn test_perspective_behind_camera() {
        let view = ViewTransform::perspective(
            DVec3::new(0.0, 0.0, 5.0),
            DVec3::ZERO,
            DVec3::Y,
            std::f64::consts::FRAC_PI_4,
            1.0,
            0.1,
            100.0,
        );
        let center = view.to_ndc(DVec3::ZERO).unwrap();
        assert!(center.x.abs() < 1e-12 && center.y.abs() < 1e-12);
        assert!(center.z > -1.0 && center.z < 1.0);
        assert!(view.to_ndc(DVec3::new(0.0, 0.0, 10.0)).is_none());
    }
}
