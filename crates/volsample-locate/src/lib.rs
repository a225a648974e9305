//! Point location for volsample meshes.
//!
//! Three strategies answer the same question, "which cell contains this
//! point, and with what interpolation weights":
//! - [`ClassicLocator`]: uniform bucket grid over cell bounding boxes
//! - [`BihLocator`]: bounding interval hierarchy
//! - [`RectLocator`]: per-axis binary search on rectilinear coordinates,
//!   for cells, faces or edges
//!
//! [`Locator`] builds one of them from [`LocatorOptions`].

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![allow(clippy::module_name_repetitions)]

pub mod bih;
pub mod classic;
mod probe;
pub mod rect;

pub use bih::BihLocator;
pub use classic::ClassicLocator;
pub use rect::RectLocator;

use glam::DVec3;
use volsample_core::{
    Bounds, CellType, LocatorKind, LocatorOptions, Mesh, RectilinearMesh, Result, VolSampleError,
    Weights,
};

/// Cell types the tree and grid locators accept.
pub const VOLUMETRIC: [CellType; 4] = [
    CellType::Tetrahedron,
    CellType::Pyramid,
    CellType::Wedge,
    CellType::Hexahedron,
];

/// A located cell and the interpolation weights of its points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellHit {
    pub cell: usize,
    pub weights: Weights,
}

impl CellHit {
    /// Interpolates point-centred `values` of this cell's points.
    pub fn interpolate(&self, values: &[f64]) -> f64 {
        self.weights.interpolate(values)
    }
}

/// Answers point-in-cell queries against one mesh.
pub trait CellLocator: Send + Sync {
    /// Finds the cell containing `pos`, or `None` if no cell does.
    fn find_cell(&self, pos: DVec3, ignore_ghost_cells: bool) -> Option<CellHit>;

    /// Bounds of the indexed mesh.
    fn bounds(&self) -> Bounds;
}

/// Any of the locators, chosen at run time.
pub enum Locator<'m, M: Mesh + ?Sized> {
    Classic(ClassicLocator<'m, M>),
    Bih(BihLocator<'m, M>),
    Rect(RectLocator<'m>),
}

impl<'m, M: Mesh + ?Sized> Locator<'m, M> {
    /// Builds the classic or BIH locator requested by `options`.
    ///
    /// Rectilinear search needs coordinate arrays; use
    /// [`Locator::build_rectilinear`] for it.
    pub fn build(mesh: &'m M, options: &LocatorOptions) -> Result<Self> {
        options.validate()?;
        match options.kind {
            LocatorKind::Classic => Ok(Self::Classic(ClassicLocator::build(
                mesh,
                &options.classic,
                options.overlap,
            )?)),
            LocatorKind::Bih => Ok(Self::Bih(BihLocator::build(
                mesh,
                &options.bih,
                options.overlap,
            )?)),
            LocatorKind::Rect(_) => Err(VolSampleError::InvalidOptions(
                "rectilinear search requires a rectilinear mesh".to_string(),
            )),
        }
    }
}

impl<'m> Locator<'m, RectilinearMesh> {
    /// Builds any locator kind over a rectilinear mesh.
    pub fn build_rectilinear(mesh: &'m RectilinearMesh, options: &LocatorOptions) -> Result<Self> {
        match options.kind {
            LocatorKind::Rect(centering) => {
                options.validate()?;
                Ok(Self::Rect(RectLocator::build(mesh, centering)))
            }
            LocatorKind::Classic | LocatorKind::Bih => Self::build(mesh, options),
        }
    }
}

impl<M: Mesh + ?Sized> CellLocator for Locator<'_, M> {
    fn find_cell(&self, pos: DVec3, ignore_ghost_cells: bool) -> Option<CellHit> {
        match self {
            Self::Classic(l) => l.find_cell(pos, ignore_ghost_cells),
            Self::Bih(l) => l.find_cell(pos, ignore_ghost_cells),
            Self::Rect(l) => l.find_cell(pos, ignore_ghost_cells),
        }
    }

    fn bounds(&self) -> Bounds {
        match self {
            Self::Classic(l) => l.bounds(),
            Self::Bih(l) => l.bounds(),
            Self::Rect(l) => l.bounds(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::hex_grid;
    use volsample_core::{OverlapPolicy, RectCentering};

    #[test]
    fn test_locators_agree() {
        let mesh = hex_grid(4, 4, 4);
        let classic = Locator::build(&mesh, &LocatorOptions::new(LocatorKind::Classic)).unwrap();
        let bih = Locator::build(&mesh, &LocatorOptions::new(LocatorKind::Bih)).unwrap();
        for p in [
            DVec3::new(0.3, 0.2, 0.9),
            DVec3::new(3.9, 2.5, 1.1),
            DVec3::new(2.0, 2.0, 2.0),
        ] {
            let a = classic.find_cell(p, false).unwrap();
            let b = bih.find_cell(p, false).unwrap();
            assert_eq!(a.cell, b.cell);
        }
        assert_eq!(classic.bounds(), bih.bounds());
    }

    #[test]
    fn test_rect_requires_rectilinear_mesh() {
        let mesh = hex_grid(1, 1, 1);
        let options = LocatorOptions::new(LocatorKind::Rect(RectCentering::Cell));
        assert!(matches!(
            Locator::build(&mesh, &options),
            Err(VolSampleError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_rectilinear_matches_bih() {
        let mesh = RectilinearMesh::new(
            vec![0.0, 0.5, 2.0, 2.5],
            vec![0.0, 1.0, 3.0],
            vec![-1.0, 0.0, 1.0],
        )
        .unwrap();
        let rect = Locator::build_rectilinear(
            &mesh,
            &LocatorOptions::new(LocatorKind::Rect(RectCentering::Cell)),
        )
        .unwrap();
        let bih = Locator::build_rectilinear(
            &mesh,
            &LocatorOptions::new(LocatorKind::Bih).with_overlap(OverlapPolicy::NearestCentroid),
        )
        .unwrap();
        for p in [DVec3::new(0.25, 0.5, -0.5), DVec3::new(2.2, 2.0, 0.7)] {
            let a = rect.find_cell(p, false).unwrap();
            let b = bih.find_cell(p, false).unwrap();
            assert_eq!(a.cell, b.cell);
            for (wa, wb) in a.weights.as_slice().iter().zip(b.weights.as_slice()) {
                assert!((wa - wb).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_interpolate_through_hit() {
        let mesh = hex_grid(1, 1, 1);
        let locator = Locator::build(&mesh, &LocatorOptions::default()).unwrap();
        let hit = locator.find_cell(DVec3::new(0.25, 0.5, 0.5), false).unwrap();
        let x = [0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        assert!((hit.interpolate(&x) - 0.25).abs() < 1e-9);
    }
}
