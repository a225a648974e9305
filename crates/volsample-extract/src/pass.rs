//! One extraction pass over a mesh domain.
//!
//! The pass walks every cell in id order, skips ghosts and degenerate cells,
//! moves the remaining cells into camera space and hands them to the
//! [`Extractor`]. With `parallel_slabs > 1` the depth axis of the lattice is
//! split into windows that are filled concurrently and merged afterwards.
//! Every window classifies all cells in the same order but only extracts the
//! ones whose depth range reaches one of its planes, so the merged volume is
//! identical to a serial run.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::DVec3;
use rayon::prelude::*;
use volsample_core::cell::is_degenerate;
use volsample_core::mesh::check_cell_types;
use volsample_core::{
    Bounds, Centering, CellType, Mesh, RenderOptions, Result, Variable, ViewTransform, VolSampleError,
    MAX_CELL_POINTS, VARIABLE_LIMIT,
};

use crate::camera_cell::{CameraSpaceCell, CellRef, PointCell};
use crate::extractor::{ndc_bounds, plane_span, CameraCell, Extractor};
use crate::volume::Volume;

/// Cell topologies an extraction pass accepts.
pub const EXTRACTABLE: [CellType; 5] = [
    CellType::Vertex,
    CellType::Tetrahedron,
    CellType::Pyramid,
    CellType::Wedge,
    CellType::Hexahedron,
];

/// A cancellation flag shared between a pass and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Counters reported by a finished pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Cells examined.
    pub cells_visited: usize,
    /// Ghost cells skipped.
    pub ghost_skipped: usize,
    /// Zero-volume cells skipped.
    pub degenerate_skipped: usize,
    /// Cells behind the eye or outside the NDC cube.
    pub culled: usize,
    /// Bins written, counting every write to the same bin.
    pub samples_written: usize,
}

/// Extracts one mesh domain into a fresh [`Volume`].
pub struct ExtractionPass<'a, M: Mesh + ?Sized> {
    mesh: &'a M,
    view: ViewTransform,
    options: RenderOptions,
    variables: Vec<&'a Variable>,
    extractor: Extractor,
    cancel: Option<CancelToken>,
}

impl<'a, M: Mesh + ?Sized> ExtractionPass<'a, M> {
    /// Prepares a pass, checking options, cell types and variables up front.
    pub fn new(mesh: &'a M, view: ViewTransform, options: &RenderOptions) -> Result<Self> {
        options.validate()?;
        check_cell_types(mesh, &EXTRACTABLE)?;
        let variables = options
            .variables
            .iter()
            .map(|name| {
                let variable = mesh
                    .variable(name)
                    .ok_or_else(|| VolSampleError::UnknownVariable(name.clone()))?;
                let expected = match variable.centering() {
                    Centering::Point => mesh.num_points(),
                    Centering::Cell => mesh.num_cells(),
                };
                if variable.num_tuples() != expected {
                    return Err(VolSampleError::SizeMismatch {
                        expected,
                        actual: variable.num_tuples(),
                    });
                }
                Ok(variable)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mesh,
            view,
            options: options.clone(),
            variables,
            extractor: Extractor::from_options(options),
            cancel: None,
        })
    }

    /// Lets `token` interrupt the pass between cells.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Runs the pass.
    pub fn run(&self) -> Result<(Volume, ExtractionStats)> {
        let nz = self.options.resolution.z as usize;
        let slabs = self.options.parallel_slabs.min(nz);
        let (volume, stats) = if slabs <= 1 {
            let (volume, stats, _) = self.run_window(0..nz)?;
            (volume, stats)
        } else {
            let windows: Vec<Range<usize>> = (0..slabs).map(|s| s * nz / slabs..(s + 1) * nz / slabs).collect();
            let parts = windows
                .into_par_iter()
                .map(|window| self.run_window(window))
                .collect::<Result<Vec<_>>>()?;
            // Every slab classifies the same cells, so only writes add up.
            let mut stats = parts[0].1;
            stats.samples_written = parts.iter().map(|(_, s, _)| s.samples_written).sum();
            let volume = Volume::merge_windows(parts.into_iter().map(|(v, _, _)| v).collect())?;
            (volume, stats)
        };

        log::debug!(
            "extraction pass: {} cells visited, {} ghost, {} degenerate, {} culled, {} samples written ({} slabs)",
            stats.cells_visited,
            stats.ghost_skipped,
            stats.degenerate_skipped,
            stats.culled,
            stats.samples_written,
            slabs.max(1)
        );
        Ok((volume, stats))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Fills depth planes `window`. Also returns how many cells reached the extractor.
    fn run_window(&self, window: Range<usize>) -> Result<(Volume, ExtractionStats, usize)> {
        let mut volume = Volume::from_options(&self.options)?.with_depth_window(window.clone())?;
        let mut stats = ExtractionStats::default();
        let mut points = Vec::with_capacity(MAX_CELL_POINTS);
        let mut extracted = 0;
        let interval = self.options.cancel_check_interval;
        let bounds = ndc_bounds();

        for id in 0..self.mesh.num_cells() {
            if id % interval == 0 && self.is_cancelled() {
                return Err(VolSampleError::Cancelled { processed: id });
            }
            stats.cells_visited += 1;
            if self.options.ignore_ghost_cells && self.mesh.is_ghost(id) {
                stats.ghost_skipped += 1;
                continue;
            }
            let cell_type = self.mesh.cell(id).cell_type();
            self.mesh.cell_points(id, &mut points);
            if cell_type.is_volumetric() && is_degenerate(&points) {
                log::trace!("skipping degenerate cell {id}");
                stats.degenerate_skipped += 1;
                continue;
            }
            let Some(ndc) = self.to_ndc(&points) else {
                stats.culled += 1;
                continue;
            };
            let mut footprint = Bounds::from_points(ndc[..points.len()].iter().copied());
            if cell_type == CellType::Vertex {
                footprint = footprint.padded(self.options.point_kernel.radius);
            }
            if !footprint.intersects(&bounds) {
                stats.culled += 1;
                continue;
            }
            // Cells that reach no plane of this window belong to other slabs.
            if plane_span(&volume, footprint.min.z, footprint.max.z).is_none() {
                continue;
            }
            let cell = self.camera_cell(id, cell_type, &ndc)?;
            extracted += 1;
            stats.samples_written += self
                .extractor
                .extract(&cell, CellRef::new(id, self.options.domain), &mut volume);
        }
        log::trace!("depth window {window:?}: {extracted} cells extracted");
        Ok((volume, stats, extracted))
    }

    /// NDC positions of `points`. `None` if any falls behind the eye.
    fn to_ndc(&self, points: &[DVec3]) -> Option<[DVec3; MAX_CELL_POINTS]> {
        let mut ndc = [DVec3::ZERO; MAX_CELL_POINTS];
        for (out, p) in ndc.iter_mut().zip(points) {
            *out = self.view.to_ndc(*p)?;
        }
        Some(ndc)
    }

    /// Builds the camera-space form of cell `id` from its NDC points.
    fn camera_cell(&self, id: usize, cell_type: CellType, ndc: &[DVec3; MAX_CELL_POINTS]) -> Result<CameraCell> {
        let connectivity = self.mesh.cell(id);
        let ids = connectivity.point_ids();
        Ok(match cell_type {
            CellType::Vertex => {
                let values = self.values_at(id, ids[0]);
                CameraCell::Point(PointCell::new(ndc[0], &values[..self.variables.len()]))
            }
            CellType::Tetrahedron => CameraCell::Tetrahedron(self.camera_space(id, ids, ndc)),
            CellType::Pyramid => CameraCell::Pyramid(self.camera_space(id, ids, ndc)),
            CellType::Wedge => CameraCell::Wedge(self.camera_space(id, ids, ndc)),
            CellType::Hexahedron => CameraCell::Hexahedron(self.camera_space(id, ids, ndc)),
            CellType::Line | CellType::Triangle | CellType::Quad => {
                return Err(VolSampleError::UnsupportedCell { cell: id, cell_type });
            }
        })
    }

    fn camera_space<const N: usize>(
        &self,
        id: usize,
        ids: &[usize],
        ndc: &[DVec3; MAX_CELL_POINTS],
    ) -> CameraSpaceCell<N> {
        let mut cell = CameraSpaceCell::new(std::array::from_fn(|p| ndc[p]), self.variables.len());
        for (p, &point) in ids.iter().enumerate().take(N) {
            cell.vals[p] = self.values_at(id, point);
        }
        cell
    }

    /// Values of every extracted variable at `point` of cell `id`.
    /// Cell-centred variables repeat the cell's value at each point.
    fn values_at(&self, id: usize, point: usize) -> [f64; VARIABLE_LIMIT] {
        let mut values = [0.0; VARIABLE_LIMIT];
        for (value, variable) in values.iter_mut().zip(&self.variables) {
            *value = match variable.centering() {
                Centering::Point => variable.scalar_value(point),
                Centering::Cell => variable.scalar_value(id),
            };
        }
        values
    }
}
