//! Candidate testing shared by the tree and grid locators.

use glam::DVec3;
use volsample_core::cell::{self, evaluate_position};
use volsample_core::{Mesh, OverlapPolicy};

use crate::CellHit;

/// Tests candidate cells against one query point under an overlap policy.
pub(crate) struct Probe<'a, M: Mesh + ?Sized> {
    mesh: &'a M,
    pos: DVec3,
    ignore_ghost_cells: bool,
    overlap: OverlapPolicy,
    ascending: bool,
    scratch: Vec<DVec3>,
    best: Option<(f64, CellHit)>,
    tested: usize,
}

impl<'a, M: Mesh + ?Sized> Probe<'a, M> {
    /// `ascending` promises that candidates arrive in increasing cell id order.
    pub(crate) fn new(
        mesh: &'a M,
        pos: DVec3,
        ignore_ghost_cells: bool,
        overlap: OverlapPolicy,
        ascending: bool,
    ) -> Self {
        Self {
            mesh,
            pos,
            ignore_ghost_cells,
            overlap,
            ascending,
            scratch: Vec::with_capacity(8),
            best: None,
            tested: 0,
        }
    }

    /// Tests one candidate. Returns true once no further candidate can change the answer.
    pub(crate) fn offer(&mut self, cell: usize) -> bool {
        if self.ignore_ghost_cells && self.mesh.is_ghost(cell) {
            return false;
        }
        if self.overlap == OverlapPolicy::FirstEncountered
            && self.best.as_ref().is_some_and(|(_, best)| best.cell < cell)
        {
            return false;
        }
        self.tested += 1;
        let cell_type = self.mesh.cell(cell).cell_type();
        self.mesh.cell_points(cell, &mut self.scratch);
        let Some(weights) = evaluate_position(cell_type, &self.scratch, self.pos) else {
            return false;
        };
        let hit = CellHit { cell, weights };
        match self.overlap {
            OverlapPolicy::FirstEncountered => {
                self.best = Some((0.0, hit));
                self.ascending
            }
            OverlapPolicy::NearestCentroid => {
                let distance = cell::centroid(&self.scratch).distance_squared(self.pos);
                // Equal distances go to the lower cell id.
                let better = match &self.best {
                    None => true,
                    Some((d, current)) => distance < *d || (distance == *d && cell < current.cell),
                };
                if better {
                    self.best = Some((distance, hit));
                }
                false
            }
        }
    }

    pub(crate) fn tested(&self) -> usize {
        self.tested
    }

    pub(crate) fn into_hit(self) -> Option<CellHit> {
        self.best.map(|(_, hit)| hit)
    }
}
