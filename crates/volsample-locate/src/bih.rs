//! Bounding interval hierarchy over cell bounding boxes.
//!
//! Each inner node splits its cells along one axis into two children and
//! stores two clip planes: the largest max-coordinate on the left and the
//! smallest min-coordinate on the right. A query descends into every child
//! whose clip interval admits the point, so overlapping children are handled
//! without duplicating cells.
//!
//! Split positions are chosen from `number_of_buckets` evenly spaced
//! candidates along the longest axis of the node's centroid bounds, picking
//! the one that balances the two sides best.

use glam::DVec3;
use volsample_core::mesh::check_cell_types;
use volsample_core::{BihOptions, Bounds, Mesh, OverlapPolicy, Result};

use crate::probe::Probe;
use crate::{CellHit, CellLocator, VOLUMETRIC};

#[derive(Debug, Clone, Copy)]
enum BihNode {
    Inner {
        axis: usize,
        left_max: f64,
        right_min: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        start: usize,
        end: usize,
    },
}

/// BIH point locator.
pub struct BihLocator<'m, M: Mesh + ?Sized> {
    mesh: &'m M,
    bounds: Bounds,
    nodes: Vec<BihNode>,
    cell_ids: Vec<usize>,
    overlap: OverlapPolicy,
    depth: usize,
}

struct Builder<'a> {
    options: &'a BihOptions,
    cell_bounds: &'a [Bounds],
    nodes: Vec<BihNode>,
    depth: usize,
    depth_cutoffs: usize,
}

impl Builder<'_> {
    fn leaf(&mut self, start: usize, end: usize) -> usize {
        self.nodes.push(BihNode::Leaf { start, end });
        self.nodes.len() - 1
    }

    /// Builds the subtree over `ids`, which sit at `start..` in the final id array.
    fn build(&mut self, ids: &mut [usize], start: usize, depth: usize) -> usize {
        self.depth = self.depth.max(depth);
        let end = start + ids.len();
        if ids.len() <= self.options.max_cells_per_leaf {
            return self.leaf(start, end);
        }
        if depth >= self.options.max_depth {
            self.depth_cutoffs += 1;
            return self.leaf(start, end);
        }

        let cell_bounds = self.cell_bounds;
        let centroids = Bounds::from_points(ids.iter().map(|&c| cell_bounds[c].center()));
        let axis = centroids.longest_axis();
        let lo = centroids.min[axis];
        let extent = centroids.extent()[axis];
        if extent <= 0.0 || !extent.is_finite() {
            // Every centroid coincides; no split can separate them.
            return self.leaf(start, end);
        }

        let buckets = self.options.number_of_buckets;
        let bucket_of = |c: usize| -> usize {
            let t = (cell_bounds[c].center()[axis] - lo) / extent * buckets as f64;
            (t.max(0.0) as usize).min(buckets - 1)
        };
        let mut counts = vec![0_usize; buckets];
        for &c in ids.iter() {
            counts[bucket_of(c)] += 1;
        }

        // Both end buckets are occupied, so some split leaves both sides non-empty.
        let mut best_split = 1;
        let mut best_imbalance = usize::MAX;
        let mut left = 0;
        for split in 1..buckets {
            left += counts[split - 1];
            let right = ids.len() - left;
            if left == 0 || right == 0 {
                continue;
            }
            let imbalance = left.abs_diff(right);
            if imbalance < best_imbalance {
                best_imbalance = imbalance;
                best_split = split;
            }
        }

        // Stable partition keeps ids ascending inside each side.
        let (lower, upper): (Vec<usize>, Vec<usize>) =
            ids.iter().copied().partition(|&c| bucket_of(c) < best_split);
        let mid = lower.len();
        ids[..mid].copy_from_slice(&lower);
        ids[mid..].copy_from_slice(&upper);

        let left_max = lower
            .iter()
            .map(|&c| cell_bounds[c].max[axis])
            .fold(f64::NEG_INFINITY, f64::max);
        let right_min = upper
            .iter()
            .map(|&c| cell_bounds[c].min[axis])
            .fold(f64::INFINITY, f64::min);

        let index = self.nodes.len();
        self.nodes.push(BihNode::Leaf { start, end });
        let (left_ids, right_ids) = ids.split_at_mut(mid);
        let left = self.build(left_ids, start, depth + 1);
        let right = self.build(right_ids, start + mid, depth + 1);
        self.nodes[index] = BihNode::Inner {
            axis,
            left_max,
            right_min,
            left,
            right,
        };
        index
    }
}

impl<'m, M: Mesh + ?Sized> BihLocator<'m, M> {
    /// Builds the hierarchy over every cell of `mesh`.
    pub fn build(mesh: &'m M, options: &BihOptions, overlap: OverlapPolicy) -> Result<Self> {
        check_cell_types(mesh, &VOLUMETRIC)?;

        let cell_bounds: Vec<Bounds> = (0..mesh.num_cells()).map(|c| mesh.cell_bounds(c)).collect();
        let mut cell_ids: Vec<usize> = (0..mesh.num_cells()).collect();

        let mut builder = Builder {
            options,
            cell_bounds: &cell_bounds,
            nodes: Vec::new(),
            depth: 0,
            depth_cutoffs: 0,
        };
        builder.build(&mut cell_ids, 0, 0);

        if builder.depth_cutoffs > 0 {
            log::warn!(
                "BIH build stopped {} oversized leaves at depth {}",
                builder.depth_cutoffs,
                options.max_depth
            );
        }
        log::debug!(
            "BIH locator: {} nodes, depth {}, {} cells",
            builder.nodes.len(),
            builder.depth,
            cell_ids.len()
        );

        Ok(Self {
            mesh,
            bounds: mesh.bounds(),
            nodes: builder.nodes,
            cell_ids,
            overlap,
            depth: builder.depth,
        })
    }

    /// Number of tree nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest node.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Largest number of cells held by a single leaf.
    pub fn max_leaf_size(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                BihNode::Leaf { start, end } => Some(end - start),
                BihNode::Inner { .. } => None,
            })
            .max()
            .unwrap_or(0)
    }
}

impl<M: Mesh + ?Sized> CellLocator for BihLocator<'_, M> {
    fn find_cell(&self, pos: DVec3, ignore_ghost_cells: bool) -> Option<CellHit> {
        if self.nodes.is_empty() || !self.bounds.contains(pos) {
            return None;
        }
        let mut probe = Probe::new(self.mesh, pos, ignore_ghost_cells, self.overlap, false);
        let mut stack = Vec::with_capacity(self.depth + 2);
        stack.push(0);

        while let Some(index) = stack.pop() {
            match self.nodes[index] {
                BihNode::Inner {
                    axis,
                    left_max,
                    right_min,
                    left,
                    right,
                } => {
                    // Left is visited first, so push it last.
                    if pos[axis] >= right_min {
                        stack.push(right);
                    }
                    if pos[axis] <= left_max {
                        stack.push(left);
                    }
                }
                BihNode::Leaf { start, end } => {
                    for &cell in &self.cell_ids[start..end] {
                        if probe.offer(cell) {
                            return probe.into_hit();
                        }
                    }
                }
            }
        }
        probe.into_hit()
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }
}
