//! Rasterization of cross-section triangles onto one depth plane.

use glam::DVec2;
use volsample_core::VARIABLE_LIMIT;

use super::bin_span;
use crate::camera_cell::CellRef;
use crate::volume::{bin_center, Volume};

/// A cross-section vertex: position on the plane and interpolated values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SliceVertex {
    pub xy: DVec2,
    pub vals: [f64; VARIABLE_LIMIT],
}

/// Edge function of `p` against the edge `a -> b`, positive to the left.
///
/// Evaluated with the endpoints in a fixed order and negated when reversed,
/// so two triangles sharing an edge get exactly opposite values.
fn edge_function(a: DVec2, b: DVec2, p: DVec2) -> f64 {
    let (lo, hi, sign) = if (a.y, a.x) <= (b.y, b.x) { (a, b, 1.0) } else { (b, a, -1.0) };
    sign * (hi - lo).perp_dot(p - lo)
}

/// Points exactly on a top or left edge belong to the triangle.
fn is_top_left(a: DVec2, b: DVec2) -> bool {
    let d = b - a;
    d.y < 0.0 || (d.y == 0.0 && d.x < 0.0)
}

fn covers(w: f64, a: DVec2, b: DVec2) -> bool {
    w > 0.0 || (w == 0.0 && is_top_left(a, b))
}

/// Writes every bin centre of plane `k` covered by `tri`, with barycentric
/// values. Returns the number of bins written.
pub(crate) fn rasterize_triangle(
    tri: &[SliceVertex; 3],
    k: usize,
    nvars: usize,
    source: CellRef,
    volume: &mut Volume,
) -> usize {
    let (a, mut b, mut c) = (&tri[0], &tri[1], &tri[2]);
    let mut area = edge_function(a.xy, b.xy, c.xy);
    if area == 0.0 || !area.is_finite() {
        return 0;
    }
    if area < 0.0 {
        std::mem::swap(&mut b, &mut c);
        area = -area;
    }

    let [nx, ny, _] = volume.dims();
    let min = a.xy.min(b.xy).min(c.xy);
    let max = a.xy.max(b.xy).max(c.xy);
    let (Some((i0, i1)), Some((j0, j1))) = (bin_span(min.x, max.x, nx), bin_span(min.y, max.y, ny)) else {
        return 0;
    };

    let mut values = [0.0; VARIABLE_LIMIT];
    let mut written = 0;
    for j in j0..=j1 {
        for i in i0..=i1 {
            let p = DVec2::new(bin_center(i, nx), bin_center(j, ny));
            let wa = edge_function(b.xy, c.xy, p);
            let wb = edge_function(c.xy, a.xy, p);
            let wc = edge_function(a.xy, b.xy, p);
            if !(covers(wa, b.xy, c.xy) && covers(wb, c.xy, a.xy) && covers(wc, a.xy, b.xy)) {
                continue;
            }
            for (v, value) in values.iter_mut().enumerate().take(nvars) {
                *value = (wa * a.vals[v] + wb * b.vals[v] + wc * c.vals[v]) / area;
            }
            if volume
                .accumulate(volume.index(i, j, k), &values[..nvars], 1.0, source)
                .wrote()
            {
                written += 1;
            }
        }
    }
    written
}
