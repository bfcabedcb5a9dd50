// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounding rectangles of stroked polylines and polygons.
//!
//! A stroked outline extends beyond the vertex extrema by the projected half
//! thickness along each segment, by the cap shape at open ends, and by the
//! joint shape at each vertex. Miter joints are the interesting case: the
//! miter tip sits `half_thickness / sin(half_angle)` from the vertex along
//! the outward bisector, unless the turn is sharp enough that the miter
//! limit degrades the joint to bevel.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _; // for `sqrt`, `abs`
use kurbo::{Point, Rect, Vec2};

use retrace_medium::{CapShape, JointShape, LineStyle};

/// Near-parallel tolerance for joint angle classification.
const ANGLE_EPS: f64 = 1e-9;

/// Bounding rectangle of `pts` stroked with `style`.
///
/// `closed` joins the last point back to the first and treats every vertex
/// as a joint; open polylines get caps at the two ends instead. A single
/// point yields a degenerate rectangle (caps are a line treatment, not a
/// point treatment).
pub(crate) fn stroked_poly_bounds(pts: &[Point], closed: bool, style: &LineStyle) -> Rect {
    let Some(&first) = pts.first() else {
        return Rect::ZERO;
    };
    let mut bounds = Rect::from_points(first, first);
    for &p in &pts[1..] {
        bounds = bounds.union_pt(p);
    }
    let hw = style.half_thickness();
    if hw <= 0.0 || pts.len() < 2 {
        return bounds;
    }

    let n = pts.len();
    let seg_count = if closed { n } else { n - 1 };
    for i in 0..seg_count {
        let p = pts[i];
        let q = pts[(i + 1) % n];
        if let Some(u) = unit(q - p) {
            let pad = seg_pad(u, hw);
            bounds = bounds.union(pad_around(p, pad)).union(pad_around(q, pad));
        }
    }

    if closed {
        for i in 0..n {
            let v = pts[i];
            let prev = pts[(i + n - 1) % n];
            let next = pts[(i + 1) % n];
            if let (Some(u), Some(w)) = (unit(v - prev), unit(next - v)) {
                bounds = bounds.union(joint_bounds(v, u, w, hw, style));
            }
        }
    } else {
        for i in 1..n - 1 {
            let v = pts[i];
            if let (Some(u), Some(w)) = (unit(v - pts[i - 1]), unit(pts[i + 1] - v)) {
                bounds = bounds.union(joint_bounds(v, u, w, hw, style));
            }
        }
        if let Some(u) = unit(pts[1] - pts[0]) {
            bounds = bounds.union(cap_bounds(pts[0], -u, hw, style.cap));
        }
        if let Some(u) = unit(pts[n - 1] - pts[n - 2]) {
            bounds = bounds.union(cap_bounds(pts[n - 1], u, hw, style.cap));
        }
    }

    bounds
}

fn unit(d: Vec2) -> Option<Vec2> {
    let len = d.hypot();
    (len > 0.0).then(|| d / len)
}

/// Half-thickness padding perpendicular to a segment with unit direction
/// `u`: a horizontal segment pads vertically and vice versa.
fn seg_pad(u: Vec2, hw: f64) -> Vec2 {
    Vec2::new(hw * u.y.abs(), hw * u.x.abs())
}

fn pad_around(p: Point, pad: Vec2) -> Rect {
    Rect::new(p.x - pad.x, p.y - pad.y, p.x + pad.x, p.y + pad.y)
}

/// Extra coverage of an end cap at `p`, where `out` is the unit direction
/// pointing out of the line.
fn cap_bounds(p: Point, out: Vec2, hw: f64, cap: CapShape) -> Rect {
    match cap {
        CapShape::Butt => pad_around(p, seg_pad(out, hw)),
        CapShape::Round => pad_around(p, Vec2::new(hw, hw)),
        CapShape::Square => {
            let tip = p + out * hw;
            pad_around(p, seg_pad(out, hw)).union(pad_around(tip, seg_pad(out, hw)))
        }
    }
}

/// Coverage of the joint at vertex `v`, with `u` the incoming and `w` the
/// outgoing unit direction.
fn joint_bounds(v: Point, u: Vec2, w: Vec2, hw: f64, style: &LineStyle) -> Rect {
    let bevel = || {
        pad_around(
            v,
            Vec2::new(hw * u.y.abs().max(w.y.abs()), hw * u.x.abs().max(w.x.abs())),
        )
    };
    match style.joint {
        JointShape::Round => pad_around(v, Vec2::new(hw, hw)),
        JointShape::Bevel | JointShape::None => bevel(),
        JointShape::Miter => {
            let dot = u.dot(w).clamp(-1.0, 1.0);
            if dot > 1.0 - ANGLE_EPS {
                // Near straight: the joint adds nothing past the segments.
                return bevel();
            }
            if dot < -1.0 + ANGLE_EPS {
                // Near reversal: the miter tip is unbounded.
                return pad_around(v, Vec2::new(hw, hw));
            }
            if dot.abs() < ANGLE_EPS && axis_aligned(u) && axis_aligned(w) {
                // Axis-aligned right angle: the miter corner extends exactly
                // half a thickness past the vertex on each axis.
                return pad_around(v, Vec2::new(hw, hw));
            }
            // sin of half the angle between the two segment lines.
            let sin_half = ((1.0 + dot) * 0.5).sqrt();
            let miter_len = hw / sin_half;
            if miter_len > style.miter_limit * hw {
                return bevel();
            }
            let tip = match unit(u - w) {
                Some(bisector) => v + bisector * miter_len,
                None => v,
            };
            bevel().union_pt(tip)
        }
    }
}

fn axis_aligned(u: Vec2) -> bool {
    u.x.abs() < ANGLE_EPS || u.y.abs() < ANGLE_EPS
}
