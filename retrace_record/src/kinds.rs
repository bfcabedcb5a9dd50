// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawable leaf record kinds.
//!
//! A leaf record stores its geometry in the coordinates the caller drew in,
//! together with the [`GraphicsState`] captured at that moment. The captured
//! transform maps record coordinates to stream coordinates; extents and hit
//! tests run through it, and replay re-applies it to the medium so the
//! original drawing call can be re-issued verbatim.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _; // for `sqrt`
use kurbo::{
    Affine, BezPath, CubicBez, Line, ParamCurveExtrema, ParamCurveNearest, Point, Rect, Shape,
    Vec2,
};

use retrace_medium::{EllipseArc, GraphicsState, Medium};

use crate::extent::Extent;
use crate::stroke::stroked_poly_bounds;
use crate::text::TextLine;

/// Accuracy for nearest-point queries in refined hit tests.
const NEAREST_ACCURACY: f64 = 1e-9;

/// Geometry of one leaf record, in record coordinates.
///
/// `Poly` covers both polylines (stroked, open or closed) and polygons
/// (filled). `Bezigon` is a closed piecewise-cubic outline: one on-curve
/// start point followed by (control, control, on-curve) triples.
#[derive(Clone, Debug, PartialEq)]
pub enum LeafKind {
    /// A single point.
    Point(Point),
    /// A set of points drawn as one record.
    Points(Vec<Point>),
    /// A stroked line segment.
    Line(Line),
    /// A set of disconnected stroked segments.
    Lines(Vec<Line>),
    /// A polyline (stroked) or polygon (filled).
    Poly {
        /// The vertices in drawing order.
        points: Vec<Point>,
        /// Whether the last vertex joins back to the first.
        closed: bool,
        /// Filled interior rather than stroked outline.
        filled: bool,
    },
    /// A closed piecewise-cubic outline.
    Bezigon {
        /// One on-curve start point followed by (control, control,
        /// on-curve) triples.
        points: Vec<Point>,
        /// Filled interior rather than stroked outline.
        filled: bool,
    },
    /// An axis-aligned rectangle in record coordinates.
    Rect {
        /// The rectangle.
        rect: Rect,
        /// Filled interior rather than stroked outline.
        filled: bool,
    },
    /// An elliptical arc.
    Ellipse {
        /// The arc.
        arc: EllipseArc,
        /// Filled interior rather than stroked boundary.
        filled: bool,
    },
    /// A line of styled text runs.
    Text(TextLine),
}

/// A leaf record: geometry plus the graphics state captured when it was
/// produced.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafRecord {
    /// What was drawn, in record coordinates.
    pub kind: LeafKind,
    /// The graphics state active when the record was produced.
    pub state: GraphicsState,
}

impl LeafRecord {
    /// A record of `kind` drawn under `state`.
    pub fn new(kind: LeafKind, state: GraphicsState) -> Self {
        Self { kind, state }
    }

    /// The record's extent in stream coordinates, accounting for the
    /// captured transform, line thickness, joints, and caps.
    pub fn compute_extent(&self) -> Extent {
        let t = self.state.transform;
        let style = &self.state.line_style;
        let hw = style.half_thickness();
        match &self.kind {
            LeafKind::Point(p) => point_extent(t * *p, hw),
            LeafKind::Points(pts) => pts
                .iter()
                .map(|&p| point_extent(t * p, hw))
                .fold(Extent::null_at(t * Point::ORIGIN), |acc, e| acc.union(e)),
            LeafKind::Line(l) => {
                Extent::from(stroked_poly_bounds(&[t * l.p0, t * l.p1], false, style))
            }
            LeafKind::Lines(lines) => lines
                .iter()
                .map(|l| Extent::from(stroked_poly_bounds(&[t * l.p0, t * l.p1], false, style)))
                .fold(Extent::null_at(t * Point::ORIGIN), |acc, e| acc.union(e)),
            LeafKind::Poly {
                points,
                closed,
                filled,
            } => {
                let tp = transform_pts(t, points);
                if *filled {
                    extrema(&tp)
                } else {
                    Extent::from(stroked_poly_bounds(&tp, *closed, style))
                }
            }
            LeafKind::Bezigon { points, filled } => {
                let tp = transform_pts(t, points);
                let mut e = bezigon_extent(&tp);
                if !*filled && hw > 0.0 {
                    e = Extent::from(e.rect().inflate(hw, hw));
                }
                e
            }
            LeafKind::Rect { rect, filled } => {
                if self.state.is_axis_rectilinear() {
                    let r = Rect::from_points(
                        t * Point::new(rect.x0, rect.y0),
                        t * Point::new(rect.x1, rect.y1),
                    );
                    if *filled || hw <= 0.0 {
                        Extent::from(r)
                    } else {
                        Extent::from(r.inflate(hw, hw))
                    }
                } else {
                    // A rotated rectangle is no longer axis aligned; fall
                    // back to the general polygon computation.
                    let corners = transform_pts(t, &rect_corners(*rect));
                    if *filled {
                        extrema(&corners)
                    } else {
                        Extent::from(stroked_poly_bounds(&corners, true, style))
                    }
                }
            }
            LeafKind::Ellipse { arc, filled } => {
                let a = arc.transformed(t);
                let r = a.bounding_box();
                if *filled || hw <= 0.0 {
                    Extent::from(r)
                } else {
                    Extent::from(r.inflate(hw, hw))
                }
            }
            LeafKind::Text(line) => {
                let shifted = (t * line.start()) - line.start();
                line.extent().translate(shifted)
            }
        }
    }

    /// Rigidly shift the record by `delta` in stream coordinates.
    ///
    /// Geometry is untouched; the captured transform gains a post
    /// translation, so extents, hit tests, and replay all move together.
    pub fn translate(&mut self, delta: Vec2) {
        self.state.transform = Affine::translate(delta) * self.state.transform;
    }

    /// Re-issue this record's drawing call against `medium`.
    ///
    /// Sets the captured ink, line style, and transform first. Text records
    /// additionally set each run's text style as they go.
    pub fn replay<M: Medium>(&self, medium: &mut M) {
        medium.set_ink(&self.state.ink);
        medium.set_line_style(&self.state.line_style);
        medium.set_transform(self.state.transform);
        match &self.kind {
            LeafKind::Point(p) => medium.draw_point(*p),
            LeafKind::Points(pts) => medium.draw_points(pts),
            LeafKind::Line(l) => medium.draw_line(*l),
            LeafKind::Lines(lines) => medium.draw_lines(lines),
            LeafKind::Poly {
                points,
                closed,
                filled,
            } => {
                if *filled {
                    medium.draw_polygon(points);
                } else {
                    medium.draw_polyline(points, *closed);
                }
            }
            LeafKind::Bezigon { points, filled } => medium.draw_bezigon(points, *filled),
            LeafKind::Rect { rect, filled } => medium.draw_rect(*rect, *filled),
            LeafKind::Ellipse { arc, filled } => medium.draw_ellipse(arc, *filled),
            LeafKind::Text(line) => line.replay(medium),
        }
    }

    /// Refined position test: whether the point (stream coordinates)
    /// actually hits the drawn shape, not just its bounding box.
    ///
    /// Filled shapes test true containment; stroked shapes test distance to
    /// the ideal line against half the thickness. Text falls back to the
    /// extent, which the caller has already checked.
    pub fn refined_hit(&self, x: f64, y: f64) -> bool {
        let t = self.state.transform;
        let pt = Point::new(x, y);
        let hw = self.state.line_style.half_thickness();
        match &self.kind {
            LeafKind::Point(p) => point_hit(t * *p, pt, hw),
            LeafKind::Points(pts) => pts.iter().any(|&p| point_hit(t * p, pt, hw)),
            LeafKind::Line(l) => segment_hit(t * l.p0, t * l.p1, pt, hw),
            LeafKind::Lines(lines) => lines
                .iter()
                .any(|l| segment_hit(t * l.p0, t * l.p1, pt, hw)),
            LeafKind::Poly {
                points,
                closed,
                filled,
            } => {
                let tp = transform_pts(t, points);
                if *filled {
                    poly_path(&tp).contains(pt)
                } else {
                    poly_stroke_hit(&tp, *closed, pt, hw)
                }
            }
            LeafKind::Bezigon { points, filled } => {
                let tp = transform_pts(t, points);
                if *filled {
                    bezigon_path(&tp).contains(pt)
                } else {
                    bezigon_stroke_hit(&tp, pt, hw)
                }
            }
            LeafKind::Rect { rect, filled } => {
                let corners = transform_pts(t, &rect_corners(*rect));
                if *filled {
                    poly_path(&corners).contains(pt)
                } else {
                    poly_stroke_hit(&corners, true, pt, hw)
                }
            }
            LeafKind::Ellipse { arc, filled } => {
                let a = arc.transformed(t);
                if *filled {
                    a.contains(pt)
                } else {
                    ellipse_stroke_hit(&a, pt, hw)
                }
            }
            LeafKind::Text(_) => true,
        }
    }
}

fn transform_pts(t: Affine, pts: &[Point]) -> Vec<Point> {
    pts.iter().map(|&p| t * p).collect()
}

fn rect_corners(r: Rect) -> [Point; 4] {
    [
        Point::new(r.x0, r.y0),
        Point::new(r.x1, r.y0),
        Point::new(r.x1, r.y1),
        Point::new(r.x0, r.y1),
    ]
}

fn point_extent(p: Point, hw: f64) -> Extent {
    if hw > 0.0 {
        Extent::from(Rect::new(p.x - hw, p.y - hw, p.x + hw, p.y + hw))
    } else {
        Extent::null_at(p)
    }
}

fn extrema(pts: &[Point]) -> Extent {
    let Some(&first) = pts.first() else {
        return Extent::null_at(Point::ORIGIN);
    };
    let mut r = Rect::from_points(first, first);
    for &p in &pts[1..] {
        r = r.union_pt(p);
    }
    Extent::from(r)
}

/// Per-segment cubic extrema, unioned. `pts` is an on-curve point followed
/// by (control, control, on-curve) triples; a malformed tail falls back to
/// point extrema so bounds never under-report.
fn bezigon_extent(pts: &[Point]) -> Extent {
    let Some(&first) = pts.first() else {
        return Extent::null_at(Point::ORIGIN);
    };
    let mut e = Extent::null_at(first);
    let mut p0 = first;
    let mut rest = &pts[1..];
    while rest.len() >= 3 {
        let seg = CubicBez::new(p0, rest[0], rest[1], rest[2]);
        // Qualified: `Shape` is also in scope for `CubicBez`.
        e = e.union(Extent::from(ParamCurveExtrema::bounding_box(&seg)));
        p0 = rest[2];
        rest = &rest[3..];
    }
    if !rest.is_empty() {
        e = e.union(extrema(rest)).union(Extent::from(Rect::from_points(p0, p0)));
    }
    e
}

fn poly_path(pts: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((&first, rest)) = pts.split_first() {
        path.move_to(first);
        for &p in rest {
            path.line_to(p);
        }
        path.close_path();
    }
    path
}

fn bezigon_path(pts: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((&first, mut rest)) = pts.split_first() {
        path.move_to(first);
        while rest.len() >= 3 {
            path.curve_to(rest[0], rest[1], rest[2]);
            rest = &rest[3..];
        }
        path.close_path();
    }
    path
}

fn point_hit(p: Point, pt: Point, hw: f64) -> bool {
    (pt - p).hypot() <= hw.max(NEAREST_ACCURACY)
}

fn segment_hit(a: Point, b: Point, pt: Point, hw: f64) -> bool {
    let near = Line::new(a, b).nearest(pt, NEAREST_ACCURACY);
    near.distance_sq.sqrt() <= hw.max(NEAREST_ACCURACY)
}

fn poly_stroke_hit(pts: &[Point], closed: bool, pt: Point, hw: f64) -> bool {
    if pts.len() < 2 {
        return pts.first().is_some_and(|&p| point_hit(p, pt, hw));
    }
    let n = pts.len();
    let seg_count = if closed { n } else { n - 1 };
    (0..seg_count).any(|i| segment_hit(pts[i], pts[(i + 1) % n], pt, hw))
}

fn bezigon_stroke_hit(pts: &[Point], pt: Point, hw: f64) -> bool {
    let Some((&first, mut rest)) = pts.split_first() else {
        return false;
    };
    let mut p0 = first;
    while rest.len() >= 3 {
        let seg = CubicBez::new(p0, rest[0], rest[1], rest[2]);
        let near = seg.nearest(pt, NEAREST_ACCURACY);
        if near.distance_sq.sqrt() <= hw.max(NEAREST_ACCURACY) {
            return true;
        }
        p0 = rest[2];
        rest = &rest[3..];
    }
    // Implicit closing segment back to the start.
    let last = if pts.len() >= 4 { p0 } else { first };
    segment_hit(last, first, pt, hw)
}

/// Approximate stroke test for an ellipse boundary: distance from the
/// boundary in basis units, scaled by the shorter radius.
fn ellipse_stroke_hit(arc: &EllipseArc, pt: Point, hw: f64) -> bool {
    let Some(norm) = arc.basis_norm(pt) else {
        return false;
    };
    let r_min = arc.radius1.hypot().min(arc.radius2.hypot());
    (norm - 1.0).abs() * r_min <= hw.max(NEAREST_ACCURACY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrace_medium::LineStyle;

    fn stroked(thickness: f64) -> GraphicsState {
        GraphicsState {
            line_style: LineStyle {
                thickness,
                ..LineStyle::default()
            },
            ..GraphicsState::default()
        }
    }

    #[test]
    fn zero_width_line_extent_is_exact() {
        let rec = LeafRecord::new(
            LeafKind::Line(Line::new((0.0, 0.0), (5.0, 5.0))),
            stroked(0.0),
        );
        assert_eq!(rec.compute_extent().rect(), Rect::new(0.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn point_extent_pads_by_half_thickness() {
        let rec = LeafRecord::new(LeafKind::Point(Point::new(4.0, 4.0)), stroked(2.0));
        assert_eq!(rec.compute_extent().rect(), Rect::new(3.0, 3.0, 5.0, 5.0));
        let zero = LeafRecord::new(LeafKind::Point(Point::new(4.0, 4.0)), stroked(0.0));
        assert!(zero.compute_extent().is_null());
    }

    #[test]
    fn bezigon_extent_uses_curve_extrema() {
        // A single cubic bulging above its endpoints: the extent must reach
        // the curve's apex, not just the control polygon's corners.
        let pts = alloc::vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 8.0),
            Point::new(10.0, 8.0),
            Point::new(10.0, 0.0),
        ];
        let rec = LeafRecord::new(
            LeafKind::Bezigon {
                points: pts,
                filled: true,
            },
            stroked(0.0),
        );
        let r = rec.compute_extent().rect();
        assert_eq!(r.x0, 0.0);
        assert_eq!(r.x1, 10.0);
        // Apex of this symmetric cubic is 3/4 of the control height.
        assert!((r.y1 - 6.0).abs() < 1e-9, "apex y = {}", r.y1);
        // Tighter than the control polygon.
        assert!(r.y1 < 8.0);
    }

    #[test]
    fn rotated_rect_degrades_to_polygon_bounds() {
        let mut state = stroked(0.0);
        state.transform = Affine::rotate(core::f64::consts::FRAC_PI_4);
        let rec = LeafRecord::new(
            LeafKind::Rect {
                rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                filled: true,
            },
            state,
        );
        let r = rec.compute_extent().rect();
        let half_diag = 10.0 * core::f64::consts::SQRT_2 / 2.0;
        // Rotated about the origin corner: spans the full diagonal in y.
        assert!((r.y1 - 10.0 * core::f64::consts::SQRT_2).abs() < 1e-9);
        assert!((r.x0 + half_diag).abs() < 1e-9);
        assert!((r.x1 - half_diag).abs() < 1e-9);
    }

    #[test]
    fn translate_moves_extent_without_touching_geometry() {
        let mut rec = LeafRecord::new(
            LeafKind::Line(Line::new((0.0, 0.0), (5.0, 5.0))),
            stroked(0.0),
        );
        let before = rec.kind.clone();
        rec.translate(Vec2::new(10.0, 20.0));
        assert_eq!(rec.kind, before);
        assert_eq!(rec.compute_extent().rect(), Rect::new(10.0, 20.0, 15.0, 25.0));
    }

    #[test]
    fn refined_hit_on_stroked_line() {
        let rec = LeafRecord::new(
            LeafKind::Line(Line::new((0.0, 0.0), (10.0, 0.0))),
            stroked(2.0),
        );
        assert!(rec.refined_hit(5.0, 0.9));
        assert!(!rec.refined_hit(5.0, 1.1));
        assert!(!rec.refined_hit(12.0, 0.0));
    }

    #[test]
    fn refined_hit_on_filled_polygon() {
        let rec = LeafRecord::new(
            LeafKind::Poly {
                points: alloc::vec![
                    Point::new(0.0, 0.0),
                    Point::new(10.0, 0.0),
                    Point::new(0.0, 10.0),
                ],
                closed: true,
                filled: true,
            },
            stroked(0.0),
        );
        assert!(rec.refined_hit(2.0, 2.0));
        // Inside the bounding box but outside the triangle.
        assert!(!rec.refined_hit(9.0, 9.0));
    }

    #[test]
    fn refined_hit_on_ellipse() {
        let filled = LeafRecord::new(
            LeafKind::Ellipse {
                arc: EllipseArc::circle(Point::new(0.0, 0.0), 5.0),
                filled: true,
            },
            stroked(0.0),
        );
        assert!(filled.refined_hit(3.0, 0.0));
        // Inside the bounding box, outside the circle.
        assert!(!filled.refined_hit(4.0, 4.0));

        let stroked_ring = LeafRecord::new(
            LeafKind::Ellipse {
                arc: EllipseArc::circle(Point::new(0.0, 0.0), 5.0),
                filled: false,
            },
            stroked(2.0),
        );
        assert!(stroked_ring.refined_hit(5.0, 0.0));
        assert!(!stroked_ring.refined_hit(0.0, 0.0));
    }

    #[test]
    fn replay_reissues_the_original_call() {
        use retrace_medium::{MediumOp, TraceMedium};

        let rec = LeafRecord::new(
            LeafKind::Rect {
                rect: Rect::new(1.0, 2.0, 3.0, 4.0),
                filled: true,
            },
            stroked(1.0),
        );
        let mut m = TraceMedium::new();
        rec.replay(&mut m);
        assert!(matches!(
            m.ops().last(),
            Some(MediumOp::Rect {
                rect,
                filled: true,
            }) if *rect == Rect::new(1.0, 2.0, 3.0, 4.0)
        ));
        // State precedes drawing.
        assert!(matches!(m.ops()[0], MediumOp::SetInk(_)));
    }
}
