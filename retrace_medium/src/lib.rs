// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retrace Medium: the drawing surface abstraction output records replay
//! against.
//!
//! This crate sits between the record tree (which captures *what* was drawn)
//! and concrete rendering backends (which decide *how* pixels appear). It
//! defines:
//!
//! - **Graphics state**: [`Ink`], [`LineStyle`], [`TextStyle`], and the
//!   captured [`GraphicsState`] bundle, in the [`style`] module.
//! - **The [`Medium`] trait**: state setters plus one drawing method per
//!   primitive kind. A replay walks records in drawing order, re-applies each
//!   record's captured state, and calls the matching drawing method.
//! - **Pixmaps**: opaque off-screen raster handles ([`PixmapId`]) with
//!   allocate/copy/free operations, used for overlay and drag feedback.
//! - **[`TraceMedium`]**: a medium that records every call it receives, used
//!   throughout the workspace's tests to assert on replay output.
//!
//! The trait is deliberately plain: no retained resources beyond pixmaps, no
//! layer stack. Records carry their own state, so a medium only needs to
//! honor the most recent setter calls.

#![no_std]

extern crate alloc;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _; // for `sqrt`, `cos`, `sin`
use kurbo::{Line, Point, Rect, Vec2};

pub mod style;
mod trace;

pub use style::{
    CapShape, DEFAULT_MITER_LIMIT, GraphicsState, Ink, JointShape, LineStyle, TextStyle,
};
pub use trace::{MediumOp, TraceMedium};

/// Identifier for an off-screen pixmap owned by a [`Medium`].
///
/// Handles are only meaningful to the medium that allocated them.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PixmapId(pub u32);

/// An elliptical arc described by a center and two radius vectors.
///
/// The boundary point at parameter `theta` is
/// `center + radius1 * cos(theta) + radius2 * sin(theta)`. The radius
/// vectors need not be perpendicular, so the representation is closed under
/// affine maps: transforming the center and both vectors transforms the
/// ellipse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EllipseArc {
    /// Center of the ellipse.
    pub center: Point,
    /// First radius vector, from the center to the boundary at `theta = 0`.
    pub radius1: Vec2,
    /// Second radius vector, from the center to the boundary at
    /// `theta = pi / 2`.
    pub radius2: Vec2,
    /// Start parameter in radians.
    pub start_angle: f64,
    /// End parameter in radians. A sweep of a full turn or more is a closed
    /// ellipse.
    pub end_angle: f64,
}

impl EllipseArc {
    /// A full ellipse with the given center and radius vectors.
    pub fn full(center: Point, radius1: Vec2, radius2: Vec2) -> Self {
        Self {
            center,
            radius1,
            radius2,
            start_angle: 0.0,
            end_angle: core::f64::consts::TAU,
        }
    }

    /// A full circle.
    pub fn circle(center: Point, radius: f64) -> Self {
        Self::full(center, Vec2::new(radius, 0.0), Vec2::new(0.0, radius))
    }

    /// Whether the arc sweeps the whole ellipse.
    pub fn is_full(&self) -> bool {
        (self.end_angle - self.start_angle).abs() >= core::f64::consts::TAU - 1e-9
    }

    /// The boundary point at parameter `theta`.
    pub fn boundary_point(&self, theta: f64) -> Point {
        self.center + self.radius1 * theta.cos() + self.radius2 * theta.sin()
    }

    /// Tight axis-aligned bounds of the full ellipse.
    ///
    /// Partial arcs use the full-ellipse bounds too; they are conservative
    /// but never under-report.
    pub fn bounding_box(&self) -> Rect {
        let hx = (self.radius1.x * self.radius1.x + self.radius2.x * self.radius2.x).sqrt();
        let hy = (self.radius1.y * self.radius1.y + self.radius2.y * self.radius2.y).sqrt();
        Rect::new(
            self.center.x - hx,
            self.center.y - hy,
            self.center.x + hx,
            self.center.y + hy,
        )
    }

    /// The point's distance from the center measured in the radius-vector
    /// basis: `1.0` lies exactly on the boundary, less is inside. `None`
    /// when the radius basis is degenerate.
    pub fn basis_norm(&self, p: Point) -> Option<f64> {
        let det = self.radius1.x * self.radius2.y - self.radius2.x * self.radius1.y;
        if det.abs() < 1e-12 {
            return None;
        }
        let d = p - self.center;
        let a = (d.x * self.radius2.y - d.y * self.radius2.x) / det;
        let b = (d.y * self.radius1.x - d.x * self.radius1.y) / det;
        Some((a * a + b * b).sqrt())
    }

    /// Whether the point lies inside or on the (full) ellipse. Degenerate
    /// radius bases contain nothing.
    pub fn contains(&self, p: Point) -> bool {
        self.basis_norm(p).is_some_and(|n| n <= 1.0)
    }

    /// This arc mapped through an affine transform: the center maps as a
    /// point and the radius vectors through the linear part.
    #[must_use]
    pub fn transformed(&self, t: kurbo::Affine) -> Self {
        let origin = t * Point::ORIGIN;
        Self {
            center: t * self.center,
            radius1: (t * (Point::ORIGIN + self.radius1)) - origin,
            radius2: (t * (Point::ORIGIN + self.radius2)) - origin,
            start_angle: self.start_angle,
            end_angle: self.end_angle,
        }
    }
}

/// A drawing surface that output records replay against.
///
/// `begin_replay` resets all state; after that, state setters and drawing
/// methods arrive interleaved in drawing order. Implementations must apply
/// setters to all subsequent drawing calls until the next setter.
pub trait Medium {
    /// Reset to neutral state: default ink, default styles, identity
    /// transform, no clip.
    fn begin_replay(&mut self);

    /// The ink subsequent drawing calls use.
    fn set_ink(&mut self, ink: &Ink);
    /// The line style subsequent stroked drawing calls use.
    fn set_line_style(&mut self, style: &LineStyle);
    /// The text style subsequent [`draw_text`](Self::draw_text) calls use.
    fn set_text_style(&mut self, style: &TextStyle);
    /// The transform applied to subsequent drawing calls.
    fn set_transform(&mut self, transform: kurbo::Affine);
    /// Restrict drawing to `region` (medium coordinates) until cleared.
    fn set_clip(&mut self, region: Rect);
    /// Remove the clip set by [`set_clip`](Self::set_clip).
    fn clear_clip(&mut self);

    /// Draw a single point.
    fn draw_point(&mut self, p: Point);
    /// Draw a set of points.
    fn draw_points(&mut self, pts: &[Point]);
    /// Stroke a line segment.
    fn draw_line(&mut self, line: Line);
    /// Stroke a set of disconnected segments.
    fn draw_lines(&mut self, lines: &[Line]);
    /// Stroke a polyline; `closed` joins the last point back to the first.
    fn draw_polyline(&mut self, pts: &[Point], closed: bool);
    /// Fill the polygon bounded by `pts`.
    fn draw_polygon(&mut self, pts: &[Point]);
    /// Stroke or fill a closed piecewise-cubic outline. `pts` holds one
    /// on-curve point followed by repeating (control, control, on-curve)
    /// triples; the final on-curve point closes back to the first.
    fn draw_bezigon(&mut self, pts: &[Point], filled: bool);
    /// Stroke or fill an axis-aligned rectangle.
    fn draw_rect(&mut self, rect: Rect, filled: bool);
    /// Stroke or fill an elliptical arc.
    fn draw_ellipse(&mut self, arc: &EllipseArc, filled: bool);
    /// Draw `text` with its first glyph's origin at `origin` on the
    /// baseline, in the current text style.
    fn draw_text(&mut self, origin: Point, text: &str);
    /// Clear `region` to the background.
    fn clear_region(&mut self, region: Rect);

    /// Allocate an off-screen pixmap of the given pixel size.
    fn allocate_pixmap(&mut self, width: u32, height: u32) -> PixmapId;
    /// Copy `src_rect` from the medium into `dst` at `dst_origin`.
    fn copy_to_pixmap(&mut self, dst: PixmapId, src_rect: Rect, dst_origin: Point);
    /// Copy `src_rect` from `src` onto the medium at `dst_origin`.
    fn copy_from_pixmap(&mut self, src: PixmapId, src_rect: Rect, dst_origin: Point);
    /// Release a pixmap. The handle is invalid afterwards.
    fn free_pixmap(&mut self, id: PixmapId);
}
