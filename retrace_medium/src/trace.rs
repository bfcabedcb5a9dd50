// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A medium that records every call it receives, for tests.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Affine, Line, Point, Rect};

use crate::style::{Ink, LineStyle, TextStyle};
use crate::{EllipseArc, Medium, PixmapId};

/// One call received by a [`TraceMedium`].
#[derive(Clone, Debug, PartialEq)]
#[expect(missing_docs, reason = "variants mirror the `Medium` trait methods")]
pub enum MediumOp {
    BeginReplay,
    SetInk(Ink),
    SetLineStyle(LineStyle),
    SetTextStyle(TextStyle),
    SetTransform(Affine),
    SetClip(Rect),
    ClearClip,
    Point(Point),
    Points(Vec<Point>),
    Line(Line),
    Lines(Vec<Line>),
    Polyline { pts: Vec<Point>, closed: bool },
    Polygon(Vec<Point>),
    Bezigon { pts: Vec<Point>, filled: bool },
    Rect { rect: Rect, filled: bool },
    Ellipse { arc: EllipseArc, filled: bool },
    Text { origin: Point, text: String },
    ClearRegion(Rect),
    AllocatePixmap { id: PixmapId, width: u32, height: u32 },
    CopyToPixmap { dst: PixmapId, src_rect: Rect, dst_origin: Point },
    CopyFromPixmap { src: PixmapId, src_rect: Rect, dst_origin: Point },
    FreePixmap(PixmapId),
}

impl MediumOp {
    /// Whether this op produces pixels (as opposed to mutating state).
    pub fn is_drawing(&self) -> bool {
        !matches!(
            self,
            Self::BeginReplay
                | Self::SetInk(_)
                | Self::SetLineStyle(_)
                | Self::SetTextStyle(_)
                | Self::SetTransform(_)
                | Self::SetClip(_)
                | Self::ClearClip
                | Self::AllocatePixmap { .. }
                | Self::FreePixmap(_)
        )
    }
}

/// A [`Medium`] that appends every received call to a log.
///
/// Tests replay records against a `TraceMedium` and assert on the resulting
/// op sequence.
#[derive(Debug, Default)]
pub struct TraceMedium {
    ops: Vec<MediumOp>,
    next_pixmap: u32,
}

impl TraceMedium {
    /// Creates a medium with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded ops, oldest first.
    pub fn ops(&self) -> &[MediumOp] {
        &self.ops
    }

    /// Only the ops that produce pixels, in order.
    pub fn drawing_ops(&self) -> impl Iterator<Item = &MediumOp> {
        self.ops.iter().filter(|op| op.is_drawing())
    }

    /// Forget everything recorded so far.
    pub fn reset(&mut self) {
        self.ops.clear();
    }
}

impl Medium for TraceMedium {
    fn begin_replay(&mut self) {
        self.ops.push(MediumOp::BeginReplay);
    }

    fn set_ink(&mut self, ink: &Ink) {
        self.ops.push(MediumOp::SetInk(ink.clone()));
    }

    fn set_line_style(&mut self, style: &LineStyle) {
        self.ops.push(MediumOp::SetLineStyle(style.clone()));
    }

    fn set_text_style(&mut self, style: &TextStyle) {
        self.ops.push(MediumOp::SetTextStyle(style.clone()));
    }

    fn set_transform(&mut self, transform: Affine) {
        self.ops.push(MediumOp::SetTransform(transform));
    }

    fn set_clip(&mut self, region: Rect) {
        self.ops.push(MediumOp::SetClip(region));
    }

    fn clear_clip(&mut self) {
        self.ops.push(MediumOp::ClearClip);
    }

    fn draw_point(&mut self, p: Point) {
        self.ops.push(MediumOp::Point(p));
    }

    fn draw_points(&mut self, pts: &[Point]) {
        self.ops.push(MediumOp::Points(pts.to_vec()));
    }

    fn draw_line(&mut self, line: Line) {
        self.ops.push(MediumOp::Line(line));
    }

    fn draw_lines(&mut self, lines: &[Line]) {
        self.ops.push(MediumOp::Lines(lines.to_vec()));
    }

    fn draw_polyline(&mut self, pts: &[Point], closed: bool) {
        self.ops.push(MediumOp::Polyline {
            pts: pts.to_vec(),
            closed,
        });
    }

    fn draw_polygon(&mut self, pts: &[Point]) {
        self.ops.push(MediumOp::Polygon(pts.to_vec()));
    }

    fn draw_bezigon(&mut self, pts: &[Point], filled: bool) {
        self.ops.push(MediumOp::Bezigon {
            pts: pts.to_vec(),
            filled,
        });
    }

    fn draw_rect(&mut self, rect: Rect, filled: bool) {
        self.ops.push(MediumOp::Rect { rect, filled });
    }

    fn draw_ellipse(&mut self, arc: &EllipseArc, filled: bool) {
        self.ops.push(MediumOp::Ellipse { arc: *arc, filled });
    }

    fn draw_text(&mut self, origin: Point, text: &str) {
        self.ops.push(MediumOp::Text {
            origin,
            text: String::from(text),
        });
    }

    fn clear_region(&mut self, region: Rect) {
        self.ops.push(MediumOp::ClearRegion(region));
    }

    fn allocate_pixmap(&mut self, width: u32, height: u32) -> PixmapId {
        let id = PixmapId(self.next_pixmap);
        self.next_pixmap += 1;
        self.ops.push(MediumOp::AllocatePixmap { id, width, height });
        id
    }

    fn copy_to_pixmap(&mut self, dst: PixmapId, src_rect: Rect, dst_origin: Point) {
        self.ops.push(MediumOp::CopyToPixmap {
            dst,
            src_rect,
            dst_origin,
        });
    }

    fn copy_from_pixmap(&mut self, src: PixmapId, src_rect: Rect, dst_origin: Point) {
        self.ops.push(MediumOp::CopyFromPixmap {
            src,
            src_rect,
            dst_origin,
        });
    }

    fn free_pixmap(&mut self, id: PixmapId) {
        self.ops.push(MediumOp::FreePixmap(id));
    }
}
