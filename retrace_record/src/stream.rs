// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The recording stream: drawing entry points that append records and
//! forward to a medium.

use alloc::vec::Vec;

use bitflags::bitflags;
use kurbo::{Affine, Line, Point, Rect};

use retrace_medium::{EllipseArc, GraphicsState, Ink, LineStyle, Medium, TextStyle};

use crate::error::RecordError;
use crate::kinds::{LeafKind, LeafRecord};
use crate::replay::replay;
use crate::text::TextLine;
use crate::tree::{RecordId, RecordTree, StorageChoice};

bitflags! {
    /// What a drawing entry point does with its output.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StreamFlags: u8 {
        /// Append a record to the history tree.
        const RECORDING = 1 << 0;
        /// Forward the drawing call to the medium.
        const DRAWING = 1 << 1;
    }
}

/// An output stream that records what it draws.
///
/// Every drawing entry point captures the stream's current graphics state
/// into a leaf record, appends it to the open container (when
/// [`StreamFlags::RECORDING`] is set), and forwards the call to the medium
/// (when [`StreamFlags::DRAWING`] is set). Replay-driven redraws run
/// against the medium directly and so never re-record; callers that re-run
/// original drawing code during an update should clear `RECORDING` around
/// it instead.
#[derive(Debug)]
pub struct RecordingStream<M> {
    tree: RecordTree,
    /// The open container new records are appended to.
    cursor: RecordId,
    state: GraphicsState,
    flags: StreamFlags,
    medium: M,
    viewport: Rect,
}

impl<M: Medium> RecordingStream<M> {
    /// A stream drawing to `medium` within `viewport`, with an empty
    /// history anchored at the viewport's origin.
    pub fn new(medium: M, viewport: Rect) -> Self {
        let tree = RecordTree::new(Point::new(viewport.x0, viewport.y0));
        let cursor = tree.root();
        Self {
            tree,
            cursor,
            state: GraphicsState::default(),
            flags: StreamFlags::RECORDING | StreamFlags::DRAWING,
            medium,
            viewport,
        }
    }

    /// The output history.
    pub fn tree(&self) -> &RecordTree {
        &self.tree
    }

    /// Mutable access to the history, for structural edits.
    pub fn tree_mut(&mut self) -> &mut RecordTree {
        &mut self.tree
    }

    /// The backing medium.
    pub fn medium_mut(&mut self) -> &mut M {
        &mut self.medium
    }

    /// Current stream flags.
    pub fn flags(&self) -> StreamFlags {
        self.flags
    }

    /// Replace the stream flags, returning the previous set.
    pub fn set_flags(&mut self, flags: StreamFlags) -> StreamFlags {
        core::mem::replace(&mut self.flags, flags)
    }

    /// The graphics state new records will capture.
    pub fn graphics_state(&self) -> &GraphicsState {
        &self.state
    }

    /// The container new records are appended to.
    pub fn open_record(&self) -> RecordId {
        self.cursor
    }

    /// The ink subsequent records draw with.
    pub fn set_ink(&mut self, ink: Ink) {
        self.state.ink = ink;
    }

    /// The line style subsequent stroked records use.
    pub fn set_line_style(&mut self, style: LineStyle) {
        self.state.line_style = style;
    }

    /// The text style subsequent text records use.
    pub fn set_text_style(&mut self, style: TextStyle) {
        self.state.text_style = style;
    }

    /// The transform subsequent records capture.
    pub fn set_transform(&mut self, transform: Affine) {
        self.state.transform = transform;
    }

    /// Open a child container at `anchor` and make it the append target.
    pub fn open_container(&mut self, anchor: Point, choice: StorageChoice) -> RecordId {
        let id = self.tree.insert_container(anchor, choice);
        self.tree
            .add_child(self.cursor, id)
            .expect("stream invariant violated: cursor is not a live container");
        self.cursor = id;
        id
    }

    /// Close the open container, returning to its parent (or the root).
    pub fn close_container(&mut self) {
        self.cursor = self.tree.parent(self.cursor).unwrap_or(self.tree.root());
    }

    /// Draw a single point.
    pub fn draw_point(&mut self, p: Point) -> Option<RecordId> {
        self.emit(LeafKind::Point(p))
    }

    /// Draw a set of points as one record.
    pub fn draw_points(&mut self, pts: Vec<Point>) -> Option<RecordId> {
        self.emit(LeafKind::Points(pts))
    }

    /// Stroke a line segment.
    pub fn draw_line(&mut self, line: Line) -> Option<RecordId> {
        self.emit(LeafKind::Line(line))
    }

    /// Stroke a set of disconnected segments as one record.
    pub fn draw_lines(&mut self, lines: Vec<Line>) -> Option<RecordId> {
        self.emit(LeafKind::Lines(lines))
    }

    /// Stroke a polyline; `closed` joins the last point back to the first.
    pub fn draw_polyline(&mut self, points: Vec<Point>, closed: bool) -> Option<RecordId> {
        self.emit(LeafKind::Poly {
            points,
            closed,
            filled: false,
        })
    }

    /// Fill the polygon bounded by `points`.
    pub fn draw_polygon(&mut self, points: Vec<Point>) -> Option<RecordId> {
        self.emit(LeafKind::Poly {
            points,
            closed: true,
            filled: true,
        })
    }

    /// Stroke or fill a closed piecewise-cubic outline; see
    /// [`LeafKind::Bezigon`] for the point layout.
    pub fn draw_bezigon(&mut self, points: Vec<Point>, filled: bool) -> Option<RecordId> {
        self.emit(LeafKind::Bezigon { points, filled })
    }

    /// Stroke or fill an axis-aligned rectangle.
    pub fn draw_rect(&mut self, rect: Rect, filled: bool) -> Option<RecordId> {
        self.emit(LeafKind::Rect { rect, filled })
    }

    /// Stroke or fill an elliptical arc.
    pub fn draw_ellipse(&mut self, arc: EllipseArc, filled: bool) -> Option<RecordId> {
        self.emit(LeafKind::Ellipse { arc, filled })
    }

    /// Draw a measured text line. Build it with [`TextLine::append`].
    pub fn draw_text(&mut self, line: TextLine) -> Option<RecordId> {
        self.emit(LeafKind::Text(line))
    }

    /// Erase the viewport and discard the recorded history.
    pub fn window_clear(&mut self) {
        self.cursor = self.tree.root();
        let root = self.tree.root();
        self.tree
            .clear_container(root)
            .expect("stream invariant violated: root is not a live container");
        if self.flags.contains(StreamFlags::DRAWING) {
            self.medium.clear_region(self.viewport);
        }
    }

    /// Redraw `region` from the recorded history.
    ///
    /// Replays directly against the medium; nothing is re-recorded.
    pub fn window_refresh(&mut self, region: Rect) {
        if self.flags.contains(StreamFlags::DRAWING) {
            self.medium.clear_region(region);
            replay(&self.tree, self.tree.root(), &mut self.medium, region);
        }
    }

    /// Remove a record from the history and repaint the area it occupied.
    ///
    /// Returns the damaged region (the record's former extent).
    pub fn erase_output_record(&mut self, id: RecordId) -> Result<Rect, RecordError> {
        let parent = self
            .tree
            .parent(id)
            .ok_or(RecordError::NotAChild)?;
        let damaged = self
            .tree
            .extent(id)
            .ok_or(RecordError::StaleId)?
            .rect();
        if self.cursor == id || self.is_under(id, self.cursor) {
            self.cursor = parent;
        }
        self.tree.remove_child(parent, id)?;
        self.tree.delete(id)?;
        self.window_refresh(damaged);
        Ok(damaged)
    }

    fn is_under(&self, ancestor: RecordId, id: RecordId) -> bool {
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            if c == ancestor {
                return true;
            }
            cursor = self.tree.parent(c);
        }
        false
    }

    fn emit(&mut self, kind: LeafKind) -> Option<RecordId> {
        let rec = LeafRecord::new(kind, self.state.clone());
        if self.flags.contains(StreamFlags::DRAWING) {
            rec.replay(&mut self.medium);
        }
        if self.flags.contains(StreamFlags::RECORDING) {
            let id = self.tree.insert_leaf(rec);
            self.tree
                .add_child(self.cursor, id)
                .expect("stream invariant violated: cursor is not a live container");
            Some(id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrace_medium::{MediumOp, TraceMedium};

    fn stream() -> RecordingStream<TraceMedium> {
        RecordingStream::new(TraceMedium::new(), Rect::new(0.0, 0.0, 100.0, 100.0))
    }

    #[test]
    fn drawing_records_and_forwards() {
        let mut s = stream();
        let id = s.draw_line(Line::new((0.0, 0.0), (5.0, 5.0))).unwrap();
        assert!(s.tree().is_alive(id));
        assert_eq!(s.tree().parent(id), Some(s.tree().root()));
        assert!(
            s.medium_mut()
                .ops()
                .iter()
                .any(|op| matches!(op, MediumOp::Line(_)))
        );
    }

    #[test]
    fn recording_disabled_draws_without_records() {
        let mut s = stream();
        s.set_flags(StreamFlags::DRAWING);
        assert!(s.draw_point(Point::new(1.0, 1.0)).is_none());
        assert_eq!(s.tree().child_count(s.tree().root()), 0);
        assert!(
            s.medium_mut()
                .ops()
                .iter()
                .any(|op| matches!(op, MediumOp::Point(_)))
        );
    }

    #[test]
    fn drawing_disabled_records_without_ops() {
        let mut s = stream();
        s.set_flags(StreamFlags::RECORDING);
        let id = s.draw_point(Point::new(1.0, 1.0));
        assert!(id.is_some());
        assert!(s.medium_mut().ops().is_empty());
    }

    #[test]
    fn containers_nest_and_close() {
        let mut s = stream();
        let root = s.tree().root();
        let inner = s.open_container(Point::ORIGIN, StorageChoice::Sequence);
        let rec = s.draw_point(Point::new(2.0, 2.0)).unwrap();
        assert_eq!(s.tree().parent(rec), Some(inner));
        s.close_container();
        assert_eq!(s.open_record(), root);
    }

    #[test]
    fn window_clear_resets_history_and_screen() {
        let mut s = stream();
        s.draw_point(Point::new(2.0, 2.0)).unwrap();
        s.window_clear();
        assert_eq!(s.tree().child_count(s.tree().root()), 0);
        assert!(
            s.medium_mut()
                .ops()
                .iter()
                .any(|op| *op == MediumOp::ClearRegion(Rect::new(0.0, 0.0, 100.0, 100.0)))
        );
    }

    #[test]
    fn window_refresh_replays_without_recording() {
        let mut s = stream();
        s.draw_point(Point::new(2.0, 2.0)).unwrap();
        let before = s.tree().child_count(s.tree().root());
        s.medium_mut().reset();
        s.window_refresh(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(s.tree().child_count(s.tree().root()), before);
        assert!(
            s.medium_mut()
                .ops()
                .iter()
                .any(|op| matches!(op, MediumOp::Point(_)))
        );
    }

    #[test]
    fn erase_repaints_survivors() {
        let mut s = stream();
        let a = s.draw_point(Point::new(2.0, 2.0)).unwrap();
        let b = s.draw_point(Point::new(2.5, 2.0)).unwrap();
        s.medium_mut().reset();

        let damaged = s.erase_output_record(a).unwrap();
        assert_eq!(damaged, Rect::new(1.5, 1.5, 2.5, 2.5));
        assert!(!s.tree().is_alive(a));
        assert!(s.tree().is_alive(b));
        // The overlapping survivor was redrawn into the damaged region.
        assert!(
            s.medium_mut()
                .ops()
                .iter()
                .any(|op| *op == MediumOp::Point(Point::new(2.5, 2.0)))
        );
        // Erasing the root is refused.
        let root = s.tree().root();
        assert_eq!(s.erase_output_record(root), Err(RecordError::NotAChild));
    }
}
