// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounding rectangles with a representable null state.

use kurbo::{Point, Rect, Vec2};

/// A record's bounding rectangle in stream coordinates.
///
/// An `Extent` is a [`kurbo::Rect`] with min/max edge semantics plus a
/// representable **null** state: a degenerate rectangle (`x0 == x1 &&
/// y0 == y1`) pinned at an anchor point. Containers with no children sit at
/// a null extent anchored at their anchor position, and null extents are the
/// identity for [`union`](Self::union), so empty children never distort a
/// parent's rectangle.
///
/// Containment and overlap tests are edge inclusive throughout: a point on
/// an extent's edge is inside it, and two extents sharing an edge overlap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    rect: Rect,
}

impl Extent {
    /// A null extent anchored at `anchor`.
    pub fn null_at(anchor: Point) -> Self {
        Self {
            rect: Rect::new(anchor.x, anchor.y, anchor.x, anchor.y),
        }
    }

    /// Whether this extent is degenerate (a point).
    pub fn is_null(&self) -> bool {
        self.rect.x0 == self.rect.x1 && self.rect.y0 == self.rect.y1
    }

    /// The underlying rectangle. For a null extent this is the degenerate
    /// rectangle at the anchor.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// The minimum corner; the anchor for a null extent.
    pub fn position(&self) -> Point {
        Point::new(self.rect.x0, self.rect.y0)
    }

    /// Min/max union. Null extents are the identity: the union of a null
    /// extent with anything is the other operand unchanged, and the union
    /// of two nulls keeps `self`'s anchor.
    #[must_use]
    pub fn union(&self, other: Self) -> Self {
        if other.is_null() {
            *self
        } else if self.is_null() {
            other
        } else {
            Self {
                rect: self.rect.union(other.rect),
            }
        }
    }

    /// Whether `other`'s rectangle lies entirely within this one, edges
    /// inclusive.
    pub fn contains_rect(&self, other: Self) -> bool {
        self.rect.x0 <= other.rect.x0
            && other.rect.x1 <= self.rect.x1
            && self.rect.y0 <= other.rect.y0
            && other.rect.y1 <= self.rect.y1
    }

    /// Whether the point lies within this extent, edges inclusive.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.rect.x0 <= x && x <= self.rect.x1 && self.rect.y0 <= y && y <= self.rect.y1
    }

    /// Whether two extents overlap, edges inclusive. Null extents overlap
    /// nothing.
    pub fn overlaps(&self, other: Self) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.rect.x0 <= other.rect.x1
            && self.rect.x1 >= other.rect.x0
            && self.rect.y0 <= other.rect.y1
            && self.rect.y1 >= other.rect.y0
    }

    /// Whether every edge of this extent is strictly interior to `outer`.
    ///
    /// An extent strictly inside its parent cannot have been defining any of
    /// the parent's edges, which is what the grow-only fast path of extent
    /// recomputation needs to know.
    pub fn edges_within(&self, outer: Self) -> bool {
        outer.rect.x0 < self.rect.x0
            && self.rect.x1 < outer.rect.x1
            && outer.rect.y0 < self.rect.y0
            && self.rect.y1 < outer.rect.y1
    }

    /// This extent shifted by `delta`.
    #[must_use]
    pub fn translate(&self, delta: Vec2) -> Self {
        Self {
            rect: Rect::new(
                self.rect.x0 + delta.x,
                self.rect.y0 + delta.y,
                self.rect.x1 + delta.x,
                self.rect.y1 + delta.y,
            ),
        }
    }
}

impl From<Rect> for Extent {
    fn from(rect: Rect) -> Self {
        debug_assert!(
            rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite(),
            "extents must have finite coordinates"
        );
        // Normalize so min/max edge semantics hold.
        Self {
            rect: Rect::new(
                rect.x0.min(rect.x1),
                rect.y0.min(rect.y1),
                rect.x0.max(rect.x1),
                rect.y0.max(rect.y1),
            ),
        }
    }
}

impl From<Extent> for Rect {
    fn from(e: Extent) -> Self {
        e.rect
    }
}
