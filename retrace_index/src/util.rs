// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;

/// Whether `rect` contains the point, edges inclusive.
///
/// A point exactly on an edge of the rectangle is contained by it. This
/// differs from [`kurbo::Rect::contains`], which treats maximum edges as
/// exclusive; hit testing wants the inclusive reading.
#[inline]
pub(crate) fn contains_point(rect: &Rect, x: f64, y: f64) -> bool {
    rect.x0 <= x && x <= rect.x1 && rect.y0 <= y && y <= rect.y1
}

/// Whether two rectangles overlap, edges inclusive.
///
/// Two rectangles that share (part of) an edge are considered to overlap.
#[inline]
pub(crate) fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}
