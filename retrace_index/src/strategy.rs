// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Storage strategy trait for child indexing implementations.

use kurbo::Rect;

/// Storage abstraction used by [`ChildIndex`](crate::ChildIndex).
///
/// A strategy stores the rectangle for each live slot and answers point and
/// rectangle visitation queries. Slot allocation, payloads, generations, and
/// insertion-order bookkeeping all live in the wrapping index; strategies
/// only see `(slot, rect)` pairs.
///
/// Implementations must apply every mutation before returning: a
/// `visit_point` issued right after `update` must observe the new rectangle.
pub trait Strategy {
    /// Insert a new slot with its rectangle.
    fn insert(&mut self, slot: usize, rect: Rect);

    /// Replace an existing slot's rectangle and re-index it.
    fn update(&mut self, slot: usize, rect: Rect);

    /// Remove a slot.
    fn remove(&mut self, slot: usize);

    /// Remove all slots.
    fn clear(&mut self);

    /// Visit slots whose rectangle contains the point (edges inclusive).
    ///
    /// Visitation order is strategy-dependent; the wrapping index imposes
    /// its own ordering on results.
    fn visit_point<F: FnMut(usize)>(&self, x: f64, y: f64, f: F);

    /// Visit slots whose rectangle intersects `rect` (edges inclusive).
    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, f: F);
}
