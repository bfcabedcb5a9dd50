// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered flat-array strategy with linear scans.

use alloc::vec::Vec;
use core::fmt::Debug;

use kurbo::Rect;

use crate::strategy::Strategy;
use crate::util::{contains_point, overlaps};

/// Ordered flat-array strategy.
///
/// Rectangles are stored in a slot-addressed vector and every query is a
/// linear scan. For the small child counts typical of hand-built containers
/// this beats any hierarchical structure, and it preserves no state beyond
/// the rectangles themselves.
#[derive(Default)]
pub struct Sequence {
    entries: Vec<Option<Rect>>,
}

impl Debug for Sequence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.entries.len();
        let alive = self.entries.iter().filter(|e| e.is_some()).count();
        f.debug_struct("Sequence")
            .field("total_slots", &total)
            .field("alive", &alive)
            .finish_non_exhaustive()
    }
}

impl Strategy for Sequence {
    fn insert(&mut self, slot: usize, rect: Rect) {
        if self.entries.len() <= slot {
            self.entries.resize_with(slot + 1, || None);
        }
        self.entries[slot] = Some(rect);
    }

    fn update(&mut self, slot: usize, rect: Rect) {
        if let Some(e) = self.entries.get_mut(slot) {
            *e = Some(rect);
        }
    }

    fn remove(&mut self, slot: usize) {
        if let Some(e) = self.entries.get_mut(slot) {
            *e = None;
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn visit_point<F: FnMut(usize)>(&self, x: f64, y: f64, mut f: F) {
        for (i, slot) in self.entries.iter().enumerate() {
            if let Some(r) = slot.as_ref()
                && contains_point(r, x, y)
            {
                f(i);
            }
        }
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, mut f: F) {
        for (i, slot) in self.entries.iter().enumerate() {
            if let Some(r) = slot.as_ref()
                && overlaps(r, &rect)
            {
                f(i);
            }
        }
    }
}
