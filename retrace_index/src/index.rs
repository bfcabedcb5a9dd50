// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The child index: generational keys, payloads, and insertion order over a
//! pluggable storage [`Strategy`].

use alloc::vec::Vec;
use core::fmt::Debug;

use kurbo::Rect;

use crate::strategies::{RTree, Sequence};
use crate::strategy::Strategy;

/// A [`ChildIndex`] backed by the flat-array strategy. The default for
/// containers with few children.
pub type SequenceIndex<P> = ChildIndex<P, Sequence>;

/// A [`ChildIndex`] backed by the rectangle-tree strategy, for containers
/// holding many records.
pub type SpatialIndex<P> = ChildIndex<P, RTree>;

/// Stable handle to an entry in a [`ChildIndex`].
///
/// Keys are generational: removing an entry invalidates its key, and a stale
/// key will not alias a later entry that reuses the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    idx: u32,
    generation: u32,
}

/// Iteration order over a [`ChildIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Insertion order; the order entries are drawn during replay.
    FirstToLast,
    /// Reverse insertion order; the order entries occlude one another, so the
    /// entry drawn on top comes first.
    MostRecentFirst,
}

#[derive(Clone, Debug)]
struct Entry<P> {
    rect: Rect,
    payload: P,
    /// Monotonic insertion sequence number, never reused.
    seq: u64,
}

#[derive(Clone, Debug)]
struct Slot<P> {
    /// Bumped on removal so stale keys miss.
    generation: u32,
    entry: Option<Entry<P>>,
}

/// An index of child rectangles with payloads.
///
/// See the [crate docs](crate) for an overview and example.
pub struct ChildIndex<P, S = Sequence> {
    slots: Vec<Slot<P>>,
    free_list: Vec<usize>,
    next_seq: u64,
    len: usize,
    strategy: S,
}

impl<P, S: Debug> Debug for ChildIndex<P, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChildIndex")
            .field("len", &self.len)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl<P, S: Strategy + Default> Default for ChildIndex<P, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, S: Strategy + Default> ChildIndex<P, S> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            next_seq: 0,
            len: 0,
            strategy: S::default(),
        }
    }
}

impl<P: Copy, S: Strategy> ChildIndex<P, S> {
    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a rectangle with its payload, returning a stable key.
    pub fn insert(&mut self, rect: Rect, payload: P) -> Key {
        let seq = self.next_seq;
        self.next_seq += 1;
        let entry = Entry { rect, payload, seq };
        let idx = match self.free_list.pop() {
            Some(idx) => {
                let slot = &mut self.slots[idx];
                debug_assert!(slot.entry.is_none(), "free list pointed at a live slot");
                slot.entry = Some(entry);
                idx
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                self.slots.len() - 1
            }
        };
        self.strategy.insert(idx, rect);
        self.len += 1;
        Key {
            idx: u32::try_from(idx).expect("child index slot count exceeds u32"),
            generation: self.slots[idx].generation,
        }
    }

    /// Replace an entry's rectangle, re-indexing it before returning.
    ///
    /// Returns `false` if the key is stale.
    pub fn update(&mut self, key: Key, rect: Rect) -> bool {
        let Some(entry) = self.entry_mut(key) else {
            return false;
        };
        entry.rect = rect;
        self.strategy.update(key.idx as usize, rect);
        true
    }

    /// Remove an entry, returning its payload. Stale keys return `None`.
    pub fn remove(&mut self, key: Key) -> Option<P> {
        let idx = key.idx as usize;
        let slot = self.slots.get_mut(idx)?;
        if slot.generation != key.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(idx);
        self.strategy.remove(idx);
        self.len -= 1;
        Some(entry.payload)
    }

    /// Remove every entry. Outstanding keys become stale.
    pub fn clear(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(idx);
            }
        }
        self.strategy.clear();
        self.len = 0;
    }

    /// Whether the key refers to a live entry.
    pub fn contains(&self, key: Key) -> bool {
        self.entry(key).is_some()
    }

    /// The rectangle stored for a key, if the key is live.
    pub fn rect_of(&self, key: Key) -> Option<Rect> {
        self.entry(key).map(|e| e.rect)
    }

    /// The payload stored for a key, if the key is live.
    pub fn payload_of(&self, key: Key) -> Option<P> {
        self.entry(key).map(|e| e.payload)
    }

    /// Entries whose rectangle contains the point (edges inclusive),
    /// topmost-first: the most recently inserted entry leads.
    pub fn query_point(&self, x: f64, y: f64) -> impl Iterator<Item = (Key, P)> + '_ {
        let mut hits: Vec<(u64, Key, P)> = Vec::new();
        self.strategy.visit_point(x, y, |idx| {
            hits.push(self.hit(idx));
        });
        hits.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        hits.into_iter().map(|(_, k, p)| (k, p))
    }

    /// Entries whose rectangle intersects `rect` (edges inclusive), in
    /// insertion order.
    pub fn query_rect(&self, rect: Rect) -> impl Iterator<Item = (Key, P)> + '_ {
        let mut hits: Vec<(u64, Key, P)> = Vec::new();
        self.strategy.visit_rect(rect, |idx| {
            hits.push(self.hit(idx));
        });
        hits.sort_unstable_by_key(|h| h.0);
        hits.into_iter().map(|(_, k, p)| (k, p))
    }

    /// All entries in the given [`Order`].
    pub fn iter(&self, order: Order) -> impl Iterator<Item = (Key, P)> + '_ {
        let mut all: Vec<(u64, Key, P)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                let e = slot.entry.as_ref()?;
                Some((
                    e.seq,
                    Key {
                        idx: idx as u32,
                        generation: slot.generation,
                    },
                    e.payload,
                ))
            })
            .collect();
        match order {
            Order::FirstToLast => all.sort_unstable_by_key(|h| h.0),
            Order::MostRecentFirst => all.sort_unstable_by(|a, b| b.0.cmp(&a.0)),
        }
        all.into_iter().map(|(_, k, p)| (k, p))
    }

    fn entry(&self, key: Key) -> Option<&Entry<P>> {
        let slot = self.slots.get(key.idx as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, key: Key) -> Option<&mut Entry<P>> {
        let slot = self.slots.get_mut(key.idx as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    fn hit(&self, idx: usize) -> (u64, Key, P) {
        let slot = &self.slots[idx];
        let e = slot
            .entry
            .as_ref()
            .expect("child index invariant violated: strategy visited a vacant slot");
        (
            e.seq,
            Key {
                idx: idx as u32,
                generation: slot.generation,
            },
            e.payload,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect::new(x0, y0, x1, y1)
    }

    #[test]
    fn point_queries_are_topmost_first() {
        let mut idx: SequenceIndex<u32> = ChildIndex::new();
        idx.insert(rect(0.0, 0.0, 10.0, 10.0), 1);
        idx.insert(rect(5.0, 5.0, 15.0, 15.0), 2);
        idx.insert(rect(2.0, 2.0, 8.0, 8.0), 3);

        let hits: Vec<u32> = idx.query_point(6.0, 6.0).map(|(_, p)| p).collect();
        assert_eq!(hits, vec![3, 2, 1]);

        // Off to the side only the widest box is hit.
        let hits: Vec<u32> = idx.query_point(12.0, 12.0).map(|(_, p)| p).collect();
        assert_eq!(hits, vec![2]);
    }

    #[test]
    fn rect_queries_follow_insertion_order() {
        let mut idx: SequenceIndex<u32> = ChildIndex::new();
        idx.insert(rect(0.0, 0.0, 5.0, 5.0), 1);
        idx.insert(rect(20.0, 0.0, 25.0, 5.0), 2);
        idx.insert(rect(3.0, 3.0, 6.0, 6.0), 3);

        let hits: Vec<u32> = idx
            .query_rect(rect(0.0, 0.0, 10.0, 10.0))
            .map(|(_, p)| p)
            .collect();
        assert_eq!(hits, vec![1, 3]);
    }

    #[test]
    fn update_is_synchronous() {
        let mut idx: SequenceIndex<u32> = ChildIndex::new();
        let a = idx.insert(rect(0.0, 0.0, 10.0, 10.0), 1);
        assert!(idx.update(a, rect(100.0, 100.0, 110.0, 110.0)));
        assert_eq!(idx.query_point(5.0, 5.0).count(), 0);
        assert_eq!(idx.query_point(105.0, 105.0).count(), 1);
        assert_eq!(idx.rect_of(a), Some(rect(100.0, 100.0, 110.0, 110.0)));
    }

    #[test]
    fn stale_keys_never_alias() {
        let mut idx: SequenceIndex<u32> = ChildIndex::new();
        let a = idx.insert(rect(0.0, 0.0, 1.0, 1.0), 1);
        assert_eq!(idx.remove(a), Some(1));
        // The freed slot is reused by the next insertion.
        let b = idx.insert(rect(0.0, 0.0, 1.0, 1.0), 2);
        assert!(!idx.contains(a));
        assert!(idx.contains(b));
        assert_eq!(idx.remove(a), None);
        assert!(!idx.update(a, rect(5.0, 5.0, 6.0, 6.0)));
        assert_eq!(idx.payload_of(b), Some(2));
    }

    #[test]
    fn iter_orders() {
        let mut idx: SequenceIndex<u32> = ChildIndex::new();
        idx.insert(rect(0.0, 0.0, 1.0, 1.0), 1);
        idx.insert(rect(0.0, 0.0, 1.0, 1.0), 2);
        idx.insert(rect(0.0, 0.0, 1.0, 1.0), 3);

        let fwd: Vec<u32> = idx.iter(Order::FirstToLast).map(|(_, p)| p).collect();
        assert_eq!(fwd, vec![1, 2, 3]);
        let rev: Vec<u32> = idx.iter(Order::MostRecentFirst).map(|(_, p)| p).collect();
        assert_eq!(rev, vec![3, 2, 1]);
    }

    #[test]
    fn order_survives_slot_reuse() {
        let mut idx: SequenceIndex<u32> = ChildIndex::new();
        idx.insert(rect(0.0, 0.0, 1.0, 1.0), 1);
        let b = idx.insert(rect(0.0, 0.0, 1.0, 1.0), 2);
        idx.insert(rect(0.0, 0.0, 1.0, 1.0), 3);
        idx.remove(b);
        // Reuses b's slot but must still sort last.
        idx.insert(rect(0.0, 0.0, 1.0, 1.0), 4);

        let fwd: Vec<u32> = idx.iter(Order::FirstToLast).map(|(_, p)| p).collect();
        assert_eq!(fwd, vec![1, 3, 4]);
        let hits: Vec<u32> = idx.query_point(0.5, 0.5).map(|(_, p)| p).collect();
        assert_eq!(hits, vec![4, 3, 1]);
    }

    #[test]
    fn clear_invalidates_keys() {
        let mut idx: SequenceIndex<u32> = ChildIndex::new();
        let a = idx.insert(rect(0.0, 0.0, 1.0, 1.0), 1);
        idx.insert(rect(0.0, 0.0, 1.0, 1.0), 2);
        idx.clear();
        assert!(idx.is_empty());
        assert!(!idx.contains(a));
        assert_eq!(idx.query_point(0.5, 0.5).count(), 0);
    }

    #[test]
    fn spatial_strategy_agrees_with_sequence() {
        let mut seq: SequenceIndex<usize> = ChildIndex::new();
        let mut spa: SpatialIndex<usize> = ChildIndex::new();
        for i in 0..32 {
            let o = (i % 8) as f64 * 12.0;
            let r = rect(o, (i / 8) as f64 * 12.0, o + 10.0, (i / 8) as f64 * 12.0 + 10.0);
            seq.insert(r, i);
            spa.insert(r, i);
        }
        for &(x, y) in &[(5.0, 5.0), (17.0, 17.0), (0.0, 0.0), (200.0, 200.0)] {
            let a: Vec<usize> = seq.query_point(x, y).map(|(_, p)| p).collect();
            let b: Vec<usize> = spa.query_point(x, y).map(|(_, p)| p).collect();
            assert_eq!(a, b, "strategies disagree at ({x}, {y})");
        }
    }
}
