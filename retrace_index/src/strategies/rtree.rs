// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical rectangle-tree strategy.
//!
//! This strategy groups entry rectangles under a tree of bounding nodes and
//! answers queries by descending only into nodes whose bounds intersect the
//! query primitive. A hash lookup from slot to leaf node makes removal
//! logarithmic and presence checks constant-time. It is intended for
//! containers holding many records, e.g. the scrollback history of an
//! interactive pane.

use alloc::vec::Vec;
use core::fmt::Debug;

use hashbrown::HashMap;
use kurbo::Rect;
use smallvec::SmallVec;

use crate::strategy::Strategy;
use crate::util::{contains_point, overlaps};

/// Maximum entries or children per node before a split.
const MAX_PER_NODE: usize = 8;
/// Minimum entries per leaf; underflowing leaves are dissolved and their
/// entries re-inserted.
const MIN_PER_LEAF: usize = 3;

#[derive(Clone, Debug)]
enum RKind {
    /// Child node indices.
    Branch(SmallVec<[usize; MAX_PER_NODE + 1]>),
    /// `(slot, rect)` entries.
    Leaf(SmallVec<[(usize, Rect); MAX_PER_NODE + 1]>),
}

#[derive(Clone, Debug)]
struct RNode {
    parent: Option<usize>,
    bounds: Rect,
    kind: RKind,
}

/// Hierarchical rectangle-tree strategy with a slot → leaf hash lookup.
#[derive(Default)]
pub struct RTree {
    nodes: Vec<Option<RNode>>,
    free: Vec<usize>,
    root: Option<usize>,
    leaf_of: HashMap<usize, usize>,
}

impl Debug for RTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("RTree")
            .field("total_nodes", &total)
            .field("alive_nodes", &alive)
            .field("entries", &self.leaf_of.len())
            .finish_non_exhaustive()
    }
}

#[inline]
fn area(r: &Rect) -> f64 {
    (r.x1 - r.x0).max(0.0) * (r.y1 - r.y0).max(0.0)
}

#[inline]
fn enlargement(bounds: &Rect, rect: &Rect) -> f64 {
    area(&bounds.union(*rect)) - area(bounds)
}

#[inline]
fn contains_rect(outer: &Rect, inner: &Rect) -> bool {
    outer.x0 <= inner.x0 && inner.x1 <= outer.x1 && outer.y0 <= inner.y0 && inner.y1 <= outer.y1
}

impl RTree {
    fn node(&self, idx: usize) -> &RNode {
        self.nodes
            .get(idx)
            .expect("rtree invariant violated: reference to out-of-bounds node")
            .as_ref()
            .expect("rtree invariant violated: reference to vacant node")
    }

    fn node_mut(&mut self, idx: usize) -> &mut RNode {
        self.nodes
            .get_mut(idx)
            .expect("rtree invariant violated: reference to out-of-bounds node")
            .as_mut()
            .expect("rtree invariant violated: reference to vacant node")
    }

    fn alloc(&mut self, node: RNode) -> usize {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, idx: usize) {
        self.nodes[idx] = None;
        self.free.push(idx);
    }

    /// Descend from the root to the leaf best suited to hold `rect`,
    /// choosing at each branch the child needing the least area enlargement.
    fn choose_leaf(&self, rect: &Rect) -> usize {
        let mut idx = self
            .root
            .expect("rtree invariant violated: choose_leaf on empty tree");
        loop {
            match &self.node(idx).kind {
                RKind::Leaf(_) => return idx,
                RKind::Branch(children) => {
                    let mut best = None;
                    for &child in children {
                        let b = &self.node(child).bounds;
                        let grow = enlargement(b, rect);
                        let a = area(b);
                        let better = match best {
                            None => true,
                            Some((_, bg, ba)) => {
                                grow < bg || (grow == bg && a < ba)
                            }
                        };
                        if better {
                            best = Some((child, grow, a));
                        }
                    }
                    idx = best
                        .expect("rtree invariant violated: branch with no children")
                        .0;
                }
            }
        }
    }

    /// Recompute `idx`'s bounds from its contents and propagate to the root.
    fn adjust_upward(&mut self, mut idx: usize) {
        loop {
            let bounds = self.compute_bounds(idx);
            let node = self.node_mut(idx);
            node.bounds = bounds;
            match node.parent {
                Some(p) => idx = p,
                None => break,
            }
        }
    }

    fn compute_bounds(&self, idx: usize) -> Rect {
        match &self.node(idx).kind {
            RKind::Leaf(entries) => {
                let mut it = entries.iter();
                let first = it.next().map(|(_, r)| *r).unwrap_or(Rect::ZERO);
                it.fold(first, |acc, (_, r)| acc.union(*r))
            }
            RKind::Branch(children) => {
                let mut it = children.iter();
                let first = it
                    .next()
                    .map(|&c| self.node(c).bounds)
                    .unwrap_or(Rect::ZERO);
                it.fold(first, |acc, &c| acc.union(self.node(c).bounds))
            }
        }
    }

    /// Split an overflowing node in two along the axis with the larger
    /// spread of centers, propagating splits upward as needed.
    fn split(&mut self, idx: usize) {
        enum Items {
            Leaf(Vec<(usize, Rect)>),
            Branch(Vec<usize>),
        }

        let items = match &mut self.node_mut(idx).kind {
            RKind::Leaf(entries) => Items::Leaf(entries.drain(..).collect()),
            RKind::Branch(children) => Items::Branch(children.drain(..).collect()),
        };

        // Order items by center along the wider axis, keep the lower half in
        // `idx` and move the upper half to a fresh sibling.
        let (kept, moved): (Items, Items) = match items {
            Items::Leaf(mut v) => {
                sort_by_center(&mut v, |(_, r)| r);
                let upper = v.split_off(v.len() / 2);
                (Items::Leaf(v), Items::Leaf(upper))
            }
            Items::Branch(mut v) => {
                let rects: Vec<Rect> = v.iter().map(|&c| self.node(c).bounds).collect();
                let mut pairs: Vec<(usize, Rect)> =
                    v.drain(..).zip(rects.into_iter()).collect();
                sort_by_center(&mut pairs, |(_, r)| r);
                let upper = pairs.split_off(pairs.len() / 2);
                (
                    Items::Branch(pairs.into_iter().map(|(c, _)| c).collect()),
                    Items::Branch(upper.into_iter().map(|(c, _)| c).collect()),
                )
            }
        };

        let parent = self.node(idx).parent;
        let sibling = self.alloc(RNode {
            parent,
            bounds: Rect::ZERO,
            kind: RKind::Leaf(SmallVec::new()),
        });

        match kept {
            Items::Leaf(v) => {
                if let RKind::Leaf(entries) = &mut self.node_mut(idx).kind {
                    entries.extend(v);
                }
            }
            Items::Branch(v) => {
                if let RKind::Branch(children) = &mut self.node_mut(idx).kind {
                    children.extend(v);
                }
            }
        }
        match moved {
            Items::Leaf(v) => {
                for &(slot, _) in &v {
                    self.leaf_of.insert(slot, sibling);
                }
                self.node_mut(sibling).kind = RKind::Leaf(v.into_iter().collect());
            }
            Items::Branch(v) => {
                for &child in &v {
                    self.node_mut(child).parent = Some(sibling);
                }
                self.node_mut(sibling).kind = RKind::Branch(v.into_iter().collect());
            }
        }

        self.node_mut(idx).bounds = self.compute_bounds(idx);
        self.node_mut(sibling).bounds = self.compute_bounds(sibling);

        match parent {
            Some(p) => {
                let overflow = {
                    let RKind::Branch(children) = &mut self.node_mut(p).kind else {
                        unreachable!("rtree invariant violated: leaf used as parent");
                    };
                    children.push(sibling);
                    children.len() > MAX_PER_NODE
                };
                self.node_mut(p).bounds = self.compute_bounds(p);
                if overflow {
                    self.split(p);
                } else {
                    self.adjust_upward(p);
                }
            }
            None => {
                // The root split: grow the tree by one level.
                let bounds = self.node(idx).bounds.union(self.node(sibling).bounds);
                let new_root = self.alloc(RNode {
                    parent: None,
                    bounds,
                    kind: RKind::Branch(SmallVec::from_slice(&[idx, sibling])),
                });
                self.node_mut(idx).parent = Some(new_root);
                self.node_mut(sibling).parent = Some(new_root);
                self.root = Some(new_root);
            }
        }
    }

    /// Detach a node from its parent, dissolving empty ancestors, and leave
    /// ancestor bounds adjusted.
    fn detach(&mut self, idx: usize) {
        let parent = self.node(idx).parent;
        self.release(idx);
        match parent {
            None => self.root = None,
            Some(p) => {
                let now_empty = {
                    let RKind::Branch(children) = &mut self.node_mut(p).kind else {
                        unreachable!("rtree invariant violated: leaf used as parent");
                    };
                    let pos = children
                        .iter()
                        .position(|&c| c == idx)
                        .expect("rtree invariant violated: child missing from parent");
                    children.swap_remove(pos);
                    children.is_empty()
                };
                if now_empty {
                    self.detach(p);
                } else {
                    self.collapse_root();
                    if self.nodes[p].is_some() {
                        self.adjust_upward(p);
                    }
                }
            }
        }
    }

    /// A branch root holding a single child is replaced by that child.
    fn collapse_root(&mut self) {
        while let Some(r) = self.root {
            let child = match &self.node(r).kind {
                RKind::Branch(children) if children.len() == 1 => children[0],
                _ => break,
            };
            self.release(r);
            self.node_mut(child).parent = None;
            self.root = Some(child);
        }
    }
}

/// Sort items by rectangle center along the axis with the wider spread.
fn sort_by_center<T>(items: &mut [T], rect_of: impl Fn(&T) -> &Rect) {
    let (mut min_cx, mut max_cx) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_cy, mut max_cy) = (f64::INFINITY, f64::NEG_INFINITY);
    for item in items.iter() {
        let r = rect_of(item);
        let cx = 0.5 * (r.x0 + r.x1);
        let cy = 0.5 * (r.y0 + r.y1);
        min_cx = min_cx.min(cx);
        max_cx = max_cx.max(cx);
        min_cy = min_cy.min(cy);
        max_cy = max_cy.max(cy);
    }
    let use_x = (max_cx - min_cx) >= (max_cy - min_cy);
    items.sort_by(|a, b| {
        let (ra, rb) = (rect_of(a), rect_of(b));
        let ka = if use_x { ra.x0 + ra.x1 } else { ra.y0 + ra.y1 };
        let kb = if use_x { rb.x0 + rb.x1 } else { rb.y0 + rb.y1 };
        ka.partial_cmp(&kb).unwrap_or(core::cmp::Ordering::Equal)
    });
}

impl Strategy for RTree {
    fn insert(&mut self, slot: usize, rect: Rect) {
        debug_assert!(
            rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite(),
            "rtree rectangles must be finite"
        );
        match self.root {
            None => {
                let leaf = self.alloc(RNode {
                    parent: None,
                    bounds: rect,
                    kind: RKind::Leaf(SmallVec::from_slice(&[(slot, rect)])),
                });
                self.root = Some(leaf);
                self.leaf_of.insert(slot, leaf);
            }
            Some(_) => {
                let leaf = self.choose_leaf(&rect);
                let overflow = {
                    let RKind::Leaf(entries) = &mut self.node_mut(leaf).kind else {
                        unreachable!("rtree invariant violated: choose_leaf returned a branch");
                    };
                    entries.push((slot, rect));
                    entries.len() > MAX_PER_NODE
                };
                self.leaf_of.insert(slot, leaf);
                self.adjust_upward(leaf);
                if overflow {
                    self.split(leaf);
                }
            }
        }
    }

    fn update(&mut self, slot: usize, rect: Rect) {
        let Some(&leaf) = self.leaf_of.get(&slot) else {
            return;
        };
        // Fast path: the new rectangle still fits under the leaf's bounds, so
        // the entry can be rewritten in place. Bounds may become loose but
        // remain a superset, which keeps queries conservative and correct.
        if contains_rect(&self.node(leaf).bounds, &rect) {
            let RKind::Leaf(entries) = &mut self.node_mut(leaf).kind else {
                unreachable!("rtree invariant violated: slot mapped to a branch");
            };
            let entry = entries
                .iter_mut()
                .find(|(s, _)| *s == slot)
                .expect("rtree invariant violated: slot missing from mapped leaf");
            entry.1 = rect;
        } else {
            self.remove(slot);
            self.insert(slot, rect);
        }
    }

    fn remove(&mut self, slot: usize) {
        let Some(leaf) = self.leaf_of.remove(&slot) else {
            return;
        };
        let (len, is_root) = {
            let is_root = self.node(leaf).parent.is_none();
            let RKind::Leaf(entries) = &mut self.node_mut(leaf).kind else {
                unreachable!("rtree invariant violated: slot mapped to a branch");
            };
            let pos = entries
                .iter()
                .position(|(s, _)| *s == slot)
                .expect("rtree invariant violated: slot missing from mapped leaf");
            entries.swap_remove(pos);
            (entries.len(), is_root)
        };

        if len == 0 && is_root {
            self.release(leaf);
            self.root = None;
        } else if len < MIN_PER_LEAF && !is_root {
            // Dissolve the underflowing leaf and re-insert its survivors so
            // they land in better-populated neighbors.
            let orphans: Vec<(usize, Rect)> = {
                let RKind::Leaf(entries) = &mut self.node_mut(leaf).kind else {
                    unreachable!("rtree invariant violated: slot mapped to a branch");
                };
                entries.drain(..).collect()
            };
            for &(s, _) in &orphans {
                self.leaf_of.remove(&s);
            }
            self.detach(leaf);
            for (s, r) in orphans {
                self.insert(s, r);
            }
        } else {
            self.adjust_upward(leaf);
        }
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.leaf_of.clear();
    }

    fn visit_point<F: FnMut(usize)>(&self, x: f64, y: f64, mut f: F) {
        let Some(root) = self.root else { return };
        let mut stack: SmallVec<[usize; 16]> = SmallVec::from_slice(&[root]);
        while let Some(idx) = stack.pop() {
            let node = self.node(idx);
            if !contains_point(&node.bounds, x, y) {
                continue;
            }
            match &node.kind {
                RKind::Branch(children) => stack.extend(children.iter().copied()),
                RKind::Leaf(entries) => {
                    for (slot, rect) in entries {
                        if contains_point(rect, x, y) {
                            f(*slot);
                        }
                    }
                }
            }
        }
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, mut f: F) {
        let Some(root) = self.root else { return };
        let mut stack: SmallVec<[usize; 16]> = SmallVec::from_slice(&[root]);
        while let Some(idx) = stack.pop() {
            let node = self.node(idx);
            if !overlaps(&node.bounds, &rect) {
                continue;
            }
            match &node.kind {
                RKind::Branch(children) => stack.extend(children.iter().copied()),
                RKind::Leaf(entries) => {
                    for (slot, r) in entries {
                        if overlaps(r, &rect) {
                            f(*slot);
                        }
                    }
                }
            }
        }
    }
}
