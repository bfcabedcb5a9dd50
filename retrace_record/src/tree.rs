// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The output record tree.
//!
//! Records live in a slot arena addressed by generational [`RecordId`]s;
//! stale ids are safe and simply miss. Containers own their children through
//! a [`ChildIndex`](retrace_index::ChildIndex) keyed by child extent, and
//! each child keeps a weak back-pointer to its parent plus the key of its
//! entry in the parent's index.
//!
//! Every mutation leaves these invariants holding:
//!
//! 1. a container's extent equals the union of its non-null children's
//!    extents, or is null at the container's anchor;
//! 2. every record's entry in its parent's index carries the record's
//!    current extent rectangle (updates are synchronous, never lazy);
//! 3. repositioning a container repositions all descendants by the same
//!    delta.
//!
//! Extent maintenance is incremental: growing a parent is a per-edge
//! min/max, and only a shrink on a defining edge forces a one-level rescan
//! of siblings. Propagation continues upward only while rectangles actually
//! change.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Vec2};
use smallvec::SmallVec;

use retrace_index::{Key, Order, SequenceIndex, SpatialIndex};

use crate::error::RecordError;
use crate::extent::Extent;
use crate::kinds::LeafRecord;

/// Stable generational handle to a record in a [`RecordTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordId {
    idx: u32,
    generation: u32,
}

impl RecordId {
    fn index(self) -> usize {
        self.idx as usize
    }
}

/// Identity of the display sheet a tree is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SheetId(pub u32);

/// What changed about a record's owning sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnerChange {
    /// The record is now part of a tree bound to this sheet.
    GainedSheet(SheetId),
    /// The record was detached from a tree bound to this sheet.
    LostSheet(SheetId),
}

/// A pending owner-change notification, drained via
/// [`RecordTree::take_owner_notices`]. Notices for a subtree arrive
/// top-down: ancestors before descendants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnerNotice {
    /// The record whose owning sheet changed.
    pub record: RecordId,
    /// What happened to it.
    pub change: OwnerChange,
}

/// Which child index strategy a container uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageChoice {
    /// Flat insertion-ordered storage; right for small containers.
    #[default]
    Sequence,
    /// R-tree storage for containers holding many records.
    Spatial,
}

/// A container's child index, behind either strategy.
#[derive(Debug)]
enum ChildStorage {
    Sequence(SequenceIndex<RecordId>),
    Spatial(SpatialIndex<RecordId>),
}

impl ChildStorage {
    fn new(choice: StorageChoice) -> Self {
        match choice {
            StorageChoice::Sequence => Self::Sequence(SequenceIndex::new()),
            StorageChoice::Spatial => Self::Spatial(SpatialIndex::new()),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Sequence(i) => i.len(),
            Self::Spatial(i) => i.len(),
        }
    }

    fn insert(&mut self, rect: Rect, id: RecordId) -> Key {
        match self {
            Self::Sequence(i) => i.insert(rect, id),
            Self::Spatial(i) => i.insert(rect, id),
        }
    }

    fn update(&mut self, key: Key, rect: Rect) -> bool {
        match self {
            Self::Sequence(i) => i.update(key, rect),
            Self::Spatial(i) => i.update(key, rect),
        }
    }

    fn remove(&mut self, key: Key) -> Option<RecordId> {
        match self {
            Self::Sequence(i) => i.remove(key),
            Self::Spatial(i) => i.remove(key),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Sequence(i) => i.clear(),
            Self::Spatial(i) => i.clear(),
        }
    }

    fn iter(&self, order: Order) -> Vec<(Key, RecordId)> {
        match self {
            Self::Sequence(i) => i.iter(order).collect(),
            Self::Spatial(i) => i.iter(order).collect(),
        }
    }

    fn query_point(&self, x: f64, y: f64) -> Vec<RecordId> {
        match self {
            Self::Sequence(i) => i.query_point(x, y).map(|(_, id)| id).collect(),
            Self::Spatial(i) => i.query_point(x, y).map(|(_, id)| id).collect(),
        }
    }

    fn query_rect(&self, rect: Rect) -> Vec<RecordId> {
        match self {
            Self::Sequence(i) => i.query_rect(rect).map(|(_, id)| id).collect(),
            Self::Spatial(i) => i.query_rect(rect).map(|(_, id)| id).collect(),
        }
    }
}

#[derive(Debug)]
enum Content {
    Container { storage: ChildStorage, anchor: Point },
    Leaf(LeafRecord),
}

#[derive(Debug)]
struct Node {
    parent: Option<RecordId>,
    /// Key of this record's entry in its parent's storage.
    index_key: Option<Key>,
    extent: Extent,
    content: Content,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A tree of output records rooted in a history container.
#[derive(Debug)]
pub struct RecordTree {
    slots: Vec<Slot>,
    free_list: Vec<usize>,
    root: RecordId,
    sheet: Option<SheetId>,
    notices: Vec<OwnerNotice>,
}

impl RecordTree {
    /// Create a tree whose root is an empty history container anchored at
    /// `anchor`.
    pub fn new(anchor: Point) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            root: RecordId {
                idx: 0,
                generation: 0,
            },
            sheet: None,
            notices: Vec::new(),
        };
        tree.root = tree.alloc(Node {
            parent: None,
            index_key: None,
            extent: Extent::null_at(anchor),
            content: Content::Container {
                storage: ChildStorage::new(StorageChoice::Sequence),
                anchor,
            },
        });
        tree
    }

    /// The root history container.
    pub fn root(&self) -> RecordId {
        self.root
    }

    /// Whether the id refers to a live record.
    pub fn is_alive(&self, id: RecordId) -> bool {
        self.node(id).is_some()
    }

    /// The record's extent, if it is alive.
    pub fn extent(&self, id: RecordId) -> Option<Extent> {
        self.node(id).map(|n| n.extent)
    }

    /// The record's parent; `None` for dead ids and detached or root
    /// records.
    pub fn parent(&self, id: RecordId) -> Option<RecordId> {
        self.node(id)?.parent
    }

    /// Whether the record is a container.
    pub fn is_container(&self, id: RecordId) -> bool {
        matches!(
            self.node(id),
            Some(Node {
                content: Content::Container { .. },
                ..
            })
        )
    }

    /// The leaf record behind `id`, if `id` is a live leaf.
    pub fn leaf(&self, id: RecordId) -> Option<&LeafRecord> {
        match &self.node(id)?.content {
            Content::Leaf(rec) => Some(rec),
            Content::Container { .. } => None,
        }
    }

    /// The container's children in insertion (drawing) order.
    pub fn children(&self, id: RecordId) -> Vec<RecordId> {
        match self.node(id).map(|n| &n.content) {
            Some(Content::Container { storage, .. }) => storage
                .iter(Order::FirstToLast)
                .into_iter()
                .map(|(_, c)| c)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Number of children; zero for leaves and dead ids.
    pub fn child_count(&self, id: RecordId) -> usize {
        match self.node(id).map(|n| &n.content) {
            Some(Content::Container { storage, .. }) => storage.len(),
            _ => 0,
        }
    }

    /// The record's position: the minimum corner of its extent, which is
    /// the anchor for a null container.
    pub fn position(&self, id: RecordId) -> Option<Point> {
        self.node(id).map(|n| n.extent.position())
    }

    /// Create an unattached, empty container.
    pub fn insert_container(&mut self, anchor: Point, choice: StorageChoice) -> RecordId {
        self.alloc(Node {
            parent: None,
            index_key: None,
            extent: Extent::null_at(anchor),
            content: Content::Container {
                storage: ChildStorage::new(choice),
                anchor,
            },
        })
    }

    /// Create an unattached leaf. Its extent is computed here, once.
    pub fn insert_leaf(&mut self, record: LeafRecord) -> RecordId {
        let extent = record.compute_extent();
        self.alloc(Node {
            parent: None,
            index_key: None,
            extent,
            content: Content::Leaf(record),
        })
    }

    /// Attach `child` to `parent`.
    ///
    /// The child must be detached: reparenting requires an explicit removal
    /// first. The parent's extent grows incrementally, and growth propagates
    /// upward only as far as rectangles actually change.
    pub fn add_child(&mut self, parent: RecordId, child: RecordId) -> Result<(), RecordError> {
        if !self.is_alive(parent) || !self.is_alive(child) {
            return Err(RecordError::StaleId);
        }
        if !self.is_container(parent) {
            return Err(RecordError::NotAContainer);
        }
        if self.node_ref(child).parent.is_some() {
            return Err(RecordError::AlreadyParented);
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(RecordError::WouldCycle);
        }

        let child_extent = self.node_ref(child).extent;
        let key = match &mut self.node_mut_ref(parent).content {
            Content::Container { storage, .. } => storage.insert(child_extent.rect(), child),
            Content::Leaf(_) => unreachable!("checked container above"),
        };
        let child_node = self.node_mut_ref(child);
        child_node.parent = Some(parent);
        child_node.index_key = Some(key);

        if let Some(sheet) = self.sheet {
            self.notify_subtree(child, OwnerChange::GainedSheet(sheet));
        }

        let old = self.node_ref(parent).extent;
        let new = old.union(child_extent);
        if new != old {
            self.node_mut_ref(parent).extent = new;
            self.propagate_upward(parent, old);
        }
        Ok(())
    }

    /// Detach `child` from `parent`.
    ///
    /// The child stays alive and can be re-attached. The parent's extent is
    /// recomputed from its remaining children (the shrink path), and the
    /// change propagates upward while rectangles differ.
    pub fn remove_child(&mut self, parent: RecordId, child: RecordId) -> Result<(), RecordError> {
        if !self.is_alive(parent) || !self.is_alive(child) {
            return Err(RecordError::StaleId);
        }
        if !self.is_container(parent) {
            return Err(RecordError::NotAContainer);
        }
        if self.node_ref(child).parent != Some(parent) {
            return Err(RecordError::NotAChild);
        }
        self.detach(parent, child);

        let old = self.node_ref(parent).extent;
        let new = self.scan_children_union(parent);
        if new != old {
            self.node_mut_ref(parent).extent = new;
            self.propagate_upward(parent, old);
        }
        Ok(())
    }

    /// [`remove_child`](Self::remove_child) with error signaling
    /// suppressed: removing a non-child (or using stale ids) is a no-op.
    pub fn remove_child_quiet(&mut self, parent: RecordId, child: RecordId) {
        let _ = self.remove_child(parent, child);
    }

    /// Delete a detached record and its whole subtree, freeing their slots.
    /// Attached records must be removed from their parent first.
    pub fn delete(&mut self, id: RecordId) -> Result<(), RecordError> {
        if !self.is_alive(id) {
            return Err(RecordError::StaleId);
        }
        if self.node_ref(id).parent.is_some() {
            return Err(RecordError::AlreadyParented);
        }
        for rec in self.subtree_topdown(id) {
            let slot = &mut self.slots[rec.index()];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(rec.index());
        }
        Ok(())
    }

    /// Detach every child of `id` and collapse its extent to the anchor.
    ///
    /// Emits lost-sheet notices for the detached subtrees, top-down, when
    /// the tree is bound to a sheet.
    pub fn clear_container(&mut self, id: RecordId) -> Result<(), RecordError> {
        if !self.is_alive(id) {
            return Err(RecordError::StaleId);
        }
        let (children, anchor) = match &self.node_ref(id).content {
            Content::Container { storage, anchor } => (
                storage
                    .iter(Order::FirstToLast)
                    .into_iter()
                    .map(|(_, c)| c)
                    .collect::<Vec<_>>(),
                *anchor,
            ),
            Content::Leaf(_) => return Err(RecordError::NotAContainer),
        };
        for child in children {
            self.detach(id, child);
        }

        let old = self.node_ref(id).extent;
        let new = Extent::null_at(anchor);
        if new != old {
            self.node_mut_ref(id).extent = new;
            self.propagate_upward(id, old);
        }
        Ok(())
    }

    /// Rigidly translate the record and all its descendants by `delta`.
    ///
    /// The subtree moves as one piece, so no internal extent is recomputed;
    /// every moved extent and child index entry is shifted, and only the
    /// record's own parent sees an extent change to propagate.
    pub fn translate(&mut self, id: RecordId, delta: Vec2) -> Result<(), RecordError> {
        if !self.is_alive(id) {
            return Err(RecordError::StaleId);
        }
        if delta == Vec2::ZERO {
            return Ok(());
        }
        let old = self.node_ref(id).extent;
        let subtree = self.subtree_topdown(id);
        for &rec in &subtree {
            let node = self.node_mut_ref(rec);
            node.extent = node.extent.translate(delta);
            match &mut node.content {
                Content::Leaf(leaf) => leaf.translate(delta),
                Content::Container { anchor, .. } => *anchor += delta,
            }
        }
        // Second pass: resync every moved container's child entries with the
        // shifted extents. Synchronous by contract; queries made right after
        // this call must see the new rectangles.
        for &rec in &subtree {
            let entries: Vec<(Key, Rect)> = match &self.node_ref(rec).content {
                Content::Container { storage, .. } => storage
                    .iter(Order::FirstToLast)
                    .into_iter()
                    .map(|(key, c)| (key, self.node_ref(c).extent.rect()))
                    .collect(),
                Content::Leaf(_) => continue,
            };
            if let Content::Container { storage, .. } = &mut self.node_mut_ref(rec).content {
                for (key, rect) in entries {
                    storage.update(key, rect);
                }
            }
        }
        self.propagate_upward(id, old);
        Ok(())
    }

    /// Move the record so its position (extent minimum corner) lands on
    /// `target`.
    pub fn set_position(&mut self, id: RecordId, target: Point) -> Result<(), RecordError> {
        let current = self.position(id).ok_or(RecordError::StaleId)?;
        self.translate(id, target - current)
    }

    /// Authoritative bottom-up recompute of the subtree's extents, then
    /// upward propagation from `id`. Returns the recomputed extent.
    ///
    /// The incremental paths keep extents correct on their own; this is the
    /// fallback for bulk edits and the invariant check used by tests. It is
    /// idempotent.
    pub fn tree_recompute_extent(&mut self, id: RecordId) -> Result<Extent, RecordError> {
        if !self.is_alive(id) {
            return Err(RecordError::StaleId);
        }
        let old = self.node_ref(id).extent;
        let new = self.recompute_subtree(id);
        if new != old {
            self.propagate_upward(id, old);
        }
        Ok(new)
    }

    /// Bind the tree to an owning sheet, notifying every record top-down.
    pub fn attach_sheet(&mut self, sheet: SheetId) {
        self.detach_sheet();
        self.sheet = Some(sheet);
        self.notify_subtree(self.root, OwnerChange::GainedSheet(sheet));
    }

    /// Unbind from the owning sheet, if any, notifying every record
    /// top-down.
    pub fn detach_sheet(&mut self) {
        if let Some(sheet) = self.sheet.take() {
            self.notify_subtree(self.root, OwnerChange::LostSheet(sheet));
        }
    }

    /// The sheet this tree is bound to.
    pub fn sheet(&self) -> Option<SheetId> {
        self.sheet
    }

    /// Drain pending owner-change notices, oldest first.
    pub fn take_owner_notices(&mut self) -> Vec<OwnerNotice> {
        core::mem::take(&mut self.notices)
    }

    /// The container's children in the given order.
    pub(crate) fn children_in(&self, id: RecordId, order: Order) -> Vec<RecordId> {
        match self.node(id).map(|n| &n.content) {
            Some(Content::Container { storage, .. }) => storage
                .iter(order)
                .into_iter()
                .map(|(_, c)| c)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Children of `id` whose extent contains the point, topmost-first.
    pub(crate) fn children_at_point(&self, id: RecordId, x: f64, y: f64) -> Vec<RecordId> {
        match self.node(id).map(|n| &n.content) {
            Some(Content::Container { storage, .. }) => storage.query_point(x, y),
            _ => Vec::new(),
        }
    }

    /// Children of `id` whose extent overlaps `rect`, in insertion order.
    pub(crate) fn children_overlapping(&self, id: RecordId, rect: Rect) -> Vec<RecordId> {
        match self.node(id).map(|n| &n.content) {
            Some(Content::Container { storage, .. }) => storage.query_rect(rect),
            _ => Vec::new(),
        }
    }

    // Arena plumbing.

    fn alloc(&mut self, node: Node) -> RecordId {
        let idx = match self.free_list.pop() {
            Some(idx) => {
                self.slots[idx].node = Some(node);
                idx
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };
        RecordId {
            idx: u32::try_from(idx).expect("record tree slot count exceeds u32"),
            generation: self.slots[idx].generation,
        }
    }

    fn node(&self, id: RecordId) -> Option<&Node> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn node_mut(&mut self, id: RecordId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    fn node_ref(&self, id: RecordId) -> &Node {
        self.node(id)
            .expect("record tree invariant violated: internal id is stale")
    }

    fn node_mut_ref(&mut self, id: RecordId) -> &mut Node {
        self.node_mut(id)
            .expect("record tree invariant violated: internal id is stale")
    }

    /// Whether `ancestor` is an ancestor of `id` (or `id` itself).
    fn is_ancestor(&self, ancestor: RecordId, id: RecordId) -> bool {
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            if c == ancestor {
                return true;
            }
            cursor = self.node_ref(c).parent;
        }
        false
    }

    /// The subtree rooted at `id`, parents before children.
    fn subtree_topdown(&self, id: RecordId) -> Vec<RecordId> {
        let mut out = Vec::new();
        let mut stack: SmallVec<[RecordId; 16]> = SmallVec::from_slice(&[id]);
        while let Some(rec) = stack.pop() {
            out.push(rec);
            if let Content::Container { storage, .. } = &self.node_ref(rec).content {
                for (_, child) in storage.iter(Order::MostRecentFirst) {
                    stack.push(child);
                }
            }
        }
        out
    }

    fn notify_subtree(&mut self, id: RecordId, change: OwnerChange) {
        for record in self.subtree_topdown(id) {
            self.notices.push(OwnerNotice { record, change });
        }
    }

    /// Unlink `child` from `parent` without extent maintenance; the caller
    /// recomputes. Emits lost-sheet notices.
    fn detach(&mut self, parent: RecordId, child: RecordId) {
        let key = self
            .node_ref(child)
            .index_key
            .expect("record tree invariant violated: attached child has no index key");
        if let Content::Container { storage, .. } = &mut self.node_mut_ref(parent).content {
            let removed = storage.remove(key);
            debug_assert_eq!(removed, Some(child), "index entry out of sync with child");
        }
        let child_node = self.node_mut_ref(child);
        child_node.parent = None;
        child_node.index_key = None;
        if let Some(sheet) = self.sheet {
            self.notify_subtree(child, OwnerChange::LostSheet(sheet));
        }
    }

    /// Union of the container's non-null children; null at the anchor when
    /// none remain.
    fn scan_children_union(&self, id: RecordId) -> Extent {
        let Content::Container { storage, anchor } = &self.node_ref(id).content else {
            unreachable!("scan_children_union on a leaf");
        };
        let mut acc = Extent::null_at(*anchor);
        for (_, child) in storage.iter(Order::FirstToLast) {
            let e = self.node_ref(child).extent;
            if !e.is_null() {
                acc = acc.union(e);
            }
        }
        acc
    }

    /// `changed`'s extent was just rewritten from `old_extent`. Resync its
    /// entry in its parent's index and rerun the parent's extent
    /// computation, recursing upward only while rectangles change.
    fn propagate_upward(&mut self, changed: RecordId, old_extent: Extent) {
        let (new_extent, parent, index_key) = {
            let node = self.node_ref(changed);
            (node.extent, node.parent, node.index_key)
        };
        let Some(parent) = parent else {
            return;
        };
        if let Some(key) = index_key
            && let Content::Container { storage, .. } = &mut self.node_mut_ref(parent).content
        {
            storage.update(key, new_extent.rect());
        }

        let old_parent = self.node_ref(parent).extent;
        let single_child = self.child_count(parent) == 1;
        let new_parent = if (single_child || old_parent.is_null()) && !new_extent.is_null() {
            // Adopt directly. A child going null instead falls through to
            // the rescan, which re-anchors the parent at its own anchor.
            new_extent
        } else if old_extent.edges_within(old_parent) || new_extent.contains_rect(old_extent) {
            // The old rectangle defined none of the parent's edges, or the
            // change is pure growth: min/max with the parent suffices.
            old_parent.union(new_extent)
        } else {
            // Shrink on a possibly defining edge: rescan this level's
            // children. One level only; recursion continues upward solely
            // through the extent-changed check below.
            self.scan_children_union(parent)
        };
        if new_parent != old_parent {
            self.node_mut_ref(parent).extent = new_parent;
            self.propagate_upward(parent, old_parent);
        }
    }

    /// Recompute the subtree's extents bottom-up and resync child index
    /// entries. Returns `id`'s recomputed extent.
    fn recompute_subtree(&mut self, id: RecordId) -> Extent {
        let children = self.children(id);
        match &self.node_ref(id).content {
            Content::Leaf(leaf) => {
                let e = leaf.compute_extent();
                self.node_mut_ref(id).extent = e;
                e
            }
            Content::Container { .. } => {
                let mut entries: Vec<(Key, Rect)> = Vec::with_capacity(children.len());
                for child in children {
                    let e = self.recompute_subtree(child);
                    let key = self
                        .node_ref(child)
                        .index_key
                        .expect("record tree invariant violated: attached child has no index key");
                    entries.push((key, e.rect()));
                }
                if let Content::Container { storage, .. } = &mut self.node_mut_ref(id).content {
                    for (key, rect) in entries {
                        storage.update(key, rect);
                    }
                }
                let e = self.scan_children_union(id);
                self.node_mut_ref(id).extent = e;
                e
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{LeafKind, LeafRecord};
    use kurbo::Line;
    use retrace_medium::{GraphicsState, LineStyle};

    fn line_leaf(tree: &mut RecordTree, x0: f64, y0: f64, x1: f64, y1: f64) -> RecordId {
        let state = GraphicsState {
            line_style: LineStyle {
                thickness: 0.0,
                ..LineStyle::default()
            },
            ..GraphicsState::default()
        };
        tree.insert_leaf(LeafRecord::new(
            LeafKind::Line(Line::new((x0, y0), (x1, y1))),
            state,
        ))
    }

    fn assert_invariants(tree: &mut RecordTree, id: RecordId) {
        let stored = tree.extent(id).unwrap();
        let recomputed = tree.tree_recompute_extent(id).unwrap();
        assert_eq!(stored, recomputed, "stored extent diverged from authority");
    }

    #[test]
    fn container_extent_lifecycle() {
        // Empty container anchored at (10, 10); a zero-width line (0,0)-(5,5)
        // makes the extent exactly that box; a second record grows it; the
        // removal shrinks it back.
        let mut tree = RecordTree::new(Point::new(10.0, 10.0));
        let root = tree.root();
        assert!(tree.extent(root).unwrap().is_null());
        assert_eq!(tree.position(root), Some(Point::new(10.0, 10.0)));

        let a = line_leaf(&mut tree, 0.0, 0.0, 5.0, 5.0);
        tree.add_child(root, a).unwrap();
        assert_eq!(tree.extent(root).unwrap().rect(), Rect::new(0.0, 0.0, 5.0, 5.0));

        let b = line_leaf(&mut tree, 20.0, 20.0, 30.0, 30.0);
        tree.add_child(root, b).unwrap();
        assert_eq!(tree.extent(root).unwrap().rect(), Rect::new(0.0, 0.0, 30.0, 30.0));

        tree.remove_child(root, b).unwrap();
        assert_eq!(tree.extent(root).unwrap().rect(), Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_invariants(&mut tree, root);
    }

    #[test]
    fn shrink_falls_back_to_sibling_rescan() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let a = line_leaf(&mut tree, 0.0, 0.0, 5.0, 5.0);
        let b = line_leaf(&mut tree, 2.0, 2.0, 40.0, 3.0);
        let c = line_leaf(&mut tree, 1.0, 1.0, 3.0, 20.0);
        for id in [a, b, c] {
            tree.add_child(root, id).unwrap();
        }
        assert_eq!(tree.extent(root).unwrap().rect(), Rect::new(0.0, 0.0, 40.0, 20.0));

        // b defined the right edge; removing it must re-derive the extent
        // from the remaining children.
        tree.remove_child(root, b).unwrap();
        assert_eq!(tree.extent(root).unwrap().rect(), Rect::new(0.0, 0.0, 5.0, 20.0));
        assert_invariants(&mut tree, root);
    }

    #[test]
    fn structural_errors() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let leaf = line_leaf(&mut tree, 0.0, 0.0, 1.0, 1.0);
        let other = line_leaf(&mut tree, 2.0, 2.0, 3.0, 3.0);
        tree.add_child(root, leaf).unwrap();

        // Leaves are sealed.
        assert_eq!(tree.add_child(leaf, other), Err(RecordError::NotAContainer));
        // A record has at most one parent.
        assert_eq!(tree.add_child(root, leaf), Err(RecordError::AlreadyParented));
        // No cycles, including self-adoption.
        let inner = tree.insert_container(Point::ORIGIN, StorageChoice::Sequence);
        tree.add_child(root, inner).unwrap();
        assert_eq!(tree.add_child(inner, root), Err(RecordError::WouldCycle));
        // Self-adoption of a detached container is a cycle, not a reparent.
        let lone = tree.insert_container(Point::ORIGIN, StorageChoice::Sequence);
        assert_eq!(tree.add_child(lone, lone), Err(RecordError::WouldCycle));
        // Removing a non-child errors loudly, unless suppressed.
        assert_eq!(tree.remove_child(inner, leaf), Err(RecordError::NotAChild));
        tree.remove_child_quiet(inner, leaf);
        assert!(tree.is_alive(leaf));

        // Deleted ids go stale.
        tree.remove_child(root, leaf).unwrap();
        tree.delete(leaf).unwrap();
        assert!(!tree.is_alive(leaf));
        assert_eq!(tree.add_child(root, leaf), Err(RecordError::StaleId));
    }

    #[test]
    fn reposition_is_rigid_and_commutes() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let inner = tree.insert_container(Point::ORIGIN, StorageChoice::Sequence);
        let a = line_leaf(&mut tree, 0.0, 0.0, 5.0, 5.0);
        let b = line_leaf(&mut tree, 10.0, 0.0, 15.0, 5.0);
        tree.add_child(inner, a).unwrap();
        tree.add_child(inner, b).unwrap();
        tree.add_child(root, inner).unwrap();

        tree.translate(inner, Vec2::new(3.0, 4.0)).unwrap();
        tree.translate(inner, Vec2::new(-1.0, 2.0)).unwrap();

        // Same result as one combined translation.
        let mut tree2 = RecordTree::new(Point::ORIGIN);
        let root2 = tree2.root();
        let inner2 = tree2.insert_container(Point::ORIGIN, StorageChoice::Sequence);
        let a2 = line_leaf(&mut tree2, 0.0, 0.0, 5.0, 5.0);
        let b2 = line_leaf(&mut tree2, 10.0, 0.0, 15.0, 5.0);
        tree2.add_child(inner2, a2).unwrap();
        tree2.add_child(inner2, b2).unwrap();
        tree2.add_child(root2, inner2).unwrap();
        tree2.translate(inner2, Vec2::new(2.0, 6.0)).unwrap();

        assert_eq!(tree.extent(inner).unwrap(), tree2.extent(inner2).unwrap());
        assert_eq!(tree.extent(a).unwrap(), tree2.extent(a2).unwrap());
        assert_eq!(tree.extent(b).unwrap(), tree2.extent(b2).unwrap());
        assert_eq!(tree.extent(root).unwrap(), tree2.extent(root2).unwrap());
        assert_invariants(&mut tree, root);

        // The child index reflects the moved rectangles synchronously.
        let hits = tree.children_at_point(inner, 4.0, 7.0);
        assert_eq!(hits, alloc::vec![a]);
    }

    #[test]
    fn set_position_moves_min_corner() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let a = line_leaf(&mut tree, 2.0, 3.0, 7.0, 8.0);
        tree.add_child(root, a).unwrap();
        tree.set_position(a, Point::new(100.0, 200.0)).unwrap();
        assert_eq!(tree.position(a), Some(Point::new(100.0, 200.0)));
        assert_eq!(
            tree.extent(a).unwrap().rect(),
            Rect::new(100.0, 200.0, 105.0, 205.0)
        );
        assert_invariants(&mut tree, root);
    }

    #[test]
    fn clear_collapses_to_anchor() {
        let mut tree = RecordTree::new(Point::new(10.0, 10.0));
        let root = tree.root();
        let a = line_leaf(&mut tree, 0.0, 0.0, 5.0, 5.0);
        tree.add_child(root, a).unwrap();
        tree.clear_container(root).unwrap();

        let e = tree.extent(root).unwrap();
        assert!(e.is_null());
        assert_eq!(e.position(), Point::new(10.0, 10.0));
        // The detached child is alive and re-attachable.
        assert!(tree.is_alive(a));
        assert_eq!(tree.parent(a), None);
        tree.add_child(root, a).unwrap();
        assert_eq!(tree.extent(root).unwrap().rect(), Rect::new(0.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn null_children_never_move_the_anchor() {
        let mut tree = RecordTree::new(Point::new(10.0, 10.0));
        let root = tree.root();
        let empty = tree.insert_container(Point::new(99.0, 99.0), StorageChoice::Sequence);
        tree.add_child(root, empty).unwrap();
        let e = tree.extent(root).unwrap();
        assert!(e.is_null());
        assert_eq!(e.position(), Point::new(10.0, 10.0));
        assert_invariants(&mut tree, root);

        // A lone child collapsing back to null returns its parent to the
        // parent's own anchor, not the child's.
        let a = line_leaf(&mut tree, 0.0, 0.0, 5.0, 5.0);
        tree.add_child(empty, a).unwrap();
        assert_eq!(tree.extent(root).unwrap().rect(), Rect::new(0.0, 0.0, 5.0, 5.0));
        tree.clear_container(empty).unwrap();
        let e = tree.extent(root).unwrap();
        assert!(e.is_null());
        assert_eq!(e.position(), Point::new(10.0, 10.0));
        assert_invariants(&mut tree, root);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let inner = tree.insert_container(Point::ORIGIN, StorageChoice::Spatial);
        for i in 0..10 {
            let o = f64::from(i) * 7.0;
            let leaf = line_leaf(&mut tree, o, 0.0, o + 5.0, 5.0);
            tree.add_child(inner, leaf).unwrap();
        }
        tree.add_child(root, inner).unwrap();
        let first = tree.tree_recompute_extent(root).unwrap();
        let second = tree.tree_recompute_extent(root).unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.extent(root).unwrap(), first);
    }

    #[test]
    fn owner_notices_fire_top_down() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let inner = tree.insert_container(Point::ORIGIN, StorageChoice::Sequence);
        let leaf = line_leaf(&mut tree, 0.0, 0.0, 1.0, 1.0);
        tree.add_child(inner, leaf).unwrap();
        tree.add_child(root, inner).unwrap();
        let _ = tree.take_owner_notices();

        let sheet = SheetId(7);
        tree.attach_sheet(sheet);
        let gained = tree.take_owner_notices();
        let order: Vec<RecordId> = gained.iter().map(|n| n.record).collect();
        assert_eq!(order, alloc::vec![root, inner, leaf]);
        assert!(
            gained
                .iter()
                .all(|n| n.change == OwnerChange::GainedSheet(sheet))
        );

        // Clearing while attached loses the sheet, ancestors first.
        tree.clear_container(root).unwrap();
        let lost = tree.take_owner_notices();
        let order: Vec<RecordId> = lost.iter().map(|n| n.record).collect();
        assert_eq!(order, alloc::vec![inner, leaf]);
        assert!(
            lost.iter()
                .all(|n| n.change == OwnerChange::LostSheet(sheet))
        );
    }

    #[test]
    fn spatial_containers_answer_point_queries() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let big = tree.insert_container(Point::ORIGIN, StorageChoice::Spatial);
        let mut ids = Vec::new();
        for i in 0..30 {
            let o = f64::from(i) * 10.0;
            let leaf = line_leaf(&mut tree, o, 0.0, o + 6.0, 6.0);
            tree.add_child(big, leaf).unwrap();
            ids.push(leaf);
        }
        tree.add_child(root, big).unwrap();
        assert_eq!(tree.children_at_point(big, 103.0, 3.0), alloc::vec![ids[10]]);
        assert_eq!(tree.child_count(big), 30);
    }
}
