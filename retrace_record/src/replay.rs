// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replay, hit testing, and record matching over a [`RecordTree`].

use alloc::vec::Vec;

use kurbo::{Affine, Rect};

use retrace_index::Order;
use retrace_medium::Medium;

use crate::kinds::LeafKind;
use crate::tree::{RecordId, RecordTree};

/// Which records a [`map_over_records`] traversal visits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Area {
    /// Every record in the subtree.
    All,
    /// Records whose extent overlaps the region.
    Region(Rect),
    /// Records whose extent contains the point.
    Point(f64, f64),
}

/// Redraw the subtree at `id` onto `medium`, limited to `region`.
///
/// The medium is reset to neutral state first (identity transform, no
/// clip), then clipped to `region`. Records are visited in index natural
/// order (insertion order), each leaf re-applying its captured graphics
/// state before re-issuing its drawing call, so overlapping output ends up
/// layered exactly as originally drawn.
pub fn replay<M: Medium>(tree: &RecordTree, id: RecordId, medium: &mut M, region: Rect) {
    medium.begin_replay();
    medium.set_transform(Affine::IDENTITY);
    medium.set_clip(region);
    replay_walk(tree, id, medium, region);
    medium.clear_clip();
}

fn replay_walk<M: Medium>(tree: &RecordTree, id: RecordId, medium: &mut M, region: Rect) {
    let Some(extent) = tree.extent(id) else {
        return;
    };
    if !extent.overlaps(region.into()) {
        return;
    }
    if let Some(leaf) = tree.leaf(id) {
        leaf.replay(medium);
    } else {
        for child in tree.children_overlapping(id, region) {
            replay_walk(tree, child, medium, region);
        }
    }
}

/// Leaf records under `id` whose drawn shape contains the point, topmost
/// first: the most recently added branch wins, and within it the deepest
/// record.
///
/// Bounding-box containment is the coarse filter; each candidate leaf then
/// applies its refined per-kind position test (true containment for filled
/// shapes, distance against half thickness for strokes).
pub fn records_containing_point(
    tree: &RecordTree,
    id: RecordId,
    x: f64,
    y: f64,
) -> Vec<RecordId> {
    let mut out = Vec::new();
    collect_at_point(tree, id, x, y, &mut out);
    out
}

fn collect_at_point(tree: &RecordTree, id: RecordId, x: f64, y: f64, out: &mut Vec<RecordId>) {
    if let Some(leaf) = tree.leaf(id) {
        let hit = tree
            .extent(id)
            .is_some_and(|e| e.contains_point(x, y) && leaf.refined_hit(x, y));
        if hit {
            out.push(id);
        }
        return;
    }
    for child in tree.children_at_point(id, x, y) {
        collect_at_point(tree, child, x, y, out);
    }
}

/// Visit every record in the subtree at `id` (containers included) matching
/// `area`, in the given order at each level, parents before children.
pub fn map_over_records<F: FnMut(RecordId)>(
    tree: &RecordTree,
    id: RecordId,
    order: Order,
    area: Area,
    f: &mut F,
) {
    let Some(extent) = tree.extent(id) else {
        return;
    };
    let included = match area {
        Area::All => true,
        Area::Region(region) => extent.overlaps(region.into()),
        Area::Point(x, y) => extent.contains_point(x, y),
    };
    if !included {
        return;
    }
    f(id);
    let children = match area {
        Area::All => tree.children_in(id, order),
        Area::Region(region) => {
            // Region queries arrive first-to-last.
            let mut c = tree.children_overlapping(id, region);
            if order == Order::MostRecentFirst {
                c.reverse();
            }
            c
        }
        Area::Point(x, y) => {
            // Point queries arrive most-recent-first.
            let mut c = tree.children_at_point(id, x, y);
            if order == Order::FirstToLast {
                c.reverse();
            }
            c
        }
    };
    for child in children {
        map_over_records(tree, child, order, area, f);
    }
}

/// Whether two records would produce identical output.
///
/// Compositional: extents and concrete kinds short-circuit first, then
/// geometry and every captured style facet must agree. Containers are equal
/// when their children match pairwise in insertion order. Records of
/// different concrete kinds are never equal.
pub fn record_equal(tree: &RecordTree, a: RecordId, b: RecordId) -> bool {
    if a == b {
        return true;
    }
    let (Some(ea), Some(eb)) = (tree.extent(a), tree.extent(b)) else {
        return false;
    };
    if ea != eb {
        return false;
    }
    match (tree.leaf(a), tree.leaf(b)) {
        (Some(la), Some(lb)) => {
            if core::mem::discriminant(&la.kind) != core::mem::discriminant(&lb.kind) {
                return false;
            }
            la.kind == lb.kind
                && la.state.ink == lb.state.ink
                && la.state.transform == lb.state.transform
                && styles_relevant_equal(la, lb)
        }
        (None, None) => {
            let ca = tree.children(a);
            let cb = tree.children(b);
            ca.len() == cb.len()
                && ca
                    .into_iter()
                    .zip(cb)
                    .all(|(x, y)| record_equal(tree, x, y))
        }
        _ => false,
    }
}

/// Compare only the style facets a kind actually draws with: line style for
/// stroked geometry, text style for text.
fn styles_relevant_equal(a: &crate::kinds::LeafRecord, b: &crate::kinds::LeafRecord) -> bool {
    match &a.kind {
        LeafKind::Text(_) => a.state.text_style == b.state.text_style,
        LeafKind::Poly { filled: true, .. }
        | LeafKind::Bezigon { filled: true, .. }
        | LeafKind::Rect { filled: true, .. }
        | LeafKind::Ellipse { filled: true, .. } => true,
        _ => a.state.line_style == b.state.line_style,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{LeafKind, LeafRecord};
    use crate::tree::StorageChoice;
    use kurbo::Point;
    use retrace_medium::{GraphicsState, LineStyle, MediumOp, TraceMedium};

    fn point_leaf(tree: &mut RecordTree, x: f64, y: f64, thickness: f64) -> RecordId {
        let state = GraphicsState {
            line_style: LineStyle {
                thickness,
                ..LineStyle::default()
            },
            ..GraphicsState::default()
        };
        tree.insert_leaf(LeafRecord::new(LeafKind::Point(Point::new(x, y)), state))
    }

    #[test]
    fn hit_test_returns_topmost_first() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        // Three overlapping point records added in order A, B, C.
        let a = point_leaf(&mut tree, 5.0, 5.0, 4.0);
        let b = point_leaf(&mut tree, 5.5, 5.0, 4.0);
        let c = point_leaf(&mut tree, 5.0, 5.5, 4.0);
        for id in [a, b, c] {
            tree.add_child(root, id).unwrap();
        }
        let hits = records_containing_point(&tree, root, 5.2, 5.2);
        assert_eq!(hits, alloc::vec![c, b, a]);
    }

    #[test]
    fn hit_test_applies_refined_tests() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let tri = tree.insert_leaf(LeafRecord::new(
            LeafKind::Poly {
                points: alloc::vec![
                    Point::new(0.0, 0.0),
                    Point::new(10.0, 0.0),
                    Point::new(0.0, 10.0),
                ],
                closed: true,
                filled: true,
            },
            GraphicsState::default(),
        ));
        tree.add_child(root, tri).unwrap();
        // In the bounding box but outside the triangle.
        assert!(records_containing_point(&tree, root, 9.0, 9.0).is_empty());
        assert_eq!(records_containing_point(&tree, root, 2.0, 2.0), alloc::vec![tri]);
    }

    #[test]
    fn replay_draws_in_insertion_order_and_clips() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let a = point_leaf(&mut tree, 5.0, 5.0, 2.0);
        let far = point_leaf(&mut tree, 500.0, 500.0, 2.0);
        let b = point_leaf(&mut tree, 6.0, 6.0, 2.0);
        for id in [a, far, b] {
            tree.add_child(root, id).unwrap();
        }

        let mut m = TraceMedium::new();
        replay(&tree, root, &mut m, Rect::new(0.0, 0.0, 20.0, 20.0));

        assert_eq!(m.ops().first(), Some(&MediumOp::BeginReplay));
        assert!(m.ops().contains(&MediumOp::SetClip(Rect::new(0.0, 0.0, 20.0, 20.0))));
        let drawn: Vec<Point> = m
            .ops()
            .iter()
            .filter_map(|op| match op {
                MediumOp::Point(p) => Some(*p),
                _ => None,
            })
            .collect();
        // The far record is outside the region and skipped; order preserved.
        assert_eq!(drawn, alloc::vec![Point::new(5.0, 5.0), Point::new(6.0, 6.0)]);
    }

    #[test]
    fn map_over_records_filters_by_area() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let inner = tree.insert_container(Point::ORIGIN, StorageChoice::Sequence);
        let a = point_leaf(&mut tree, 5.0, 5.0, 2.0);
        let far = point_leaf(&mut tree, 500.0, 500.0, 2.0);
        tree.add_child(inner, a).unwrap();
        tree.add_child(root, inner).unwrap();
        tree.add_child(root, far).unwrap();

        let mut seen = Vec::new();
        map_over_records(
            &tree,
            root,
            Order::FirstToLast,
            Area::Region(Rect::new(0.0, 0.0, 20.0, 20.0)),
            &mut |id| seen.push(id),
        );
        assert_eq!(seen, alloc::vec![root, inner, a]);

        let mut all = Vec::new();
        map_over_records(&tree, root, Order::MostRecentFirst, Area::All, &mut |id| {
            all.push(id);
        });
        assert_eq!(all, alloc::vec![root, far, inner, a]);
    }

    #[test]
    fn record_equality_is_compositional() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let root = tree.root();
        let a = point_leaf(&mut tree, 5.0, 5.0, 2.0);
        let b = point_leaf(&mut tree, 5.0, 5.0, 2.0);
        let thicker = point_leaf(&mut tree, 5.0, 5.0, 4.0);
        let elsewhere = point_leaf(&mut tree, 9.0, 5.0, 2.0);
        for id in [a, b, thicker, elsewhere] {
            tree.add_child(root, id).unwrap();
        }
        assert!(record_equal(&tree, a, b));
        assert!(!record_equal(&tree, a, thicker));
        assert!(!record_equal(&tree, a, elsewhere));

        // Different concrete kinds are never equal, even with equal extents.
        let rect = tree.insert_leaf(LeafRecord::new(
            LeafKind::Rect {
                rect: Rect::new(4.0, 4.0, 6.0, 6.0),
                filled: true,
            },
            GraphicsState::default(),
        ));
        tree.add_child(root, rect).unwrap();
        assert_eq!(tree.extent(rect), tree.extent(a));
        assert!(!record_equal(&tree, a, rect));
    }

    #[test]
    fn container_equality_matches_children_pairwise() {
        let mut tree = RecordTree::new(Point::ORIGIN);
        let c1 = tree.insert_container(Point::ORIGIN, StorageChoice::Sequence);
        let c2 = tree.insert_container(Point::ORIGIN, StorageChoice::Sequence);
        let a1 = point_leaf(&mut tree, 5.0, 5.0, 2.0);
        let a2 = point_leaf(&mut tree, 5.0, 5.0, 2.0);
        tree.add_child(c1, a1).unwrap();
        tree.add_child(c2, a2).unwrap();
        assert!(record_equal(&tree, c1, c2));

        let extra = point_leaf(&mut tree, 5.5, 5.0, 2.0);
        tree.add_child(c2, extra).unwrap();
        assert!(!record_equal(&tree, c1, c2));
    }
}
