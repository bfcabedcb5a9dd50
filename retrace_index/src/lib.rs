// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retrace Index: a child-record index keyed by bounding rectangle.
//!
//! Retrace Index is the child-storage layer of an output-recording tree. A
//! container record owns a [`ChildIndex`] that maps each child to its cached
//! bounding rectangle and answers point and region queries, while preserving
//! the order in which children were added (drawing order).
//!
//! - Insert, update, and remove rectangles with user payloads via stable
//!   generational [`Key`]s.
//! - Query by point (topmost-first, i.e. most recently inserted first) or by
//!   intersecting rectangle (insertion order).
//! - Iterate all entries in either [`Order`].
//!
//! Two interchangeable storage strategies implement the [`Strategy`] trait:
//!
//! - [`strategies::Sequence`]: an ordered flat array with linear scans. The
//!   right choice for containers with a handful of children, and the default.
//! - [`strategies::RTree`]: a hierarchical rectangle tree with a hash lookup
//!   from entry to leaf, for containers holding many records.
//!
//! Updates are applied *synchronously*: [`ChildIndex::update`] re-indexes the
//! entry before returning, so a query issued immediately afterwards sees the
//! new rectangle. Stale cached rectangles are a correctness bug class in
//! incremental redisplay, and this crate is designed so they cannot occur.
//!
//! # Example
//!
//! ```rust
//! use kurbo::Rect;
//! use retrace_index::{ChildIndex, Order};
//!
//! let mut idx: ChildIndex<u32> = ChildIndex::new();
//! let a = idx.insert(Rect::new(0.0, 0.0, 10.0, 10.0), 1);
//! let _b = idx.insert(Rect::new(5.0, 5.0, 15.0, 15.0), 2);
//!
//! // Point queries are topmost-first: the most recently added entry leads.
//! let hits: Vec<u32> = idx.query_point(6.0, 6.0).map(|(_, p)| p).collect();
//! assert_eq!(hits, vec![2, 1]);
//!
//! // Moving an entry takes effect immediately.
//! idx.update(a, Rect::new(100.0, 100.0, 110.0, 110.0));
//! assert_eq!(idx.query_point(6.0, 6.0).count(), 1);
//!
//! // Insertion order is recoverable for replay.
//! let all: Vec<u32> = idx.iter(Order::FirstToLast).map(|(_, p)| p).collect();
//! assert_eq!(all, vec![1, 2]);
//! ```
//!
//! ## Float semantics
//!
//! This crate assumes no NaNs in rectangle coordinates. Debug builds may
//! assert.

#![no_std]

extern crate alloc;

mod index;
mod strategy;
pub(crate) mod util;

pub mod strategies;

pub use index::{ChildIndex, Key, Order, SequenceIndex, SpatialIndex};
pub use strategy::Strategy;
