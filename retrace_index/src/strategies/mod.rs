// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in storage strategies.
//!
//! - [`Sequence`]: ordered flat array with linear scans; smallest and
//!   simplest, good for containers with few children.
//! - [`RTree`]: hierarchical rectangle tree with a hash lookup from slot to
//!   leaf; logarithmic removal and localized queries for large containers.

mod rtree;
mod sequence;

pub use rtree::RTree;
pub use sequence::Sequence;
