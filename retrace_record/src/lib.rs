// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retrace Record: a persistent tree of drawn output.
//!
//! An interactive stream remembers what it drew as a tree of *output
//! records*: leaf records capture one drawing call each (geometry plus the
//! graphics state active at the time), and container records own ordered,
//! spatially indexed collections of children. The tree supports:
//!
//! - **Incremental extents**: every record caches its bounding rectangle;
//!   structural edits grow parents in O(1) and only a shrink on a defining
//!   edge rescans one level of siblings ([`tree`]).
//! - **Replay**: redraw any region from the history, in original drawing
//!   order, against any [`Medium`](retrace_medium::Medium) ([`replay`]).
//! - **Hit testing**: topmost-first point queries with per-kind refined
//!   position tests ([`replay::records_containing_point`]).
//! - **Matching**: structural equality for incremental redisplay diffing
//!   ([`replay::record_equal`]).
//! - **A stream surface**: drawing entry points that record and draw at
//!   once, plus `window_clear` / `window_refresh` / `erase_output_record`
//!   ([`stream`]).
//!
//! # Example
//!
//! ```rust
//! use kurbo::{Line, Point, Rect};
//! use retrace_medium::TraceMedium;
//! use retrace_record::stream::RecordingStream;
//!
//! let mut s = RecordingStream::new(TraceMedium::new(), Rect::new(0.0, 0.0, 100.0, 100.0));
//! s.draw_line(Line::new((0.0, 0.0), (5.0, 5.0)));
//! let rec = s.draw_rect(Rect::new(20.0, 20.0, 30.0, 30.0), true).unwrap();
//!
//! // The history knows where everything is.
//! let hits = retrace_record::replay::records_containing_point(
//!     s.tree(), s.tree().root(), 25.0, 25.0);
//! assert_eq!(hits, vec![rec]);
//!
//! // Redraw a damaged region from the history.
//! s.window_refresh(Rect::new(0.0, 0.0, 10.0, 10.0));
//! ```
//!
//! Trees are single-owner: all mutation of one history must be serialized
//! by the caller. Replay and hit testing take `&RecordTree` and may run
//! concurrently with each other.

#![no_std]

extern crate alloc;

pub mod error;
pub mod extent;
pub mod kinds;
pub mod replay;
pub mod stream;
mod stroke;
pub mod text;
pub mod tree;

pub use error::RecordError;
pub use extent::Extent;
pub use kinds::{LeafKind, LeafRecord};
pub use tree::{
    OwnerChange, OwnerNotice, RecordId, RecordTree, SheetId, StorageChoice,
};
