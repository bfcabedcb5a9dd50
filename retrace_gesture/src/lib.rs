// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retrace Gesture: the input side of an interactive stream.
//!
//! Raw input arrives as [`Gesture`]s: characters, dead keys, and pointer
//! events. This crate provides the pipeline between the host event
//! dispatcher (producer) and stream input code (consumer):
//!
//! - [`GestureQueue`]: a thread-safe FIFO with blocking reads, wall-clock
//!   timeouts, caller wait predicates, one-token push-back, and abort /
//!   accelerator gesture interception.
//! - [`DeadKeyComposer`]: transparent dead-key merging on top of queue
//!   reads; a dead key plus its base character come back as one composed
//!   gesture.
//! - [`rescan`]: a retry-loop parser driver for input editing, where a
//!   parse may request a restart from an earlier buffer position.
//! - [`focus`]: scoped input focus transfer that restores the previous
//!   focus on every exit path.
//!
//! Recoverable interruptions travel as [`Condition`] values, not panics:
//! aborts, accelerators, and end-of-input are all meant to be intercepted
//! by an enclosing interaction loop.

use core::fmt;

use kurbo::Point;

pub mod deadkeys;
pub mod focus;
pub mod queue;
pub mod rescan;

pub use deadkeys::DeadKeyComposer;
pub use focus::{FocusState, with_input_focus};
pub use queue::{GestureQueue, ReadOptions, ReadOutcome};
pub use rescan::{GestureStream, Parse, parse_gestures};

/// A dead (combining) key, pressed before the character it accents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[expect(missing_docs, reason = "accent names are self-describing")]
pub enum DeadKey {
    Acute,
    Grave,
    Circumflex,
    Diaeresis,
    Tilde,
}

/// A pointer button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[expect(missing_docs, reason = "button names are self-describing")]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

/// A pointer press at a position in stream coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerGesture {
    /// Which button was pressed.
    pub button: PointerButton,
    /// Where the pointer was, in stream coordinates.
    pub position: Point,
}

/// One unit of raw input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    /// A typed character.
    Char(char),
    /// A dead key; composes with the following character.
    Dead(DeadKey),
    /// A pointer press.
    Pointer(PointerGesture),
}

/// A recoverable input pipeline interruption.
///
/// Conditions are signaled through `Result` so enclosing handlers (parsers,
/// accept loops) can intercept them; none of them is fatal. An internal
/// invariant violation in the wait loop itself, by contrast, panics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Condition {
    /// The user canceled the current interaction. Receivers reset any
    /// composition state and propagate.
    Abort,
    /// An out-of-band fast-path gesture, to be handled by an enclosing
    /// context.
    Accelerator(Gesture),
    /// The input source is exhausted; an enclosing context may supply a
    /// default.
    EmptyInput,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("interaction aborted"),
            Self::Accelerator(g) => write!(f, "accelerator gesture {g:?}"),
            Self::EmptyInput => f.write_str("input source is empty"),
        }
    }
}

impl core::error::Error for Condition {}
