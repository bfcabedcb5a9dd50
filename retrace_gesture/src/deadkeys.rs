// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dead-key composition on top of queue reads.

use std::time::{Duration, Instant};

use hashbrown::HashMap;

use crate::queue::{GestureQueue, ReadOutcome};
use crate::{Condition, DeadKey, Gesture};

/// Merges dead keys with the character that follows them.
///
/// A composer wraps reads from a [`GestureQueue`]: a [`Gesture::Dead`]
/// gesture is absorbed rather than delivered, and the next character read
/// comes back composed through the accent table. Unknown combinations fall
/// back to the base character, so a composer never swallows input.
///
/// Composition state is per-composer, not per-queue; an abort condition
/// resets it before propagating.
#[derive(Clone, Debug, Default)]
pub struct DeadKeyComposer {
    table: HashMap<(DeadKey, char), char>,
    pending: Option<DeadKey>,
}

impl DeadKeyComposer {
    /// Creates a composer with an empty accent table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `dead` + `base` as composing to `composed`.
    pub fn define(&mut self, dead: DeadKey, base: char, composed: char) {
        self.table.insert((dead, base), composed);
    }

    /// The absorbed dead key awaiting its base character, if any.
    pub fn pending(&self) -> Option<DeadKey> {
        self.pending
    }

    /// Drop any half-finished composition.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Read the next gesture from `queue`, composing dead keys.
    ///
    /// The timeout bounds the whole call: absorbing a dead key does not
    /// restart the clock for the character that completes it. Pointer
    /// gestures pass through with any pending dead key retained, so a
    /// click between an accent and its base does not cancel the accent.
    pub fn read_composed(
        &mut self,
        queue: &GestureQueue,
        timeout: Option<Duration>,
    ) -> Result<ReadOutcome, Condition> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let outcome = match queue.read(remaining) {
                Ok(outcome) => outcome,
                Err(condition) => {
                    if condition == Condition::Abort {
                        self.reset();
                    }
                    return Err(condition);
                }
            };
            match outcome {
                ReadOutcome::Gesture(Gesture::Dead(key)) => {
                    self.pending = Some(key);
                }
                ReadOutcome::Gesture(Gesture::Char(c)) => {
                    let composed = match self.pending.take() {
                        Some(key) => *self.table.get(&(key, c)).unwrap_or(&c),
                        None => c,
                    };
                    return Ok(ReadOutcome::Gesture(Gesture::Char(composed)));
                }
                other => return Ok(other),
            }
        }
    }
}
