// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scoped input focus transfer.

use std::sync::Mutex;

const POISONED: &str = "focus state lock poisoned";

/// Which target currently receives input, shared between threads.
///
/// `T` identifies a focus target (a stream id, a pane handle). `None`
/// means nothing holds focus.
#[derive(Debug, Default)]
pub struct FocusState<T> {
    current: Mutex<Option<T>>,
}

impl<T: Clone> FocusState<T> {
    /// Creates a state with nothing focused.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// The current focus holder, if any.
    pub fn current(&self) -> Option<T> {
        self.current.lock().expect(POISONED).clone()
    }

    /// Set the focus holder, returning the previous one.
    pub fn set(&self, target: Option<T>) -> Option<T> {
        core::mem::replace(&mut *self.current.lock().expect(POISONED), target)
    }
}

/// Restores the saved focus when dropped.
struct FocusGuard<'a, T: Clone> {
    state: &'a FocusState<T>,
    previous: Option<T>,
}

impl<T: Clone> Drop for FocusGuard<'_, T> {
    fn drop(&mut self) {
        self.state.set(self.previous.take());
    }
}

/// Run `body` with input focus moved to `target`.
///
/// The previous focus holder is restored on every exit path, including an
/// unwind out of `body`, so a panicking interaction never leaves focus
/// stranded on its target.
pub fn with_input_focus<T: Clone, R>(
    state: &FocusState<T>,
    target: T,
    body: impl FnOnce() -> R,
) -> R {
    let guard = FocusGuard {
        state,
        previous: state.set(Some(target)),
    };
    let result = body();
    drop(guard);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_is_scoped_to_the_body() {
        let state = FocusState::new();
        state.set(Some("outer"));
        let seen = with_input_focus(&state, "inner", || state.current());
        assert_eq!(seen, Some("inner"));
        assert_eq!(state.current(), Some("outer"));
    }

    #[test]
    fn nested_transfers_unwind_in_order() {
        let state = FocusState::new();
        with_input_focus(&state, 1, || {
            with_input_focus(&state, 2, || {
                assert_eq!(state.current(), Some(2));
            });
            assert_eq!(state.current(), Some(1));
        });
        assert_eq!(state.current(), None);
    }

    #[test]
    fn focus_restored_when_the_body_panics() {
        let state = FocusState::new();
        state.set(Some('a'));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_input_focus(&state, 'b', || panic!("interaction failed"));
        }));
        assert!(result.is_err(), "body should have panicked");
        assert_eq!(state.current(), Some('a'));
    }
}
