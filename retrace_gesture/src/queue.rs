// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The producer/consumer gesture queue.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::{Condition, Gesture};

const POISONED: &str = "gesture queue lock poisoned";

/// How often a read waiting only on a caller predicate rechecks it.
const WAIT_TEST_POLL: Duration = Duration::from_millis(10);

/// How a read without a gesture to deliver came back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReadOutcome {
    /// A gesture was (or, when peeking, is) available.
    Gesture(Gesture),
    /// The wall-clock deadline elapsed with the queue empty. A zero
    /// timeout on an empty queue yields this immediately, without
    /// blocking.
    Timeout,
    /// The caller's wait predicate became true with the queue empty.
    WaitTest,
}

/// Options for [`GestureQueue::read_opts`].
#[derive(Clone, Copy, Default)]
pub struct ReadOptions<'a> {
    /// Give up after this long. `None` blocks indefinitely.
    pub timeout: Option<Duration>,
    /// Deliver the front gesture without consuming it.
    pub peek: bool,
    /// Return [`ReadOutcome::WaitTest`] once this predicate is true while
    /// the queue is empty.
    pub wait_test: Option<&'a (dyn Fn() -> bool + Send + Sync)>,
}

impl core::fmt::Debug for ReadOptions<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReadOptions")
            .field("timeout", &self.timeout)
            .field("peek", &self.peek)
            .field("wait_test", &self.wait_test.map(|_| ".."))
            .finish()
    }
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<Gesture>,
    /// Gestures intercepted as [`Condition::Abort`].
    aborts: Vec<Gesture>,
    /// Gestures intercepted as [`Condition::Accelerator`].
    accelerators: Vec<Gesture>,
    /// Producer signaled end of input.
    closed: bool,
}

/// A thread-safe FIFO of raw gestures.
///
/// The host event dispatcher appends on its own thread; consumers block in
/// [`read`](Self::read) until a gesture, a predicate, or a deadline wakes
/// them. Consumers suspend on a condition variable rather than spinning and
/// wake promptly on append.
#[derive(Debug, Default)]
pub struct GestureQueue {
    inner: Mutex<Inner>,
    ready: Condvar,
}

impl GestureQueue {
    /// Creates a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gestures to intercept as [`Condition::Abort`] during reads.
    pub fn set_abort_gestures(&self, gestures: Vec<Gesture>) {
        self.inner.lock().expect(POISONED).aborts = gestures;
        self.ready.notify_all();
    }

    /// Gestures to intercept as [`Condition::Accelerator`] during reads.
    pub fn set_accelerator_gestures(&self, gestures: Vec<Gesture>) {
        self.inner.lock().expect(POISONED).accelerators = gestures;
        self.ready.notify_all();
    }

    /// Append a gesture (producer side) and wake waiting readers.
    pub fn append(&self, gesture: Gesture) {
        self.inner.lock().expect(POISONED).queue.push_back(gesture);
        self.ready.notify_all();
    }

    /// Push a gesture back to the front of the queue, undoing one read.
    /// Supports one-token lookahead in parsers.
    pub fn unread(&self, gesture: Gesture) {
        self.inner.lock().expect(POISONED).queue.push_front(gesture);
        self.ready.notify_all();
    }

    /// Signal end of input: once drained, reads return
    /// [`Condition::EmptyInput`].
    pub fn close(&self) {
        self.inner.lock().expect(POISONED).closed = true;
        self.ready.notify_all();
    }

    /// Number of queued gestures.
    pub fn len(&self) -> usize {
        self.inner.lock().expect(POISONED).queue.len()
    }

    /// Whether no gestures are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the next gesture, blocking up to `timeout`.
    pub fn read(&self, timeout: Option<Duration>) -> Result<ReadOutcome, Condition> {
        self.read_opts(ReadOptions {
            timeout,
            ..ReadOptions::default()
        })
    }

    /// Read with full options; see [`ReadOptions`].
    ///
    /// The wall-clock deadline is fixed up front and re-derived on every
    /// retry, so spurious wakes never extend the wait. A read carrying a
    /// predicate sleeps in short slices, rechecking the predicate between
    /// them.
    pub fn read_opts(&self, opts: ReadOptions<'_>) -> Result<ReadOutcome, Condition> {
        let deadline = opts.timeout.map(|t| Instant::now() + t);
        let mut inner = self.inner.lock().expect(POISONED);
        loop {
            if let Some(outcome) = Self::deliver(&mut inner, opts.peek) {
                return outcome;
            }
            if inner.closed {
                return Err(Condition::EmptyInput);
            }
            if let Some(test) = opts.wait_test
                && test()
            {
                return Ok(ReadOutcome::WaitTest);
            }
            let now = Instant::now();
            if let Some(d) = deadline
                && now >= d
            {
                return Ok(ReadOutcome::Timeout);
            }

            let wait_for = match (deadline, opts.wait_test) {
                (Some(d), Some(_)) => Some(WAIT_TEST_POLL.min(d - now)),
                (Some(d), None) => Some(d - now),
                (None, Some(_)) => Some(WAIT_TEST_POLL),
                (None, None) => None,
            };
            // Spurious wakes and expired poll slices both just loop; the
            // checks above decide what the wake means.
            inner = match wait_for {
                Some(dur) => self.ready.wait_timeout(inner, dur).expect(POISONED).0,
                None => self.ready.wait(inner).expect(POISONED),
            };
        }
    }

    /// Deliver the front gesture if present, intercepting abort and
    /// accelerator gestures as conditions. Conditions consume the gesture
    /// even when peeking.
    fn deliver(
        inner: &mut MutexGuard<'_, Inner>,
        peek: bool,
    ) -> Option<Result<ReadOutcome, Condition>> {
        let front = *inner.queue.front()?;
        if inner.aborts.contains(&front) {
            inner.queue.pop_front();
            return Some(Err(Condition::Abort));
        }
        if inner.accelerators.contains(&front) {
            inner.queue.pop_front();
            return Some(Err(Condition::Accelerator(front)));
        }
        if !peek {
            inner.queue.pop_front();
        }
        Some(Ok(ReadOutcome::Gesture(front)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn zero_timeout_on_empty_queue_is_nonblocking() {
        let q = GestureQueue::new();
        let started = Instant::now();
        let out = q.read(Some(Duration::ZERO)).unwrap();
        assert_eq!(out, ReadOutcome::Timeout);
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn fifo_with_unread_lookahead() {
        let q = GestureQueue::new();
        q.append(Gesture::Char('a'));
        q.append(Gesture::Char('b'));
        assert_eq!(
            q.read(None).unwrap(),
            ReadOutcome::Gesture(Gesture::Char('a'))
        );
        // Push back and re-read the same token.
        q.unread(Gesture::Char('a'));
        assert_eq!(
            q.read(None).unwrap(),
            ReadOutcome::Gesture(Gesture::Char('a'))
        );
        assert_eq!(
            q.read(None).unwrap(),
            ReadOutcome::Gesture(Gesture::Char('b'))
        );
    }

    #[test]
    fn peek_does_not_consume() {
        let q = GestureQueue::new();
        q.append(Gesture::Char('x'));
        let opts = ReadOptions {
            peek: true,
            ..ReadOptions::default()
        };
        assert_eq!(
            q.read_opts(opts).unwrap(),
            ReadOutcome::Gesture(Gesture::Char('x'))
        );
        assert_eq!(q.len(), 1);
        assert_eq!(
            q.read(None).unwrap(),
            ReadOutcome::Gesture(Gesture::Char('x'))
        );
    }

    #[test]
    fn blocked_reader_wakes_on_append() {
        let q = Arc::new(GestureQueue::new());
        let producer = Arc::clone(&q);
        let handle = thread::spawn(move || q.read(Some(Duration::from_secs(5))).unwrap());
        thread::sleep(Duration::from_millis(20));
        producer.append(Gesture::Char('z'));
        assert_eq!(
            handle.join().unwrap(),
            ReadOutcome::Gesture(Gesture::Char('z'))
        );
    }

    #[test]
    fn abort_and_accelerator_gestures_become_conditions() {
        let q = GestureQueue::new();
        q.set_abort_gestures(vec![Gesture::Char('\u{7}')]);
        q.set_accelerator_gestures(vec![Gesture::Char('\t')]);
        q.append(Gesture::Char('\u{7}'));
        q.append(Gesture::Char('\t'));
        q.append(Gesture::Char('a'));

        assert_eq!(q.read(None), Err(Condition::Abort));
        assert_eq!(
            q.read(None),
            Err(Condition::Accelerator(Gesture::Char('\t')))
        );
        assert_eq!(
            q.read(None).unwrap(),
            ReadOutcome::Gesture(Gesture::Char('a'))
        );
    }

    #[test]
    fn wait_test_fires_on_empty_queue() {
        let q = GestureQueue::new();
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            setter.store(true, Ordering::SeqCst);
        });
        let test = move || flag.load(Ordering::SeqCst);
        let out = q
            .read_opts(ReadOptions {
                timeout: Some(Duration::from_secs(5)),
                peek: false,
                wait_test: Some(&test),
            })
            .unwrap();
        assert_eq!(out, ReadOutcome::WaitTest);
        handle.join().unwrap();
    }

    #[test]
    fn false_wait_test_with_deadline_times_out_quietly() {
        // The deadline spans several poll slices; each expired slice must
        // re-poll the predicate, not treat the wake as fatal.
        let q = GestureQueue::new();
        let test = || false;
        let out = q
            .read_opts(ReadOptions {
                timeout: Some(Duration::from_millis(60)),
                peek: false,
                wait_test: Some(&test),
            })
            .unwrap();
        assert_eq!(out, ReadOutcome::Timeout);
    }

    #[test]
    fn closed_queue_signals_empty_input_after_draining() {
        let q = GestureQueue::new();
        q.append(Gesture::Char('a'));
        q.close();
        assert_eq!(
            q.read(None).unwrap(),
            ReadOutcome::Gesture(Gesture::Char('a'))
        );
        assert_eq!(q.read(None), Err(Condition::EmptyInput));
    }
}
