// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rescan parsing: retry a gesture parse from an earlier buffer position.
//!
//! Interactive input editing lets the user revise earlier gestures while a
//! parse is in flight. Rather than patching parser state, the parse is
//! simply re-run over the buffered gestures from the revision point. The
//! driver loop lives in [`parse_gestures`]; a parser signals a restart by
//! returning [`Parse::Rescan`].

/// A growable buffer of gestures with a read cursor.
///
/// Gestures pushed into the buffer stay there; reads advance a cursor that
/// can be repositioned with [`seek`](Self::seek) for rescans.
#[derive(Clone, Debug, Default)]
pub struct GestureStream {
    buffer: Vec<crate::Gesture>,
    cursor: usize,
}

impl GestureStream {
    /// Creates a new empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a gesture to the buffer without moving the cursor.
    pub fn push(&mut self, gesture: crate::Gesture) {
        self.buffer.push(gesture);
    }

    /// Read the gesture under the cursor and advance past it.
    pub fn next(&mut self) -> Option<crate::Gesture> {
        let gesture = *self.buffer.get(self.cursor)?;
        self.cursor += 1;
        Some(gesture)
    }

    /// The current read position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Reposition the cursor; positions past the end clamp to the end.
    pub fn seek(&mut self, position: usize) {
        self.cursor = position.min(self.buffer.len());
    }

    /// Number of buffered gestures, read or not.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer holds no gestures at all.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Replace the gesture at `position`, for input editing before a
    /// rescan.
    ///
    /// # Panics
    ///
    /// Panics if `position` is past the buffered gestures.
    pub fn replace(&mut self, position: usize, gesture: crate::Gesture) {
        self.buffer[position] = gesture;
    }
}

/// The outcome of one parse attempt over a [`GestureStream`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Parse<T> {
    /// The parse finished with a value.
    Complete(T),
    /// Restart the parse from this buffer position.
    Rescan(usize),
}

/// Run `parser` over `stream`, restarting on [`Parse::Rescan`] until it
/// completes.
///
/// Each attempt sees the stream positioned where the previous attempt
/// asked, so a parser may revise buffered gestures (via
/// [`GestureStream::replace`]) and re-read them.
pub fn parse_gestures<T>(
    stream: &mut GestureStream,
    mut parser: impl FnMut(&mut GestureStream) -> Parse<T>,
) -> T {
    loop {
        match parser(stream) {
            Parse::Complete(value) => return value,
            Parse::Rescan(position) => stream.seek(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gesture;

    fn chars(s: &str) -> GestureStream {
        let mut stream = GestureStream::new();
        for c in s.chars() {
            stream.push(Gesture::Char(c));
        }
        stream
    }

    #[test]
    fn cursor_reads_and_seeks() {
        let mut s = chars("abc");
        assert_eq!(s.next(), Some(Gesture::Char('a')));
        assert_eq!(s.next(), Some(Gesture::Char('b')));
        assert_eq!(s.cursor(), 2);
        s.seek(0);
        assert_eq!(s.next(), Some(Gesture::Char('a')));
        s.seek(99);
        assert_eq!(s.next(), None);
    }

    #[test]
    fn rescan_reruns_the_parser_from_the_requested_position() {
        let mut s = chars("12x");
        let mut attempts = 0;
        let n: u32 = parse_gestures(&mut s, |stream| {
            attempts += 1;
            let mut value = 0;
            while let Some(Gesture::Char(c)) = stream.next() {
                match c.to_digit(10) {
                    Some(d) => value = value * 10 + d,
                    None => {
                        // Correct the bad gesture and retry the parse
                        // from the start of the number.
                        let bad = stream.cursor() - 1;
                        stream.replace(bad, Gesture::Char('3'));
                        return Parse::Rescan(0);
                    }
                }
            }
            Parse::Complete(value)
        });
        assert_eq!(n, 123);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn completed_parse_runs_once() {
        let mut s = chars("ok");
        let mut attempts = 0;
        let collected: String = parse_gestures(&mut s, |stream| {
            attempts += 1;
            let mut out = String::new();
            while let Some(Gesture::Char(c)) = stream.next() {
                out.push(c);
            }
            Parse::Complete(out)
        });
        assert_eq!(collected, "ok");
        assert_eq!(attempts, 1);
    }
}
