// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text line records: styled runs appended left to right.

use alloc::string::String;
use kurbo::{Point, Rect};

use retrace_medium::{Medium, TextStyle};

use crate::extent::Extent;

/// Horizontal metrics for a piece of measured text, supplied by whoever
/// measures glyphs. `width` is the pen advance; the bearings locate actual
/// ink relative to the pen origin and may overhang the advance on either
/// side (e.g. italics).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunMetrics {
    /// Pen advance of the run.
    pub width: f64,
    /// Leftmost inked x relative to the run origin; negative for left
    /// overhang.
    pub left_bearing: f64,
    /// Rightmost inked x relative to the run origin; may exceed `width`.
    pub right_bearing: f64,
}

impl RunMetrics {
    /// Metrics for text whose ink exactly spans its advance.
    pub fn tight(width: f64) -> Self {
        Self {
            width,
            left_bearing: 0.0,
            right_bearing: width,
        }
    }
}

/// One maximal same-style stretch of a text line.
#[derive(Clone, Debug, PartialEq)]
pub struct StyledRun {
    /// The run's characters.
    pub text: String,
    /// The style all of `text` is drawn in.
    pub style: TextStyle,
    /// Measured horizontal metrics for `text` in `style`.
    pub metrics: RunMetrics,
}

/// A line of text as a sequence of styled runs.
///
/// Runs are appended left to right. Appending text in the same style as the
/// trailing run merges into it (amortized string growth); a style change
/// starts a new run. The line tracks its pen start position and derives
/// width, height, and baseline from the accumulated runs.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLine {
    /// Pen position of the first run: x is the left edge of the nominal
    /// line box, y is its top.
    start: Point,
    runs: alloc::vec::Vec<StyledRun>,
}

impl TextLine {
    /// An empty line starting at `start` (top-left of the line box).
    pub fn new(start: Point) -> Self {
        Self {
            start,
            runs: alloc::vec::Vec::new(),
        }
    }

    /// The line's pen start position.
    pub fn start(&self) -> Point {
        self.start
    }

    /// The accumulated runs, left to right.
    pub fn runs(&self) -> &[StyledRun] {
        &self.runs
    }

    /// Append measured text in `style`.
    ///
    /// Merges into the trailing run when the style matches; the merged run's
    /// advance grows by `metrics.width`, and its bearings keep the widest
    /// ink on either side once the new text's are re-based onto the merged
    /// origin.
    pub fn append(&mut self, text: &str, style: &TextStyle, metrics: RunMetrics) {
        if let Some(last) = self.runs.last_mut()
            && last.style == *style
        {
            let offset = last.metrics.width;
            last.text.push_str(text);
            last.metrics.width += metrics.width;
            last.metrics.right_bearing =
                last.metrics.right_bearing.max(offset + metrics.right_bearing);
            last.metrics.left_bearing = last.metrics.left_bearing.min(offset + metrics.left_bearing);
            return;
        }
        let mut run = StyledRun {
            text: String::new(),
            style: style.clone(),
            metrics,
        };
        run.text.push_str(text);
        self.runs.push(run);
    }

    /// Total pen advance of the line.
    pub fn width(&self) -> f64 {
        self.runs.iter().map(|r| r.metrics.width).sum()
    }

    /// Line height: the tallest run's ascent plus descent.
    pub fn height(&self) -> f64 {
        self.runs.iter().map(|r| r.style.height()).fold(0.0, f64::max)
    }

    /// Baseline offset from the top of the line box: the maximum ascent
    /// among the runs.
    pub fn baseline(&self) -> f64 {
        self.runs.iter().map(|r| r.style.ascent).fold(0.0, f64::max)
    }

    /// The concatenated text of all runs.
    pub fn string(&self) -> String {
        let mut s = String::new();
        for run in &self.runs {
            s.push_str(&run.text);
        }
        s
    }

    /// Leftmost inked x, including bearing overhang.
    pub fn left(&self) -> f64 {
        let mut left = self.start.x;
        let mut origin = self.start.x;
        for run in &self.runs {
            left = left.min(origin + run.metrics.left_bearing);
            origin += run.metrics.width;
        }
        left
    }

    /// Rightmost inked x, including bearing overhang.
    pub fn right(&self) -> f64 {
        let mut right = self.start.x + self.width();
        let mut origin = self.start.x;
        for run in &self.runs {
            right = right.max(origin + run.metrics.right_bearing);
            origin += run.metrics.width;
        }
        right
    }

    /// The line's extent: `[left, y, right, y + height]`. An empty line is
    /// null at its start position.
    pub fn extent(&self) -> Extent {
        if self.runs.is_empty() {
            return Extent::null_at(self.start);
        }
        Extent::from(Rect::new(
            self.left(),
            self.start.y,
            self.right(),
            self.start.y + self.height(),
        ))
    }

    /// Draw the runs left to right, setting each run's style before its
    /// text. Origins sit on the baseline.
    pub fn replay<M: Medium>(&self, medium: &mut M) {
        let baseline_y = self.start.y + self.baseline();
        let mut origin_x = self.start.x;
        for run in &self.runs {
            medium.set_text_style(&run.style);
            medium.draw_text(Point::new(origin_x, baseline_y), &run.text);
            origin_x += run.metrics.width;
        }
    }

    /// This line shifted by `delta`.
    pub(crate) fn translate(&mut self, delta: kurbo::Vec2) {
        self.start += delta;
    }
}
