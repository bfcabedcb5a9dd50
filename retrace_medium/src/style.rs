// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graphics state captured by output records and re-applied during replay.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Affine;
use peniko::{Brush, Color};

/// The paint used for drawing. Solid colors, gradients, and images all
/// travel through the same [`peniko::Brush`] representation.
pub type Ink = Brush;

/// Miter limit applied when a [`LineStyle`] does not set its own: joints
/// sharper than this ratio of miter length to half thickness degrade to
/// bevel.
pub const DEFAULT_MITER_LIMIT: f64 = 4.0;

/// How the outside corner of a joint between two line segments is filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JointShape {
    /// Extend the segment borders until they meet, subject to the miter
    /// limit.
    #[default]
    Miter,
    /// Cut the corner with a straight edge.
    Bevel,
    /// Round the corner with half-thickness radius.
    Round,
    /// Leave the corner unfilled.
    None,
}

/// How the end of an open line is finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CapShape {
    /// Cut off flush at the endpoint.
    #[default]
    Butt,
    /// Extend past the endpoint by half the thickness.
    Square,
    /// Round off with half-thickness radius.
    Round,
}

/// Stroke style for line-drawing records.
#[derive(Clone, Debug, PartialEq)]
pub struct LineStyle {
    /// Stroke thickness in stream coordinates.
    pub thickness: f64,
    /// Joint treatment between adjacent segments.
    pub joint: JointShape,
    /// End treatment for open lines and polylines.
    pub cap: CapShape,
    /// On/off dash lengths; empty means solid.
    pub dashes: Vec<f64>,
    /// Ratio of miter length to half thickness beyond which a miter joint
    /// degrades to bevel.
    pub miter_limit: f64,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            thickness: 1.0,
            joint: JointShape::default(),
            cap: CapShape::default(),
            dashes: Vec::new(),
            miter_limit: DEFAULT_MITER_LIMIT,
        }
    }
}

impl LineStyle {
    /// Half the stroke thickness; the distance the stroke extends to either
    /// side of the ideal line.
    #[inline]
    pub fn half_thickness(&self) -> f64 {
        0.5 * self.thickness
    }
}

/// Text style for text-line records.
///
/// Metrics are supplied by whoever measures the text; this crate treats them
/// as opaque vertical extents.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// Font family name.
    pub family: String,
    /// Point size.
    pub size: f64,
    /// Distance from the baseline to the top of the style's tallest glyphs.
    pub ascent: f64,
    /// Distance from the baseline to the bottom of the style's descenders.
    pub descent: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            family: String::new(),
            size: 12.0,
            ascent: 10.0,
            descent: 2.0,
        }
    }
}

impl TextStyle {
    /// Total vertical extent of glyphs in this style.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }
}

/// The full drawing state captured by a record at creation time and
/// re-applied to a [`Medium`](crate::Medium) when the record replays.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphicsState {
    /// The paint drawing happens with.
    pub ink: Ink,
    /// Stroke style for line-drawing records.
    pub line_style: LineStyle,
    /// Text style for text-line records.
    pub text_style: TextStyle,
    /// Transform from the record's coordinates to medium coordinates, as
    /// captured when the record was produced.
    pub transform: Affine,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ink: Brush::Solid(Color::BLACK),
            line_style: LineStyle::default(),
            text_style: TextStyle::default(),
            transform: Affine::IDENTITY,
        }
    }
}

impl GraphicsState {
    /// Whether the captured transform maps axis-aligned rectangles to
    /// axis-aligned rectangles (translation, scale, axis flips, and
    /// quarter-turn rotations).
    pub fn is_axis_rectilinear(&self) -> bool {
        // Tolerates the rounding in e.g. `Affine::rotate(FRAC_PI_2)`.
        const EPS: f64 = 1e-12;
        let [a, b, c, d, _, _] = self.transform.as_coeffs();
        (b.abs() < EPS && c.abs() < EPS) || (a.abs() < EPS && d.abs() < EPS)
    }
}
