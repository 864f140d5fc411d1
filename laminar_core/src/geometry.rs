// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry and paint primitives shared across the compositor.
//!
//! Rects, rounded rects, and paths come from [`kurbo`]; this module adds the
//! few shapes and descriptors kurbo does not model.

use kurbo::{Rect, RoundedRect, RoundedRectRadii};

/// A rectangle whose corners follow a superellipse rather than a circular arc.
///
/// Only the bounds and a rounded-rect approximation matter to the compositor;
/// the exact curve is the rasterizer's business.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoundSuperellipse {
    rect: Rect,
    radii: RoundedRectRadii,
}

impl RoundSuperellipse {
    /// Creates a round superellipse inscribed in `rect`.
    #[must_use]
    pub fn new(rect: Rect, radii: impl Into<RoundedRectRadii>) -> Self {
        Self {
            rect: rect.abs(),
            radii: radii.into(),
        }
    }

    /// The bounding rect.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.rect
    }

    /// The corner radii.
    #[must_use]
    pub const fn radii(&self) -> RoundedRectRadii {
        self.radii
    }

    /// A rounded rect with the same bounds and radii.
    ///
    /// Used by consumers that can only express circular corners.
    #[must_use]
    pub fn to_rounded_rect(&self) -> RoundedRect {
        RoundedRect::from_rect(self.rect, self.radii)
    }
}

/// An image filter applied by a backdrop-filter mutator or layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFilter {
    /// Gaussian blur with per-axis sigma.
    Blur {
        /// Horizontal standard deviation.
        sigma_x: f64,
        /// Vertical standard deviation.
        sigma_y: f64,
    },
    /// Morphological dilation.
    Dilate {
        /// Horizontal radius.
        radius_x: f64,
        /// Vertical radius.
        radius_y: f64,
    },
    /// Morphological erosion.
    Erode {
        /// Horizontal radius.
        radius_x: f64,
        /// Vertical radius.
        radius_y: f64,
    },
}

impl ImageFilter {
    /// Returns the device-space rect whose source pixels the filter reads to
    /// produce `output`.
    ///
    /// Blur and dilate read outside the output rect; erode reads within it
    /// but still needs the same neighborhood.
    #[must_use]
    pub fn input_bounds(&self, output: Rect) -> Rect {
        match *self {
            Self::Blur { sigma_x, sigma_y } => output.inflate(sigma_x * 3.0, sigma_y * 3.0),
            Self::Dilate { radius_x, radius_y } | Self::Erode { radius_x, radius_y } => {
                output.inflate(radius_x, radius_y)
            }
        }
    }
}

/// An 8-bit RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::from_rgba8(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::from_rgba8(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::from_rgba8(255, 255, 255, 255);

    /// Creates a color from 8-bit components.
    #[must_use]
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Whether the color is fully opaque.
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        self.a == 255
    }
}

/// Whether `rect` covers no area (including NaN extents).
#[must_use]
pub fn is_empty(rect: Rect) -> bool {
    !(rect.x1 > rect.x0 && rect.y1 > rect.y0)
}

/// Intersection of two rects, or `None` if they do not overlap.
#[must_use]
pub fn intersection(a: Rect, b: Rect) -> Option<Rect> {
    let r = a.intersect(b);
    if is_empty(r) { None } else { Some(r) }
}

/// Whether two rects share any area.
#[must_use]
pub fn overlaps(a: Rect, b: Rect) -> bool {
    intersection(a, b).is_some()
}

/// Whether `outer` fully contains `inner`.
#[must_use]
pub fn contains_rect(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

/// Rounds each edge outward to the enclosing integer rect.
#[must_use]
pub fn round_out(rect: Rect) -> Rect {
    Rect::new(
        rect.x0.floor(),
        rect.y0.floor(),
        rect.x1.ceil(),
        rect.y1.ceil(),
    )
}

/// Whether two rects are equal within `epsilon` on every edge.
#[must_use]
pub fn nearly_equal(a: Rect, b: Rect, epsilon: f64) -> bool {
    (a.x0 - b.x0).abs() <= epsilon
        && (a.y0 - b.y0).abs() <= epsilon
        && (a.x1 - b.x1).abs() <= epsilon
        && (a.y1 - b.y1).abs() <= epsilon
}
