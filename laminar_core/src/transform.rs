// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transform used by mutators, canvases, and cache keys.
//!
//! The compositor only ever needs a handful of operations on these matrices:
//! composition, mapping points and rects (with a perspective divide), and a
//! few structural queries used by the raster cache. A full linear-algebra
//! crate would be overkill.

use core::ops::Mul;

use kurbo::{Point, Rect};

/// Points whose homogeneous `w` falls at or below this are considered to be
/// behind the eye plane.
const MIN_W: f64 = 1e-9;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by GPU APIs. Element `cols[c][r]` is row `r` of column `c`, so the 2-D
/// translation lives in `cols[3][0]` and `cols[3][1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a 2-D translation transform.
    #[inline]
    #[must_use]
    pub const fn translate(x: f64, y: f64) -> Self {
        Self::from_translation(x, y, 0.0)
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a 2-D scale transform (z is left untouched).
    #[inline]
    #[must_use]
    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::from_scale(sx, sy, 1.0)
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a 2-D skew transform.
    ///
    /// `kx` shears x by y, `ky` shears y by x.
    #[inline]
    #[must_use]
    pub const fn from_skew(kx: f64, ky: f64) -> Self {
        Self {
            cols: [
                [1.0, ky, 0.0, 0.0],
                [kx, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Returns the 2-D translation components `(tx, ty)`.
    #[inline]
    #[must_use]
    pub const fn translation(&self) -> (f64, f64) {
        (self.cols[3][0], self.cols[3][1])
    }

    /// Returns a copy with the 2-D translation replaced.
    #[inline]
    #[must_use]
    pub const fn with_translation(mut self, tx: f64, ty: f64) -> Self {
        self.cols[3][0] = tx;
        self.cols[3][1] = ty;
        self
    }

    /// Returns `self * translate(dx, dy)`, i.e. translates in local space.
    #[inline]
    #[must_use]
    pub fn pre_translate(self, dx: f64, dy: f64) -> Self {
        self * Self::translate(dx, dy)
    }

    /// Whether this is exactly the identity matrix.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Whether the bottom row carries a projective component.
    #[inline]
    #[must_use]
    pub fn has_perspective(&self) -> bool {
        let c = &self.cols;
        c[0][3] != 0.0 || c[1][3] != 0.0 || c[2][3] != 0.0 || c[3][3] != 1.0
    }

    /// Whether this transform only translates and scales.
    ///
    /// Rotation, skew, perspective, and any z coupling into x or y all make
    /// this return `false`. The translation and the diagonal may hold any
    /// value, including non-finite ones.
    #[inline]
    #[must_use]
    pub fn is_translate_scale_only(&self) -> bool {
        let c = &self.cols;
        c[0][1] == 0.0
            && c[0][2] == 0.0
            && c[1][0] == 0.0
            && c[1][2] == 0.0
            && c[2][0] == 0.0
            && c[2][1] == 0.0
            && !self.has_perspective()
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Is this transform [NaN]?
    ///
    /// [NaN]: f64::is_nan
    #[inline]
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.cols.iter().flatten().any(|v| v.is_nan())
    }

    /// Maps a 2-D point (z = 0), applying the perspective divide.
    ///
    /// Returns `None` when the point lands behind the eye plane.
    #[must_use]
    pub fn transform_point(&self, p: Point) -> Option<Point> {
        let c = &self.cols;
        let x = c[0][0] * p.x + c[1][0] * p.y + c[3][0];
        let y = c[0][1] * p.x + c[1][1] * p.y + c[3][1];
        let w = c[0][3] * p.x + c[1][3] * p.y + c[3][3];
        if w == 1.0 {
            Some(Point::new(x, y))
        } else if w > MIN_W {
            Some(Point::new(x / w, y / w))
        } else {
            None
        }
    }

    /// Maps `rect` and returns the axis-aligned box enclosing its four
    /// transformed corners.
    ///
    /// If any corner falls behind the eye plane the mapped shape is
    /// unbounded, and an infinite rect is returned.
    #[must_use]
    pub fn transform_rect_bounds(&self, rect: Rect) -> Rect {
        let corners = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ];
        let mut out: Option<Rect> = None;
        for corner in corners {
            let Some(p) = self.transform_point(corner) else {
                return Rect::new(
                    f64::NEG_INFINITY,
                    f64::NEG_INFINITY,
                    f64::INFINITY,
                    f64::INFINITY,
                );
            };
            out = Some(match out {
                None => Rect::from_points(p, p),
                Some(r) => Rect::new(r.x0.min(p.x), r.y0.min(p.y), r.x1.max(p.x), r.y1.max(p.y)),
            });
        }
        out.unwrap_or(Rect::ZERO)
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}
