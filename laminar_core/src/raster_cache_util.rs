// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Numeric helpers for drawing cached raster images without resampling.
//!
//! A cached image is rasterized at device resolution. If it is later drawn
//! with a fractional device translation, the GPU has to resample it and the
//! result blurs. Snapping the translation to whole pixels avoids that, but is
//! only sound for matrices without rotation, skew, or perspective: rounding
//! the translation of a rotated matrix independently of its rotation would
//! visibly distort the image.

use kurbo::Rect;

use crate::geometry;
use crate::transform::Transform3d;

/// Snaps the translation of a translate/scale matrix to whole pixels.
///
/// Returns `None` when the matrix has any skew, rotation, or perspective
/// term, when its translation is already integral, or when either translation
/// component is NaN or infinite. Otherwise returns a copy of `ctm` with
/// `tx` and `ty` rounded half away from zero (`1.5 → 2`, `-2.5 → -3`).
#[must_use]
pub fn compute_integral_trans_ctm(ctm: &Transform3d) -> Option<Transform3d> {
    if !ctm.is_translate_scale_only() {
        return None;
    }
    let (tx, ty) = ctm.translation();
    // NaN compares unequal to its rounding, so check finiteness explicitly
    // rather than relying on the comparison below.
    if !tx.is_finite() || !ty.is_finite() {
        return None;
    }
    let (rx, ry) = (tx.round(), ty.round());
    if rx == tx && ry == ty {
        return None;
    }
    Some(ctm.with_translation(rx, ry))
}

/// Returns the snapped matrix when snapping applies, otherwise `ctm` itself.
#[must_use]
pub fn get_integral_trans_ctm(ctm: &Transform3d) -> Transform3d {
    compute_integral_trans_ctm(ctm).unwrap_or(*ctm)
}

/// Whole-pixel device bounds of `rect` drawn with `ctm`.
///
/// This is the size a raster-cache image for `rect` must have.
#[must_use]
pub fn device_bounds(rect: Rect, ctm: &Transform3d) -> Rect {
    geometry::round_out(ctm.transform_rect_bounds(rect))
}

#[cfg(test)]
mod tests {
    use core::f64::consts::FRAC_PI_4;

    use super::*;

    #[test]
    fn fractional_translation_is_rounded() {
        let m = Transform3d::translate(1.3, -2.7);
        let snapped = compute_integral_trans_ctm(&m).unwrap();
        assert_eq!(snapped.translation(), (1.0, -3.0));
    }

    #[test]
    fn halves_round_away_from_zero() {
        let m = Transform3d::translate(1.5, -2.5);
        let snapped = compute_integral_trans_ctm(&m).unwrap();
        assert_eq!(snapped.translation(), (2.0, -3.0));
    }

    #[test]
    fn scale_is_preserved() {
        let m = Transform3d::translate(0.4, 0.6) * Transform3d::scale(2.0, 3.0);
        let snapped = compute_integral_trans_ctm(&m).unwrap();
        assert_eq!(snapped, Transform3d::translate(0.0, 1.0) * Transform3d::scale(2.0, 3.0));
    }

    #[test]
    fn integral_translation_is_not_snapped() {
        assert!(compute_integral_trans_ctm(&Transform3d::translate(3.0, -4.0)).is_none());
        assert!(compute_integral_trans_ctm(&Transform3d::IDENTITY).is_none());
    }

    #[test]
    fn non_axis_aligned_matrices_are_rejected() {
        let offset = Transform3d::translate(1.3, 2.7);
        let rotated = offset * Transform3d::from_rotation_z(FRAC_PI_4);
        let skewed = offset * Transform3d::from_skew(0.5, 0.0);
        let mut perspective = offset;
        perspective.cols[2][3] = -0.01;
        for m in [rotated, skewed, perspective] {
            assert!(compute_integral_trans_ctm(&m).is_none(), "{m:?}");
        }
    }

    #[test]
    fn non_finite_translation_is_rejected() {
        for (tx, ty) in [
            (f64::NAN, 0.5),
            (0.5, f64::NAN),
            (f64::INFINITY, 0.5),
            (f64::NAN, 1.0),
        ] {
            let m = Transform3d::translate(tx, ty);
            assert!(compute_integral_trans_ctm(&m).is_none());
        }
    }

    #[test]
    fn get_falls_back_to_input() {
        let rotated = Transform3d::from_rotation_z(FRAC_PI_4);
        assert_eq!(get_integral_trans_ctm(&rotated), rotated);
        assert_eq!(
            get_integral_trans_ctm(&Transform3d::translate(0.2, 0.2)),
            Transform3d::IDENTITY
        );
    }

    #[test]
    fn device_bounds_round_out() {
        let r = device_bounds(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            &Transform3d::translate(0.5, 0.25),
        );
        assert_eq!(r, Rect::new(0.0, 0.0, 11.0, 11.0));
    }
}
