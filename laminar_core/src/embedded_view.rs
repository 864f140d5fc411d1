// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parameters describing one embedded platform view for one frame.

use kurbo::{Rect, Size};

use crate::geometry;
use crate::mutator::{Mutator, MutatorStack};
use crate::transform::Transform3d;

/// Immutable snapshot of where and how a platform view is embedded.
///
/// Created once per platform view per frame during preroll and discarded at
/// the end of the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddedViewParams {
    matrix: Transform3d,
    size: Size,
    mutators: MutatorStack,
    final_bounding_rect: Rect,
}

impl EmbeddedViewParams {
    /// Creates the params and computes the device-space bounding rect.
    ///
    /// `matrix` is the full transform from the view's local space to the
    /// device. The view's local rect `{0, 0, size}` is mapped through it, and
    /// the result is then intersected with every clip in `mutators`, each
    /// mapped through the transform mutators pushed before it.
    #[must_use]
    pub fn new(matrix: Transform3d, size: Size, mutators: MutatorStack) -> Self {
        let final_bounding_rect = compute_bounding_rect(&matrix, size, &mutators);
        Self {
            matrix,
            size,
            mutators,
            final_bounding_rect,
        }
    }

    /// The local-to-device transform of the view.
    #[must_use]
    pub const fn matrix(&self) -> &Transform3d {
        &self.matrix
    }

    /// The view's size in logical points.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// The mutators captured when the view was prerolled.
    #[must_use]
    pub const fn mutators(&self) -> &MutatorStack {
        &self.mutators
    }

    /// Axis-aligned device-space bounds of the view after all mutators.
    #[must_use]
    pub const fn final_bounding_rect(&self) -> Rect {
        self.final_bounding_rect
    }
}

fn compute_bounding_rect(matrix: &Transform3d, size: Size, mutators: &MutatorStack) -> Rect {
    let mut bounds = matrix.transform_rect_bounds(size.to_rect());
    let mut running = Transform3d::IDENTITY;
    for mutator in mutators.iter() {
        match &**mutator {
            Mutator::Transform(t) => running = running * *t,
            m => {
                if let Some(clip) = m.clip_bounds() {
                    let device_clip = running.transform_rect_bounds(clip);
                    bounds = geometry::intersection(bounds, device_clip).unwrap_or(Rect::ZERO);
                }
            }
        }
    }
    bounds
}

#[cfg(test)]
mod tests {
    use core::f64::consts::{FRAC_PI_2, FRAC_PI_4, SQRT_2};

    use super::*;

    const EPS: f64 = 1e-5;

    fn assert_xywh(rect: Rect, x: f64, y: f64, w: f64, h: f64) {
        assert!(
            (rect.x0 - x).abs() < EPS
                && (rect.y0 - y).abs() < EPS
                && (rect.width() - w).abs() < EPS
                && (rect.height() - h).abs() < EPS,
            "expected {{{x}, {y}, {w}, {h}}}, got {rect:?}"
        );
    }

    fn params_for(matrix: Transform3d) -> EmbeddedViewParams {
        let mut stack = MutatorStack::new();
        stack.push_transform(matrix);
        EmbeddedViewParams::new(matrix, Size::new(1.0, 1.0), stack)
    }

    #[test]
    fn no_mutations() {
        let params = EmbeddedViewParams::new(
            Transform3d::IDENTITY,
            Size::new(1.0, 1.0),
            MutatorStack::new(),
        );
        assert_eq!(params.final_bounding_rect(), Rect::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn scale() {
        let params = params_for(Transform3d::scale(2.0, 2.0));
        assert_xywh(params.final_bounding_rect(), 0.0, 0.0, 2.0, 2.0);
    }

    #[test]
    fn translate() {
        let params = params_for(Transform3d::translate(1.0, 1.0));
        assert_xywh(params.final_bounding_rect(), 1.0, 1.0, 1.0, 1.0);
    }

    #[test]
    fn rotate_90() {
        let params = params_for(Transform3d::from_rotation_z(FRAC_PI_2));
        assert_xywh(params.final_bounding_rect(), -1.0, 0.0, 1.0, 1.0);
    }

    #[test]
    fn rotate_45() {
        let params = params_for(Transform3d::from_rotation_z(FRAC_PI_4));
        assert_xywh(
            params.final_bounding_rect(),
            -SQRT_2 / 2.0,
            0.0,
            SQRT_2,
            SQRT_2,
        );
    }

    #[test]
    fn translate_scale_rotate() {
        let matrix = Transform3d::translate(2.0, 2.0)
            * Transform3d::scale(3.0, 3.0)
            * Transform3d::from_rotation_z(FRAC_PI_2);
        let params = params_for(matrix);
        assert_xywh(params.final_bounding_rect(), -1.0, 2.0, 3.0, 3.0);
    }

    #[test]
    fn clips_are_mapped_through_preceding_transforms() {
        let mut stack = MutatorStack::new();
        stack.push_transform(Transform3d::translate(10.0, 10.0));
        stack.push_clip_rect(Rect::new(0.0, 0.0, 5.0, 50.0));
        stack.push_transform(Transform3d::scale(2.0, 2.0));
        let matrix = stack.total_transform();
        let params = EmbeddedViewParams::new(matrix, Size::new(10.0, 10.0), stack);
        // View covers (10,10)-(30,30); clip covers (10,10)-(15,60).
        assert_eq!(
            params.final_bounding_rect(),
            Rect::new(10.0, 10.0, 15.0, 30.0)
        );
    }

    #[test]
    fn fully_clipped_view_is_empty() {
        let mut stack = MutatorStack::new();
        stack.push_clip_rect(Rect::new(100.0, 100.0, 110.0, 110.0));
        let params = EmbeddedViewParams::new(Transform3d::IDENTITY, Size::new(10.0, 10.0), stack);
        assert!(geometry::is_empty(params.final_bounding_rect()));
    }
}
