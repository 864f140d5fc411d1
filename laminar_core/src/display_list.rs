// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recorded drawing: [`DisplayList`] and its recording canvas.
//!
//! A display list is an immutable sequence of [`DisplayOp`]s plus the
//! device-space bounds of everything it draws. The per-op bounds are kept as
//! well so that consumers (the platform-view layer builder in particular) can
//! tell which parts of a slice actually contain content.

use std::sync::Arc;

use kurbo::{BezPath, Rect, RoundedRect, Shape};

use crate::canvas::{Canvas, ClipOp, ImageHandle};
use crate::geometry::{self, Color, ImageFilter};
use crate::id::{LayerIdAllocator, LayerUniqueId};
use crate::transform::Transform3d;

/// One recorded drawing operation.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayOp {
    /// [`Canvas::save`].
    Save,
    /// [`Canvas::save_layer`].
    SaveLayer {
        /// Optional layer bounds in local space.
        bounds: Option<Rect>,
        /// Group opacity.
        opacity: f32,
        /// Backdrop filter, if any.
        backdrop: Option<ImageFilter>,
    },
    /// [`Canvas::restore`].
    Restore,
    /// [`Canvas::transform`].
    Transform(Transform3d),
    /// [`Canvas::set_transform`].
    SetTransform(Transform3d),
    /// [`Canvas::clip_rect`].
    ClipRect {
        /// Clip shape.
        rect: Rect,
        /// Clip operation.
        op: ClipOp,
        /// Anti-aliased edges.
        is_aa: bool,
    },
    /// [`Canvas::clip_rounded_rect`].
    ClipRoundedRect {
        /// Clip shape.
        rrect: RoundedRect,
        /// Clip operation.
        op: ClipOp,
        /// Anti-aliased edges.
        is_aa: bool,
    },
    /// [`Canvas::clip_path`].
    ClipPath {
        /// Clip shape.
        path: BezPath,
        /// Clip operation.
        op: ClipOp,
        /// Anti-aliased edges.
        is_aa: bool,
    },
    /// [`Canvas::draw_rect`].
    DrawRect {
        /// Filled rect.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// [`Canvas::draw_image`].
    DrawImage {
        /// Image handle.
        image: ImageHandle,
        /// Destination rect.
        dst: Rect,
        /// Opacity.
        opacity: f32,
    },
    /// [`Canvas::draw_display_list`].
    DrawDisplayList {
        /// Nested list.
        list: Arc<DisplayList>,
        /// Opacity.
        opacity: f32,
    },
    /// [`Canvas::clear`].
    Clear(Color),
}

impl DisplayOp {
    /// Whether this op produces pixels.
    #[must_use]
    pub const fn is_draw(&self) -> bool {
        matches!(
            self,
            Self::DrawRect { .. }
                | Self::DrawImage { .. }
                | Self::DrawDisplayList { .. }
                | Self::Clear(_)
        )
    }
}

/// An immutable recording produced by [`DisplayListBuilder::build`].
#[derive(Debug, PartialEq)]
pub struct DisplayList {
    id: LayerUniqueId,
    ops: Vec<DisplayOp>,
    bounds: Rect,
    rects: Vec<Rect>,
}

impl DisplayList {
    /// Unique id, used as a raster-cache key.
    #[must_use]
    pub const fn id(&self) -> LayerUniqueId {
        self.id
    }

    /// The recorded ops, in order.
    #[must_use]
    pub fn ops(&self) -> &[DisplayOp] {
        &self.ops
    }

    /// Union of the device bounds of every draw, or [`Rect::ZERO`] when
    /// nothing is drawn.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Device bounds of each individual draw.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Whether the list draws nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of ops, counting nested lists when `nested` is set.
    #[must_use]
    pub fn op_count(&self, nested: bool) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                DisplayOp::DrawDisplayList { list, .. } if nested => 1 + list.op_count(true),
                _ => 1,
            })
            .sum()
    }

    /// Replays every op into `canvas`.
    pub fn dispatch(&self, canvas: &mut dyn Canvas) {
        for op in &self.ops {
            match op {
                DisplayOp::Save => canvas.save(),
                DisplayOp::SaveLayer {
                    bounds,
                    opacity,
                    backdrop,
                } => canvas.save_layer(*bounds, *opacity, backdrop.as_ref()),
                DisplayOp::Restore => canvas.restore(),
                DisplayOp::Transform(m) => canvas.transform(m),
                DisplayOp::SetTransform(m) => canvas.set_transform(m),
                DisplayOp::ClipRect { rect, op, is_aa } => canvas.clip_rect(*rect, *op, *is_aa),
                DisplayOp::ClipRoundedRect { rrect, op, is_aa } => {
                    canvas.clip_rounded_rect(*rrect, *op, *is_aa);
                }
                DisplayOp::ClipPath { path, op, is_aa } => canvas.clip_path(path, *op, *is_aa),
                DisplayOp::DrawRect { rect, color } => canvas.draw_rect(*rect, *color),
                DisplayOp::DrawImage {
                    image,
                    dst,
                    opacity,
                } => canvas.draw_image(image, *dst, *opacity),
                DisplayOp::DrawDisplayList { list, opacity } => {
                    canvas.draw_display_list(list, *opacity);
                }
                DisplayOp::Clear(color) => canvas.clear(*color),
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SaveEntry {
    matrix: Transform3d,
    clip: Rect,
}

/// A [`Canvas`] that records into a [`DisplayList`].
#[derive(Debug)]
pub struct DisplayListBuilder {
    ops: Vec<DisplayOp>,
    stack: Vec<SaveEntry>,
    rects: Vec<Rect>,
}

impl Default for DisplayListBuilder {
    fn default() -> Self {
        Self::new()
    }
}

const UNBOUNDED: Rect = Rect::new(
    f64::NEG_INFINITY,
    f64::NEG_INFINITY,
    f64::INFINITY,
    f64::INFINITY,
);

impl DisplayListBuilder {
    /// Creates an unclipped builder.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cull_rect(UNBOUNDED)
    }

    /// Creates a builder whose content is culled to `cull_rect`.
    #[must_use]
    pub fn with_cull_rect(cull_rect: Rect) -> Self {
        Self {
            ops: Vec::new(),
            stack: vec![SaveEntry {
                matrix: Transform3d::IDENTITY,
                clip: cull_rect,
            }],
            rects: Vec::new(),
        }
    }

    /// Number of ops recorded so far.
    #[must_use]
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Finishes recording with an id from the global allocator.
    #[must_use]
    pub fn build(self) -> Arc<DisplayList> {
        self.build_with_ids(LayerIdAllocator::global())
    }

    /// Finishes recording with an id from `ids`.
    #[must_use]
    pub fn build_with_ids(self, ids: &LayerIdAllocator) -> Arc<DisplayList> {
        let bounds = self
            .rects
            .iter()
            .copied()
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO);
        Arc::new(DisplayList {
            id: ids.next_unique_id(),
            ops: self.ops,
            bounds,
            rects: self.rects,
        })
    }

    fn current(&self) -> &SaveEntry {
        // The base entry is never popped.
        &self.stack[self.stack.len() - 1]
    }

    fn current_mut(&mut self) -> &mut SaveEntry {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn accumulate(&mut self, local: Rect) {
        let entry = self.current();
        let device = entry.matrix.transform_rect_bounds(local);
        if let Some(visible) = geometry::intersection(device, entry.clip)
            && visible.is_finite()
        {
            self.rects.push(visible);
        }
    }

    fn accumulate_clip(&mut self) {
        let clip = self.current().clip;
        if clip.is_finite() && !geometry::is_empty(clip) {
            self.rects.push(clip);
        }
    }

    fn apply_clip(&mut self, local_bounds: Rect, op: ClipOp) {
        if op == ClipOp::Difference {
            return;
        }
        let entry = self.current_mut();
        let device = entry.matrix.transform_rect_bounds(local_bounds);
        entry.clip = entry.clip.intersect(device);
    }
}

impl Canvas for DisplayListBuilder {
    fn save(&mut self) {
        let top = *self.current();
        self.stack.push(top);
        self.ops.push(DisplayOp::Save);
    }

    fn save_layer(&mut self, bounds: Option<Rect>, opacity: f32, backdrop: Option<&ImageFilter>) {
        let top = *self.current();
        self.stack.push(top);
        self.ops.push(DisplayOp::SaveLayer {
            bounds,
            opacity,
            backdrop: backdrop.copied(),
        });
        if backdrop.is_some() {
            // A backdrop filter can touch everything under the layer bounds.
            match bounds {
                Some(area) => self.accumulate(area),
                None => self.accumulate_clip(),
            }
        }
    }

    fn restore(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
            self.ops.push(DisplayOp::Restore);
        }
    }

    fn save_count(&self) -> usize {
        self.stack.len()
    }

    fn transform(&mut self, matrix: &Transform3d) {
        let entry = self.current_mut();
        entry.matrix = entry.matrix * *matrix;
        self.ops.push(DisplayOp::Transform(*matrix));
    }

    fn set_transform(&mut self, matrix: &Transform3d) {
        self.current_mut().matrix = *matrix;
        self.ops.push(DisplayOp::SetTransform(*matrix));
    }

    fn clip_rect(&mut self, rect: Rect, op: ClipOp, is_aa: bool) {
        self.apply_clip(rect, op);
        self.ops.push(DisplayOp::ClipRect { rect, op, is_aa });
    }

    fn clip_rounded_rect(&mut self, rrect: RoundedRect, op: ClipOp, is_aa: bool) {
        self.apply_clip(rrect.rect(), op);
        self.ops.push(DisplayOp::ClipRoundedRect { rrect, op, is_aa });
    }

    fn clip_path(&mut self, path: &BezPath, op: ClipOp, is_aa: bool) {
        self.apply_clip(path.bounding_box(), op);
        self.ops.push(DisplayOp::ClipPath {
            path: path.clone(),
            op,
            is_aa,
        });
    }

    fn draw_rect(&mut self, rect: Rect, color: Color) {
        self.accumulate(rect);
        self.ops.push(DisplayOp::DrawRect { rect, color });
    }

    fn draw_image(&mut self, image: &ImageHandle, dst: Rect, opacity: f32) {
        self.accumulate(dst);
        self.ops.push(DisplayOp::DrawImage {
            image: *image,
            dst,
            opacity,
        });
    }

    fn draw_display_list(&mut self, list: &Arc<DisplayList>, opacity: f32) {
        if !list.is_empty() {
            self.accumulate(list.bounds());
        }
        self.ops.push(DisplayOp::DrawDisplayList {
            list: Arc::clone(list),
            opacity,
        });
    }

    fn clear(&mut self, color: Color) {
        self.accumulate_clip();
        self.ops.push(DisplayOp::Clear(color));
    }

    fn total_matrix(&self) -> Transform3d {
        self.current().matrix
    }

    fn device_clip_bounds(&self) -> Option<Rect> {
        let clip = self.current().clip;
        if clip.is_finite() { Some(clip) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_follow_transform_and_clip() {
        let mut builder = DisplayListBuilder::new();
        builder.translate(10.0, 0.0);
        builder.clip_rect(Rect::new(0.0, 0.0, 5.0, 5.0), ClipOp::Intersect, false);
        builder.draw_rect(Rect::new(0.0, 0.0, 100.0, 100.0), Color::BLACK);
        let list = builder.build();
        assert_eq!(list.bounds(), Rect::new(10.0, 0.0, 15.0, 5.0));
        assert_eq!(list.rects().len(), 1);
    }

    #[test]
    fn clipped_out_draws_have_no_bounds() {
        let mut builder = DisplayListBuilder::with_cull_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        builder.draw_rect(Rect::new(20.0, 20.0, 30.0, 30.0), Color::WHITE);
        let list = builder.build();
        assert!(list.is_empty());
        assert_eq!(list.bounds(), Rect::ZERO);
        assert_eq!(list.op_count(false), 1);
    }

    #[test]
    fn save_restore_scopes_state() {
        let mut builder = DisplayListBuilder::new();
        builder.save();
        builder.translate(5.0, 5.0);
        assert_eq!(builder.save_count(), 2);
        builder.restore();
        builder.restore();
        assert_eq!(builder.save_count(), 1);
        assert!(builder.total_matrix().is_identity());
        builder.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::BLACK);
        // The unmatched restore is dropped.
        assert_eq!(builder.op_count(), 4);
    }

    #[test]
    fn dispatch_replays_ops() {
        let mut builder = DisplayListBuilder::new();
        builder.save();
        builder.clip_rect(Rect::new(0.0, 0.0, 4.0, 4.0), ClipOp::Intersect, true);
        builder.draw_rect(Rect::new(1.0, 1.0, 2.0, 2.0), Color::BLACK);
        builder.restore();
        let list = builder.build();

        let mut replay = DisplayListBuilder::new();
        list.dispatch(&mut replay);
        let replayed = replay.build();
        assert_eq!(replayed.ops(), list.ops());
        assert_eq!(replayed.bounds(), list.bounds());
        assert_ne!(replayed.id(), list.id());
    }

    #[test]
    fn nested_op_count() {
        let mut inner = DisplayListBuilder::new();
        inner.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::BLACK);
        inner.draw_rect(Rect::new(1.0, 1.0, 2.0, 2.0), Color::BLACK);
        let inner = inner.build();

        let mut outer = DisplayListBuilder::new();
        outer.draw_display_list(&inner, 1.0);
        let outer = outer.build();
        assert_eq!(outer.op_count(false), 1);
        assert_eq!(outer.op_count(true), 3);
        assert_eq!(outer.bounds(), Rect::new(0.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn difference_clip_does_not_shrink_bounds() {
        let mut builder = DisplayListBuilder::new();
        builder.clip_rect(Rect::new(0.0, 0.0, 5.0, 5.0), ClipOp::Difference, false);
        builder.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::BLACK);
        assert_eq!(builder.build().bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }
}
