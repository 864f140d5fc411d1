// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing interface the compositor records into.
//!
//! Nothing in this workspace rasterizes pixels. A [`Canvas`] is either a
//! recorder ([`DisplayListBuilder`](crate::display_list::DisplayListBuilder),
//! or a render-pass recorder in `laminar_render`) or a thin adapter over a
//! GPU backend supplied by the embedder.

use std::sync::Arc;

use kurbo::{BezPath, Rect, RoundedRect};

use crate::display_list::DisplayList;
use crate::geometry::{Color, ImageFilter};
use crate::transform::Transform3d;

/// How a clip combines with the current clip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClipOp {
    /// Keep only the area inside the shape.
    #[default]
    Intersect,
    /// Remove the area inside the shape.
    Difference,
}

/// An opaque handle to a GPU image owned by the backend.
///
/// Raster-cache entries and backing stores are referred to by handle only;
/// the compositor never touches pixel memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    /// Backend-assigned identifier.
    pub id: u64,
    /// Width in device pixels.
    pub width: u32,
    /// Height in device pixels.
    pub height: u32,
}

impl ImageHandle {
    /// Estimated memory footprint assuming 4 bytes per pixel.
    #[must_use]
    pub const fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }
}

/// Records or executes drawing operations.
///
/// Save/restore semantics follow the usual canvas model: the save count
/// starts at 1, and restoring at depth 1 is a no-op.
pub trait Canvas {
    /// Saves the current matrix and clip.
    fn save(&mut self);

    /// Saves and starts an offscreen layer that is composited on restore.
    ///
    /// A `backdrop` filter reads the content already drawn beneath the layer,
    /// which requires the target surface to support readback.
    fn save_layer(&mut self, bounds: Option<Rect>, opacity: f32, backdrop: Option<&ImageFilter>);

    /// Restores the most recent save.
    fn restore(&mut self);

    /// Current save depth; 1 when nothing is saved.
    fn save_count(&self) -> usize;

    /// Restores until the save count is `count` (or 1).
    fn restore_to_count(&mut self, count: usize) {
        let target = count.max(1);
        while self.save_count() > target {
            self.restore();
        }
    }

    /// Concatenates `matrix` onto the current matrix.
    fn transform(&mut self, matrix: &Transform3d);

    /// Replaces the current matrix.
    fn set_transform(&mut self, matrix: &Transform3d);

    /// Translates the current matrix.
    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform(&Transform3d::translate(dx, dy));
    }

    /// Clips to a rect in local space.
    fn clip_rect(&mut self, rect: Rect, op: ClipOp, is_aa: bool);

    /// Clips to a rounded rect in local space.
    fn clip_rounded_rect(&mut self, rrect: RoundedRect, op: ClipOp, is_aa: bool);

    /// Clips to a path in local space.
    fn clip_path(&mut self, path: &BezPath, op: ClipOp, is_aa: bool);

    /// Fills a rect.
    fn draw_rect(&mut self, rect: Rect, color: Color);

    /// Draws a backend image into `dst`.
    fn draw_image(&mut self, image: &ImageHandle, dst: Rect, opacity: f32);

    /// Draws a recorded display list.
    fn draw_display_list(&mut self, list: &Arc<DisplayList>, opacity: f32);

    /// Fills the current clip with `color`, replacing what was there.
    fn clear(&mut self, color: Color);

    /// The current local-to-device matrix.
    fn total_matrix(&self) -> Transform3d;

    /// The current device-space clip bounds, or `None` when unclipped.
    fn device_clip_bounds(&self) -> Option<Rect>;
}
