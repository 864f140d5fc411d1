// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! State threaded through preroll and paint.

use std::fmt;
use std::ops::{Deref, DerefMut};

use kurbo::Rect;
use laminar_core::canvas::{Canvas, ClipOp};
use laminar_core::display_list::DisplayList;
use laminar_core::geometry::{self, ImageFilter};
use laminar_core::id::ViewId;
use laminar_core::mutator::MutatorStack;
use laminar_core::transform::Transform3d;
use laminar_render::ClipShape;

use crate::embedder::ExternalViewEmbedder;
use crate::raster_cache::RasterCache;

/// Mutable state for one preroll walk.
pub struct PrerollContext<'a> {
    /// Cache consulted for raster-cache candidates.
    pub raster_cache: Option<&'a mut RasterCache>,
    /// Embedder told about platform views.
    pub view_embedder: Option<&'a mut dyn ExternalViewEmbedder>,
    /// Mutators between the root and the layer being prerolled.
    pub mutators_stack: MutatorStack,
    /// Local-to-device matrix of the layer being prerolled.
    pub matrix: Transform3d,
    /// Device-space area that can still be seen.
    pub cull_rect: Rect,
    /// Whether something prerolled so far reads back the surface.
    pub surface_needs_readback: bool,
    /// Whether the subtree prerolled last contains a platform view.
    pub has_platform_view: bool,
}

impl fmt::Debug for PrerollContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrerollContext")
            .field("has_raster_cache", &self.raster_cache.is_some())
            .field("has_view_embedder", &self.view_embedder.is_some())
            .field("mutators_stack", &self.mutators_stack)
            .field("matrix", &self.matrix)
            .field("cull_rect", &self.cull_rect)
            .field("surface_needs_readback", &self.surface_needs_readback)
            .field("has_platform_view", &self.has_platform_view)
            .finish()
    }
}

impl<'a> PrerollContext<'a> {
    /// Creates a context for a frame whose device area is `cull_rect`.
    #[must_use]
    pub fn new(cull_rect: Rect) -> Self {
        Self {
            raster_cache: None,
            view_embedder: None,
            mutators_stack: MutatorStack::new(),
            matrix: Transform3d::IDENTITY,
            cull_rect,
            surface_needs_readback: false,
            has_platform_view: false,
        }
    }

    /// Attaches a raster cache.
    #[must_use]
    pub fn with_raster_cache(mut self, raster_cache: &'a mut RasterCache) -> Self {
        self.raster_cache = Some(raster_cache);
        self
    }

    /// Attaches a view embedder.
    #[must_use]
    pub fn with_view_embedder(mut self, view_embedder: &'a mut dyn ExternalViewEmbedder) -> Self {
        self.view_embedder = Some(view_embedder);
        self
    }

    /// Whether `local_bounds`, drawn with the current matrix, falls outside
    /// the cull rect.
    #[must_use]
    pub fn content_culled(&self, local_bounds: Rect) -> bool {
        let device = self.matrix.transform_rect_bounds(local_bounds);
        !geometry::overlaps(device, self.cull_rect)
    }

    /// The cull rect in the current local space.
    ///
    /// Only translate/scale matrices are inverted; returns `None` for any
    /// other matrix or a degenerate scale.
    #[must_use]
    pub fn local_cull_rect(&self) -> Option<Rect> {
        if !self.matrix.is_translate_scale_only() {
            return None;
        }
        let (sx, sy) = (self.matrix.cols[0][0], self.matrix.cols[1][1]);
        if sx == 0.0 || sy == 0.0 {
            return None;
        }
        let (tx, ty) = self.matrix.translation();
        let c = self.cull_rect;
        Some(
            Rect::new(
                (c.x0 - tx) / sx,
                (c.y0 - ty) / sy,
                (c.x1 - tx) / sx,
                (c.y1 - ty) / sy,
            )
            .abs(),
        )
    }
}

/// Scopes the readback flag of a layer that may draw into a save layer.
///
/// Content inside a save layer reads back the save layer, not the surface.
/// While the guard lives and `save_layer_is_active`, the children see a
/// cleared [`surface_needs_readback`](PrerollContext::surface_needs_readback).
/// On drop the flag becomes whatever it was before, or `true` if the layer
/// itself reads back. An inactive guard changes nothing.
///
/// The guard derefs to the context, so children are prerolled through it:
///
/// ```ignore
/// let mut guard = AutoPrerollSaveLayerState::new(ctx, true, false);
/// child.preroll(&mut guard);
/// ```
pub struct AutoPrerollSaveLayerState<'c, 'a> {
    context: &'c mut PrerollContext<'a>,
    save_layer_is_active: bool,
    layer_itself_performs_readback: bool,
    prev_surface_needs_readback: bool,
}

impl fmt::Debug for AutoPrerollSaveLayerState<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoPrerollSaveLayerState")
            .field("save_layer_is_active", &self.save_layer_is_active)
            .field(
                "layer_itself_performs_readback",
                &self.layer_itself_performs_readback,
            )
            .field(
                "prev_surface_needs_readback",
                &self.prev_surface_needs_readback,
            )
            .finish_non_exhaustive()
    }
}

impl<'c, 'a> AutoPrerollSaveLayerState<'c, 'a> {
    /// Starts the scope.
    pub fn new(
        context: &'c mut PrerollContext<'a>,
        save_layer_is_active: bool,
        layer_itself_performs_readback: bool,
    ) -> Self {
        let prev_surface_needs_readback = context.surface_needs_readback;
        if save_layer_is_active {
            context.surface_needs_readback = false;
        }
        Self {
            context,
            save_layer_is_active,
            layer_itself_performs_readback,
            prev_surface_needs_readback,
        }
    }
}

impl<'a> Deref for AutoPrerollSaveLayerState<'_, 'a> {
    type Target = PrerollContext<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.context
    }
}

impl DerefMut for AutoPrerollSaveLayerState<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.context
    }
}

impl Drop for AutoPrerollSaveLayerState<'_, '_> {
    fn drop(&mut self) {
        if self.save_layer_is_active {
            self.context.surface_needs_readback =
                self.prev_surface_needs_readback || self.layer_itself_performs_readback;
        }
    }
}

/// One save pushed by a layer during paint.
#[derive(Clone, Debug)]
enum PaintState {
    Transform(Transform3d),
    Clip {
        shape: ClipShape,
        is_aa: bool,
    },
    SaveLayer {
        bounds: Option<Rect>,
        opacity: f32,
        backdrop: Option<ImageFilter>,
    },
}

#[derive(Clone, Debug)]
struct PaintEntry {
    state: PaintState,
    matrix: Transform3d,
    clip: Option<Rect>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PaintTarget {
    Canvas,
    EmbedderRoot,
    EmbeddedView(ViewId),
}

/// Mutable state for one paint walk.
///
/// Layers never call `save`/`restore` on the canvas directly. They push
/// state through the context and restore to the returned depth, which lets
/// the context move the whole state onto another canvas when a platform view
/// starts a new slice mid-walk.
pub struct PaintContext<'a> {
    target: PaintTarget,
    canvas: Option<&'a mut dyn Canvas>,
    view_embedder: Option<&'a mut dyn ExternalViewEmbedder>,
    raster_cache: Option<&'a mut RasterCache>,
    entries: Vec<PaintEntry>,
    base_clip: Option<Rect>,
    base_save_count: usize,
}

impl fmt::Debug for PaintContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintContext")
            .field("target", &self.target)
            .field("has_canvas", &self.canvas.is_some())
            .field("has_view_embedder", &self.view_embedder.is_some())
            .field("has_raster_cache", &self.raster_cache.is_some())
            .field("depth", &self.entries.len())
            .field("base_clip", &self.base_clip)
            .finish_non_exhaustive()
    }
}

fn resolve_canvas<'s>(
    target: PaintTarget,
    canvas: &'s mut Option<&mut dyn Canvas>,
    view_embedder: &'s mut Option<&mut dyn ExternalViewEmbedder>,
) -> Option<&'s mut dyn Canvas> {
    match target {
        PaintTarget::Canvas => match canvas {
            Some(canvas) => Some(&mut **canvas),
            None => None,
        },
        PaintTarget::EmbedderRoot => match view_embedder {
            Some(embedder) => embedder.root_canvas(),
            None => None,
        },
        PaintTarget::EmbeddedView(view_id) => match view_embedder {
            Some(embedder) => embedder.composite_embedded_view(view_id),
            None => None,
        },
    }
}

fn apply_state(canvas: &mut dyn Canvas, state: &PaintState) {
    match state {
        PaintState::Transform(matrix) => {
            canvas.save();
            canvas.transform(matrix);
        }
        PaintState::Clip { shape, is_aa } => {
            canvas.save();
            match shape {
                ClipShape::Rect(rect) => canvas.clip_rect(*rect, ClipOp::Intersect, *is_aa),
                ClipShape::RoundedRect(rrect) => {
                    canvas.clip_rounded_rect(*rrect, ClipOp::Intersect, *is_aa);
                }
                ClipShape::Path(path) => canvas.clip_path(path, ClipOp::Intersect, *is_aa),
            }
        }
        PaintState::SaveLayer {
            bounds,
            opacity,
            backdrop,
        } => canvas.save_layer(*bounds, *opacity, backdrop.as_ref()),
    }
}

impl<'a> PaintContext<'a> {
    /// Paints into `canvas`.
    #[must_use]
    pub fn new(canvas: &'a mut dyn Canvas) -> Self {
        let base_save_count = canvas.save_count();
        Self {
            target: PaintTarget::Canvas,
            canvas: Some(canvas),
            view_embedder: None,
            raster_cache: None,
            entries: Vec::new(),
            base_clip: None,
            base_save_count,
        }
    }

    /// Paints into the embedder's root canvas, switching to per-view slices
    /// as platform views are painted.
    #[must_use]
    pub fn with_embedder(view_embedder: &'a mut dyn ExternalViewEmbedder) -> Self {
        let mut context = Self {
            target: PaintTarget::EmbedderRoot,
            canvas: None,
            view_embedder: Some(view_embedder),
            raster_cache: None,
            entries: Vec::new(),
            base_clip: None,
            base_save_count: 1,
        };
        if let Some(count) = context.canvas().map(|canvas| canvas.save_count()) {
            context.base_save_count = count;
        }
        context
    }

    /// Attaches a raster cache.
    #[must_use]
    pub fn with_raster_cache(mut self, raster_cache: &'a mut RasterCache) -> Self {
        self.raster_cache = Some(raster_cache);
        self
    }

    /// Restricts painting to a device-space cull rect.
    #[must_use]
    pub fn with_cull_rect(mut self, cull_rect: Rect) -> Self {
        self.base_clip = Some(cull_rect);
        self
    }

    /// The canvas currently painted into.
    pub fn canvas(&mut self) -> Option<&mut dyn Canvas> {
        resolve_canvas(self.target, &mut self.canvas, &mut self.view_embedder)
    }

    /// Whether platform views can be embedded.
    #[must_use]
    pub fn has_view_embedder(&self) -> bool {
        self.view_embedder.is_some()
    }

    /// Current save depth; pass to [`restore_to`](Self::restore_to).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Current local-to-device matrix.
    #[must_use]
    pub fn matrix(&self) -> Transform3d {
        self.entries
            .last()
            .map_or(Transform3d::IDENTITY, |entry| entry.matrix)
    }

    /// Conservative device-space clip, `None` when unclipped.
    #[must_use]
    pub fn device_clip(&self) -> Option<Rect> {
        self.entries.last().map_or(self.base_clip, |entry| entry.clip)
    }

    /// Whether `local_bounds` is empty or cannot be seen.
    #[must_use]
    pub fn content_culled(&self, local_bounds: Rect) -> bool {
        if geometry::is_empty(local_bounds) {
            return true;
        }
        let device = self.matrix().transform_rect_bounds(local_bounds);
        self.device_clip()
            .is_some_and(|clip| !geometry::overlaps(device, clip))
    }

    fn push(&mut self, state: PaintState) -> usize {
        let depth = self.entries.len();
        let mut matrix = self.matrix();
        let mut clip = self.device_clip();
        match &state {
            PaintState::Transform(m) => matrix = matrix * *m,
            PaintState::Clip { shape, .. } => {
                let device = matrix.transform_rect_bounds(shape.bounds());
                clip = Some(clip.map_or(device, |c| c.intersect(device)));
            }
            PaintState::SaveLayer { .. } => {}
        }
        if let Some(canvas) = self.canvas() {
            apply_state(canvas, &state);
        }
        self.entries.push(PaintEntry {
            state,
            matrix,
            clip,
        });
        depth
    }

    /// Concatenates a transform. Returns the depth to restore to.
    pub fn push_transform(&mut self, matrix: &Transform3d) -> usize {
        self.push(PaintState::Transform(*matrix))
    }

    /// Intersects the clip with `shape`. Returns the depth to restore to.
    pub fn push_clip(&mut self, shape: ClipShape, is_aa: bool) -> usize {
        self.push(PaintState::Clip { shape, is_aa })
    }

    /// Starts an offscreen layer. Returns the depth to restore to.
    pub fn push_save_layer(
        &mut self,
        bounds: Option<Rect>,
        opacity: f32,
        backdrop: Option<ImageFilter>,
    ) -> usize {
        self.push(PaintState::SaveLayer {
            bounds,
            opacity,
            backdrop,
        })
    }

    /// Pops state until `depth` entries remain.
    pub fn restore_to(&mut self, depth: usize) {
        while self.entries.len() > depth {
            self.entries.pop();
            if let Some(canvas) = self.canvas() {
                canvas.restore();
            }
        }
    }

    /// Continues painting into the slice above platform view `view_id`.
    ///
    /// The current canvas is unwound and every pushed state is replayed onto
    /// the new one, so the rest of the walk is clipped and transformed
    /// exactly as before.
    ///
    /// Returns `false`, leaving the target unchanged, when there is no
    /// embedder.
    pub fn switch_to_embedded_view(&mut self, view_id: ViewId) -> bool {
        if self.view_embedder.is_none() {
            return false;
        }
        let base_save_count = self.base_save_count;
        if let Some(canvas) = self.canvas() {
            canvas.restore_to_count(base_save_count);
        }
        self.target = PaintTarget::EmbeddedView(view_id);
        let Some(canvas) = resolve_canvas(self.target, &mut self.canvas, &mut self.view_embedder)
        else {
            log::warn!("no canvas for platform view {view_id:?}; its overlay content is dropped");
            return true;
        };
        self.base_save_count = canvas.save_count();
        for entry in &self.entries {
            apply_state(canvas, &entry.state);
        }
        true
    }

    /// Draws `list` from the raster cache if an image is available.
    pub fn draw_cached_display_list(&mut self, list: &DisplayList, opacity: f32) -> bool {
        let Some(cache) = self.raster_cache.as_deref_mut() else {
            return false;
        };
        let Some(canvas) = resolve_canvas(self.target, &mut self.canvas, &mut self.view_embedder)
        else {
            return false;
        };
        cache.draw_display_list(list, canvas, opacity)
    }
}

#[cfg(test)]
mod tests {
    use laminar_core::display_list::DisplayListBuilder;

    use super::*;

    fn frame() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 100.0)
    }

    /// Prerolls a "layer" that wraps a save layer and may return early.
    fn preroll_with_early_return(ctx: &mut PrerollContext<'_>, bail: bool) -> bool {
        let mut guard = AutoPrerollSaveLayerState::new(ctx, true, false);
        if bail {
            return false;
        }
        guard.surface_needs_readback = true;
        true
    }

    #[test]
    fn guard_clears_and_restores_readback() {
        let mut ctx = PrerollContext::new(frame());
        ctx.surface_needs_readback = true;
        {
            let guard = AutoPrerollSaveLayerState::new(&mut ctx, true, false);
            assert!(!guard.surface_needs_readback);
        }
        assert!(ctx.surface_needs_readback);
    }

    #[test]
    fn guard_reports_own_readback() {
        let mut ctx = PrerollContext::new(frame());
        {
            let mut guard = AutoPrerollSaveLayerState::new(&mut ctx, true, true);
            guard.surface_needs_readback = false;
        }
        assert!(ctx.surface_needs_readback);
    }

    #[test]
    fn child_readback_stays_inside_save_layer() {
        let mut ctx = PrerollContext::new(frame());
        assert!(preroll_with_early_return(&mut ctx, false));
        assert!(!ctx.surface_needs_readback);
    }

    #[test]
    fn early_return_still_restores() {
        let mut ctx = PrerollContext::new(frame());
        ctx.surface_needs_readback = true;
        assert!(!preroll_with_early_return(&mut ctx, true));
        assert!(ctx.surface_needs_readback);
    }

    #[test]
    fn inactive_guard_changes_nothing() {
        let mut ctx = PrerollContext::new(frame());
        ctx.surface_needs_readback = true;
        {
            let mut guard = AutoPrerollSaveLayerState::new(&mut ctx, false, true);
            assert!(guard.surface_needs_readback);
            guard.surface_needs_readback = false;
        }
        assert!(!ctx.surface_needs_readback);
    }

    #[test]
    fn nested_guards() {
        let mut ctx = PrerollContext::new(frame());
        {
            let mut outer = AutoPrerollSaveLayerState::new(&mut ctx, true, false);
            {
                let _inner = AutoPrerollSaveLayerState::new(&mut outer, true, true);
            }
            assert!(outer.surface_needs_readback);
        }
        assert!(!ctx.surface_needs_readback);
    }

    #[test]
    fn preroll_culling() {
        let mut ctx = PrerollContext::new(frame());
        assert!(!ctx.content_culled(Rect::new(90.0, 90.0, 110.0, 110.0)));
        ctx.matrix = Transform3d::translate(200.0, 0.0);
        assert!(ctx.content_culled(Rect::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn local_cull_rect_inverts_translate_scale() {
        let mut ctx = PrerollContext::new(frame());
        ctx.matrix = Transform3d::translate(10.0, 20.0) * Transform3d::scale(2.0, -2.0);
        assert_eq!(
            ctx.local_cull_rect(),
            Some(Rect::new(-5.0, -40.0, 45.0, 10.0))
        );
        ctx.matrix = Transform3d::from_rotation_z(0.5);
        assert_eq!(ctx.local_cull_rect(), None);
    }

    #[test]
    fn push_and_restore_balance_canvas() {
        let mut canvas = DisplayListBuilder::new();
        {
            let mut ctx = PaintContext::new(&mut canvas);
            let depth = ctx.push_transform(&Transform3d::translate(5.0, 0.0));
            ctx.push_clip(ClipShape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)), false);
            assert_eq!(ctx.canvas().map(|c| c.save_count()), Some(3));
            assert_eq!(ctx.device_clip(), Some(Rect::new(5.0, 0.0, 15.0, 10.0)));
            ctx.restore_to(depth);
            assert_eq!(ctx.depth(), 0);
            assert_eq!(ctx.canvas().map(|c| c.save_count()), Some(1));
        }
    }

    #[test]
    fn paint_culling_follows_clip() {
        let mut canvas = DisplayListBuilder::new();
        let mut ctx = PaintContext::new(&mut canvas).with_cull_rect(frame());
        assert!(ctx.content_culled(Rect::ZERO));
        assert!(!ctx.content_culled(Rect::new(10.0, 10.0, 20.0, 20.0)));
        ctx.push_clip(ClipShape::Rect(Rect::new(0.0, 0.0, 5.0, 5.0)), false);
        assert!(ctx.content_culled(Rect::new(10.0, 10.0, 20.0, 20.0)));
    }
}
