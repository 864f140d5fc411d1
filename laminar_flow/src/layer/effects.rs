// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform, opacity, and backdrop-filter layers.

use kurbo::{Point, Rect};
use laminar_core::geometry::{self, ImageFilter};
use laminar_core::transform::Transform3d;

use super::container::{paint_children, preroll_children};
use super::{AutoPrerollSaveLayerState, Layer, LayerState, PaintContext, PrerollContext};

/// Transforms its children.
#[derive(Debug)]
pub struct TransformLayer {
    state: LayerState,
    transform: Transform3d,
    children: Vec<Box<dyn Layer>>,
}

impl TransformLayer {
    /// Creates a transform layer.
    ///
    /// A non-finite transform is replaced by the identity.
    #[must_use]
    pub fn new(transform: Transform3d) -> Self {
        let transform = if transform.is_finite() {
            transform
        } else {
            log::warn!("TransformLayer given a non-finite transform; using identity");
            Transform3d::IDENTITY
        };
        Self {
            state: LayerState::default(),
            transform,
            children: Vec::new(),
        }
    }

    /// Appends a child.
    pub fn add(&mut self, child: Box<dyn Layer>) {
        self.children.push(child);
    }

    /// Builder-style [`add`](Self::add).
    #[must_use]
    pub fn with_child(mut self, child: Box<dyn Layer>) -> Self {
        self.add(child);
        self
    }

    /// The layer's transform.
    #[must_use]
    pub const fn transform(&self) -> &Transform3d {
        &self.transform
    }
}

impl Layer for TransformLayer {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn preroll(&mut self, ctx: &mut PrerollContext<'_>) {
        let previous = ctx.matrix;
        ctx.matrix = previous * self.transform;
        ctx.mutators_stack.push_transform(self.transform);

        let child_bounds = preroll_children(&mut self.children, ctx, &mut self.state);
        let bounds = if geometry::is_empty(child_bounds) {
            Rect::ZERO
        } else {
            self.transform.transform_rect_bounds(child_bounds)
        };
        self.state.set_paint_bounds(bounds);

        ctx.mutators_stack.pop();
        ctx.matrix = previous;
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        let depth = ctx.push_transform(&self.transform);
        paint_children(&self.children, ctx);
        ctx.restore_to(depth);
    }
}

/// Composites its children with a uniform opacity.
#[derive(Debug)]
pub struct OpacityLayer {
    state: LayerState,
    alpha: u8,
    offset: Point,
    children: Vec<Box<dyn Layer>>,
}

impl OpacityLayer {
    /// Creates an opacity layer; children are drawn translated by `offset`.
    #[must_use]
    pub fn new(alpha: u8, offset: Point) -> Self {
        Self {
            state: LayerState::default(),
            alpha,
            offset,
            children: Vec::new(),
        }
    }

    /// Appends a child.
    pub fn add(&mut self, child: Box<dyn Layer>) {
        self.children.push(child);
    }

    /// Builder-style [`add`](Self::add).
    #[must_use]
    pub fn with_child(mut self, child: Box<dyn Layer>) -> Self {
        self.add(child);
        self
    }

    /// Alpha, 0 transparent to 255 opaque.
    #[must_use]
    pub const fn alpha(&self) -> u8 {
        self.alpha
    }

    fn offset_transform(&self) -> Transform3d {
        Transform3d::translate(self.offset.x, self.offset.y)
    }
}

impl Layer for OpacityLayer {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn preroll(&mut self, ctx: &mut PrerollContext<'_>) {
        let offset = self.offset_transform();
        let previous = ctx.matrix;
        ctx.matrix = previous * offset;
        ctx.mutators_stack.push_transform(offset);
        ctx.mutators_stack.push_opacity(self.alpha);

        let child_bounds = {
            let mut guard = AutoPrerollSaveLayerState::new(ctx, true, false);
            preroll_children(&mut self.children, &mut guard, &mut self.state)
        };
        let bounds = if geometry::is_empty(child_bounds) {
            Rect::ZERO
        } else {
            child_bounds + self.offset.to_vec2()
        };
        self.state.set_paint_bounds(bounds);

        ctx.mutators_stack.pop();
        ctx.mutators_stack.pop();
        ctx.matrix = previous;
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        let depth = ctx.push_transform(&self.offset_transform());
        let local_bounds = self.state.paint_bounds() - self.offset.to_vec2();
        ctx.push_save_layer(Some(local_bounds), f32::from(self.alpha) / 255.0, None);
        paint_children(&self.children, ctx);
        ctx.restore_to(depth);
    }

    fn needs_painting(&self, ctx: &PaintContext<'_>) -> bool {
        self.alpha > 0 && !ctx.content_culled(self.state.paint_bounds())
    }
}

/// Filters whatever is already drawn behind it, then draws its children.
///
/// The filter reads back the surface, so prerolling this layer sets
/// [`surface_needs_readback`](PrerollContext::surface_needs_readback) unless
/// an enclosing save layer absorbs it.
#[derive(Debug)]
pub struct BackdropFilterLayer {
    state: LayerState,
    filter: ImageFilter,
    children: Vec<Box<dyn Layer>>,
}

impl BackdropFilterLayer {
    /// Creates a backdrop-filter layer.
    #[must_use]
    pub fn new(filter: ImageFilter) -> Self {
        Self {
            state: LayerState::default(),
            filter,
            children: Vec::new(),
        }
    }

    /// Appends a child.
    pub fn add(&mut self, child: Box<dyn Layer>) {
        self.children.push(child);
    }

    /// Builder-style [`add`](Self::add).
    #[must_use]
    pub fn with_child(mut self, child: Box<dyn Layer>) -> Self {
        self.add(child);
        self
    }

    /// The backdrop filter.
    #[must_use]
    pub const fn filter(&self) -> &ImageFilter {
        &self.filter
    }
}

impl Layer for BackdropFilterLayer {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn preroll(&mut self, ctx: &mut PrerollContext<'_>) {
        let mut guard = AutoPrerollSaveLayerState::new(ctx, true, true);
        let local_cull = guard.local_cull_rect();
        // Falls back to device space when the matrix is not invertible here.
        let filter_rect = local_cull.unwrap_or(guard.cull_rect);
        guard
            .mutators_stack
            .push_backdrop_filter(self.filter, filter_rect);
        let child_bounds = preroll_children(&mut self.children, &mut guard, &mut self.state);
        guard.mutators_stack.pop();

        // The filter touches everything visible behind the layer.
        let bounds = match local_cull {
            Some(cull) if geometry::is_empty(child_bounds) => cull,
            Some(cull) => child_bounds.union(cull),
            None => child_bounds,
        };
        self.state.set_paint_bounds(bounds);
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        let depth = ctx.push_save_layer(Some(self.state.paint_bounds()), 1.0, Some(self.filter));
        paint_children(&self.children, ctx);
        ctx.restore_to(depth);
    }
}
