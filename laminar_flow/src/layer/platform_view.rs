// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf layer standing in for a platform-native view.

use kurbo::{Point, Rect, Size};
use laminar_core::embedded_view::EmbeddedViewParams;
use laminar_core::id::ViewId;

use super::{Layer, LayerState, PaintContext, PrerollContext};

/// Marks where a platform view sits in the layer tree.
///
/// Preroll reports the view's placement to the embedder. Paint switches the
/// rest of the walk to the canvas for content drawn above the view.
#[derive(Debug)]
pub struct PlatformViewLayer {
    state: LayerState,
    offset: Point,
    size: Size,
    view_id: ViewId,
}

impl PlatformViewLayer {
    /// Creates a layer for platform view `view_id`.
    #[must_use]
    pub fn new(offset: Point, size: Size, view_id: ViewId) -> Self {
        Self {
            state: LayerState::default(),
            offset,
            size,
            view_id,
        }
    }

    /// The platform view's id.
    #[must_use]
    pub const fn view_id(&self) -> ViewId {
        self.view_id
    }
}

impl Layer for PlatformViewLayer {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn preroll(&mut self, ctx: &mut PrerollContext<'_>) {
        self.state
            .set_paint_bounds(Rect::from_origin_size(self.offset, self.size));
        self.state.set_subtree_has_platform_view(true);
        ctx.has_platform_view = true;

        let params = EmbeddedViewParams::new(
            ctx.matrix.pre_translate(self.offset.x, self.offset.y),
            self.size,
            ctx.mutators_stack.clone(),
        );
        match ctx.view_embedder.as_deref_mut() {
            Some(embedder) => embedder.preroll_composite_embedded_view(self.view_id, params),
            None => log::warn!(
                "platform view {:?} prerolled without a view embedder",
                self.view_id
            ),
        }
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        if !ctx.switch_to_embedded_view(self.view_id) {
            log::warn!(
                "platform view {:?} painted without a view embedder",
                self.view_id
            );
        }
    }
}
