// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layer tree walked by preroll and paint.
//!
//! A frame's scene arrives as a tree of [`Layer`]s. Preroll walks it once to
//! compute paint bounds, find platform views, and prepare raster-cache
//! entries; paint walks it again to draw.
//!
//! ```text
//!   LayerTree::preroll ── PrerollContext ──► mutators, cull rect, readback flag
//!   LayerTree::paint   ── PaintContext   ──► root canvas, then one slice per
//!                                            platform view
//! ```

mod clip;
mod container;
mod context;
mod display_list_layer;
mod effects;
mod platform_view;
mod tree;

use std::fmt;

use kurbo::Rect;
use laminar_core::id::{LayerIdAllocator, LayerUniqueId};

pub use clip::{ClipBehavior, ClipLayer};
pub use container::{ContainerLayer, paint_children, preroll_children};
pub use context::{AutoPrerollSaveLayerState, PaintContext, PrerollContext};
pub use display_list_layer::DisplayListLayer;
pub use effects::{BackdropFilterLayer, OpacityLayer, TransformLayer};
pub use platform_view::PlatformViewLayer;
pub use tree::{CompositorFrame, LayerTree};

/// Identity and preroll results shared by every layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerState {
    unique_id: LayerUniqueId,
    original_layer_id: LayerUniqueId,
    paint_bounds: Rect,
    subtree_has_platform_view: bool,
}

impl LayerState {
    /// Allocates a fresh id from `ids`. The original layer id starts out
    /// equal to it.
    #[must_use]
    pub fn new(ids: &LayerIdAllocator) -> Self {
        let unique_id = ids.next_unique_id();
        Self {
            unique_id,
            original_layer_id: unique_id,
            paint_bounds: Rect::ZERO,
            subtree_has_platform_view: false,
        }
    }

    /// Id unique to this layer object.
    #[must_use]
    pub const fn unique_id(&self) -> LayerUniqueId {
        self.unique_id
    }

    /// Id of the layer this one was cloned or retained from, used to match
    /// layers across frames.
    #[must_use]
    pub const fn original_layer_id(&self) -> LayerUniqueId {
        self.original_layer_id
    }

    /// Sets the original layer id.
    pub fn set_original_layer_id(&mut self, id: LayerUniqueId) {
        self.original_layer_id = id;
    }

    /// Local-space bounds computed by the last preroll.
    #[must_use]
    pub const fn paint_bounds(&self) -> Rect {
        self.paint_bounds
    }

    /// Records the paint bounds.
    pub fn set_paint_bounds(&mut self, bounds: Rect) {
        self.paint_bounds = bounds;
    }

    /// Whether the last preroll found a platform view below this layer.
    #[must_use]
    pub const fn subtree_has_platform_view(&self) -> bool {
        self.subtree_has_platform_view
    }

    /// Records whether a platform view is below this layer.
    pub fn set_subtree_has_platform_view(&mut self, value: bool) {
        self.subtree_has_platform_view = value;
    }
}

impl Default for LayerState {
    fn default() -> Self {
        Self::new(LayerIdAllocator::global())
    }
}

/// A node in the layer tree.
pub trait Layer: fmt::Debug {
    /// Identity and preroll results.
    fn state(&self) -> &LayerState;

    /// Mutable identity and preroll results.
    fn state_mut(&mut self) -> &mut LayerState;

    /// Computes paint bounds and reports platform views and cache candidates.
    fn preroll(&mut self, ctx: &mut PrerollContext<'_>);

    /// Draws the layer. Only called when [`needs_painting`](Self::needs_painting).
    fn paint(&self, ctx: &mut PaintContext<'_>);

    /// Whether the layer is visible under the current paint state.
    fn needs_painting(&self, ctx: &PaintContext<'_>) -> bool {
        !ctx.content_culled(self.state().paint_bounds())
    }

    /// Shorthand for the unique id.
    fn unique_id(&self) -> LayerUniqueId {
        self.state().unique_id()
    }

    /// Shorthand for the paint bounds.
    fn paint_bounds(&self) -> Rect {
        self.state().paint_bounds()
    }

    /// Builder-style setter for the original layer id.
    #[must_use]
    fn with_original_layer_id(mut self, id: LayerUniqueId) -> Self
    where
        Self: Sized,
    {
        self.state_mut().set_original_layer_id(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn original_id_defaults_to_unique_id() {
        let ids = LayerIdAllocator::new();
        let state = LayerState::new(&ids);
        assert_eq!(state.original_layer_id(), state.unique_id());
    }

    #[test]
    fn layers_get_distinct_ids() {
        let layers: Vec<ContainerLayer> = (0..16).map(|_| ContainerLayer::new()).collect();
        let unique: HashSet<_> = layers.iter().map(|l| l.unique_id()).collect();
        assert_eq!(unique.len(), layers.len());
    }

    #[test]
    fn original_id_set_at_construction() {
        let source = ContainerLayer::new();
        let retained = ContainerLayer::new().with_original_layer_id(source.unique_id());
        assert_ne!(retained.unique_id(), source.unique_id());
        assert_eq!(retained.state().original_layer_id(), source.unique_id());
    }
}
