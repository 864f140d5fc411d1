// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grouping layers and the child walks every grouping layer shares.

use kurbo::Rect;
use laminar_core::geometry;

use super::{Layer, LayerState, PaintContext, PrerollContext};

/// Prerolls `children` in order and returns the union of their paint bounds.
///
/// Also records in `state`, and leaves in `ctx`, whether any child subtree
/// contains a platform view.
pub fn preroll_children(
    children: &mut [Box<dyn Layer>],
    ctx: &mut PrerollContext<'_>,
    state: &mut LayerState,
) -> Rect {
    let mut bounds: Option<Rect> = None;
    let mut child_has_platform_view = false;
    for child in children.iter_mut() {
        ctx.has_platform_view = false;
        child.preroll(ctx);
        child_has_platform_view |= ctx.has_platform_view;
        let child_bounds = child.paint_bounds();
        if !geometry::is_empty(child_bounds) {
            bounds = Some(bounds.map_or(child_bounds, |b| b.union(child_bounds)));
        }
    }
    ctx.has_platform_view = child_has_platform_view;
    state.set_subtree_has_platform_view(child_has_platform_view);
    bounds.unwrap_or(Rect::ZERO)
}

/// Paints every visible child in order.
pub fn paint_children(children: &[Box<dyn Layer>], ctx: &mut PaintContext<'_>) {
    for child in children {
        if child.needs_painting(ctx) {
            child.paint(ctx);
        }
    }
}

/// A layer that only groups its children.
#[derive(Debug, Default)]
pub struct ContainerLayer {
    state: LayerState,
    children: Vec<Box<dyn Layer>>,
}

impl ContainerLayer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a child, painted above the existing ones.
    pub fn add(&mut self, child: Box<dyn Layer>) {
        self.children.push(child);
    }

    /// Builder-style [`add`](Self::add).
    #[must_use]
    pub fn with_child(mut self, child: Box<dyn Layer>) -> Self {
        self.add(child);
        self
    }

    /// The children, bottom first.
    #[must_use]
    pub fn children(&self) -> &[Box<dyn Layer>] {
        &self.children
    }
}

impl Layer for ContainerLayer {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn preroll(&mut self, ctx: &mut PrerollContext<'_>) {
        let bounds = preroll_children(&mut self.children, ctx, &mut self.state);
        self.state.set_paint_bounds(bounds);
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        paint_children(&self.children, ctx);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kurbo::{Point, Size};
    use laminar_core::canvas::Canvas;
    use laminar_core::display_list::{DisplayListBuilder, DisplayOp};
    use laminar_core::geometry::Color;
    use laminar_core::id::ViewId;

    use super::*;
    use crate::layer::{DisplayListLayer, PlatformViewLayer};

    fn rect_layer(rect: Rect) -> Box<dyn Layer> {
        let mut builder = DisplayListBuilder::new();
        builder.draw_rect(rect, Color::WHITE);
        Box::new(DisplayListLayer::new(Point::ZERO, builder.build()))
    }

    #[test]
    fn bounds_are_union_of_children() {
        let mut container = ContainerLayer::new()
            .with_child(rect_layer(Rect::new(0.0, 0.0, 10.0, 10.0)))
            .with_child(rect_layer(Rect::new(20.0, 5.0, 30.0, 40.0)));
        let mut ctx = PrerollContext::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        container.preroll(&mut ctx);
        assert_eq!(container.paint_bounds(), Rect::new(0.0, 0.0, 30.0, 40.0));
        assert!(!container.state().subtree_has_platform_view());
    }

    #[test]
    fn empty_container_has_empty_bounds() {
        let mut container = ContainerLayer::new();
        let mut ctx = PrerollContext::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        container.preroll(&mut ctx);
        assert_eq!(container.paint_bounds(), Rect::ZERO);
    }

    #[test]
    fn platform_view_flag_propagates() {
        let mut container = ContainerLayer::new()
            .with_child(Box::new(PlatformViewLayer::new(
                Point::ZERO,
                Size::new(10.0, 10.0),
                ViewId(1),
            )))
            .with_child(rect_layer(Rect::new(0.0, 0.0, 5.0, 5.0)));
        let mut ctx = PrerollContext::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        container.preroll(&mut ctx);
        assert!(container.state().subtree_has_platform_view());
        assert!(ctx.has_platform_view);
    }

    #[test]
    fn culled_children_are_not_painted() {
        let mut container = ContainerLayer::new()
            .with_child(rect_layer(Rect::new(0.0, 0.0, 10.0, 10.0)))
            .with_child(rect_layer(Rect::new(500.0, 500.0, 510.0, 510.0)));
        let mut ctx = PrerollContext::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        container.preroll(&mut ctx);

        let mut canvas = DisplayListBuilder::new();
        {
            let mut paint = PaintContext::new(&mut canvas)
                .with_cull_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
            container.paint(&mut paint);
        }
        let list = canvas.build();
        let drawn: Vec<_> = list
            .ops()
            .iter()
            .filter_map(|op| match op {
                DisplayOp::DrawDisplayList { list, .. } => Some(Arc::clone(list)),
                _ => None,
            })
            .collect();
        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }
}
