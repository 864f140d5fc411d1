// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clipping layers.

use laminar_core::geometry;
use laminar_render::ClipShape;

use super::container::{paint_children, preroll_children};
use super::{AutoPrerollSaveLayerState, Layer, LayerState, PaintContext, PrerollContext};

/// How a clip edge is rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClipBehavior {
    /// Aliased edge, cheapest.
    HardEdge,
    /// Antialiased edge.
    #[default]
    AntiAlias,
    /// Antialiased edge with the children composited through a save layer,
    /// which avoids edge bleeding at the cost of an offscreen pass.
    AntiAliasWithSaveLayer,
}

impl ClipBehavior {
    /// Whether the edge is antialiased.
    #[must_use]
    pub const fn is_aa(self) -> bool {
        !matches!(self, Self::HardEdge)
    }

    /// Whether children are drawn into a save layer.
    #[must_use]
    pub const fn uses_save_layer(self) -> bool {
        matches!(self, Self::AntiAliasWithSaveLayer)
    }
}

/// Clips its children to a rect, rounded rect, or path.
#[derive(Debug)]
pub struct ClipLayer {
    state: LayerState,
    shape: ClipShape,
    clip_behavior: ClipBehavior,
    children: Vec<Box<dyn Layer>>,
}

impl ClipLayer {
    /// Creates a clip layer with no children.
    #[must_use]
    pub fn new(shape: ClipShape, clip_behavior: ClipBehavior) -> Self {
        Self {
            state: LayerState::default(),
            shape,
            clip_behavior,
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

    /// The clip shape in local space.
    #[must_use]
    pub const fn shape(&self) -> &ClipShape {
        &self.shape
    }

    /// The edge behavior.
    #[must_use]
    pub const fn clip_behavior(&self) -> ClipBehavior {
        self.clip_behavior
    }

    fn push_mutator(&self, ctx: &mut PrerollContext<'_>) {
        match &self.shape {
            ClipShape::Rect(rect) => ctx.mutators_stack.push_clip_rect(*rect),
            ClipShape::RoundedRect(rrect) => ctx.mutators_stack.push_clip_rounded_rect(*rrect),
            ClipShape::Path(path) => ctx.mutators_stack.push_clip_path(path.clone()),
        }
    }
}

impl Layer for ClipLayer {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn preroll(&mut self, ctx: &mut PrerollContext<'_>) {
        let clip_bounds = self.shape.bounds();
        if ctx.content_culled(clip_bounds) {
            self.state.set_paint_bounds(kurbo::Rect::ZERO);
            return;
        }
        let previous_cull = ctx.cull_rect;
        let device_clip = ctx.matrix.transform_rect_bounds(clip_bounds);
        ctx.cull_rect = previous_cull.intersect(device_clip);
        self.push_mutator(ctx);

        let child_bounds = {
            let mut guard =
                AutoPrerollSaveLayerState::new(ctx, self.clip_behavior.uses_save_layer(), false);
            preroll_children(&mut self.children, &mut guard, &mut self.state)
        };
        self.state
            .set_paint_bounds(
                geometry::intersection(child_bounds, clip_bounds).unwrap_or_default(),
            );

        ctx.mutators_stack.pop();
        ctx.cull_rect = previous_cull;
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        let depth = ctx.push_clip(self.shape.clone(), self.clip_behavior.is_aa());
        if self.clip_behavior.uses_save_layer() {
            ctx.push_save_layer(Some(self.state.paint_bounds()), 1.0, None);
        }
        paint_children(&self.children, ctx);
        ctx.restore_to(depth);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use kurbo::{Point, Rect, RoundedRect, Size};
    use laminar_core::canvas::Canvas;
    use laminar_core::display_list::{DisplayListBuilder, DisplayOp};
    use laminar_core::geometry::Color;
    use laminar_core::id::ViewId;
    use laminar_core::mutator::Mutator;

    use super::*;
    use crate::layer::{BackdropFilterLayer, DisplayListLayer, PlatformViewLayer};

    fn frame() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 100.0)
    }

    fn rect_layer(rect: Rect) -> Box<dyn Layer> {
        let mut builder = DisplayListBuilder::new();
        builder.draw_rect(rect, Color::WHITE);
        Box::new(DisplayListLayer::new(Point::ZERO, builder.build()))
    }

    #[test]
    fn paint_bounds_are_clipped() {
        let mut layer = ClipLayer::new(
            ClipShape::Rect(Rect::new(0.0, 0.0, 20.0, 20.0)),
            ClipBehavior::HardEdge,
        )
        .with_child(rect_layer(Rect::new(10.0, 10.0, 50.0, 50.0)));
        let mut ctx = PrerollContext::new(frame());
        layer.preroll(&mut ctx);
        assert_eq!(layer.paint_bounds(), Rect::new(10.0, 10.0, 20.0, 20.0));
        assert!(ctx.mutators_stack.is_empty());
        assert_eq!(ctx.cull_rect, frame());
    }

    #[test]
    fn culled_clip_skips_children() {
        let mut layer = ClipLayer::new(
            ClipShape::Rect(Rect::new(200.0, 200.0, 220.0, 220.0)),
            ClipBehavior::AntiAlias,
        )
        .with_child(Box::new(PlatformViewLayer::new(
            Point::new(200.0, 200.0),
            Size::new(10.0, 10.0),
            ViewId(3),
        )));
        let mut ctx = PrerollContext::new(frame());
        layer.preroll(&mut ctx);
        assert_eq!(layer.paint_bounds(), Rect::ZERO);
        assert!(!ctx.has_platform_view);
    }

    #[test]
    fn save_layer_clip_contains_readback() {
        let blur = laminar_core::geometry::ImageFilter::Blur {
            sigma_x: 2.0,
            sigma_y: 2.0,
        };
        let mut contained = ClipLayer::new(
            ClipShape::RoundedRect(RoundedRect::new(0.0, 0.0, 50.0, 50.0, 4.0)),
            ClipBehavior::AntiAliasWithSaveLayer,
        )
        .with_child(Box::new(BackdropFilterLayer::new(blur)));
        let mut ctx = PrerollContext::new(frame());
        contained.preroll(&mut ctx);
        assert!(!ctx.surface_needs_readback);

        let mut open = ClipLayer::new(
            ClipShape::Rect(Rect::new(0.0, 0.0, 50.0, 50.0)),
            ClipBehavior::AntiAlias,
        )
        .with_child(Box::new(BackdropFilterLayer::new(blur)));
        let mut ctx = PrerollContext::new(frame());
        open.preroll(&mut ctx);
        assert!(ctx.surface_needs_readback);
    }

    #[test]
    fn mutator_visible_to_children() {
        #[derive(Debug, Default)]
        struct Probe {
            state: LayerState,
            seen: Rc<RefCell<Vec<Mutator>>>,
        }
        impl Layer for Probe {
            fn state(&self) -> &LayerState {
                &self.state
            }
            fn state_mut(&mut self) -> &mut LayerState {
                &mut self.state
            }
            fn preroll(&mut self, ctx: &mut PrerollContext<'_>) {
                *self.seen.borrow_mut() =
                    ctx.mutators_stack.iter().map(|m| (**m).clone()).collect();
            }
            fn paint(&self, _: &mut PaintContext<'_>) {}
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let clip = Rect::new(0.0, 0.0, 30.0, 30.0);
        let mut layer =
            ClipLayer::new(ClipShape::Rect(clip), ClipBehavior::HardEdge).with_child(Box::new(
                Probe {
                    seen: Rc::clone(&seen),
                    ..Probe::default()
                },
            ));
        let mut ctx = PrerollContext::new(frame());
        layer.preroll(&mut ctx);
        assert_eq!(*seen.borrow(), vec![Mutator::ClipRect(clip)]);
        assert!(ctx.mutators_stack.is_empty());
    }

    #[test]
    fn paint_emits_balanced_clip() {
        let mut layer = ClipLayer::new(
            ClipShape::Rect(Rect::new(0.0, 0.0, 20.0, 20.0)),
            ClipBehavior::AntiAliasWithSaveLayer,
        )
        .with_child(rect_layer(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let mut ctx = PrerollContext::new(frame());
        layer.preroll(&mut ctx);

        let mut canvas = DisplayListBuilder::new();
        {
            let mut paint = PaintContext::new(&mut canvas);
            layer.paint(&mut paint);
        }
        assert_eq!(canvas.save_count(), 1);
        let ops = canvas.build();
        assert!(matches!(ops.ops()[0], DisplayOp::Save));
        assert!(matches!(
            ops.ops()[1],
            DisplayOp::ClipRect { is_aa: true, .. }
        ));
        assert!(matches!(ops.ops()[2], DisplayOp::SaveLayer { .. }));
    }
}
