// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf layer drawing a recorded display list.

use std::sync::Arc;

use kurbo::{Point, Rect};
use laminar_core::display_list::DisplayList;
use laminar_core::transform::Transform3d;

use super::{Layer, LayerState, PaintContext, PrerollContext};

/// Draws a display list at an offset. The main raster-cache candidate.
#[derive(Debug)]
pub struct DisplayListLayer {
    state: LayerState,
    offset: Point,
    display_list: Arc<DisplayList>,
    is_complex: bool,
    will_change: bool,
}

impl DisplayListLayer {
    /// Creates a layer drawing `display_list` translated by `offset`.
    #[must_use]
    pub fn new(offset: Point, display_list: Arc<DisplayList>) -> Self {
        Self {
            state: LayerState::default(),
            offset,
            display_list,
            is_complex: false,
            will_change: false,
        }
    }

    /// Sets caching hints from the producer of the display list.
    ///
    /// `is_complex` lets a short list be cached anyway; `will_change`
    /// keeps it out of the cache.
    #[must_use]
    pub fn with_hints(mut self, is_complex: bool, will_change: bool) -> Self {
        self.is_complex = is_complex;
        self.will_change = will_change;
        self
    }

    /// The recorded content.
    #[must_use]
    pub fn display_list(&self) -> &Arc<DisplayList> {
        &self.display_list
    }

    /// Offset the list is drawn at.
    #[must_use]
    pub const fn offset(&self) -> Point {
        self.offset
    }
}

impl Layer for DisplayListLayer {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn preroll(&mut self, ctx: &mut PrerollContext<'_>) {
        let bounds = if self.display_list.is_empty() {
            Rect::ZERO
        } else {
            self.display_list.bounds() + self.offset.to_vec2()
        };
        self.state.set_paint_bounds(bounds);

        let matrix = ctx.matrix.pre_translate(self.offset.x, self.offset.y);
        if let Some(cache) = ctx.raster_cache.as_deref_mut() {
            cache.prepare_display_list(
                &self.display_list,
                &matrix,
                self.is_complex,
                self.will_change,
            );
        }
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        let depth = ctx.depth();
        if self.offset != Point::ZERO {
            ctx.push_transform(&Transform3d::translate(self.offset.x, self.offset.y));
        }
        if !ctx.draw_cached_display_list(&self.display_list, 1.0)
            && let Some(canvas) = ctx.canvas()
        {
            canvas.draw_display_list(&self.display_list, 1.0);
        }
        ctx.restore_to(depth);
    }
}

#[cfg(test)]
mod tests {
    use laminar_core::canvas::{Canvas, ImageHandle};
    use laminar_core::display_list::{DisplayListBuilder, DisplayOp};
    use laminar_core::geometry::Color;

    use super::*;
    use crate::raster_cache::{RasterCache, RasterCacheConfig, Rasterizer};

    struct FixedRasterizer;

    impl Rasterizer for FixedRasterizer {
        fn rasterize(&mut self, _: &DisplayList, _: &Transform3d, _: Rect) -> Option<ImageHandle> {
            Some(ImageHandle {
                id: 9,
                width: 10,
                height: 10,
            })
        }
    }

    fn list() -> Arc<DisplayList> {
        let mut builder = DisplayListBuilder::new();
        builder.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::BLACK);
        builder.build()
    }

    #[test]
    fn bounds_include_offset() {
        let mut layer = DisplayListLayer::new(Point::new(3.0, 4.0), list());
        let mut ctx = PrerollContext::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        layer.preroll(&mut ctx);
        assert_eq!(layer.paint_bounds(), Rect::new(3.0, 4.0, 13.0, 14.0));
    }

    #[test]
    fn paints_list_without_cache() {
        let layer = DisplayListLayer::new(Point::new(3.0, 4.0), list());
        let mut canvas = DisplayListBuilder::new();
        {
            let mut paint = PaintContext::new(&mut canvas);
            layer.paint(&mut paint);
        }
        assert_eq!(canvas.save_count(), 1);
        let ops = canvas.build();
        assert!(
            ops.ops()
                .iter()
                .any(|op| matches!(op, DisplayOp::DrawDisplayList { .. }))
        );
    }

    #[test]
    fn paints_cached_image_when_available() {
        let mut layer = DisplayListLayer::new(Point::ZERO, list()).with_hints(true, false);
        let mut cache = RasterCache::with_rasterizer(
            RasterCacheConfig::eager(),
            Box::new(FixedRasterizer),
        );
        cache.begin_frame();
        {
            let mut ctx = PrerollContext::new(Rect::new(0.0, 0.0, 100.0, 100.0))
                .with_raster_cache(&mut cache);
            layer.preroll(&mut ctx);
        }
        let mut canvas = DisplayListBuilder::new();
        {
            let mut paint = PaintContext::new(&mut canvas).with_raster_cache(&mut cache);
            layer.paint(&mut paint);
        }
        let ops = canvas.build();
        assert!(
            ops.ops()
                .iter()
                .any(|op| matches!(op, DisplayOp::DrawImage { image, .. } if image.id == 9))
        );
        assert_eq!(cache.stats().hits, 1);
    }
}
