// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The root of a frame's scene.

use std::fmt;

use kurbo::Size;
use laminar_core::canvas::Canvas;

use super::{Layer, PaintContext, PrerollContext};
use crate::embedder::ExternalViewEmbedder;
use crate::raster_cache::RasterCache;

/// Per-frame collaborators for [`LayerTree::preroll`] and
/// [`LayerTree::paint`].
///
/// With a view embedder, painting goes to the embedder's root canvas and
/// `canvas` is ignored. The raster cache is optional; leaving it out paints
/// everything directly.
#[derive(Default)]
pub struct CompositorFrame<'a> {
    /// Canvas painted into when there is no view embedder.
    pub canvas: Option<&'a mut dyn Canvas>,
    /// Embedder compositing platform views.
    pub view_embedder: Option<&'a mut dyn ExternalViewEmbedder>,
    /// Cache for rasterized display lists.
    pub raster_cache: Option<&'a mut RasterCache>,
}

impl fmt::Debug for CompositorFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositorFrame")
            .field("has_canvas", &self.canvas.is_some())
            .field("has_view_embedder", &self.view_embedder.is_some())
            .field("has_raster_cache", &self.raster_cache.is_some())
            .finish()
    }
}

impl<'a> CompositorFrame<'a> {
    /// A frame painting straight into `canvas`.
    #[must_use]
    pub fn new(canvas: &'a mut dyn Canvas) -> Self {
        Self {
            canvas: Some(canvas),
            ..Self::default()
        }
    }

    /// A frame composited through `view_embedder`.
    #[must_use]
    pub fn with_embedder(view_embedder: &'a mut dyn ExternalViewEmbedder) -> Self {
        Self {
            view_embedder: Some(view_embedder),
            ..Self::default()
        }
    }

    /// Attaches a raster cache.
    #[must_use]
    pub fn with_raster_cache(mut self, raster_cache: &'a mut RasterCache) -> Self {
        self.raster_cache = Some(raster_cache);
        self
    }
}

/// A layer tree and the frame size it was built for.
#[derive(Debug)]
pub struct LayerTree {
    root: Box<dyn Layer>,
    frame_size: Size,
}

impl LayerTree {
    /// Creates a tree drawn into a `frame_size` device-pixel frame.
    #[must_use]
    pub fn new(root: Box<dyn Layer>, frame_size: Size) -> Self {
        Self { root, frame_size }
    }

    /// The root layer.
    #[must_use]
    pub fn root(&self) -> &dyn Layer {
        &*self.root
    }

    /// The frame size in device pixels.
    #[must_use]
    pub const fn frame_size(&self) -> Size {
        self.frame_size
    }

    /// Walks the tree once before painting.
    ///
    /// Platform views are reported to the frame's embedder and cache
    /// candidates to its raster cache. The caller brackets the frame with
    /// [`RasterCache::begin_frame`] and [`RasterCache::end_frame`].
    ///
    /// Returns whether the scene reads back the surface.
    pub fn preroll(&mut self, frame: &mut CompositorFrame<'_>) -> bool {
        let mut ctx = PrerollContext::new(self.frame_size.to_rect());
        ctx.raster_cache = frame.raster_cache.as_deref_mut();
        ctx.view_embedder = match &mut frame.view_embedder {
            Some(embedder) => Some(&mut **embedder),
            None => None,
        };
        self.root.preroll(&mut ctx);
        ctx.surface_needs_readback
    }

    /// Paints the prerolled tree.
    ///
    /// Returns `false`, painting nothing, when the frame has no canvas to
    /// paint into.
    pub fn paint(&self, frame: &mut CompositorFrame<'_>) -> bool {
        let mut ctx = match (&mut frame.view_embedder, &mut frame.canvas) {
            (Some(embedder), _) => PaintContext::with_embedder(&mut **embedder),
            (None, Some(canvas)) => PaintContext::new(&mut **canvas),
            (None, None) => {
                log::warn!("layer tree painted without a canvas");
                return false;
            }
        };
        if ctx.canvas().is_none() {
            log::warn!("view embedder has no root canvas; frame not painted");
            return false;
        }
        if let Some(cache) = frame.raster_cache.as_deref_mut() {
            ctx = ctx.with_raster_cache(cache);
        }
        let mut ctx = ctx.with_cull_rect(self.frame_size.to_rect());
        if self.root.needs_painting(&ctx) {
            self.root.paint(&mut ctx);
        }
        ctx.restore_to(0);
        true
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect};
    use laminar_core::display_list::{DisplayListBuilder, DisplayOp};
    use laminar_core::embedded_view::EmbeddedViewParams;
    use laminar_core::geometry::{Color, ImageFilter};
    use laminar_core::id::{RenderViewId, ViewId};

    use super::*;
    use crate::embedder::{GpuContext, RasterThreadMerger};
    use crate::layer::{BackdropFilterLayer, ContainerLayer, DisplayListLayer, PlatformViewLayer};

    fn rect_layer(rect: Rect) -> Box<dyn Layer> {
        let mut builder = DisplayListBuilder::new();
        builder.draw_rect(rect, Color::WHITE);
        Box::new(DisplayListLayer::new(Point::ZERO, builder.build()))
    }

    #[derive(Default)]
    struct TwoCanvasEmbedder {
        root: DisplayListBuilder,
        overlay: DisplayListBuilder,
        prerolled: Vec<ViewId>,
    }

    impl ExternalViewEmbedder for TwoCanvasEmbedder {
        fn root_canvas(&mut self) -> Option<&mut dyn Canvas> {
            Some(&mut self.root)
        }

        fn cancel_frame(&mut self) {}

        fn begin_frame(&mut self, _: Option<GpuContext>, _: Option<&RasterThreadMerger>) {}

        fn prepare_view(&mut self, _: RenderViewId, _: Size, _: f64) {}

        fn preroll_composite_embedded_view(&mut self, view_id: ViewId, _: EmbeddedViewParams) {
            self.prerolled.push(view_id);
        }

        fn composite_embedded_view(&mut self, _: ViewId) -> Option<&mut dyn Canvas> {
            Some(&mut self.overlay)
        }
    }

    #[test]
    fn paints_into_frame_canvas() {
        let mut tree = LayerTree::new(
            Box::new(ContainerLayer::new().with_child(rect_layer(Rect::new(0.0, 0.0, 5.0, 5.0)))),
            Size::new(100.0, 100.0),
        );
        let mut canvas = DisplayListBuilder::new();
        {
            let mut frame = CompositorFrame::new(&mut canvas);
            assert!(!tree.preroll(&mut frame));
            assert!(tree.paint(&mut frame));
        }
        let list = canvas.build();
        assert_eq!(list.bounds(), Rect::new(0.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn paint_without_canvas_fails() {
        let tree = LayerTree::new(Box::new(ContainerLayer::new()), Size::new(10.0, 10.0));
        assert!(!tree.paint(&mut CompositorFrame::default()));
    }

    #[test]
    fn preroll_reports_readback() {
        let mut tree = LayerTree::new(
            Box::new(BackdropFilterLayer::new(ImageFilter::Blur {
                sigma_x: 1.0,
                sigma_y: 1.0,
            })),
            Size::new(10.0, 10.0),
        );
        assert!(tree.preroll(&mut CompositorFrame::default()));
    }

    #[test]
    fn content_above_platform_view_goes_to_overlay() {
        let mut tree = LayerTree::new(
            Box::new(
                ContainerLayer::new()
                    .with_child(rect_layer(Rect::new(0.0, 0.0, 50.0, 50.0)))
                    .with_child(Box::new(PlatformViewLayer::new(
                        Point::ZERO,
                        Size::new(20.0, 20.0),
                        ViewId(7),
                    )))
                    .with_child(rect_layer(Rect::new(10.0, 10.0, 15.0, 15.0))),
            ),
            Size::new(100.0, 100.0),
        );
        let mut embedder = TwoCanvasEmbedder::default();
        {
            let mut frame = CompositorFrame::with_embedder(&mut embedder);
            tree.preroll(&mut frame);
            assert!(tree.paint(&mut frame));
        }
        assert_eq!(embedder.prerolled, vec![ViewId(7)]);
        let root = std::mem::take(&mut embedder.root).build();
        let overlay = std::mem::take(&mut embedder.overlay).build();
        assert_eq!(root.bounds(), Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(overlay.bounds(), Rect::new(10.0, 10.0, 15.0, 15.0));
        assert!(matches!(overlay.ops()[0], DisplayOp::DrawDisplayList { .. }));
    }
}
