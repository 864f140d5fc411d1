// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An embedder that presents engine content through backing stores.
//!
//! Every frame records one slice for the root and one per platform view. At
//! submit the slices and platform views are packed into as few layers as
//! possible without changing the visual result. Each layer is its platform
//! views, bottom to top, followed by one backing store holding the engine
//! content drawn above them.
//!
//! A platform view goes into the lowest layer it can without being covered
//! by content that was drawn below it. Content goes into the highest layer
//! whose views or content it overlaps, so it still draws above everything it
//! touches.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use kurbo::{Point, Rect, RoundedRect, Size};
use laminar_core::canvas::Canvas;
use laminar_core::display_list::{DisplayList, DisplayListBuilder};
use laminar_core::embedded_view::EmbeddedViewParams;
use laminar_core::geometry::{self, Color};
use laminar_core::id::{RenderViewId, ViewId};
use laminar_core::mutator::Mutator;
use laminar_core::transform::Transform3d;
use laminar_render::{
    PixelFormat, RenderTargetAllocator, RenderTargetCache, RenderTargetCacheConfig,
};

use super::{
    ExternalViewEmbedder, GpuContext, PostPrerollResult, RasterThreadMerger, RasterThreadStatus,
};
use crate::surface_frame::SurfaceFrame;
use crate::view_slice::DisplayListEmbedderViewSlice;

/// A mutation applied by the platform to a native view, outermost first.
#[derive(Clone, Debug, PartialEq)]
pub enum PlatformViewMutation {
    /// Clip to a rect.
    ClipRect(Rect),
    /// Clip to a rounded rect.
    ClipRoundedRect(RoundedRect),
    /// Concatenate a transform.
    Transform(Transform3d),
    /// Multiply opacity, in `0.0..1.0`.
    Opacity(f64),
}

/// One entry of the list handed to the present callback, bottom first.
#[derive(Clone, Debug)]
pub enum PresentedLayer<T> {
    /// Engine content rendered into an offscreen target.
    BackingStore {
        /// The target to rasterize `content` into.
        target: T,
        /// Everything drawn into this backing store, surface transform
        /// applied.
        content: Arc<DisplayList>,
        /// Position on the surface.
        offset: Point,
        /// Size on the surface.
        size: Size,
        /// Surface rects the content actually covers.
        paint_region: Vec<Rect>,
    },
    /// A native view.
    PlatformView {
        /// The view.
        view_id: ViewId,
        /// Mutations to apply, outermost first.
        mutations: Vec<PlatformViewMutation>,
        /// Position on the surface.
        offset: Point,
        /// Size on the surface.
        size: Size,
    },
}

/// Receives the layers of a submitted view. Returns whether they were
/// presented.
pub type PresentCallback<T> = Box<dyn FnMut(RenderViewId, &[PresentedLayer<T>]) -> bool>;

/// Configuration for [`CompositingViewEmbedder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmbedderConfig {
    /// Allocate fresh backing stores every frame instead of reusing them.
    pub avoid_backing_store_cache: bool,
    /// Ask for the raster and platform threads to merge while platform views
    /// are on screen.
    pub dynamic_thread_merging: bool,
    /// Frames a merge lasts after the last platform view is seen.
    pub merged_lease_frames: u32,
    /// Frames an unused backing store is kept.
    pub backing_store_keep_alive_frames: u32,
    /// Pixel format of backing stores.
    pub backing_store_format: PixelFormat,
}

impl EmbedderConfig {
    /// Cached backing stores, no thread merging.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            avoid_backing_store_cache: false,
            dynamic_thread_merging: false,
            merged_lease_frames: RasterThreadMerger::DEFAULT_LEASE_FRAMES,
            backing_store_keep_alive_frames: RenderTargetCacheConfig::new().keep_alive_frames,
            backing_store_format: PixelFormat::Rgba8Unorm,
        }
    }

    /// Never reuses backing stores, for backends that cannot share targets
    /// across frames.
    #[must_use]
    pub const fn uncached() -> Self {
        Self {
            avoid_backing_store_cache: true,
            ..Self::new()
        }
    }

    /// Merges threads while platform views are visible.
    #[must_use]
    pub const fn thread_merging() -> Self {
        Self {
            dynamic_thread_merging: true,
            ..Self::new()
        }
    }
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum PendingKey {
    Root,
    Platform(ViewId),
}

#[derive(Debug)]
struct PendingView {
    slice: DisplayListEmbedderViewSlice,
    params: Option<EmbeddedViewParams>,
}

#[derive(Debug)]
struct PlannedView {
    view_id: ViewId,
    clipped_frame: Rect,
}

#[derive(Debug, Default)]
struct PlannedLayer {
    platform_views: Vec<PlannedView>,
    contents: Vec<PendingKey>,
    region: Vec<Rect>,
}

impl PlannedLayer {
    fn views_overlap(&self, rect: Rect) -> bool {
        self.platform_views
            .iter()
            .any(|view| geometry::overlaps(view.clipped_frame, rect))
    }

    fn views_overlap_region(&self, region: &[Rect]) -> bool {
        self.platform_views.iter().any(|view| {
            let frame = geometry::round_out(view.clipped_frame);
            region.iter().any(|rect| geometry::overlaps(*rect, frame))
        })
    }

    fn contents_overlap(&self, rect: Rect) -> bool {
        let rect = geometry::round_out(rect);
        self.region.iter().any(|r| geometry::overlaps(*r, rect))
    }

    fn contents_overlap_region(&self, region: &[Rect]) -> bool {
        region.iter().any(|rect| self.contents_overlap(*rect))
    }

    fn has_contents(&self) -> bool {
        !self.contents.is_empty()
    }
}

/// Packs slices and platform views into layers.
#[derive(Debug)]
struct LayerBuilder {
    layers: Vec<PlannedLayer>,
}

impl LayerBuilder {
    fn new() -> Self {
        Self {
            layers: vec![PlannedLayer::default()],
        }
    }

    fn add_platform_view(&mut self, view: PlannedView) {
        let index = self.layer_for_platform_view(view.clipped_frame);
        self.layers[index].platform_views.push(view);
    }

    fn add_contents(&mut self, key: PendingKey, region: Vec<Rect>) {
        let index = (0..self.layers.len())
            .rev()
            .find(|&i| {
                let layer = &self.layers[i];
                layer.views_overlap_region(&region) || layer.contents_overlap_region(&region)
            })
            .unwrap_or(0);
        let layer = &mut self.layers[index];
        layer.contents.push(key);
        layer.region.extend(region);
    }

    fn layer_for_platform_view(&mut self, frame: Rect) -> usize {
        for index in (0..self.layers.len()).rev() {
            let layer = &self.layers[index];
            // Content here must stay above the view, so it goes one higher.
            if layer.contents_overlap(frame) {
                if index + 1 == self.layers.len() {
                    self.layers.push(PlannedLayer::default());
                }
                return index + 1;
            }
            if layer.views_overlap(frame) {
                return index;
            }
        }
        0
    }
}

/// The stock [`ExternalViewEmbedder`].
///
/// Backing stores come from `A`, through one [`RenderTargetCache`] per
/// rendered view, and are handed to the present callback together with the
/// display list to rasterize into them.
pub struct CompositingViewEmbedder<A: RenderTargetAllocator> {
    config: EmbedderConfig,
    allocator: A,
    present_callback: PresentCallback<A::Target>,
    surface_transformation: Option<Box<dyn Fn() -> Transform3d>>,
    backing_store_caches: HashMap<RenderViewId, RenderTargetCache<A>>,
    pending_views: HashMap<PendingKey, PendingView>,
    composition_order: Vec<PendingKey>,
    pending_frame_size: Size,
    pending_device_pixel_ratio: f64,
    pending_surface_transformation: Transform3d,
    point_of_no_return: bool,
}

impl<A: RenderTargetAllocator> fmt::Debug for CompositingViewEmbedder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositingViewEmbedder")
            .field("config", &self.config)
            .field("views_with_caches", &self.backing_store_caches.len())
            .field("composition_order", &self.composition_order)
            .field("pending_frame_size", &self.pending_frame_size)
            .field("point_of_no_return", &self.point_of_no_return)
            .finish_non_exhaustive()
    }
}

impl<A: RenderTargetAllocator + Clone> CompositingViewEmbedder<A> {
    /// Creates an embedder with the default configuration.
    #[must_use]
    pub fn new(allocator: A, present_callback: PresentCallback<A::Target>) -> Self {
        Self::with_config(EmbedderConfig::default(), allocator, present_callback)
    }

    /// Creates an embedder with an explicit configuration.
    #[must_use]
    pub fn with_config(
        config: EmbedderConfig,
        allocator: A,
        present_callback: PresentCallback<A::Target>,
    ) -> Self {
        Self {
            config,
            allocator,
            present_callback,
            surface_transformation: None,
            backing_store_caches: HashMap::new(),
            pending_views: HashMap::new(),
            composition_order: Vec::new(),
            pending_frame_size: Size::ZERO,
            pending_device_pixel_ratio: 1.0,
            pending_surface_transformation: Transform3d::IDENTITY,
            point_of_no_return: false,
        }
    }

    /// Sets the source of the surface transformation, sampled once per frame
    /// in [`prepare_view`](ExternalViewEmbedder::prepare_view).
    pub fn set_surface_transformation_callback(
        &mut self,
        callback: Box<dyn Fn() -> Transform3d>,
    ) {
        self.surface_transformation = Some(callback);
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &EmbedderConfig {
        &self.config
    }

    /// Platform views prerolled this frame, in composition order.
    #[must_use]
    pub fn pending_platform_views(&self) -> Vec<ViewId> {
        self.composition_order
            .iter()
            .filter_map(|key| match key {
                PendingKey::Platform(view_id) => Some(*view_id),
                PendingKey::Root => None,
            })
            .collect()
    }

    /// The backing-store cache of `view_id`, once it has submitted a frame.
    #[must_use]
    pub fn backing_store_cache(&self, view_id: RenderViewId) -> Option<&RenderTargetCache<A>> {
        self.backing_store_caches.get(&view_id)
    }

    fn reset(&mut self) {
        self.pending_views.clear();
        self.composition_order.clear();
        self.point_of_no_return = false;
    }

    fn frame_rect(&self) -> Rect {
        self.pending_frame_size.to_rect()
    }

    fn build_layers(&mut self) -> LayerBuilder {
        let mut builder = LayerBuilder::new();
        for key in &self.composition_order {
            let Some(view) = self.pending_views.get_mut(key) else {
                continue;
            };
            view.slice.end_recording();
            if let (PendingKey::Platform(view_id), Some(params)) = (key, &view.params) {
                builder.add_platform_view(PlannedView {
                    view_id: *view_id,
                    clipped_frame: params.final_bounding_rect(),
                });
            }
            if !view.slice.is_empty() {
                let region = view
                    .slice
                    .region()
                    .iter()
                    .map(|rect| geometry::round_out(*rect))
                    .collect();
                builder.add_contents(*key, region);
            }
        }
        builder
    }
}

fn new_backing_store_cache<A: RenderTargetAllocator + Clone>(
    allocator: &A,
    config: &EmbedderConfig,
) -> RenderTargetCache<A> {
    let mut cache = RenderTargetCache::new(allocator.clone())
        .with_keep_alive(config.backing_store_keep_alive_frames);
    if config.avoid_backing_store_cache {
        cache.disable_cache();
    }
    cache
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "backing stores are sized in whole, non-negative pixels"
)]
fn pixel_extent(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

fn compose_contents(
    keys: &[PendingKey],
    views: &HashMap<PendingKey, PendingView>,
    surface_transformation: &Transform3d,
) -> Arc<DisplayList> {
    let mut builder = DisplayListBuilder::new();
    builder.clear(Color::TRANSPARENT);
    for view in keys.iter().filter_map(|key| views.get(key)) {
        builder.save();
        if !surface_transformation.is_identity() {
            builder.transform(surface_transformation);
        }
        view.slice.render_into(&mut builder);
        builder.restore();
    }
    builder.build()
}

fn convert_mutations(
    params: &EmbeddedViewParams,
    surface_transformation: &Transform3d,
) -> Vec<PlatformViewMutation> {
    let mut mutations = Vec::new();
    for mutator in params.mutators().bottom_to_top() {
        match &**mutator {
            Mutator::ClipRect(rect) => mutations.push(PlatformViewMutation::ClipRect(*rect)),
            Mutator::ClipRoundedRect(rrect) => {
                mutations.push(PlatformViewMutation::ClipRoundedRect(*rrect));
            }
            Mutator::ClipRoundSuperellipse(rse) => {
                mutations.push(PlatformViewMutation::ClipRoundedRect(rse.to_rounded_rect()));
            }
            // Platforms cannot clip native views to a path.
            Mutator::ClipPath(_) | Mutator::BackdropFilter { .. } => {}
            Mutator::Transform(matrix) => {
                if !matrix.is_identity() {
                    mutations.push(PlatformViewMutation::Transform(*matrix));
                }
            }
            Mutator::Opacity(alpha) => {
                if *alpha < u8::MAX {
                    mutations.push(PlatformViewMutation::Opacity(f64::from(*alpha) / 255.0));
                }
            }
        }
    }
    if !mutations.is_empty() && !surface_transformation.is_identity() {
        mutations.push(PlatformViewMutation::Transform(*surface_transformation));
    }
    mutations.reverse();
    mutations
}

fn present_platform_view<T>(
    view_id: ViewId,
    params: &EmbeddedViewParams,
    device_pixel_ratio: f64,
    surface_transformation: &Transform3d,
) -> PresentedLayer<T> {
    let size = params.size();
    let bounds = Rect::from_origin_size(
        params.final_bounding_rect().origin(),
        Size::new(size.width * device_pixel_ratio, size.height * device_pixel_ratio),
    );
    let surface_bounds = surface_transformation.transform_rect_bounds(bounds);
    PresentedLayer::PlatformView {
        view_id,
        mutations: convert_mutations(params, surface_transformation),
        offset: surface_bounds.origin(),
        size: surface_bounds.size(),
    }
}

impl<A: RenderTargetAllocator + Clone> ExternalViewEmbedder for CompositingViewEmbedder<A> {
    fn root_canvas(&mut self) -> Option<&mut dyn Canvas> {
        match self.pending_views.get_mut(&PendingKey::Root) {
            Some(view) => view.slice.canvas(),
            None => {
                log::warn!("no root canvas; prepare_view was not called for this frame");
                None
            }
        }
    }

    /// # Panics
    ///
    /// Panics once a platform view has been composited this frame.
    fn cancel_frame(&mut self) {
        assert!(
            !self.point_of_no_return,
            "cancel_frame called after a platform view was composited"
        );
        self.reset();
    }

    fn begin_frame(&mut self, context: Option<GpuContext>, merger: Option<&RasterThreadMerger>) {
        let _ = (context, merger);
    }

    fn prepare_view(&mut self, _view_id: RenderViewId, frame_size: Size, device_pixel_ratio: f64) {
        self.reset();
        self.pending_frame_size = frame_size;
        self.pending_device_pixel_ratio = device_pixel_ratio;
        self.pending_surface_transformation = self
            .surface_transformation
            .as_ref()
            .map_or(Transform3d::IDENTITY, |callback| callback());
        self.pending_views.insert(
            PendingKey::Root,
            PendingView {
                slice: DisplayListEmbedderViewSlice::new(self.frame_rect()),
                params: None,
            },
        );
        self.composition_order.push(PendingKey::Root);
    }

    /// # Panics
    ///
    /// Panics if `view_id` was already prerolled this frame.
    fn preroll_composite_embedded_view(&mut self, view_id: ViewId, params: EmbeddedViewParams) {
        let key = PendingKey::Platform(view_id);
        assert!(
            !self.pending_views.contains_key(&key),
            "platform view {view_id:?} prerolled twice in one frame"
        );
        self.pending_views.insert(
            key,
            PendingView {
                slice: DisplayListEmbedderViewSlice::new(self.frame_rect()),
                params: Some(params),
            },
        );
        self.composition_order.push(key);
    }

    fn post_preroll_action(&mut self, merger: Option<&RasterThreadMerger>) -> PostPrerollResult {
        let Some(merger) = merger else {
            return PostPrerollResult::Success;
        };
        if !self.config.dynamic_thread_merging || self.pending_platform_views().is_empty() {
            return PostPrerollResult::Success;
        }
        let lease = self.config.merged_lease_frames;
        if merger.is_merged() {
            merger.extend_lease_to(lease);
            return PostPrerollResult::Success;
        }
        if merger.merge_with_lease(lease) {
            PostPrerollResult::ResubmitFrame
        } else {
            PostPrerollResult::Success
        }
    }

    /// # Panics
    ///
    /// Panics if `view_id` was not prerolled this frame.
    fn composite_embedded_view(&mut self, view_id: ViewId) -> Option<&mut dyn Canvas> {
        let Some(view) = self.pending_views.get_mut(&PendingKey::Platform(view_id)) else {
            panic!("composited platform view {view_id:?} that was not prerolled");
        };
        self.point_of_no_return = true;
        view.slice.canvas()
    }

    fn submit_view(
        &mut self,
        view_id: RenderViewId,
        context: Option<GpuContext>,
        mut frame: SurfaceFrame<'_>,
    ) -> bool {
        let _ = context;
        let surface_transformation = self.pending_surface_transformation;
        let device_pixel_ratio = self.pending_device_pixel_ratio;
        let surface_bounds = surface_transformation.transform_rect_bounds(self.frame_rect());
        let width = pixel_extent(surface_bounds.width());
        let height = pixel_extent(surface_bounds.height());

        let builder = self.build_layers();

        let cache = self
            .backing_store_caches
            .entry(view_id)
            .or_insert_with(|| new_backing_store_cache(&self.allocator, &self.config));
        cache.start();
        let mut presented = Vec::new();
        for layer in &builder.layers {
            for view in &layer.platform_views {
                let key = PendingKey::Platform(view.view_id);
                if let Some(params) = self.pending_views.get(&key).and_then(|v| v.params.as_ref()) {
                    presented.push(present_platform_view(
                        view.view_id,
                        params,
                        device_pixel_ratio,
                        &surface_transformation,
                    ));
                }
            }
            if !layer.has_contents() {
                continue;
            }
            // The cache logs the failure; the content is dropped this frame.
            let Some(target) = cache.create_offscreen(
                width,
                height,
                self.config.backing_store_format,
                "backing store",
            ) else {
                continue;
            };
            presented.push(PresentedLayer::BackingStore {
                target,
                content: compose_contents(
                    &layer.contents,
                    &self.pending_views,
                    &surface_transformation,
                ),
                offset: surface_bounds.origin(),
                size: surface_bounds.size(),
                paint_region: layer
                    .region
                    .iter()
                    .map(|rect| surface_transformation.transform_rect_bounds(*rect))
                    .collect(),
            });
        }
        cache.end();

        let was_presented = (self.present_callback)(view_id, &presented);
        if !was_presented {
            log::warn!("present callback rejected the layers of view {view_id:?}");
        }
        frame.submit() && was_presented
    }

    fn end_frame(&mut self, should_resubmit_frame: bool, merger: Option<&RasterThreadMerger>) {
        self.point_of_no_return = false;
        if !self.config.dynamic_thread_merging || should_resubmit_frame {
            return;
        }
        if let Some(merger) = merger
            && merger.decrement_lease() == RasterThreadStatus::UnmergedNow
        {
            log::debug!("raster thread merge lease expired");
        }
    }

    fn supports_dynamic_thread_merging(&self) -> bool {
        self.config.dynamic_thread_merging
    }

    fn teardown(&mut self) {
        self.reset();
        self.backing_store_caches.clear();
    }

    fn collect_view(&mut self, view_id: RenderViewId) {
        self.backing_store_caches.remove(&view_id);
    }
}
