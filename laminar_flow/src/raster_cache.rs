// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-frame cache of rasterized display lists and layers.
//!
//! Content that is drawn unchanged frame after frame is rasterized once into
//! a backend image and then drawn as that image. The cache only decides
//! *what* to rasterize and *when*; the pixels come from a [`Rasterizer`]
//! supplied by the backend.
//!
//! Entries are keyed by content id and by the drawing matrix with its
//! translation removed, so content that only scrolls keeps hitting the same
//! entry. At draw time the translation is snapped to whole pixels (see
//! [`raster_cache_util`](laminar_core::raster_cache_util)) so the cached image
//! is never resampled.
//!
//! Per frame:
//!
//! 1. [`begin_frame`](RasterCache::begin_frame)
//! 2. [`mark_seen`](RasterCache::mark_seen) / [`insert`](RasterCache::insert)
//!    during preroll
//! 3. [`draw`](RasterCache::draw) during paint
//! 4. [`end_frame`](RasterCache::end_frame) evicts what was not seen

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use kurbo::Rect;
use laminar_core::canvas::{Canvas, ImageHandle};
use laminar_core::display_list::DisplayList;
use laminar_core::id::LayerUniqueId;
use laminar_core::raster_cache_util::{device_bounds, get_integral_trans_ctm};
use laminar_core::transform::Transform3d;

/// What a cache entry holds a rasterization of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RasterCacheKeyId {
    /// A layer subtree.
    Layer(LayerUniqueId),
    /// A display list.
    DisplayList(LayerUniqueId),
}

/// Cache key: content id plus the drawing matrix without its translation.
#[derive(Clone, Copy, Debug)]
pub struct RasterCacheKey {
    id: RasterCacheKeyId,
    matrix: Transform3d,
}

impl RasterCacheKey {
    /// Creates a key, discarding the translation of `matrix`.
    #[must_use]
    pub const fn new(id: RasterCacheKeyId, matrix: &Transform3d) -> Self {
        Self {
            id,
            matrix: matrix.with_translation(0.0, 0.0),
        }
    }

    /// The content id.
    #[must_use]
    pub const fn id(&self) -> RasterCacheKeyId {
        self.id
    }

    /// The matrix the content was rasterized with, translation removed.
    #[must_use]
    pub const fn matrix(&self) -> &Transform3d {
        &self.matrix
    }
}

// Matrices compare bitwise so that keys are `Eq` even when a component is
// NaN. Such keys never hit, which is the safe outcome.
impl PartialEq for RasterCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && matrix_bits(&self.matrix) == matrix_bits(&other.matrix)
    }
}

impl Eq for RasterCacheKey {}

impl Hash for RasterCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        matrix_bits(&self.matrix).hash(state);
    }
}

fn matrix_bits(matrix: &Transform3d) -> [u64; 16] {
    let mut bits = [0; 16];
    for (i, col) in matrix.cols.iter().enumerate() {
        for (j, v) in col.iter().enumerate() {
            // Fold -0.0 into 0.0 so a stripped translation compares equal.
            bits[i * 4 + j] = if *v == 0.0 { 0 } else { v.to_bits() };
        }
    }
    bits
}

/// A rasterized image together with the local rect it covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterImage {
    /// The backend image.
    pub image: ImageHandle,
    /// The content rect in the local space of the cached content.
    pub logical_rect: Rect,
}

/// Backend hook that turns a display list into an image.
pub trait Rasterizer {
    /// Rasterizes `list` drawn with `matrix` into an image covering
    /// `device_bounds`, or returns `None` if the backend cannot.
    fn rasterize(
        &mut self,
        list: &DisplayList,
        matrix: &Transform3d,
        device_bounds: Rect,
    ) -> Option<ImageHandle>;
}

/// Tuning for [`RasterCache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterCacheConfig {
    /// Frames content must be seen in before it is rasterized.
    pub access_threshold: u32,
    /// Maximum display lists rasterized in one frame.
    pub display_list_cache_limit_per_frame: u32,
    /// Display lists with fewer ops than this are cheaper to draw than to
    /// cache, unless the producer marks them complex.
    pub min_complexity: usize,
}

impl RasterCacheConfig {
    /// Default tuning: threshold 3, three rasterizations per frame, five ops.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            access_threshold: 3,
            display_list_cache_limit_per_frame: 3,
            min_complexity: 5,
        }
    }

    /// Caches on first sight with no per-frame limit. Useful for tests and
    /// for static scenes.
    #[must_use]
    pub const fn eager() -> Self {
        Self {
            access_threshold: 1,
            display_list_cache_limit_per_frame: u32::MAX,
            min_complexity: 0,
        }
    }
}

impl Default for RasterCacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache-wide totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterCacheMetrics {
    /// Tracked entries, rasterized or not.
    pub entries: usize,
    /// Entries holding an image.
    pub images: usize,
    /// Estimated bytes held by images.
    pub image_bytes: u64,
}

/// Counters for the current frame, reset by
/// [`begin_frame`](RasterCache::begin_frame).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterCacheStats {
    /// Draws served from an image.
    pub hits: u32,
    /// Draws with no image available.
    pub misses: u32,
    /// Images inserted.
    pub inserted: u32,
    /// Entries evicted by [`end_frame`](RasterCache::end_frame).
    pub evicted: u32,
}

#[derive(Clone, Copy, Debug, Default)]
struct RasterCacheEntry {
    access_count: u32,
    encountered_this_frame: bool,
    image: Option<RasterImage>,
}

/// Frame-scoped raster cache.
pub struct RasterCache {
    config: RasterCacheConfig,
    entries: HashMap<RasterCacheKey, RasterCacheEntry>,
    rasterizer: Option<Box<dyn Rasterizer>>,
    rasterized_this_frame: u32,
    stats: RasterCacheStats,
}

impl fmt::Debug for RasterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterCache")
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .field("has_rasterizer", &self.rasterizer.is_some())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Default for RasterCache {
    fn default() -> Self {
        Self::new(RasterCacheConfig::default())
    }
}

impl RasterCache {
    /// Creates a cache without a rasterizer; images must be
    /// [`insert`](Self::insert)ed by the caller.
    #[must_use]
    pub fn new(config: RasterCacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            rasterizer: None,
            rasterized_this_frame: 0,
            stats: RasterCacheStats::default(),
        }
    }

    /// Creates a cache that rasterizes display lists through `rasterizer`.
    #[must_use]
    pub fn with_rasterizer(config: RasterCacheConfig, rasterizer: Box<dyn Rasterizer>) -> Self {
        Self {
            rasterizer: Some(rasterizer),
            ..Self::new(config)
        }
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &RasterCacheConfig {
        &self.config
    }

    /// Resets per-frame counters.
    pub fn begin_frame(&mut self) {
        self.rasterized_this_frame = 0;
        self.stats = RasterCacheStats::default();
    }

    /// Records that `key` is drawn this frame.
    ///
    /// The access count goes up at most once per frame. Returns `true` when
    /// the content should be rasterized now: it has no image, has been seen
    /// in at least `access_threshold` frames, and the per-frame budget is
    /// not exhausted.
    pub fn mark_seen(&mut self, key: RasterCacheKey) -> bool {
        let entry = self.entries.entry(key).or_default();
        if !entry.encountered_this_frame {
            entry.encountered_this_frame = true;
            entry.access_count = entry.access_count.saturating_add(1);
        }
        entry.image.is_none()
            && entry.access_count >= self.config.access_threshold
            && self.rasterized_this_frame < self.config.display_list_cache_limit_per_frame
    }

    /// Stores an image for `key`, replacing any previous one.
    pub fn insert(&mut self, key: RasterCacheKey, image: RasterImage) {
        let entry = self.entries.entry(key).or_default();
        entry.encountered_this_frame = true;
        entry.image = Some(image);
        self.rasterized_this_frame = self.rasterized_this_frame.saturating_add(1);
        self.stats.inserted += 1;
    }

    /// Whether `key` has an image.
    #[must_use]
    pub fn has_image(&self, key: &RasterCacheKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.image.is_some())
    }

    /// Marks a display list seen and rasterizes it once it qualifies.
    ///
    /// Lists flagged `will_change` are never cached. Lists below
    /// `min_complexity` ops are only cached when `is_complex` is set.
    /// Returns whether an image is available for the list after the call.
    pub fn prepare_display_list(
        &mut self,
        list: &Arc<DisplayList>,
        matrix: &Transform3d,
        is_complex: bool,
        will_change: bool,
    ) -> bool {
        if will_change || list.is_empty() {
            return false;
        }
        if !is_complex && list.op_count(true) < self.config.min_complexity {
            return false;
        }
        let key = RasterCacheKey::new(RasterCacheKeyId::DisplayList(list.id()), matrix);
        if !self.mark_seen(key) {
            return self.has_image(&key);
        }
        let Some(rasterizer) = self.rasterizer.as_mut() else {
            return false;
        };
        let logical_rect = list.bounds();
        let bounds = device_bounds(logical_rect, &get_integral_trans_ctm(matrix));
        match rasterizer.rasterize(list, matrix, bounds) {
            Some(image) => {
                self.insert(key, RasterImage {
                    image,
                    logical_rect,
                });
                true
            }
            None => {
                log::debug!("rasterizer declined display list {:?}", list.id());
                false
            }
        }
    }

    /// Draws the image for `key` into `canvas` with its translation snapped
    /// to whole pixels.
    ///
    /// Returns `false`, and draws nothing, when there is no image.
    pub fn draw(&mut self, key: &RasterCacheKey, canvas: &mut dyn Canvas, opacity: f32) -> bool {
        let Some(image) = self.entries.get(key).and_then(|e| e.image) else {
            self.stats.misses += 1;
            return false;
        };
        self.stats.hits += 1;
        let ctm = get_integral_trans_ctm(&canvas.total_matrix());
        let bounds = device_bounds(image.logical_rect, &ctm);
        canvas.save();
        canvas.set_transform(&Transform3d::IDENTITY);
        canvas.draw_image(&image.image, bounds, opacity);
        canvas.restore();
        true
    }

    /// Draws a cached display list at the canvas's current matrix.
    pub fn draw_display_list(
        &mut self,
        list: &DisplayList,
        canvas: &mut dyn Canvas,
        opacity: f32,
    ) -> bool {
        let key = RasterCacheKey::new(
            RasterCacheKeyId::DisplayList(list.id()),
            &canvas.total_matrix(),
        );
        self.draw(&key, canvas, opacity)
    }

    /// Evicts entries not seen this frame.
    pub fn end_frame(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            let keep = entry.encountered_this_frame;
            entry.encountered_this_frame = false;
            keep
        });
        let evicted = before - self.entries.len();
        self.stats.evicted += u32::try_from(evicted).unwrap_or(u32::MAX);
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cache-wide totals.
    #[must_use]
    pub fn metrics(&self) -> RasterCacheMetrics {
        let mut metrics = RasterCacheMetrics {
            entries: self.entries.len(),
            ..RasterCacheMetrics::default()
        };
        for image in self.entries.values().filter_map(|e| e.image) {
            metrics.images += 1;
            metrics.image_bytes += image.image.byte_size();
        }
        metrics
    }

    /// Counters for the current frame.
    #[must_use]
    pub const fn stats(&self) -> RasterCacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use laminar_core::display_list::DisplayListBuilder;
    use laminar_core::geometry::Color;
    use laminar_core::id::LayerIdAllocator;

    use super::*;

    #[derive(Debug, Default)]
    struct CountingRasterizer {
        next: u64,
    }

    impl Rasterizer for CountingRasterizer {
        fn rasterize(
            &mut self,
            _list: &DisplayList,
            _matrix: &Transform3d,
            device_bounds: Rect,
        ) -> Option<ImageHandle> {
            self.next += 1;
            Some(ImageHandle {
                id: self.next,
                width: device_bounds.width() as u32,
                height: device_bounds.height() as u32,
            })
        }
    }

    fn complex_list(ids: &LayerIdAllocator) -> Arc<DisplayList> {
        let mut builder = DisplayListBuilder::new();
        for i in 0..6 {
            let x = f64::from(i) * 10.0;
            builder.draw_rect(Rect::new(x, 0.0, x + 8.0, 8.0), Color::WHITE);
        }
        builder.build_with_ids(ids)
    }

    fn layer_key(raw: u64, matrix: &Transform3d) -> RasterCacheKey {
        RasterCacheKey::new(
            RasterCacheKeyId::Layer(LayerUniqueId::new(raw).unwrap()),
            matrix,
        )
    }

    #[test]
    fn key_ignores_translation() {
        let a = layer_key(1, &Transform3d::translate(10.5, 3.0));
        let b = layer_key(1, &Transform3d::translate(-4.0, 0.25));
        assert_eq!(a, b);
        let scaled = layer_key(1, &Transform3d::scale(2.0, 2.0));
        assert_ne!(a, scaled);
    }

    #[test]
    fn rasterizes_after_access_threshold() {
        let ids = LayerIdAllocator::new();
        let list = complex_list(&ids);
        let mut cache = RasterCache::with_rasterizer(
            RasterCacheConfig::new(),
            Box::new(CountingRasterizer::default()),
        );
        let m = Transform3d::IDENTITY;
        for frame in 1..=3 {
            cache.begin_frame();
            let cached = cache.prepare_display_list(&list, &m, false, false);
            assert_eq!(cached, frame == 3, "frame {frame}");
            cache.end_frame();
        }
        assert_eq!(cache.metrics().images, 1);
    }

    #[test]
    fn seen_once_per_frame() {
        let mut cache = RasterCache::new(RasterCacheConfig::new());
        let key = layer_key(7, &Transform3d::IDENTITY);
        cache.begin_frame();
        for _ in 0..5 {
            assert!(!cache.mark_seen(key));
        }
        cache.end_frame();
        cache.begin_frame();
        assert!(!cache.mark_seen(key));
        cache.end_frame();
        cache.begin_frame();
        assert!(cache.mark_seen(key));
    }

    #[test]
    fn evicts_first_frame_not_seen() {
        let mut cache = RasterCache::new(RasterCacheConfig::eager());
        let key = layer_key(1, &Transform3d::IDENTITY);
        cache.begin_frame();
        assert!(cache.mark_seen(key));
        cache.insert(key, RasterImage {
            image: ImageHandle {
                id: 1,
                width: 10,
                height: 10,
            },
            logical_rect: Rect::new(0.0, 0.0, 10.0, 10.0),
        });
        cache.end_frame();
        assert_eq!(cache.metrics().image_bytes, 400);

        cache.begin_frame();
        cache.end_frame();
        assert_eq!(cache.stats().evicted, 1);
        assert_eq!(cache.metrics(), RasterCacheMetrics::default());
    }

    #[test]
    fn per_frame_limit() {
        let ids = LayerIdAllocator::new();
        let lists: Vec<_> = (0..5).map(|_| complex_list(&ids)).collect();
        let config = RasterCacheConfig {
            access_threshold: 1,
            display_list_cache_limit_per_frame: 2,
            min_complexity: 0,
        };
        let mut cache =
            RasterCache::with_rasterizer(config, Box::new(CountingRasterizer::default()));
        cache.begin_frame();
        let cached = lists
            .iter()
            .filter(|l| cache.prepare_display_list(l, &Transform3d::IDENTITY, false, false))
            .count();
        assert_eq!(cached, 2);
        assert_eq!(cache.stats().inserted, 2);
        cache.end_frame();

        cache.begin_frame();
        let cached = lists
            .iter()
            .filter(|l| cache.prepare_display_list(l, &Transform3d::IDENTITY, false, false))
            .count();
        assert_eq!(cached, 4);
    }

    #[test]
    fn complexity_heuristic() {
        let ids = LayerIdAllocator::new();
        let mut builder = DisplayListBuilder::new();
        builder.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::BLACK);
        let simple = builder.build_with_ids(&ids);
        let config = RasterCacheConfig {
            access_threshold: 1,
            ..RasterCacheConfig::new()
        };
        let mut cache =
            RasterCache::with_rasterizer(config, Box::new(CountingRasterizer::default()));
        cache.begin_frame();
        assert!(!cache.prepare_display_list(&simple, &Transform3d::IDENTITY, false, false));
        assert!(cache.prepare_display_list(&simple, &Transform3d::IDENTITY, true, false));

        let complex = complex_list(&ids);
        assert!(!cache.prepare_display_list(&complex, &Transform3d::IDENTITY, true, true));
    }

    #[test]
    fn draw_snaps_translation() {
        let ids = LayerIdAllocator::new();
        let list = complex_list(&ids);
        let mut cache = RasterCache::with_rasterizer(
            RasterCacheConfig::eager(),
            Box::new(CountingRasterizer::default()),
        );
        let m = Transform3d::translate(10.3, 20.6);
        cache.begin_frame();
        assert!(cache.prepare_display_list(&list, &m, false, false));

        let mut canvas = DisplayListBuilder::new();
        canvas.transform(&m);
        assert!(cache.draw_display_list(&list, &mut canvas, 1.0));
        let drawn = canvas.build_with_ids(&ids);
        let dst = drawn
            .ops()
            .iter()
            .find_map(|op| match op {
                laminar_core::display_list::DisplayOp::DrawImage { dst, .. } => Some(*dst),
                _ => None,
            })
            .unwrap();
        // Content spans x 0..58, y 0..8, drawn at the snapped (10, 21).
        assert_eq!(dst, Rect::new(10.0, 21.0, 68.0, 29.0));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn draw_miss_draws_nothing() {
        let mut cache = RasterCache::default();
        let mut canvas = DisplayListBuilder::new();
        let key = layer_key(3, &Transform3d::IDENTITY);
        assert!(!cache.draw(&key, &mut canvas, 1.0));
        assert_eq!(canvas.op_count(), 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn no_rasterizer_never_caches() {
        let ids = LayerIdAllocator::new();
        let list = complex_list(&ids);
        let mut cache = RasterCache::new(RasterCacheConfig::eager());
        cache.begin_frame();
        assert!(!cache.prepare_display_list(&list, &Transform3d::IDENTITY, false, false));
        assert_eq!(cache.metrics().entries, 1);
        assert_eq!(cache.metrics().images, 0);
    }
}
