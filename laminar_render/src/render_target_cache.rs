// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-scoped reuse of offscreen render targets.

use core::fmt;

/// Pixel format of a render target's color attachment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit RGBA, unorm.
    #[default]
    Rgba8Unorm,
    /// 8-bit BGRA, unorm.
    Bgra8Unorm,
    /// 16-bit float RGBA.
    Rgba16Float,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgba8Unorm | Self::Bgra8Unorm => 4,
            Self::Rgba16Float => 8,
        }
    }
}

/// Structural description of a render target.
///
/// Two requests can share a cached target only if their configs are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Color format.
    pub format: PixelFormat,
    /// MSAA sample count; 1 when multisampling is off.
    pub sample_count: u32,
    /// Mip levels of the color attachment.
    pub mip_count: u32,
    /// Whether a depth/stencil attachment is present.
    pub has_depth_stencil: bool,
}

impl RenderTargetConfig {
    /// A single-sampled target with a stencil attachment.
    #[must_use]
    pub const fn offscreen(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            sample_count: 1,
            mip_count: 1,
            has_depth_stencil: true,
        }
    }

    /// A multisampled target with a stencil attachment.
    #[must_use]
    pub const fn offscreen_msaa(
        width: u32,
        height: u32,
        format: PixelFormat,
        sample_count: u32,
    ) -> Self {
        Self {
            sample_count,
            ..Self::offscreen(width, height, format)
        }
    }

    /// Estimated size of the color attachment in bytes.
    #[must_use]
    pub const fn byte_size(&self) -> u64 {
        self.width as u64
            * self.height as u64
            * self.format.bytes_per_pixel() as u64
            * self.sample_count as u64
    }
}

/// Backend that actually creates render targets.
pub trait RenderTargetAllocator {
    /// Backend render-target handle.
    type Target: Clone;

    /// Allocates a target matching `config`, or `None` when the backend is
    /// out of memory or cannot satisfy the config.
    fn allocate(&mut self, config: &RenderTargetConfig, label: &str) -> Option<Self::Target>;
}

/// Configuration for [`RenderTargetCache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTargetCacheConfig {
    /// Frames an unused target is retained before it is evicted.
    pub keep_alive_frames: u32,
}

impl RenderTargetCacheConfig {
    /// The default: three frames.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keep_alive_frames: 3,
        }
    }

    /// Evicts a target at the end of the first frame it goes unused.
    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            keep_alive_frames: 1,
        }
    }
}

impl Default for RenderTargetCacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct CacheEntry<T> {
    used_this_frame: bool,
    keep_alive_frame_count: u32,
    config: RenderTargetConfig,
    render_target: T,
}

/// Reuses render targets across frames.
///
/// A request returns a cached target with an equal config that has not been
/// handed out yet this frame, or allocates and caches a new one. [`end`]
/// counts down the keep-alive of every target that went unused during the
/// frame and evicts those that reach zero.
///
/// [`end`]: Self::end
pub struct RenderTargetCache<A: RenderTargetAllocator> {
    allocator: A,
    config: RenderTargetCacheConfig,
    entries: Vec<CacheEntry<A::Target>>,
    cache_disabled_count: u32,
}

impl<A: RenderTargetAllocator> fmt::Debug for RenderTargetCache<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTargetCache")
            .field("config", &self.config)
            .field("cached", &self.entries.len())
            .field("cache_disabled_count", &self.cache_disabled_count)
            .finish_non_exhaustive()
    }
}

impl<A: RenderTargetAllocator> RenderTargetCache<A> {
    /// Creates a cache with the default keep-alive.
    #[must_use]
    pub fn new(allocator: A) -> Self {
        Self::with_config(allocator, RenderTargetCacheConfig::default())
    }

    /// Creates a cache with an explicit configuration.
    #[must_use]
    pub fn with_config(allocator: A, config: RenderTargetCacheConfig) -> Self {
        Self {
            allocator,
            config,
            entries: Vec::new(),
            cache_disabled_count: 0,
        }
    }

    /// Sets the keep-alive horizon.
    #[must_use]
    pub fn with_keep_alive(mut self, frames: u32) -> Self {
        self.config.keep_alive_frames = frames;
        self
    }

    /// The backend allocator.
    #[must_use]
    pub const fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Marks the start of a frame.
    pub fn start(&mut self) {
        for entry in &mut self.entries {
            entry.used_this_frame = false;
        }
    }

    /// Marks the end of a frame, evicting targets whose keep-alive ran out.
    pub fn end(&mut self) {
        self.entries.retain_mut(|entry| {
            if entry.used_this_frame {
                entry.used_this_frame = false;
                return true;
            }
            entry.keep_alive_frame_count = entry.keep_alive_frame_count.saturating_sub(1);
            entry.keep_alive_frame_count > 0
        });
    }

    /// Stops reusing and caching targets until a matching
    /// [`enable_cache`](Self::enable_cache). Calls nest.
    pub fn disable_cache(&mut self) {
        self.cache_disabled_count += 1;
    }

    /// Undoes one [`disable_cache`](Self::disable_cache).
    ///
    /// # Panics
    ///
    /// Panics if the cache is not disabled.
    pub fn enable_cache(&mut self) {
        assert!(
            self.cache_disabled_count > 0,
            "enable_cache without a matching disable_cache"
        );
        self.cache_disabled_count -= 1;
    }

    /// Whether requests currently go through the cache.
    #[must_use]
    pub const fn cache_enabled(&self) -> bool {
        self.cache_disabled_count == 0
    }

    /// Number of cached targets.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.entries.len()
    }

    /// Estimated color-attachment bytes held by the cache.
    #[must_use]
    pub fn cached_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.config.byte_size()).sum()
    }

    /// Requests a single-sampled offscreen target.
    pub fn create_offscreen(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        label: &str,
    ) -> Option<A::Target> {
        self.create(RenderTargetConfig::offscreen(width, height, format), label)
    }

    /// Requests a multisampled offscreen target.
    pub fn create_offscreen_msaa(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        sample_count: u32,
        label: &str,
    ) -> Option<A::Target> {
        self.create(
            RenderTargetConfig::offscreen_msaa(width, height, format, sample_count),
            label,
        )
    }

    /// Requests a target matching `config`.
    ///
    /// Returns `None` if the allocator fails; the failure is not retried.
    pub fn create(&mut self, config: RenderTargetConfig, label: &str) -> Option<A::Target> {
        if !self.cache_enabled() {
            return self.allocate(&config, label);
        }

        let keep_alive = self.config.keep_alive_frames;
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| !e.used_this_frame && e.config == config)
        {
            entry.used_this_frame = true;
            entry.keep_alive_frame_count = keep_alive;
            return Some(entry.render_target.clone());
        }

        let render_target = self.allocate(&config, label)?;
        self.entries.push(CacheEntry {
            used_this_frame: true,
            keep_alive_frame_count: keep_alive,
            config,
            render_target: render_target.clone(),
        });
        Some(render_target)
    }

    fn allocate(&mut self, config: &RenderTargetConfig, label: &str) -> Option<A::Target> {
        let target = self.allocator.allocate(config, label);
        if target.is_none() {
            log::warn!(
                "render target allocation failed for {label:?} ({}x{}, {:?}, {} samples)",
                config.width,
                config.height,
                config.format,
                config.sample_count
            );
        }
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out sequential ids and remembers every request.
    #[derive(Debug, Default)]
    struct RecordingAllocator {
        next: u32,
        requests: Vec<RenderTargetConfig>,
        fail: bool,
    }

    impl RenderTargetAllocator for RecordingAllocator {
        type Target = u32;

        fn allocate(&mut self, config: &RenderTargetConfig, _label: &str) -> Option<u32> {
            self.requests.push(*config);
            if self.fail {
                return None;
            }
            self.next += 1;
            Some(self.next)
        }
    }

    fn frame<A: RenderTargetAllocator>(
        cache: &mut RenderTargetCache<A>,
        f: impl FnOnce(&mut RenderTargetCache<A>),
    ) {
        cache.start();
        f(cache);
        cache.end();
    }

    #[test]
    fn reuses_target_in_the_next_frame() {
        let mut cache = RenderTargetCache::new(RecordingAllocator::default());
        let mut first = None;
        let mut second = None;
        frame(&mut cache, |c| {
            first = c.create_offscreen(64, 64, PixelFormat::Rgba8Unorm, "a");
        });
        frame(&mut cache, |c| {
            second = c.create_offscreen(64, 64, PixelFormat::Rgba8Unorm, "a");
        });
        assert_eq!(first, Some(1));
        assert_eq!(second, first);
        assert_eq!(cache.allocator().requests.len(), 1);
    }

    #[test]
    fn same_frame_requests_get_distinct_targets() {
        let mut cache = RenderTargetCache::new(RecordingAllocator::default());
        cache.start();
        let a = cache.create_offscreen(32, 32, PixelFormat::Rgba8Unorm, "a");
        let b = cache.create_offscreen(32, 32, PixelFormat::Rgba8Unorm, "b");
        cache.end();
        assert_ne!(a, b);
        assert_eq!(cache.cached_count(), 2);

        // Both are reused next frame.
        cache.start();
        let c = cache.create_offscreen(32, 32, PixelFormat::Rgba8Unorm, "c");
        let d = cache.create_offscreen(32, 32, PixelFormat::Rgba8Unorm, "d");
        cache.end();
        assert_eq!(c, a);
        assert_eq!(d, b);
        assert_eq!(cache.allocator().requests.len(), 2);
    }

    #[test]
    fn different_configs_do_not_share() {
        let mut cache = RenderTargetCache::new(RecordingAllocator::default());
        frame(&mut cache, |c| {
            c.create_offscreen(32, 32, PixelFormat::Rgba8Unorm, "a");
        });
        frame(&mut cache, |c| {
            let msaa = c.create_offscreen_msaa(32, 32, PixelFormat::Rgba8Unorm, 4, "a");
            assert_eq!(msaa, Some(2));
        });
        assert_eq!(cache.cached_count(), 2);
    }

    #[test]
    fn evicts_after_keep_alive_frames() {
        let mut cache = RenderTargetCache::new(RecordingAllocator::default()).with_keep_alive(3);
        frame(&mut cache, |c| {
            c.create_offscreen(16, 16, PixelFormat::Rgba8Unorm, "a");
        });
        frame(&mut cache, |_| {});
        frame(&mut cache, |_| {});
        assert_eq!(cache.cached_count(), 1);
        frame(&mut cache, |_| {});
        assert_eq!(cache.cached_count(), 0);

        let mut again = None;
        frame(&mut cache, |c| {
            again = c.create_offscreen(16, 16, PixelFormat::Rgba8Unorm, "a");
        });
        assert_eq!(again, Some(2));
    }

    #[test]
    fn use_resets_keep_alive() {
        let mut cache = RenderTargetCache::new(RecordingAllocator::default()).with_keep_alive(2);
        frame(&mut cache, |c| {
            c.create_offscreen(16, 16, PixelFormat::Rgba8Unorm, "a");
        });
        frame(&mut cache, |_| {});
        frame(&mut cache, |c| {
            assert_eq!(c.create_offscreen(16, 16, PixelFormat::Rgba8Unorm, "a"), Some(1));
        });
        frame(&mut cache, |_| {});
        assert_eq!(cache.cached_count(), 1);
        frame(&mut cache, |_| {});
        assert_eq!(cache.cached_count(), 0);
    }

    #[test]
    fn disabled_cache_always_allocates() {
        let mut cache = RenderTargetCache::new(RecordingAllocator::default());
        cache.disable_cache();
        cache.disable_cache();
        frame(&mut cache, |c| {
            c.create_offscreen(8, 8, PixelFormat::Rgba8Unorm, "a");
        });
        cache.enable_cache();
        assert!(!cache.cache_enabled());
        frame(&mut cache, |c| {
            c.create_offscreen(8, 8, PixelFormat::Rgba8Unorm, "a");
        });
        assert_eq!(cache.cached_count(), 0);
        assert_eq!(cache.allocator().requests.len(), 2);

        cache.enable_cache();
        assert!(cache.cache_enabled());
        frame(&mut cache, |c| {
            c.create_offscreen(8, 8, PixelFormat::Rgba8Unorm, "a");
        });
        assert_eq!(cache.cached_count(), 1);
    }

    #[test]
    #[should_panic(expected = "enable_cache without a matching disable_cache")]
    fn unbalanced_enable_panics() {
        RenderTargetCache::new(RecordingAllocator::default()).enable_cache();
    }

    #[test]
    fn allocation_failure_is_not_cached() {
        let allocator = RecordingAllocator {
            fail: true,
            ..RecordingAllocator::default()
        };
        let mut cache = RenderTargetCache::new(allocator);
        cache.start();
        assert!(
            cache
                .create_offscreen(8, 8, PixelFormat::Rgba8Unorm, "a")
                .is_none()
        );
        cache.end();
        assert_eq!(cache.cached_count(), 0);
        assert_eq!(cache.allocator().requests.len(), 1);
    }

    #[test]
    fn cached_bytes_counts_samples() {
        let mut cache = RenderTargetCache::new(RecordingAllocator::default());
        frame(&mut cache, |c| {
            c.create_offscreen_msaa(10, 10, PixelFormat::Rgba16Float, 4, "a");
        });
        assert_eq!(cache.cached_bytes(), 10 * 10 * 8 * 4);
    }
}
