// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer tree, raster cache, and platform-view compositing for laminar.
//!
//! This crate runs on the raster thread. Given a [`LayerTree`] for a frame,
//! it prerolls the tree, paints it into the root canvas and per-platform-view
//! slices, and hands the result to an [`ExternalViewEmbedder`] that decides
//! how engine content and native views are layered on screen.
//!
//! - [`layer`]: the [`Layer`] trait, the stock layers, and the preroll and
//!   paint contexts
//! - [`RasterCache`]: frame-scoped cache of rasterized display lists
//! - [`SurfaceFrame`]: one frame's canvas with an at-most-once encode and
//!   submit protocol
//! - [`DisplayListEmbedderViewSlice`]: content recorded above one platform
//!   view
//! - [`ExternalViewEmbedder`] / [`CompositingViewEmbedder`]: the embedding
//!   protocol and a backing-store implementation of it
//! - [`RasterThreadMerger`]: lease-based, non-blocking thread merging
//!
//! A frame, without error handling:
//!
//! ```text
//! embedder.begin_frame(..); embedder.prepare_view(..);
//! cache.begin_frame();
//! tree.preroll(&mut frame);
//! match embedder.post_preroll_action(..) {
//!     Success => { tree.paint(&mut frame); embedder.submit_view(..); }
//!     _ => embedder.cancel_frame(),
//! }
//! cache.end_frame(); embedder.end_frame(..);
//! ```
//!
//! # Crate features
//!
//! - `trace` / `trace-rich` (disabled by default): forwarded to
//!   `laminar_core` so a frame loop built on this crate can emit trace events.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod embedder;
pub mod layer;
mod raster_cache;
mod surface_frame;
mod view_slice;

pub use embedder::{
    CompositingViewEmbedder, EmbedderConfig, ExternalViewEmbedder, GpuContext,
    PlatformViewMutation, PostPrerollResult, PresentCallback, PresentedLayer, RasterThreadMerger,
    RasterThreadStatus,
};
pub use layer::{CompositorFrame, Layer, LayerTree};
pub use raster_cache::{
    RasterCache, RasterCacheConfig, RasterCacheKey, RasterCacheKeyId, RasterCacheMetrics,
    RasterCacheStats, RasterImage, Rasterizer,
};
pub use surface_frame::{
    EncodeCallback, FrameCanvas, FramebufferInfo, SubmitCallback, SubmitInfo, SurfaceFrame,
    SurfaceFrameInfo,
};
pub use view_slice::DisplayListEmbedderViewSlice;
