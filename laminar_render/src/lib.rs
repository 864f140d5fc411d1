// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-pass bookkeeping for laminar.
//!
//! This crate sits between the compositor and a GPU backend. It never issues
//! GPU work itself; it tracks the state a backend needs to issue it correctly
//! and cheaply:
//!
//! - [`EntityPassClipStack`]: clip coverage across nested subpasses, with a
//!   replay list for backdrop restores
//! - [`PassCanvas`]: a recording [`Canvas`](laminar_core::canvas::Canvas)
//!   that culls clipped-out draws and can restart a pass with its clips
//!   replayed
//! - [`RenderTargetCache`]: frame-scoped reuse of offscreen targets over a
//!   backend [`RenderTargetAllocator`]

#![cfg_attr(docsrs, feature(doc_cfg))]

mod clip_stack;
mod pass_canvas;
mod render_target_cache;

pub use clip_stack::{
    ClipContents, ClipCoverage, ClipCoverageLayer, ClipShape, ClipStateResult,
    EntityPassClipStack, ReplayResult, SubpassState,
};
pub use pass_canvas::{PassCanvas, PassCommand};
pub use render_target_cache::{
    PixelFormat, RenderTargetAllocator, RenderTargetCache, RenderTargetCacheConfig,
    RenderTargetConfig,
};
