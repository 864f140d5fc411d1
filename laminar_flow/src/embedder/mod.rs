// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interleaving platform-native views with engine-rendered content.
//!
//! An [`ExternalViewEmbedder`] sits between the layer tree and the output
//! surface. During preroll every platform view reports its placement; during
//! paint, content that must appear above a platform view is drawn into a
//! separate canvas for that view; at submit the embedder hands the platform
//! an ordered list of engine content and native views.
//!
//! Frame protocol:
//!
//! ```text
//! begin_frame ─► prepare_view ─► preroll_composite_embedded_view*
//!   ─► post_preroll_action ─┬─► (paint) composite_embedded_view* ─► submit_view ─► end_frame
//!                           └─► cancel_frame (resubmit / skip)
//! ```

mod compositing;
mod thread_merger;

use kurbo::Size;
use laminar_core::canvas::Canvas;
use laminar_core::embedded_view::EmbeddedViewParams;
use laminar_core::id::{RenderViewId, ViewId};

use crate::surface_frame::SurfaceFrame;

pub use compositing::{
    CompositingViewEmbedder, EmbedderConfig, PlatformViewMutation, PresentCallback,
    PresentedLayer,
};
pub use thread_merger::{RasterThreadMerger, RasterThreadStatus};

/// Opaque handle to the backend's GPU context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuContext(pub u64);

/// What the frame loop should do after preroll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PostPrerollResult {
    /// Continue to paint this frame.
    #[default]
    Success,
    /// Drop this frame and submit it again, typically on a merged thread.
    ResubmitFrame,
    /// Drop this frame and move on to the next one.
    SkipAndRetryFrame,
}

/// Platform-side compositor for embedded native views.
pub trait ExternalViewEmbedder {
    /// The canvas for engine content below every platform view, or `None`
    /// when no view has been prepared.
    fn root_canvas(&mut self) -> Option<&mut dyn Canvas>;

    /// Abandons the frame in progress.
    fn cancel_frame(&mut self);

    /// Starts a frame.
    fn begin_frame(&mut self, context: Option<GpuContext>, merger: Option<&RasterThreadMerger>);

    /// Starts compositing `view_id` at `frame_size` device pixels.
    fn prepare_view(&mut self, view_id: RenderViewId, frame_size: Size, device_pixel_ratio: f64);

    /// Records where platform view `view_id` sits this frame.
    fn preroll_composite_embedded_view(&mut self, view_id: ViewId, params: EmbeddedViewParams);

    /// Decides whether the prerolled frame can be painted.
    fn post_preroll_action(&mut self, merger: Option<&RasterThreadMerger>) -> PostPrerollResult {
        let _ = merger;
        PostPrerollResult::Success
    }

    /// The canvas for engine content drawn above platform view `view_id`.
    fn composite_embedded_view(&mut self, view_id: ViewId) -> Option<&mut dyn Canvas>;

    /// Presents everything composited for `view_id` and submits `frame`.
    ///
    /// Returns whether the frame was submitted.
    fn submit_view(
        &mut self,
        view_id: RenderViewId,
        context: Option<GpuContext>,
        mut frame: SurfaceFrame<'_>,
    ) -> bool {
        let _ = (view_id, context);
        frame.submit()
    }

    /// Ends the frame.
    fn end_frame(&mut self, should_resubmit_frame: bool, merger: Option<&RasterThreadMerger>) {
        let _ = (should_resubmit_frame, merger);
    }

    /// Whether the embedder wants the raster thread merged with the platform
    /// thread while platform views are on screen.
    fn supports_dynamic_thread_merging(&self) -> bool {
        false
    }

    /// Releases every resource. Safe to call more than once.
    fn teardown(&mut self) {}

    /// Releases resources held for a view that no longer exists.
    fn collect_view(&mut self, view_id: RenderViewId) {
        let _ = view_id;
    }
}
