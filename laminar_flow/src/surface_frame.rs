// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A frame in flight towards an output surface.
//!
//! A [`SurfaceFrame`] moves through three states:
//!
//! ```text
//!   fresh ──encode()──► encoded ──submit()──► submitted
//!     └──────────────submit()─────────────────────┘
//! ```
//!
//! Each transition happens at most once. `submit()` on a fresh frame encodes
//! first, and a frame whose encode failed can never be submitted.

use std::fmt;
use std::sync::Arc;

use kurbo::{Rect, Size};
use laminar_core::canvas::Canvas;
use laminar_core::display_list::{DisplayList, DisplayListBuilder};

/// Per-frame hints passed to the submit callback.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SubmitInfo {
    /// Region of the frame that changed since the previous frame.
    pub frame_damage: Option<Rect>,
    /// Region of the buffer that must be redrawn.
    pub buffer_damage: Option<Rect>,
    /// Target presentation time in nanoseconds.
    pub presentation_time: Option<u64>,
    /// Whether this frame ends a logical frame across several views.
    pub frame_boundary: bool,
}

/// What the surface's framebuffer supports.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FramebufferInfo {
    /// The framebuffer can be read back, so backdrop filters work directly.
    pub supports_readback: bool,
    /// Only damaged regions need to be redrawn.
    pub supports_partial_repaint: bool,
    /// Damage already present in the buffer being drawn into.
    pub existing_damage: Option<Rect>,
}

/// The immutable part of a frame, visible to its callbacks.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceFrameInfo {
    /// Frame size in device pixels.
    pub size: Size,
    /// Framebuffer capabilities.
    pub framebuffer_info: FramebufferInfo,
    /// Submit hints, settable until the frame is submitted.
    pub submit_info: SubmitInfo,
}

/// Encodes the recorded frame into GPU work.
pub type EncodeCallback<'a> = Box<dyn FnMut(&SurfaceFrameInfo, &mut dyn Canvas) -> bool + 'a>;

/// Hands the encoded frame to the presentation layer.
pub type SubmitCallback<'a> = Box<dyn FnMut(&SurfaceFrameInfo) -> bool + 'a>;

/// The canvas a frame is drawn through.
pub enum FrameCanvas<'a> {
    /// Draws straight into a GPU surface owned by the caller.
    Gpu(&'a mut dyn Canvas),
    /// Records for later playback.
    Deferred(DisplayListBuilder),
}

impl fmt::Debug for FrameCanvas<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(_) => f.write_str("Gpu(..)"),
            Self::Deferred(builder) => f.debug_tuple("Deferred").field(builder).finish(),
        }
    }
}

impl FrameCanvas<'_> {
    fn as_canvas(&mut self) -> &mut dyn Canvas {
        match self {
            Self::Gpu(canvas) => &mut **canvas,
            Self::Deferred(builder) => builder,
        }
    }
}

/// One frame for one output surface.
pub struct SurfaceFrame<'a> {
    info: SurfaceFrameInfo,
    canvas: FrameCanvas<'a>,
    encode_callback: Option<EncodeCallback<'a>>,
    submit_callback: Option<SubmitCallback<'a>>,
    encoded: bool,
    submitted: bool,
}

impl fmt::Debug for SurfaceFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceFrame")
            .field("info", &self.info)
            .field("canvas", &self.canvas)
            .field("encoded", &self.encoded)
            .field("submitted", &self.submitted)
            .finish_non_exhaustive()
    }
}

impl<'a> SurfaceFrame<'a> {
    /// Creates a frame.
    ///
    /// With a `surface`, drawing goes straight to it. Without one, drawing is
    /// recorded into a display list culled to the frame rect.
    #[must_use]
    pub fn new(
        surface: Option<&'a mut dyn Canvas>,
        size: Size,
        framebuffer_info: FramebufferInfo,
        encode_callback: Option<EncodeCallback<'a>>,
        submit_callback: Option<SubmitCallback<'a>>,
    ) -> Self {
        let canvas = match surface {
            Some(surface) => FrameCanvas::Gpu(surface),
            None => FrameCanvas::Deferred(DisplayListBuilder::with_cull_rect(size.to_rect())),
        };
        Self {
            info: SurfaceFrameInfo {
                size,
                framebuffer_info,
                submit_info: SubmitInfo::default(),
            },
            canvas,
            encode_callback,
            submit_callback,
            encoded: false,
            submitted: false,
        }
    }

    /// The frame's immutable description.
    #[must_use]
    pub const fn info(&self) -> &SurfaceFrameInfo {
        &self.info
    }

    /// Frame size in device pixels.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.info.size
    }

    /// Framebuffer capabilities.
    #[must_use]
    pub const fn framebuffer_info(&self) -> &FramebufferInfo {
        &self.info.framebuffer_info
    }

    /// Current submit hints.
    #[must_use]
    pub const fn submit_info(&self) -> &SubmitInfo {
        &self.info.submit_info
    }

    /// Replaces the submit hints.
    pub fn set_submit_info(&mut self, submit_info: SubmitInfo) {
        self.info.submit_info = submit_info;
    }

    /// The canvas to draw the frame into.
    pub fn canvas(&mut self) -> &mut dyn Canvas {
        self.canvas.as_canvas()
    }

    /// Whether drawing is recorded rather than sent to a GPU surface.
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self.canvas, FrameCanvas::Deferred(_))
    }

    /// Whether [`encode`](Self::encode) has succeeded.
    #[must_use]
    pub const fn is_encoded(&self) -> bool {
        self.encoded
    }

    /// Whether [`submit`](Self::submit) has succeeded.
    #[must_use]
    pub const fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Finishes the deferred recording and starts a fresh one.
    ///
    /// Returns `None` for frames drawn into a GPU surface.
    pub fn build_display_list(&mut self) -> Option<Arc<DisplayList>> {
        match &mut self.canvas {
            FrameCanvas::Gpu(_) => None,
            FrameCanvas::Deferred(builder) => {
                let fresh = DisplayListBuilder::with_cull_rect(self.info.size.to_rect());
                Some(std::mem::replace(builder, fresh).build())
            }
        }
    }

    /// Encodes the frame.
    ///
    /// Returns `false` if the frame was already encoded, has no encode
    /// callback, or the callback fails. A failed encode is not retried.
    pub fn encode(&mut self) -> bool {
        if self.encoded {
            return false;
        }
        let Some(callback) = self.encode_callback.as_mut() else {
            return false;
        };
        // Cleared before the callback runs so a failure cannot be retried.
        let ok = callback(&self.info, self.canvas.as_canvas());
        self.encode_callback = None;
        self.encoded = ok;
        ok
    }

    /// Submits the frame, encoding it first if needed.
    ///
    /// Returns `false` if the frame was already submitted, encoding fails, or
    /// the submit callback fails. Never submits twice.
    pub fn submit(&mut self) -> bool {
        if self.submitted {
            return false;
        }
        if !self.encoded && !self.encode() {
            return false;
        }
        let Some(mut callback) = self.submit_callback.take() else {
            return false;
        };
        self.submitted = callback(&self.info);
        self.submitted
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use laminar_core::geometry::Color;

    use super::*;

    fn size() -> Size {
        Size::new(100.0, 50.0)
    }

    #[test]
    fn submit_twice_submits_once() {
        let submits = Cell::new(0);
        let mut frame = SurfaceFrame::new(
            None,
            size(),
            FramebufferInfo::default(),
            Some(Box::new(|_, _| true)),
            Some(Box::new(|_| {
                submits.set(submits.get() + 1);
                true
            })),
        );
        assert!(frame.submit());
        assert!(!frame.submit());
        assert!(frame.is_submitted());
        assert_eq!(submits.get(), 1);
    }

    #[test]
    fn encode_after_submit_fails() {
        let mut frame = SurfaceFrame::new(
            None,
            size(),
            FramebufferInfo::default(),
            Some(Box::new(|_, _| true)),
            Some(Box::new(|_| true)),
        );
        assert!(frame.submit());
        assert!(!frame.encode());
    }

    #[test]
    fn encode_is_at_most_once() {
        let encodes = Cell::new(0);
        let mut frame = SurfaceFrame::new(
            None,
            size(),
            FramebufferInfo::default(),
            Some(Box::new(|_, _| {
                encodes.set(encodes.get() + 1);
                true
            })),
            None,
        );
        assert!(frame.encode());
        assert!(!frame.encode());
        assert_eq!(encodes.get(), 1);
    }

    #[test]
    fn failed_encode_blocks_submit() {
        let submitted = Cell::new(false);
        let mut frame = SurfaceFrame::new(
            None,
            size(),
            FramebufferInfo::default(),
            Some(Box::new(|_, _| false)),
            Some(Box::new(|_| {
                submitted.set(true);
                true
            })),
        );
        assert!(!frame.submit());
        assert!(!frame.submit());
        assert!(!frame.is_encoded());
        assert!(!submitted.get());
    }

    #[test]
    fn missing_callbacks_fail() {
        let mut frame = SurfaceFrame::new(None, size(), FramebufferInfo::default(), None, None);
        assert!(!frame.encode());
        assert!(!frame.submit());
    }

    #[test]
    fn failed_submit_is_not_retried() {
        let calls = Cell::new(0);
        let mut frame = SurfaceFrame::new(
            None,
            size(),
            FramebufferInfo::default(),
            Some(Box::new(|_, _| true)),
            Some(Box::new(|_| {
                calls.set(calls.get() + 1);
                false
            })),
        );
        assert!(!frame.submit());
        assert!(!frame.submit());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn deferred_frame_builds_display_list() {
        let mut frame = SurfaceFrame::new(None, size(), FramebufferInfo::default(), None, None);
        assert!(frame.is_deferred());
        frame
            .canvas()
            .draw_rect(Rect::new(10.0, 10.0, 200.0, 20.0), Color::WHITE);
        let list = frame.build_display_list().expect("deferred frame");
        // Culled to the frame rect.
        assert_eq!(list.bounds(), Rect::new(10.0, 10.0, 100.0, 20.0));
        let empty = frame.build_display_list().expect("deferred frame");
        assert!(empty.is_empty());
    }

    #[test]
    fn gpu_frame_draws_into_surface() {
        let mut surface = DisplayListBuilder::new();
        {
            let mut frame = SurfaceFrame::new(
                Some(&mut surface),
                size(),
                FramebufferInfo::default(),
                Some(Box::new(|info, canvas| {
                    assert_eq!(info.size, Size::new(100.0, 50.0));
                    canvas.clear(Color::BLACK);
                    true
                })),
                Some(Box::new(|_| true)),
            );
            assert!(!frame.is_deferred());
            frame
                .canvas()
                .draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Color::WHITE);
            assert!(frame.build_display_list().is_none());
            assert!(frame.submit());
        }
        assert_eq!(surface.op_count(), 2);
    }

    #[test]
    fn submit_info_reaches_callback() {
        let seen = Cell::new(None);
        let mut frame = SurfaceFrame::new(
            None,
            size(),
            FramebufferInfo::default(),
            Some(Box::new(|_, _| true)),
            Some(Box::new(|info| {
                seen.set(info.submit_info.presentation_time);
                true
            })),
        );
        frame.set_submit_info(SubmitInfo {
            presentation_time: Some(16_000_000),
            frame_boundary: true,
            ..SubmitInfo::default()
        });
        assert!(frame.submit_info().frame_boundary);
        assert!(frame.submit());
        assert_eq!(seen.get(), Some(16_000_000));
    }
}
