// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recorded engine content for one platform-view slice.

use std::sync::Arc;

use kurbo::Rect;
use laminar_core::canvas::Canvas;
use laminar_core::display_list::{DisplayList, DisplayListBuilder};

/// Engine content drawn above one platform view (or at the root).
///
/// The slice records until [`end_recording`](Self::end_recording); after
/// that it can be replayed any number of times.
#[derive(Debug)]
pub struct DisplayListEmbedderViewSlice {
    builder: Option<DisplayListBuilder>,
    display_list: Option<Arc<DisplayList>>,
}

impl DisplayListEmbedderViewSlice {
    /// Creates a slice whose recording is culled to `view_bounds`.
    #[must_use]
    pub fn new(view_bounds: Rect) -> Self {
        Self {
            builder: Some(DisplayListBuilder::with_cull_rect(view_bounds)),
            display_list: None,
        }
    }

    /// The recording canvas, or `None` once recording has ended.
    pub fn canvas(&mut self) -> Option<&mut dyn Canvas> {
        match &mut self.builder {
            Some(builder) => Some(builder),
            None => None,
        }
    }

    /// Finishes recording. Later calls do nothing.
    pub fn end_recording(&mut self) {
        if let Some(builder) = self.builder.take() {
            self.display_list = Some(builder.build());
        }
    }

    /// Whether [`end_recording`](Self::end_recording) has been called.
    #[must_use]
    pub const fn recording_ended(&self) -> bool {
        self.display_list.is_some()
    }

    /// The finished recording.
    #[must_use]
    pub fn display_list(&self) -> Option<&Arc<DisplayList>> {
        self.display_list.as_ref()
    }

    /// Device rects covered by the recorded content.
    ///
    /// Empty until recording has ended.
    #[must_use]
    pub fn region(&self) -> &[Rect] {
        match &self.display_list {
            Some(list) => list.rects(),
            None => &[],
        }
    }

    /// Whether the finished recording draws anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.display_list.as_ref().is_none_or(|list| list.is_empty())
    }

    /// Replays the recording into `canvas`.
    ///
    /// # Panics
    ///
    /// Panics if recording has not ended.
    pub fn render_into(&self, canvas: &mut dyn Canvas) {
        let list = self
            .display_list
            .as_ref()
            .unwrap_or_else(|| panic!("render_into called before end_recording"));
        list.dispatch(canvas);
    }
}

#[cfg(test)]
mod tests {
    use laminar_core::geometry::Color;

    use super::*;

    #[test]
    fn records_until_ended() {
        let mut slice = DisplayListEmbedderViewSlice::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(!slice.recording_ended());
        assert!(slice.region().is_empty());
        slice
            .canvas()
            .expect("recording")
            .draw_rect(Rect::new(10.0, 10.0, 20.0, 20.0), Color::WHITE);
        slice.end_recording();
        assert!(slice.recording_ended());
        assert!(slice.canvas().is_none());
        assert_eq!(slice.region(), &[Rect::new(10.0, 10.0, 20.0, 20.0)]);
        assert!(!slice.is_empty());
    }

    #[test]
    fn region_is_culled_to_view_bounds() {
        let mut slice = DisplayListEmbedderViewSlice::new(Rect::new(0.0, 0.0, 50.0, 50.0));
        if let Some(canvas) = slice.canvas() {
            canvas.draw_rect(Rect::new(40.0, 40.0, 80.0, 80.0), Color::WHITE);
            canvas.draw_rect(Rect::new(60.0, 60.0, 80.0, 80.0), Color::WHITE);
        }
        slice.end_recording();
        assert_eq!(slice.region(), &[Rect::new(40.0, 40.0, 50.0, 50.0)]);
    }

    #[test]
    fn end_recording_is_idempotent() {
        let mut slice = DisplayListEmbedderViewSlice::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        slice.end_recording();
        let first = slice.display_list().map(|l| l.id());
        slice.end_recording();
        assert_eq!(slice.display_list().map(|l| l.id()), first);
        assert!(slice.is_empty());
    }

    #[test]
    fn render_into_replays_ops() {
        let mut slice = DisplayListEmbedderViewSlice::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        if let Some(canvas) = slice.canvas() {
            canvas.save();
            canvas.translate(1.0, 1.0);
            canvas.draw_rect(Rect::new(0.0, 0.0, 2.0, 2.0), Color::BLACK);
            canvas.restore();
        }
        slice.end_recording();
        let mut target = DisplayListBuilder::new();
        slice.render_into(&mut target);
        assert_eq!(target.op_count(), 4);
    }

    #[test]
    #[should_panic(expected = "render_into called before end_recording")]
    fn render_before_end_panics() {
        let slice = DisplayListEmbedderViewSlice::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut target = DisplayListBuilder::new();
        slice.render_into(&mut target);
    }
}
