// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Nanosecond
//! timestamps are printed in microseconds.

use std::io::Write;

use laminar_core::trace::{
    ClipReplayEvent, FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent,
    RasterCacheEvent, SubmitEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

fn us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[begin] frame={} view={} size={}x{} at {:.1}µs",
            e.frame_index,
            e.view.0,
            e.width,
            e.height,
            us(e.timestamp_ns),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            us(e.timestamp_ns),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            us(e.timestamp_ns),
        );
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        let accepted = if e.accepted { "ok" } else { "REJECTED" };
        let _ = writeln!(
            self.writer,
            "[submit] frame={} layers={} {accepted} at {:.1}µs",
            e.frame_index,
            e.presented_layers,
            us(e.submitted_at_ns),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let dropped = if s.dropped { "DROPPED" } else { "ok" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} views={} preroll={:.1}µs paint={:.1}µs \
             composite={:.1}µs submit={:.1}µs status={dropped}",
            s.frame_index,
            s.platform_views,
            us(s.preroll_ns),
            us(s.paint_ns),
            us(s.composite_ns),
            us(s.submit_ns),
        );
    }

    fn on_raster_cache(&mut self, e: &RasterCacheEvent) {
        let _ = writeln!(
            self.writer,
            "[cache] frame={} hits={} misses={} inserted={} evicted={} entries={}",
            e.frame_index, e.hits, e.misses, e.inserted, e.evicted, e.entries,
        );
    }

    fn on_clip_replay(&mut self, e: &ClipReplayEvent) {
        let _ = writeln!(
            self.writer,
            "[replay] frame={} depth={} clips={}",
            e.frame_index, e.subpass_depth, e.replayed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laminar_core::id::RenderViewId;
    use laminar_core::trace::PhaseKind;

    #[test]
    fn pretty_print_frame() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_begin(&FrameBeginEvent {
            frame_index: 3,
            view: RenderViewId(0),
            timestamp_ns: 2_500_000,
            width: 640,
            height: 480,
        });
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 3,
            phase: PhaseKind::Composite,
            timestamp_ns: 2_600_000,
        });
        sink.on_submit(&SubmitEvent {
            frame_index: 3,
            submitted_at_ns: 3_000_000,
            presented_layers: 2,
            accepted: false,
        });
        let output = String::from_utf8(sink.writer).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 3, "got: {output}");
        assert!(lines[0].contains("size=640x480"), "got: {output}");
        assert!(lines[0].contains("2500.0µs"), "got: {output}");
        assert!(lines[1].contains("composite"), "got: {output}");
        assert!(lines[2].contains("REJECTED"), "got: {output}");
    }

    #[test]
    fn pretty_print_dropped_summary() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_summary(&FrameSummary {
            frame_index: 1,
            view: RenderViewId(0),
            begin_ns: 0,
            preroll_ns: 1_500,
            paint_ns: 0,
            composite_ns: 0,
            submit_ns: 0,
            platform_views: 1,
            dropped: true,
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert!(output.contains("preroll=1.5µs"), "got: {output}");
        assert!(output.contains("DROPPED"), "got: {output}");
    }
}
