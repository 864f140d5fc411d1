// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the compositor frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! frame-loop instrumentation calls at each stage. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] is a convenience helper that collects phase
//! timestamps during a frame and produces a [`FrameSummary`] at the end.
//!
//! Timestamps are plain monotonic nanoseconds; the caller picks the clock.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`RasterCacheEvent`] and
//!   [`ClipReplayEvent`] plus the corresponding `TraceSink` methods.

use crate::id::RenderViewId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the frame loop is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Layer tree preroll (bounds, raster-cache decisions, view params).
    Preroll,
    /// Layer tree paint into the root canvas and view slices.
    Paint,
    /// Building backing-store layers and interleaving platform views.
    Composite,
    /// Handing the frame to the surface and the platform.
    Submit,
}

impl PhaseKind {
    /// All phases in frame order.
    pub const ALL: [Self; 4] = [Self::Preroll, Self::Paint, Self::Composite, Self::Submit];

    /// Short lowercase name, used by exporters.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Preroll => "preroll",
            Self::Paint => "paint",
            Self::Composite => "composite",
            Self::Submit => "submit",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the raster thread starts a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Which top-level view the frame targets.
    pub view: RenderViewId,
    /// Start of the frame, in nanoseconds.
    pub timestamp_ns: u64,
    /// Frame width in device pixels.
    pub width: u32,
    /// Frame height in device pixels.
    pub height: u32,
}

/// Marks the beginning of a frame-loop phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Time at the start of the phase, in nanoseconds.
    pub timestamp_ns: u64,
}

/// Marks the end of a frame-loop phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Time at the end of the phase, in nanoseconds.
    pub timestamp_ns: u64,
}

/// Emitted when a frame is handed to the platform.
#[derive(Clone, Copy, Debug)]
pub struct SubmitEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Time of submission, in nanoseconds.
    pub submitted_at_ns: u64,
    /// Number of layers presented (backing stores plus platform views).
    pub presented_layers: u32,
    /// Whether the surface and the present callback both accepted the frame.
    pub accepted: bool,
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Which top-level view.
    pub view: RenderViewId,
    /// Start of the frame, in nanoseconds.
    pub begin_ns: u64,
    /// Preroll duration in nanoseconds (0 if not measured).
    pub preroll_ns: u64,
    /// Paint duration in nanoseconds (0 if not measured).
    pub paint_ns: u64,
    /// Composite duration in nanoseconds (0 if not measured).
    pub composite_ns: u64,
    /// Submit duration in nanoseconds (0 if not measured).
    pub submit_ns: u64,
    /// Number of platform views embedded in the frame.
    pub platform_views: u32,
    /// Whether the frame was dropped (cancelled or rejected on submit).
    pub dropped: bool,
}

/// Per-frame raster-cache statistics.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterCacheEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Draws served from a cached image.
    pub hits: u32,
    /// Cache candidates drawn directly.
    pub misses: u32,
    /// Images inserted this frame.
    pub inserted: u32,
    /// Entries evicted at the end of the frame.
    pub evicted: u32,
    /// Entries remaining after eviction.
    pub entries: u32,
}

/// Emitted when a pass re-issues its clip sequence after a backdrop restore.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipReplayEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Subpass depth of the pass being restored.
    pub subpass_depth: u32,
    /// Number of clips replayed.
    pub replayed: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a frame begins.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a frame-loop phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a frame-loop phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a frame is submitted.
    fn on_submit(&mut self, e: &SubmitEvent) {
        _ = e;
    }

    /// Called with a per-frame timing summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called with per-frame raster-cache statistics (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_raster_cache(&mut self, e: &RasterCacheEvent) {
        _ = e;
    }

    /// Called when a clip sequence is replayed (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_clip_replay(&mut self, e: &ClipReplayEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SubmitEvent`].
    #[inline]
    pub fn submit(&mut self, e: &SubmitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_submit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits raster-cache statistics (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn raster_cache(&mut self, e: &RasterCacheEvent) {
        if let Some(s) = &mut self.sink {
            s.on_raster_cache(e);
        }
    }

    /// Emits a clip replay (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn clip_replay(&mut self, e: &ClipReplayEvent) {
        if let Some(s) = &mut self.sink {
            s.on_clip_replay(e);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    begin: FrameBeginEvent,
    phase_starts: [Option<u64>; 4],
    phase_ends: [Option<u64>; 4],
    platform_views: u32,
    dropped: bool,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given frame.
    #[must_use]
    pub fn new(begin: &FrameBeginEvent) -> Self {
        Self {
            begin: *begin,
            phase_starts: [None; 4],
            phase_ends: [None; 4],
            platform_views: 0,
            dropped: false,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, timestamp_ns: u64) {
        self.phase_starts[phase_index(phase)] = Some(timestamp_ns);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, timestamp_ns: u64) {
        self.phase_ends[phase_index(phase)] = Some(timestamp_ns);
    }

    /// Sets the number of platform views embedded in the frame.
    pub fn set_platform_views(&mut self, count: u32) {
        self.platform_views = count;
    }

    /// Sets whether the frame was dropped.
    pub fn set_dropped(&mut self, dropped: bool) {
        self.dropped = dropped;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.begin.frame_index,
            view: self.begin.view,
            begin_ns: self.begin.timestamp_ns,
            preroll_ns: self.phase_duration(PhaseKind::Preroll),
            paint_ns: self.phase_duration(PhaseKind::Paint),
            composite_ns: self.phase_duration(PhaseKind::Composite),
            submit_ns: self.phase_duration(PhaseKind::Submit),
            platform_views: self.platform_views,
            dropped: self.dropped,
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_sub(start),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Preroll => 0,
        PhaseKind::Paint => 1,
        PhaseKind::Composite => 2,
        PhaseKind::Submit => 3,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
