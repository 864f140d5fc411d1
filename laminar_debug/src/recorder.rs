// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, one tag byte per event.
//! [`decode`] reads them back as an iterator of [`RecordedEvent`].

use laminar_core::id::RenderViewId;
use laminar_core::trace::{
    ClipReplayEvent, FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    RasterCacheEvent, SubmitEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_SUBMIT: u8 = 4;
const TAG_FRAME_SUMMARY: u8 = 5;
const TAG_RASTER_CACHE: u8 = 6;
const TAG_CLIP_REPLAY: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Preroll => 0,
            PhaseKind::Paint => 1,
            PhaseKind::Composite => 2,
            PhaseKind::Submit => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_i64(e.view.0);
        self.write_u64(e.timestamp_ns);
        self.write_u32(e.width);
        self.write_u32(e.height);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp_ns);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp_ns);
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        self.write_u8(TAG_SUBMIT);
        self.write_u64(e.frame_index);
        self.write_u64(e.submitted_at_ns);
        self.write_u32(e.presented_layers);
        self.write_bool(e.accepted);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_i64(s.view.0);
        self.write_u64(s.begin_ns);
        self.write_u64(s.preroll_ns);
        self.write_u64(s.paint_ns);
        self.write_u64(s.composite_ns);
        self.write_u64(s.submit_ns);
        self.write_u32(s.platform_views);
        self.write_bool(s.dropped);
    }

    fn on_raster_cache(&mut self, e: &RasterCacheEvent) {
        self.write_u8(TAG_RASTER_CACHE);
        self.write_u64(e.frame_index);
        self.write_u32(e.hits);
        self.write_u32(e.misses);
        self.write_u32(e.inserted);
        self.write_u32(e.evicted);
        self.write_u32(e.entries);
    }

    fn on_clip_replay(&mut self, e: &ClipReplayEvent) {
        self.write_u8(TAG_CLIP_REPLAY);
        self.write_u64(e.frame_index);
        self.write_u32(e.subpass_depth);
        self.write_u32(e.replayed);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`SubmitEvent`].
    Submit(SubmitEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
    /// A [`RasterCacheEvent`].
    RasterCache(RasterCacheEvent),
    /// A [`ClipReplayEvent`].
    ClipReplay(ClipReplayEvent),
}

impl RecordedEvent {
    /// The frame the event belongs to.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        match self {
            Self::FrameBegin(e) => e.frame_index,
            Self::PhaseBegin(e) => e.frame_index,
            Self::PhaseEnd(e) => e.frame_index,
            Self::Submit(e) => e.frame_index,
            Self::FrameSummary(s) => s.frame_index,
            Self::RasterCache(e) => e.frame_index,
            Self::ClipReplay(e) => e.frame_index,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_i64(&mut self) -> Option<i64> {
        self.take().map(i64::from_le_bytes)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Preroll,
            1 => PhaseKind::Paint,
            2 => PhaseKind::Composite,
            _ => PhaseKind::Submit,
        })
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            view: RenderViewId(self.read_i64()?),
            timestamp_ns: self.read_u64()?,
            width: self.read_u32()?,
            height: self.read_u32()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_submit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Submit(SubmitEvent {
            frame_index: self.read_u64()?,
            submitted_at_ns: self.read_u64()?,
            presented_layers: self.read_u32()?,
            accepted: self.read_bool()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            view: RenderViewId(self.read_i64()?),
            begin_ns: self.read_u64()?,
            preroll_ns: self.read_u64()?,
            paint_ns: self.read_u64()?,
            composite_ns: self.read_u64()?,
            submit_ns: self.read_u64()?,
            platform_views: self.read_u32()?,
            dropped: self.read_bool()?,
        }))
    }

    fn decode_raster_cache(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RasterCache(RasterCacheEvent {
            frame_index: self.read_u64()?,
            hits: self.read_u32()?,
            misses: self.read_u32()?,
            inserted: self.read_u32()?,
            evicted: self.read_u32()?,
            entries: self.read_u32()?,
        }))
    }

    fn decode_clip_replay(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ClipReplay(ClipReplayEvent {
            frame_index: self.read_u64()?,
            subpass_depth: self.read_u32()?,
            replayed: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_SUBMIT => self.decode_submit(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            TAG_RASTER_CACHE => self.decode_raster_cache(),
            TAG_CLIP_REPLAY => self.decode_clip_replay(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
