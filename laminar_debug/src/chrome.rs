// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Each top-level view becomes its own process row. Rich events carry no
//! timestamp of their own and are placed at the most recent frame begin.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut pid: i64 = 0;
    let mut frame_ts: f64 = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameBegin(e) => {
                pid = e.view.0;
                frame_ts = ns_to_us(e.timestamp_ns);
                events.push(json!({
                    "ph": "i",
                    "name": "FrameBegin",
                    "cat": "Frame",
                    "ts": frame_ts,
                    "pid": pid,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": e.frame_index,
                        "width": e.width,
                        "height": e.height,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Frame",
                    "ts": ns_to_us(e.timestamp_ns),
                    "pid": pid,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Frame",
                    "ts": ns_to_us(e.timestamp_ns),
                    "pid": pid,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Submit(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Submit",
                    "cat": "Frame",
                    "ts": ns_to_us(e.submitted_at_ns),
                    "pid": pid,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "presented_layers": e.presented_layers,
                        "accepted": e.accepted,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": ns_to_us(s.begin_ns),
                    "pid": s.view.0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": s.frame_index,
                        "preroll_us": ns_to_us(s.preroll_ns),
                        "paint_us": ns_to_us(s.paint_ns),
                        "composite_us": ns_to_us(s.composite_ns),
                        "submit_us": ns_to_us(s.submit_ns),
                        "platform_views": s.platform_views,
                        "dropped": s.dropped,
                    }
                }));
            }
            RecordedEvent::RasterCache(e) => {
                events.push(json!({
                    "ph": "C",
                    "name": "RasterCache",
                    "cat": "Rich",
                    "ts": frame_ts,
                    "pid": pid,
                    "tid": 0,
                    "args": {
                        "hits": e.hits,
                        "misses": e.misses,
                        "entries": e.entries,
                    }
                }));
            }
            RecordedEvent::ClipReplay(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "ClipReplay",
                    "cat": "Rich",
                    "ts": frame_ts,
                    "pid": pid,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "subpass_depth": e.subpass_depth,
                        "replayed": e.replayed,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ns_to_us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use laminar_core::id::RenderViewId;
    use laminar_core::trace::{
        FrameBeginEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RasterCacheEvent, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&FrameBeginEvent {
            frame_index: 0,
            view: RenderViewId(2),
            timestamp_ns: 1_000_000,
            width: 100,
            height: 100,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Preroll,
            timestamp_ns: 1_000_000,
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PhaseKind::Preroll,
            timestamp_ns: 1_000_500,
        });
        rec.on_raster_cache(&RasterCacheEvent {
            frame_index: 0,
            hits: 1,
            ..RasterCacheEvent::default()
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "FrameBegin");
        assert_eq!(parsed[0]["ts"], 1000.0);

        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["name"], "preroll");
        // Phases land on the view's row.
        assert_eq!(parsed[1]["pid"], 2);

        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["ts"], 1000.5);

        assert_eq!(parsed[3]["ph"], "C");
        assert_eq!(parsed[3]["ts"], 1000.0);
        assert_eq!(parsed[3]["args"]["hits"], 1);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert!(parsed.is_empty());
    }
}
