// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core data model for the laminar compositor.
//!
//! `laminar_core` holds the types every other laminar crate speaks: the 4×4
//! [`Transform3d`](transform::Transform3d), the [`MutatorStack`](mutator::MutatorStack)
//! captured while descending into platform views, recorded
//! [`DisplayList`](display_list::DisplayList)s and the [`Canvas`](canvas::Canvas)
//! interface they are recorded through, layer identity, and frame-loop
//! tracing.
//!
//! # Architecture
//!
//! One frame flows through the workspace like this:
//!
//! ```text
//!   scene (layers + display lists, built off the raster thread)
//!       │
//!       ▼
//!   preroll ──► MutatorStack ──► EmbeddedViewParams ──► view embedder
//!       │
//!       ▼
//!   paint ──► Canvas (root surface, per-view slices)
//!       │
//!       ▼
//!   composite ──► backing stores + platform views ──► submit
//! ```
//!
//! **[`transform`]**: Column-major 4×4 matrix with perspective-aware rect
//! mapping.
//!
//! **[`geometry`]**: Clip shapes, image filters, colors, and NaN-safe rect
//! helpers built on `kurbo`.
//!
//! **[`mutator`]**: Immutable clip/transform/opacity/filter operations and
//! the stack that holds them.
//!
//! **[`embedded_view`]**: Per-frame snapshot of a platform view's placement
//! and its device-space bounding rect.
//!
//! **[`id`]**: Lock-free layer id allocation and view ids.
//!
//! **[`canvas`]** / **[`display_list`]**: The drawing interface and its
//! recording implementation.
//!
//! **[`raster_cache_util`]**: Integral-translation snapping for cached
//! images.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates raster-cache
//!   and clip-replay events.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod canvas;
pub mod display_list;
pub mod embedded_view;
pub mod geometry;
pub mod id;
pub mod mutator;
pub mod raster_cache_util;
pub mod trace;
pub mod transform;
