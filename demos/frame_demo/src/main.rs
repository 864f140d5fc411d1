// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated raster-thread frame loop with a moving platform view.
//!
//! Runs 60 frames of a small scene through [`LayerTree`], [`RasterCache`] and
//! [`CompositingViewEmbedder`], with dynamic thread merging enabled. A fake
//! backend replays each presented backing store through a [`PassCanvas`].
//! Events go to both a [`PrettyPrintSink`] and a [`RecorderSink`], and the
//! recording is exported as a Chrome trace.

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::{self, BufWriter};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use kurbo::{Point, Rect, Size};
use laminar_core::canvas::{Canvas, ImageHandle};
use laminar_core::display_list::{DisplayList, DisplayListBuilder};
use laminar_core::geometry::{Color, ImageFilter};
use laminar_core::id::{RenderViewId, ViewId};
use laminar_core::trace::{
    ClipReplayEvent, FrameBeginEvent, FrameSummary, FrameSummaryBuilder, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, RasterCacheEvent, SubmitEvent, TraceSink, Tracer,
};
use laminar_core::transform::Transform3d;
use laminar_debug::pretty::PrettyPrintSink;
use laminar_debug::recorder::RecorderSink;
use laminar_flow::layer::{
    BackdropFilterLayer, ClipBehavior, ClipLayer, ContainerLayer, DisplayListLayer,
    PlatformViewLayer,
};
use laminar_flow::{
    CompositingViewEmbedder, CompositorFrame, EmbedderConfig, ExternalViewEmbedder,
    FramebufferInfo, LayerTree, PostPrerollResult, PresentedLayer, RasterCache,
    RasterCacheConfig, RasterThreadMerger, Rasterizer, SurfaceFrame, SurfaceFrameInfo,
};
use laminar_render::{
    ClipShape, PassCanvas, PassCommand, RenderTargetAllocator, RenderTargetConfig,
};

const FRAME_COUNT: u64 = 60;
/// Scene frames after which the platform view is removed, letting the merge
/// lease run out.
const VIDEO_FRAMES: u64 = 40;
const VIEW: RenderViewId = RenderViewId(0);
const VIDEO: ViewId = ViewId(1);
const FRAME_SIZE: Size = Size::new(800.0, 600.0);

fn main() -> io::Result<()> {
    let clock = Clock::new();
    let mut sinks = Sinks {
        pretty: PrettyPrintSink::new(Box::new(io::stdout())),
        recorder: RecorderSink::new(),
    };

    let allocations = Rc::new(Cell::new(0_u32));
    let presented = Rc::new(RefCell::new(Vec::new()));
    let mut embedder = CompositingViewEmbedder::with_config(
        EmbedderConfig::thread_merging(),
        SimulatedAllocator {
            allocations: Rc::clone(&allocations),
        },
        {
            let presented = Rc::clone(&presented);
            Box::new(move |_view: RenderViewId, layers: &[PresentedLayer<u32>]| {
                presented.borrow_mut().extend_from_slice(layers);
                true
            })
        },
    );
    let mut cache = RasterCache::with_rasterizer(
        RasterCacheConfig::default(),
        Box::new(SimulatedRasterizer::default()),
    );
    let merger = RasterThreadMerger::new();
    let scene = Scene::new();

    {
        let mut tracer = Tracer::new(&mut sinks);
        let mut scene_frame = 0;
        for frame_index in 0..FRAME_COUNT {
            let begin = FrameBeginEvent {
                frame_index,
                view: VIEW,
                timestamp_ns: clock.now_ns(),
                width: 800,
                height: 600,
            };
            tracer.frame_begin(&begin);
            let mut summary = FrameSummaryBuilder::new(&begin);

            embedder.begin_frame(None, Some(&merger));
            embedder.prepare_view(VIEW, FRAME_SIZE, 1.0);
            cache.begin_frame();
            let mut tree = scene.tree(scene_frame);

            let start = phase_begin(&mut tracer, &clock, frame_index, PhaseKind::Preroll);
            {
                let mut frame = CompositorFrame::with_embedder(&mut embedder)
                    .with_raster_cache(&mut cache);
                tree.preroll(&mut frame);
            }
            let post_preroll = embedder.post_preroll_action(Some(&merger));
            let end = phase_end(&mut tracer, &clock, frame_index, PhaseKind::Preroll);
            summary.phase_begin(PhaseKind::Preroll, start);
            summary.phase_end(PhaseKind::Preroll, end);
            summary.set_platform_views(count(embedder.pending_platform_views().len()));

            let accepted = match post_preroll {
                PostPrerollResult::Success => {
                    let start = phase_begin(&mut tracer, &clock, frame_index, PhaseKind::Paint);
                    {
                        let mut frame = CompositorFrame::with_embedder(&mut embedder)
                            .with_raster_cache(&mut cache);
                        tree.paint(&mut frame);
                    }
                    let end = phase_end(&mut tracer, &clock, frame_index, PhaseKind::Paint);
                    summary.phase_begin(PhaseKind::Paint, start);
                    summary.phase_end(PhaseKind::Paint, end);

                    let accepted = submit(
                        &mut embedder,
                        &mut tracer,
                        &mut summary,
                        &clock,
                        frame_index,
                    );
                    tracer.submit(&SubmitEvent {
                        frame_index,
                        submitted_at_ns: clock.now_ns(),
                        presented_layers: count(presented.borrow().len()),
                        accepted,
                    });
                    for layer in presented.borrow_mut().drain(..) {
                        replay_backing_store(&mut tracer, frame_index, &layer);
                    }
                    scene_frame += 1;
                    accepted
                }
                PostPrerollResult::ResubmitFrame | PostPrerollResult::SkipAndRetryFrame => {
                    // The same scene frame runs again next iteration.
                    embedder.cancel_frame();
                    false
                }
            };

            cache.end_frame();
            tracer.raster_cache(&raster_cache_event(&cache, frame_index));
            embedder.end_frame(
                post_preroll == PostPrerollResult::ResubmitFrame,
                Some(&merger),
            );

            summary.set_dropped(!accepted);
            tracer.frame_summary(&summary.finish());
        }
    }

    embedder.collect_view(VIEW);
    embedder.teardown();

    let path = "trace.json";
    let mut writer = BufWriter::new(File::create(path)?);
    laminar_debug::chrome::export(sinks.recorder.as_bytes(), &mut writer)?;

    println!(
        "Wrote {path} ({FRAME_COUNT} frames, {} backing stores allocated, merged at exit: {})",
        allocations.get(),
        merger.is_merged()
    );
    Ok(())
}

/// Runs `submit_view`, splitting its time into composite and submit at the
/// point the surface frame starts encoding.
fn submit(
    embedder: &mut CompositingViewEmbedder<SimulatedAllocator>,
    tracer: &mut Tracer<'_>,
    summary: &mut FrameSummaryBuilder,
    clock: &Clock,
    frame_index: u64,
) -> bool {
    let encoded_at = Cell::new(None);
    let start = phase_begin(tracer, clock, frame_index, PhaseKind::Composite);
    let frame = SurfaceFrame::new(
        None,
        FRAME_SIZE,
        FramebufferInfo::default(),
        Some(Box::new(|_: &SurfaceFrameInfo, _: &mut dyn Canvas| {
            encoded_at.set(Some(clock.now_ns()));
            true
        })),
        Some(Box::new(|_: &SurfaceFrameInfo| true)),
    );
    let accepted = embedder.submit_view(VIEW, None, frame);
    let end = clock.now_ns();
    let split = encoded_at.get().unwrap_or(end);

    tracer.phase_end(&PhaseEndEvent {
        frame_index,
        phase: PhaseKind::Composite,
        timestamp_ns: split,
    });
    tracer.phase_begin(&PhaseBeginEvent {
        frame_index,
        phase: PhaseKind::Submit,
        timestamp_ns: split,
    });
    tracer.phase_end(&PhaseEndEvent {
        frame_index,
        phase: PhaseKind::Submit,
        timestamp_ns: end,
    });
    summary.phase_begin(PhaseKind::Composite, start);
    summary.phase_end(PhaseKind::Composite, split);
    summary.phase_begin(PhaseKind::Submit, split);
    summary.phase_end(PhaseKind::Submit, end);
    accepted
}

/// What a backend without framebuffer fetch does with a backing store: run
/// its content through a pass, and restart the pass with the clips replayed
/// if the content reads the backdrop.
fn replay_backing_store(tracer: &mut Tracer<'_>, frame_index: u64, layer: &PresentedLayer<u32>) {
    let PresentedLayer::BackingStore { content, size, .. } = layer else {
        return;
    };
    let mut pass = PassCanvas::new(size.to_rect());
    content.dispatch(&mut pass);
    let reads_backdrop = pass.commands().iter().any(|command| {
        matches!(
            command,
            PassCommand::BeginSubpass {
                backdrop: Some(_),
                ..
            }
        )
    });
    if !reads_backdrop {
        return;
    }
    _ = pass.restore_backdrop();
    let replayed = match pass.commands().first() {
        Some(PassCommand::BackdropRestore { replayed }) => *replayed,
        _ => 0,
    };
    tracer.clip_replay(&ClipReplayEvent {
        frame_index,
        subpass_depth: count(pass.clip_stack().subpass_depth()),
        replayed: count(replayed),
    });
}

fn raster_cache_event(cache: &RasterCache, frame_index: u64) -> RasterCacheEvent {
    let stats = cache.stats();
    RasterCacheEvent {
        frame_index,
        hits: stats.hits,
        misses: stats.misses,
        inserted: stats.inserted,
        evicted: stats.evicted,
        entries: count(cache.metrics().entries),
    }
}

fn phase_begin(tracer: &mut Tracer<'_>, clock: &Clock, frame_index: u64, phase: PhaseKind) -> u64 {
    let timestamp_ns = clock.now_ns();
    tracer.phase_begin(&PhaseBeginEvent {
        frame_index,
        phase,
        timestamp_ns,
    });
    timestamp_ns
}

fn phase_end(tracer: &mut Tracer<'_>, clock: &Clock, frame_index: u64, phase: PhaseKind) -> u64 {
    let timestamp_ns = clock.now_ns();
    tracer.phase_end(&PhaseEndEvent {
        frame_index,
        phase,
        timestamp_ns,
    });
    timestamp_ns
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Display lists shared across frames, so the raster cache sees the same
/// content every frame.
struct Scene {
    background: Arc<DisplayList>,
    badge: Arc<DisplayList>,
    frost: Arc<DisplayList>,
}

impl Scene {
    fn new() -> Self {
        let mut background = DisplayListBuilder::new();
        for row in 0..8_u8 {
            for col in 0..8_u8 {
                let (x, y) = (f64::from(col) * 100.0, f64::from(row) * 75.0);
                background.draw_rect(
                    Rect::new(x + 5.0, y + 5.0, x + 95.0, y + 70.0),
                    Color::from_rgba8(col * 30, row * 30, 160, 255),
                );
            }
        }
        let mut badge = DisplayListBuilder::new();
        badge.draw_rect(Rect::new(0.0, 0.0, 40.0, 40.0), Color::WHITE);
        let mut frost = DisplayListBuilder::new();
        frost.draw_rect(Rect::new(0.0, 500.0, 800.0, 600.0), Color::from_rgba8(255, 255, 255, 64));
        Self {
            background: background.build(),
            badge: badge.build(),
            frost: frost.build(),
        }
    }

    /// The tree for one scene frame: a static background, a video view
    /// sliding right with a badge drawn over it, and a frosted footer.
    fn tree(&self, scene_frame: u64) -> LayerTree {
        let mut root = ContainerLayer::new()
            .with_child(Box::new(DisplayListLayer::new(Point::ZERO, Arc::clone(&self.background))));
        if scene_frame < VIDEO_FRAMES {
            let x = 50.0 + (scene_frame % 20) as f64 * 20.0;
            root.add(Box::new(
                ClipLayer::new(
                    ClipShape::Rect(Rect::new(0.0, 0.0, 800.0, 480.0)),
                    ClipBehavior::HardEdge,
                )
                .with_child(Box::new(PlatformViewLayer::new(
                    Point::new(x, 200.0),
                    Size::new(200.0, 150.0),
                    VIDEO,
                )))
                .with_child(Box::new(DisplayListLayer::new(
                    Point::new(x + 150.0, 210.0),
                    Arc::clone(&self.badge),
                ))),
            ));
        }
        root.add(Box::new(
            ClipLayer::new(
                ClipShape::Rect(Rect::new(0.0, 500.0, 800.0, 600.0)),
                ClipBehavior::AntiAlias,
            )
            .with_child(Box::new(
                BackdropFilterLayer::new(ImageFilter::Blur {
                    sigma_x: 4.0,
                    sigma_y: 4.0,
                })
                .with_child(Box::new(DisplayListLayer::new(
                    Point::ZERO,
                    Arc::clone(&self.frost),
                ))),
            )),
        ));
        LayerTree::new(Box::new(root), FRAME_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Simulated backend
// ---------------------------------------------------------------------------

/// Hands out increasing target ids and counts allocations.
#[derive(Clone, Debug)]
struct SimulatedAllocator {
    allocations: Rc<Cell<u32>>,
}

impl RenderTargetAllocator for SimulatedAllocator {
    type Target = u32;

    fn allocate(&mut self, _config: &RenderTargetConfig, _label: &str) -> Option<u32> {
        let id = self.allocations.get() + 1;
        self.allocations.set(id);
        Some(id)
    }
}

#[derive(Debug, Default)]
struct SimulatedRasterizer {
    next_id: u64,
}

impl Rasterizer for SimulatedRasterizer {
    fn rasterize(
        &mut self,
        _list: &DisplayList,
        _matrix: &Transform3d,
        device_bounds: Rect,
    ) -> Option<ImageHandle> {
        self.next_id += 1;
        Some(ImageHandle {
            id: self.next_id,
            width: pixels(device_bounds.width()),
            height: pixels(device_bounds.height()),
        })
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "cached content is at most a few screens wide"
)]
fn pixels(extent: f64) -> u32 {
    extent.ceil().max(0.0) as u32
}

#[derive(Debug)]
struct Clock(Instant);

impl Clock {
    fn new() -> Self {
        Self(Instant::now())
    }

    fn now_ns(&self) -> u64 {
        u64::try_from(self.0.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Sends every event to both sinks.
#[derive(Debug)]
struct Sinks {
    pretty: PrettyPrintSink,
    recorder: RecorderSink,
}

impl TraceSink for Sinks {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.pretty.on_frame_begin(e);
        self.recorder.on_frame_begin(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.pretty.on_phase_begin(e);
        self.recorder.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.pretty.on_phase_end(e);
        self.recorder.on_phase_end(e);
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        self.pretty.on_submit(e);
        self.recorder.on_submit(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.pretty.on_frame_summary(s);
        self.recorder.on_frame_summary(s);
    }

    fn on_raster_cache(&mut self, e: &RasterCacheEvent) {
        self.pretty.on_raster_cache(e);
        self.recorder.on_raster_cache(e);
    }

    fn on_clip_replay(&mut self, e: &ClipReplayEvent) {
        self.pretty.on_clip_replay(e);
        self.recorder.on_clip_replay(e);
    }
}
