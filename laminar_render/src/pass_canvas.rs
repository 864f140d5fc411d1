// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A recording canvas that tracks clip coverage through an
//! [`EntityPassClipStack`].

use std::sync::Arc;

use kurbo::{BezPath, Point, Rect, RoundedRect};
use laminar_core::canvas::{Canvas, ClipOp, ImageHandle};
use laminar_core::display_list::{DisplayList, DisplayOp};
use laminar_core::geometry::{self, Color, ImageFilter};
use laminar_core::transform::Transform3d;

use crate::clip_stack::{ClipContents, ClipShape, EntityPassClipStack};

/// One command recorded into a pass.
#[derive(Clone, Debug, PartialEq)]
pub enum PassCommand {
    /// Apply a clip.
    Clip {
        /// The clip.
        contents: ClipContents,
        /// Pass-local transform of the clip.
        transform: Transform3d,
        /// Clip depth assigned by the canvas.
        clip_depth: u32,
    },
    /// Clip state was restored; coverage is pass-local.
    RestoreClip {
        /// Coverage after the restore.
        coverage: Option<Rect>,
    },
    /// A draw that survived culling.
    Draw {
        /// The draw op.
        op: DisplayOp,
        /// Pass-local transform of the draw.
        transform: Transform3d,
    },
    /// Start of an offscreen subpass.
    BeginSubpass {
        /// Subpass coverage in global space.
        coverage: Option<Rect>,
        /// Group opacity.
        opacity: f32,
        /// Backdrop filter.
        backdrop: Option<ImageFilter>,
    },
    /// End of the innermost subpass.
    EndSubpass,
    /// The pass was restarted on a fresh target; the following clips replay
    /// the clip state in effect before the restart.
    BackdropRestore {
        /// Number of clip commands that follow.
        replayed: usize,
    },
}

#[derive(Clone, Copy, Debug)]
struct PassState {
    transform: Transform3d,
    clip_height: u32,
    is_subpass: bool,
    pass_position: Point,
}

/// A [`Canvas`] that records [`PassCommand`]s and routes every clip through
/// an [`EntityPassClipStack`].
///
/// Draws whose bounds fall outside the current clip coverage are dropped
/// rather than recorded. `save_layer` enters a subpass positioned at its
/// coverage origin.
#[derive(Debug)]
pub struct PassCanvas {
    clip_stack: EntityPassClipStack,
    states: Vec<PassState>,
    commands: Vec<PassCommand>,
    next_clip_depth: u32,
    culled_draws: u32,
}

impl PassCanvas {
    /// Creates a canvas for a root pass covering `coverage`.
    #[must_use]
    pub fn new(coverage: Rect) -> Self {
        Self::with_clip_stack(EntityPassClipStack::new(coverage))
    }

    /// Creates a canvas around an existing clip stack.
    #[must_use]
    pub fn with_clip_stack(clip_stack: EntityPassClipStack) -> Self {
        Self {
            clip_stack,
            states: vec![PassState {
                transform: Transform3d::IDENTITY,
                clip_height: 0,
                is_subpass: false,
                pass_position: Point::ZERO,
            }],
            commands: Vec::new(),
            next_clip_depth: 0,
            culled_draws: 0,
        }
    }

    /// The clip stack this canvas records into.
    #[must_use]
    pub const fn clip_stack(&self) -> &EntityPassClipStack {
        &self.clip_stack
    }

    /// Commands recorded since construction or the last backdrop restore.
    #[must_use]
    pub fn commands(&self) -> &[PassCommand] {
        &self.commands
    }

    /// Number of draws dropped because they were clipped out.
    #[must_use]
    pub const fn culled_draws(&self) -> u32 {
        self.culled_draws
    }

    /// Consumes the canvas and returns its commands.
    #[must_use]
    pub fn finish(self) -> Vec<PassCommand> {
        self.commands
    }

    /// Restarts the current pass on a fresh command list.
    ///
    /// The new list begins with a [`PassCommand::BackdropRestore`] marker
    /// followed by every clip still in effect, in recording order, so that a
    /// backend executing it ends up with the same clip state. Returns the
    /// commands recorded before the restart.
    pub fn restore_backdrop(&mut self) -> Vec<PassCommand> {
        let replay = self.clip_stack.get_replay_entities();
        let mut fresh = Vec::with_capacity(replay.len() + 1);
        fresh.push(PassCommand::BackdropRestore {
            replayed: replay.len(),
        });
        fresh.extend(replay.iter().map(|r| PassCommand::Clip {
            contents: r.clip_contents.clone(),
            transform: r.transform,
            clip_depth: r.clip_depth,
        }));
        core::mem::replace(&mut self.commands, fresh)
    }

    fn state(&self) -> &PassState {
        &self.states[self.states.len() - 1]
    }

    fn state_mut(&mut self) -> &mut PassState {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    fn local_transform(state: &PassState) -> Transform3d {
        Transform3d::translate(-state.pass_position.x, -state.pass_position.y) * state.transform
    }

    fn record_clip(&mut self, shape: ClipShape, op: ClipOp, is_aa: bool) {
        let state = *self.state();
        let transform = Self::local_transform(&state);
        let contents = ClipContents::new(shape, op);
        let clip_depth = self.next_clip_depth;
        let result = self.clip_stack.record_clip(
            contents.clone(),
            transform,
            state.pass_position,
            clip_depth,
            state.clip_height,
            is_aa,
        );
        if result.clip_did_change {
            self.next_clip_depth += 1;
            self.commands.push(PassCommand::Clip {
                contents,
                transform,
                clip_depth,
            });
        }
    }

    fn record_draw(&mut self, op: DisplayOp, local_bounds: Option<Rect>) {
        let state = *self.state();
        let visible = match (self.clip_stack.current_clip_coverage(), local_bounds) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(coverage), Some(bounds)) => {
                geometry::overlaps(coverage, state.transform.transform_rect_bounds(bounds))
            }
        };
        if !visible {
            self.culled_draws += 1;
            return;
        }
        self.commands.push(PassCommand::Draw {
            op,
            transform: Self::local_transform(&state),
        });
    }
}

impl Canvas for PassCanvas {
    fn save(&mut self) {
        let mut next = *self.state();
        next.is_subpass = false;
        next.clip_height = self.clip_stack.current_clip_height();
        self.states.push(next);
    }

    fn save_layer(&mut self, bounds: Option<Rect>, opacity: f32, backdrop: Option<&ImageFilter>) {
        let state = *self.state();
        let current = self.clip_stack.current_clip_coverage();
        let coverage = match bounds {
            Some(b) => current
                .and_then(|c| geometry::intersection(c, state.transform.transform_rect_bounds(b))),
            None => current,
        };
        let clip_height = self.clip_stack.current_clip_height();
        self.clip_stack.push_subpass(coverage, clip_height);
        self.commands.push(PassCommand::BeginSubpass {
            coverage,
            opacity,
            backdrop: backdrop.copied(),
        });
        self.states.push(PassState {
            transform: state.transform,
            clip_height,
            is_subpass: true,
            pass_position: coverage.map_or(Point::ZERO, |c| c.origin()),
        });
    }

    fn restore(&mut self) {
        let depth = self.states.len();
        let Some(state) = self.states.pop_if(|_| depth > 1) else {
            return;
        };
        if state.is_subpass {
            self.clip_stack.pop_subpass();
            self.commands.push(PassCommand::EndSubpass);
        } else {
            let result = self
                .clip_stack
                .record_restore(state.pass_position, state.clip_height);
            if result.clip_did_change {
                self.commands.push(PassCommand::RestoreClip {
                    coverage: result.coverage,
                });
            }
        }
    }

    fn save_count(&self) -> usize {
        self.states.len()
    }

    fn transform(&mut self, matrix: &Transform3d) {
        let state = self.state_mut();
        state.transform = state.transform * *matrix;
    }

    fn set_transform(&mut self, matrix: &Transform3d) {
        self.state_mut().transform = *matrix;
    }

    fn clip_rect(&mut self, rect: Rect, op: ClipOp, is_aa: bool) {
        self.record_clip(ClipShape::Rect(rect), op, is_aa);
    }

    fn clip_rounded_rect(&mut self, rrect: RoundedRect, op: ClipOp, is_aa: bool) {
        self.record_clip(ClipShape::RoundedRect(rrect), op, is_aa);
    }

    fn clip_path(&mut self, path: &BezPath, op: ClipOp, is_aa: bool) {
        self.record_clip(ClipShape::Path(path.clone()), op, is_aa);
    }

    fn draw_rect(&mut self, rect: Rect, color: Color) {
        self.record_draw(DisplayOp::DrawRect { rect, color }, Some(rect));
    }

    fn draw_image(&mut self, image: &ImageHandle, dst: Rect, opacity: f32) {
        self.record_draw(
            DisplayOp::DrawImage {
                image: *image,
                dst,
                opacity,
            },
            Some(dst),
        );
    }

    fn draw_display_list(&mut self, list: &Arc<DisplayList>, opacity: f32) {
        if list.is_empty() {
            return;
        }
        self.record_draw(
            DisplayOp::DrawDisplayList {
                list: Arc::clone(list),
                opacity,
            },
            Some(list.bounds()),
        );
    }

    fn clear(&mut self, color: Color) {
        self.record_draw(DisplayOp::Clear(color), None);
    }

    fn total_matrix(&self) -> Transform3d {
        self.state().transform
    }

    fn device_clip_bounds(&self) -> Option<Rect> {
        self.clip_stack.current_clip_coverage()
    }
}
