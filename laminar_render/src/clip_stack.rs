// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip-coverage tracking across nested render subpasses.
//!
//! Every render pass keeps a stack of [`ClipCoverageLayer`]s describing the
//! screen-space area that the active clips still allow drawing into. Clips
//! push a layer when they actually change that area; restores pop back to a
//! recorded height. Each subpass (an offscreen layer) gets its own stack,
//! seeded with the subpass coverage.
//!
//! Difference clips and non-rect shapes always push a layer, since their
//! coverage rect is only a bound. Recorded clips are also kept as
//! [`ReplayResult`]s. When a platform view interrupts a pass and the backdrop
//! has to be redrawn into a fresh render target, the caller re-issues those
//! clips in order and ends up with exactly the clip state it had before the
//! interruption.
//!
//! Coverage rects are always in global (root pass) space. Clip shapes and
//! their transforms are in pass-local space; `global_pass_position` is the
//! origin of the current pass in global space.

use kurbo::{BezPath, Point, Rect, RoundedRect, Shape, Vec2};
use laminar_core::canvas::ClipOp;
use laminar_core::geometry;
use laminar_core::transform::Transform3d;

/// Geometry of a clip.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipShape {
    /// Axis-aligned rect.
    Rect(Rect),
    /// Rounded rect.
    RoundedRect(RoundedRect),
    /// Arbitrary path.
    Path(BezPath),
}

impl ClipShape {
    /// Local-space bounds of the shape.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Rect(r) => *r,
            Self::RoundedRect(rr) => rr.rect(),
            Self::Path(p) => p.bounding_box(),
        }
    }

    /// Whether the shape is exactly its bounding rect.
    #[must_use]
    pub fn is_rect(&self) -> bool {
        match self {
            Self::Rect(_) => true,
            Self::RoundedRect(rr) => rr.radii().as_single_radius() == Some(0.0),
            Self::Path(_) => false,
        }
    }
}

/// Coverage produced by applying one clip to the current coverage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipCoverage {
    /// Resulting coverage, `None` when nothing remains drawable.
    pub coverage: Option<Rect>,
    /// Whether the clip is a difference clip or is not an axis-aligned rect
    /// after transformation, so that its coverage is only a bound.
    pub is_difference_or_non_square: bool,
}

/// A clip shape combined with its operation.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipContents {
    shape: ClipShape,
    op: ClipOp,
}

impl ClipContents {
    /// Creates clip contents.
    #[must_use]
    pub const fn new(shape: ClipShape, op: ClipOp) -> Self {
        Self { shape, op }
    }

    /// An intersecting rect clip.
    #[must_use]
    pub const fn rect(rect: Rect) -> Self {
        Self::new(ClipShape::Rect(rect), ClipOp::Intersect)
    }

    /// The clip shape.
    #[must_use]
    pub const fn shape(&self) -> &ClipShape {
        &self.shape
    }

    /// The clip operation.
    #[must_use]
    pub const fn op(&self) -> ClipOp {
        self.op
    }

    /// Applies this clip, drawn with `transform`, to `current` coverage.
    #[must_use]
    pub fn coverage(&self, transform: &Transform3d, current: Rect) -> ClipCoverage {
        self.coverage_with_outset(transform, current, 0.0)
    }

    /// Like [`coverage`](Self::coverage) with the transformed shape bounds
    /// outset by `outset` before intersecting.
    #[must_use]
    pub fn coverage_with_outset(
        &self,
        transform: &Transform3d,
        current: Rect,
        outset: f64,
    ) -> ClipCoverage {
        let axis_aligned_rect = self.shape.is_rect() && transform.is_translate_scale_only();
        let bounds = transform.transform_rect_bounds(self.shape.bounds());
        match self.op {
            ClipOp::Intersect => ClipCoverage {
                coverage: geometry::intersection(current, bounds.inflate(outset, outset)),
                is_difference_or_non_square: !axis_aligned_rect,
            },
            ClipOp::Difference => {
                // Only a rect that swallows the whole coverage can shrink it;
                // anything else leaves a bound that is no tighter than before.
                let covered = axis_aligned_rect && geometry::contains_rect(bounds, current);
                ClipCoverage {
                    coverage: if covered || geometry::is_empty(current) {
                        None
                    } else {
                        Some(current)
                    },
                    is_difference_or_non_square: true,
                }
            }
        }
    }
}

/// One level of accumulated clip coverage within a subpass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipCoverageLayer {
    /// Drawable area in global space; `None` when fully clipped out.
    pub coverage: Option<Rect>,
    /// Clip height this layer was pushed at.
    pub clip_height: u32,
}

/// A recorded clip, kept so it can be re-issued after a backdrop restore.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayResult {
    /// The clip that was recorded.
    pub clip_contents: ClipContents,
    /// Pass-local transform the clip was drawn with.
    pub transform: Transform3d,
    /// Coverage after the clip, in global space.
    pub clip_coverage: Option<Rect>,
    /// Caller-assigned depth of the clip.
    pub clip_depth: u32,
    /// Clip height of the coverage layer the clip pushed.
    pub clip_height: u32,
}

/// Clip bookkeeping for one render subpass.
#[derive(Clone, Debug, PartialEq)]
pub struct SubpassState {
    /// Clips that changed coverage, in recording order.
    pub rendered_clip_entities: Vec<ReplayResult>,
    /// Coverage stack; never empty.
    pub clip_coverage: Vec<ClipCoverageLayer>,
}

impl SubpassState {
    fn new(coverage: Option<Rect>, clip_height: u32) -> Self {
        Self {
            rendered_clip_entities: Vec::new(),
            clip_coverage: vec![ClipCoverageLayer {
                coverage,
                clip_height,
            }],
        }
    }

    fn top(&self) -> ClipCoverageLayer {
        // The seed layer is never popped.
        self.clip_coverage[self.clip_coverage.len() - 1]
    }
}

/// Outcome of recording a clip or a restore.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClipStateResult {
    /// Whether anything below this point can still be drawn.
    pub should_render: bool,
    /// Whether the clip coverage changed, i.e. the backend must update its
    /// clip or stencil state.
    pub clip_did_change: bool,
    /// Resulting coverage in pass-local space.
    pub coverage: Option<Rect>,
}

/// Tracks nested clip coverage across render subpasses.
///
/// Construction pushes the root pass state, which counts as subpass depth 1
/// and can never be popped.
#[derive(Clone, Debug)]
pub struct EntityPassClipStack {
    subpass_state: Vec<SubpassState>,
    aa_epsilon: f64,
    next_replay_index: usize,
}

impl EntityPassClipStack {
    /// Default outset applied to anti-aliased clip bounds, in device pixels.
    ///
    /// Anti-aliased edges can touch pixels up to half a pixel outside the
    /// geometric edge.
    pub const AA_COVERAGE_EPSILON: f64 = 0.5;

    /// Creates a stack for a root pass covering `initial_coverage_rect`.
    #[must_use]
    pub fn new(initial_coverage_rect: Rect) -> Self {
        Self::with_aa_epsilon(initial_coverage_rect, Self::AA_COVERAGE_EPSILON)
    }

    /// Creates a stack with a custom anti-aliasing outset.
    ///
    /// # Panics
    ///
    /// Panics if `aa_epsilon` is negative or not finite.
    #[must_use]
    pub fn with_aa_epsilon(initial_coverage_rect: Rect, aa_epsilon: f64) -> Self {
        assert!(
            aa_epsilon.is_finite() && aa_epsilon >= 0.0,
            "aa_epsilon must be finite and non-negative, got {aa_epsilon}"
        );
        let coverage = if geometry::is_empty(initial_coverage_rect) {
            None
        } else {
            Some(initial_coverage_rect)
        };
        Self {
            subpass_state: vec![SubpassState::new(coverage, 0)],
            aa_epsilon,
            next_replay_index: 0,
        }
    }

    /// The configured anti-aliasing outset.
    #[must_use]
    pub const fn aa_epsilon(&self) -> f64 {
        self.aa_epsilon
    }

    fn current(&self) -> &SubpassState {
        &self.subpass_state[self.subpass_state.len() - 1]
    }

    fn current_mut(&mut self) -> &mut SubpassState {
        let last = self.subpass_state.len() - 1;
        &mut self.subpass_state[last]
    }

    /// Coverage of the innermost clip layer of the current subpass.
    #[must_use]
    pub fn current_clip_coverage(&self) -> Option<Rect> {
        self.current().top().coverage
    }

    /// Clip height of the innermost clip layer of the current subpass.
    #[must_use]
    pub fn current_clip_height(&self) -> u32 {
        self.current().top().clip_height
    }

    /// Whether anything in the current subpass is still drawable.
    #[must_use]
    pub fn has_coverage(&self) -> bool {
        self.current_clip_coverage().is_some()
    }

    /// Number of subpass states, including the root.
    #[must_use]
    pub fn subpass_depth(&self) -> usize {
        self.subpass_state.len()
    }

    /// Coverage layers of the current subpass, outermost first.
    #[must_use]
    pub fn clip_coverage_layers(&self) -> &[ClipCoverageLayer] {
        &self.current().clip_coverage
    }

    /// Enters a subpass whose drawable area is `subpass_coverage`.
    pub fn push_subpass(&mut self, subpass_coverage: Option<Rect>, clip_height: u32) {
        let coverage = subpass_coverage.filter(|r| !geometry::is_empty(*r));
        self.subpass_state
            .push(SubpassState::new(coverage, clip_height));
        self.next_replay_index = 0;
    }

    /// Leaves the current subpass.
    ///
    /// # Panics
    ///
    /// Panics if only the root pass state remains.
    pub fn pop_subpass(&mut self) {
        assert!(
            self.subpass_state.len() > 1,
            "pop_subpass called on the root pass state"
        );
        self.subpass_state.pop();
        self.next_replay_index = 0;
    }

    fn same_coverage(a: Option<Rect>, b: Option<Rect>, epsilon: f64) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                if epsilon > 0.0 {
                    geometry::nearly_equal(a, b, epsilon)
                } else {
                    a == b
                }
            }
            _ => false,
        }
    }

    /// Records a clip and reports how it changed the coverage.
    ///
    /// An axis-aligned intersect rect that leaves the coverage unchanged (for
    /// example a repeat of the previous clip) pushes no layer and no replay
    /// entry. Difference clips and non-rect shapes are always recorded, since
    /// their coverage is only a bound on what they allow. When `is_aa` is
    /// set the clip bounds are outset by [`aa_epsilon`](Self::aa_epsilon) and
    /// coverage equality is compared within the same tolerance.
    pub fn record_clip(
        &mut self,
        clip_contents: ClipContents,
        transform: Transform3d,
        global_pass_position: Point,
        clip_depth: u32,
        clip_height_floor: u32,
        is_aa: bool,
    ) -> ClipStateResult {
        let epsilon = if is_aa { self.aa_epsilon } else { 0.0 };
        let offset = global_pass_position.to_vec2();
        let state = self.current_mut();
        let top = state.top();

        let Some(current) = top.coverage else {
            // Nothing left to clip.
            return ClipStateResult::default();
        };

        let local = clip_contents.coverage_with_outset(&transform, current - offset, epsilon);
        let coverage = local.coverage.map(|r| r + offset);

        // Only an axis-aligned intersect rect is fully described by its
        // coverage. Difference and non-rect clips still change the stencil.
        if !local.is_difference_or_non_square
            && Self::same_coverage(coverage, Some(current), epsilon)
        {
            return ClipStateResult {
                should_render: true,
                clip_did_change: false,
                coverage: Some(current - offset),
            };
        }

        let clip_height = top.clip_height.max(clip_height_floor) + 1;
        state.clip_coverage.push(ClipCoverageLayer {
            coverage,
            clip_height,
        });
        state.rendered_clip_entities.push(ReplayResult {
            clip_contents,
            transform,
            clip_coverage: coverage,
            clip_depth,
            clip_height,
        });

        ClipStateResult {
            should_render: coverage.is_some(),
            clip_did_change: true,
            coverage: local.coverage,
        }
    }

    /// Pops coverage layers of the current subpass until the innermost has a
    /// clip height of at most `restore_height`.
    ///
    /// Replay entries pushed above `restore_height` are dropped with them.
    /// The clip changed when any layer was popped, even if the coverage
    /// bounds are the same as before.
    pub fn record_restore(
        &mut self,
        global_pass_position: Point,
        restore_height: u32,
    ) -> ClipStateResult {
        let offset: Vec2 = global_pass_position.to_vec2();
        let state = self.current_mut();
        let before = state.clip_coverage.len();

        while state.clip_coverage.len() > 1 && state.top().clip_height > restore_height {
            state.clip_coverage.pop();
        }
        while state
            .rendered_clip_entities
            .last()
            .is_some_and(|r| r.clip_height > restore_height)
        {
            state.rendered_clip_entities.pop();
        }

        let after = state.top().coverage;
        let state_len_changed = state.clip_coverage.len() != before;
        let replay_len = state.rendered_clip_entities.len();
        self.next_replay_index = self.next_replay_index.min(replay_len);
        ClipStateResult {
            should_render: after.is_some(),
            clip_did_change: state_len_changed,
            coverage: after.map(|r| r - offset),
        }
    }

    /// Clips recorded in the current subpass that are still in effect, in
    /// recording order.
    #[must_use]
    pub fn get_replay_entities(&self) -> &[ReplayResult] {
        &self.current().rendered_clip_entities
    }

    /// Rewinds the replay cursor to the first recorded clip.
    pub fn activate_clip_replay(&mut self) {
        self.next_replay_index = 0;
    }

    /// Returns the next clip to re-issue, advancing the replay cursor.
    pub fn next_replay_result(&mut self) -> Option<&ReplayResult> {
        let index = self.next_replay_index;
        let last = self.subpass_state.len() - 1;
        let entry = self.subpass_state[last].rendered_clip_entities.get(index)?;
        self.next_replay_index = index + 1;
        Some(entry)
    }
}
