// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mutators applied while descending into an embedded platform view.
//!
//! While the layer tree is prerolled, every clip, transform, opacity, and
//! backdrop filter between the root and a platform view is pushed onto a
//! [`MutatorStack`]. When the preroll reaches the platform view, the stack is
//! snapshotted into its [`EmbeddedViewParams`](crate::embedded_view::EmbeddedViewParams)
//! so the platform compositor can reproduce the same effects natively.
//!
//! Mutators are immutable and reference counted: cloning a stack copies
//! pointers, and a snapshot taken mid-preroll stays valid however the live
//! stack is pushed or popped afterwards.

use std::sync::Arc;

use kurbo::{BezPath, Rect, RoundedRect, Shape};

use crate::geometry::{ImageFilter, RoundSuperellipse};
use crate::transform::Transform3d;

/// Discriminant of a [`Mutator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutatorKind {
    /// [`Mutator::ClipRect`].
    ClipRect,
    /// [`Mutator::ClipRoundedRect`].
    ClipRoundedRect,
    /// [`Mutator::ClipRoundSuperellipse`].
    ClipRoundSuperellipse,
    /// [`Mutator::ClipPath`].
    ClipPath,
    /// [`Mutator::Transform`].
    Transform,
    /// [`Mutator::Opacity`].
    Opacity,
    /// [`Mutator::BackdropFilter`].
    BackdropFilter,
}

/// A single clip, transform, opacity, or backdrop-filter operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutator {
    /// Clip to an axis-aligned rect in the current local space.
    ClipRect(Rect),
    /// Clip to a rounded rect.
    ClipRoundedRect(RoundedRect),
    /// Clip to a round superellipse.
    ClipRoundSuperellipse(RoundSuperellipse),
    /// Clip to an arbitrary path.
    ClipPath(BezPath),
    /// Concatenate a transform.
    Transform(Transform3d),
    /// Multiply opacity; 0 is transparent, 255 is opaque.
    Opacity(u8),
    /// Filter the backdrop within `rect` before drawing the view.
    BackdropFilter {
        /// The filter applied to the backdrop.
        filter: ImageFilter,
        /// The filtered region, in the local space of the mutator.
        rect: Rect,
    },
}

impl Mutator {
    /// Returns the discriminant of this mutator.
    #[must_use]
    pub const fn kind(&self) -> MutatorKind {
        match self {
            Self::ClipRect(_) => MutatorKind::ClipRect,
            Self::ClipRoundedRect(_) => MutatorKind::ClipRoundedRect,
            Self::ClipRoundSuperellipse(_) => MutatorKind::ClipRoundSuperellipse,
            Self::ClipPath(_) => MutatorKind::ClipPath,
            Self::Transform(_) => MutatorKind::Transform,
            Self::Opacity(_) => MutatorKind::Opacity,
            Self::BackdropFilter { .. } => MutatorKind::BackdropFilter,
        }
    }

    /// Whether this mutator clips.
    #[must_use]
    pub const fn is_clip(&self) -> bool {
        matches!(
            self,
            Self::ClipRect(_)
                | Self::ClipRoundedRect(_)
                | Self::ClipRoundSuperellipse(_)
                | Self::ClipPath(_)
        )
    }

    /// Local-space bounds of the clip shape, or `None` for non-clip mutators.
    #[must_use]
    pub fn clip_bounds(&self) -> Option<Rect> {
        match self {
            Self::ClipRect(rect) => Some(*rect),
            Self::ClipRoundedRect(rrect) => Some(rrect.rect()),
            Self::ClipRoundSuperellipse(rse) => Some(rse.bounds()),
            Self::ClipPath(path) => Some(path.bounding_box()),
            _ => None,
        }
    }

    /// Opacity as a float in `0.0..=1.0`, or `None` for other mutators.
    #[must_use]
    pub fn alpha_f32(&self) -> Option<f32> {
        match self {
            Self::Opacity(alpha) => Some(f32::from(*alpha) / 255.0),
            _ => None,
        }
    }
}

/// An ordered stack of [`Mutator`]s.
///
/// Push order runs from the outermost mutator (closest to the root of the
/// layer tree) to the innermost. [`top`](Self::top) is the outermost entry and
/// [`bottom`](Self::bottom) the innermost; [`bottom_to_top`](Self::bottom_to_top)
/// walks innermost first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutatorStack {
    entries: Vec<Arc<Mutator>>,
}

impl MutatorStack {
    /// Creates an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn push(&mut self, mutator: Mutator) {
        self.entries.push(Arc::new(mutator));
    }

    /// Pushes a rect clip.
    pub fn push_clip_rect(&mut self, rect: Rect) {
        self.push(Mutator::ClipRect(rect));
    }

    /// Pushes a rounded-rect clip.
    pub fn push_clip_rounded_rect(&mut self, rrect: RoundedRect) {
        self.push(Mutator::ClipRoundedRect(rrect));
    }

    /// Pushes a round-superellipse clip.
    pub fn push_clip_round_superellipse(&mut self, rse: RoundSuperellipse) {
        self.push(Mutator::ClipRoundSuperellipse(rse));
    }

    /// Pushes a path clip.
    pub fn push_clip_path(&mut self, path: BezPath) {
        self.push(Mutator::ClipPath(path));
    }

    /// Pushes a transform.
    pub fn push_transform(&mut self, transform: Transform3d) {
        self.push(Mutator::Transform(transform));
    }

    /// Pushes an opacity.
    pub fn push_opacity(&mut self, alpha: u8) {
        self.push(Mutator::Opacity(alpha));
    }

    /// Pushes a backdrop filter over `rect`.
    pub fn push_backdrop_filter(&mut self, filter: ImageFilter, rect: Rect) {
        self.push(Mutator::BackdropFilter { filter, rect });
    }

    /// Removes the most recently pushed mutator.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty.
    pub fn pop(&mut self) {
        assert!(!self.entries.is_empty(), "pop on an empty mutator stack");
        self.entries.pop();
    }

    /// Pops mutators until at most `len` remain.
    pub fn pop_to(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Number of mutators on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates in push order, outermost first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<Mutator>> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Iterates in reverse push order, innermost first.
    pub fn bottom_to_top(
        &self,
    ) -> impl DoubleEndedIterator<Item = &Arc<Mutator>> + ExactSizeIterator {
        self.entries.iter().rev()
    }

    /// The outermost (first pushed) mutator.
    #[must_use]
    pub fn top(&self) -> Option<&Arc<Mutator>> {
        self.entries.first()
    }

    /// The innermost (most recently pushed) mutator.
    #[must_use]
    pub fn bottom(&self) -> Option<&Arc<Mutator>> {
        self.entries.last()
    }

    /// Product of every transform mutator, in push order.
    #[must_use]
    pub fn total_transform(&self) -> Transform3d {
        self.entries
            .iter()
            .filter_map(|m| match **m {
                Mutator::Transform(t) => Some(t),
                _ => None,
            })
            .fold(Transform3d::IDENTITY, |acc, t| acc * t)
    }

    /// Product of every opacity mutator, in `0.0..=1.0`.
    #[must_use]
    pub fn total_opacity(&self) -> f32 {
        self.entries
            .iter()
            .filter_map(|m| m.alpha_f32())
            .product()
    }

    /// Whether any mutator clips.
    #[must_use]
    pub fn has_clips(&self) -> bool {
        self.entries.iter().any(|m| m.is_clip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stack() -> MutatorStack {
        let mut stack = MutatorStack::new();
        stack.push_transform(Transform3d::scale(2.0, 2.0));
        stack.push_clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        stack.push_opacity(128);
        stack.push_clip_path(Rect::new(1.0, 1.0, 4.0, 4.0).to_path(0.1));
        stack
    }

    #[test]
    fn push_and_pop() {
        let mut stack = sample_stack();
        assert_eq!(stack.len(), 4);
        stack.pop();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.bottom().unwrap().kind(), MutatorKind::Opacity);
    }

    #[test]
    #[should_panic(expected = "pop on an empty mutator stack")]
    fn pop_empty_panics() {
        MutatorStack::new().pop();
    }

    #[test]
    fn pop_to_keeps_prefix() {
        for n in 0..6 {
            let original = sample_stack();
            let mut stack = original.clone();
            stack.pop_to(n);
            assert_eq!(stack.len(), n.min(original.len()));
            for (a, b) in stack.iter().zip(original.iter()) {
                assert!(Arc::ptr_eq(a, b), "remaining entries must be untouched");
            }
        }
    }

    #[test]
    fn iteration_orders() {
        let stack = sample_stack();
        let forward: Vec<_> = stack.iter().map(|m| m.kind()).collect();
        let reverse: Vec<_> = stack.bottom_to_top().map(|m| m.kind()).collect();
        assert_eq!(
            forward,
            [
                MutatorKind::Transform,
                MutatorKind::ClipRect,
                MutatorKind::Opacity,
                MutatorKind::ClipPath
            ]
        );
        assert_eq!(reverse.iter().rev().copied().collect::<Vec<_>>(), forward);
        assert_eq!(stack.top().unwrap().kind(), MutatorKind::Transform);
    }

    #[test]
    fn snapshots_survive_mutation() {
        let mut live = sample_stack();
        let snapshot = live.clone();
        live.pop_to(0);
        live.push_opacity(1);
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot, sample_stack());
    }

    #[test]
    fn push_clip_pop_leaves_empty() {
        let mut stack = MutatorStack::new();
        stack.push_transform(Transform3d::scale(2.0, 2.0));
        stack.push_clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        stack.pop();
        stack.pop_to(0);
        assert!(stack.is_empty());
        assert!(stack.top().is_none());
        assert_eq!(stack.top().map(Arc::as_ptr), stack.bottom().map(Arc::as_ptr));
    }

    #[test]
    fn totals() {
        let stack = sample_stack();
        assert_eq!(stack.total_transform(), Transform3d::scale(2.0, 2.0));
        assert!((stack.total_opacity() - 128.0 / 255.0).abs() < 1e-6);
        assert!(stack.has_clips());
        assert_eq!(
            stack.iter().nth(3).unwrap().clip_bounds(),
            Some(Rect::new(1.0, 1.0, 4.0, 4.0))
        );
    }
}
