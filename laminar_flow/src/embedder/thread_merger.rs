// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lease-based merging of the raster and platform threads.
//!
//! Some platforms can only composite native views on their own thread. When
//! such a view appears, the raster thread asks to run merged with the
//! platform thread for a number of frames (a lease). The platform may
//! decline. Every call here is a handful of atomic operations and never
//! blocks either thread.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Outcome of [`RasterThreadMerger::decrement_lease`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterThreadStatus {
    /// Still merged after this frame.
    RemainsMerged,
    /// Was not merged to begin with.
    RemainsUnmerged,
    /// This frame used up the lease; the threads are now unmerged.
    UnmergedNow,
}

/// Shared merge state between the raster and platform threads.
#[derive(Debug)]
pub struct RasterThreadMerger {
    /// Frames left on the current lease; zero when unmerged.
    lease_term: AtomicU32,
    enabled: AtomicBool,
    platform_can_merge: AtomicBool,
}

impl Default for RasterThreadMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterThreadMerger {
    /// Frames a merge lasts when the caller has no better estimate.
    pub const DEFAULT_LEASE_FRAMES: u32 = 10;

    /// Creates an enabled, unmerged merger whose platform accepts merges.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lease_term: AtomicU32::new(0),
            enabled: AtomicBool::new(true),
            platform_can_merge: AtomicBool::new(true),
        }
    }

    /// Requests a merge for `lease_term` frames.
    ///
    /// Returns `false` when merging is disabled, the platform declines, or
    /// `lease_term` is zero. When already merged the lease is extended to
    /// `lease_term` if that is longer.
    pub fn merge_with_lease(&self, lease_term: u32) -> bool {
        if lease_term == 0 || !self.is_enabled() {
            return false;
        }
        if !self.platform_can_merge.load(Ordering::Acquire) {
            log::debug!("platform declined a raster thread merge");
            return false;
        }
        self.lease_term.fetch_max(lease_term, Ordering::AcqRel);
        true
    }

    /// Extends the current lease to `lease_term` frames if merged and the new
    /// term is longer. Does nothing when unmerged.
    pub fn extend_lease_to(&self, lease_term: u32) {
        // A failed update means the threads are unmerged or the lease is
        // already long enough; both leave the state as it is.
        let _ = self
            .lease_term
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current > 0 && lease_term > current).then_some(lease_term)
            });
    }

    /// Counts down one frame of the lease.
    pub fn decrement_lease(&self) -> RasterThreadStatus {
        match self
            .lease_term
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            }) {
            Err(_) => RasterThreadStatus::RemainsUnmerged,
            Ok(1) => RasterThreadStatus::UnmergedNow,
            Ok(_) => RasterThreadStatus::RemainsMerged,
        }
    }

    /// Ends the lease immediately.
    pub fn unmerge_now(&self) {
        self.lease_term.store(0, Ordering::Release);
    }

    /// Whether the threads are currently merged.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        self.lease_term.load(Ordering::Acquire) > 0
    }

    /// Frames left on the lease.
    #[must_use]
    pub fn lease_term(&self) -> u32 {
        self.lease_term.load(Ordering::Acquire)
    }

    /// Allows merging again after [`disable`](Self::disable).
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Rejects further merge requests. An active lease keeps running.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Whether merge requests are accepted.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Called by the platform to accept or decline future merges.
    pub fn set_platform_can_merge(&self, can_merge: bool) {
        self.platform_can_merge.store(can_merge, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn lease_counts_down() {
        let merger = RasterThreadMerger::new();
        assert!(!merger.is_merged());
        assert!(merger.merge_with_lease(2));
        assert!(merger.is_merged());
        assert_eq!(merger.decrement_lease(), RasterThreadStatus::RemainsMerged);
        assert_eq!(merger.decrement_lease(), RasterThreadStatus::UnmergedNow);
        assert_eq!(merger.decrement_lease(), RasterThreadStatus::RemainsUnmerged);
        assert!(!merger.is_merged());
    }

    #[test]
    fn platform_can_decline() {
        let merger = RasterThreadMerger::new();
        merger.set_platform_can_merge(false);
        assert!(!merger.merge_with_lease(5));
        assert!(!merger.is_merged());
        merger.set_platform_can_merge(true);
        assert!(merger.merge_with_lease(5));
    }

    #[test]
    fn extend_only_lengthens_active_lease() {
        let merger = RasterThreadMerger::new();
        merger.extend_lease_to(8);
        assert_eq!(merger.lease_term(), 0);
        assert!(merger.merge_with_lease(3));
        merger.extend_lease_to(2);
        assert_eq!(merger.lease_term(), 3);
        merger.extend_lease_to(8);
        assert_eq!(merger.lease_term(), 8);
    }

    #[test]
    fn merge_keeps_longer_lease() {
        let merger = RasterThreadMerger::new();
        assert!(merger.merge_with_lease(6));
        assert!(merger.merge_with_lease(2));
        assert_eq!(merger.lease_term(), 6);
    }

    #[test]
    fn disabled_rejects_but_keeps_lease() {
        let merger = RasterThreadMerger::new();
        assert!(merger.merge_with_lease(4));
        merger.disable();
        assert!(!merger.merge_with_lease(9));
        assert_eq!(merger.lease_term(), 4);
        merger.unmerge_now();
        assert!(!merger.is_merged());
        merger.enable();
        assert!(merger.merge_with_lease(1));
        assert!(!merger.merge_with_lease(0));
    }

    #[test]
    fn platform_thread_acknowledges_without_blocking() {
        let merger = Arc::new(RasterThreadMerger::new());
        let platform = {
            let merger = Arc::clone(&merger);
            thread::spawn(move || merger.set_platform_can_merge(false))
        };
        platform.join().expect("platform thread");
        assert!(!merger.merge_with_lease(RasterThreadMerger::DEFAULT_LEASE_FRAMES));
    }
}
