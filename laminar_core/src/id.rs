// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer and view identity types.

use core::fmt;
use core::num::NonZeroU64;
use core::sync::atomic::{AtomicU64, Ordering};

/// Process-wide unique identity of a layer (or any other retained scene
/// object that draws from the same allocator).
///
/// Zero is reserved for "invalid" and cannot be represented.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerUniqueId(NonZeroU64);

impl LayerUniqueId {
    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Wraps a raw value, returning `None` for zero.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Debug for LayerUniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerUniqueId({})", self.0)
    }
}

/// Lock-free source of [`LayerUniqueId`]s.
///
/// Scene trees are usually built off the raster thread, so this is the one
/// piece of compositor state that is shared between threads. Ids increase
/// strictly per allocator and never repeat until the 64-bit counter wraps.
///
/// [`global`](Self::global) is the process-wide instance used by default;
/// tests construct their own to stay isolated.
#[derive(Debug)]
pub struct LayerIdAllocator {
    next: AtomicU64,
}

static GLOBAL_LAYER_IDS: LayerIdAllocator = LayerIdAllocator::new();

impl Default for LayerIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerIdAllocator {
    /// Creates an allocator whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates an allocator whose next raw value is `first`.
    ///
    /// A `first` of zero is skipped like any other zero.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// The process-wide allocator.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL_LAYER_IDS
    }

    /// Returns the next id, skipping zero on wraparound.
    pub fn next_unique_id(&self) -> LayerUniqueId {
        loop {
            let raw = self.next.fetch_add(1, Ordering::Relaxed);
            if let Some(id) = LayerUniqueId::new(raw) {
                return id;
            }
        }
    }
}

/// Identifies an embedded platform view within a frame.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(pub i64);

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({})", self.0)
    }
}

/// Identifies a top-level render surface (a window or output) that frames
/// are submitted to.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RenderViewId(pub i64);

impl fmt::Debug for RenderViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RenderViewId({})", self.0)
    }
}
