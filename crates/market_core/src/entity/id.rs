//! # Entity Identity
//!
//! Entities are identified by a process-unique `u32` handed out by an
//! [`IdAllocator`]. The allocator is owned by whoever builds the entities,
//! there is no global counter.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Unique identifier for an entity.
///
/// IDs start at 1 and are never reused within one allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Wraps a raw ID value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out [`EntityId`]s.
///
/// Thread-safe: entities may be constructed from several threads against
/// the same allocator.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU32,
}

impl IdAllocator {
    /// Creates an allocator whose first ID is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    /// Allocates the next ID.
    ///
    /// # Panics
    ///
    /// Panics if all `u32::MAX - 1` IDs have been handed out.
    pub fn allocate(&self) -> EntityId {
        let raw = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                (n < u32::MAX).then_some(n + 1)
            })
            .unwrap_or_else(|_| panic!("entity id space exhausted"));
        EntityId(raw)
    }

    /// Number of IDs handed out so far.
    #[must_use]
    pub fn allocated(&self) -> u32 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
