//! Identifier allocation shared by every entity kind

use crate::Id;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id source. Ids are never handed out twice by one allocator,
/// and the owning store seeds it past every id already persisted.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicU64,
}

impl IdAllocator {
    /// Allocator whose next id is `high_water + 1`
    pub fn starting_after(high_water: Id) -> Self {
        Self {
            last: AtomicU64::new(high_water),
        }
    }

    /// Hand out a fresh, non-zero id
    pub fn next(&self) -> Id {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Highest id handed out so far (or seeded)
    pub fn high_water(&self) -> Id {
        self.last.load(Ordering::SeqCst)
    }

    /// Make sure future ids are above `id`
    pub fn observe(&self, id: Id) {
        self.last.fetch_max(id, Ordering::SeqCst);
    }

    /// Restart right after `high_water`, even if that moves backwards
    pub fn reset_to(&self, high_water: Id) {
        self.last.store(high_water, Ordering::SeqCst);
    }
}
