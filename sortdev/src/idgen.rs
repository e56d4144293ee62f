//! Session identifiers
//!
//! Every open session gets a `Handle` from the owning device's `IdGen`.
//! Handles are what the async notifier keys its observers by.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    id: u64,
}

impl Handle {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.id)
    }
}

/// Thread-safe session id generator, starting at 1
#[derive(Debug)]
pub struct IdGen {
    next_id: AtomicU64,
}

impl IdGen {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next handle
    pub fn next_handle(&self) -> Handle {
        Handle::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}
