//! Read-only atomic counters exposed by every pool.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a pool's lifetime counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances created because the pool had none to reuse.
    pub created: u64,
    /// Total `get()` calls.
    pub gotten: u64,
    /// Total `put()` calls (including ones that dropped the instance).
    pub put: u64,
}

#[derive(Default)]
pub(crate) struct Counters {
    created: AtomicU64,
    gotten: AtomicU64,
    put: AtomicU64,
}

impl Counters {
    pub(crate) fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_gotten(&self) {
        self.gotten.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_put(&self) {
        self.put.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            gotten: self.gotten.load(Ordering::Relaxed),
            put: self.put.load(Ordering::Relaxed),
        }
    }
}
