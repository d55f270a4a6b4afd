//! Store metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for one `ObjectStore`
#[derive(Debug, Default)]
pub struct StoreMetrics {
    /// Registered object types
    registered: AtomicUsize,
    /// Accepted writes
    update_count: AtomicU64,
    /// Rejected writes (unregistered object or wrong payload)
    rejected_count: AtomicU64,
    /// Notifications dropped because a subscriber queue was full
    dropped_count: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::Relaxed)
    }

    pub(crate) fn set_registered(&self, count: usize) {
        self.registered.store(count, Ordering::Relaxed);
    }

    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_update_count(&self) {
        self.update_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_rejected_count(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot {
            registered: self.registered(),
            update_count: self.update_count(),
            rejected_count: self.rejected_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of store metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreMetricsSnapshot {
    pub registered: usize,
    pub update_count: u64,
    pub rejected_count: u64,
    pub dropped_count: u64,
}
