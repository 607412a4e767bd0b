//! Statistics tracking for pools

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic operation counters for one pool.
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    borrows: AtomicU64,
    forfeits: AtomicU64,
    created: AtomicU64,
    evicted: AtomicU64,
    queue_hits: AtomicU64,
    queue_returns: AtomicU64,
    maintenance_runs: AtomicU64,
}

impl PoolStats {
    pub(crate) fn record_borrow(&self) {
        self.borrows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forfeit(&self) {
        self.forfeits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_created(&self, count: u64) {
        self.created.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, count: u64) {
        self.evicted.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_queue_hit(&self) {
        self.queue_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_queue_return(&self) {
        self.queue_returns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_maintenance_run(&self) {
        self.maintenance_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            borrows: self.borrows.load(Ordering::Relaxed),
            forfeits: self.forfeits.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            queue_hits: self.queue_hits.load(Ordering::Relaxed),
            queue_returns: self.queue_returns.load(Ordering::Relaxed),
            maintenance_runs: self.maintenance_runs.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a pool's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    /// Total fulfilled borrows.
    pub borrows: u64,
    /// Total fulfilled forfeits.
    pub forfeits: u64,
    /// Total resources created (borrow and maintenance paths).
    pub created: u64,
    /// Total resources evicted (forfeit and maintenance paths).
    pub evicted: u64,
    /// Borrows served from a queue.
    pub queue_hits: u64,
    /// Forfeits returned to a queue.
    pub queue_returns: u64,
    /// Maintenance passes executed.
    pub maintenance_runs: u64,
}
