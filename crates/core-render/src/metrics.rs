//! Scroll window load counters and timing.
//!
//! Relaxed atomics, read through `snapshot()`. They let tests and the status
//! overlay observe how often prefetch avoided a reload and how many stale
//! loads were thrown away.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

#[derive(Debug, Default)]
pub struct ScrollMetrics {
    requested: AtomicU64,
    applied: AtomicU64,
    discarded_stale: AtomicU64,
    failed: AtomicU64,
    served_from_prefetch: AtomicU64,
    last_load_ns: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetricsSnapshot {
    pub requested: u64,
    pub applied: u64,
    pub discarded_stale: u64,
    pub failed: u64,
    pub served_from_prefetch: u64,
    /// Duration of the last applied load.
    pub last_load_ns: u64,
}

impl ScrollMetrics {
    pub fn snapshot(&self) -> ScrollMetricsSnapshot {
        ScrollMetricsSnapshot {
            requested: self.requested.load(Relaxed),
            applied: self.applied.load(Relaxed),
            discarded_stale: self.discarded_stale.load(Relaxed),
            failed: self.failed.load(Relaxed),
            served_from_prefetch: self.served_from_prefetch.load(Relaxed),
            last_load_ns: self.last_load_ns.load(Relaxed),
        }
    }
    pub(crate) fn incr_requested(&self) {
        self.requested.fetch_add(1, Relaxed);
    }
    pub(crate) fn incr_applied(&self, load_ns: u64) {
        self.applied.fetch_add(1, Relaxed);
        self.last_load_ns.store(load_ns, Relaxed);
    }
    pub(crate) fn incr_discarded(&self) {
        self.discarded_stale.fetch_add(1, Relaxed);
    }
    pub(crate) fn incr_failed(&self) {
        self.failed.fetch_add(1, Relaxed);
    }
    pub(crate) fn incr_prefetch_hit(&self) {
        self.served_from_prefetch.fetch_add(1, Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let m = ScrollMetrics::default();
        m.incr_requested();
        m.incr_requested();
        m.incr_applied(1234);
        m.incr_discarded();
        m.incr_prefetch_hit();
        let s = m.snapshot();
        assert_eq!(s.requested, 2);
        assert_eq!(s.applied, 1);
        assert_eq!(s.discarded_stale, 1);
        assert_eq!(s.failed, 0);
        assert_eq!(s.served_from_prefetch, 1);
        assert_eq!(s.last_load_ns, 1234);
    }
}
