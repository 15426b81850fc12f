//! GC statistics and metrics.
//!
//! Tracks allocation counts, collection counts, and promotion activity
//! for monitoring and tuning.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics about garbage collection activity.
#[derive(Debug)]
pub struct GcStats {
    /// Total objects registered since start.
    pub objects_allocated: AtomicU64,
    /// Total objects reclaimed by sweeps.
    pub objects_freed: AtomicU64,
    /// Total objects promoted from the young to the old pool.
    pub objects_promoted: AtomicU64,
    /// Number of completed minor (young-only) blocking collections.
    pub minor_collections: AtomicU64,
    /// Number of completed major cycles (blocking or incremental).
    pub major_collections: AtomicU64,
    /// Number of incremental steps executed.
    pub incremental_steps: AtomicU64,
}

impl GcStats {
    /// Create new empty statistics.
    pub const fn new() -> Self {
        Self {
            objects_allocated: AtomicU64::new(0),
            objects_freed: AtomicU64::new(0),
            objects_promoted: AtomicU64::new(0),
            minor_collections: AtomicU64::new(0),
            major_collections: AtomicU64::new(0),
            incremental_steps: AtomicU64::new(0),
        }
    }

    /// Record an object registration.
    #[inline]
    pub fn record_allocation(&self) {
        self.objects_allocated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record reclaimed objects.
    #[inline]
    pub fn record_freed(&self, count: usize) {
        self.objects_freed.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a promotion from young to old.
    #[inline]
    pub fn record_promotion(&self) {
        self.objects_promoted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed minor collection.
    pub fn record_minor(&self) {
        self.minor_collections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed major cycle.
    pub fn record_major(&self) {
        self.major_collections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an incremental step.
    #[inline]
    pub fn record_step(&self) {
        self.incremental_steps.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            objects_allocated: self.objects_allocated.load(Ordering::Relaxed),
            objects_freed: self.objects_freed.load(Ordering::Relaxed),
            objects_promoted: self.objects_promoted.load(Ordering::Relaxed),
            minor_collections: self.minor_collections.load(Ordering::Relaxed),
            major_collections: self.major_collections.load(Ordering::Relaxed),
            incremental_steps: self.incremental_steps.load(Ordering::Relaxed),
        }
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        self.objects_allocated.store(0, Ordering::Relaxed);
        self.objects_freed.store(0, Ordering::Relaxed);
        self.objects_promoted.store(0, Ordering::Relaxed);
        self.minor_collections.store(0, Ordering::Relaxed);
        self.major_collections.store(0, Ordering::Relaxed);
        self.incremental_steps.store(0, Ordering::Relaxed);
    }

    /// Print a summary of GC statistics.
    pub fn print_summary(&self) {
        let s = self.snapshot();
        eprintln!("=== GC Statistics ===");
        eprintln!(
            "Objects: {} allocated, {} freed, {} promoted",
            s.objects_allocated, s.objects_freed, s.objects_promoted
        );
        eprintln!(
            "Collections: {} minor, {} major, {} incremental steps",
            s.minor_collections, s.major_collections, s.incremental_steps
        );
    }
}

impl Default for GcStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A plain point-in-time copy of the collector's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Total objects registered since start.
    pub objects_allocated: u64,
    /// Total objects reclaimed by sweeps.
    pub objects_freed: u64,
    /// Total objects promoted from the young to the old pool.
    pub objects_promoted: u64,
    /// Number of completed minor blocking collections.
    pub minor_collections: u64,
    /// Number of completed major cycles.
    pub major_collections: u64,
    /// Number of incremental steps executed.
    pub incremental_steps: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_recording() {
        let stats = GcStats::new();

        stats.record_allocation();
        stats.record_allocation();
        stats.record_freed(3);
        stats.record_promotion();

        let s = stats.snapshot();
        assert_eq!(s.objects_allocated, 2);
        assert_eq!(s.objects_freed, 3);
        assert_eq!(s.objects_promoted, 1);
    }

    #[test]
    fn test_stats_reset() {
        let stats = GcStats::new();

        stats.record_allocation();
        stats.record_major();
        stats.reset();

        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
