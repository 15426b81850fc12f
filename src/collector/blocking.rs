//! Blocking collections.
//!
//! `collect_now` runs a whole cycle in one call: mark from roots, sweep
//! young, and (for a major collection) sweep old as well. A minor
//! collection leaves the old pool unswept but still clears the marks its
//! survivors picked up during the global mark.

use crate::collector::Phase;
use crate::heap::{gc_event, Heap};
use crate::trace::Managed;

impl Heap {
    /// Run a blocking collection cycle.
    pub(crate) fn collect_now(&mut self, major: bool, corpses: &mut Vec<*mut dyn Managed>) {
        gc_event(
            &self.config,
            format_args!("blocking collection requested (major={major})"),
        );

        // A started incremental cycle cannot be discarded; the flag
        // bits on the heap would be left inconsistent. Drive it to
        // completion, then run the requested cycle from a clean state.
        while self.phase != Phase::Idle {
            self.incremental_collect_step(corpses);
        }

        self.cycle_freed_young = 0;
        self.cycle_freed_total = 0;

        self.blocking_mark();
        self.sweep_pool(false, corpses);

        if major {
            self.sweep_pool(true, corpses);
            self.last_major_freed = self.cycle_freed_total;
            self.stats.record_major();
        } else {
            // Old survivors were marked by the global mark; reset them
            // to white without sweeping the pool.
            for addr in self.old.iter() {
                if let Some(entry) = self.objects.get_mut(addr) {
                    entry.header.clear_marks();
                }
            }
            self.stats.record_minor();
        }

        self.last_minor_freed = self.cycle_freed_young;
        self.adapt_thresholds();
    }

    /// Seed the roots and drain the gray stack to completion.
    fn blocking_mark(&mut self) {
        self.mark_stack.clear();
        self.seed_roots();
        let mut scanned = 0;
        while let Some(addr) = self.mark_stack.pop() {
            self.scan_object(addr);
            scanned += 1;
        }
        gc_event(&self.config, format_args!("blocking mark scanned {scanned}"));
    }

    /// Sweep one whole pool without a budget.
    fn sweep_pool(&mut self, sweeping_old: bool, corpses: &mut Vec<*mut dyn Managed>) {
        let snapshot: Vec<usize> = if sweeping_old {
            self.old.iter().copied().collect()
        } else {
            self.young.iter().copied().collect()
        };

        let mut dead = Vec::new();
        for addr in snapshot {
            self.sweep_entry(addr, sweeping_old, &mut dead);
        }
        self.reap(&dead, sweeping_old, corpses);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GcConfig;
    use crate::context;
    use crate::roots::GcRef;
    use crate::trace::{Managed, Tracer};
    use crate::{GcColor, Generation};

    struct Leaf;

    impl Managed for Leaf {
        fn trace(&self, _tracer: &mut dyn Tracer) {}
    }

    #[test]
    fn test_major_reclaims_unreachable() {
        crate::init(GcConfig::default());
        let kept = crate::alloc(Leaf);
        let _dropped = crate::alloc(Leaf);
        let root = GcRef::new(Some(kept));

        crate::collect_now(true);

        assert_eq!(crate::live_objects(), 1);
        assert!(crate::contains(kept));

        drop(root);
        crate::collect_now(true);
        assert_eq!(crate::live_objects(), 0);
        crate::reset();
    }

    #[test]
    fn test_minor_leaves_old_pool_unswept() {
        crate::init(GcConfig::eager_promotion());
        let survivor = crate::alloc(Leaf);
        let root = GcRef::new(Some(survivor));

        // Two survivals promote, third cycle runs it as an old object.
        crate::collect_now(true);
        crate::collect_now(true);
        assert_eq!(crate::generation_of(survivor), Some(Generation::Old));

        // Unreachable old object: a minor collection must not touch it.
        drop(root);
        crate::collect_now(false);
        assert_eq!(crate::live_objects(), 1);
        assert_eq!(crate::old_count(), 1);

        // A major collection reclaims it.
        crate::collect_now(true);
        assert_eq!(crate::live_objects(), 0);
        crate::reset();
    }

    #[test]
    fn test_minor_clears_old_survivor_marks() {
        crate::init(GcConfig::eager_promotion());
        let survivor = crate::alloc(Leaf);
        let root = GcRef::new(Some(survivor));

        crate::collect_now(true);
        crate::collect_now(true);
        assert_eq!(crate::generation_of(survivor), Some(Generation::Old));

        crate::collect_now(false);
        let color = context::with_heap(|h| h.color_of(survivor.addr())).unwrap();
        assert_eq!(color, GcColor::White);

        drop(root);
        crate::reset();
    }

    #[test]
    fn test_minor_twice_equals_once() {
        crate::init(GcConfig::default());
        let kept = crate::alloc(Leaf);
        let root = GcRef::new(Some(kept));

        crate::collect_now(false);
        let young_after_one = crate::young_count();
        let old_after_one = crate::old_count();

        crate::collect_now(false);
        assert_eq!(crate::young_count(), young_after_one);
        assert_eq!(crate::old_count(), old_after_one);
        let color = context::with_heap(|h| h.color_of(kept.addr())).unwrap();
        assert_eq!(color, GcColor::White);

        drop(root);
        crate::reset();
    }

    #[test]
    fn test_blocking_finishes_inflight_incremental_cycle() {
        crate::init(GcConfig::default());
        let kept = crate::alloc(Leaf);
        let _stray = crate::alloc(Leaf);
        let root = GcRef::new(Some(kept));

        crate::start_incremental_collect();
        crate::incremental_collect_step();
        crate::collect_now(true);

        assert_eq!(crate::phase(), crate::Phase::Idle);
        assert_eq!(crate::live_objects(), 1);

        drop(root);
        crate::reset();
    }
}
