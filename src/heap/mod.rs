//! The collector heap: object table, generation pools, and tuning state.
//!
//! The heap owns every managed object (it alone frees them), the two
//! generation pools, the reference registry, and the incremental cycle
//! state. Objects are keyed by address, the same identity the raw
//! `GcPtr` handles carry.

pub(crate) mod object;

pub(crate) use object::{ObjectEntry, ObjectHeader};

use crate::collector::{Phase, SweepCursor};
use crate::config::GcConfig;
use crate::roots::{RefId, RefRegistry};
use crate::stats::GcStats;
use crate::trace::Managed;
use crate::Generation;

use rustc_hash::{FxHashMap, FxHashSet};

/// Main collector state for one context.
pub(crate) struct Heap {
    /// Configuration and runtime-tunable knobs.
    pub(crate) config: GcConfig,

    /// Every live object, keyed by address.
    pub(crate) objects: FxHashMap<usize, ObjectEntry>,

    /// Young pool. Disjoint from `old`; every object is in exactly one.
    pub(crate) young: FxHashSet<usize>,

    /// Old pool.
    pub(crate) old: FxHashSet<usize>,

    /// Reference slots, root set, and member lists.
    pub(crate) refs: RefRegistry,

    /// Gray stack: discovered but not yet scanned. Empty while idle.
    pub(crate) mark_stack: Vec<usize>,

    /// Incremental cycle phase.
    pub(crate) phase: Phase,

    /// Sweep position within the current pool snapshot.
    pub(crate) cursor: SweepCursor,

    /// Allocations since the last automatic cycle start.
    pub(crate) allocation_counter: usize,

    /// Young-pool objects freed by the last completed cycle.
    pub(crate) last_minor_freed: usize,

    /// Total objects freed by the last completed major cycle.
    pub(crate) last_major_freed: usize,

    /// Young-pool objects freed so far in the cycle in progress.
    pub(crate) cycle_freed_young: usize,

    /// Total objects freed so far in the cycle in progress.
    pub(crate) cycle_freed_total: usize,

    /// Collection statistics.
    pub(crate) stats: GcStats,
}

impl Heap {
    /// Create a heap with the given configuration.
    pub(crate) fn new(config: GcConfig) -> Self {
        config.validate().expect("invalid GC configuration");

        Self {
            config,
            objects: FxHashMap::default(),
            young: FxHashSet::default(),
            old: FxHashSet::default(),
            refs: RefRegistry::new(),
            mark_stack: Vec::new(),
            phase: Phase::Idle,
            cursor: SweepCursor::idle(),
            allocation_counter: 0,
            last_minor_freed: 0,
            last_major_freed: 0,
            cycle_freed_young: 0,
            cycle_freed_total: 0,
            stats: GcStats::new(),
        }
    }

    /// Apply a new configuration to a running context.
    pub(crate) fn configure(&mut self, config: GcConfig) {
        config.validate().expect("invalid GC configuration");
        gc_event(
            &config,
            format_args!(
                "gc configured: mark_budget={} sweep_budget={} allocation_threshold={} promotion_survivals={}",
                config.mark_budget,
                config.sweep_budget,
                config.allocation_threshold,
                config.promotion_survivals
            ),
        );
        self.config = config;
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a freshly allocated object into the young pool and drive
    /// the allocation trigger.
    pub(crate) fn register_object(&mut self, object: *mut dyn Managed) {
        let addr = object as *mut () as usize;
        self.objects.insert(addr, ObjectEntry {
            header: ObjectHeader::new(),
            object,
        });
        self.young.insert(addr);
        self.stats.record_allocation();

        // Objects allocated while marking is active are allocated gray so
        // an in-progress cycle cannot reclaim them; objects allocated
        // during a sweep are outside the sweep snapshot and survive.
        if matches!(self.phase, Phase::MarkRoots | Phase::Marking) {
            self.mark_gray(addr);
        }

        self.allocation_counter += 1;
        if self.allocation_counter >= self.config.allocation_threshold {
            self.allocation_counter = 0;
            self.start_incremental_collect();
        }
    }

    // =========================================================================
    // Reference slots (GcRef support)
    // =========================================================================

    /// Register a root slot.
    pub(crate) fn insert_root_slot(&mut self, target: Option<usize>) -> RefId {
        self.refs.insert_root(target)
    }

    /// Register a member slot and fire the write barrier on its initial
    /// target.
    pub(crate) fn attach_member(&mut self, owner: usize, target: Option<usize>) -> RefId {
        let id = self.refs.insert_member(owner, target);
        self.barrier_on_store(owner, target);
        id
    }

    /// Rebind a slot, firing the write barrier for member stores.
    pub(crate) fn set_ref_target(&mut self, id: RefId, target: Option<usize>) {
        if let Some(Some(owner)) = self.refs.set_target(id, target) {
            self.barrier_on_store(owner, target);
        }
    }

    /// Duplicate a slot: members join the same owner's list (with a
    /// barrier), roots register iff the target is non-null. A stale id
    /// duplicates to a detached null root.
    pub(crate) fn clone_slot(&mut self, id: RefId) -> RefId {
        match self.refs.slot_of(id) {
            Some((Some(owner), target)) => self.attach_member(owner, target),
            Some((None, target)) => self.refs.insert_root(target),
            None => self.refs.insert_root(None),
        }
    }

    /// Current target of a slot.
    pub(crate) fn ref_target(&self, id: RefId) -> Option<usize> {
        self.refs.target_of(id)
    }

    /// Release a slot (idempotent).
    pub(crate) fn release_slot(&mut self, id: RefId) {
        self.refs.release(id);
    }

    // =========================================================================
    // Marking support
    // =========================================================================

    /// Mark an object gray and push it, if it is currently white.
    /// Returns true if the object was newly discovered.
    pub(crate) fn mark_gray(&mut self, addr: usize) -> bool {
        match self.objects.get_mut(&addr) {
            Some(entry) if !entry.header.discovered => {
                entry.header.discovered = true;
                self.mark_stack.push(addr);
                true
            }
            _ => false,
        }
    }

    // =========================================================================
    // Space queries
    // =========================================================================

    /// Check if an address is a live managed object.
    #[inline]
    pub(crate) fn contains(&self, addr: usize) -> bool {
        self.objects.contains_key(&addr)
    }

    /// Generation of a live object.
    pub(crate) fn generation_of(&self, addr: usize) -> Option<Generation> {
        self.objects.get(&addr).map(|e| e.header.generation)
    }

    /// Tri-color state of a live object.
    #[cfg(test)]
    pub(crate) fn color_of(&self, addr: usize) -> Option<crate::GcColor> {
        self.objects.get(&addr).map(|e| e.header.color())
    }

    /// Number of live objects.
    #[inline]
    pub(crate) fn live_objects(&self) -> usize {
        self.objects.len()
    }

    // =========================================================================
    // Adaptive thresholds
    // =========================================================================

    /// Adjust tuning knobs after a completed cycle.
    ///
    /// Young-sparse heaps relax the promotion threshold, churning heaps
    /// tighten it, and large heaps double the allocation threshold to
    /// amortize collection cost.
    pub(crate) fn adapt_thresholds(&mut self) {
        let promotion = self.config.promotion_survivals as usize;
        if self.last_minor_freed < promotion / 10 && self.config.promotion_survivals < 2000 {
            self.config.promotion_survivals = self.config.promotion_survivals * 3 / 2;
        } else if self.last_minor_freed > promotion / 2 && self.config.promotion_survivals > 20 {
            self.config.promotion_survivals = self.config.promotion_survivals * 4 / 5;
        }

        let live = self.young.len() + self.old.len();
        if live > 1000 && self.config.allocation_threshold < 100_000 {
            self.config.allocation_threshold *= 2;
        }

        gc_event(
            &self.config,
            format_args!(
                "thresholds adapted: promotion_survivals={} allocation_threshold={}",
                self.config.promotion_survivals, self.config.allocation_threshold
            ),
        );
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Drain every object and clear all collector state, returning the
    /// payloads for the caller to free outside the context borrow.
    pub(crate) fn take_everything(&mut self) -> Vec<*mut dyn Managed> {
        let corpses: Vec<*mut dyn Managed> =
            self.objects.drain().map(|(_, entry)| entry.object).collect();
        self.young.clear();
        self.old.clear();
        self.refs.clear_slots();
        self.mark_stack.clear();
        self.phase = Phase::Idle;
        self.cursor = SweepCursor::idle();
        self.allocation_counter = 0;
        self.last_minor_freed = 0;
        self.last_major_freed = 0;
        self.cycle_freed_young = 0;
        self.cycle_freed_total = 0;
        self.stats.reset();
        corpses
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        // Shutdown with populated pools: free everything without marking.
        // Member refs inside the dying objects tolerate the context
        // already being gone.
        let corpses: Vec<*mut dyn Managed> =
            self.objects.drain().map(|(_, entry)| entry.object).collect();
        self.young.clear();
        self.old.clear();
        self.refs.clear_slots();
        for ptr in corpses {
            unsafe { drop(Box::from_raw(ptr)) };
        }
    }
}

/// Emit one collector event: always through `log`, and as a timestamped
/// stdout line when debug tracing is enabled.
pub(crate) fn gc_event(config: &GcConfig, args: std::fmt::Arguments<'_>) {
    log::trace!(target: "gc", "{args}");
    if config.debug {
        println!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapt_relaxes_when_young_sparse() {
        let mut heap = Heap::new(GcConfig::default());
        heap.last_minor_freed = 0; // nothing freed: heap is young-sparse

        heap.adapt_thresholds();
        assert_eq!(heap.config.promotion_survivals, 75);
    }

    #[test]
    fn test_adapt_tightens_when_churning() {
        let mut heap = Heap::new(GcConfig::default());
        heap.last_minor_freed = 40; // more than half the threshold freed

        heap.adapt_thresholds();
        assert_eq!(heap.config.promotion_survivals, 40);
    }

    #[test]
    fn test_adapt_keeps_small_thresholds_stable() {
        let mut heap = Heap::new(GcConfig::eager_promotion());
        heap.last_minor_freed = 10;

        heap.adapt_thresholds();
        // shrinking stops at 20; 2 stays 2
        assert_eq!(heap.config.promotion_survivals, 2);
    }

    #[test]
    fn test_adapt_doubles_allocation_threshold_on_large_heaps() {
        let mut heap = Heap::new(GcConfig::default());
        heap.last_minor_freed = 30; // keep the promotion branch quiet
        for addr in 0..1200usize {
            heap.young.insert(0x10000 + addr * 8);
        }

        heap.adapt_thresholds();
        assert_eq!(heap.config.allocation_threshold, 200);
    }

    #[test]
    #[should_panic(expected = "invalid GC configuration")]
    fn test_invalid_configuration_rejected() {
        let _ = Heap::new(GcConfig {
            mark_budget: 0,
            ..Default::default()
        });
    }
}
