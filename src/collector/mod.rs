//! Collection machinery: cycle phases and the shared mark/sweep
//! primitives used by both the incremental and the blocking drivers.
//!
//! # Tri-color invariant
//!
//! - **White**: not yet visited (candidate for reclamation)
//! - **Gray**: discovered, children not yet scanned (on the mark stack)
//! - **Black**: fully scanned
//!
//! No black object may point directly to a white object; the write
//! barrier re-grays children stored into discovered owners while a mark
//! phase is active.

pub(crate) mod blocking;
pub(crate) mod incremental;

use crate::heap::{gc_event, Heap};
use crate::roots::RefRegistry;
use crate::trace::{Managed, Tracer};
use crate::Generation;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Phase of the incremental collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No cycle in progress. The mark stack is empty.
    Idle,
    /// Cycle started; roots not yet seeded.
    MarkRoots,
    /// Draining the gray stack under the mark budget.
    Marking,
    /// Scanning the pools under the sweep budget.
    Sweep,
}

/// Position of an in-progress sweep.
///
/// The cursor walks a snapshot of the pool taken when the pool's sweep
/// began, so erasures and insertions during the sweep never invalidate
/// it: dead entries are removed from the live pool as they are reaped,
/// and objects allocated mid-sweep are simply absent from the snapshot.
#[derive(Debug)]
pub(crate) struct SweepCursor {
    snapshot: Vec<usize>,
    index: usize,
    /// Whether the old pool is the one being swept.
    pub(crate) sweeping_old: bool,
}

impl SweepCursor {
    /// A cursor pointing at nothing.
    pub(crate) fn idle() -> Self {
        Self {
            snapshot: Vec::new(),
            index: 0,
            sweeping_old: false,
        }
    }

    /// Snapshot a pool and start scanning it from the beginning.
    pub(crate) fn begin(pool: &FxHashSet<usize>, sweeping_old: bool) -> Self {
        Self {
            snapshot: pool.iter().copied().collect(),
            index: 0,
            sweeping_old,
        }
    }

    /// Next snapshot entry, advancing the cursor.
    pub(crate) fn next(&mut self) -> Option<usize> {
        let addr = self.snapshot.get(self.index).copied()?;
        self.index += 1;
        Some(addr)
    }

    /// Whether the snapshot has been fully scanned.
    pub(crate) fn exhausted(&self) -> bool {
        self.index >= self.snapshot.len()
    }
}

/// Tracer used while scanning an object: resolves member-reference
/// enumeration against the registry and buffers reported children.
struct MarkTracer<'a> {
    refs: &'a RefRegistry,
    children: SmallVec<[usize; 8]>,
}

impl Tracer for MarkTracer<'_> {
    fn trace_ptr(&mut self, ptr: *const ()) {
        if !ptr.is_null() {
            self.children.push(ptr as usize);
        }
    }

    fn trace_members(&mut self, owner: *const ()) {
        self.refs
            .collect_member_targets(owner as usize, &mut self.children);
    }
}

impl Heap {
    /// Seed the mark stack from every registered root.
    pub(crate) fn seed_roots(&mut self) {
        let targets = self.refs.root_targets();
        let mut seeded = 0;
        for addr in targets {
            if self.mark_gray(addr) {
                seeded += 1;
            }
        }
        gc_event(
            &self.config,
            format_args!("seeded {seeded} of {} roots", self.refs.root_count()),
        );
    }

    /// Blacken one object and gray its still-white children.
    pub(crate) fn scan_object(&mut self, addr: usize) {
        let Some(entry) = self.objects.get_mut(&addr) else {
            return;
        };
        entry.header.scanned = true;
        let object = entry.object;

        let mut tracer = MarkTracer {
            refs: &self.refs,
            children: SmallVec::new(),
        };
        // SAFETY: the object table owns `object`; nothing frees it while
        // a cycle is marking.
        unsafe { (*object).trace(&mut tracer) };
        let children = tracer.children;

        for child in children {
            self.mark_gray(child);
        }
    }

    /// Process one pool entry of the sweep: collect it if white,
    /// otherwise clear its marks and handle survival bookkeeping.
    pub(crate) fn sweep_entry(&mut self, addr: usize, sweeping_old: bool, dead: &mut Vec<usize>) {
        let Some(entry) = self.objects.get_mut(&addr) else {
            return;
        };

        if !entry.header.discovered {
            dead.push(addr);
            return;
        }

        if sweeping_old {
            entry.header.clear_marks();
            return;
        }

        entry.header.survivals += 1;
        if entry.header.survivals >= self.config.promotion_survivals {
            entry.header.generation = Generation::Old;
            entry.header.survivals = 0;
            // The mark stays set: the old-pool scan clears it, so a
            // same-cycle old sweep never sees the promoted object as
            // white.
            self.young.remove(&addr);
            self.old.insert(addr);
            self.stats.record_promotion();
            gc_event(&self.config, format_args!("promoted object {addr:#x}"));
        } else {
            entry.header.clear_marks();
        }
    }

    /// Reclaim a batch of dead objects: null every reference to them in
    /// one registry pass, unregister them, and hand their payloads to the
    /// caller to free outside the context borrow.
    pub(crate) fn reap(
        &mut self,
        dead: &[usize],
        sweeping_old: bool,
        corpses: &mut Vec<*mut dyn Managed>,
    ) {
        if dead.is_empty() {
            return;
        }

        let dead_set: FxHashSet<usize> = dead.iter().copied().collect();
        let nulled = self.refs.null_targets_of(&dead_set);

        for &addr in dead {
            self.refs.drop_members_of(addr);
            if let Some(entry) = self.objects.remove(&addr) {
                self.young.remove(&addr);
                self.old.remove(&addr);
                corpses.push(entry.object);
            }
        }

        self.stats.record_freed(dead.len());
        self.cycle_freed_total += dead.len();
        if !sweeping_old {
            self.cycle_freed_young += dead.len();
        }

        gc_event(
            &self.config,
            format_args!("reclaimed {} objects, nulled {nulled} refs", dead.len()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_cursor_walks_snapshot() {
        let pool: FxHashSet<usize> = [0x10, 0x20, 0x30].into_iter().collect();
        let mut cursor = SweepCursor::begin(&pool, false);

        let mut seen = Vec::new();
        while let Some(addr) = cursor.next() {
            seen.push(addr);
        }
        seen.sort_unstable();

        assert_eq!(seen, vec![0x10, 0x20, 0x30]);
        assert!(cursor.exhausted());
    }

    #[test]
    fn test_idle_cursor_is_exhausted() {
        let mut cursor = SweepCursor::idle();
        assert!(cursor.exhausted());
        assert_eq!(cursor.next(), None);
    }
}
