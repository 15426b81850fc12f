//! Incremental cycle driver.
//!
//! A cycle is a sequence of bounded steps: seed the roots, drain the
//! gray stack under the mark budget, then scan the young and old pools
//! under the sweep budget. Each step does a fixed amount of work and
//! returns; the mutator interleaves freely, kept sound by the write
//! barrier.

use crate::collector::{Phase, SweepCursor};
use crate::heap::{gc_event, Heap};
use crate::trace::Managed;

impl Heap {
    /// Begin an incremental cycle. A no-op while a cycle is in progress.
    pub(crate) fn start_incremental_collect(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        gc_event(&self.config, format_args!("starting incremental collect"));
        self.mark_stack.clear();
        self.cursor = SweepCursor::idle();
        self.cycle_freed_young = 0;
        self.cycle_freed_total = 0;
        self.phase = Phase::MarkRoots;
    }

    /// Run one bounded step of the cycle.
    ///
    /// Returns true iff the phase is, or just became, `Idle`. Dead
    /// payloads are appended to `corpses` for the caller to free outside
    /// the context borrow.
    pub(crate) fn incremental_collect_step(
        &mut self,
        corpses: &mut Vec<*mut dyn Managed>,
    ) -> bool {
        if self.phase == Phase::Idle {
            return true;
        }
        self.stats.record_step();

        match self.phase {
            Phase::Idle => true,
            Phase::MarkRoots => {
                self.seed_roots();
                self.phase = Phase::Marking;
                // One eager mark unit so a single step after start makes
                // forward progress. The sweep transition waits for the
                // next step: stores issued right after this step still
                // observe an active mark phase, which the barrier needs.
                self.mark_step();
                false
            }
            Phase::Marking => {
                if !self.mark_step() {
                    self.begin_sweep(false);
                }
                false
            }
            Phase::Sweep => {
                let mut more = self.sweep_step(corpses);
                if !more && !self.cursor.sweeping_old {
                    // Young pool exhausted: move to the old pool in the
                    // same step.
                    self.begin_sweep(true);
                    more = self.sweep_step(corpses);
                }
                if more {
                    false
                } else {
                    self.finish_cycle();
                    true
                }
            }
        }
    }

    /// Blacken up to `mark_budget` gray objects. Returns whether gray
    /// objects remain.
    fn mark_step(&mut self) -> bool {
        let mut work = 0;
        while work < self.config.mark_budget {
            let Some(addr) = self.mark_stack.pop() else {
                break;
            };
            self.scan_object(addr);
            work += 1;
        }
        gc_event(
            &self.config,
            format_args!("mark step scanned {work}, {} gray left", self.mark_stack.len()),
        );
        !self.mark_stack.is_empty()
    }

    /// Snapshot a pool and enter the sweep phase over it.
    fn begin_sweep(&mut self, sweeping_old: bool) {
        let pool = if sweeping_old { &self.old } else { &self.young };
        self.cursor = SweepCursor::begin(pool, sweeping_old);
        self.phase = Phase::Sweep;
        gc_event(
            &self.config,
            format_args!(
                "sweeping {} pool ({} entries)",
                if sweeping_old { "old" } else { "young" },
                pool.len()
            ),
        );
    }

    /// Scan up to `sweep_budget` entries of the current pool snapshot.
    /// Returns whether snapshot entries remain.
    fn sweep_step(&mut self, corpses: &mut Vec<*mut dyn Managed>) -> bool {
        let sweeping_old = self.cursor.sweeping_old;
        let mut dead = Vec::new();
        let mut work = 0;

        while work < self.config.sweep_budget {
            let Some(addr) = self.cursor.next() else {
                break;
            };
            work += 1;
            // Entries can leave the pool mid-sweep (promotion); skip any
            // snapshot entry no longer present.
            let in_pool = if sweeping_old {
                self.old.contains(&addr)
            } else {
                self.young.contains(&addr)
            };
            if !in_pool {
                continue;
            }
            self.sweep_entry(addr, sweeping_old, &mut dead);
        }

        self.reap(&dead, sweeping_old, corpses);
        !self.cursor.exhausted()
    }

    /// Close out a finished cycle and adapt the thresholds.
    fn finish_cycle(&mut self) {
        self.phase = Phase::Idle;
        self.cursor = SweepCursor::idle();
        self.last_minor_freed = self.cycle_freed_young;
        self.last_major_freed = self.cycle_freed_total;
        self.stats.record_major();
        gc_event(
            &self.config,
            format_args!(
                "incremental collection finished: freed {} ({} young)",
                self.cycle_freed_total, self.cycle_freed_young
            ),
        );
        self.adapt_thresholds();
    }
}
