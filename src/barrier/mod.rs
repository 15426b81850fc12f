//! Write barrier for incremental marking.
//!
//! Dijkstra-style insertion barrier: while a mark phase is active, a
//! store of a still-white child into a discovered (gray or black) owner
//! grays the child. This preserves the tri-color invariant (no black
//! object ever references a white object) under arbitrary mutation
//! between incremental steps.
//!
//! The barrier runs *after* the target field is updated (post-write),
//! and on **every** store through a member reference, null stores
//! included; a null child is a no-op, but the uniform call site keeps
//! the store path simple. Outside the mark phases the barrier does
//! nothing.

use crate::alloc::GcPtr;
use crate::collector::Phase;
use crate::context;
use crate::heap::{gc_event, Heap};
use crate::trace::Managed;

impl Heap {
    /// Barrier hook for a store of `child` into a member slot of
    /// `owner`. Both are object addresses; `child` is `None` for null
    /// stores.
    #[inline]
    pub(crate) fn barrier_on_store(&mut self, owner: usize, child: Option<usize>) {
        if !matches!(self.phase, Phase::MarkRoots | Phase::Marking) {
            return;
        }
        let Some(child) = child else {
            return;
        };
        let owner_discovered = self
            .objects
            .get(&owner)
            .map_or(false, |entry| entry.header.discovered);
        if !owner_discovered {
            return;
        }
        if self.mark_gray(child) {
            gc_event(
                &self.config,
                format_args!("write barrier grayed child {child:#x}"),
            );
        }
    }
}

/// Fire the write barrier for a store performed by hand.
///
/// Stores through [`GcRef::set`](crate::GcRef::set) run the barrier
/// automatically; this entry point covers code that rewrites a child
/// link it holds outside a registered slot. Call it after the store.
#[inline]
pub fn write_barrier<O: Managed, T: Managed>(owner: GcPtr<O>, child: Option<GcPtr<T>>) {
    context::with_heap(|h| h.barrier_on_store(owner.addr(), child.map(|c| c.addr())));
}
