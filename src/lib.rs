//! Loam Garbage Collector
//!
//! An incremental tri-color mark-and-sweep garbage collector with a
//! generational overlay, for host applications that want object lifetimes
//! managed by reachability instead of manual deallocation.
//!
//! # Architecture
//!
//! Managed objects form a directed graph through typed managed references:
//!
//! - **`GcPtr<T>`**: a raw, non-owning handle to a managed object. Cheap to
//!   copy, may dangle once the object is reclaimed.
//!
//! - **`GcRef<T>`**: a registered reference slot. A `GcRef` is either a
//!   *root* (owned by no object, a starting point for tracing) or a
//!   *member* (owned by some managed object, discovered during tracing).
//!   Slots register themselves on construction and unregister on drop, so
//!   the collector can enumerate the object graph without reflection.
//!
//! - **Collector context**: a thread-local heap holding the young and old
//!   pools, the root set, the mark stack, and the tuning parameters.
//!   Driven either blocking (`collect_now`) or incrementally
//!   (`start_incremental_collect` / `incremental_collect_step`).
//!
//! # Collection
//!
//! Marking is tri-color: white objects are unvisited candidates for
//! reclamation, gray objects are discovered but not yet scanned, black
//! objects are fully scanned. A Dijkstra-style write barrier runs on every
//! store through a member `GcRef` while a mark phase is active, so
//! incremental marking stays sound under mutation. Sweeping reclaims white
//! objects, nulls every surviving reference that pointed at them, and
//! promotes young survivors to the old pool once they have survived enough
//! cycles.
//!
//! # Usage
//!
//! ```ignore
//! use loam_gc::{alloc_with, GcConfig, GcRef, Managed};
//!
//! struct Node {
//!     next: GcRef<Node>,
//! }
//!
//! impl Managed for Node {}
//!
//! loam_gc::init(GcConfig::default());
//!
//! let node = alloc_with(|this| Node {
//!     next: GcRef::member(this, None),
//! });
//! let root = GcRef::new(Some(node));
//!
//! loam_gc::collect_now(true); // node survives: reachable from `root`
//! ```
//!
//! # Safety
//!
//! The collector is single-threaded cooperative: the mutator and the
//! collector share one thread, and the mutator calls into the collector at
//! well-defined points (allocation, registration, the write barrier,
//! explicit collection). Custom [`Managed::trace`] implementations run
//! while the collector is active and must only report children; they must
//! not allocate, build or rebind references, or drive a collection.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod barrier;
pub mod collector;
pub mod config;
pub mod roots;
pub mod trace;

mod alloc;
mod context;
mod heap;
mod stats;

// Re-exports for convenient access
pub use alloc::GcPtr;
pub use barrier::write_barrier;
pub use collector::Phase;
pub use config::{ConfigError, GcConfig};
pub use context::{
    alloc, alloc_with, collect_now, contains, generation_of, incremental_collect_step, init,
    live_objects, old_count, phase, reset, root_count, set_allocation_threshold, set_debug,
    set_mark_budget, set_promotion_survivals, set_sweep_budget, start_incremental_collect, stats,
    young_count,
};
pub use roots::GcRef;
pub use stats::{GcStats, StatsSnapshot};
pub use trace::{CountingTracer, Managed, Tracer};

/// GC color for the tri-color marking algorithm.
///
/// Colors are encoded by the per-object `(discovered, scanned)` flag pair:
/// white = `(false, false)`, gray = `(true, false)`, black = `(true, true)`.
/// The tri-color invariant states that no black object may point directly
/// to a white object; the write barrier re-grays children when necessary.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcColor {
    /// Not yet visited (candidate for reclamation).
    White = 0,
    /// Discovered, children not yet scanned (on the mark stack).
    Gray = 1,
    /// Fully scanned (reachable, all children enumerated).
    Black = 2,
}

impl GcColor {
    /// Decode a color from the per-object flag pair.
    #[inline]
    pub fn from_flags(discovered: bool, scanned: bool) -> Self {
        match (discovered, scanned) {
            (false, _) => GcColor::White,
            (true, false) => GcColor::Gray,
            (true, true) => GcColor::Black,
        }
    }
}

/// Generation identifier for generational collection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Generation {
    /// Young generation: every object starts here.
    Young = 0,
    /// Old generation: objects promoted after enough survivals.
    Old = 1,
}

impl Generation {
    /// Check if this is the young generation.
    #[inline]
    pub fn is_young(self) -> bool {
        matches!(self, Generation::Young)
    }

    /// Check if this is the old generation.
    #[inline]
    pub fn is_old(self) -> bool {
        matches!(self, Generation::Old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_flags() {
        assert_eq!(GcColor::from_flags(false, false), GcColor::White);
        assert_eq!(GcColor::from_flags(true, false), GcColor::Gray);
        assert_eq!(GcColor::from_flags(true, true), GcColor::Black);
        // `scanned` without `discovered` cannot occur; decoding treats it as white
        assert_eq!(GcColor::from_flags(false, true), GcColor::White);
    }

    #[test]
    fn test_generation_predicates() {
        assert!(Generation::Young.is_young());
        assert!(!Generation::Young.is_old());
        assert!(Generation::Old.is_old());
        assert!(Generation::Young < Generation::Old);
    }
}
