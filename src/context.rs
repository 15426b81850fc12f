//! Thread-local collector context and the public driver API.
//!
//! Each thread owns one collector. Handles (`GcPtr`, `GcRef`) belong to
//! the context of the thread that created them; the mutator and the
//! collector share that thread, which is what makes the cooperative
//! model sound. Tests get a fresh collector per test for free, since the
//! test harness runs each test on its own thread.

use crate::alloc::GcPtr;
use crate::collector::Phase;
use crate::config::GcConfig;
use crate::heap::Heap;
use crate::stats::StatsSnapshot;
use crate::trace::Managed;
use crate::Generation;

use std::cell::RefCell;
use std::ptr::NonNull;

thread_local! {
    static HEAP: RefCell<Heap> = RefCell::new(Heap::new(GcConfig::default()));
}

/// Run a closure against this thread's collector.
pub(crate) fn with_heap<R>(f: impl FnOnce(&mut Heap) -> R) -> R {
    HEAP.with(|cell| f(&mut cell.borrow_mut()))
}

/// Like [`with_heap`], but tolerates the context already being torn
/// down at thread exit. Used by handle destructors.
pub(crate) fn try_with_heap<R>(f: impl FnOnce(&mut Heap) -> R) -> Option<R> {
    HEAP.try_with(|cell| f(&mut cell.borrow_mut())).ok()
}

/// Free a batch of reclaimed payloads.
///
/// Runs outside the context borrow so the destructors can detach their
/// own member references (and even allocate) re-entrantly.
fn drop_corpses(corpses: Vec<*mut dyn Managed>) {
    for ptr in corpses {
        // SAFETY: each pointer came from `Box::leak` at allocation and
        // was removed from the object table exactly once.
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

/// Configure this thread's collector.
///
/// May be called at any time; pools and registered references are kept.
/// Using the collector before `init` runs on the defaults.
///
/// # Panics
///
/// Panics if the configuration fails validation.
pub fn init(config: GcConfig) {
    with_heap(|h| h.configure(config));
}

/// Allocate a managed object.
///
/// The object starts white in the young pool. Allocation drives the
/// collection trigger: crossing the allocation threshold starts an
/// incremental cycle.
pub fn alloc<T: Managed>(value: T) -> GcPtr<T> {
    let ptr = NonNull::from(Box::leak(Box::new(value)));
    register(ptr)
}

/// Allocate a managed object that holds member references to itself.
///
/// The closure receives the object's own handle before the value is in
/// place, so fields can be built with `GcRef::member(this, ...)`. The
/// handle must only be stored during the call, not dereferenced.
///
/// # Example
///
/// ```ignore
/// let node = loam_gc::alloc_with(|this| Node {
///     next: GcRef::member(this, None),
/// });
/// ```
pub fn alloc_with<T: Managed, F>(init: F) -> GcPtr<T>
where
    F: FnOnce(GcPtr<T>) -> T,
{
    let mut storage = Box::<T>::new_uninit();
    let raw: *mut T = storage.as_mut_ptr();
    // SAFETY: the storage outlives the call; the handle is only an
    // address until `init` returns and the value is written.
    let this = unsafe { GcPtr::from_raw(raw) };
    let value = init(this);
    // SAFETY: `raw` points at the uninitialized storage.
    unsafe { raw.write(value) };
    // SAFETY: just initialized above.
    let boxed = unsafe { storage.assume_init() };
    let ptr = NonNull::from(Box::leak(boxed));
    register(ptr)
}

fn register<T: Managed>(ptr: NonNull<T>) -> GcPtr<T> {
    let object: *mut dyn Managed = ptr.as_ptr();
    with_heap(|h| h.register_object(object));
    // SAFETY: freshly registered and live.
    unsafe { GcPtr::from_non_null(ptr) }
}

/// Run a blocking collection cycle.
///
/// `major` sweeps both pools; a minor collection marks globally but
/// sweeps only the young pool, clearing marks on old survivors. Any
/// in-flight incremental cycle is driven to completion first.
pub fn collect_now(major: bool) {
    let corpses = with_heap(|h| {
        let mut corpses = Vec::new();
        h.collect_now(major, &mut corpses);
        corpses
    });
    drop_corpses(corpses);
}

/// Start an incremental collection cycle. A no-op while one is already
/// in progress.
pub fn start_incremental_collect() {
    with_heap(|h| h.start_incremental_collect());
}

/// Run one bounded step of the incremental cycle.
///
/// Returns true iff the cycle is complete (or none was in progress).
pub fn incremental_collect_step() -> bool {
    let (done, corpses) = with_heap(|h| {
        let mut corpses = Vec::new();
        let done = h.incremental_collect_step(&mut corpses);
        (done, corpses)
    });
    drop_corpses(corpses);
    done
}

/// Set the maximum objects blackened per incremental step.
pub fn set_mark_budget(budget: usize) {
    with_heap(|h| h.config.mark_budget = budget.max(1));
}

/// Set the maximum pool entries examined per incremental step.
pub fn set_sweep_budget(budget: usize) {
    with_heap(|h| h.config.sweep_budget = budget.max(1));
}

/// Set the number of allocations between automatic cycle starts.
pub fn set_allocation_threshold(threshold: usize) {
    with_heap(|h| h.config.allocation_threshold = threshold.max(1));
}

/// Set the survivals before a young object is promoted.
pub fn set_promotion_survivals(survivals: u32) {
    with_heap(|h| h.config.promotion_survivals = survivals.max(1));
}

/// Enable or disable timestamped debug trace lines on stdout.
pub fn set_debug(debug: bool) {
    with_heap(|h| h.config.debug = debug);
}

/// Number of live managed objects.
pub fn live_objects() -> usize {
    with_heap(|h| h.live_objects())
}

/// Number of objects in the young pool.
pub fn young_count() -> usize {
    with_heap(|h| h.young.len())
}

/// Number of objects in the old pool.
pub fn old_count() -> usize {
    with_heap(|h| h.old.len())
}

/// Number of registered (non-null) roots.
pub fn root_count() -> usize {
    with_heap(|h| h.refs.root_count())
}

/// Current phase of the incremental cycle.
pub fn phase() -> Phase {
    with_heap(|h| h.phase)
}

/// Generation of a live object, or `None` if it has been reclaimed.
pub fn generation_of<T: Managed>(ptr: GcPtr<T>) -> Option<Generation> {
    with_heap(|h| h.generation_of(ptr.addr()))
}

/// Check whether a handle still refers to a live object.
pub fn contains<T: Managed>(ptr: GcPtr<T>) -> bool {
    with_heap(|h| h.contains(ptr.addr()))
}

/// Snapshot the collector's statistics counters.
pub fn stats() -> StatsSnapshot {
    with_heap(|h| h.stats.snapshot())
}

/// Tear down this thread's collector: every remaining object is freed
/// (without marking) and all collector state is cleared. Outstanding
/// handles read as null afterwards.
pub fn reset() {
    let corpses = with_heap(|h| h.take_everything());
    drop_corpses(corpses);
}
