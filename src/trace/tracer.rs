//! Tracer interface used during child enumeration.

use crate::alloc::GcPtr;
use crate::trace::Managed;

/// Visitor handed to [`Managed::trace`](crate::Managed::trace).
///
/// During marking the collector supplies a tracer that grays reported
/// children; tests can supply their own to observe enumeration.
pub trait Tracer {
    /// Report one child object by erased pointer. Null pointers are
    /// skipped silently.
    fn trace_ptr(&mut self, ptr: *const ());

    /// Report every registered member reference of `owner`.
    ///
    /// This is what the default [`Managed::trace`](crate::Managed::trace)
    /// calls; overrides that still hold `GcRef` members re-request them
    /// through this method.
    fn trace_members(&mut self, owner: *const ());
}

impl<'a> dyn Tracer + 'a {
    /// Report one child object by typed handle.
    #[inline]
    pub fn trace<T: Managed>(&mut self, child: GcPtr<T>) {
        self.trace_ptr(child.erase());
    }
}

/// A tracer that counts what it is shown. Useful in tests.
#[derive(Debug, Default)]
pub struct CountingTracer {
    /// Number of non-null pointers reported.
    pub ptr_count: usize,
    /// Number of member-reference enumeration requests.
    pub member_requests: usize,
}

impl CountingTracer {
    /// Create a new counting tracer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tracer for CountingTracer {
    fn trace_ptr(&mut self, ptr: *const ()) {
        if !ptr.is_null() {
            self.ptr_count += 1;
        }
    }

    fn trace_members(&mut self, _owner: *const ()) {
        self.member_requests += 1;
    }
}
