//! `GcRef<T>`: the registered managed reference.

use crate::alloc::GcPtr;
use crate::context;
use crate::roots::RefId;
use crate::trace::Managed;
use std::marker::PhantomData;

/// A typed, registered reference slot.
///
/// A `GcRef` is either a *root* (no owning object; its target is a
/// starting point for tracing) or a *member* (owned by a managed object;
/// its target is discovered when the owner is scanned). The slot state
/// lives in the collector context, so the handle itself can be moved
/// freely: moving keeps the registration, cloning creates a fresh slot
/// with the same owner and target.
///
/// Reads behave like a raw pointer: [`get`](GcRef::get), `Deref`,
/// [`is_null`](GcRef::is_null). Writes go through [`set`](GcRef::set),
/// which maintains root-set membership and fires the write barrier on
/// member stores. After a collection cycle, a `GcRef` whose target was
/// reclaimed reads as null.
///
/// # Example
///
/// ```ignore
/// let node = loam_gc::alloc_with(|this| Node {
///     next: GcRef::member(this, None),
/// });
/// let root = GcRef::new(Some(node)); // keeps `node` alive
/// node.next.set(Some(other));        // barrier-protected member store
/// ```
pub struct GcRef<T: Managed> {
    id: RefId,
    _marker: PhantomData<*const T>,
}

impl<T: Managed> GcRef<T> {
    /// Construct a root reference.
    ///
    /// A root with a non-null target is registered in the root set; a
    /// null root is not (the root set never holds null entries).
    pub fn new(target: Option<GcPtr<T>>) -> Self {
        let id = context::with_heap(|h| h.insert_root_slot(target.map(|p| p.addr())));
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Construct a null root reference.
    pub fn null() -> Self {
        Self::new(None)
    }

    /// Construct a member reference owned by `owner`.
    ///
    /// The slot is appended to the owner's member list; a non-null
    /// target fires the write barrier.
    pub fn member<O: Managed>(owner: GcPtr<O>, target: Option<GcPtr<T>>) -> Self {
        let id =
            context::with_heap(|h| h.attach_member(owner.addr(), target.map(|p| p.addr())));
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Current target, if any.
    pub fn get(&self) -> Option<GcPtr<T>> {
        context::with_heap(|h| h.ref_target(self.id))
            .map(|addr| unsafe { GcPtr::from_raw(addr as *mut T) })
    }

    /// Rebind the reference.
    ///
    /// Member slots fire the write barrier on every store, null stores
    /// included (a null child is a barrier no-op, but the call site stays
    /// uniform). Root slots leave the root set when nulled and re-enter
    /// it when rebound to a non-null target.
    pub fn set(&self, target: Option<GcPtr<T>>) {
        context::with_heap(|h| h.set_ref_target(self.id, target.map(|p| p.addr())));
    }

    /// Null the reference. Equivalent to `set(None)`.
    pub fn clear(&self) {
        self.set(None);
    }

    /// Check whether the reference is currently null.
    pub fn is_null(&self) -> bool {
        self.get().is_none()
    }
}

impl<T: Managed> Clone for GcRef<T> {
    /// Duplicate the reference as a fresh slot.
    ///
    /// A member clone is appended to the same owner's list and fires the
    /// write barrier; a root clone is registered iff the target is
    /// non-null. Root-set membership is never copied verbatim.
    fn clone(&self) -> Self {
        let id = context::with_heap(|h| h.clone_slot(self.id));
        Self {
            id,
            _marker: PhantomData,
        }
    }
}

impl<T: Managed> Drop for GcRef<T> {
    fn drop(&mut self) {
        // Tolerates slots already forgotten by a sweep or context reset,
        // and the context itself being torn down at thread exit.
        let id = self.id;
        context::try_with_heap(|h| h.release_slot(id));
    }
}

impl<T: Managed> std::ops::Deref for GcRef<T> {
    type Target = T;

    /// Dereference the target object.
    ///
    /// # Panics
    ///
    /// Panics if the reference is null. Null dereference is a programmer
    /// error and is never silently recovered.
    fn deref(&self) -> &Self::Target {
        let addr = context::with_heap(|h| h.ref_target(self.id))
            .expect("dereferenced a null managed reference");
        unsafe { &*(addr as *const T) }
    }
}

impl<T: Managed> std::ops::DerefMut for GcRef<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        let addr = context::with_heap(|h| h.ref_target(self.id))
            .expect("dereferenced a null managed reference");
        unsafe { &mut *(addr as *mut T) }
    }
}

impl<T: Managed> std::fmt::Debug for GcRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.get() {
            Some(ptr) => write!(f, "GcRef({:p})", ptr.as_ptr()),
            None => write!(f, "GcRef(null)"),
        }
    }
}

impl<T: Managed> Default for GcRef<T> {
    fn default() -> Self {
        Self::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GcConfig;
    use crate::trace::Tracer;

    struct Leaf {
        value: i32,
    }

    impl Managed for Leaf {
        fn trace(&self, _tracer: &mut dyn Tracer) {}
    }

    fn root_count() -> usize {
        context::with_heap(|h| h.refs.root_count())
    }

    #[test]
    fn test_null_root_never_touches_root_set() {
        crate::init(GcConfig::default());
        {
            let r = GcRef::<Leaf>::null();
            assert!(r.is_null());
            assert_eq!(root_count(), 0);
        }
        assert_eq!(root_count(), 0);
        crate::reset();
    }

    #[test]
    fn test_root_registration_tracks_target() {
        crate::init(GcConfig::default());
        let leaf = crate::alloc(Leaf { value: 1 });

        let r = GcRef::new(Some(leaf));
        assert_eq!(root_count(), 1);

        r.set(None);
        assert_eq!(root_count(), 0);

        r.set(Some(leaf));
        assert_eq!(root_count(), 1);

        drop(r);
        assert_eq!(root_count(), 0);
        crate::reset();
    }

    #[test]
    fn test_repeated_assignment_is_idempotent() {
        crate::init(GcConfig::default());
        let leaf = crate::alloc(Leaf { value: 1 });

        let r = GcRef::new(Some(leaf));
        for _ in 0..10 {
            r.set(Some(leaf));
        }
        assert_eq!(root_count(), 1);

        drop(r);
        crate::reset();
    }

    #[test]
    fn test_clone_registers_fresh_root() {
        crate::init(GcConfig::default());
        let leaf = crate::alloc(Leaf { value: 1 });

        let r = GcRef::new(Some(leaf));
        let c = r.clone();
        assert_eq!(root_count(), 2);
        assert!(c.get().unwrap().ptr_eq(&leaf));

        drop(r);
        assert_eq!(root_count(), 1);
        drop(c);
        assert_eq!(root_count(), 0);
        crate::reset();
    }

    #[test]
    fn test_clone_of_null_root_stays_unregistered() {
        crate::init(GcConfig::default());

        let r = GcRef::<Leaf>::null();
        let c = r.clone();
        assert_eq!(root_count(), 0);
        assert!(c.is_null());

        crate::reset();
    }

    #[test]
    fn test_member_clone_joins_owner_list() {
        crate::init(GcConfig::default());
        let owner = crate::alloc(Leaf { value: 0 });
        let target = crate::alloc(Leaf { value: 1 });

        let member = GcRef::member(owner, Some(target));
        let copy = member.clone();
        let members = context::with_heap(|h| h.refs.member_count(owner.addr()));
        assert_eq!(members, 2);
        assert!(copy.get().unwrap().ptr_eq(&target));

        drop(member);
        drop(copy);
        crate::reset();
    }

    #[test]
    fn test_deref_reads_target() {
        crate::init(GcConfig::default());
        let leaf = crate::alloc(Leaf { value: 42 });

        let r = GcRef::new(Some(leaf));
        assert_eq!(r.value, 42);

        drop(r);
        crate::reset();
    }

    #[test]
    #[should_panic(expected = "null managed reference")]
    fn test_null_deref_panics() {
        crate::init(GcConfig::default());
        let r = GcRef::<Leaf>::null();
        let _ = r.value;
    }
}
