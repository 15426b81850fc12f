//! Reference registries: root set and member-reference tracking.
//!
//! Every `GcRef` owns a slot in the registry. The slot carries the
//! current target and, for member references, the owning object. Keeping
//! the slot state collector-side (instead of inside the handle, as a
//! pointer-based design would) does two things:
//!
//! - handles stay free to move (Rust values move by plain copy, so
//!   address-based registration of the handle itself would dangle);
//! - the sweep-time dangling-null pass is a single walk over the slot
//!   table, O(refs), instead of a walk over every object's fan-out.

mod handles;

pub use handles::GcRef;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Identifier of a reference slot. Never reused within a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RefId(u64);

/// One registered reference slot.
#[derive(Debug, Clone, Copy)]
struct RefEntry {
    /// Address of the referenced object, if any.
    target: Option<usize>,
    /// Address of the owning object; `None` marks a root slot.
    owner: Option<usize>,
}

/// Slot table, root set, and per-owner member lists.
///
/// Invariants maintained here:
/// - a slot id is in `roots` iff its entry has no owner and a non-null
///   target (the root set is an enumerable live-reference list);
/// - a member slot appears exactly once in its owner's list, in
///   insertion order;
/// - release and unregistration are idempotent.
pub(crate) struct RefRegistry {
    slots: FxHashMap<RefId, RefEntry>,
    roots: FxHashSet<RefId>,
    members: FxHashMap<usize, SmallVec<[RefId; 4]>>,
    next_id: u64,
}

impl RefRegistry {
    pub(crate) fn new() -> Self {
        Self {
            slots: FxHashMap::default(),
            roots: FxHashSet::default(),
            members: FxHashMap::default(),
            next_id: 0,
        }
    }

    fn fresh_id(&mut self) -> RefId {
        let id = RefId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register a root slot. Null roots get a slot but stay out of the
    /// root set.
    pub(crate) fn insert_root(&mut self, target: Option<usize>) -> RefId {
        let id = self.fresh_id();
        self.slots.insert(
            id,
            RefEntry {
                target,
                owner: None,
            },
        );
        if target.is_some() {
            self.roots.insert(id);
        }
        id
    }

    /// Register a member slot and append it to the owner's list.
    pub(crate) fn insert_member(&mut self, owner: usize, target: Option<usize>) -> RefId {
        let id = self.fresh_id();
        self.slots.insert(
            id,
            RefEntry {
                target,
                owner: Some(owner),
            },
        );
        self.members.entry(owner).or_default().push(id);
        id
    }

    /// Release a slot: detach from the owner's list or the root set and
    /// forget it. A no-op for already-released ids.
    pub(crate) fn release(&mut self, id: RefId) {
        let Some(entry) = self.slots.remove(&id) else {
            return;
        };
        match entry.owner {
            Some(owner) => {
                if let Some(list) = self.members.get_mut(&owner) {
                    list.retain(|m| *m != id);
                    if list.is_empty() {
                        self.members.remove(&owner);
                    }
                }
            }
            None => {
                self.roots.remove(&id);
            }
        }
    }

    /// Rebind a slot's target, maintaining root-set membership.
    ///
    /// Returns the slot's owner (`Some(None)` for a root slot) so the
    /// caller can fire the write barrier, or `None` for a stale id.
    pub(crate) fn set_target(
        &mut self,
        id: RefId,
        target: Option<usize>,
    ) -> Option<Option<usize>> {
        let entry = self.slots.get_mut(&id)?;
        entry.target = target;
        let owner = entry.owner;
        if owner.is_none() {
            match target {
                Some(_) => {
                    self.roots.insert(id);
                }
                None => {
                    self.roots.remove(&id);
                }
            }
        }
        Some(owner)
    }

    /// Current target of a slot, if the slot exists and is non-null.
    pub(crate) fn target_of(&self, id: RefId) -> Option<usize> {
        self.slots.get(&id).and_then(|e| e.target)
    }

    /// Owner and target of a slot, for duplicating it.
    pub(crate) fn slot_of(&self, id: RefId) -> Option<(Option<usize>, Option<usize>)> {
        self.slots.get(&id).map(|e| (e.owner, e.target))
    }

    /// Whether a slot is currently registered in the root set.
    #[cfg(test)]
    pub(crate) fn is_registered_root(&self, id: RefId) -> bool {
        self.roots.contains(&id)
    }

    /// Targets of every registered root, for mark seeding.
    pub(crate) fn root_targets(&self) -> SmallVec<[usize; 16]> {
        let mut out = SmallVec::new();
        for id in &self.roots {
            if let Some(entry) = self.slots.get(id) {
                if let Some(target) = entry.target {
                    out.push(target);
                }
            }
        }
        out
    }

    /// Append the non-null member targets of `owner`, in insertion order.
    pub(crate) fn collect_member_targets(&self, owner: usize, out: &mut SmallVec<[usize; 8]>) {
        let Some(list) = self.members.get(&owner) else {
            return;
        };
        for id in list {
            if let Some(entry) = self.slots.get(id) {
                if let Some(target) = entry.target {
                    out.push(target);
                }
            }
        }
    }

    /// Null every slot whose target is in `dead`, unregistering root
    /// slots as they become null. Returns how many slots were nulled.
    pub(crate) fn null_targets_of(&mut self, dead: &FxHashSet<usize>) -> usize {
        let mut nulled = 0;
        for (id, entry) in self.slots.iter_mut() {
            if let Some(target) = entry.target {
                if dead.contains(&target) {
                    entry.target = None;
                    if entry.owner.is_none() {
                        self.roots.remove(id);
                    }
                    nulled += 1;
                }
            }
        }
        nulled
    }

    /// Forget every member slot owned by a dying object. Its handles may
    /// still be dropped later; release tolerates the missing slots.
    pub(crate) fn drop_members_of(&mut self, owner: usize) {
        if let Some(list) = self.members.remove(&owner) {
            for id in list {
                self.slots.remove(&id);
            }
        }
    }

    /// Number of member slots registered to `owner`.
    #[cfg(test)]
    pub(crate) fn member_count(&self, owner: usize) -> usize {
        self.members.get(&owner).map_or(0, |list| list.len())
    }

    /// Number of registered roots.
    pub(crate) fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Number of live slots.
    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Forget all slots and lists but keep the id counter, so handles
    /// that outlive a context reset cannot collide with new slots.
    pub(crate) fn clear_slots(&mut self) {
        self.slots.clear();
        self.roots.clear();
        self.members.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: usize = 0x1000;
    const B: usize = 0x2000;
    const OWNER: usize = 0x3000;

    #[test]
    fn test_null_root_stays_out_of_root_set() {
        let mut reg = RefRegistry::new();

        let id = reg.insert_root(None);
        assert_eq!(reg.root_count(), 0);
        assert!(!reg.is_registered_root(id));

        reg.release(id);
        assert_eq!(reg.slot_count(), 0);
    }

    #[test]
    fn test_root_registration_follows_target() {
        let mut reg = RefRegistry::new();

        let id = reg.insert_root(Some(A));
        assert_eq!(reg.root_count(), 1);

        reg.set_target(id, None);
        assert_eq!(reg.root_count(), 0);
        assert_eq!(reg.target_of(id), None);

        reg.set_target(id, Some(B));
        assert_eq!(reg.root_count(), 1);
        assert_eq!(reg.target_of(id), Some(B));
    }

    #[test]
    fn test_member_list_keeps_insertion_order() {
        let mut reg = RefRegistry::new();

        let first = reg.insert_member(OWNER, Some(A));
        let second = reg.insert_member(OWNER, None);
        let third = reg.insert_member(OWNER, Some(B));
        assert_eq!(reg.member_count(OWNER), 3);

        let mut targets = SmallVec::new();
        reg.collect_member_targets(OWNER, &mut targets);
        assert_eq!(targets.as_slice(), &[A, B]);

        reg.release(second);
        assert_eq!(reg.member_count(OWNER), 2);
        let _ = (first, third);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut reg = RefRegistry::new();

        let id = reg.insert_root(Some(A));
        reg.release(id);
        reg.release(id);

        assert_eq!(reg.slot_count(), 0);
        assert_eq!(reg.root_count(), 0);
        assert_eq!(reg.set_target(id, Some(B)), None);
    }

    #[test]
    fn test_null_pass_covers_roots_and_members() {
        let mut reg = RefRegistry::new();

        let root = reg.insert_root(Some(A));
        let member = reg.insert_member(OWNER, Some(A));
        let unrelated = reg.insert_member(OWNER, Some(B));

        let dead: FxHashSet<usize> = [A].into_iter().collect();
        assert_eq!(reg.null_targets_of(&dead), 2);

        assert_eq!(reg.target_of(root), None);
        assert!(!reg.is_registered_root(root));
        assert_eq!(reg.target_of(member), None);
        assert_eq!(reg.target_of(unrelated), Some(B));
    }

    #[test]
    fn test_drop_members_of_forgets_slots() {
        let mut reg = RefRegistry::new();

        let id = reg.insert_member(OWNER, Some(A));
        reg.drop_members_of(OWNER);

        assert_eq!(reg.member_count(OWNER), 0);
        assert_eq!(reg.slot_count(), 0);
        // the handle's later release must stay a no-op
        reg.release(id);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut reg = RefRegistry::new();

        let first = reg.insert_root(Some(A));
        reg.release(first);
        reg.clear_slots();
        let second = reg.insert_root(Some(A));

        assert_ne!(first, second);
    }
}
