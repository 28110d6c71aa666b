//! Invocation table (spec 4.H).
//!
//! Correlates an asynchronous reply with the interface that issued it.
//! A library call that must wait for a cluster-wide decision (a
//! healthcheck response, a CSI set/remove acknowledgement, a component
//! terminate acknowledgement) stashes its context here and gets back a
//! `u64` id to hand to the callee; the callee threads the id through
//! unchanged and the reply path uses [`InvocationTable::take`] to
//! recover the original interface and data.

use std::collections::HashMap;

use thiserror::Error;

/// Distinguishes which reply handler a pending invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    Healthcheck,
    CsiSet,
    CsiRemove,
    CompTerminate,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invocation id not found")]
pub struct NotFound;

struct Slot<D> {
    interface: Interface,
    data: D,
}

/// Dense array of pending invocations, indexed by id.
///
/// Ids are reused: a freed slot is pushed onto a free list and handed
/// back out by the next `create`, so the table never grows past its
/// high-water mark of concurrently pending invocations.
pub struct InvocationTable<D> {
    slots: Vec<Option<Slot<D>>>,
    free: Vec<u64>,
}

impl<D> InvocationTable<D> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new() }
    }

    /// Registers a pending invocation and returns its id.
    pub fn create(&mut self, interface: Interface, data: D) -> u64 {
        let slot = Slot { interface, data };
        if let Some(id) = self.free.pop() {
            self.slots[id as usize] = Some(slot);
            id
        } else {
            let id = self.slots.len() as u64;
            self.slots.push(Some(slot));
            id
        }
    }

    /// Clears and returns the contents of `id`.
    pub fn take(&mut self, id: u64) -> Result<(Interface, D), NotFound> {
        let slot = self.slots.get_mut(id as usize).ok_or(NotFound)?.take().ok_or(NotFound)?;
        self.free.push(id);
        Ok((slot.interface, slot.data))
    }

    pub fn peek(&self, id: u64) -> Option<&Interface> {
        self.slots.get(id as usize)?.as_ref().map(|s| &s.interface)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: PartialEq> InvocationTable<D> {
    /// Scans for an invocation whose data equals `data` and clears it,
    /// returning its id. Used when the original caller is destroyed
    /// before a reply arrives and every invocation referencing it must
    /// be cancelled (the spec's `destroy_by_data` pointer scan).
    pub fn destroy_by_data(&mut self, data: &D) -> Option<u64> {
        let id = self.slots.iter().position(|s| s.as_ref().map(|s| &s.data) == Some(data))? as u64;
        let _ = self.take(id);
        Some(id)
    }
}

impl<D> Default for InvocationTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Variant keyed by an arbitrary correlation key instead of data
/// equality, for callers that want `destroy_by_data`-like cleanup
/// without requiring `D: PartialEq`.
pub struct KeyedInvocationTable<K, D> {
    table: InvocationTable<D>,
    by_key: HashMap<K, u64>,
}

impl<K: std::hash::Hash + Eq + Clone, D> KeyedInvocationTable<K, D> {
    pub fn new() -> Self {
        Self { table: InvocationTable::new(), by_key: HashMap::new() }
    }

    pub fn create(&mut self, key: K, interface: Interface, data: D) -> u64 {
        let id = self.table.create(interface, data);
        self.by_key.insert(key, id);
        id
    }

    pub fn take(&mut self, id: u64) -> Result<(Interface, D), NotFound> {
        self.table.take(id)
    }

    pub fn destroy_by_key(&mut self, key: &K) -> Option<(Interface, D)> {
        let id = self.by_key.remove(key)?;
        self.table.take(id).ok()
    }
}

impl<K: std::hash::Hash + Eq + Clone, D> Default for KeyedInvocationTable<K, D> {
    fn default() -> Self {
        Self::new()
    }
}
