//! Cluster-wide flow-control handles (spec 4.F).
//!
//! A service registers a named handle and flips it `Enabled`/`Disabled`
//! locally; the transition is multicast so every node learns every
//! other node's state for that handle. The handle's cluster-wide
//! state is the logical OR of every known node's state: if any node
//! says "stop," the whole cluster gates admission of new work on that
//! handle. In-flight operations are never dropped by this mechanism —
//! it only decides whether to admit new work.

use std::collections::HashMap;

use availmf_types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalState {
    Enabled,
    Disabled,
}

/// Tracks one flow-control handle's per-node state and derives the
/// cluster-wide gate from it.
#[derive(Debug, Clone, Default)]
struct HandleState {
    per_node: HashMap<NodeId, LocalState>,
}

impl HandleState {
    fn cluster_disabled(&self) -> bool {
        self.per_node.values().any(|s| *s == LocalState::Disabled)
    }
}

/// Registry of named flow-control handles, one [`HandleState`] per
/// name.
#[derive(Debug, Clone, Default)]
pub struct FlowControl {
    handles: HashMap<String, HandleState>,
}

impl FlowControl {
    pub fn new() -> Self {
        Self { handles: HashMap::new() }
    }

    /// Applies a node's reported local state for `handle`, as received
    /// over the group (including the local node's own transitions,
    /// which are multicast just like any other node's).
    pub fn apply_transition(&mut self, handle: &str, node: NodeId, state: LocalState) {
        self.handles.entry(handle.to_string()).or_default().per_node.insert(node, state);
    }

    /// Returns whether new work should be admitted for `handle`: `true`
    /// unless at least one node has reported `Disabled`.
    pub fn admit(&self, handle: &str) -> bool {
        match self.handles.get(handle) {
            Some(state) => !state.cluster_disabled(),
            None => true,
        }
    }

    /// Clears every state entry belonging to nodes no longer in the
    /// membership, for every registered handle. Called on each
    /// configuration change.
    pub fn on_configuration_change(&mut self, current_members: &[NodeId]) {
        for state in self.handles.values_mut() {
            state.per_node.retain(|node, _| current_members.contains(node));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_by_default_for_unknown_handle() {
        let fc = FlowControl::new();
        assert!(fc.admit("ckpt-writes"));
    }

    #[test]
    fn cluster_state_is_or_of_all_nodes() {
        let mut fc = FlowControl::new();
        fc.apply_transition("ckpt-writes", NodeId::new(1), LocalState::Enabled);
        fc.apply_transition("ckpt-writes", NodeId::new(2), LocalState::Enabled);
        assert!(fc.admit("ckpt-writes"));

        fc.apply_transition("ckpt-writes", NodeId::new(2), LocalState::Disabled);
        assert!(!fc.admit("ckpt-writes"), "one disabled node must gate the whole cluster");

        fc.apply_transition("ckpt-writes", NodeId::new(2), LocalState::Enabled);
        assert!(fc.admit("ckpt-writes"));
    }

    #[test]
    fn configuration_change_drops_leaving_nodes() {
        let mut fc = FlowControl::new();
        fc.apply_transition("ckpt-writes", NodeId::new(1), LocalState::Enabled);
        fc.apply_transition("ckpt-writes", NodeId::new(2), LocalState::Disabled);
        assert!(!fc.admit("ckpt-writes"));

        fc.on_configuration_change(&[NodeId::new(1)]);
        assert!(fc.admit("ckpt-writes"), "leaving node's disable must be forgotten");
    }

    #[test]
    fn handles_are_independent() {
        let mut fc = FlowControl::new();
        fc.apply_transition("ckpt-writes", NodeId::new(1), LocalState::Disabled);
        assert!(!fc.admit("ckpt-writes"));
        assert!(fc.admit("amf-healthchecks"));
    }
}
