//! A deterministic, in-process [`GroupPort`] for tests.
//!
//! Models the totem layer's guarantee — total-ordered delivery to every
//! current member, including the sender — without any real networking.
//! Membership changes (confchg) are driven explicitly by the test
//! harness rather than discovered, since the ring protocol itself is
//! out of scope (spec §1).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use availmf_types::NodeId;
use bytes::Bytes;

use crate::port::{GroupPort, McastGuarantee, MulticastError};

/// Shared bus backing every [`SimGroup`] handle in a test cluster.
#[derive(Debug, Default)]
pub struct SimBus {
    queue: VecDeque<(NodeId, Bytes)>,
    capacity: usize,
}

impl SimBus {
    pub fn new(capacity: usize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { queue: VecDeque::new(), capacity }))
    }

    /// Drains every queued message, in send order, pairing each with
    /// every member of `members` (simulating delivery to the full
    /// current view).
    pub fn drain_to(&mut self, members: &[NodeId]) -> Vec<(NodeId, NodeId, Bytes)> {
        let mut out = Vec::new();
        while let Some((sender, payload)) = self.queue.pop_front() {
            for &recipient in members {
                out.push((sender, recipient, payload.clone()));
            }
        }
        out
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// One node's handle onto a [`SimBus`].
pub struct SimGroup {
    node: NodeId,
    bus: Rc<RefCell<SimBus>>,
}

impl SimGroup {
    pub fn new(node: NodeId, bus: Rc<RefCell<SimBus>>) -> Self {
        Self { node, bus }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl GroupPort for SimGroup {
    fn mcast(&mut self, payload: &[u8], _guarantee: McastGuarantee) -> Result<(), MulticastError> {
        let mut bus = self.bus.borrow_mut();
        if bus.queue.len() >= bus.capacity {
            return Err(MulticastError::Backpressure);
        }
        bus.queue.push_back((self.node, Bytes::copy_from_slice(payload)));
        Ok(())
    }

    fn send_ok(&self, payload_len: usize) -> bool {
        let _ = payload_len;
        self.bus.borrow().queue.len() < self.bus.borrow().capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcast_backpressures_when_full() {
        let bus = SimBus::new(1);
        let mut group = SimGroup::new(NodeId::new(1), bus);
        assert!(group.send_ok(4));
        group.mcast(b"one", McastGuarantee::Retriable).unwrap();
        assert!(!group.send_ok(4));
        assert_eq!(group.mcast(b"two", McastGuarantee::Retriable), Err(MulticastError::Backpressure));
    }

    #[test]
    fn drain_delivers_to_every_member_including_sender() {
        let bus = SimBus::new(8);
        let members = [NodeId::new(1), NodeId::new(2), NodeId::new(3)];
        let mut g1 = SimGroup::new(members[0], Rc::clone(&bus));
        g1.mcast(b"hello", McastGuarantee::Retriable).unwrap();

        let deliveries = bus.borrow_mut().drain_to(&members);
        assert_eq!(deliveries.len(), 3);
        assert!(deliveries.iter().any(|(_, to, _)| *to == members[0]));
        assert!(deliveries.iter().all(|(from, _, payload)| *from == members[0] && payload.as_ref() == b"hello"));
    }
}
