//! The "ignore sync messages we've already seen" rule (spec 4.C).
//!
//! Each participating service records the ring id it last completed a
//! sync round against. A sync message stamped with a `previous_ring_id`
//! equal to that saved value is a duplicate, either a retransmission or
//! a message from a round this node already finished; processing it
//! again would double-apply state.

use availmf_types::RingId;

/// Tracks the ring id a service last saved a sync round against.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingIdGate {
    saved: Option<RingId>,
}

impl RingIdGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `previous_ring_id` names a round this gate already
    /// recorded as saved; the caller should drop the message.
    pub fn should_ignore(&self, previous_ring_id: RingId) -> bool {
        self.saved == Some(previous_ring_id)
    }

    /// Records `ring_id` as saved, normally called from `sync_activate`.
    pub fn record(&mut self, ring_id: RingId) {
        self.saved = Some(ring_id);
    }

    pub fn saved(&self) -> Option<RingId> {
        self.saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use availmf_types::NodeId;

    #[test]
    fn fresh_gate_ignores_nothing() {
        let gate = RingIdGate::new();
        assert!(!gate.should_ignore(RingId::new(NodeId::new(1), 1)));
    }

    #[test]
    fn gate_ignores_messages_for_the_recorded_round() {
        let mut gate = RingIdGate::new();
        let ring = RingId::new(NodeId::new(1), 4);
        gate.record(ring);
        assert!(gate.should_ignore(ring));
        assert!(!gate.should_ignore(RingId::new(NodeId::new(1), 5)));
    }
}
