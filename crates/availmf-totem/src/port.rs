//! The group-messaging port (spec 4.A).
//!
//! Exposes the four operations every service is built against:
//! `mcast`, `send_ok`, and the `deliver`/`confchg` callbacks the
//! underlying totem layer invokes back into the event loop.

use availmf_types::{NodeId, RingId};
use thiserror::Error;

/// Delivery guarantee requested for a multicast.
///
/// The totem layer always delivers in total order to every current
/// member; `guarantee` only distinguishes how the caller wants to be
/// notified of failure, matching the "returns success or back-pressure"
/// contract in spec 4.A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McastGuarantee {
    /// Caller will retry on the next tick if back-pressured.
    Retriable,
    /// Caller has no retry path; back-pressure should propagate as
    /// `TRY_AGAIN` to an originating client.
    BestEffort,
}

/// Failure mode of [`GroupPort::mcast`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulticastError {
    /// The outgoing token queue is saturated; retry on the next tick.
    #[error("back-pressure: outgoing token queue saturated")]
    Backpressure,
}

/// Configuration-change phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfchgType {
    /// Fires first, delivering the intersection of the old and new
    /// view. Further `mcast` calls are frozen until the regular
    /// confchg arrives.
    Transitional,
    /// Fires once the new ring is installed.
    Regular,
}

/// A configuration-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfchgEvent {
    pub kind: ConfchgType,
    pub members: Vec<NodeId>,
    pub left: Vec<NodeId>,
    pub joined: Vec<NodeId>,
    pub ring_id: RingId,
}

/// The port every service's handlers are built against.
///
/// Implementations must guarantee: a successful `mcast` is delivered,
/// in total order, to every current member (including the sender)
/// exactly once per configuration epoch.
pub trait GroupPort {
    /// Attempts to multicast `payload`. On success the message is
    /// queued for total-ordered delivery to every current member.
    fn mcast(&mut self, payload: &[u8], guarantee: McastGuarantee) -> Result<(), MulticastError>;

    /// Non-mutating probe: would an `mcast` of this size succeed right
    /// now without blocking?
    fn send_ok(&self, payload_len: usize) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confchg_event_carries_epoch_membership() {
        let ev = ConfchgEvent {
            kind: ConfchgType::Regular,
            members: vec![NodeId::new(1), NodeId::new(2)],
            left: vec![],
            joined: vec![NodeId::new(2)],
            ring_id: RingId::new(NodeId::new(1), 4),
        };
        assert_eq!(ev.members.len(), 2);
        assert_eq!(ev.kind, ConfchgType::Regular);
    }
}
