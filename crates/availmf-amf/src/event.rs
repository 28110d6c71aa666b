//! Top-level events the AMF kernel reacts to. Every variant here is
//! expected to arrive as a multicast executive message (or a
//! timer-driven event that is itself multicast when it must be
//! cluster-consistent), so every node applies [`crate::kernel::apply_event`]
//! in the same order.

use availmf_types::Name;

use crate::healthcheck::HealthcheckEvent;
use crate::presence::PresenceEvent;
use crate::recovery::RecommendedRecovery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmfEvent {
    /// Drives a component's presence state machine.
    Presence { comp: Name, event: PresenceEvent },
    /// Drives a component's healthcheck protocol, identified by key
    /// since a component may register more than one healthcheck.
    Healthcheck { comp: Name, key: String, event: HealthcheckEvent },
    /// A component (or an external harness) reported an error.
    ErrorReport { comp: Name, recommended_recovery: RecommendedRecovery },
    /// Reply to a `CSISetCallback` invocation.
    CsiSetResponse { si: Name, csi: Name, success: bool },
    /// `CSIQuiescingComplete` from the component.
    CsiQuiescingComplete { si: Name, csi: Name },
    /// TRANSITIONAL confchg: `node` left the cluster.
    NodeLeft { node: Name },
    /// REGULAR confchg after a membership change settles.
    ConfigurationChanged,
}
