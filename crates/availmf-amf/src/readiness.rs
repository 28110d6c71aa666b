//! Readiness State Machine (spec 4.J RESM): derived, never stored.

use serde::{Deserialize, Serialize};

use crate::oper::OperState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    InService,
    Stopping,
    OutOfService,
}

/// `su_readiness` is the SU's own readiness derivation (a SU is
/// `IN_SERVICE` when unlocked and not shutting down); `su_stopping`
/// reflects an admin SHUTTING_DOWN transition in progress on the SU.
pub fn derive(comp_oper: OperState, su_readiness_in_service: bool, su_stopping: bool, node_oper: OperState) -> Readiness {
    if su_stopping {
        return Readiness::Stopping;
    }
    if comp_oper.is_enabled() && su_readiness_in_service && node_oper.is_enabled() {
        Readiness::InService
    } else {
        Readiness::OutOfService
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_service_requires_all_three_enabled() {
        assert_eq!(derive(OperState::Enabled, true, false, OperState::Enabled), Readiness::InService);
        assert_eq!(derive(OperState::Disabled, true, false, OperState::Enabled), Readiness::OutOfService);
        assert_eq!(derive(OperState::Enabled, false, false, OperState::Enabled), Readiness::OutOfService);
        assert_eq!(derive(OperState::Enabled, true, false, OperState::Disabled), Readiness::OutOfService);
    }

    #[test]
    fn shutting_down_takes_priority() {
        assert_eq!(derive(OperState::Enabled, true, true, OperState::Enabled), Readiness::Stopping);
    }
}
