//! HA state machine (spec 4.J), one instance per CSI assignment.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaState {
    Unknown,
    Active,
    Standby,
    Quiescing,
    Quiesced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsiSetFlag {
    AddOne,
    TargetOne,
    TargetAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentOutcome {
    Pending,
    Confirmed,
    Failed,
}

/// One component's current role for one CSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsiAssignment {
    pub ha_state: HaState,
    pub outcome: AssignmentOutcome,
}

impl CsiAssignment {
    pub fn new(ha_state: HaState) -> Self {
        Self { ha_state, outcome: AssignmentOutcome::Pending }
    }

    /// Reply from the component's `CSISetCallback` response.
    pub fn on_response(self, success: bool) -> Self {
        Self { outcome: if success { AssignmentOutcome::Confirmed } else { AssignmentOutcome::Failed }, ..self }
    }

    /// Advances toward `REMOVE` during a quiescing switchover:
    /// `ACTIVE -> QUIESCING` (wait for `CSIQuiescingComplete`) `->
    /// QUIESCED -> (removed)`.
    pub fn begin_quiescing(self) -> Self {
        Self { ha_state: HaState::Quiescing, outcome: AssignmentOutcome::Pending, ..self }
    }

    pub fn quiescing_complete(self) -> Self {
        Self { ha_state: HaState::Quiesced, outcome: AssignmentOutcome::Confirmed, ..self }
    }
}
