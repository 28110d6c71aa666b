//! Side effects the kernel asks the caller to carry out. The kernel
//! itself never performs IO, arms timers, or sends messages directly —
//! it returns the list and the node event loop executes it.

use availmf_types::Name;

use crate::ha::{CsiSetFlag, HaState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RunInstantiateHook { comp: Name },
    RunTerminateHook { comp: Name },
    RunCleanupHook { comp: Name },
    StartInstantiateTimer { comp: Name },
    CancelInstantiateTimer { comp: Name },
    StartCleanupTimer { comp: Name },
    StopHealthchecks { comp: Name },
    SendHealthcheckCallback { comp: Name, key: String },
    ArmHealthcheckPeriodTimer { comp: Name, key: String },
    ArmHealthcheckSupervisionTimer { comp: Name, key: String },
    CancelHealthcheckSupervisionTimer { comp: Name, key: String },
    SendCsiSetCallback { comp: Name, si: Name, csi: Name, flag: CsiSetFlag, target_ha_state: HaState },
    UnassignAllCsis { su: Name },
    InstantiateReplacement { si: Name, candidate_su: Name },
    MarkNodeDisabled { node: Name },
    NodeFailfast { node: Name },
    Diagnostic { message: String },
}
