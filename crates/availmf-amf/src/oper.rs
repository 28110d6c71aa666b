//! Operational State Machine (spec 4.J OPSM): `ENABLED` <-> `DISABLED`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperState {
    Enabled,
    Disabled,
}

impl OperState {
    pub fn is_enabled(self) -> bool {
        matches!(self, OperState::Enabled)
    }
}
