//! Healthcheck protocol (spec 4.J), both `AMF_INVOKED` and
//! `COMPONENT_INVOKED` variants.

use serde::{Deserialize, Serialize};

use crate::recovery::RecommendedRecovery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthcheckKind {
    AmfInvoked,
    ComponentInvoked,
}

#[derive(Debug, Clone)]
pub struct HealthcheckConfig {
    pub key: String,
    pub kind: HealthcheckKind,
    pub period_ns: u64,
    pub max_duration_ns: u64,
    pub recommended_recovery: RecommendedRecovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthcheckEvent {
    /// The period timer fired (`AMF_INVOKED` only): time to send the
    /// `HealthcheckCallback` request and arm the duration timer.
    PeriodElapsed,
    /// The component replied; `ok` is false when the response carried
    /// `FAILED_OPERATION`.
    ComponentReplied { ok: bool },
    /// The duration (or, for `COMPONENT_INVOKED`, the supervision)
    /// timer fired with no reply in the window.
    SupervisionTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthcheckEffect {
    SendHealthcheckCallback,
    ArmPeriodTimer,
    ArmSupervisionTimer,
    CancelSupervisionTimer,
    ReportHealthcheckTimeout,
}

impl HealthcheckConfig {
    /// Drives one healthcheck instance. Returns the effects to carry
    /// out; a `ReportHealthcheckTimeout` effect means the caller
    /// should raise this as an error report using
    /// `self.recommended_recovery`.
    pub fn on_event(&self, event: HealthcheckEvent) -> Vec<HealthcheckEffect> {
        use HealthcheckEffect as E;
        use HealthcheckEvent as Ev;

        match (self.kind, event) {
            (HealthcheckKind::AmfInvoked, Ev::PeriodElapsed) => vec![E::SendHealthcheckCallback, E::ArmSupervisionTimer],
            (HealthcheckKind::AmfInvoked, Ev::ComponentReplied { ok: true }) => {
                vec![E::CancelSupervisionTimer, E::ArmPeriodTimer]
            }
            (HealthcheckKind::AmfInvoked, Ev::ComponentReplied { ok: false }) => vec![E::ReportHealthcheckTimeout],
            (HealthcheckKind::AmfInvoked, Ev::SupervisionTimeout) => vec![E::ReportHealthcheckTimeout],
            (HealthcheckKind::ComponentInvoked, Ev::ComponentReplied { ok: true }) => vec![E::ArmSupervisionTimer],
            (HealthcheckKind::ComponentInvoked, Ev::ComponentReplied { ok: false }) => vec![E::ReportHealthcheckTimeout],
            (HealthcheckKind::ComponentInvoked, Ev::SupervisionTimeout) => vec![E::ReportHealthcheckTimeout],
            (HealthcheckKind::ComponentInvoked, Ev::PeriodElapsed) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(kind: HealthcheckKind) -> HealthcheckConfig {
        HealthcheckConfig {
            key: "default".into(),
            kind,
            period_ns: 1_000_000_000,
            max_duration_ns: 5_000_000_000,
            recommended_recovery: RecommendedRecovery::ComponentRestart,
        }
    }

    #[test]
    fn amf_invoked_arms_supervision_after_period() {
        let effects = cfg(HealthcheckKind::AmfInvoked).on_event(HealthcheckEvent::PeriodElapsed);
        assert_eq!(effects, vec![HealthcheckEffect::SendHealthcheckCallback, HealthcheckEffect::ArmSupervisionTimer]);
    }

    #[test]
    fn amf_invoked_restarts_period_on_ok_reply() {
        let effects = cfg(HealthcheckKind::AmfInvoked).on_event(HealthcheckEvent::ComponentReplied { ok: true });
        assert_eq!(effects, vec![HealthcheckEffect::CancelSupervisionTimer, HealthcheckEffect::ArmPeriodTimer]);
    }

    #[test]
    fn component_invoked_ignores_period_elapsed() {
        assert!(cfg(HealthcheckKind::ComponentInvoked).on_event(HealthcheckEvent::PeriodElapsed).is_empty());
    }

    #[test]
    fn supervision_timeout_reports_on_both_kinds() {
        assert_eq!(
            cfg(HealthcheckKind::AmfInvoked).on_event(HealthcheckEvent::SupervisionTimeout),
            vec![HealthcheckEffect::ReportHealthcheckTimeout]
        );
        assert_eq!(
            cfg(HealthcheckKind::ComponentInvoked).on_event(HealthcheckEvent::SupervisionTimeout),
            vec![HealthcheckEffect::ReportHealthcheckTimeout]
        );
    }
}
