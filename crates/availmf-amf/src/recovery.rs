//! Error report -> recovery action mapping and per-SU escalation
//! counters (spec 4.J/4.K).

use std::collections::HashMap;

use availmf_types::Name;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedRecovery {
    NoRecommendation,
    ComponentRestart,
    ComponentFailover,
    NodeFailover,
    NodeFailfast,
    NodeSwitchover,
    ClusterReset,
    ApplicationRestart,
}

/// The concrete action the recovery orchestrator must carry out,
/// resolved from a [`RecommendedRecovery`] plus component configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    RunComponentRestartPolicy,
    ComponentFailover,
    NodeFailover,
    NodeFailfast,
    /// Reserved recommendations the spec leaves unimplemented: log and
    /// do nothing further.
    Diagnostic,
}

/// Resolves `recommended` to a concrete action.
///
/// `NO_RECOMMENDATION` defers to the component's statically configured
/// `recovery_on_error`. The spec leaves unspecified what happens if
/// that configured fallback is itself `NO_RECOMMENDATION`; we treat it
/// as a configuration error and escalate to `ComponentFailover` rather
/// than silently falling through to a worse recovery, logging a
/// diagnostic so the operator can fix the catalog entry.
pub fn resolve(recommended: RecommendedRecovery, configured_fallback: RecommendedRecovery, disable_restart: bool) -> RecoveryAction {
    let effective = match recommended {
        RecommendedRecovery::NoRecommendation => {
            if configured_fallback == RecommendedRecovery::NoRecommendation {
                tracing::warn!("component's configured recovery_on_error is itself NO_RECOMMENDATION; escalating to component failover");
                RecommendedRecovery::ComponentFailover
            } else {
                configured_fallback
            }
        }
        other => other,
    };

    match effective {
        RecommendedRecovery::NoRecommendation => RecoveryAction::Diagnostic,
        RecommendedRecovery::ComponentRestart => {
            if disable_restart {
                RecoveryAction::ComponentFailover
            } else {
                RecoveryAction::RunComponentRestartPolicy
            }
        }
        RecommendedRecovery::ComponentFailover => RecoveryAction::ComponentFailover,
        RecommendedRecovery::NodeFailover => RecoveryAction::NodeFailover,
        RecommendedRecovery::NodeFailfast => RecoveryAction::NodeFailfast,
        RecommendedRecovery::NodeSwitchover | RecommendedRecovery::ClusterReset | RecommendedRecovery::ApplicationRestart => {
            RecoveryAction::Diagnostic
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SuCounters {
    pub restart_count: u32,
    pub su_restart_count: u32,
    pub failover_count: u32,
    pub restart_window_start_ns: u64,
}

/// Next escalation step after a SU's restart counters exceed their
/// configured ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationStep {
    None,
    SuRestart,
    SuFailover,
    NodeFailover,
}

#[derive(Debug, Clone, Default)]
pub struct SuEscalation {
    pub per_su: HashMap<Name, SuCounters>,
}

impl SuEscalation {
    /// Records a component restart against `su` and returns the
    /// escalation step to take, if a ceiling was crossed: comp-restart
    /// -> SU-restart -> SU-failover -> node-failover.
    pub fn record_restart(&mut self, su: &Name, restart_max: u32, su_restart_max: u32, su_failover_max: u32) -> EscalationStep {
        let counters = self.per_su.entry(su.clone()).or_default();
        counters.restart_count += 1;
        if counters.restart_count <= restart_max {
            return EscalationStep::None;
        }
        counters.restart_count = 0;
        counters.su_restart_count += 1;
        if counters.su_restart_count <= su_restart_max {
            return EscalationStep::SuRestart;
        }
        counters.su_restart_count = 0;
        counters.failover_count += 1;
        if counters.failover_count <= su_failover_max {
            EscalationStep::SuFailover
        } else {
            EscalationStep::NodeFailover
        }
    }

    /// Resets counters on a decay tick (`restart_prob`/`su_restart_prob`
    /// windows elapsing without a further error).
    pub fn decay(&mut self, su: &Name) {
        self.per_su.remove(su);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_recommendation_defers_to_configured_fallback() {
        let action = resolve(RecommendedRecovery::NoRecommendation, RecommendedRecovery::ComponentFailover, false);
        assert_eq!(action, RecoveryAction::ComponentFailover);
    }

    #[test]
    fn no_recommendation_loop_escalates_to_failover() {
        let action = resolve(RecommendedRecovery::NoRecommendation, RecommendedRecovery::NoRecommendation, false);
        assert_eq!(action, RecoveryAction::ComponentFailover);
    }

    #[test]
    fn disable_restart_escalates_component_restart() {
        let action = resolve(RecommendedRecovery::ComponentRestart, RecommendedRecovery::NoRecommendation, true);
        assert_eq!(action, RecoveryAction::ComponentFailover);
    }

    #[test]
    fn reserved_recommendations_are_diagnostic_only() {
        assert_eq!(
            resolve(RecommendedRecovery::ClusterReset, RecommendedRecovery::NoRecommendation, false),
            RecoveryAction::Diagnostic
        );
    }

    #[test]
    fn escalation_climbs_restart_then_su_restart_then_failover_then_node() {
        let mut esc = SuEscalation::default();
        let su = Name::new("su1").unwrap();
        assert_eq!(esc.record_restart(&su, 1, 1, 1), EscalationStep::None);
        assert_eq!(esc.record_restart(&su, 1, 1, 1), EscalationStep::SuRestart);
        assert_eq!(esc.record_restart(&su, 1, 1, 1), EscalationStep::None);
        assert_eq!(esc.record_restart(&su, 1, 1, 1), EscalationStep::SuFailover);
        assert_eq!(esc.record_restart(&su, 1, 1, 1), EscalationStep::None);
        assert_eq!(esc.record_restart(&su, 1, 1, 1), EscalationStep::SuRestart);
        assert_eq!(esc.record_restart(&su, 1, 1, 1), EscalationStep::None);
        assert_eq!(esc.record_restart(&su, 1, 1, 1), EscalationStep::NodeFailover);
    }
}
