//! Pure kernel: `apply_event(graph, event) -> (graph, effects)`.
//!
//! Mirrors the shape of a committed-command kernel: the graph is
//! consumed and a new one returned, with every side effect expressed
//! as data rather than performed here. No IO, no clocks: timer
//! deadlines and fork/exec results arrive as already-resolved events.

use availmf_types::Name;

use crate::effect::Effect;
use crate::entity::AmfGraph;
use crate::error::AmfError;
use crate::event::AmfEvent;
use crate::ha::HaState;
use crate::healthcheck::HealthcheckEffect;
use crate::oper::OperState;
use crate::orchestration;
use crate::presence::{PresenceEffect, PresenceEvent};
use crate::recovery::{self, EscalationStep, RecoveryAction};

pub fn apply_event(mut graph: AmfGraph, event: AmfEvent) -> Result<(AmfGraph, Vec<Effect>), AmfError> {
    let effects = match event {
        AmfEvent::Presence { comp, event } => apply_presence(&mut graph, &comp, event)?,
        AmfEvent::Healthcheck { comp, key, event } => apply_healthcheck(&mut graph, &comp, &key, event)?,
        AmfEvent::ErrorReport { comp, recommended_recovery } => apply_error_report(&mut graph, &comp, recommended_recovery)?,
        AmfEvent::CsiSetResponse { si, csi, success } => apply_csi_response(&mut graph, &si, &csi, success)?,
        AmfEvent::CsiQuiescingComplete { si, csi } => apply_quiescing_complete(&mut graph, &si, &csi)?,
        AmfEvent::NodeLeft { node } => apply_node_left(&mut graph, &node)?,
        AmfEvent::ConfigurationChanged => orchestration::assign_pending(&graph),
    };
    Ok((graph, effects))
}

fn apply_presence(graph: &mut AmfGraph, comp: &Name, event: PresenceEvent) -> Result<Vec<Effect>, AmfError> {
    let c = graph.comp_mut(comp).ok_or_else(|| AmfError::ComponentNotFound(comp.clone()))?;
    let (next, local_effects) = c.presence_state.on_event(event).ok_or(AmfError::InvalidTransition)?;
    c.presence_state = next;

    let mut effects = Vec::with_capacity(local_effects.len());
    for e in local_effects {
        match e {
            PresenceEffect::RunInstantiateHook => effects.push(Effect::RunInstantiateHook { comp: comp.clone() }),
            PresenceEffect::RunCleanupHook => effects.push(Effect::RunCleanupHook { comp: comp.clone() }),
            PresenceEffect::RunTerminateHook => effects.push(Effect::RunTerminateHook { comp: comp.clone() }),
            PresenceEffect::StartInstantiateTimer => effects.push(Effect::StartInstantiateTimer { comp: comp.clone() }),
            PresenceEffect::CancelInstantiateTimer => effects.push(Effect::CancelInstantiateTimer { comp: comp.clone() }),
            PresenceEffect::StartCleanupTimer => effects.push(Effect::StartCleanupTimer { comp: comp.clone() }),
            PresenceEffect::StopHealthchecks => effects.push(Effect::StopHealthchecks { comp: comp.clone() }),
            PresenceEffect::SetOperEnabled => c.oper_state = OperState::Enabled,
            PresenceEffect::SetOperDisabled => c.oper_state = OperState::Disabled,
        }
    }
    Ok(effects)
}

fn apply_healthcheck(graph: &mut AmfGraph, comp: &Name, key: &str, event: crate::healthcheck::HealthcheckEvent) -> Result<Vec<Effect>, AmfError> {
    let c = graph.comp_mut(comp).ok_or_else(|| AmfError::ComponentNotFound(comp.clone()))?;
    let cfg = c.healthchecks.get(key).ok_or(AmfError::InvalidTransition)?.clone();
    let local_effects = cfg.on_event(event);

    let mut effects = Vec::with_capacity(local_effects.len());
    let mut timeout_reported = false;
    for e in local_effects {
        match e {
            HealthcheckEffect::SendHealthcheckCallback => {
                effects.push(Effect::SendHealthcheckCallback { comp: comp.clone(), key: key.to_string() })
            }
            HealthcheckEffect::ArmPeriodTimer => effects.push(Effect::ArmHealthcheckPeriodTimer { comp: comp.clone(), key: key.to_string() }),
            HealthcheckEffect::ArmSupervisionTimer => {
                effects.push(Effect::ArmHealthcheckSupervisionTimer { comp: comp.clone(), key: key.to_string() })
            }
            HealthcheckEffect::CancelSupervisionTimer => {
                effects.push(Effect::CancelHealthcheckSupervisionTimer { comp: comp.clone(), key: key.to_string() })
            }
            HealthcheckEffect::ReportHealthcheckTimeout => timeout_reported = true,
        }
    }

    if timeout_reported {
        effects.extend(apply_error_report(graph, comp, cfg.recommended_recovery)?);
    }
    Ok(effects)
}

fn apply_error_report(graph: &mut AmfGraph, comp_name: &Name, recommended: recovery::RecommendedRecovery) -> Result<Vec<Effect>, AmfError> {
    let comp = graph.comps.get(comp_name).ok_or_else(|| AmfError::ComponentNotFound(comp_name.clone()))?;
    let configured_fallback = comp.recovery_on_error;
    let disable_restart = comp.disable_restart;
    let su_name = comp.su.clone();
    let action = recovery::resolve(recommended, configured_fallback, disable_restart);

    let mut effects = Vec::new();
    match action {
        RecoveryAction::RunComponentRestartPolicy => {
            let su = graph.sus.get(&su_name).ok_or_else(|| AmfError::SuNotFound(su_name.clone()))?;
            let sg_name = su.sg.clone();
            let sg = graph.sgs.get(&sg_name).ok_or_else(|| AmfError::SgNotFound(sg_name.clone()))?;
            let (restart_max, su_restart_max, su_failover_max) = (sg.restart_max, sg.su_restart_max, sg.su_failover_max);

            if let Some(c) = graph.comp_mut(comp_name) {
                c.error_suspected = true;
                c.restart_count += 1;
            }

            let sg = graph.sg_mut(&sg_name).ok_or_else(|| AmfError::SgNotFound(sg_name.clone()))?;
            let step = sg.escalation.record_restart(&su_name, restart_max, su_restart_max, su_failover_max);

            effects.extend(apply_presence(graph, comp_name, PresenceEvent::RestartRequested)?);
            match step {
                EscalationStep::None => {}
                EscalationStep::SuRestart => {
                    let su_comps: Vec<Name> = graph.comps_of_su(&su_name).map(|c| c.name.clone()).collect();
                    for other in su_comps {
                        if &other == comp_name {
                            continue;
                        }
                        if let Ok(more) = apply_presence(graph, &other, PresenceEvent::RestartRequested) {
                            effects.extend(more);
                        }
                    }
                    effects.push(Effect::Diagnostic { message: format!("SU {} restart ceiling reached; restarting whole SU", su_name.as_str()) });
                }
                EscalationStep::SuFailover => effects.push(Effect::UnassignAllCsis { su: su_name.clone() }),
                EscalationStep::NodeFailover => {
                    let node = graph.sus.get(&su_name).map(|su| su.node.clone());
                    if let Some(node) = node {
                        effects.push(Effect::MarkNodeDisabled { node });
                    }
                }
            }
        }
        RecoveryAction::ComponentFailover => {
            effects.push(Effect::UnassignAllCsis { su: su_name.clone() });
            effects.extend(orchestration::begin_switchover(graph, &su_name));
        }
        RecoveryAction::NodeFailover => {
            let node = graph.sus.get(&su_name).map(|su| su.node.clone());
            if let Some(node) = node {
                for su in graph.sus_of_node(&node).map(|su| su.name.clone()).collect::<Vec<_>>() {
                    effects.push(Effect::UnassignAllCsis { su });
                }
                effects.push(Effect::MarkNodeDisabled { node });
            }
        }
        RecoveryAction::NodeFailfast => {
            let node = graph.sus.get(&su_name).map(|su| su.node.clone());
            if let Some(node) = node {
                effects.push(Effect::NodeFailfast { node });
            }
        }
        RecoveryAction::Diagnostic => effects.push(Effect::Diagnostic { message: format!("unhandled recovery recommendation for {}", comp_name.as_str()) }),
    }
    Ok(effects)
}

fn apply_csi_response(graph: &mut AmfGraph, si_name: &Name, csi_name: &Name, success: bool) -> Result<Vec<Effect>, AmfError> {
    let si = graph.sis.get_mut(si_name).ok_or_else(|| AmfError::SiNotFound(si_name.clone()))?;
    let entry = si.assignments.entry(csi_name.clone()).or_insert_with(|| crate::ha::CsiAssignment::new(HaState::Active));
    *entry = entry.on_response(success);

    if success {
        Ok(vec![])
    } else {
        Ok(vec![Effect::Diagnostic {
            message: format!("CSI {} assignment failed for SI {}; SG redundancy policy re-evaluation required", csi_name.as_str(), si_name.as_str()),
        }])
    }
}

fn apply_quiescing_complete(graph: &mut AmfGraph, si_name: &Name, csi_name: &Name) -> Result<Vec<Effect>, AmfError> {
    let si = graph.sis.get_mut(si_name).ok_or_else(|| AmfError::SiNotFound(si_name.clone()))?;
    if let Some(entry) = si.assignments.get_mut(csi_name) {
        *entry = entry.quiescing_complete();
    }
    Ok(vec![])
}

fn apply_node_left(graph: &mut AmfGraph, node: &Name) -> Result<Vec<Effect>, AmfError> {
    let su_names: Vec<Name> = graph.sus_of_node(node).map(|su| su.name.clone()).collect();
    let mut effects = Vec::new();

    for su_name in &su_names {
        if let Some(su) = graph.su_mut(su_name) {
            su.oper_state = OperState::Disabled;
        }
        let comp_names: Vec<Name> = graph.comps_of_su(su_name).map(|c| c.name.clone()).collect();
        for comp_name in comp_names {
            if let Some(c) = graph.comp_mut(&comp_name) {
                c.error_suspected = false;
                c.presence_state = crate::presence::PresenceState::Uninstantiated;
                c.oper_state = OperState::Disabled;
            }
        }
    }

    for si in graph.sis.values_mut() {
        for assignment in si.assignments.values_mut() {
            if assignment.outcome != crate::ha::AssignmentOutcome::Confirmed {
                *assignment = crate::ha::CsiAssignment { ha_state: assignment.ha_state, outcome: crate::ha::AssignmentOutcome::Failed };
            }
        }
    }

    if let Some(n) = graph.nodes.get_mut(node) {
        n.oper_state = OperState::Disabled;
    }
    effects.push(Effect::Diagnostic { message: format!("node {} left; {} SUs reset to UNINSTANTIATED", node.as_str(), su_names.len()) });
    Ok(effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AdminState, Application, Capability, Component, ComponentCategory, Node, ServiceGroup, ServiceInstance, ServiceUnit};
    use crate::presence::PresenceState;
    use crate::recovery::RecommendedRecovery;
    use std::collections::HashMap;

    fn base_component(name: Name, su: Name) -> Component {
        Component {
            name,
            su,
            comptype: "t".into(),
            category: ComponentCategory::SaAware,
            capability: Capability::OneActive,
            num_max_active_csi: 1,
            num_max_standby_csi: 1,
            instantiation_level: 1,
            default_clc_cli_timeout_ns: 1_000_000_000,
            default_callback_timeout_ns: 1_000_000_000,
            instantiate_cmd: "/bin/true".into(),
            terminate_cmd: None,
            cleanup_cmd: "/bin/true".into(),
            am_start_cmd: None,
            am_stop_cmd: None,
            clccli_path: None,
            env: vec![],
            proxy_name: None,
            presence_state: PresenceState::Instantiated,
            oper_state: OperState::Enabled,
            error_suspected: false,
            restart_count: 0,
            recovery_on_error: RecommendedRecovery::ComponentRestart,
            disable_restart: false,
            healthchecks: HashMap::new(),
        }
    }

    fn base_graph() -> AmfGraph {
        let mut g = AmfGraph::new();
        let node = Name::new("node1").unwrap();
        g.nodes.insert(node.clone(), Node { name: node.clone(), oper_state: OperState::Enabled, admin_state: AdminState::Unlocked });
        let app = Name::new("app1").unwrap();
        g.apps.insert(app.clone(), Application { name: app.clone(), clccli_path: None });
        let sg = Name::new("sg1").unwrap();
        g.sgs.insert(
            sg.clone(),
            ServiceGroup {
                name: sg.clone(),
                app,
                redundancy_model: crate::entity::RedundancyModel::NoRedundancy,
                escalation: Default::default(),
                restart_max: 1,
                su_restart_max: 0,
                su_failover_max: 1,
            },
        );
        let su = Name::new("su1").unwrap();
        g.sus.insert(
            su.clone(),
            ServiceUnit {
                name: su.clone(),
                sg: sg.clone(),
                node: node.clone(),
                rank: 0,
                oper_state: OperState::Enabled,
                admin_state: AdminState::Unlocked,
                readiness_stopping: false,
            },
        );
        let comp = Name::new("comp1").unwrap();
        g.comps.insert(comp.clone(), base_component(comp.clone(), su.clone()));
        let si = Name::new("si1").unwrap();
        g.sis.insert(
            si.clone(),
            ServiceInstance {
                name: si,
                sg,
                rank: vec![],
                admin_state: AdminState::Unlocked,
                pref_active_assignments: 1,
                pref_standby_assignments: 1,
                num_curr_active_assignments: 0,
                num_curr_standby_assignments: 0,
                assignments: HashMap::new(),
            },
        );
        g
    }

    #[test]
    fn presence_event_drives_transition_and_oper_state() {
        let g = base_graph();
        let comp = Name::new("comp1").unwrap();
        let (g, effects) = apply_event(g, AmfEvent::Presence { comp: comp.clone(), event: PresenceEvent::RestartRequested }).unwrap();
        assert_eq!(g.comps[&comp].presence_state, PresenceState::Restarting(crate::presence::RestartingStep::Terminate));
        assert!(effects.iter().any(|e| matches!(e, Effect::RunCleanupHook { .. })));
    }

    #[test]
    fn unknown_component_is_an_error() {
        let g = base_graph();
        let missing = Name::new("ghost").unwrap();
        let result = apply_event(g, AmfEvent::Presence { comp: missing, event: PresenceEvent::RestartRequested });
        assert!(result.is_err());
    }

    #[test]
    fn component_restart_error_report_runs_restart_policy() {
        let g = base_graph();
        let comp = Name::new("comp1").unwrap();
        let (g, effects) =
            apply_event(g, AmfEvent::ErrorReport { comp: comp.clone(), recommended_recovery: RecommendedRecovery::ComponentRestart }).unwrap();
        assert_eq!(g.comps[&comp].presence_state, PresenceState::Restarting(crate::presence::RestartingStep::Terminate));
        assert!(g.comps[&comp].error_suspected);
        assert!(!effects.is_empty());
    }

    #[test]
    fn repeated_restarts_escalate_to_su_failover() {
        let mut g = base_graph();
        let comp = Name::new("comp1").unwrap();
        for _ in 0..2 {
            g.comp_mut(&comp).unwrap().presence_state = PresenceState::Instantiated;
            let (next, effects) =
                apply_event(g, AmfEvent::ErrorReport { comp: comp.clone(), recommended_recovery: RecommendedRecovery::ComponentRestart }).unwrap();
            g = next;
            if effects.iter().any(|e| matches!(e, Effect::UnassignAllCsis { .. })) {
                return;
            }
        }
        panic!("expected SU failover escalation within 2 restarts given restart_max=1");
    }

    #[test]
    fn disable_restart_goes_straight_to_component_failover() {
        let mut g = base_graph();
        let comp = Name::new("comp1").unwrap();
        g.comp_mut(&comp).unwrap().disable_restart = true;
        let (_, effects) =
            apply_event(g, AmfEvent::ErrorReport { comp, recommended_recovery: RecommendedRecovery::ComponentRestart }).unwrap();
        assert!(effects.iter().any(|e| matches!(e, Effect::UnassignAllCsis { .. })));
    }

    #[test]
    fn su_restart_ceiling_restarts_other_components_on_su() {
        let mut g = base_graph();
        g.sg_mut(&Name::new("sg1").unwrap()).unwrap().restart_max = 0;
        g.sg_mut(&Name::new("sg1").unwrap()).unwrap().su_restart_max = 1;
        let su = Name::new("su1").unwrap();
        let comp1 = Name::new("comp1").unwrap();
        let comp2 = Name::new("comp2").unwrap();
        g.comps.insert(comp2.clone(), base_component(comp2.clone(), su.clone()));

        let (g, effects) =
            apply_event(g, AmfEvent::ErrorReport { comp: comp1.clone(), recommended_recovery: RecommendedRecovery::ComponentRestart }).unwrap();
        assert_eq!(g.comps[&comp2].presence_state, PresenceState::Restarting(crate::presence::RestartingStep::Terminate));
        assert!(!effects.iter().any(|e| matches!(e, Effect::UnassignAllCsis { .. })), "SU-restart tier must not yet escalate to SU failover");
    }

    #[test]
    fn node_left_resets_hosted_components() {
        let g = base_graph();
        let node = Name::new("node1").unwrap();
        let (g, _) = apply_event(g, AmfEvent::NodeLeft { node }).unwrap();
        let comp = Name::new("comp1").unwrap();
        assert_eq!(g.comps[&comp].presence_state, PresenceState::Uninstantiated);
        assert_eq!(g.comps[&comp].oper_state, OperState::Disabled);
    }
}
