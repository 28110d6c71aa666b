//! SI assignment orchestration (spec 4.K): chooses active/standby SUs
//! per SI on confchg or oper-state transitions and emits the
//! `CSISetCallback` effects needed to converge toward that target.

use std::collections::HashMap;

use availmf_types::Name;

use crate::effect::Effect;
use crate::entity::{AdminState, AmfGraph, RedundancyModel};
use crate::ha::{CsiSetFlag, HaState};
use crate::readiness::{self, Readiness};

/// Eligible SUs for `sg`, ranked: `si_ranked_su` order if the SI
/// configured one, else `SU.rank` ascending. A SU is a candidate only
/// when its derived readiness (spec 4.J RESM) is `IN_SERVICE`.
fn eligible_sus<'a>(graph: &'a AmfGraph, sg: &Name, si_rank: &'a [Name]) -> Vec<&'a Name> {
    let enabled: Vec<&Name> = graph
        .sus_of_sg(sg)
        .into_iter()
        .filter(|su| {
            let Some(node) = graph.nodes.get(&su.node) else { return false };
            let su_in_service = su.admin_state == AdminState::Unlocked;
            readiness::derive(su.oper_state, su_in_service, su.readiness_stopping, node.oper_state) == Readiness::InService
        })
        .map(|su| &su.name)
        .collect();

    if si_rank.is_empty() {
        enabled
    } else {
        si_rank.iter().filter(|name| enabled.contains(name)).collect()
    }
}

/// Emits `CSISetCallback` effects for every CSI of every SI still
/// missing its target assignment(s), after a confchg or an oper-state
/// transition changed which SUs are eligible. Respects each candidate
/// component's capability-model ceilings (`num_max_active_csi`,
/// `num_max_standby_csi`) and each SI's `pref_{active,standby}_assignments`
/// bound (invariant 3), skipping an SU once its representative
/// component is saturated rather than overassigning it.
pub fn assign_pending(graph: &AmfGraph) -> Vec<Effect> {
    let mut effects = Vec::new();
    let mut active_csi_counts: HashMap<Name, u32> = HashMap::new();
    let mut standby_csi_counts: HashMap<Name, u32> = HashMap::new();

    for si in graph.sis.values() {
        if si.admin_state == AdminState::Locked {
            continue;
        }
        let Some(sg) = graph.sgs.get(&si.sg) else { continue };
        let candidates = eligible_sus(graph, &si.sg, &si.rank);

        let active_su = candidates.iter().copied().find(|su| {
            graph
                .comps_of_su(su)
                .next()
                .is_some_and(|c| active_csi_counts.get(&c.name).copied().unwrap_or(0) < c.num_max_active_csi)
        });
        let Some(active_su) = active_su else { continue };

        let standby_su = if sg.redundancy_model == RedundancyModel::TwoN {
            candidates.iter().copied().filter(|&su| su != active_su).find(|su| {
                graph
                    .comps_of_su(su)
                    .next()
                    .is_some_and(|c| standby_csi_counts.get(&c.name).copied().unwrap_or(0) < c.num_max_standby_csi)
            })
        } else {
            None
        };

        let mut si_active_count =
            si.assignments.values().filter(|a| a.ha_state == HaState::Active).count() as u32;
        let mut si_standby_count =
            si.assignments.values().filter(|a| a.ha_state == HaState::Standby).count() as u32;

        for csi in graph.csis.values().filter(|c| c.si == si.name) {
            let current = si.assignments.get(&csi.name);
            let wants_active = current.map(|a| a.ha_state) != Some(HaState::Active);
            if wants_active && si_active_count < si.pref_active_assignments {
                if let Some(active_comp) = graph.comps_of_su(active_su).next() {
                    *active_csi_counts.entry(active_comp.name.clone()).or_insert(0) += 1;
                    si_active_count += 1;
                    effects.push(Effect::SendCsiSetCallback {
                        comp: active_comp.name.clone(),
                        si: si.name.clone(),
                        csi: csi.name.clone(),
                        flag: CsiSetFlag::AddOne,
                        target_ha_state: HaState::Active,
                    });
                }
            }
            if let Some(standby_su) = standby_su {
                let wants_standby = current.map(|a| a.ha_state) != Some(HaState::Standby);
                if wants_standby && si_standby_count < si.pref_standby_assignments {
                    if let Some(standby_comp) = graph.comps_of_su(standby_su).next() {
                        *standby_csi_counts.entry(standby_comp.name.clone()).or_insert(0) += 1;
                        si_standby_count += 1;
                        effects.push(Effect::SendCsiSetCallback {
                            comp: standby_comp.name.clone(),
                            si: si.name.clone(),
                            csi: csi.name.clone(),
                            flag: CsiSetFlag::AddOne,
                            target_ha_state: HaState::Standby,
                        });
                    }
                }
            }
        }
    }

    effects
}

/// Begins a quiescing switchover for every CSI currently `ACTIVE` on
/// `from_su`, per spec 4.K: `QUIESCING` -> wait for
/// `CSIQuiescingComplete` -> `QUIESCED` -> `REMOVE`. Transitions the
/// assignment's own `ha_state` to `QUIESCING` as it goes, rather than
/// only asking the component to quiesce without recording it.
pub fn begin_switchover(graph: &mut AmfGraph, from_su: &Name) -> Vec<Effect> {
    let mut effects = Vec::new();
    let comp = graph.comps_of_su(from_su).next().map(|c| c.name.clone());
    let Some(comp) = comp else { return effects };

    let si_names: Vec<Name> = graph.sis.keys().cloned().collect();
    for si_name in si_names {
        let Some(si) = graph.sis.get_mut(&si_name) else { continue };
        let active_csis: Vec<Name> =
            si.assignments.iter().filter(|(_, a)| a.ha_state == HaState::Active).map(|(csi, _)| csi.clone()).collect();
        for csi_name in active_csis {
            if let Some(assignment) = si.assignments.get_mut(&csi_name) {
                *assignment = assignment.begin_quiescing();
            }
            effects.push(Effect::SendCsiSetCallback {
                comp: comp.clone(),
                si: si_name.clone(),
                csi: csi_name,
                flag: CsiSetFlag::TargetOne,
                target_ha_state: HaState::Quiescing,
            });
        }
    }
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Csi;
    use crate::entity::{AdminState, Application, Capability, Component, ComponentCategory, Node, ServiceGroup, ServiceInstance, ServiceUnit};
    use crate::oper::OperState;
    use crate::presence::PresenceState;
    use crate::recovery::RecommendedRecovery;
    use std::collections::HashMap;

    fn make_comp(name: &Name, su: &Name) -> Component {
        Component {
            name: name.clone(),
            su: su.clone(),
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

    fn make_graph() -> AmfGraph {
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
                app: app.clone(),
                redundancy_model: RedundancyModel::NoRedundancy,
                escalation: Default::default(),
                restart_max: 3,
                su_restart_max: 2,
                su_failover_max: 2,
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
        g.comps.insert(comp.clone(), make_comp(&comp, &su));
        let si = Name::new("si1").unwrap();
        g.sis.insert(
            si.clone(),
            ServiceInstance {
                name: si.clone(),
                sg: sg.clone(),
                rank: vec![],
                admin_state: AdminState::Unlocked,
                pref_active_assignments: 1,
                pref_standby_assignments: 1,
                num_curr_active_assignments: 0,
                num_curr_standby_assignments: 0,
                assignments: HashMap::new(),
            },
        );
        let csi = Name::new("csi1").unwrap();
        g.csis.insert(csi.clone(), Csi { name: csi.clone(), si: si.clone(), cs_type: "t".into() });
        g
    }

    #[test]
    fn unassigned_csi_gets_add_one_to_active_su() {
        let g = make_graph();
        let effects = assign_pending(&g);
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::SendCsiSetCallback { flag: CsiSetFlag::AddOne, target_ha_state: HaState::Active, .. }));
    }

    #[test]
    fn disabled_node_has_no_eligible_su() {
        let mut g = make_graph();
        g.nodes.get_mut(&Name::new("node1").unwrap()).unwrap().oper_state = OperState::Disabled;
        assert!(assign_pending(&g).is_empty());
    }

    #[test]
    fn pref_active_assignments_bounds_how_many_csis_go_active() {
        let mut g = make_graph();
        let si = g.sis.get_mut(&Name::new("si1").unwrap()).unwrap();
        si.pref_active_assignments = 1;
        let csi2 = Name::new("csi2").unwrap();
        g.csis.insert(csi2.clone(), Csi { name: csi2, si: Name::new("si1").unwrap(), cs_type: "t".into() });

        let effects = assign_pending(&g);
        let active_assignments = effects.iter().filter(|e| matches!(e, Effect::SendCsiSetCallback { target_ha_state: HaState::Active, .. })).count();
        assert_eq!(active_assignments, 1, "pref_active_assignments=1 must cap active CSI assignments at one");
    }

    #[test]
    fn saturated_component_capacity_leaves_si_unassigned() {
        let mut g = make_graph();
        g.comp_mut(&Name::new("comp1").unwrap()).unwrap().num_max_active_csi = 0;
        assert!(assign_pending(&g).is_empty(), "a component with no active-csi capacity must not receive an assignment");
    }

    #[test]
    fn begin_switchover_moves_active_assignment_to_quiescing() {
        let mut g = make_graph();
        let si = Name::new("si1").unwrap();
        let csi = Name::new("csi1").unwrap();
        g.sis.get_mut(&si).unwrap().assignments.insert(csi.clone(), crate::ha::CsiAssignment::new(HaState::Active));

        let effects = begin_switchover(&mut g, &Name::new("su1").unwrap());
        assert_eq!(g.sis[&si].assignments[&csi].ha_state, HaState::Quiescing);
        assert!(effects.iter().any(|e| matches!(e, Effect::SendCsiSetCallback { target_ha_state: HaState::Quiescing, .. })));
    }
}
