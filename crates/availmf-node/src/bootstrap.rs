//! Turns a static [`AmfCatalog`] into a live [`AmfGraph`]. Grounded on
//! `kimberlite-cluster::supervisor::ClusterSupervisor::new` taking a
//! `ClusterConfig` and building its runtime state from it directly,
//! generalized here to a richer entity graph instead of a flat process
//! list.

use std::collections::HashMap;

use availmf_amf::{
    AdminState, AmfGraph, Application, Capability, Component, ComponentCategory, Csi, HealthcheckConfig, HealthcheckKind, OperState,
    PresenceState, RecommendedRecovery, ServiceGroup, ServiceInstance, ServiceUnit,
};
use availmf_config::{AmfCatalog, CapabilitySpec, ComponentCategorySpec, RedundancyModelSpec};
use availmf_types::Name;

use crate::error::NodeError;

fn map_category(c: ComponentCategorySpec) -> ComponentCategory {
    match c {
        ComponentCategorySpec::SaAware => ComponentCategory::SaAware,
        ComponentCategorySpec::Proxy => ComponentCategory::Proxy,
        ComponentCategorySpec::Proxied => ComponentCategory::Proxied,
        ComponentCategorySpec::Local => ComponentCategory::Local,
    }
}

fn map_capability(c: CapabilitySpec) -> Capability {
    match c {
        CapabilitySpec::XActiveAndYStandby => Capability::XActiveAndYStandby,
        CapabilitySpec::XActiveOrYStandby => Capability::XActiveOrYStandby,
        CapabilitySpec::OneActiveOrYStandby => Capability::OneActiveOrYStandby,
        CapabilitySpec::OneActiveOrOneStandby => Capability::OneActiveOrOneStandby,
        CapabilitySpec::XActive => Capability::XActive,
        CapabilitySpec::OneActive => Capability::OneActive,
        CapabilitySpec::NonPreInstantiable => Capability::NonPreInstantiable,
    }
}

fn map_redundancy(r: RedundancyModelSpec) -> availmf_amf::RedundancyModel {
    use availmf_amf::RedundancyModel as Rm;
    match r {
        RedundancyModelSpec::NoRedundancy => Rm::NoRedundancy,
        RedundancyModelSpec::TwoN => Rm::TwoN,
        RedundancyModelSpec::NPlusM => Rm::NPlusM,
        RedundancyModelSpec::NWay => Rm::NWay,
        RedundancyModelSpec::NWayActive => Rm::NWayActive,
    }
}

/// Builds a fresh graph from `catalog`. Every entity starts in its
/// quiescent runtime state (`Uninstantiated`/`Disabled`, no
/// assignments); the node only actually instantiates components once
/// it decides to, driven by the kernel rather than by bootstrap.
pub fn graph_from_catalog(catalog: &AmfCatalog) -> Result<AmfGraph, NodeError> {
    let mut graph = AmfGraph::new();

    for app in &catalog.apps {
        let name = Name::new(app.name.as_str())?;
        graph.apps.insert(name.clone(), Application { name, clccli_path: app.clccli_path.clone() });
    }

    for sg in &catalog.sgs {
        let name = Name::new(sg.name.as_str())?;
        graph.sgs.insert(
            name.clone(),
            ServiceGroup {
                name,
                app: Name::new(sg.app.as_str())?,
                redundancy_model: map_redundancy(sg.redundancy_model),
                escalation: Default::default(),
                restart_max: sg.restart_max,
                su_restart_max: sg.su_restart_max,
                su_failover_max: sg.su_failover_max,
            },
        );
    }

    for su in &catalog.sus {
        let name = Name::new(su.name.as_str())?;
        graph.sus.insert(
            name.clone(),
            ServiceUnit {
                name,
                sg: Name::new(su.sg.as_str())?,
                node: Name::new(su.node.as_str())?,
                rank: su.rank,
                oper_state: OperState::Disabled,
                admin_state: AdminState::Unlocked,
                readiness_stopping: false,
            },
        );
    }

    for comp in &catalog.comps {
        let name = Name::new(comp.name.as_str())?;
        let mut healthchecks = HashMap::new();
        for hc in &comp.healthchecks {
            healthchecks.insert(
                hc.key.clone(),
                HealthcheckConfig {
                    key: hc.key.clone(),
                    kind: if hc.amf_invoked { HealthcheckKind::AmfInvoked } else { HealthcheckKind::ComponentInvoked },
                    period_ns: hc.period_ns,
                    max_duration_ns: hc.max_duration_ns,
                    recommended_recovery: RecommendedRecovery::ComponentRestart,
                },
            );
        }
        graph.comps.insert(
            name.clone(),
            Component {
                name,
                su: Name::new(comp.su.as_str())?,
                comptype: comp.comptype.clone(),
                category: map_category(comp.category),
                capability: map_capability(comp.capability),
                num_max_active_csi: comp.num_max_active_csi,
                num_max_standby_csi: comp.num_max_standby_csi,
                instantiation_level: comp.instantiation_level,
                default_clc_cli_timeout_ns: comp.default_clc_cli_timeout_ns,
                default_callback_timeout_ns: comp.default_callback_timeout_ns,
                instantiate_cmd: comp.instantiate_cmd.clone(),
                terminate_cmd: comp.terminate_cmd.clone(),
                cleanup_cmd: comp.cleanup_cmd.clone(),
                am_start_cmd: comp.am_start_cmd.clone(),
                am_stop_cmd: comp.am_stop_cmd.clone(),
                clccli_path: comp.clccli_path.clone(),
                env: comp.env.clone(),
                proxy_name: None,
                presence_state: PresenceState::Uninstantiated,
                oper_state: OperState::Disabled,
                error_suspected: false,
                restart_count: 0,
                recovery_on_error: RecommendedRecovery::NoRecommendation,
                disable_restart: false,
                healthchecks,
            },
        );
    }

    for si in &catalog.sis {
        let name = Name::new(si.name.as_str())?;
        let rank = si.rank.iter().map(|s| Name::new(s.as_str())).collect::<Result<Vec<_>, _>>()?;
        graph.sis.insert(
            name.clone(),
            ServiceInstance {
                name,
                sg: Name::new(si.sg.as_str())?,
                rank,
                admin_state: AdminState::Unlocked,
                pref_active_assignments: si.pref_active_assignments,
                pref_standby_assignments: si.pref_standby_assignments,
                num_curr_active_assignments: 0,
                num_curr_standby_assignments: 0,
                assignments: HashMap::new(),
            },
        );
    }

    for csi in &catalog.csis {
        let name = Name::new(csi.name.as_str())?;
        graph.csis.insert(name.clone(), Csi { name, si: Name::new(csi.si.as_str())?, cs_type: csi.cs_type.clone() });
    }

    Ok(graph)
}
