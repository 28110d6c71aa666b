//! AMF containment graph: cluster, node, application, SG, SU, comp, SI, CSI.
//!
//! Kept as a flat set of maps keyed by distinguished name rather than a
//! tree of owned children, so the kernel can look up any entity in O(1)
//! without walking parent pointers.

use std::collections::HashMap;

use availmf_types::Name;
use serde::{Deserialize, Serialize};

use crate::ha::CsiAssignment;
use crate::healthcheck::HealthcheckConfig;
use crate::oper::OperState;
use crate::presence::PresenceState;
use crate::recovery::{RecommendedRecovery, SuEscalation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedundancyModel {
    NoRedundancy,
    TwoN,
    NPlusM,
    NWay,
    NWayActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminState {
    Unlocked,
    Locked,
    LockedInstantiation,
    ShuttingDown,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub name: Name,
    pub admin_state: AdminState,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: Name,
    pub oper_state: OperState,
    pub admin_state: AdminState,
}

#[derive(Debug, Clone)]
pub struct Application {
    pub name: Name,
    pub clccli_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceGroup {
    pub name: Name,
    pub app: Name,
    pub redundancy_model: RedundancyModel,
    pub escalation: SuEscalation,
    /// Comp-restart ceiling before escalating to SU-restart.
    pub restart_max: u32,
    /// SU-restart ceiling before escalating to SU-failover.
    pub su_restart_max: u32,
    /// SU-failover ceiling before escalating to node-failover.
    pub su_failover_max: u32,
}

#[derive(Debug, Clone)]
pub struct ServiceUnit {
    pub name: Name,
    pub sg: Name,
    pub node: Name,
    pub rank: u32,
    pub oper_state: OperState,
    pub admin_state: AdminState,
    pub readiness_stopping: bool,
}

/// spec 4.J component categories: `SA-AWARE` components integrate with
/// the AMF callback protocol directly; `PROXY` components relay the
/// protocol to the `PROXIED` components they front; `LOCAL` components
/// are non-SA-aware and run without any callback contract at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentCategory {
    SaAware,
    Proxy,
    Proxied,
    Local,
}

/// spec 4.J capability model: how many active/standby CSI assignments
/// a component can hold at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    XActiveAndYStandby,
    XActiveOrYStandby,
    OneActiveOrYStandby,
    OneActiveOrOneStandby,
    XActive,
    OneActive,
    NonPreInstantiable,
}

#[derive(Debug, Clone)]
pub struct Component {
    pub name: Name,
    pub su: Name,
    pub comptype: String,
    pub category: ComponentCategory,
    pub capability: Capability,
    pub num_max_active_csi: u32,
    pub num_max_standby_csi: u32,
    pub instantiation_level: u32,
    pub default_clc_cli_timeout_ns: u64,
    pub default_callback_timeout_ns: u64,
    pub instantiate_cmd: String,
    pub terminate_cmd: Option<String>,
    pub cleanup_cmd: String,
    pub am_start_cmd: Option<String>,
    pub am_stop_cmd: Option<String>,
    pub clccli_path: Option<String>,
    pub env: Vec<(String, String)>,
    pub proxy_name: Option<Name>,
    pub presence_state: PresenceState,
    pub oper_state: OperState,
    pub error_suspected: bool,
    pub restart_count: u32,
    pub recovery_on_error: RecommendedRecovery,
    pub disable_restart: bool,
    pub healthchecks: HashMap<String, HealthcheckConfig>,
}

impl Component {
    pub fn dn(&self) -> String {
        format!("safComp={},safSu={}", self.name.as_str(), self.su.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ServiceInstance {
    pub name: Name,
    pub sg: Name,
    pub rank: Vec<Name>,
    pub admin_state: AdminState,
    /// Invariant 3: `{ACTIVE assignments}.size <= pref_active_assignments`.
    pub pref_active_assignments: u32,
    pub pref_standby_assignments: u32,
    pub num_curr_active_assignments: u32,
    pub num_curr_standby_assignments: u32,
    pub assignments: HashMap<Name, CsiAssignment>,
}

#[derive(Debug, Clone)]
pub struct Csi {
    pub name: Name,
    pub si: Name,
    pub cs_type: String,
}

/// The full AMF entity graph, as the kernel sees it.
#[derive(Debug, Clone, Default)]
pub struct AmfGraph {
    pub clusters: HashMap<Name, Cluster>,
    pub nodes: HashMap<Name, Node>,
    pub apps: HashMap<Name, Application>,
    pub sgs: HashMap<Name, ServiceGroup>,
    pub sus: HashMap<Name, ServiceUnit>,
    pub comps: HashMap<Name, Component>,
    pub sis: HashMap<Name, ServiceInstance>,
    pub csis: HashMap<Name, Csi>,
}

impl AmfGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comp_mut(&mut self, name: &Name) -> Option<&mut Component> {
        self.comps.get_mut(name)
    }

    pub fn su_mut(&mut self, name: &Name) -> Option<&mut ServiceUnit> {
        self.sus.get_mut(name)
    }

    pub fn sg_mut(&mut self, name: &Name) -> Option<&mut ServiceGroup> {
        self.sgs.get_mut(name)
    }

    /// Every component hosted by `su`.
    pub fn comps_of_su<'a>(&'a self, su: &'a Name) -> impl Iterator<Item = &'a Component> + 'a {
        self.comps.values().filter(move |c| &c.su == su)
    }

    /// Every SU hosted by `node`.
    pub fn sus_of_node<'a>(&'a self, node: &'a Name) -> impl Iterator<Item = &'a ServiceUnit> + 'a {
        self.sus.values().filter(move |su| &su.node == node)
    }

    /// Every SU belonging to `sg`, ordered by configured rank.
    pub fn sus_of_sg(&self, sg: &Name) -> Vec<&ServiceUnit> {
        let mut v: Vec<&ServiceUnit> = self.sus.values().filter(|su| &su.sg == sg).collect();
        v.sort_by_key(|su| su.rank);
        v
    }
}
