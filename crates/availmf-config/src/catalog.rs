//! The per-node AMF component catalog: a flat, declarative description
//! of applications, service groups, service units, components,
//! service instances and CSIs, read once at startup and turned into a
//! live `AmfGraph` by the node that owns it. Kept independent of
//! `availmf-amf`'s runtime types (which mix static configuration with
//! mutable state) so the config crate has nothing to invalidate once
//! the graph starts moving.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedundancyModelSpec {
    NoRedundancy,
    TwoN,
    NPlusM,
    NWay,
    NWayActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategorySpec {
    SaAware,
    Proxy,
    Proxied,
    Local,
}

/// spec 4.J capability model, as declared in the static catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilitySpec {
    XActiveAndYStandby,
    XActiveOrYStandby,
    OneActiveOrYStandby,
    OneActiveOrOneStandby,
    XActive,
    OneActive,
    NonPreInstantiable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthcheckSpec {
    pub key: String,
    /// `true` for `AMF_INVOKED`, `false` for `COMPONENT_INVOKED`.
    pub amf_invoked: bool,
    pub period_ns: u64,
    pub max_duration_ns: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub su: String,
    pub comptype: String,
    pub category: ComponentCategorySpec,
    pub capability: CapabilitySpec,
    #[serde(default = "default_max_csi")]
    pub num_max_active_csi: u32,
    #[serde(default = "default_max_csi")]
    pub num_max_standby_csi: u32,
    #[serde(default = "default_instantiation_level")]
    pub instantiation_level: u32,
    #[serde(default = "default_timeout_ns")]
    pub default_clc_cli_timeout_ns: u64,
    #[serde(default = "default_timeout_ns")]
    pub default_callback_timeout_ns: u64,
    pub instantiate_cmd: String,
    #[serde(default)]
    pub terminate_cmd: Option<String>,
    pub cleanup_cmd: String,
    #[serde(default)]
    pub am_start_cmd: Option<String>,
    #[serde(default)]
    pub am_stop_cmd: Option<String>,
    #[serde(default)]
    pub clccli_path: Option<String>,
    #[serde(default)]
    pub env: Vec<(String, String)>,
    #[serde(default)]
    pub healthchecks: Vec<HealthcheckSpec>,
}

fn default_max_csi() -> u32 {
    1
}

fn default_instantiation_level() -> u32 {
    1
}

fn default_timeout_ns() -> u64 {
    1_000_000_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceUnitSpec {
    pub name: String,
    pub sg: String,
    pub node: String,
    pub rank: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceGroupSpec {
    pub name: String,
    pub app: String,
    pub redundancy_model: RedundancyModelSpec,
    pub restart_max: u32,
    #[serde(default)]
    pub su_restart_max: u32,
    pub su_failover_max: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSpec {
    pub name: String,
    #[serde(default)]
    pub clccli_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstanceSpec {
    pub name: String,
    pub sg: String,
    /// Preferred assignment order of service units, by name.
    #[serde(default)]
    pub rank: Vec<String>,
    #[serde(default = "default_pref_assignments")]
    pub pref_active_assignments: u32,
    #[serde(default = "default_pref_assignments")]
    pub pref_standby_assignments: u32,
}

fn default_pref_assignments() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsiSpec {
    pub name: String,
    pub si: String,
    pub cs_type: String,
}

/// The full static catalog for one cluster: every application, service
/// group, service unit, component, service instance and CSI, declared
/// flat and cross-referenced by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmfCatalog {
    #[serde(default)]
    pub apps: Vec<ApplicationSpec>,
    #[serde(default)]
    pub sgs: Vec<ServiceGroupSpec>,
    #[serde(default)]
    pub sus: Vec<ServiceUnitSpec>,
    #[serde(default)]
    pub comps: Vec<ComponentSpec>,
    #[serde(default)]
    pub sis: Vec<ServiceInstanceSpec>,
    #[serde(default)]
    pub csis: Vec<CsiSpec>,
}
