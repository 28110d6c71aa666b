//! # availmf-config: cluster topology and component catalog (spec 4.O)
//!
//! Read once at startup, never rewritten by the running cluster: node
//! addresses and peer lists, the static AMF component catalog every
//! node instantiates identically, and the checkpoint/timer defaults
//! other services fall back to absent a per-call override.

mod catalog;
mod cluster;
mod error;

pub use catalog::{
    AmfCatalog, ApplicationSpec, CapabilitySpec, ComponentCategorySpec, ComponentSpec, CsiSpec, HealthcheckSpec, RedundancyModelSpec,
    ServiceGroupSpec, ServiceInstanceSpec, ServiceUnitSpec,
};
pub use cluster::{CheckpointDefaults, ClusterConfig, NodeSpec, TimerTunables};
pub use error::ConfigError;
