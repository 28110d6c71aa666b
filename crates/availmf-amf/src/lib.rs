//! AMF data model and lifecycle (spec 4.J/4.K).
//!
//! All mutation of the entity graph happens through
//! [`kernel::apply_event`], a pure function from `(graph, event)` to
//! `(graph, effects)`. Every node in the cluster is expected to call it
//! with the same event stream in the same order, which is how the
//! cluster stays coherent without locking the graph.

mod effect;
mod entity;
mod error;
mod event;
mod ha;
mod healthcheck;
mod kernel;
mod oper;
mod orchestration;
mod presence;
mod readiness;
mod recovery;
mod serialize;

pub use effect::Effect;
pub use entity::{
    AdminState, AmfGraph, Application, Capability, Cluster, Component, ComponentCategory, Csi, Node, RedundancyModel, ServiceGroup,
    ServiceInstance, ServiceUnit,
};
pub use error::AmfError;
pub use event::AmfEvent;
pub use ha::{AssignmentOutcome, CsiAssignment, CsiSetFlag, HaState};
pub use healthcheck::{HealthcheckConfig, HealthcheckEffect, HealthcheckEvent, HealthcheckKind};
pub use kernel::apply_event;
pub use oper::OperState;
pub use orchestration::{assign_pending, begin_switchover};
pub use presence::{InstantiatingStep, PresenceEffect, PresenceEvent, PresenceState, RestartingStep, TerminatingStep};
pub use readiness::{derive as derive_readiness, Readiness};
pub use recovery::{resolve as resolve_recovery, EscalationStep, RecommendedRecovery, RecoveryAction, SuCounters, SuEscalation};
pub use serialize::{decode_component, encode_component, ComponentRuntimeSnapshot};
