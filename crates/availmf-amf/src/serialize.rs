//! Serialization for sync (spec 4.J): encodes the fields a joining
//! node needs to reconstruct a component's runtime state into the
//! checkpoint-style byte stream carried by the sync protocol. Strings
//! and opaque blobs are length-prefixed with a 32-bit count, matching
//! the framing `availmf-wire` uses for executive message headers.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::entity::Component;
use crate::oper::OperState;
use crate::presence::{InstantiatingStep, PresenceState, RestartingStep, TerminatingStep};
use crate::recovery::RecommendedRecovery;

fn put_str(buf: &mut BytesMut, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn get_str(buf: &mut Bytes) -> String {
    let len = buf.get_u32() as usize;
    let bytes = buf.split_to(len);
    String::from_utf8_lossy(&bytes).into_owned()
}

fn put_opt_str(buf: &mut BytesMut, s: Option<&str>) {
    match s {
        Some(s) => {
            buf.put_u8(1);
            put_str(buf, s);
        }
        None => buf.put_u8(0),
    }
}

fn get_opt_str(buf: &mut Bytes) -> Option<String> {
    if buf.get_u8() == 1 {
        Some(get_str(buf))
    } else {
        None
    }
}

fn oper_state_tag(s: OperState) -> u8 {
    match s {
        OperState::Enabled => 0,
        OperState::Disabled => 1,
    }
}

fn oper_state_from_tag(tag: u8) -> OperState {
    match tag {
        0 => OperState::Enabled,
        _ => OperState::Disabled,
    }
}

fn presence_state_tag(s: PresenceState) -> (u8, u8) {
    match s {
        PresenceState::Uninstantiated => (0, 0),
        PresenceState::Instantiating(InstantiatingStep::Instantiate) => (1, 0),
        PresenceState::Instantiating(InstantiatingStep::InstantiateDelay) => (1, 1),
        PresenceState::Instantiating(InstantiatingStep::Cleanup) => (1, 2),
        PresenceState::Instantiated => (2, 0),
        PresenceState::Terminating(TerminatingStep::Terminate) => (3, 0),
        PresenceState::Terminating(TerminatingStep::Cleanup) => (3, 1),
        PresenceState::Restarting(RestartingStep::Terminate) => (4, 0),
        PresenceState::Restarting(RestartingStep::Instantiate) => (4, 1),
        PresenceState::Restarting(RestartingStep::InstantiateDelay) => (4, 2),
        PresenceState::Restarting(RestartingStep::Cleanup) => (4, 3),
        PresenceState::InstantiationFailed => (5, 0),
        PresenceState::TerminationFailed => (6, 0),
    }
}

fn presence_state_from_tag(tag: u8, sub: u8) -> PresenceState {
    match (tag, sub) {
        (0, _) => PresenceState::Uninstantiated,
        (1, 0) => PresenceState::Instantiating(InstantiatingStep::Instantiate),
        (1, 1) => PresenceState::Instantiating(InstantiatingStep::InstantiateDelay),
        (1, _) => PresenceState::Instantiating(InstantiatingStep::Cleanup),
        (2, _) => PresenceState::Instantiated,
        (3, 0) => PresenceState::Terminating(TerminatingStep::Terminate),
        (3, _) => PresenceState::Terminating(TerminatingStep::Cleanup),
        (4, 0) => PresenceState::Restarting(RestartingStep::Terminate),
        (4, 1) => PresenceState::Restarting(RestartingStep::Instantiate),
        (4, 2) => PresenceState::Restarting(RestartingStep::InstantiateDelay),
        (4, _) => PresenceState::Restarting(RestartingStep::Cleanup),
        (5, _) => PresenceState::InstantiationFailed,
        _ => PresenceState::TerminationFailed,
    }
}

fn recovery_tag(r: RecommendedRecovery) -> u8 {
    match r {
        RecommendedRecovery::NoRecommendation => 0,
        RecommendedRecovery::ComponentRestart => 1,
        RecommendedRecovery::ComponentFailover => 2,
        RecommendedRecovery::NodeFailover => 3,
        RecommendedRecovery::NodeFailfast => 4,
        RecommendedRecovery::NodeSwitchover => 5,
        RecommendedRecovery::ClusterReset => 6,
        RecommendedRecovery::ApplicationRestart => 7,
    }
}

fn recovery_from_tag(tag: u8) -> RecommendedRecovery {
    match tag {
        1 => RecommendedRecovery::ComponentRestart,
        2 => RecommendedRecovery::ComponentFailover,
        3 => RecommendedRecovery::NodeFailover,
        4 => RecommendedRecovery::NodeFailfast,
        5 => RecommendedRecovery::NodeSwitchover,
        6 => RecommendedRecovery::ClusterReset,
        7 => RecommendedRecovery::ApplicationRestart,
        _ => RecommendedRecovery::NoRecommendation,
    }
}

/// The runtime tuple the spec calls out: `(oper_state, presence_state,
/// restart_count, proxy_name, clccli_path, comptype, error_suspected)`,
/// plus enough identity (`name`, `su`) for the receiver to place it
/// under the right parent.
pub fn encode_component(c: &Component) -> Bytes {
    let mut buf = BytesMut::new();
    put_str(&mut buf, c.name.as_str());
    put_str(&mut buf, c.su.as_str());
    buf.put_u8(oper_state_tag(c.oper_state));
    let (tag, sub) = presence_state_tag(c.presence_state);
    buf.put_u8(tag);
    buf.put_u8(sub);
    buf.put_u32(c.restart_count);
    put_opt_str(&mut buf, c.proxy_name.as_ref().map(|n| n.as_str()));
    put_opt_str(&mut buf, c.clccli_path.as_deref());
    put_str(&mut buf, &c.comptype);
    buf.put_u8(u8::from(c.error_suspected));
    buf.put_u8(recovery_tag(c.recovery_on_error));
    buf.freeze()
}

/// Decoded form of [`encode_component`]; the caller splices these
/// fields onto a fresh `Component` it constructs under the already
/// known `su`/`name` parent from the entity graph being reconstructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRuntimeSnapshot {
    pub name: String,
    pub su: String,
    pub oper_state: OperState,
    pub presence_state: PresenceState,
    pub restart_count: u32,
    pub proxy_name: Option<String>,
    pub clccli_path: Option<String>,
    pub comptype: String,
    pub error_suspected: bool,
    pub recovery_on_error: RecommendedRecovery,
}

pub fn decode_component(bytes: Bytes) -> ComponentRuntimeSnapshot {
    let mut buf = bytes;
    let name = get_str(&mut buf);
    let su = get_str(&mut buf);
    let oper_state = oper_state_from_tag(buf.get_u8());
    let tag = buf.get_u8();
    let sub = buf.get_u8();
    let presence_state = presence_state_from_tag(tag, sub);
    let restart_count = buf.get_u32();
    let proxy_name = get_opt_str(&mut buf);
    let clccli_path = get_opt_str(&mut buf);
    let comptype = get_str(&mut buf);
    let error_suspected = buf.get_u8() != 0;
    let recovery_on_error = recovery_from_tag(buf.get_u8());
    ComponentRuntimeSnapshot { name, su, oper_state, presence_state, restart_count, proxy_name, clccli_path, comptype, error_suspected, recovery_on_error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Capability, ComponentCategory};
    use availmf_types::Name;
    use std::collections::HashMap;

    fn sample() -> Component {
        Component {
            name: Name::new("comp1").unwrap(),
            su: Name::new("su1").unwrap(),
            comptype: "MyType".into(),
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
            clccli_path: Some("/opt/comp".into()),
            env: vec![],
            proxy_name: None,
            presence_state: PresenceState::Restarting(RestartingStep::Cleanup),
            oper_state: OperState::Disabled,
            error_suspected: true,
            restart_count: 3,
            recovery_on_error: RecommendedRecovery::ComponentFailover,
            disable_restart: false,
            healthchecks: HashMap::new(),
        }
    }

    #[test]
    fn round_trips_runtime_tuple() {
        let c = sample();
        let encoded = encode_component(&c);
        let decoded = decode_component(encoded);
        assert_eq!(decoded.name, "comp1");
        assert_eq!(decoded.su, "su1");
        assert_eq!(decoded.oper_state, OperState::Disabled);
        assert_eq!(decoded.presence_state, PresenceState::Restarting(RestartingStep::Cleanup));
        assert_eq!(decoded.restart_count, 3);
        assert_eq!(decoded.clccli_path.as_deref(), Some("/opt/comp"));
        assert_eq!(decoded.proxy_name, None);
        assert_eq!(decoded.comptype, "MyType");
        assert!(decoded.error_suspected);
        assert_eq!(decoded.recovery_on_error, RecommendedRecovery::ComponentFailover);
    }
}
