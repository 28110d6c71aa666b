//! Owns the per-node state the main loop never shares or locks (spec
//! section 5): the AMF graph, the checkpoint store, the unified timer
//! wheel, and the cross-service sync driver. Grounded on
//! `kimberlite-kernel::kernel::apply_committed`'s consuming/returning
//! state shape, reused here by taking the graph out of its `RefCell`
//! for the duration of one `apply_event` call and putting the result
//! back.

use std::cell::RefCell;
use std::rc::Rc;

use availmf_amf::{apply_event, AmfError, AmfEvent, AmfGraph, Effect, PresenceEvent};
use availmf_checkpoint::CheckpointStore;
use availmf_config::AmfCatalog;
use availmf_launcher::LaunchOperation;
use availmf_sync::SyncDriver;
use availmf_timer::{TimerHandle, TimerWheel};
use availmf_totem::{port::ConfchgType, ConfchgEvent, GroupPort};
use availmf_types::NodeId;

use crate::amf_sync::AmfSyncParticipant;
use crate::checkpoint_sync::CheckpointSyncParticipant;
use crate::error::NodeError;
use crate::timer_event::NodeTimerEvent;
use crate::{bootstrap, hooks};

pub struct NodeEngine {
    graph: Rc<RefCell<AmfGraph>>,
    checkpoint_store: Rc<RefCell<CheckpointStore>>,
    timers: TimerWheel<NodeTimerEvent>,
    sync: SyncDriver,
    #[allow(dead_code)]
    local_node: NodeId,
}

impl NodeEngine {
    fn assemble(graph: AmfGraph, local_node: NodeId) -> Self {
        let graph = Rc::new(RefCell::new(graph));
        let checkpoint_store = Rc::new(RefCell::new(CheckpointStore::new()));

        let mut sync = SyncDriver::new();
        sync.register(Box::new(AmfSyncParticipant::new(graph.clone())));
        sync.register(Box::new(CheckpointSyncParticipant::new(checkpoint_store.clone(), local_node, 0)));

        Self { graph, checkpoint_store, timers: TimerWheel::new(), sync, local_node }
    }

    pub fn new(local_node: NodeId) -> Self {
        Self::assemble(AmfGraph::new(), local_node)
    }

    /// Builds the node's initial graph from a cluster's static catalog
    /// (spec 4.O), rather than starting empty.
    pub fn from_catalog(catalog: &AmfCatalog, local_node: NodeId) -> Result<Self, NodeError> {
        let graph = bootstrap::graph_from_catalog(catalog)?;
        Ok(Self::assemble(graph, local_node))
    }

    pub fn graph(&self) -> std::cell::Ref<'_, AmfGraph> {
        self.graph.borrow()
    }

    pub fn graph_mut(&self) -> std::cell::RefMut<'_, AmfGraph> {
        self.graph.borrow_mut()
    }

    pub fn checkpoint_store(&self) -> std::cell::Ref<'_, CheckpointStore> {
        self.checkpoint_store.borrow()
    }

    pub fn checkpoint_store_mut(&self) -> std::cell::RefMut<'_, CheckpointStore> {
        self.checkpoint_store.borrow_mut()
    }

    /// Runs one AMF event through `apply_event`, swapping the graph out
    /// of its cell for the call since `apply_event` consumes and
    /// returns owned state. `apply_event` drops its input on an error
    /// path rather than handing it back, so the slot is seeded with a
    /// clone first and only overwritten on success, matching the
    /// "failure path leaves state unchanged" rule every executive
    /// handler is expected to honor.
    pub fn dispatch_amf(&mut self, event: AmfEvent) -> Result<Vec<Effect>, AmfError> {
        let mut slot = self.graph.borrow_mut();
        let before = slot.clone();
        let taken = std::mem::replace(&mut *slot, AmfGraph::new());
        match apply_event(taken, event) {
            Ok((next, effects)) => {
                *slot = next;
                Ok(effects)
            }
            Err(err) => {
                *slot = before;
                tracing::warn!(error = %err, "amf event rejected, graph unchanged");
                Err(err)
            }
        }
    }

    /// Carries out the subset of `effects` that require launching an OS
    /// process (spec 4.L), feeding the launcher's outcome back through
    /// `dispatch_amf` where the presence machine expects a reply.
    /// Effects with no launcher involvement (timer starts, healthcheck
    /// callbacks, diagnostics) are left to whatever owns the rest of
    /// the executive surface; see the crate's module doc comment.
    pub async fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RunInstantiateHook { comp } => {
                    let graph = self.graph.borrow().clone();
                    hooks::run_hook(&graph, &comp, LaunchOperation::Instantiate).await;
                }
                Effect::RunTerminateHook { comp } => {
                    let graph = self.graph.borrow().clone();
                    if let Some(outcome) = hooks::run_hook(&graph, &comp, LaunchOperation::Terminate).await {
                        let event = hooks::terminate_event(outcome);
                        if let Err(err) = self.dispatch_amf(AmfEvent::Presence { comp, event }) {
                            tracing::warn!(error = %err, "terminate callback result rejected");
                        }
                    }
                }
                Effect::RunCleanupHook { comp } => {
                    let graph = self.graph.borrow().clone();
                    if let Some(outcome) = hooks::run_hook(&graph, &comp, LaunchOperation::Cleanup).await {
                        let event = hooks::cleanup_event(outcome);
                        if let Err(err) = self.dispatch_amf(AmfEvent::Presence { comp, event }) {
                            tracing::warn!(error = %err, "cleanup callback result rejected");
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Reacts to a confchg notification: a `REGULAR` confchg starts a
    /// new sync round; a `TRANSITIONAL` one interrupts any round
    /// already in progress.
    pub fn handle_confchg(&mut self, event: &ConfchgEvent) {
        match event.kind {
            ConfchgType::Transitional => {
                if self.sync.is_running() {
                    tracing::info!("transitional confchg interrupts in-progress sync round");
                    self.sync.abort_round();
                }
            }
            ConfchgType::Regular => {
                tracing::info!(ring_id = %event.ring_id, "regular confchg starting sync round");
                self.sync.start_round();
            }
        }
    }

    /// Advances the sync round by one step. Returns `true` once the
    /// round has committed (or there was nothing to run).
    pub fn drive_sync(&mut self, port: &mut dyn GroupPort) -> bool {
        if !self.sync.is_running() {
            return true;
        }
        match self.sync.drive(port) {
            availmf_sync::SyncProgress::Progress => false,
            availmf_sync::SyncProgress::Done => {
                self.sync.finish_round();
                true
            }
        }
    }

    pub fn schedule_timer(&mut self, now: u64, duration_ns: u64, event: NodeTimerEvent) -> TimerHandle {
        self.timers.add_duration(now, duration_ns, event)
    }

    pub fn cancel_timer(&mut self, handle: TimerHandle) -> Option<NodeTimerEvent> {
        self.timers.cancel(handle)
    }

    pub fn next_timer_deadline(&self, now: u64) -> Option<u64> {
        self.timers.poll_timeout(now)
    }

    /// Fires every timer due by `now`: AMF timeouts go through
    /// `apply_event`, checkpoint timeouts through the store's own
    /// internal wheel.
    pub fn tick(&mut self, now: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        for (_, timer) in self.timers.poll_expired(now) {
            let event = match timer {
                NodeTimerEvent::Healthcheck { comp, key, event } => AmfEvent::Healthcheck { comp, key, event },
                NodeTimerEvent::InstantiateTimeout { comp } => AmfEvent::Presence { comp, event: PresenceEvent::InstantiateTimeout },
                NodeTimerEvent::CleanupTimeout { comp } => AmfEvent::Presence { comp, event: PresenceEvent::CleanupTimeout },
            };
            match self.dispatch_amf(event) {
                Ok(mut fx) => effects.append(&mut fx),
                Err(err) => tracing::warn!(error = %err, "timer-driven event rejected"),
            }
        }
        self.checkpoint_store.borrow_mut().poll_expired(now);
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use availmf_amf::{Capability, Component, ComponentCategory, HealthcheckEvent, OperState, PresenceState};
    use availmf_totem::{sim::SimBus, sim::SimGroup};
    use availmf_types::Name;

    fn comp(name: &str) -> Component {
        Component {
            name: Name::new(name).unwrap(),
            su: Name::new("su1").unwrap(),
            comptype: "test".to_string(),
            category: ComponentCategory::SaAware,
            capability: Capability::OneActive,
            num_max_active_csi: 1,
            num_max_standby_csi: 1,
            instantiation_level: 1,
            default_clc_cli_timeout_ns: 1_000_000_000,
            default_callback_timeout_ns: 1_000_000_000,
            instantiate_cmd: "/bin/true".to_string(),
            terminate_cmd: None,
            cleanup_cmd: "/bin/true".to_string(),
            am_start_cmd: None,
            am_stop_cmd: None,
            clccli_path: None,
            env: Vec::new(),
            proxy_name: None,
            presence_state: PresenceState::Uninstantiated,
            oper_state: OperState::Disabled,
            error_suspected: false,
            restart_count: 0,
            recovery_on_error: availmf_amf::RecommendedRecovery::NoRecommendation,
            disable_restart: false,
            healthchecks: Default::default(),
        }
    }

    #[test]
    fn dispatch_amf_mutates_graph_in_place() {
        let mut engine = NodeEngine::new(NodeId::new(1));
        engine.graph_mut().comps.insert(Name::new("c1").unwrap(), comp("c1"));

        let effects = engine
            .dispatch_amf(AmfEvent::Presence { comp: Name::new("c1").unwrap(), event: PresenceEvent::InstantiateRequested })
            .unwrap();
        assert!(!effects.is_empty());
        assert_eq!(
            engine.graph().comps.get(&Name::new("c1").unwrap()).unwrap().presence_state,
            PresenceState::Instantiating(availmf_amf::InstantiatingStep::Instantiate)
        );
    }

    #[test]
    fn timer_tick_drives_instantiate_timeout() {
        let mut engine = NodeEngine::new(NodeId::new(1));
        engine.graph_mut().comps.insert(Name::new("c1").unwrap(), comp("c1"));
        engine.dispatch_amf(AmfEvent::Presence { comp: Name::new("c1").unwrap(), event: PresenceEvent::InstantiateRequested }).unwrap();

        engine.schedule_timer(0, 1_000, NodeTimerEvent::InstantiateTimeout { comp: Name::new("c1").unwrap() });
        let effects = engine.tick(2_000);
        assert!(!effects.is_empty());
        assert_eq!(engine.graph().comps.get(&Name::new("c1").unwrap()).unwrap().presence_state, PresenceState::InstantiationFailed);
    }

    #[test]
    fn regular_confchg_with_nothing_registered_completes_immediately() {
        let mut engine = NodeEngine::new(NodeId::new(1));
        let bus = SimBus::new(4);
        let mut group = SimGroup::new(NodeId::new(1), bus);
        engine.handle_confchg(&ConfchgEvent {
            kind: ConfchgType::Regular,
            members: vec![NodeId::new(1)],
            left: vec![],
            joined: vec![],
            ring_id: availmf_types::RingId::new(NodeId::new(1), 1),
        });
        assert!(engine.drive_sync(&mut group));
    }

    #[test]
    fn healthcheck_timer_event_routes_through_tick() {
        let mut engine = NodeEngine::new(NodeId::new(1));
        let mut c = comp("c1");
        c.presence_state = PresenceState::Instantiated;
        c.healthchecks.insert(
            "hc1".to_string(),
            availmf_amf::HealthcheckConfig {
                key: "hc1".to_string(),
                kind: availmf_amf::HealthcheckKind::AmfInvoked,
                period_ns: 1_000,
                max_duration_ns: 5_000,
                recommended_recovery: availmf_amf::RecommendedRecovery::ComponentRestart,
            },
        );
        engine.graph_mut().comps.insert(Name::new("c1").unwrap(), c);

        engine.schedule_timer(
            0,
            0,
            NodeTimerEvent::Healthcheck { comp: Name::new("c1").unwrap(), key: "hc1".to_string(), event: HealthcheckEvent::PeriodElapsed },
        );
        let effects = engine.tick(100);
        assert!(!effects.is_empty());
    }

    #[tokio::test]
    async fn run_effects_drives_cleanup_hook_and_reports_outcome() {
        let mut engine = NodeEngine::new(NodeId::new(1));
        let mut c = comp("c1");
        c.presence_state = PresenceState::Terminating(availmf_amf::TerminatingStep::Cleanup);
        engine.graph_mut().comps.insert(Name::new("c1").unwrap(), c);

        engine.run_effects(vec![Effect::RunCleanupHook { comp: Name::new("c1").unwrap() }]).await;

        assert_eq!(engine.graph().comps.get(&Name::new("c1").unwrap()).unwrap().presence_state, PresenceState::Uninstantiated);
    }
}
