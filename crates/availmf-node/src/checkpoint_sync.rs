//! Adapts the checkpoint service's own sender/recipient sync protocol
//! (`availmf_checkpoint::sync`) to the generic [`SyncParticipant`] seam
//! every service plugs into the node's cross-service sync round
//! through.
//!
//! `sync_process` drives only this node's *send* walk over its own
//! checkpoint list; incoming `SYNC_STATE`/`SYNC_SECTION` messages
//! (including the sender's own messages reflected back by the group,
//! since totem delivery always includes the sender) are fed into the
//! accumulator independently via [`CheckpointSyncParticipant::receive`]
//! as they're delivered, off the critical path of `sync_process`
//! reporting `Done`.

use std::cell::RefCell;
use std::rc::Rc;

use availmf_checkpoint::{CheckpointStore, SyncDriver as CkptSendDriver, SyncMessage, SyncReconciliation};
use availmf_totem::GroupPort;
use availmf_types::{NodeId, RingId, ServiceId};

use availmf_sync::{SyncParticipant, SyncProgress};

pub struct CheckpointSyncParticipant {
    store: Rc<RefCell<CheckpointStore>>,
    local_node: NodeId,
    now: u64,
    send_driver: Option<CkptSendDriver>,
    reconciliation: SyncReconciliation,
}

impl CheckpointSyncParticipant {
    pub fn new(store: Rc<RefCell<CheckpointStore>>, local_node: NodeId, now: u64) -> Self {
        Self { store, local_node, now, send_driver: None, reconciliation: SyncReconciliation::new() }
    }

    /// Feeds one delivered sync message into the reconciliation
    /// accumulator. Called by the node's executive dispatch for every
    /// `SYNC_STATE`/`SYNC_SECTION` message, regardless of sender.
    pub fn receive(&mut self, msg: SyncMessage) {
        match msg {
            SyncMessage::State { name, attrs, descriptor, ref_per_node, .. } => {
                self.reconciliation.apply_state(name, attrs, descriptor, self.now, ref_per_node);
            }
            SyncMessage::Section { name, section_id, offset, bytes } => {
                self.reconciliation.apply_section(&name, section_id, offset, &bytes, self.now);
            }
        }
    }
}

impl SyncParticipant for CheckpointSyncParticipant {
    fn service_id(&self) -> ServiceId {
        ServiceId::Ckpt
    }

    fn sync_init(&mut self) {
        let saved_ring_id = RingId::new(self.local_node, 0);
        let guard = self.store.borrow();
        let driver = CkptSendDriver::sync_init(&guard, saved_ring_id);
        drop(guard);
        self.send_driver = Some(driver);
        self.reconciliation = SyncReconciliation::new();
    }

    fn sync_process(&mut self, port: &mut dyn GroupPort) -> SyncProgress {
        let Some(driver) = self.send_driver.as_mut() else {
            return SyncProgress::Done;
        };
        match driver.sync_process(port) {
            availmf_checkpoint::SyncProgress::Progress => SyncProgress::Progress,
            availmf_checkpoint::SyncProgress::Done => SyncProgress::Done,
        }
    }

    fn sync_activate(&mut self) {
        let reconciliation = std::mem::replace(&mut self.reconciliation, SyncReconciliation::new());
        self.store.borrow_mut().sync_activate(reconciliation, self.now);
        self.send_driver = None;
    }

    fn sync_abort(&mut self) {
        let reconciliation = std::mem::replace(&mut self.reconciliation, SyncReconciliation::new());
        self.store.borrow().sync_abort(reconciliation);
        self.send_driver = None;
    }
}
