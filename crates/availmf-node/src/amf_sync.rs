//! Adapts the AMF graph's runtime-tuple codec (`availmf_amf::serialize`)
//! to the generic [`SyncParticipant`] seam: one multicast per component,
//! framed with `availmf-wire`'s length-prefixed blob encoding, sent in
//! component-name order with the same yield-on-back-pressure/resume
//! discipline the checkpoint sync walk uses.

use std::cell::RefCell;
use std::rc::Rc;

use availmf_amf::{decode_component, encode_component, AmfGraph, ComponentRuntimeSnapshot};
use availmf_totem::{port::McastGuarantee, GroupPort};
use availmf_types::ServiceId;
use availmf_wire::{Decoder, Encoder};

use availmf_sync::{SyncParticipant, SyncProgress};

pub struct AmfSyncParticipant {
    graph: Rc<RefCell<AmfGraph>>,
    send_order: Vec<String>,
    cursor: usize,
    pending: Vec<ComponentRuntimeSnapshot>,
}

impl AmfSyncParticipant {
    pub fn new(graph: Rc<RefCell<AmfGraph>>) -> Self {
        Self { graph, send_order: Vec::new(), cursor: 0, pending: Vec::new() }
    }

    /// Feeds one delivered component snapshot into the pending list,
    /// applied to the graph at `sync_activate`.
    pub fn receive(&mut self, payload: &[u8]) {
        let mut decoder = Decoder::new(payload);
        let Ok(bytes) = decoder.get_bytes() else {
            tracing::warn!("malformed AMF sync payload");
            return;
        };
        self.pending.push(decode_component(bytes));
    }
}

impl SyncParticipant for AmfSyncParticipant {
    fn service_id(&self) -> ServiceId {
        ServiceId::Amf
    }

    fn sync_init(&mut self) {
        let mut names: Vec<String> = self.graph.borrow().comps.keys().map(|n| n.as_str().to_string()).collect();
        names.sort();
        self.send_order = names;
        self.cursor = 0;
        self.pending.clear();
    }

    fn sync_process(&mut self, port: &mut dyn GroupPort) -> SyncProgress {
        while self.cursor < self.send_order.len() {
            let name = &self.send_order[self.cursor];
            let graph = self.graph.borrow();
            let Some(comp) = graph.comps.values().find(|c| c.name.as_str() == name) else {
                drop(graph);
                self.cursor += 1;
                continue;
            };
            let encoded = encode_component(comp);
            drop(graph);
            let payload = Encoder::new().put_bytes(&encoded).finish();
            if !port.send_ok(payload.len()) {
                return SyncProgress::Progress;
            }
            match port.mcast(&payload, McastGuarantee::Retriable) {
                Ok(()) => self.cursor += 1,
                Err(_) => return SyncProgress::Progress,
            }
        }
        SyncProgress::Done
    }

    fn sync_activate(&mut self) {
        let mut graph = self.graph.borrow_mut();
        for snapshot in self.pending.drain(..) {
            if let Some(comp) = graph.comps.values_mut().find(|c| c.name.as_str() == snapshot.name) {
                comp.oper_state = snapshot.oper_state;
                comp.presence_state = snapshot.presence_state;
                comp.restart_count = snapshot.restart_count;
                comp.error_suspected = snapshot.error_suspected;
                comp.recovery_on_error = snapshot.recovery_on_error;
            }
        }
    }

    fn sync_abort(&mut self) {
        self.pending.clear();
    }
}
