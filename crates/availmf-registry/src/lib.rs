//! Service registry: handler tables and message routing (spec 4.D).
//!
//! Each service registers two tables. Library handlers answer
//! synchronous client requests and declare the reply shape they
//! promise up front (`response_size`, `response_id`) so a rejected
//! request can still be answered with the right envelope. Executive
//! handlers answer totem-delivered messages from other nodes and
//! declare which scalar fields need endian conversion when the sender
//! used a different byte order.

use std::collections::HashMap;

use availmf_types::{ErrorCode, MessageHeader, ServiceFnId, ServiceId};
use availmf_wire::ScalarField;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no handler registered for function {0}")]
    UnknownFunction(u16),
    #[error("no service registered for id {0}")]
    UnknownService(u16),
}

/// One library message handler's declared reply shape, plus whether
/// it requires the cluster's flow-control gate to be open.
pub struct LibHandler {
    pub response_size: u32,
    pub response_id: u32,
    pub flow_control_required: bool,
    handler: Box<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>,
}

impl LibHandler {
    pub fn new(
        response_size: u32,
        response_id: u32,
        flow_control_required: bool,
        handler: impl Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        Self { response_size, response_id, flow_control_required, handler: Box::new(handler) }
    }

    pub fn invoke(&self, request: &[u8]) -> Vec<u8> {
        (self.handler)(request)
    }
}

/// One executive (totem-delivered) message handler, plus the scalar
/// fields that must be byte-swapped when the sender's endianness
/// differs from ours.
pub struct ExecHandler {
    pub endian_fields: Vec<ScalarField>,
    handler: Box<dyn Fn(&[u8]) + Send + Sync>,
}

impl ExecHandler {
    pub fn new(endian_fields: Vec<ScalarField>, handler: impl Fn(&[u8]) + Send + Sync + 'static) -> Self {
        Self { endian_fields, handler: Box::new(handler) }
    }

    /// Applies endian conversion to a scratch copy when the sender's
    /// byte order differs from ours, then dispatches.
    pub fn invoke(&self, payload: &[u8], sender_is_foreign_endian: bool) {
        if sender_is_foreign_endian && !self.endian_fields.is_empty() {
            let mut buf = payload.to_vec();
            availmf_wire::convert_endian(&mut buf, &self.endian_fields);
            (self.handler)(&buf);
        } else {
            (self.handler)(payload);
        }
    }
}

#[derive(Default)]
struct ServiceTable {
    lib_handlers: HashMap<u16, LibHandler>,
    exec_handlers: HashMap<u16, ExecHandler>,
}

/// The cluster-wide registry of every service's handler tables.
#[derive(Default)]
pub struct Registry {
    services: HashMap<u16, ServiceTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_lib_handler(&mut self, service: ServiceId, msg_id: u16, handler: LibHandler) {
        self.services.entry(service.as_u16()).or_default().lib_handlers.insert(msg_id, handler);
    }

    pub fn register_exec_handler(&mut self, service: ServiceId, function: u16, handler: ExecHandler) {
        self.services.entry(service.as_u16()).or_default().exec_handlers.insert(function, handler);
    }

    /// Resolves and dispatches a totem-delivered executive message by
    /// its packed `(service, function)` wire id.
    pub fn dispatch_exec(&self, wire_id: u32, payload: &[u8], sender_is_foreign_endian: bool) -> Result<(), RegistryError> {
        let fn_id = ServiceFnId::unpack(wire_id);
        let table = self.services.get(&fn_id.service).ok_or(RegistryError::UnknownService(fn_id.service))?;
        let handler = table.exec_handlers.get(&fn_id.function).ok_or(RegistryError::UnknownFunction(fn_id.function))?;
        handler.invoke(payload, sender_is_foreign_endian);
        Ok(())
    }

    pub fn lib_handler(&self, service: ServiceId, msg_id: u16) -> Result<&LibHandler, RegistryError> {
        self.services
            .get(&service.as_u16())
            .ok_or(RegistryError::UnknownService(service.as_u16()))?
            .lib_handlers
            .get(&msg_id)
            .ok_or(RegistryError::UnknownFunction(msg_id))
    }
}

/// Inputs to the library-message admission test (spec 4.D).
#[derive(Debug, Clone, Copy)]
pub struct AdmissionContext {
    pub primary_component: bool,
    pub sync_in_progress: bool,
    pub group_send_ok: bool,
}

/// Decides whether a library message should be admitted, and if not,
/// builds the `TRY_AGAIN` reply header preserving the handler's
/// promised reply shape.
pub fn admit(ctx: AdmissionContext, handler: &LibHandler) -> Result<(), MessageHeader> {
    let flow_ok = !ctx.sync_in_progress || !handler.flow_control_required;
    if ctx.primary_component && flow_ok && ctx.group_send_ok {
        Ok(())
    } else {
        let mut header = MessageHeader::new(ServiceFnId::new(0, handler.response_id as u16), handler.response_size);
        header.error = ErrorCode::TryAgain.as_u32();
        Err(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use availmf_wire::ScalarWidth;

    #[test]
    fn dispatch_routes_by_packed_id() {
        let mut registry = Registry::new();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        registry.register_exec_handler(
            ServiceId::Ckpt,
            7,
            ExecHandler::new(vec![], move |payload| seen2.lock().unwrap().extend_from_slice(payload)),
        );

        let wire_id = ServiceFnId::new(ServiceId::Ckpt.as_u16(), 7).pack();
        registry.dispatch_exec(wire_id, &[1, 2, 3], false).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn dispatch_unknown_function_errors() {
        let registry = Registry::new();
        let wire_id = ServiceFnId::new(ServiceId::Ckpt.as_u16(), 99).pack();
        assert_eq!(registry.dispatch_exec(wire_id, &[], false), Err(RegistryError::UnknownService(ServiceId::Ckpt.as_u16())));
    }

    #[test]
    fn foreign_endian_payload_is_converted_before_dispatch() {
        let mut registry = Registry::new();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        registry.register_exec_handler(
            ServiceId::Ckpt,
            1,
            ExecHandler::new(vec![ScalarField::new(0, ScalarWidth::Four)], move |payload| {
                seen2.lock().unwrap().extend_from_slice(payload)
            }),
        );
        let wire_id = ServiceFnId::new(ServiceId::Ckpt.as_u16(), 1).pack();
        registry.dispatch_exec(wire_id, &[0x01, 0x02, 0x03, 0x04], true).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn admission_rejects_when_not_primary() {
        let handler = LibHandler::new(16, 42, false, |_| Vec::new());
        let ctx = AdmissionContext { primary_component: false, sync_in_progress: false, group_send_ok: true };
        let err = admit(ctx, &handler).unwrap_err();
        assert_eq!(err.error, ErrorCode::TryAgain.as_u32());
        assert_eq!(err.size, MessageHeader::ENCODED_LEN as u32 + 16);
    }

    #[test]
    fn flow_control_required_handler_blocked_during_sync() {
        let handler = LibHandler::new(0, 1, true, |_| Vec::new());
        let ctx = AdmissionContext { primary_component: true, sync_in_progress: true, group_send_ok: true };
        assert!(admit(ctx, &handler).is_err());
    }

    #[test]
    fn non_flow_controlled_handler_admitted_during_sync() {
        let handler = LibHandler::new(0, 1, false, |_| Vec::new());
        let ctx = AdmissionContext { primary_component: true, sync_in_progress: true, group_send_ok: true };
        assert!(admit(ctx, &handler).is_ok());
    }
}
