//! # availmf-sync: cross-service synchronization driver (spec 4.C)
//!
//! On every `REGULAR` confchg following a membership change, the node
//! event loop runs every registered service through one sync round: in
//! `service_id` order, `sync_init` then repeated `sync_process` until
//! `Done`, committing with `sync_activate` on every service once all of
//! them finish, or discarding the round with `sync_abort` if a new
//! configuration change interrupts it first.
//!
//! This is distinct from `availmf-checkpoint`'s own internal
//! sender/recipient reconciliation protocol, which handles the wire
//! shape of one service's sync messages; this crate is the outer
//! sequencer a [`participant::SyncParticipant`] implementation (such as
//! one wrapping `availmf_checkpoint::SyncDriver`) plugs into.

mod driver;
mod idempotence;
mod participant;

pub use driver::SyncDriver;
pub use idempotence::RingIdGate;
pub use participant::{SyncParticipant, SyncProgress};
