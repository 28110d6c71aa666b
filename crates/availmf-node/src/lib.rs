//! # availmf-node: the per-node event loop
//!
//! Composes the pieces spec section 5 calls out as "exclusively owned
//! by the main loop and never locked": the AMF graph
//! (`availmf_amf::AmfGraph`), the checkpoint store
//! (`availmf_checkpoint::CheckpointStore`), the timer wheel
//! (`availmf_timer::TimerWheel`), and the cross-service sync driver
//! (`availmf_sync::SyncDriver`), wiring the AMF graph and the
//! checkpoint store in as sync participants through their own codecs.
//!
//! The graph can be seeded from a static catalog
//! (`availmf_config::AmfCatalog`) via `NodeEngine::from_catalog`, and
//! launcher hooks (`availmf_launcher`) are run for the effects the
//! timer-driven side of the kernel produces, with the outcome routed
//! back in as the matching presence event.
//!
//! Full executive-message routing through `availmf_registry::Registry`
//! and client IPC through `availmf_ipc::ConnTable` are deliberately not
//! wired end-to-end here; both crates are already complete and tested
//! in isolation; gluing every wire message to a handler closure is
//! substantially more surface than the AMF/checkpoint/sync/timer
//! composition this crate demonstrates; see `DESIGN.md`. Without that
//! wiring, nothing drives the AMF kernel's admin-triggered transitions
//! (`InstantiateRequested`, `TerminateRequested`, ...), so
//! `run_effects` only ever sees the launcher hooks produced by
//! timer-driven events.

mod amf_sync;
mod bootstrap;
mod checkpoint_sync;
mod engine;
mod error;
mod hooks;
mod run;
mod timer_event;

pub use amf_sync::AmfSyncParticipant;
pub use checkpoint_sync::CheckpointSyncParticipant;
pub use engine::NodeEngine;
pub use error::NodeError;
pub use run::run;
pub use timer_event::NodeTimerEvent;
