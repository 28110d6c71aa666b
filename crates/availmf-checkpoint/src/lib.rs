//! Checkpoint replication engine (spec 4.I).
//!
//! Every write-path operation here is meant to be shipped as one
//! executive message over the group and applied deterministically on
//! every node in ring order — this crate implements the deterministic
//! apply side; the wiring that multicasts before applying lives in the
//! node event loop. Reads go through the same path for ordering but
//! only the origin node answers its client.

mod iter;
mod model;
mod store;
mod sync;

pub use iter::{IterationFilter, SectionIterator};
pub use model::{default_section_id, CkptError, Checkpoint, CreationAttrs, CreationFlags, Expiration, Section, SectionDescriptor, SectionId};
pub use store::{CheckpointStore, TimerEvent};
pub use sync::{SyncDriver, SyncMessage, SyncProgress, SyncReconciliation};
