//! The [`SyncParticipant`] seam (spec 4.C): one implementation per
//! registered service (checkpoint, AMF, object database, ...), driven
//! by [`crate::driver::SyncDriver`] in service-id order.

use availmf_totem::GroupPort;
use availmf_types::ServiceId;

/// Result of a single `sync_process` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncProgress {
    /// Back-pressured or still mid-transfer; call again next tick.
    Progress,
    /// This service has finished synchronizing for the current round.
    Done,
}

/// A service that takes part in the cross-service sync round run on
/// every `REGULAR` confchg.
///
/// Mirrors the resumable-cursor shape of `kimberlite-vsr`'s replica
/// state transfer: `sync_init` arms the transfer, `sync_process` is
/// polled until `Done`, and the round either commits with
/// `sync_activate` or is thrown away with `sync_abort`.
pub trait SyncParticipant {
    /// Identifies this participant for ordering and logging.
    fn service_id(&self) -> ServiceId;

    /// Arms the service for a new sync round, resetting any cursor left
    /// over from a prior aborted round.
    fn sync_init(&mut self);

    /// Advances the sync round by one step, sending or consuming at
    /// most the messages `port` currently admits.
    fn sync_process(&mut self, port: &mut dyn GroupPort) -> SyncProgress;

    /// Commits the round: the reconciled state this service built
    /// during `sync_process` becomes live.
    fn sync_activate(&mut self);

    /// Discards the round: whatever this service accumulated during
    /// `sync_process` is thrown away: a new confchg interrupted it.
    fn sync_abort(&mut self);
}
