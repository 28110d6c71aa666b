//! The sequencer itself (spec 4.C): on every `REGULAR` confchg, for
//! every registered service in id order, `sync_init` then repeated
//! `sync_process` until `Done`, moving on to the next service only once
//! the current one finishes. Once every service reports `Done`, the
//! driver commits with `sync_activate` on each; if a configuration
//! change interrupts the round first, `sync_abort` is issued instead.

use availmf_totem::GroupPort;

use crate::participant::{SyncParticipant, SyncProgress};

enum DriverState {
    Idle,
    Running { cursor: usize },
}

/// Owns the registered participants and drives them through one sync
/// round at a time, in `service_id` order.
pub struct SyncDriver {
    participants: Vec<Box<dyn SyncParticipant>>,
    state: DriverState,
}

impl SyncDriver {
    pub fn new() -> Self {
        Self { participants: Vec::new(), state: DriverState::Idle }
    }

    /// Registers a participant, keeping the list sorted by
    /// `service_id`. Registering mid-round is a programming error; the
    /// participant lands at the end and runs in some future round.
    pub fn register(&mut self, participant: Box<dyn SyncParticipant>) {
        if matches!(self.state, DriverState::Running { .. }) {
            tracing::warn!(service = ?participant.service_id(), "registering sync participant while a round is in progress");
        }
        let id = participant.service_id();
        let pos = self.participants.partition_point(|p| p.service_id() < id);
        self.participants.insert(pos, participant);
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, DriverState::Running { .. })
    }

    /// Starts a new round: `sync_init` on the first participant (or
    /// immediately reports `Done` if none are registered).
    pub fn start_round(&mut self) -> SyncProgress {
        if self.participants.is_empty() {
            self.state = DriverState::Idle;
            return SyncProgress::Done;
        }
        self.participants[0].sync_init();
        self.state = DriverState::Running { cursor: 0 };
        SyncProgress::Progress
    }

    /// Advances the round, moving the cursor forward through the
    /// sorted participant list as each one reports `Done`. Returns
    /// `Done` once every participant has finished `sync_process`;
    /// callers must still call [`Self::finish_round`] to commit.
    pub fn drive(&mut self, port: &mut dyn GroupPort) -> SyncProgress {
        loop {
            let cursor = match self.state {
                DriverState::Idle => return SyncProgress::Done,
                DriverState::Running { cursor } => cursor,
            };
            if cursor >= self.participants.len() {
                return SyncProgress::Done;
            }
            match self.participants[cursor].sync_process(port) {
                SyncProgress::Progress => return SyncProgress::Progress,
                SyncProgress::Done => {
                    let next = cursor + 1;
                    if next < self.participants.len() {
                        self.participants[next].sync_init();
                    }
                    self.state = DriverState::Running { cursor: next };
                }
            }
        }
    }

    /// Commits the round: `sync_activate` on every participant, in
    /// registration order. Only correct to call once [`Self::drive`]
    /// has reported `Done`.
    pub fn finish_round(&mut self) {
        for p in &mut self.participants {
            p.sync_activate();
        }
        self.state = DriverState::Idle;
    }

    /// Throws the round away: `sync_abort` on every participant.
    /// Callable at any point while a round is running.
    pub fn abort_round(&mut self) {
        for p in &mut self.participants {
            p.sync_abort();
        }
        self.state = DriverState::Idle;
    }
}

impl Default for SyncDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use availmf_totem::{McastGuarantee, MulticastError};
    use availmf_types::ServiceId;

    struct FakePort;
    impl GroupPort for FakePort {
        fn mcast(&mut self, _payload: &[u8], _guarantee: McastGuarantee) -> Result<(), MulticastError> {
            Ok(())
        }
        fn send_ok(&self, _payload_len: usize) -> bool {
            true
        }
    }

    struct Recorder {
        id: ServiceId,
        steps_remaining: u32,
        log: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl SyncParticipant for Recorder {
        fn service_id(&self) -> ServiceId {
            self.id
        }
        fn sync_init(&mut self) {
            self.log.borrow_mut().push(format!("{:?}:init", self.id));
        }
        fn sync_process(&mut self, _port: &mut dyn GroupPort) -> SyncProgress {
            if self.steps_remaining == 0 {
                self.log.borrow_mut().push(format!("{:?}:done", self.id));
                SyncProgress::Done
            } else {
                self.steps_remaining -= 1;
                self.log.borrow_mut().push(format!("{:?}:progress", self.id));
                SyncProgress::Progress
            }
        }
        fn sync_activate(&mut self) {
            self.log.borrow_mut().push(format!("{:?}:activate", self.id));
        }
        fn sync_abort(&mut self) {
            self.log.borrow_mut().push(format!("{:?}:abort", self.id));
        }
    }

    #[test]
    fn drives_participants_in_service_id_order_one_at_a_time() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut driver = SyncDriver::new();
        driver.register(Box::new(Recorder { id: ServiceId::Ckpt, steps_remaining: 0, log: log.clone() }));
        driver.register(Box::new(Recorder { id: ServiceId::Amf, steps_remaining: 1, log: log.clone() }));

        let mut port = FakePort;
        assert_eq!(driver.start_round(), SyncProgress::Progress);
        while driver.drive(&mut port) == SyncProgress::Progress {}
        driver.finish_round();

        let events = log.borrow().clone();
        assert_eq!(
            events,
            vec!["Amf:init", "Amf:progress", "Amf:done", "Ckpt:init", "Ckpt:done", "Amf:activate", "Ckpt:activate"]
        );
    }

    #[test]
    fn empty_registry_completes_the_round_immediately() {
        let mut driver = SyncDriver::new();
        assert_eq!(driver.start_round(), SyncProgress::Done);
        assert!(!driver.is_running());
    }

    #[test]
    fn abort_mid_round_skips_remaining_participants() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut driver = SyncDriver::new();
        driver.register(Box::new(Recorder { id: ServiceId::Amf, steps_remaining: 5, log: log.clone() }));
        driver.register(Box::new(Recorder { id: ServiceId::Ckpt, steps_remaining: 0, log: log.clone() }));

        let mut port = FakePort;
        driver.start_round();
        driver.drive(&mut port);
        driver.abort_round();

        assert!(!driver.is_running());
        let events = log.borrow().clone();
        assert!(events.contains(&"Amf:abort".to_string()));
        assert!(events.contains(&"Ckpt:abort".to_string()));
    }
}
