//! Presence State Machine (spec 4.J PRSM).
//!
//! The three `-ING` states are composite; the outer enum carries the
//! active substep so a joining node reconstructs the exact point in
//! the instantiate/terminate/restart sequence from sync state alone.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstantiatingStep {
    Instantiate,
    InstantiateDelay,
    Cleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminatingStep {
    Terminate,
    Cleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartingStep {
    Terminate,
    Instantiate,
    InstantiateDelay,
    Cleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceState {
    Uninstantiated,
    Instantiating(InstantiatingStep),
    Instantiated,
    Terminating(TerminatingStep),
    Restarting(RestartingStep),
    InstantiationFailed,
    TerminationFailed,
}

/// Events that can legally move a component's presence state. Every
/// variant here is carried to every node as a multicast event so all
/// nodes drive the same transition in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    InstantiateRequested,
    ComponentRegistered,
    InstantiateTimeout,
    RestartRequested,
    CleanupCompleted { exit_code: i32 },
    CleanupTimeout,
    TerminateRequested { error_suspected: bool },
    TerminateCallbackSucceeded,
    TerminateCallbackFailed,
}

/// Side effects the presence machine asks the caller to carry out;
/// distinct from the top-level [`crate::effect::Effect`] enum so this
/// module stays decoupled from the rest of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEffect {
    RunInstantiateHook,
    RunCleanupHook,
    RunTerminateHook,
    StartInstantiateTimer,
    CancelInstantiateTimer,
    StartCleanupTimer,
    StopHealthchecks,
    SetOperEnabled,
    SetOperDisabled,
}

impl PresenceState {
    /// Applies `event`, returning the next state and the effects to
    /// run, or `None` if `event` does not apply to the current state
    /// (the event is silently ignored, matching a stale/duplicate
    /// multicast delivery).
    pub fn on_event(self, event: PresenceEvent) -> Option<(PresenceState, Vec<PresenceEffect>)> {
        use PresenceEffect as E;
        use PresenceEvent as Ev;
        use PresenceState as S;

        match (self, event) {
            (S::Uninstantiated, Ev::InstantiateRequested) => Some((
                S::Instantiating(InstantiatingStep::Instantiate),
                vec![E::RunInstantiateHook, E::StartInstantiateTimer],
            )),
            (S::Instantiating(_), Ev::ComponentRegistered) => {
                Some((S::Instantiated, vec![E::CancelInstantiateTimer, E::SetOperEnabled]))
            }
            (S::Instantiating(_), Ev::InstantiateTimeout) => {
                Some((S::InstantiationFailed, vec![E::SetOperDisabled]))
            }
            (S::Instantiated, Ev::RestartRequested) => Some((
                S::Restarting(RestartingStep::Terminate),
                vec![E::StopHealthchecks, E::RunCleanupHook, E::StartCleanupTimer],
            )),
            (S::Restarting(_), Ev::CleanupCompleted { exit_code: 0 }) => {
                Some((S::Instantiating(InstantiatingStep::Instantiate), vec![E::RunInstantiateHook, E::StartInstantiateTimer]))
            }
            (S::Restarting(_), Ev::CleanupCompleted { exit_code: _ }) => Some((S::TerminationFailed, vec![])),
            (S::Restarting(_), Ev::CleanupTimeout) => Some((S::TerminationFailed, vec![])),
            (S::Instantiated, Ev::TerminateRequested { error_suspected: true }) => {
                Some((S::Terminating(TerminatingStep::Cleanup), vec![E::RunCleanupHook, E::StartCleanupTimer]))
            }
            (S::Instantiated, Ev::TerminateRequested { error_suspected: false }) => {
                Some((S::Terminating(TerminatingStep::Terminate), vec![E::RunTerminateHook]))
            }
            (S::Terminating(TerminatingStep::Terminate), Ev::TerminateCallbackSucceeded) => {
                Some((S::Uninstantiated, vec![E::SetOperDisabled]))
            }
            (S::Terminating(TerminatingStep::Terminate), Ev::TerminateCallbackFailed) => {
                Some((S::Terminating(TerminatingStep::Cleanup), vec![E::RunCleanupHook, E::StartCleanupTimer]))
            }
            (S::Terminating(_), Ev::CleanupCompleted { exit_code: 0 }) => Some((S::Uninstantiated, vec![E::SetOperDisabled])),
            (S::Terminating(_), Ev::CleanupCompleted { exit_code: _ }) => Some((S::TerminationFailed, vec![])),
            _ => None,
        }
    }
}
