//! The Yeung–Keidar–Dolev dynamic-voting primary-component decider
//! (spec 4.B).
//!
//! Runs on every configuration change to decide whether the local
//! partition is the unique primary component allowed to mutate
//! replicated state. The two-phase `SEND_STATE` → `ATTEMPT` commit
//! ensures no two disjoint partitions both become primary: a partition
//! only claims primary after proving, via subquorum intersection with
//! every ambiguous session any current member might have formed, that
//! no other partition could simultaneously satisfy the same test.

use std::collections::{BTreeMap, BTreeSet};

use availmf_types::NodeId;
use serde::{Deserialize, Serialize};

/// A candidate or confirmed primary-component membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub member_list: BTreeSet<NodeId>,
    pub id: u32,
}

impl Session {
    pub fn new(member_list: BTreeSet<NodeId>, id: u32) -> Self {
        Self { member_list, id }
    }

    pub fn empty() -> Self {
        Self { member_list: BTreeSet::new(), id: 0 }
    }

    /// Subquorum test: does `view`'s intersection with this session's
    /// member list cover at least half of the session's size (ties
    /// count)?
    pub fn is_subquorum_of(&self, view: &BTreeSet<NodeId>) -> bool {
        if self.member_list.is_empty() {
            // The bootstrap session (id 0, empty membership) is
            // trivially satisfied by any view: there is nothing to be
            // a minority of yet.
            return true;
        }
        let intersection = self.member_list.intersection(view).count();
        intersection * 2 >= self.member_list.len()
    }
}

/// Per-node YKD state, exchanged via `mcast` under group `"ykd"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YkdState {
    pub last_primary: Session,
    pub last_formed: Vec<Session>,
    pub ambiguous_sessions: Vec<Session>,
    pub session_id: u32,
}

impl YkdState {
    pub fn bootstrap() -> Self {
        Self {
            last_primary: Session::empty(),
            last_formed: Vec::new(),
            ambiguous_sessions: Vec::new(),
            session_id: 0,
        }
    }
}

/// The decider's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YkdPhase {
    /// Broadcasting our full state, waiting for every current member's
    /// state before the primary decision can be made.
    SendState,
    /// Primary decided locally; waiting for every current member's
    /// empty `ATTEMPT` probe before committing.
    Attempt,
    /// Decision (primary or not) committed for this epoch; quiescent
    /// until the next `TRANSITIONAL` confchg.
    Settled,
}

/// Message exchanged under the `"ykd"` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum YkdMessage {
    SendState(YkdState),
    Attempt,
}

/// Output of a YKD state transition: at most one outgoing message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct YkdOutput {
    pub multicast: Option<YkdMessage>,
}

impl YkdOutput {
    fn none() -> Self {
        Self::default()
    }

    fn send(msg: YkdMessage) -> Self {
        Self { multicast: Some(msg) }
    }
}

/// The YKD primary-component decider for one local node.
pub struct YkdDecider {
    local: NodeId,
    phase: YkdPhase,
    state: YkdState,
    current_view: BTreeSet<NodeId>,
    /// Peer states received this `SEND_STATE` round, keyed by sender.
    received: BTreeMap<NodeId, YkdState>,
    /// Peers whose `ATTEMPT` probe has been received this round.
    attempt_received: BTreeSet<NodeId>,
    is_primary: bool,
}

impl YkdDecider {
    pub fn new(local: NodeId) -> Self {
        Self {
            local,
            phase: YkdPhase::Settled,
            state: YkdState::bootstrap(),
            current_view: BTreeSet::new(),
            received: BTreeMap::new(),
            attempt_received: BTreeSet::new(),
            is_primary: false,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn phase(&self) -> YkdPhase {
        self.phase
    }

    /// Handles a `TRANSITIONAL` confchg: resets per-epoch tracking,
    /// marks the node non-primary, and publishes full state.
    pub fn on_transitional_confchg(&mut self, members: &[NodeId]) -> YkdOutput {
        self.current_view = members.iter().copied().collect();
        self.received.clear();
        self.attempt_received.clear();
        self.phase = YkdPhase::SendState;
        self.is_primary = false;
        // We count as having received our own state immediately.
        self.received.insert(self.local, self.state.clone());
        YkdOutput::send(YkdMessage::SendState(self.state.clone()))
    }

    /// Handles delivery of a peer's `"ykd"` group message.
    pub fn on_deliver(&mut self, from: NodeId, msg: YkdMessage) -> YkdOutput {
        match (self.phase, msg) {
            (YkdPhase::SendState, YkdMessage::SendState(peer_state)) => {
                if !self.current_view.contains(&from) {
                    return YkdOutput::none();
                }
                self.received.insert(from, peer_state);
                self.maybe_decide()
            }
            (YkdPhase::Attempt, YkdMessage::Attempt) => {
                if !self.current_view.contains(&from) {
                    return YkdOutput::none();
                }
                self.attempt_received.insert(from);
                self.maybe_commit()
            }
            _ => YkdOutput::none(),
        }
    }

    fn maybe_decide(&mut self) -> YkdOutput {
        if !self.current_view.iter().all(|n| self.received.contains_key(n)) {
            return YkdOutput::none();
        }

        let session_id_max = self.received.values().map(|s| s.session_id).max().unwrap_or(0);

        let last_primary_max = self
            .received
            .values()
            .map(|s| &s.last_primary)
            .max_by_key(|s| s.id)
            .cloned()
            .unwrap_or_else(Session::empty);

        let mut ambiguous_union: Vec<Session> = Vec::new();
        for peer in self.received.values() {
            for s in &peer.ambiguous_sessions {
                if s.id > last_primary_max.id && !ambiguous_union.iter().any(|x| x.id == s.id) {
                    ambiguous_union.push(s.clone());
                }
            }
        }

        let decide_primary = last_primary_max.is_subquorum_of(&self.current_view)
            && ambiguous_union.iter().all(|s| s.is_subquorum_of(&self.current_view));

        if decide_primary {
            self.state.session_id = session_id_max + 1;
            self.state
                .ambiguous_sessions
                .push(Session::new(self.current_view.clone(), self.state.session_id));
            self.phase = YkdPhase::Attempt;
            self.attempt_received.insert(self.local);
            YkdOutput::send(YkdMessage::Attempt)
        } else {
            self.phase = YkdPhase::Settled;
            self.is_primary = false;
            YkdOutput::none()
        }
    }

    fn maybe_commit(&mut self) -> YkdOutput {
        if !self.current_view.iter().all(|n| self.attempt_received.contains(n)) {
            return YkdOutput::none();
        }
        self.state.last_primary = Session::new(self.current_view.clone(), self.state.session_id);
        self.state.last_formed.push(self.state.last_primary.clone());
        self.state.ambiguous_sessions.clear();
        self.phase = YkdPhase::Settled;
        self.is_primary = true;
        YkdOutput::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(ids: &[u32]) -> BTreeSet<NodeId> {
        ids.iter().map(|i| NodeId::new(*i)).collect()
    }

    #[test]
    fn subquorum_bootstrap_session_always_satisfied() {
        let empty = Session::empty();
        assert!(empty.is_subquorum_of(&view(&[1, 2, 3])));
    }

    #[test]
    fn subquorum_requires_half_with_ties_counting() {
        let s = Session::new(view(&[1, 2, 3, 4]), 1);
        assert!(s.is_subquorum_of(&view(&[1, 2]))); // exactly half: counts
        assert!(!s.is_subquorum_of(&view(&[1]))); // below half
        assert!(s.is_subquorum_of(&view(&[1, 2, 3])));
    }

    /// Three nodes forming a fresh primary component from bootstrap:
    /// every node ends up primary since subquorum of the empty bootstrap
    /// session is trivially satisfied.
    #[test]
    fn three_node_bootstrap_forms_primary() {
        let mut deciders = make_deciders(&[1, 2, 3]);
        run_round(&mut deciders, &[1, 2, 3]);
        for d in &deciders {
            assert!(d.is_primary(), "node {:?} should be primary", d.local);
        }
    }

    /// A 5-node cluster splits into a 3-partition and a 2-partition.
    /// The 3-partition must become primary; the 2-partition must not.
    #[test]
    fn split_partition_only_majority_becomes_primary() {
        let mut deciders = make_deciders(&[1, 2, 3, 4, 5]);

        // Form the original 5-node primary component first.
        run_round(&mut deciders, &[1, 2, 3, 4, 5]);
        for d in &deciders {
            assert!(d.is_primary());
        }

        // Split: {1,2,3} and {4,5}. Each side runs its own round using
        // only its own deciders, modeling a real partition where the
        // two sides can no longer exchange messages at all.
        run_round_for(&mut deciders, &[1, 2, 3]);
        run_round_for(&mut deciders, &[4, 5]);

        for d in &deciders {
            let expect_primary = [1, 2, 3].contains(&d.local.as_u32());
            assert_eq!(
                d.is_primary(),
                expect_primary,
                "node {:?} primary status mismatch",
                d.local
            );
        }
    }

    fn make_deciders(ids: &[u32]) -> Vec<YkdDecider> {
        ids.iter().map(|i| YkdDecider::new(NodeId::new(*i))).collect()
    }

    fn run_round(deciders: &mut [YkdDecider], members: &[u32]) {
        run_round_for(deciders, members);
    }

    /// Runs one full `TRANSITIONAL` confchg + message-exchange round for
    /// exactly the deciders whose id is in `members`, leaving every other
    /// decider in `deciders` untouched.
    fn run_round_for(deciders: &mut [YkdDecider], members: &[u32]) {
        let member_nodes: Vec<NodeId> = members.iter().map(|i| NodeId::new(*i)).collect();
        let indices: Vec<usize> = deciders
            .iter()
            .enumerate()
            .filter(|(_, d)| members.contains(&d.local.as_u32()))
            .map(|(i, _)| i)
            .collect();

        let mut outbox: Vec<(NodeId, YkdMessage)> = Vec::new();
        for &i in &indices {
            if let Some(msg) = deciders[i].on_transitional_confchg(&member_nodes).multicast {
                outbox.push((deciders[i].local, msg));
            }
        }

        // Fixed-point delivery loop: keep delivering queued messages
        // until no decider produces further output.
        while let Some((from, msg)) = outbox.pop() {
            for &i in &indices {
                let out = deciders[i].on_deliver(from, msg.clone());
                if let Some(next) = out.multicast {
                    outbox.insert(0, (deciders[i].local, next));
                }
            }
        }
    }
}
