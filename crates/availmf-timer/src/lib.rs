//! # availmf-timer: the event loop's deadline queue (spec 4.M)
//!
//! A monotonic-clock priority queue of `(deadline, data, handle)`. The
//! event loop computes `min(next_deadline - now, 0)` as its poll
//! timeout; expired timers fire in deadline order before socket events
//! for the same tick.
//!
//! Handles are opaque, stable identifiers until explicitly cancelled.
//! Cancelling an already-fired handle is a no-op, matching the spec's
//! "`delete` on an already-fired handle is a no-op". There is a single
//! `cancel` operation rather than separate `delete`/`delete_data`
//! C-style calls: Rust ownership means the caller always gets the data
//! back (or it is silently dropped if ignored), which covers both.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// Nanosecond-resolution monotonic timestamp. The event loop is free to
/// source this from `Instant::elapsed` or, in simulation, from a
/// logical tick counter — the wheel itself never reads the wall clock.
pub type MonotonicNanos = u64;

/// Opaque, stable identifier for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapKey {
    deadline: MonotonicNanos,
    handle: TimerHandle,
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earlier deadlines first; ties broken by handle id so that two
        // nodes scheduling the same absolute deadline (e.g. section
        // expiry, which every node computes independently against an
        // identical absolute time) fire in the same relative order.
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.handle.0.cmp(&other.handle.0))
    }
}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A monotonic deadline queue of timers carrying caller-owned data `T`.
pub struct TimerWheel<T> {
    heap: BinaryHeap<Reverse<HeapKey>>,
    data: HashMap<u64, (MonotonicNanos, T)>,
    next_id: u64,
}

impl<T> Default for TimerWheel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerWheel<T> {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new(), data: HashMap::new(), next_id: 0 }
    }

    /// Schedules `data` to fire at the given absolute deadline.
    pub fn add_absolute(&mut self, deadline: MonotonicNanos, data: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let handle = TimerHandle(id);
        self.heap.push(Reverse(HeapKey { deadline, handle }));
        self.data.insert(id, (deadline, data));
        handle
    }

    /// Schedules `data` to fire `duration_ns` after `now`.
    pub fn add_duration(&mut self, now: MonotonicNanos, duration_ns: u64, data: T) -> TimerHandle {
        self.add_absolute(now.saturating_add(duration_ns), data)
    }

    /// Cancels a scheduled timer, returning its data if it had not yet
    /// fired. A no-op (returns `None`) for an unknown or already-fired
    /// handle.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        self.data.remove(&handle.0).map(|(_, data)| data)
        // The stale entry is left in `heap`; `poll_expired` skips it via
        // the lazy-deletion check against `data`.
    }

    /// Returns the next deadline, if any live (non-cancelled) timer is
    /// pending.
    pub fn next_deadline(&self) -> Option<MonotonicNanos> {
        self.heap
            .iter()
            .map(|Reverse(k)| k)
            .filter(|k| self.data.contains_key(&k.handle.0))
            .map(|k| k.deadline)
            .min()
    }

    /// Poll timeout the event loop should wait, in nanoseconds: zero if
    /// a timer is already due or overdue, `None` if no timer is
    /// scheduled.
    pub fn poll_timeout(&self, now: MonotonicNanos) -> Option<u64> {
        self.next_deadline().map(|deadline| deadline.saturating_sub(now))
    }

    /// Pops every timer whose deadline is `<= now`, in deadline order
    /// (ties broken by handle id), removing them from the wheel.
    pub fn poll_expired(&mut self, now: MonotonicNanos) -> Vec<(TimerHandle, T)> {
        let mut fired = Vec::new();
        while let Some(Reverse(top)) = self.heap.peek().copied() {
            if top.deadline > now {
                break;
            }
            self.heap.pop();
            if let Some((_, data)) = self.data.remove(&top.handle.0) {
                fired.push((top.handle, data));
            }
            // else: stale entry from a cancelled timer, already dropped.
        }
        fired
    }

    /// Number of live (not yet fired, not cancelled) timers.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut wheel = TimerWheel::new();
        wheel.add_absolute(30, "c");
        wheel.add_absolute(10, "a");
        wheel.add_absolute(20, "b");

        let fired = wheel.poll_expired(25);
        let labels: Vec<_> = fired.into_iter().map(|(_, d)| d).collect();
        assert_eq!(labels, vec!["a", "b"]);
        assert_eq!(wheel.len(), 1);
    }

    #[test]
    fn cancel_is_noop_after_fire() {
        let mut wheel = TimerWheel::new();
        let h = wheel.add_absolute(10, "x");
        assert_eq!(wheel.poll_expired(10).len(), 1);
        assert_eq!(wheel.cancel(h), None);
    }

    #[test]
    fn cancel_before_fire_removes_entry() {
        let mut wheel = TimerWheel::new();
        let h = wheel.add_absolute(10, "x");
        assert_eq!(wheel.cancel(h), Some("x"));
        assert!(wheel.poll_expired(100).is_empty());
    }

    #[test]
    fn poll_timeout_zero_when_overdue() {
        let mut wheel: TimerWheel<()> = TimerWheel::new();
        wheel.add_absolute(5, ());
        assert_eq!(wheel.poll_timeout(10), Some(0));
        assert_eq!(wheel.poll_timeout(0), Some(5));
    }

    #[test]
    fn same_deadline_ties_broken_by_insertion_order() {
        let mut wheel = TimerWheel::new();
        wheel.add_absolute(10, "first");
        wheel.add_absolute(10, "second");
        let fired = wheel.poll_expired(10);
        let labels: Vec<_> = fired.into_iter().map(|(_, d)| d).collect();
        assert_eq!(labels, vec!["first", "second"]);
    }

    proptest::proptest! {
        #[test]
        fn poll_expired_is_monotonic_nondecreasing(deadlines in proptest::collection::vec(0u64..1000, 1..50)) {
            let mut wheel = TimerWheel::new();
            for d in &deadlines {
                wheel.add_absolute(*d, *d);
            }
            let fired = wheel.poll_expired(u64::MAX);
            let mut last = 0u64;
            for (_, deadline) in fired {
                proptest::prop_assert!(deadline >= last);
                last = deadline;
            }
        }
    }
}
