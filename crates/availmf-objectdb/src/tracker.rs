//! Change trackers fired on create/destroy/key-change/reload.

use crate::object::ObjectHandle;

/// How far from the registered object a tracker fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackDepth {
    /// Fires only for the exact object it was registered on.
    One,
    /// Fires for every descendant of the registered object too.
    Recursive,
}

/// Phase of a configuration reload notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPhase {
    Start,
    End,
    Failed,
}

/// Receives change notifications for a subtree. Default methods are
/// no-ops so callers only implement the events they care about —
/// the spec's `key_change_fn`/`create_fn`/`destroy_fn`/`reload_fn`
/// quartet collapsed into one trait's methods.
pub trait ObjectTracker {
    fn on_create(&mut self, _target: ObjectHandle) {}
    fn on_destroy(&mut self, _target: ObjectHandle) {}
    fn on_key_change(&mut self, _target: ObjectHandle, _key_name: &str) {}
    fn on_reload(&mut self, _phase: ReloadPhase) {}
}

/// Opaque handle to a registered tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackerHandle(pub(crate) u64);

pub(crate) struct TrackerEntry {
    pub handle: TrackerHandle,
    pub object: ObjectHandle,
    pub depth: TrackDepth,
    pub tracker: Box<dyn ObjectTracker>,
}
