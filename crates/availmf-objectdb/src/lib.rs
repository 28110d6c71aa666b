//! Hierarchical, typed object database shared by the AMF entity graph
//! and the configuration/runtime tree (spec 4.G).
//!
//! Objects form a single tree rooted at [`ObjectDb::root`]. Each
//! object carries a name, a parent link, an ordered list of children,
//! and a set of typed key/value pairs. Trackers subscribe to a
//! subtree and are notified of create/destroy/key-change/reload
//! events; the registration depth (see [`TrackDepth`]) controls
//! whether a tracker sees only its own object or every descendant.

mod db;
mod key;
mod object;
mod tracker;

pub use db::{FindIter, KeyIter, ObjectDb, ObjectDbError, Result, Validator};
pub use key::{Key, KeyType, KeyValue};
pub use object::{Object, ObjectHandle};
pub use tracker::{ObjectTracker, ReloadPhase, TrackDepth, TrackerHandle};
