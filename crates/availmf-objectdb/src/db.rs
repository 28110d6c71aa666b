//! The object database itself (spec 4.G).

use std::collections::HashMap;

use thiserror::Error;

use crate::key::{Key, KeyType, KeyValue};
use crate::object::{Object, ObjectHandle};
use crate::tracker::{ObjectTracker, ReloadPhase, TrackDepth, TrackerEntry, TrackerHandle};

/// Restricts the names admissible as children or keys of a parent
/// object.
pub trait Validator {
    fn child_allowed(&self, child_name: &str) -> bool {
        let _ = child_name;
        true
    }

    fn key_allowed(&self, key_name: &str, value: &KeyValue) -> bool {
        let _ = (key_name, value);
        true
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectDbError {
    #[error("object handle not found")]
    NotFound,
    #[error("child name already exists: {0}")]
    DuplicateChild(String),
    #[error("key already exists: {0}")]
    KeyExists(String),
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("value does not match declared key type")]
    TypeMismatch,
    #[error("rejected by validator: {0}")]
    ValidatorRejected(String),
    #[error("cannot destroy the root object")]
    CannotDestroyRoot,
}

pub type Result<T> = std::result::Result<T, ObjectDbError>;

/// The in-memory, process-wide object tree.
pub struct ObjectDb {
    arena: HashMap<u64, Object>,
    next_id: u64,
    root: ObjectHandle,
    validators: HashMap<ObjectHandle, Box<dyn Validator>>,
    trackers: Vec<TrackerEntry>,
    next_tracker_id: u64,
}

impl ObjectDb {
    pub fn new() -> Self {
        let root_handle = ObjectHandle(0);
        let mut arena = HashMap::new();
        arena.insert(0, Object::new(String::new(), None));
        Self {
            arena,
            next_id: 1,
            root: root_handle,
            validators: HashMap::new(),
            trackers: Vec::new(),
            next_tracker_id: 0,
        }
    }

    pub fn root(&self) -> ObjectHandle {
        self.root
    }

    pub fn get(&self, handle: ObjectHandle) -> Result<&Object> {
        self.arena.get(&handle.0).ok_or(ObjectDbError::NotFound)
    }

    fn get_mut(&mut self, handle: ObjectHandle) -> Result<&mut Object> {
        self.arena.get_mut(&handle.0).ok_or(ObjectDbError::NotFound)
    }

    pub fn set_validator(&mut self, parent: ObjectHandle, validator: Box<dyn Validator>) {
        self.validators.insert(parent, validator);
    }

    // ========================================================================
    // Object lifecycle
    // ========================================================================

    pub fn object_create(&mut self, parent: ObjectHandle, name: impl Into<String>) -> Result<ObjectHandle> {
        let name = name.into();
        {
            let parent_obj = self.get(parent)?;
            if parent_obj.children.iter().any(|&c| self.arena[&c.0].name == name) {
                return Err(ObjectDbError::DuplicateChild(name));
            }
        }
        if let Some(v) = self.validators.get(&parent) {
            if !v.child_allowed(&name) {
                return Err(ObjectDbError::ValidatorRejected(name));
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        let handle = ObjectHandle(id);
        self.arena.insert(id, Object::new(name, Some(parent)));
        self.get_mut(parent)?.children.push(handle);

        self.notify_up(handle, |t, target| t.on_create(target));
        Ok(handle)
    }

    /// Recursively destroys `handle` and every descendant.
    pub fn object_destroy(&mut self, handle: ObjectHandle) -> Result<()> {
        if handle == self.root {
            return Err(ObjectDbError::CannotDestroyRoot);
        }
        let obj = self.get(handle)?.clone();
        for child in obj.children.clone() {
            self.object_destroy(child)?;
        }
        self.notify_up(handle, |t, target| t.on_destroy(target));

        if let Some(parent) = obj.parent {
            if let Ok(parent_obj) = self.get_mut(parent) {
                parent_obj.children.retain(|&c| c != handle);
            }
        }
        self.arena.remove(&handle.0);
        self.validators.remove(&handle);
        self.trackers.retain(|t| t.object != handle);
        Ok(())
    }

    pub fn object_parent_get(&self, handle: ObjectHandle) -> Result<Option<ObjectHandle>> {
        Ok(self.get(handle)?.parent)
    }

    // ========================================================================
    // Keys
    // ========================================================================

    pub fn object_key_create_typed(
        &mut self,
        handle: ObjectHandle,
        name: impl Into<String>,
        value: KeyValue,
        key_type: KeyType,
    ) -> Result<()> {
        let name = name.into();
        if let Some(parent) = self.get(handle)?.parent {
            if let Some(v) = self.validators.get(&parent) {
                if !v.key_allowed(&name, &value) {
                    return Err(ObjectDbError::ValidatorRejected(name));
                }
            }
        }
        let key = Key::new(name.clone(), key_type, value).ok_or(ObjectDbError::TypeMismatch)?;
        let obj = self.get_mut(handle)?;
        if obj.key(&name).is_some() {
            return Err(ObjectDbError::KeyExists(name));
        }
        obj.keys.push(key);
        Ok(())
    }

    pub fn object_key_get_typed(&self, handle: ObjectHandle, name: &str) -> Result<&KeyValue> {
        self.get(handle)?.key(name).map(|k| &k.value).ok_or_else(|| ObjectDbError::KeyNotFound(name.to_string()))
    }

    /// Replaces a key's value. Fires a key-change notification only if
    /// the value actually changed.
    pub fn object_key_replace(&mut self, handle: ObjectHandle, name: &str, value: KeyValue) -> Result<bool> {
        let key_type = {
            let obj = self.get(handle)?;
            let key = obj.key(name).ok_or_else(|| ObjectDbError::KeyNotFound(name.to_string()))?;
            key.key_type
        };
        if !matches_type(key_type, &value) {
            return Err(ObjectDbError::TypeMismatch);
        }
        let changed = {
            let obj = self.get_mut(handle)?;
            let key = obj.key_mut(name).expect("checked above");
            if key.value == value {
                false
            } else {
                key.value = value;
                true
            }
        };
        if changed {
            let name = name.to_string();
            self.notify_up(handle, move |t, target| t.on_key_change(target, &name));
        }
        Ok(changed)
    }

    pub fn object_key_delete(&mut self, handle: ObjectHandle, name: &str) -> Result<()> {
        let obj = self.get_mut(handle)?;
        let before = obj.keys.len();
        obj.keys.retain(|k| k.name != name);
        if obj.keys.len() == before {
            return Err(ObjectDbError::KeyNotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn object_key_iter_typed(&self, handle: ObjectHandle) -> Result<KeyIter<'_>> {
        Ok(KeyIter { keys: &self.get(handle)?.keys, pos: 0 })
    }

    // ========================================================================
    // Find iteration
    // ========================================================================

    /// Creates a stable, owned iterator over `parent`'s children whose
    /// name starts with `prefix`, in insertion order. Each call to
    /// `object_find_create` snapshots the current children so
    /// concurrent iterators never interfere with each other — unlike
    /// the original C API's single shared cursor per object.
    pub fn object_find_create(&self, parent: ObjectHandle, prefix: impl Into<String>) -> Result<FindIter> {
        let prefix = prefix.into();
        let obj = self.get(parent)?;
        let matches: Vec<ObjectHandle> = obj
            .children
            .iter()
            .copied()
            .filter(|&c| self.arena[&c.0].name.starts_with(&prefix))
            .collect();
        Ok(FindIter { matches, pos: 0 })
    }

    pub fn object_find_next(&self, iter: &mut FindIter) -> Option<ObjectHandle> {
        let next = iter.matches.get(iter.pos).copied();
        if next.is_some() {
            iter.pos += 1;
        }
        next
    }

    // ========================================================================
    // Trackers
    // ========================================================================

    pub fn object_track_start(
        &mut self,
        object: ObjectHandle,
        depth: TrackDepth,
        tracker: Box<dyn ObjectTracker>,
    ) -> TrackerHandle {
        let id = self.next_tracker_id;
        self.next_tracker_id += 1;
        let handle = TrackerHandle(id);
        self.trackers.push(TrackerEntry { handle, object, depth, tracker });
        handle
    }

    pub fn object_track_stop(&mut self, handle: TrackerHandle) {
        self.trackers.retain(|t| t.handle != handle);
    }

    /// Fires every registered tracker's reload hook, regardless of
    /// object or depth.
    pub fn notify_reload(&mut self, phase: ReloadPhase) {
        for entry in &mut self.trackers {
            entry.tracker.on_reload(phase);
        }
    }

    /// Walks from `target` up to the root, firing `f` for every
    /// tracker whose registration matches: exact object match for
    /// `TrackDepth::One`, any ancestor match for
    /// `TrackDepth::Recursive`.
    fn notify_up(&mut self, target: ObjectHandle, mut f: impl FnMut(&mut dyn ObjectTracker, ObjectHandle)) {
        let mut chain = vec![target];
        let mut cur = target;
        while let Some(parent) = self.arena.get(&cur.0).and_then(|o| o.parent) {
            chain.push(parent);
            cur = parent;
        }
        for node in chain {
            for entry in &mut self.trackers {
                if entry.object != node {
                    continue;
                }
                let applies = node == target || entry.depth == TrackDepth::Recursive;
                if applies {
                    f(entry.tracker.as_mut(), target);
                }
            }
        }
    }
}

impl Default for ObjectDb {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_type(key_type: KeyType, value: &KeyValue) -> bool {
    Key::new("_probe", key_type, value.clone()).is_some()
}

/// Snapshot iterator over an object's keys.
pub struct KeyIter<'a> {
    keys: &'a [Key],
    pos: usize,
}

impl<'a> Iterator for KeyIter<'a> {
    type Item = &'a Key;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.keys.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }
}

/// Owned, stable iterator over a name-prefix match of a parent's
/// children.
pub struct FindIter {
    matches: Vec<ObjectHandle>,
    pos: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingTracker {
        created: Vec<ObjectHandle>,
        destroyed: Vec<ObjectHandle>,
        key_changes: Vec<(ObjectHandle, String)>,
    }

    impl RecordingTracker {
        fn new() -> Self {
            Self { created: Vec::new(), destroyed: Vec::new(), key_changes: Vec::new() }
        }
    }

    impl ObjectTracker for RecordingTracker {
        fn on_create(&mut self, target: ObjectHandle) {
            self.created.push(target);
        }
        fn on_destroy(&mut self, target: ObjectHandle) {
            self.destroyed.push(target);
        }
        fn on_key_change(&mut self, target: ObjectHandle, key_name: &str) {
            self.key_changes.push((target, key_name.to_string()));
        }
    }

    #[test]
    fn create_destroy_and_duplicate_rejection() {
        let mut db = ObjectDb::new();
        let root = db.root();
        let su1 = db.object_create(root, "su1").unwrap();
        assert_eq!(db.object_parent_get(su1).unwrap(), Some(root));
        assert_eq!(db.object_create(root, "su1"), Err(ObjectDbError::DuplicateChild("su1".into())));
        db.object_destroy(su1).unwrap();
        assert!(db.object_create(root, "su1").is_ok());
    }

    #[test]
    fn typed_key_lifecycle() {
        let mut db = ObjectDb::new();
        let root = db.root();
        let comp = db.object_create(root, "comp1").unwrap();
        db.object_key_create_typed(comp, "restart_count", KeyValue::U32(0), KeyType::U32).unwrap();
        assert_eq!(db.object_key_get_typed(comp, "restart_count").unwrap(), &KeyValue::U32(0));

        assert!(db.object_key_replace(comp, "restart_count", KeyValue::U32(0)).unwrap() == false);
        assert!(db.object_key_replace(comp, "restart_count", KeyValue::U32(1)).unwrap());

        assert_eq!(
            db.object_key_create_typed(comp, "restart_count", KeyValue::U32(2), KeyType::U32),
            Err(ObjectDbError::KeyExists("restart_count".into()))
        );

        db.object_key_delete(comp, "restart_count").unwrap();
        assert_eq!(db.object_key_get_typed(comp, "restart_count"), Err(ObjectDbError::KeyNotFound("restart_count".into())));
    }

    #[test]
    fn recursive_tracker_sees_descendant_create_and_destroy() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct SharedTracker(Rc<RefCell<RecordingTracker>>);
        impl ObjectTracker for SharedTracker {
            fn on_create(&mut self, target: ObjectHandle) {
                self.0.borrow_mut().on_create(target);
            }
            fn on_destroy(&mut self, target: ObjectHandle) {
                self.0.borrow_mut().on_destroy(target);
            }
        }

        let mut db = ObjectDb::new();
        let root = db.root();
        let su1 = db.object_create(root, "su1").unwrap();

        let recursive_log = Rc::new(RefCell::new(RecordingTracker::new()));
        db.object_track_start(root, TrackDepth::Recursive, Box::new(SharedTracker(recursive_log.clone())));

        let one_log = Rc::new(RefCell::new(RecordingTracker::new()));
        db.object_track_start(su1, TrackDepth::One, Box::new(SharedTracker(one_log.clone())));

        let comp1 = db.object_create(su1, "comp1").unwrap();
        assert!(recursive_log.borrow().created.contains(&comp1));
        assert!(one_log.borrow().created.is_empty(), "a ONE tracker must not fire for descendants");

        db.object_destroy(comp1).unwrap();
        assert!(recursive_log.borrow().destroyed.contains(&comp1));
    }

    #[test]
    fn find_iteration_is_stable_and_prefix_filtered() {
        let mut db = ObjectDb::new();
        let root = db.root();
        db.object_create(root, "comp1").unwrap();
        db.object_create(root, "comp2").unwrap();
        db.object_create(root, "other").unwrap();

        let mut iter = db.object_find_create(root, "comp").unwrap();
        let mut names = Vec::new();
        while let Some(h) = db.object_find_next(&mut iter) {
            names.push(db.get(h).unwrap().name.clone());
        }
        assert_eq!(names, vec!["comp1", "comp2"]);
    }
}
