//! The checkpoint store: every library-visible operation from spec 4.I
//! except the sync protocol (see [`crate::sync`]).

use std::collections::HashMap;

use availmf_timer::TimerWheel;
use availmf_types::{Name, NodeId};

use crate::model::{CkptError, Checkpoint, CreationAttrs, Expiration, Section, SectionDescriptor, SectionId};

/// Timer payloads scheduled by the store; the event loop polls
/// [`CheckpointStore::poll_expired`] and applies them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Retention(Name),
    SectionExpiry(Name, SectionId),
}

pub struct CheckpointStore {
    checkpoints: HashMap<Name, Checkpoint>,
    timers: TimerWheel<TimerEvent>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self { checkpoints: HashMap::new(), timers: TimerWheel::new() }
    }

    pub fn get(&self, name: &Name) -> Option<&Checkpoint> {
        self.checkpoints.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.values()
    }

    pub fn checkpoint_names(&self) -> Vec<Name> {
        self.checkpoints.keys().cloned().collect()
    }

    pub fn section_ids(&self, name: &Name) -> Vec<SectionId> {
        self.checkpoints.get(name).map(|c| c.sections.keys().cloned().collect()).unwrap_or_default()
    }

    pub fn section_expiration(&self, name: &Name, id: &SectionId) -> Option<Expiration> {
        self.checkpoints.get(name)?.sections.get(id).map(|s| s.expiration)
    }

    pub fn ref_count(&self, name: &Name) -> Option<u32> {
        self.checkpoints.get(name).map(|c| c.ref_count)
    }

    /// Swaps the entire live checkpoint list for a reconciled one,
    /// clearing every existing timer first (the reconciled entries'
    /// timers are re-armed by the caller).
    pub(crate) fn replace_all(&mut self, checkpoints: HashMap<Name, Checkpoint>) {
        self.checkpoints = checkpoints;
        self.timers = TimerWheel::new();
    }

    pub(crate) fn arm_section_expiry(&mut self, name: &Name, id: &SectionId, deadline: u64) {
        let handle = self.timers.add_absolute(deadline, TimerEvent::SectionExpiry(name.clone(), id.clone()));
        if let Some(ckpt) = self.checkpoints.get_mut(name) {
            if let Some(section) = ckpt.sections.get_mut(id) {
                section.timer = Some(handle);
            }
        }
    }

    pub(crate) fn arm_retention_pub(&mut self, name: &Name, now: u64) {
        self.arm_retention(name, now);
    }

    // ========================================================================
    // Open / Close / Unlink / RetentionDurationSet
    // ========================================================================

    pub fn open(&mut self, name: Name, attrs: Option<CreationAttrs>, create: bool, sender: NodeId, now: u64) -> Result<(), CkptError> {
        match self.checkpoints.get_mut(&name) {
            Some(existing) => {
                if let Some(requested) = attrs {
                    if requested != existing.attrs {
                        return Err(CkptError::Exist);
                    }
                }
                if let Some(handle) = existing.retention_timer.take() {
                    self.timers.cancel(handle);
                }
                existing.ref_count += 1;
                *existing.ref_per_node.entry(sender).or_insert(0) += 1;
                Ok(())
            }
            None => {
                if !create {
                    return Err(CkptError::NotExist);
                }
                let attrs = attrs.ok_or(CkptError::NoMemory)?;
                let mut ckpt = Checkpoint::new(name.clone(), attrs, now);
                ckpt.ref_count = 1;
                ckpt.ref_per_node.insert(sender, 1);
                self.checkpoints.insert(name, ckpt);
                Ok(())
            }
        }
    }

    pub fn close(&mut self, name: &Name, sender: NodeId, now: u64) -> Result<(), CkptError> {
        let ckpt = self.checkpoints.get_mut(name).ok_or(CkptError::NotExist)?;
        ckpt.ref_count = ckpt.ref_count.saturating_sub(1);
        if let Some(count) = ckpt.ref_per_node.get_mut(&sender) {
            *count = count.saturating_sub(1);
        }
        if ckpt.unlinked && ckpt.ref_count == 1 {
            self.release(name);
        } else if ckpt.ref_count == 1 {
            self.arm_retention(name, now);
        }
        Ok(())
    }

    pub fn unlink(&mut self, name: &Name) -> Result<(), CkptError> {
        let ckpt = self.checkpoints.get_mut(name).ok_or(CkptError::NotExist)?;
        if ckpt.unlinked {
            return Err(CkptError::InvalidParam);
        }
        ckpt.unlinked = true;
        if ckpt.ref_count == 1 {
            self.release(name);
        }
        Ok(())
    }

    pub fn set_retention_duration(&mut self, name: &Name, duration_ns: u64, now: u64) -> Result<(), CkptError> {
        let ckpt = self.checkpoints.get_mut(name).ok_or(CkptError::NotExist)?;
        if ckpt.unlinked {
            return Err(CkptError::BadOperation);
        }
        ckpt.attrs.retention_duration_ns = duration_ns;
        if ckpt.ref_count == 1 {
            if let Some(handle) = ckpt.retention_timer.take() {
                self.timers.cancel(handle);
            }
            self.arm_retention(name, now);
        }
        Ok(())
    }

    fn arm_retention(&mut self, name: &Name, now: u64) {
        let Some(ckpt) = self.checkpoints.get(name) else { return };
        let duration = ckpt.attrs.retention_duration_ns;
        let handle = self.timers.add_duration(now, duration, TimerEvent::Retention(name.clone()));
        self.checkpoints.get_mut(name).unwrap().retention_timer = Some(handle);
    }

    fn release(&mut self, name: &Name) {
        if let Some(ckpt) = self.checkpoints.remove(name) {
            if let Some(handle) = ckpt.retention_timer {
                self.timers.cancel(handle);
            }
            for section in ckpt.sections.into_values() {
                if let Some(handle) = section.timer {
                    self.timers.cancel(handle);
                }
            }
            tracing::debug!(checkpoint = %name, "released");
        }
    }

    // ========================================================================
    // Section operations
    // ========================================================================

    pub fn section_create(&mut self, name: &Name, id: SectionId, expiration: Expiration, initial_bytes: Vec<u8>, now: u64) -> Result<(), CkptError> {
        let ckpt = self.checkpoints.get_mut(name).ok_or(CkptError::NotExist)?;
        if ckpt.attrs.max_sections == 1 {
            return Err(CkptError::InvalidParam);
        }
        if ckpt.sections.len() as u32 >= ckpt.attrs.max_sections {
            return Err(CkptError::NoSpace);
        }
        if initial_bytes.len() as u32 > ckpt.attrs.max_section_size {
            return Err(CkptError::InvalidParam);
        }
        if ckpt.sections.contains_key(&id) {
            return Err(CkptError::Exist);
        }
        let section = Section::new(id.clone(), initial_bytes, expiration, now);
        ckpt.sections.insert(id.clone(), section);
        if let Expiration::At(deadline) = expiration {
            let handle = self.timers.add_absolute(deadline, TimerEvent::SectionExpiry(name.clone(), id.clone()));
            self.checkpoints.get_mut(name).unwrap().sections.get_mut(&id).unwrap().timer = Some(handle);
        }
        Ok(())
    }

    pub fn section_delete(&mut self, name: &Name, id: &SectionId, node: NodeId) -> Result<(), CkptError> {
        if Checkpoint::is_default_section(id) {
            return Err(CkptError::InvalidParam);
        }
        let ckpt = self.checkpoints.get_mut(name).ok_or(CkptError::NotExist)?;
        if !ckpt.active_replica_set(node) {
            return Err(CkptError::InvalidParam);
        }
        let section = ckpt.sections.remove(id).ok_or(CkptError::NotExist)?;
        if let Some(handle) = section.timer {
            self.timers.cancel(handle);
        }
        Ok(())
    }

    pub fn section_expiration_time_set(&mut self, name: &Name, id: &SectionId, expiration: Expiration, node: NodeId) -> Result<(), CkptError> {
        if Checkpoint::is_default_section(id) {
            return Err(CkptError::InvalidParam);
        }
        let ckpt = self.checkpoints.get_mut(name).ok_or(CkptError::NotExist)?;
        if !ckpt.active_replica_set(node) {
            return Err(CkptError::InvalidParam);
        }
        let section = ckpt.sections.get_mut(id).ok_or(CkptError::NotExist)?;
        if let Some(handle) = section.timer.take() {
            self.timers.cancel(handle);
        }
        section.expiration = expiration;
        if let Expiration::At(deadline) = expiration {
            let handle = self.timers.add_absolute(deadline, TimerEvent::SectionExpiry(name.clone(), id.clone()));
            self.checkpoints.get_mut(name).unwrap().sections.get_mut(id).unwrap().timer = Some(handle);
        }
        Ok(())
    }

    pub fn section_write(&mut self, name: &Name, id: &SectionId, offset: usize, bytes: &[u8], node: NodeId, now: u64) -> Result<(), CkptError> {
        let ckpt = self.checkpoints.get_mut(name).ok_or(CkptError::NotExist)?;
        if !ckpt.active_replica_set(node) {
            return Err(CkptError::InvalidParam);
        }
        let max_size = ckpt.attrs.max_section_size as usize;
        let section = ckpt.sections.get_mut(id).ok_or(CkptError::NotExist)?;
        let end = offset.checked_add(bytes.len()).ok_or(CkptError::InvalidParam)?;
        if end > max_size {
            return Err(CkptError::InvalidParam);
        }
        if section.data.len() < end {
            section.data.resize(end, 0);
        }
        section.data[offset..end].copy_from_slice(bytes);
        section.last_update_ns = now;
        Ok(())
    }

    pub fn section_overwrite(&mut self, name: &Name, id: &SectionId, bytes: Vec<u8>, node: NodeId, now: u64) -> Result<(), CkptError> {
        let ckpt = self.checkpoints.get_mut(name).ok_or(CkptError::NotExist)?;
        if !ckpt.active_replica_set(node) {
            return Err(CkptError::InvalidParam);
        }
        if bytes.len() as u32 > ckpt.attrs.max_section_size {
            return Err(CkptError::InvalidParam);
        }
        let section = ckpt.sections.get_mut(id).ok_or(CkptError::NotExist)?;
        section.data = bytes;
        section.last_update_ns = now;
        Ok(())
    }

    pub fn section_read(&self, name: &Name, id: &SectionId, offset: usize, len: usize, node: NodeId) -> Result<Vec<u8>, CkptError> {
        let ckpt = self.checkpoints.get(name).ok_or(CkptError::NotExist)?;
        if !ckpt.active_replica_set(node) {
            return Err(CkptError::InvalidParam);
        }
        let section = ckpt.sections.get(id).ok_or(CkptError::NotExist)?;
        if offset > section.data.len() {
            return Err(CkptError::InvalidParam);
        }
        let available = section.data.len() - offset;
        let n = len.min(available);
        Ok(section.data[offset..offset + n].to_vec())
    }

    /// Promotes `node` to hold the active replica of `name`, per spec
    /// invariant 6: at most one node promoted at a time. Demotes
    /// whichever node (if any) was previously promoted.
    pub fn promote_active_replica(&mut self, name: &Name, node: NodeId) -> Result<(), CkptError> {
        let ckpt = self.checkpoints.get_mut(name).ok_or(CkptError::NotExist)?;
        ckpt.promoted_node = Some(node);
        Ok(())
    }

    pub fn section_descriptor(&self, name: &Name, id: &SectionId) -> Option<SectionDescriptor> {
        let section = self.checkpoints.get(name)?.sections.get(id)?;
        Some(SectionDescriptor { id: section.id.clone(), size: section.data.len(), expiration: section.expiration, last_update_ns: section.last_update_ns })
    }

    // ========================================================================
    // Timer integration
    // ========================================================================

    pub fn next_timeout(&self, now: u64) -> Option<u64> {
        self.timers.poll_timeout(now)
    }

    /// Applies every timer that fired by `now`: section expiry removes
    /// the section locally (not replicated); retention expiry releases
    /// the checkpoint if it is still unreferenced beyond the single
    /// bookkeeping reference.
    pub fn poll_expired(&mut self, now: u64) {
        for (_, event) in self.timers.poll_expired(now) {
            match event {
                TimerEvent::SectionExpiry(name, id) => {
                    if let Some(ckpt) = self.checkpoints.get_mut(&name) {
                        ckpt.sections.remove(&id);
                    }
                }
                TimerEvent::Retention(name) => {
                    self.release(&name);
                }
            }
        }
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Deducts `node`'s reference contribution from every checkpoint,
    /// arming retention where the count drops to one.
    pub fn on_node_left(&mut self, node: NodeId, now: u64) {
        let names: Vec<Name> = self.checkpoints.keys().cloned().collect();
        for name in names {
            let (should_arm, contribution) = {
                let ckpt = self.checkpoints.get_mut(&name).unwrap();
                match ckpt.ref_per_node.remove(&node) {
                    Some(contribution) if contribution > 0 => {
                        ckpt.ref_count = ckpt.ref_count.saturating_sub(contribution);
                        (ckpt.ref_count == 1, contribution)
                    }
                    _ => (false, 0),
                }
            };
            if contribution > 0 && should_arm {
                self.arm_retention(&name, now);
            }
        }
    }

    /// First confchg after bootstrap: rewrite the synthetic loopback id
    /// to the real node id in every checkpoint's reference vector,
    /// without deducting any references.
    pub fn rewrite_loopback_id(&mut self, loopback: NodeId, real: NodeId) {
        for ckpt in self.checkpoints.values_mut() {
            if let Some(count) = ckpt.ref_per_node.remove(&loopback) {
                *ckpt.ref_per_node.entry(real).or_insert(0) += count;
            }
        }
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}
