//! Checkpoint and section data model (spec 4.I).

use std::collections::HashMap;

use availmf_timer::TimerHandle;
use availmf_types::{Name, NodeId};
use bytes::Bytes;
use thiserror::Error;

pub type SectionId = Bytes;

/// The section every checkpoint has from creation; `max_sections == 1`
/// means only this section may ever exist.
pub fn default_section_id() -> SectionId {
    Bytes::new()
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CkptError {
    #[error("checkpoint does not exist")]
    NotExist,
    #[error("checkpoint already exists with different attributes")]
    Exist,
    #[error("invalid parameter")]
    InvalidParam,
    #[error("out of memory")]
    NoMemory,
    #[error("no space for another section")]
    NoSpace,
    #[error("operation not valid in current state")]
    BadOperation,
    #[error("no sections match the iteration filter")]
    NoSections,
}

/// Replication policy for writes against a collocated checkpoint,
/// spec §1: whether every replica must durably apply a write before it
/// is acknowledged, or only the active replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationFlags {
    AllReplicasWrite,
    ActiveReplicaWrite,
    ActiveReplicaWriteWeak,
}

/// Attributes supplied at creation time; must match on every
/// subsequent non-creating `Open` of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationAttrs {
    pub creation_flags: CreationFlags,
    pub max_sections: u32,
    pub max_section_size: u32,
    pub max_section_id_size: u32,
    pub retention_duration_ns: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    Forever,
    At(u64),
}

#[derive(Debug, Clone)]
pub struct Section {
    pub id: SectionId,
    pub data: Vec<u8>,
    pub expiration: Expiration,
    pub last_update_ns: u64,
    pub(crate) timer: Option<TimerHandle>,
}

impl Section {
    pub fn new(id: SectionId, data: Vec<u8>, expiration: Expiration, now: u64) -> Self {
        Self { id, data, expiration, last_update_ns: now, timer: None }
    }
}

/// Snapshot description of a section, returned by reads and by
/// iteration, without exposing the live timer handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub id: SectionId,
    pub size: usize,
    pub expiration: Expiration,
    pub last_update_ns: u64,
}

#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub name: Name,
    pub attrs: CreationAttrs,
    pub ref_count: u32,
    pub ref_per_node: HashMap<NodeId, u32>,
    pub unlinked: bool,
    pub sections: HashMap<SectionId, Section>,
    pub(crate) retention_timer: Option<TimerHandle>,
    pub saved_ring_id: Option<availmf_types::RingId>,
    /// The node currently promoted to hold the active replica of this
    /// checkpoint, set by collocation/promotion (spec invariant 6: at
    /// most one node promoted at a time, tracked here as a single slot
    /// rather than a set so the invariant holds by construction).
    pub promoted_node: Option<NodeId>,
}

impl Checkpoint {
    pub fn new(name: Name, attrs: CreationAttrs, now: u64) -> Self {
        let mut sections = HashMap::new();
        sections.insert(default_section_id(), Section::new(default_section_id(), Vec::new(), Expiration::Forever, now));
        Self {
            name,
            attrs,
            ref_count: 0,
            ref_per_node: HashMap::new(),
            unlinked: false,
            sections,
            retention_timer: None,
            saved_ring_id: None,
            promoted_node: None,
        }
    }

    pub fn is_default_section(id: &SectionId) -> bool {
        id.is_empty()
    }

    /// Whether `node` must treat itself as the active replica for this
    /// checkpoint's writes (spec §1). `AllReplicasWrite` checkpoints
    /// have no single active replica: every replica applies writes
    /// directly. The two active-replica flags gate on which node is
    /// currently promoted.
    pub fn active_replica_set(&self, node: NodeId) -> bool {
        match self.attrs.creation_flags {
            CreationFlags::AllReplicasWrite => true,
            CreationFlags::ActiveReplicaWrite | CreationFlags::ActiveReplicaWriteWeak => self.promoted_node == Some(node),
        }
    }
}
