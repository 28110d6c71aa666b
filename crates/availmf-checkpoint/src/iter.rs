//! Section iteration (spec 4.I, "Iteration: Initialize/Next/Finalize").
//!
//! A snapshot taken at `Initialize` time; later section mutations
//! don't affect an iterator already in flight. The iterator itself is
//! meant to live in a per-connection handle database (see
//! `availmf-ipc`'s private connection data) — this module only
//! implements the filtering and walk.

use crate::model::{CkptError, Expiration, SectionDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationFilter {
    Any,
    Forever,
    LeqExpiration(u64),
    GeqExpiration(u64),
    Corrupted,
}

impl IterationFilter {
    fn matches(self, descriptor: &SectionDescriptor, corrupted: &[bytes::Bytes]) -> bool {
        match self {
            IterationFilter::Any => true,
            IterationFilter::Forever => descriptor.expiration == Expiration::Forever,
            IterationFilter::LeqExpiration(t) => matches!(descriptor.expiration, Expiration::At(e) if e <= t),
            IterationFilter::GeqExpiration(t) => matches!(descriptor.expiration, Expiration::At(e) if e >= t),
            IterationFilter::Corrupted => corrupted.contains(&descriptor.id),
        }
    }
}

/// A stable snapshot of one checkpoint's sections matching a filter.
pub struct SectionIterator {
    items: Vec<SectionDescriptor>,
    pos: usize,
}

impl SectionIterator {
    /// `Initialize`: snapshots every section descriptor passing
    /// `filter`. `corrupted` names the sections currently flagged
    /// corrupted (tracked by the owning checkpoint store).
    pub fn initialize(sections: impl IntoIterator<Item = SectionDescriptor>, filter: IterationFilter, corrupted: &[bytes::Bytes]) -> Self {
        let items = sections.into_iter().filter(|d| filter.matches(d, corrupted)).collect();
        Self { items, pos: 0 }
    }

    /// `Next`: returns the next matching descriptor, or `NO_SECTIONS`
    /// once exhausted.
    pub fn next(&mut self) -> Result<SectionDescriptor, CkptError> {
        let item = self.items.get(self.pos).cloned().ok_or(CkptError::NoSections)?;
        self.pos += 1;
        Ok(item)
    }

    /// `Finalize`: releases the snapshot. Dropping the iterator has
    /// the same effect; this exists for callers that want an explicit
    /// symmetric call.
    pub fn finalize(self) {}
}
