//! # availmf-types: Core types for the availability-management framework
//!
//! Shared, dependency-light types used across every crate in the
//! workspace:
//! - Cluster identity ([`NodeId`], [`RingId`])
//! - Wire addressing ([`ServiceId`], [`ServiceFnId`], [`MessageHeader`])
//! - Fixed-width names ([`Name`])
//! - The cluster-wide error taxonomy ([`ErrorCode`])
//! - Supported limits (see [`limits`])

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

pub mod limits {
    //! Supported limits from spec §6.

    /// Maximum number of processors (nodes) in a cluster. Sizes
    /// reference-count vectors and YKD session member lists.
    pub const PROCESSOR_COUNT_MAX: usize = 16;

    /// Maximum length of any configured name (comp, SU, SG, app, ...).
    pub const SA_MAX_NAME_LENGTH: usize = 256;

    /// Maximum length of a healthcheck key.
    pub const SA_AMF_HEALTHCHECK_KEY_MAX: usize = 32;

    /// Maximum payload for one `SYNC_SECTION` chunk during checkpoint
    /// synchronization.
    pub const CKPT_SYNC_CHUNK_MAX: usize = 400 * 1024;
}

// ============================================================================
// NodeId
// ============================================================================

/// Identifies a processor (cluster node).
///
/// Newtype over `u32`, matching the wire representation used by the
/// underlying totem ring protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

// ============================================================================
// RingId
// ============================================================================

/// Identifies a group-membership epoch.
///
/// Monotonically increasing across every configuration change. Carried
/// in sync messages so a recipient can tell whether a sync message was
/// already seen (`previous_ring_id == saved_ring_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RingId {
    /// Node that formed this ring (lowest id among members, by
    /// convention of the underlying totem layer).
    pub representative: NodeId,
    /// Monotonically increasing sequence number for this representative.
    pub seq: u64,
}

impl RingId {
    pub const fn new(representative: NodeId, seq: u64) -> Self {
        Self { representative, seq }
    }
}

impl Display for RingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ring({}, {})", self.representative, self.seq)
    }
}

// ============================================================================
// Service addressing
// ============================================================================

/// Well-known service ids carried in the high 16 bits of a message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ServiceId {
    Evs = 0,
    Clm = 1,
    Amf = 2,
    Ckpt = 3,
    Evt = 4,
    Lck = 5,
    Msg = 6,
    Cfg = 7,
    Cpg = 8,
}

impl ServiceId {
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Decodes a well-known service id, if `raw` matches one.
    pub const fn from_u16(raw: u16) -> Option<Self> {
        Some(match raw {
            0 => Self::Evs,
            1 => Self::Clm,
            2 => Self::Amf,
            3 => Self::Ckpt,
            4 => Self::Evt,
            5 => Self::Lck,
            6 => Self::Msg,
            7 => Self::Cfg,
            8 => Self::Cpg,
            _ => return None,
        })
    }
}

/// `(service, function)` pair addressing an executive or library
/// message handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceFnId {
    pub service: u16,
    pub function: u16,
}

impl ServiceFnId {
    pub const fn new(service: u16, function: u16) -> Self {
        Self { service, function }
    }

    /// Packs into the wire `id` field: `(service << 16) | function`.
    pub const fn pack(self) -> u32 {
        ((self.service as u32) << 16) | (self.function as u32)
    }

    /// Unpacks a wire `id` field into `(service, function)`.
    pub const fn unpack(id: u32) -> Self {
        Self {
            service: (id >> 16) as u16,
            function: (id & 0xffff) as u16,
        }
    }
}

// ============================================================================
// Message header
// ============================================================================

/// The 8-byte-aligned header every wire message begins with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub size: u32,
    pub id: u32,
    pub error: u32,
}

impl MessageHeader {
    pub const ENCODED_LEN: usize = 12;

    pub const fn new(fn_id: ServiceFnId, payload_len: u32) -> Self {
        Self {
            size: Self::ENCODED_LEN as u32 + payload_len,
            id: fn_id.pack(),
            error: ErrorCode::Ok.as_u32(),
        }
    }

    pub const fn fn_id(&self) -> ServiceFnId {
        ServiceFnId::unpack(self.id)
    }
}

/// A received or to-be-sent wire message: header plus opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub header: MessageHeader,
    pub payload: bytes::Bytes,
}

impl Message {
    pub fn new(fn_id: ServiceFnId, payload: bytes::Bytes) -> Self {
        Self {
            header: MessageHeader::new(fn_id, payload.len() as u32),
            payload,
        }
    }
}

// ============================================================================
// Name
// ============================================================================

/// A fixed-width configured name: explicit length plus up to
/// [`limits::SA_MAX_NAME_LENGTH`] bytes.
///
/// Names are compared and hashed by their logical (length-bounded)
/// content only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Name(String);

impl Name {
    /// Builds a name, truncating silently to the supported limit is not
    /// performed: oversized names are rejected by the caller via
    /// [`NameError::TooLong`].
    pub fn new(s: impl Into<String>) -> Result<Self, NameError> {
        let s = s.into();
        if s.len() > limits::SA_MAX_NAME_LENGTH {
            return Err(NameError::TooLong(s.len()));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error constructing a [`Name`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("name exceeds max length {max}: {0}", max = limits::SA_MAX_NAME_LENGTH)]
    TooLong(usize),
}

// ============================================================================
// Error taxonomy (spec §7)
// ============================================================================

/// The cluster-wide error taxonomy. Carried in [`MessageHeader::error`]
/// and mapped to/from crate-local error enums at each subsystem's
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCode {
    Ok,
    BadHandle,
    InvalidParam,
    NoMemory,
    NoSpace,
    TryAgain,
    NotExist,
    NoSections,
    Exist,
    BadOperation,
    Access,
    FailedOperation,
}

impl ErrorCode {
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Ok => 0,
            Self::BadHandle => 1,
            Self::InvalidParam => 2,
            Self::NoMemory => 3,
            Self::NoSpace => 4,
            Self::TryAgain => 5,
            Self::NotExist => 6,
            Self::NoSections => 7,
            Self::Exist => 8,
            Self::BadOperation => 9,
            Self::Access => 10,
            Self::FailedOperation => 11,
        }
    }

    pub const fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Ok,
            1 => Self::BadHandle,
            2 => Self::InvalidParam,
            3 => Self::NoMemory,
            4 => Self::NoSpace,
            5 => Self::TryAgain,
            6 => Self::NotExist,
            7 => Self::NoSections,
            8 => Self::Exist,
            9 => Self::BadOperation,
            10 => Self::Access,
            11 => Self::FailedOperation,
            _ => return None,
        })
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn service_fn_id_pack_roundtrip() {
        let id = ServiceFnId::new(ServiceId::Amf.as_u16(), 42);
        let packed = id.pack();
        assert_eq!(ServiceFnId::unpack(packed), id);
    }

    #[test_case(ErrorCode::Ok)]
    #[test_case(ErrorCode::TryAgain)]
    #[test_case(ErrorCode::NotExist)]
    #[test_case(ErrorCode::FailedOperation)]
    fn error_code_roundtrip(code: ErrorCode) {
        assert_eq!(ErrorCode::from_u32(code.as_u32()), Some(code));
    }

    #[test]
    fn name_rejects_oversized() {
        let huge = "a".repeat(limits::SA_MAX_NAME_LENGTH + 1);
        assert_eq!(Name::new(huge), Err(NameError::TooLong(limits::SA_MAX_NAME_LENGTH + 1)));
    }

    #[test]
    fn name_accepts_max_length() {
        let ok = "a".repeat(limits::SA_MAX_NAME_LENGTH);
        assert!(Name::new(ok).is_ok());
    }

    proptest::proptest! {
        #[test]
        fn ring_id_ord_is_lexicographic(a_rep in 0u32..10, a_seq in 0u64..1000, b_rep in 0u32..10, b_seq in 0u64..1000) {
            let a = RingId::new(NodeId::new(a_rep), a_seq);
            let b = RingId::new(NodeId::new(b_rep), b_seq);
            let expect = (a_rep, a_seq).cmp(&(b_rep, b_seq));
            proptest::prop_assert_eq!(a.cmp(&b), expect);
        }
    }
}
