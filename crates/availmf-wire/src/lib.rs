//! # availmf-wire: length-prefixed wire encoding (spec 4.N)
//!
//! Hand-rolled byte-level encode/decode for primitive and name/string
//! fields, plus the endian-conversion hook the executive-message
//! dispatch path (`availmf-registry`) invokes when the sender's byte
//! order differs from the local one.
//!
//! This is deliberately not `serde`: payloads are variable-length with
//! scalar fields inlined among them, so the receiver must be able to
//! byte-swap scalar fields in place on the raw buffer before it is
//! interpreted, rather than deserializing into a canonical form first.

use availmf_types::Name;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Errors produced while decoding a wire buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer underrun: needed {needed} bytes, had {available}")]
    Underrun { needed: usize, available: usize },

    #[error("name length {0} exceeds max name length {max}", max = availmf_types::limits::SA_MAX_NAME_LENGTH)]
    NameTooLong(usize),

    #[error("invalid utf8 in name field")]
    InvalidUtf8,
}

pub type Result<T> = std::result::Result<T, WireError>;

// ============================================================================
// Encoder
// ============================================================================

/// Appends length-prefixed and fixed-width fields to an output buffer.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { buf: BytesMut::with_capacity(cap) }
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16(v);
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32(v);
        self
    }

    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.put_u64(v);
        self
    }

    pub fn put_i32(&mut self, v: i32) -> &mut Self {
        self.buf.put_i32(v);
        self
    }

    pub fn put_i64(&mut self, v: i64) -> &mut Self {
        self.buf.put_i64(v);
        self
    }

    pub fn put_f32(&mut self, v: f32) -> &mut Self {
        self.buf.put_f32(v);
        self
    }

    pub fn put_f64(&mut self, v: f64) -> &mut Self {
        self.buf.put_f64(v);
        self
    }

    /// Length-prefixes an opaque byte blob with a 32-bit count.
    pub fn put_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.put_u32(data.len() as u32);
        self.buf.put_slice(data);
        self
    }

    /// Encodes a name as `(len: u16, bytes[..len])`. Unlike section data,
    /// names are never padded to a fixed width on the wire; the fixed
    /// width is only the *limit* (`SA_MAX_NAME_LENGTH`), not the encoding.
    pub fn put_name(&mut self, name: &Name) -> &mut Self {
        let bytes = name.as_str().as_bytes();
        self.buf.put_u16(bytes.len() as u16);
        self.buf.put_slice(bytes);
        self
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// Reads length-prefixed and fixed-width fields from an input buffer.
pub struct Decoder<'a> {
    cursor: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { cursor: buf }
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.cursor.len() < n {
            return Err(WireError::Underrun { needed: n, available: self.cursor.len() });
        }
        Ok(())
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        self.need(2)?;
        Ok(self.cursor.get_u16())
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.cursor.get_u32())
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.need(8)?;
        Ok(self.cursor.get_u64())
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        self.need(4)?;
        Ok(self.cursor.get_i32())
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.need(8)?;
        Ok(self.cursor.get_i64())
    }

    pub fn get_f32(&mut self) -> Result<f32> {
        self.need(4)?;
        Ok(self.cursor.get_f32())
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.need(8)?;
        Ok(self.cursor.get_f64())
    }

    pub fn get_bytes(&mut self) -> Result<Bytes> {
        let len = self.get_u32()? as usize;
        self.need(len)?;
        let out = Bytes::copy_from_slice(&self.cursor[..len]);
        self.cursor.advance(len);
        Ok(out)
    }

    pub fn get_name(&mut self) -> Result<Name> {
        let len = self.get_u16()? as usize;
        if len > availmf_types::limits::SA_MAX_NAME_LENGTH {
            return Err(WireError::NameTooLong(len));
        }
        self.need(len)?;
        let raw = &self.cursor[..len];
        let s = std::str::from_utf8(raw).map_err(|_| WireError::InvalidUtf8)?.to_owned();
        self.cursor.advance(len);
        Name::new(s).map_err(|_| WireError::NameTooLong(len))
    }

    /// Remaining unconsumed bytes.
    pub fn remaining(&self) -> &'a [u8] {
        self.cursor
    }
}

// ============================================================================
// Endian conversion
// ============================================================================

/// Width of a scalar field subject to endian conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarWidth {
    Two,
    Four,
    Eight,
}

impl ScalarWidth {
    const fn bytes(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

/// Describes one scalar field's byte offset within a message buffer, for
/// in-place endian conversion at receive time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarField {
    pub offset: usize,
    pub width: ScalarWidth,
}

impl ScalarField {
    pub const fn new(offset: usize, width: ScalarWidth) -> Self {
        Self { offset, width }
    }
}

/// Byte-swaps every described scalar field in place.
///
/// Called by the executive-handler dispatch path when `deliver`'s
/// `endian_flip` flag indicates the sender used a different byte order
/// than the local node. Variable-length (length-prefixed) fields are
/// never touched here — they are interpreted by the `Decoder`, which is
/// endian-agnostic for byte blobs and relies on this pass only for fixed
/// width integers and floats.
pub fn convert_endian(buf: &mut [u8], fields: &[ScalarField]) {
    for field in fields {
        let width = field.width.bytes();
        let end = field.offset + width;
        if end > buf.len() {
            continue;
        }
        buf[field.offset..end].reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use availmf_types::Name;

    #[test]
    fn encode_decode_roundtrip() {
        let mut enc = Encoder::new();
        enc.put_u32(7).put_u64(99).put_bytes(b"hello").put_name(&Name::new("comp1").unwrap());
        let bytes = enc.finish();

        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.get_u32().unwrap(), 7);
        assert_eq!(dec.get_u64().unwrap(), 99);
        assert_eq!(dec.get_bytes().unwrap().as_ref(), b"hello");
        assert_eq!(dec.get_name().unwrap().as_str(), "comp1");
        assert!(dec.remaining().is_empty());
    }

    #[test]
    fn underrun_is_reported() {
        let mut dec = Decoder::new(&[0u8, 1]);
        assert_eq!(dec.get_u32(), Err(WireError::Underrun { needed: 4, available: 2 }));
    }

    #[test]
    fn convert_endian_swaps_only_described_fields() {
        let mut buf = Encoder::new().put_u32(0x0102_0304).finish().to_vec();
        convert_endian(&mut buf, &[ScalarField::new(0, ScalarWidth::Four)]);
        assert_eq!(u32::from_be_bytes(buf.try_into().unwrap()), 0x0403_0201);
    }

    #[test]
    fn name_too_long_is_rejected() {
        let oversized_len: u16 = (availmf_types::limits::SA_MAX_NAME_LENGTH + 1) as u16;
        let mut enc = Encoder::new();
        enc.put_u16(oversized_len);
        enc.buf.extend(std::iter::repeat(b'x').take(oversized_len as usize));
        let bytes = enc.finish();
        let mut dec = Decoder::new(&bytes);
        assert!(matches!(dec.get_name(), Err(WireError::NameTooLong(_))));
    }

    proptest::proptest! {
        #[test]
        fn bytes_roundtrip(data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256)) {
            let mut enc = Encoder::new();
            enc.put_bytes(&data);
            let encoded = enc.finish();
            let mut dec = Decoder::new(&encoded);
            proptest::prop_assert_eq!(dec.get_bytes().unwrap().as_ref(), data.as_slice());
        }
    }
}
