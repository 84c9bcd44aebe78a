//! Length-prefixed record encoding.
//!
//! Every structured message body (the clear `AuthRequest` and every
//! plaintext that ends up inside an AEAD ciphertext) is a *record*:
//!
//! ```text
//! ┌─────────┬─────┬──────────┬──────────┬─────┐
//! │ version │ tag │ field 0  │ field 1  │ ... │
//! │   u8    │ u8  │          │          │     │
//! └─────────┴─────┴──────────┴──────────┴─────┘
//! ```
//!
//! Fields appear in a fixed order defined by the record type:
//! - integers are fixed-width big endian
//! - byte strings are a `u16` big endian length followed by the bytes
//!
//! # Security
//!
//! - **No Object Graphs**: the decoder only ever produces the concrete record
//!   type the caller asked for. There is no type information on the wire that
//!   could steer decoding.
//!
//! - **Domain Separation**: the tag binds a plaintext to its role. A ticket
//!   body cannot be accepted where a KDC reply body is expected even if both
//!   were sealed under the same key.
//!
//! - **Exact Consumption**: trailing bytes are an error, so two different
//!   byte strings never decode to the same record.

use bytes::{Buf, BufMut};

use crate::errors::{ProtocolError, Result};

/// Current record encoding version
pub const RECORD_VERSION: u8 = 0x01;

/// Record type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordTag {
    /// Clear session key request
    AuthRequest = 0x01,
    /// Plaintext of the KDC reply
    KdcReply = 0x02,
    /// Plaintext of the ticket
    Ticket = 0x03,
    /// Plaintext of the responder challenge
    Challenge = 0x04,
    /// Plaintext of the initiator answer
    ChallengeResponse = 0x05,
}

impl RecordTag {
    /// Raw tag byte
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// A structured message body with a fixed field order.
pub trait Record: Sized {
    /// Tag written after the version byte
    const TAG: RecordTag;

    /// Write the record's fields (without version and tag).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FieldTooLong`] if a field does not fit its
    /// length prefix.
    fn encode_fields(&self, dst: &mut impl BufMut) -> Result<()>;

    /// Read the record's fields (version and tag already consumed).
    ///
    /// # Errors
    ///
    /// Returns an error if a field is truncated or invalid.
    fn decode_fields(fields: &mut FieldReader<'_>) -> Result<Self>;

    /// Encode the full record including version and tag.
    ///
    /// # Errors
    ///
    /// See [`Record::encode_fields`].
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.put_u8(RECORD_VERSION);
        buf.put_u8(Self::TAG.to_u8());
        self.encode_fields(&mut buf)?;
        Ok(buf)
    }

    /// Decode a full record, rejecting wrong version, wrong tag and trailing
    /// bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] describing the first structural problem.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = FieldReader::new(bytes);

        let version = reader.u8("version")?;
        if version != RECORD_VERSION {
            return Err(ProtocolError::UnsupportedRecordVersion(version));
        }

        let tag = reader.u8("tag")?;
        if tag != Self::TAG.to_u8() {
            return Err(ProtocolError::UnexpectedRecord {
                expected: Self::TAG.to_u8(),
                actual: tag,
            });
        }

        let record = Self::decode_fields(&mut reader)?;
        reader.finish()?;

        Ok(record)
    }
}

/// Write a `u16`-length-prefixed byte field.
///
/// # Errors
///
/// Returns [`ProtocolError::FieldTooLong`] if `value` exceeds `u16::MAX`.
pub fn put_field(dst: &mut impl BufMut, field: &'static str, value: &[u8]) -> Result<()> {
    let len = u16::try_from(value.len()).map_err(|_| ProtocolError::FieldTooLong {
        field,
        len: value.len(),
        max: u16::MAX as usize,
    })?;

    dst.put_u16(len);
    dst.put_slice(value);
    Ok(())
}

/// Cursor over the fields of a record.
#[derive(Debug)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    /// Start reading at the beginning of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn ensure(&self, field: &'static str, len: usize) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(ProtocolError::RecordTruncated { field });
        }
        Ok(())
    }

    /// Read a single byte.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::RecordTruncated`] if no bytes remain.
    pub fn u8(&mut self, field: &'static str) -> Result<u8> {
        self.ensure(field, 1)?;
        Ok(self.buf.get_u8())
    }

    /// Read a big endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::RecordTruncated`] if fewer than 8 bytes remain.
    pub fn u64(&mut self, field: &'static str) -> Result<u64> {
        self.ensure(field, 8)?;
        Ok(self.buf.get_u64())
    }

    /// Read a `u16`-length-prefixed byte field.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::RecordTruncated`] if the prefix or the bytes
    /// it announces are missing.
    pub fn field(&mut self, field: &'static str) -> Result<&'a [u8]> {
        self.ensure(field, 2)?;
        let len = self.buf.get_u16() as usize;
        self.ensure(field, len)?;

        let (value, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(value)
    }

    /// Assert every byte was consumed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::TrailingBytes`] if bytes remain.
    pub fn finish(self) -> Result<()> {
        match self.buf.len() {
            0 => Ok(()),
            n => Err(ProtocolError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_round_trip() {
        let mut buf = Vec::new();
        put_field(&mut buf, "a", b"hello").unwrap();
        buf.put_u64(42);

        let mut reader = FieldReader::new(&buf);
        assert_eq!(reader.field("a").unwrap(), b"hello");
        assert_eq!(reader.u64("b").unwrap(), 42);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn truncated_field_names_the_field() {
        let buf = [0x00, 0x05, b'h', b'i'];
        let mut reader = FieldReader::new(&buf);

        let result = reader.field("identity");
        assert_eq!(result, Err(ProtocolError::RecordTruncated { field: "identity" }));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let reader = FieldReader::new(&[1, 2, 3]);
        assert_eq!(reader.finish(), Err(ProtocolError::TrailingBytes(3)));
    }

    #[test]
    fn oversized_field_rejected() {
        let big = vec![0u8; u16::MAX as usize + 1];
        let result = put_field(&mut Vec::new(), "ticket", &big);
        assert!(matches!(result, Err(ProtocolError::FieldTooLong { field: "ticket", .. })));
    }
}
