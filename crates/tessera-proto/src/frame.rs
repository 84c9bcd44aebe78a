//! Frame type combining header and payload.
//!
//! A `Frame` is the unit written to a stream:
//! - 12-byte raw binary header (Big Endian)
//! - Variable-length raw payload bytes (already encoded or sealed)
//!
//! This is a pure data holder. For typed access see `Payload::into_frame()`
//! and `Payload::from_frame()`.

use bytes::{BufMut, Bytes};

use crate::{
    FrameHeader,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame
///
/// Layout on the wire:
/// `[FrameHeader: 12 bytes] + [payload: payload_size bytes]`
///
/// # Invariants
///
/// - **Size Consistency**: `payload.len()` MUST match `header.payload_size()`.
///   Enforced by [`Frame::new`] and verified by [`Frame::decode`].
///
/// - **Size Limit**: `payload.len()` MUST NOT exceed
///   [`FrameHeader::MAX_PAYLOAD_SIZE`]. Violations are rejected during
///   encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header
    pub header: FrameHeader,

    /// Raw payload bytes
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame with automatic payload_size calculation
    ///
    /// Oversized payloads are accepted here and rejected by [`Frame::encode`],
    /// which keeps test construction of hostile frames simple.
    #[must_use]
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();

        #[allow(clippy::cast_possible_truncation)]
        {
            header.payload_size = (payload.len() as u32).to_be_bytes();
        }

        Self { header, payload }
    }

    /// Encode frame into buffer
    ///
    /// Writes: `[header (12 bytes)] + [payload (variable)]`
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if payload exceeds
    /// [`FrameHeader::MAX_PAYLOAD_SIZE`].
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Encode frame into a freshly allocated buffer
    ///
    /// # Errors
    ///
    /// Same as [`Frame::encode`].
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(FrameHeader::SIZE + self.payload.len());
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode frame from wire format
    ///
    /// Returns a Frame with raw bytes (does NOT decode the payload). Trailing
    /// bytes after `payload_size` are ignored.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Header parsing fails (invalid magic, version, or size limits)
    /// - Payload is truncated (fewer bytes than header claims)
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;

        let payload_size = header.payload_size() as usize;
        let total_size = FrameHeader::SIZE + payload_size;

        if bytes.len() < total_size {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            });
        }

        let payload = Bytes::copy_from_slice(&bytes[FrameHeader::SIZE..total_size]);

        Ok(Self { header: *header, payload })
    }
}
