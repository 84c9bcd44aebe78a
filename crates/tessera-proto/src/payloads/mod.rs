//! Frame payloads.
//!
//! Each opcode has exactly one payload shape. Only `AuthRequest` is readable
//! on the wire; the other four messages are opaque AEAD ciphertexts
//! ([`Sealed`]) whose plaintexts are the records in [`kdc`], [`ticket`] and
//! [`challenge`].
//!
//! # Security
//!
//! - **Opcode Selects Shape**: the frame header's opcode decides how the
//!   payload is read. No tag inside the payload can override it.
//!
//! - **Bounded Input**: payloads larger than
//!   [`FrameHeader::MAX_PAYLOAD_SIZE`] are rejected before any parsing.

pub mod challenge;
pub mod kdc;
pub mod ticket;

use bytes::{BufMut, Bytes};

use crate::{
    Frame, FrameHeader, Opcode,
    codec::Record,
    errors::{ProtocolError, Result},
};

/// Opaque AEAD ciphertext.
///
/// The protocol layer never looks inside; only a holder of the right key can
/// turn it back into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed(Bytes);

impl Sealed {
    /// Borrow the ciphertext bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Ciphertext length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the ciphertext is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Sealed {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<Bytes> for Sealed {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

/// All possible frame payloads
///
/// # Invariants
///
/// - **Opcode Uniqueness**: each variant corresponds to exactly one
///   [`Opcode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Initiator → KDC, clear
    AuthRequest(kdc::AuthRequest),
    /// KDC → Initiator, sealed [`kdc::KdcReplyBody`]
    KdcReply(Sealed),
    /// Initiator → Responder, sealed [`ticket::TicketBody`]
    Ticket(Sealed),
    /// Responder → Initiator, sealed [`challenge::Challenge`]
    Challenge(Sealed),
    /// Initiator → Responder, sealed [`challenge::ChallengeResponse`]
    ChallengeResponse(Sealed),
}

impl Payload {
    /// Get the opcode for this payload variant
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::AuthRequest(_) => Opcode::AuthRequest,
            Self::KdcReply(_) => Opcode::KdcReply,
            Self::Ticket(_) => Opcode::Ticket,
            Self::Challenge(_) => Opcode::Challenge,
            Self::ChallengeResponse(_) => Opcode::ChallengeResponse,
        }
    }

    /// Encode payload bytes (without header) into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FieldTooLong`] if a record field overflows its
    /// length prefix.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        match self {
            Self::AuthRequest(request) => dst.put_slice(&request.to_bytes()?),
            Self::KdcReply(sealed)
            | Self::Ticket(sealed)
            | Self::Challenge(sealed)
            | Self::ChallengeResponse(sealed) => dst.put_slice(sealed.as_bytes()),
        }
        Ok(())
    }

    /// Decode payload bytes according to `opcode`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `bytes.len() > MAX_PAYLOAD_SIZE`
    /// - the clear `AuthRequest` record is malformed
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        let sealed = || Sealed::from(Bytes::copy_from_slice(bytes));

        let payload = match opcode {
            Opcode::AuthRequest => Self::AuthRequest(kdc::AuthRequest::from_bytes(bytes)?),
            Opcode::KdcReply => Self::KdcReply(sealed()),
            Opcode::Ticket => Self::Ticket(sealed()),
            Opcode::Challenge => Self::Challenge(sealed()),
            Opcode::ChallengeResponse => Self::ChallengeResponse(sealed()),
        };

        Ok(payload)
    }

    /// Convert payload into a transport frame
    ///
    /// # Errors
    ///
    /// See [`Payload::encode`].
    pub fn into_frame(self) -> Result<Frame> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(Frame::new(FrameHeader::new(self.opcode()), buf))
    }

    /// Parse payload from a raw transport frame
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidOpcode`] for unknown opcodes, or any
    /// error from [`Payload::decode`].
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let opcode = frame
            .header
            .opcode_enum()
            .ok_or_else(|| ProtocolError::InvalidOpcode(frame.header.opcode()))?;
        Self::decode(opcode, &frame.payload)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{PrincipalId, Record};

    #[test]
    fn auth_request_frame_round_trip() {
        let payload = Payload::AuthRequest(kdc::AuthRequest {
            initiator: PrincipalId::new("A").unwrap(),
            responder: PrincipalId::new("B").unwrap(),
            nonce: 0xDEAD_BEEF,
        });

        let frame = payload.clone().into_frame().expect("should create frame");
        assert_eq!(frame.header.opcode_enum(), Some(Opcode::AuthRequest));

        let decoded = Payload::from_frame(&frame).expect("should parse payload");
        assert_eq!(payload, decoded);
    }

    #[test]
    fn sealed_payload_is_carried_verbatim() {
        let payload = Payload::Ticket(Sealed::from(vec![0xAA; 60]));
        let frame = payload.into_frame().unwrap();

        assert_eq!(&frame.payload[..], &[0xAA; 60][..]);
    }

    #[test]
    fn unknown_opcode_rejected() {
        let mut frame = Payload::Challenge(Sealed::from(vec![1])).into_frame().unwrap();
        frame.header.opcode = 0x0042u16.to_be_bytes();

        assert_eq!(Payload::from_frame(&frame), Err(ProtocolError::InvalidOpcode(0x0042)));
    }

    #[test]
    fn malformed_auth_request_rejected() {
        let frame = Frame::new(FrameHeader::new(Opcode::AuthRequest), vec![0x01, 0x01, 0x00]);
        assert!(Payload::from_frame(&frame).is_err());
    }

    proptest! {
        #[test]
        fn record_decoders_reject_garbage_without_panicking(
            bytes in prop::collection::vec(any::<u8>(), 0..128)
        ) {
            let _ = kdc::AuthRequest::from_bytes(&bytes);
            let _ = kdc::KdcReplyBody::from_bytes(&bytes);
            let _ = ticket::TicketBody::from_bytes(&bytes);
            let _ = challenge::Challenge::from_bytes(&bytes);
            let _ = challenge::ChallengeResponse::from_bytes(&bytes);

            for opcode in [Opcode::AuthRequest, Opcode::KdcReply, Opcode::Challenge] {
                let _ = Payload::decode(opcode, &bytes);
            }
        }
    }
}
