//! Records exchanged with the KDC.

use bytes::BufMut;

use crate::{
    KeyMaterial, PrincipalId,
    codec::{FieldReader, Record, RecordTag, put_field},
    errors::Result,
    payloads::Sealed,
};

/// Step 1: the initiator asks the KDC for a session key with `responder`.
///
/// Sent in the clear. Its integrity rests on the KDC echoing `nonce` inside a
/// reply sealed under the initiator's long-term key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    /// Requesting principal
    pub initiator: PrincipalId,
    /// Principal the initiator wants to talk to
    pub responder: PrincipalId,
    /// Initiator nonce N_A
    pub nonce: u64,
}

impl Record for AuthRequest {
    const TAG: RecordTag = RecordTag::AuthRequest;

    fn encode_fields(&self, dst: &mut impl BufMut) -> Result<()> {
        put_field(dst, "initiator", self.initiator.as_str().as_bytes())?;
        put_field(dst, "responder", self.responder.as_str().as_bytes())?;
        dst.put_u64(self.nonce);
        Ok(())
    }

    fn decode_fields(fields: &mut FieldReader<'_>) -> Result<Self> {
        let initiator = PrincipalId::from_wire(fields.field("initiator")?)?;
        let responder = PrincipalId::from_wire(fields.field("responder")?)?;
        let nonce = fields.u64("nonce")?;
        Ok(Self { initiator, responder, nonce })
    }
}

/// Step 2: plaintext of the KDC reply, sealed under the initiator's
/// long-term key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdcReplyBody {
    /// Fresh session key K_AB
    pub session_key: KeyMaterial,
    /// Responder the key was issued for
    pub responder: PrincipalId,
    /// Echo of the initiator nonce N_A
    pub nonce: u64,
    /// Ticket sealed under the responder's long-term key
    pub ticket: Sealed,
}

impl Record for KdcReplyBody {
    const TAG: RecordTag = RecordTag::KdcReply;

    fn encode_fields(&self, dst: &mut impl BufMut) -> Result<()> {
        put_field(dst, "session_key", self.session_key.as_bytes())?;
        put_field(dst, "responder", self.responder.as_str().as_bytes())?;
        dst.put_u64(self.nonce);
        put_field(dst, "ticket", self.ticket.as_bytes())?;
        Ok(())
    }

    fn decode_fields(fields: &mut FieldReader<'_>) -> Result<Self> {
        let session_key = KeyMaterial::new(fields.field("session_key")?.to_vec());
        let responder = PrincipalId::from_wire(fields.field("responder")?)?;
        let nonce = fields.u64("nonce")?;
        let ticket = Sealed::from(fields.field("ticket")?.to_vec());
        Ok(Self { session_key, responder, nonce, ticket })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolError;

    fn id(name: &str) -> PrincipalId {
        PrincipalId::new(name).unwrap()
    }

    #[test]
    fn auth_request_wire_layout() {
        let request = AuthRequest { initiator: id("A"), responder: id("B"), nonce: 7 };
        let bytes = request.to_bytes().unwrap();

        assert_eq!(hex::encode(&bytes), "01010001410001420000000000000007");
        assert_eq!(AuthRequest::from_bytes(&bytes).unwrap(), request);
    }

    #[test]
    fn kdc_reply_round_trip() {
        let body = KdcReplyBody {
            session_key: KeyMaterial::new(vec![9; 32]),
            responder: id("B"),
            nonce: u64::MAX,
            ticket: Sealed::from(vec![1, 2, 3]),
        };

        let decoded = KdcReplyBody::from_bytes(&body.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn auth_request_is_not_a_reply() {
        let request = AuthRequest { initiator: id("A"), responder: id("B"), nonce: 1 };
        let bytes = request.to_bytes().unwrap();

        assert_eq!(
            KdcReplyBody::from_bytes(&bytes),
            Err(ProtocolError::UnexpectedRecord { expected: 0x02, actual: 0x01 })
        );
    }

    #[test]
    fn invalid_identity_rejected() {
        let mut bytes = AuthRequest { initiator: id("A"), responder: id("B"), nonce: 1 }
            .to_bytes()
            .unwrap();
        // Replace "A" with "/"
        bytes[4] = b'/';

        assert!(matches!(AuthRequest::from_bytes(&bytes), Err(ProtocolError::InvalidPrincipal(_))));
    }
}
