//! Ticket plaintext.

use bytes::BufMut;

use crate::{
    KeyMaterial, PrincipalId,
    codec::{FieldReader, Record, RecordTag, put_field},
    errors::Result,
};

/// Plaintext of the ticket, sealed by the KDC under the responder's
/// long-term key and relayed unmodified by the initiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketBody {
    /// Session key K_AB
    pub session_key: KeyMaterial,
    /// Principal the KDC issued the key to
    pub initiator: PrincipalId,
}

impl Record for TicketBody {
    const TAG: RecordTag = RecordTag::Ticket;

    fn encode_fields(&self, dst: &mut impl BufMut) -> Result<()> {
        put_field(dst, "session_key", self.session_key.as_bytes())?;
        put_field(dst, "initiator", self.initiator.as_str().as_bytes())?;
        Ok(())
    }

    fn decode_fields(fields: &mut FieldReader<'_>) -> Result<Self> {
        let session_key = KeyMaterial::new(fields.field("session_key")?.to_vec());
        let initiator = PrincipalId::from_wire(fields.field("initiator")?)?;
        Ok(Self { session_key, initiator })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolError;

    #[test]
    fn truncated_ticket_rejected() {
        let body = TicketBody {
            session_key: KeyMaterial::new(vec![5; 16]),
            initiator: PrincipalId::new("A").unwrap(),
        };
        let bytes = body.to_bytes().unwrap();

        for cut in 0..bytes.len() {
            assert!(TicketBody::from_bytes(&bytes[..cut]).is_err(), "prefix {cut} accepted");
        }
        assert_eq!(TicketBody::from_bytes(&bytes).unwrap(), body);
    }

    #[test]
    fn trailing_byte_rejected() {
        let body = TicketBody {
            session_key: KeyMaterial::new(vec![5; 16]),
            initiator: PrincipalId::new("A").unwrap(),
        };
        let mut bytes = body.to_bytes().unwrap();
        bytes.push(0);

        assert_eq!(TicketBody::from_bytes(&bytes), Err(ProtocolError::TrailingBytes(1)));
    }
}
