//! Operation codes for Tessera protocol frames.
//!
//! One opcode per protocol message, numbered in protocol order:
//!
//! | Opcode | Message | Direction |
//! |---|---|---|
//! | `0x0001` | AuthRequest | Initiator → KDC |
//! | `0x0002` | KdcReply | KDC → Initiator |
//! | `0x0003` | Ticket | Initiator → Responder |
//! | `0x0004` | Challenge | Responder → Initiator |
//! | `0x0005` | ChallengeResponse | Initiator → Responder |

/// Frame operation codes
///
/// Serialized as a big endian `u16` in the frame header. The `#[repr(u16)]`
/// keeps the numeric values stable for wire compatibility.
///
/// # Security
///
/// `from_u16` returns `None` for unknown values. Frames carrying an unknown
/// opcode are rejected with
/// [`ProtocolError::InvalidOpcode`](crate::ProtocolError::InvalidOpcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Session key request, sent in the clear
    AuthRequest = 0x0001,
    /// KDC reply sealed under the initiator's long-term key
    KdcReply = 0x0002,
    /// Ticket sealed under the responder's long-term key
    Ticket = 0x0003,
    /// Responder challenge sealed under the session key
    Challenge = 0x0004,
    /// Initiator answer sealed under the session key
    ChallengeResponse = 0x0005,
}

impl Opcode {
    /// Convert to raw u16 value
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Convert from raw u16 value
    ///
    /// Returns `None` if the value doesn't correspond to a known opcode.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::AuthRequest),
            0x0002 => Some(Self::KdcReply),
            0x0003 => Some(Self::Ticket),
            0x0004 => Some(Self::Challenge),
            0x0005 => Some(Self::ChallengeResponse),
            _ => None,
        }
    }

    /// Human-readable message name, used in logs and errors
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AuthRequest => "AuthRequest",
            Self::KdcReply => "KdcReply",
            Self::Ticket => "Ticket",
            Self::Challenge => "Challenge",
            Self::ChallengeResponse => "ChallengeResponse",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trip() {
        let opcodes = [
            Opcode::AuthRequest,
            Opcode::KdcReply,
            Opcode::Ticket,
            Opcode::Challenge,
            Opcode::ChallengeResponse,
        ];

        for opcode in opcodes {
            assert_eq!(Opcode::from_u16(opcode.to_u16()), Some(opcode));
        }
    }

    #[test]
    fn invalid_opcode() {
        assert_eq!(Opcode::from_u16(0x0000), None);
        assert_eq!(Opcode::from_u16(0x0006), None);
        assert_eq!(Opcode::from_u16(0xFFFF), None);
    }
}
