//! Frame header implementation with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 12-byte structure serialized as raw binary
//! (Big Endian). It carries just enough to delimit and dispatch a message:
//! magic, version, opcode and payload length.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    Opcode,
    errors::{ProtocolError, Result},
};

/// Fixed 12-byte frame header (Big Endian network byte order)
///
/// Fields are stored as raw byte arrays so every bit pattern is a valid
/// header and no alignment requirements apply.
///
/// ```text
/// 0      4   5   6       8              12
/// ┌──────┬───┬───┬───────┬──────────────┐
/// │magic │ver│rsv│opcode │ payload_size │
/// └──────┴───┴───┴───────┴──────────────┘
/// ```
///
/// # Security Properties
///
/// - **Zero-Copy Safety**: `zerocopy` verifies the layout at compile time, so
///   casting untrusted network bytes cannot cause undefined behavior.
///
/// - **Bounded Reads**: `payload_size` is checked against
///   [`FrameHeader::MAX_PAYLOAD_SIZE`] before a reader allocates for the
///   payload. A peer cannot make us allocate more than 64 KiB per frame.
///
/// - **No Authentication**: The header is never encrypted or authenticated.
///   Everything a peer must trust lives inside the sealed payload.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    magic: [u8; 4],                   // 0x54535241 ("TSRA")
    version: u8,                      // 0x01
    reserved: u8,                     // must be zero on send, ignored on receive
    pub(crate) opcode: [u8; 2],       // u16 operation code
    pub(crate) payload_size: [u8; 4], // u32 payload length
}

impl FrameHeader {
    /// Size of the serialized header (12 bytes)
    pub const SIZE: usize = 12;

    /// Magic number: "TSRA" in ASCII (0x54535241)
    pub const MAGIC: u32 = 0x5453_5241;

    /// Current protocol version
    pub const VERSION: u8 = 0x01;

    /// Maximum payload size (64 KiB)
    ///
    /// The largest legitimate message is a KDC reply wrapping a ticket; both
    /// are a few hundred bytes.
    pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

    /// Create a new header with the specified opcode and empty payload.
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            reserved: 0,
            opcode: opcode.to_u16().to_be_bytes(),
            payload_size: [0; 4],
        }
    }

    /// Parse header from network bytes (zero-copy, safe)
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if:
    /// - Buffer is too short (< 12 bytes)
    /// - Magic number is invalid
    /// - Protocol version is unsupported
    /// - Payload size exceeds maximum
    ///
    /// The opcode is NOT validated here; unknown opcodes are rejected when
    /// the payload is decoded so that the error can name the raw value.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        if u32::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        let payload_size = u32::from_be_bytes(header.payload_size);
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize header to bytes
    #[must_use]
    #[allow(clippy::wrong_self_convention)]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Get the magic number
    #[must_use]
    pub fn magic(&self) -> u32 {
        u32::from_be_bytes(self.magic)
    }

    /// Get the protocol version
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Get the raw opcode
    #[must_use]
    pub fn opcode(&self) -> u16 {
        u16::from_be_bytes(self.opcode)
    }

    /// Get the opcode as an enum (if valid)
    #[must_use]
    pub fn opcode_enum(&self) -> Option<Opcode> {
        Opcode::from_u16(self.opcode())
    }

    /// Get the payload size
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }
}

// Manual Debug implementation (can't derive due to packed repr)
impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("magic", &format!("{:#010x}", self.magic()))
            .field("version", &self.version())
            .field("opcode", &format!("{:#06x}", self.opcode()))
            .field("payload_size", &self.payload_size())
            .finish_non_exhaustive()
    }
}

// Manual PartialEq implementation (can't derive due to packed repr)
impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for FrameHeader {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            (any::<u16>(), any::<u8>(), 0u32..=FrameHeader::MAX_PAYLOAD_SIZE)
                .prop_map(|(opcode, reserved, payload_size)| FrameHeader {
                    magic: FrameHeader::MAGIC.to_be_bytes(),
                    version: FrameHeader::VERSION,
                    reserved,
                    opcode: opcode.to_be_bytes(),
                    payload_size: payload_size.to_be_bytes(),
                })
                .boxed()
        }
    }

    #[test]
    fn header_size() {
        assert_eq!(std::mem::size_of::<FrameHeader>(), FrameHeader::SIZE);
    }

    #[test]
    fn new_header_layout() {
        let header = FrameHeader::new(Opcode::Ticket);
        assert_eq!(hex::encode(header.to_bytes()), "545352410100000300000000");
    }

    proptest! {
        #[test]
        fn header_round_trip(header in any::<FrameHeader>()) {
            let bytes = header.to_bytes();
            let parsed = FrameHeader::from_bytes(&bytes).expect("should parse");
            prop_assert_eq!(&header, parsed);
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..32)) {
            let _ = FrameHeader::from_bytes(&bytes);
        }
    }

    #[test]
    fn reject_short_buffer() {
        let result = FrameHeader::from_bytes(&[0u8; 7]);
        assert_eq!(result, Err(ProtocolError::FrameTooShort { expected: 12, actual: 7 }));
    }

    #[test]
    fn reject_invalid_magic() {
        let mut buf = FrameHeader::new(Opcode::AuthRequest).to_bytes();
        buf[0..4].copy_from_slice(&[0xFF; 4]);

        assert_eq!(FrameHeader::from_bytes(&buf), Err(ProtocolError::InvalidMagic));
    }

    #[test]
    fn reject_invalid_version() {
        let mut buf = FrameHeader::new(Opcode::AuthRequest).to_bytes();
        buf[4] = 0xFF;

        assert_eq!(FrameHeader::from_bytes(&buf), Err(ProtocolError::UnsupportedVersion(0xFF)));
    }

    #[test]
    fn reject_oversized_payload() {
        let mut buf = FrameHeader::new(Opcode::KdcReply).to_bytes();
        buf[8..12].copy_from_slice(&(FrameHeader::MAX_PAYLOAD_SIZE + 1).to_be_bytes());

        let result = FrameHeader::from_bytes(&buf);
        assert!(matches!(result, Err(ProtocolError::PayloadTooLarge { .. })));
    }
}
