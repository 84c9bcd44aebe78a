//! Error types for the Tessera wire format.
//!
//! All errors are structured, testable, and carry enough context to log a
//! useful diagnostic without echoing untrusted bytes back.

use thiserror::Error;

/// Errors raised while parsing or building frames and records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    // Frame parsing errors
    /// Buffer is shorter than the fixed header
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum size in bytes
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// Invalid magic number in frame header
    #[error("invalid magic number: expected 0x54535241 (\"TSRA\")")]
    InvalidMagic,

    /// Unsupported frame version
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Payload exceeds maximum allowed size
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Header claims more payload bytes than were supplied
    #[error("frame truncated: header claims {expected} payload bytes, but only {actual} available")]
    FrameTruncated {
        /// Expected payload size from header
        expected: usize,
        /// Actual bytes available
        actual: usize,
    },

    /// Unknown opcode in the frame header
    #[error("invalid opcode: {0:#06x}")]
    InvalidOpcode(u16),

    // Record errors
    /// Record version byte is not understood
    #[error("unsupported record version: {0}")]
    UnsupportedRecordVersion(u8),

    /// Record tag does not match the type being decoded
    #[error("unexpected record: expected tag {expected:#04x}, got {actual:#04x}")]
    UnexpectedRecord {
        /// Tag of the record type being decoded
        expected: u8,
        /// Tag found on the wire
        actual: u8,
    },

    /// Record ended before a field was complete
    #[error("record truncated while reading `{field}`")]
    RecordTruncated {
        /// Name of the field being read
        field: &'static str,
    },

    /// Bytes remained after the last field
    #[error("record has {0} trailing bytes")]
    TrailingBytes(usize),

    /// Field does not fit its length prefix or limit
    #[error("field `{field}` is {len} bytes, limit is {max}")]
    FieldTooLong {
        /// Name of the offending field
        field: &'static str,
        /// Actual length
        len: usize,
        /// Maximum permitted length
        max: usize,
    },

    /// Principal identity is empty, too long, or uses forbidden characters
    #[error("invalid principal identity: {0}")]
    InvalidPrincipal(String),
}

/// Convenient Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
