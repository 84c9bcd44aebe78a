//! Error types for a single protocol run.
//!
//! Every failure here is local to one run on one connection. Callers log it
//! with the role, peer and step, then drop the run; the owning process keeps
//! serving other connections.

use std::{io, time::Duration};

use tessera_proto::{PrincipalId, ProtocolError};
use thiserror::Error;

use crate::{crypto::CryptoError, storage::StoreError};

/// Errors that abort a protocol run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Request names an identity absent from the registry
    #[error("unknown principal: {0}")]
    UnknownPrincipal(PrincipalId),

    /// KDC reply echoed a nonce other than the one we sent
    #[error("nonce mismatch in KDC reply")]
    NonceMismatch,

    /// KDC reply was issued for a different responder
    #[error("KDC reply names responder {actual}, expected {expected}")]
    PeerMismatch {
        /// Responder we asked for
        expected: PrincipalId,
        /// Responder named in the reply
        actual: PrincipalId,
    },

    /// Challenge answer is not `N_B - 1`
    #[error("challenge response mismatch")]
    ChallengeMismatch,

    /// Authentication tag check failed
    #[error("decryption failed")]
    DecryptionFailure,

    /// Structurally invalid frame or record
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] ProtocolError),

    /// Transport failure (reset, EOF, refused)
    #[error("connection error: {0}")]
    Connection(String),

    /// Unusable key material or configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Operation not allowed in the current state
    #[error("invalid state: cannot {operation} in {state}")]
    InvalidState {
        /// State name when the call was made
        state: &'static str,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Frame arrived that the current state does not expect
    #[error("unexpected frame {opcode:#06x} in {state}")]
    UnexpectedFrame {
        /// State name when the frame arrived
        state: &'static str,
        /// Raw opcode of the frame
        opcode: u16,
    },

    /// Peer did not answer within the step timeout
    #[error("timed out after {elapsed:?} waiting for {step}")]
    Timeout {
        /// Protocol step that was waiting
        step: &'static str,
        /// How long we waited
        elapsed: Duration,
    },

    /// Session key could not be persisted
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl SessionError {
    /// Returns true if the failure came from the network rather than the
    /// peer's messages.
    ///
    /// Transient failures may succeed in a fresh run. Protocol violations
    /// (bad tags, wrong nonces, malformed records) indicate a broken or
    /// malicious peer and are never transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout { .. })
    }
}

impl From<CryptoError> for SessionError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed => Self::DecryptionFailure,
            CryptoError::InvalidKeyLength(_) | CryptoError::EncryptionFailed => {
                Self::Configuration(err.to_string())
            },
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failures_are_transient() {
        assert!(SessionError::Connection("reset".to_string()).is_transient());
        assert!(
            SessionError::Timeout { step: "challenge", elapsed: Duration::from_secs(5) }
                .is_transient()
        );
    }

    #[test]
    fn protocol_violations_are_fatal() {
        assert!(!SessionError::NonceMismatch.is_transient());
        assert!(!SessionError::ChallengeMismatch.is_transient());
        assert!(!SessionError::DecryptionFailure.is_transient());
        assert!(!SessionError::MalformedMessage(ProtocolError::InvalidMagic).is_transient());
        assert!(
            !SessionError::UnexpectedFrame { state: "Listening", opcode: 0x0004 }.is_transient()
        );
    }

    #[test]
    fn crypto_errors_map_to_taxonomy() {
        assert_eq!(
            SessionError::from(CryptoError::DecryptionFailed),
            SessionError::DecryptionFailure
        );
        assert!(matches!(
            SessionError::from(CryptoError::InvalidKeyLength(15)),
            SessionError::Configuration(_)
        ));
    }

    #[test]
    fn eof_is_a_connection_error() {
        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "early eof");
        assert!(matches!(SessionError::from(err), SessionError::Connection(_)));
    }
}
