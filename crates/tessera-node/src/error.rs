//! Node-level errors.

use tessera_core::{RegistryError, SessionError, StoreError};
use thiserror::Error;

/// Errors raised by the node runtime.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Name is not present in the principal table
    #[error("unknown principal: {0}")]
    UnknownPrincipal(String),

    /// An initiator tried to open a session with itself
    #[error("cannot open a session with ourselves")]
    SelfSession,

    /// A protocol run failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Listener or filesystem I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RegistryError> for NodeError {
    fn from(err: RegistryError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<StoreError> for NodeError {
    fn from(err: StoreError) -> Self {
        Self::Session(SessionError::Storage(err))
    }
}
