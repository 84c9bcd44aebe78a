//! The three roles taking part in a scenario.

use std::fmt;

/// A participant in the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    /// Key distribution center
    Kdc,
    /// Principal opening the session (A)
    Initiator,
    /// Principal accepting the session (B)
    Responder,
}

impl Actor {
    /// Every actor, in protocol order
    pub const ALL: [Self; 3] = [Self::Initiator, Self::Kdc, Self::Responder];
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Kdc => "kdc",
            Self::Initiator => "initiator",
            Self::Responder => "responder",
        })
    }
}
