//! Actions shared by the three protocol roles.
//!
//! State machines never touch the network. They return a list of
//! [`SessionAction`]s and the driver executes them in order.

use tessera_proto::{Frame, KeyMaterial, PrincipalId, Record, Sealed};

use crate::{crypto::AeadChannel, error::SessionError};

/// Actions returned by the protocol state machines.
///
/// The driver (test harness or production node) executes these actions:
/// - `SendFrame`: serialize and write the frame to the current peer
/// - `Established`: record and persist the session key
/// - `Close`: shut the connection down, the run is over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send this frame to the peer
    SendFrame(Frame),

    /// Mutual authentication finished on this side
    Established {
        /// The other principal of the pair
        peer: PrincipalId,
        /// Agreed session key K_AB
        session_key: KeyMaterial,
    },

    /// Close the connection with this reason
    Close {
        /// Reason for closing the connection
        reason: String,
    },
}

/// Encode `record` and seal it under `key`.
pub(crate) fn seal_record<R: Record>(
    aead: &impl AeadChannel,
    key: &KeyMaterial,
    record: &R,
) -> Result<Sealed, SessionError> {
    let plaintext = zeroize::Zeroizing::new(record.to_bytes()?);
    Ok(Sealed::from(aead.encrypt(&plaintext, key.as_bytes())?))
}

/// Open `sealed` under `key` and decode the record inside.
pub(crate) fn open_record<R: Record>(
    aead: &impl AeadChannel,
    key: &KeyMaterial,
    sealed: &Sealed,
) -> Result<R, SessionError> {
    let plaintext = zeroize::Zeroizing::new(aead.decrypt(sealed.as_bytes(), key.as_bytes())?);
    Ok(R::from_bytes(&plaintext)?)
}
