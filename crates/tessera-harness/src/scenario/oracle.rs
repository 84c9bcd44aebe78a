//! Oracle functions for scenario verification.
//!
//! Oracle functions run at the end of scenarios to verify global consistency.
//! They receive the entire world and check invariants over it.

use tessera_core::{InitiatorState, ResponderState, SessionError, SessionKeyStore};
use tessera_proto::Opcode;

use crate::scenario::{Actor, World};

/// Oracle function type.
///
/// Receives immutable reference to world state and returns:
/// - `Ok(())` if all invariants hold
/// - `Err(message)` if verification fails
pub type OracleFn = Box<dyn FnOnce(&World) -> Result<(), String>>;

/// Both principals authenticated and hold the same key, and that key is the
/// one persisted for the pair.
pub fn mutual_authentication() -> OracleFn {
    Box::new(|world| {
        if !world.both_authenticated() {
            return Err(format!(
                "expected both authenticated, got initiator {:?} and responder {:?}",
                world.initiator().state(),
                world.responder().state()
            ));
        }
        if !world.keys_agree() {
            return Err("initiator and responder hold different keys".to_string());
        }

        let initiator = world.initiator();
        let stored = world
            .store()
            .load(initiator.local(), initiator.peer())
            .map_err(|err| err.to_string())?;
        if stored.as_ref() != world.established(Actor::Initiator) {
            return Err("persisted key differs from the agreed key".to_string());
        }
        Ok(())
    })
}

/// `actor` failed with exactly `expected`.
pub fn failed_with(actor: Actor, expected: SessionError) -> OracleFn {
    Box::new(move |world| match world.error(actor) {
        Some(error) if *error == expected => Ok(()),
        Some(error) => Err(format!("{actor} failed with {error:?}, expected {expected:?}")),
        None => Err(format!("{actor} did not fail, expected {expected:?}")),
    })
}

/// Nothing was persisted and neither principal authenticated.
pub fn no_session() -> OracleFn {
    Box::new(|world| {
        let stored = world.store().len().map_err(|err| err.to_string())?;
        if stored != 0 {
            return Err(format!("{stored} keys persisted by a failed run"));
        }
        if world.initiator().state() == InitiatorState::Authenticated
            || world.responder().state() == ResponderState::Authenticated
        {
            return Err("a principal authenticated in a failed run".to_string());
        }
        Ok(())
    })
}

/// No frame with `opcode` was ever sent.
pub fn never_sent(opcode: Opcode) -> OracleFn {
    Box::new(move |world| {
        if world.sent(opcode) {
            Err(format!("{} was sent", opcode.name()))
        } else {
            Ok(())
        }
    })
}

/// Combine multiple oracles into one.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world| {
        for oracle in oracles {
            oracle(world)?;
        }
        Ok(())
    })
}
