//! World state after a scenario run.
//!
//! The world owns both principal state machines, every frame put on the
//! (imaginary) wire, the first error each actor raised, and the key store
//! that successful runs persist into. Oracles only ever see it immutably.

use std::collections::HashMap;

use tessera_core::{
    InitiatorSession, InitiatorState, MemoryKeyStore, ResponderSession, ResponderState,
    SessionError, SessionKeyStore,
};
use tessera_proto::{Frame, KeyMaterial, Opcode};

use crate::scenario::Actor;

/// Snapshot of one scenario run.
pub struct World {
    initiator: InitiatorSession,
    responder: ResponderSession,
    frames: Vec<(Actor, Frame)>,
    errors: HashMap<Actor, SessionError>,
    established: HashMap<Actor, KeyMaterial>,
    store: MemoryKeyStore,
}

impl World {
    pub(crate) fn new(initiator: InitiatorSession, responder: ResponderSession) -> Self {
        Self {
            initiator,
            responder,
            frames: Vec::new(),
            errors: HashMap::new(),
            established: HashMap::new(),
            store: MemoryKeyStore::new(),
        }
    }

    pub(crate) fn initiator_mut(&mut self) -> &mut InitiatorSession {
        &mut self.initiator
    }

    pub(crate) fn responder_mut(&mut self) -> &mut ResponderSession {
        &mut self.responder
    }

    pub(crate) fn record_frame(&mut self, sender: Actor, frame: Frame) {
        self.frames.push((sender, frame));
    }

    pub(crate) fn record_error(&mut self, actor: Actor, error: SessionError) {
        self.errors.entry(actor).or_insert(error);
    }

    /// Record a completed run for `actor` and persist its key, the way the
    /// node runtime does.
    pub(crate) fn record_established(
        &mut self,
        actor: Actor,
        key: KeyMaterial,
    ) -> Result<(), String> {
        let (local, peer) = match actor {
            Actor::Initiator => (self.initiator.local(), self.initiator.peer()),
            Actor::Responder => {
                let peer = self.responder.peer().ok_or("responder established without a peer")?;
                (self.responder.local(), peer)
            },
            Actor::Kdc => return Err("the KDC never establishes a session".to_string()),
        };
        self.store.persist(local, peer, &key).map_err(|err| err.to_string())?;
        self.established.insert(actor, key);
        Ok(())
    }

    /// Initiator state machine
    pub fn initiator(&self) -> &InitiatorSession {
        &self.initiator
    }

    /// Responder state machine
    pub fn responder(&self) -> &ResponderSession {
        &self.responder
    }

    /// Every frame sent, in order, with its sender
    pub fn frames(&self) -> &[(Actor, Frame)] {
        &self.frames
    }

    /// Number of frames `actor` sent
    pub fn frames_sent(&self, actor: Actor) -> usize {
        self.frames.iter().filter(|(sender, _)| *sender == actor).count()
    }

    /// True if a frame with `opcode` was ever sent
    pub fn sent(&self, opcode: Opcode) -> bool {
        self.frames.iter().any(|(_, frame)| frame.header.opcode_enum() == Some(opcode))
    }

    /// First error `actor` raised, if any
    pub fn error(&self, actor: Actor) -> Option<&SessionError> {
        self.errors.get(&actor)
    }

    /// Key `actor` reported as established, if any
    pub fn established(&self, actor: Actor) -> Option<&KeyMaterial> {
        self.established.get(&actor)
    }

    /// Store receiving established keys
    pub fn store(&self) -> &MemoryKeyStore {
        &self.store
    }

    /// Both principals completed the run.
    pub fn both_authenticated(&self) -> bool {
        self.initiator.state() == InitiatorState::Authenticated
            && self.responder.state() == ResponderState::Authenticated
    }

    /// Both principals hold the same session key.
    pub fn keys_agree(&self) -> bool {
        match (self.established(Actor::Initiator), self.established(Actor::Responder)) {
            (Some(initiator), Some(responder)) => initiator == responder,
            _ => false,
        }
    }
}
