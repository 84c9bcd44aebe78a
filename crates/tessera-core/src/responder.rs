//! Responder side of the protocol.
//!
//! # State Machine
//!
//! ```text
//! ┌───────────┐ Ticket ┌────────────────┐ send_challenge ┌───────────────┐
//! │ Listening │───────>│ TicketReceived │───────────────>│ ChallengeSent │
//! └───────────┘        └────────────────┘                └───────────────┘
//!       │                      │                                 │
//!       │                      │                    N_B - 1      │  other value
//!       ↓                      ↓                  ┌──────────────┴──────┐
//!  ┌────────┐             ┌────────┐              ↓                     ↓
//!  │ Failed │             │ Failed │      ┌───────────────┐        ┌────────┐
//!  └────────┘             └────────┘      │ Authenticated │        │ Failed │
//!                                         └───────────────┘        └────────┘
//! ```
//!
//! One `ResponderSession` serves one inbound connection. A failed session is
//! dropped by the driver; the listener keeps accepting.
//!
//! # Security
//!
//! - **Proof of Possession**: the initiator is authenticated only if it can
//!   open the challenge and seal `N_B - 1` under the session key from the
//!   ticket.
//! - **No Persistence on Failure**: the session key is only surfaced in
//!   [`SessionAction::Established`] after the answer matches; on any error it
//!   is dropped.
//! - **Replay**: an old ticket is accepted again if replayed. The challenge
//!   only proves that the sender holds the key inside that ticket.

use subtle::ConstantTimeEq;
use tessera_proto::{
    Frame, KeyMaterial, Payload, PrincipalId,
    payloads::{
        challenge::{Challenge, ChallengeResponse},
        ticket::TicketBody,
    },
};

use crate::{
    crypto::{AeadChannel, validate_key_len},
    error::SessionError,
    session::{SessionAction, open_record, seal_record},
};

/// Responder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    /// Waiting for a ticket
    Listening,
    /// Ticket opened, challenge not yet sent
    TicketReceived,
    /// Challenge sent, waiting for `N_B - 1`
    ChallengeSent,
    /// Initiator proved possession of the session key
    Authenticated,
    /// Run aborted
    Failed,
}

impl ResponderState {
    /// State name for errors and logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Listening => "Listening",
            Self::TicketReceived => "TicketReceived",
            Self::ChallengeSent => "ChallengeSent",
            Self::Authenticated => "Authenticated",
            Self::Failed => "Failed",
        }
    }
}

/// One inbound protocol run on the receiving principal's side.
///
/// The challenge nonce `N_B` is supplied at construction.
#[derive(Debug, Clone)]
pub struct ResponderSession {
    local: PrincipalId,
    long_term_key: KeyMaterial,
    challenge_nonce: u64,
    state: ResponderState,
    peer: Option<PrincipalId>,
    session_key: Option<KeyMaterial>,
}

impl ResponderSession {
    /// Create a session for `local` in [`ResponderState::Listening`].
    #[must_use]
    pub fn new(local: PrincipalId, long_term_key: KeyMaterial, challenge_nonce: u64) -> Self {
        Self {
            local,
            long_term_key,
            challenge_nonce,
            state: ResponderState::Listening,
            peer: None,
            session_key: None,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ResponderState {
        self.state
    }

    /// Our identity
    #[must_use]
    pub fn local(&self) -> &PrincipalId {
        &self.local
    }

    /// Initiator named in the ticket, once received
    #[must_use]
    pub fn peer(&self) -> Option<&PrincipalId> {
        self.peer.as_ref()
    }

    /// Challenge nonce `N_B`
    #[must_use]
    pub fn challenge_nonce(&self) -> u64 {
        self.challenge_nonce
    }

    /// Dispatch an inbound frame according to the current state.
    ///
    /// A ticket is answered with the challenge in the same call.
    ///
    /// # Errors
    ///
    /// See [`ResponderSession::handle_ticket`] and
    /// [`ResponderSession::handle_challenge_response`].
    pub fn handle_frame(
        &mut self,
        frame: &Frame,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        match self.state {
            ResponderState::Listening => {
                let mut actions = self.handle_ticket(frame, aead)?;
                actions.extend(self.send_challenge(aead)?);
                Ok(actions)
            },
            ResponderState::ChallengeSent => self.handle_challenge_response(frame, aead),
            state => Err(SessionError::InvalidState { state: state.name(), operation: "receive" }),
        }
    }

    /// Step 3: open the ticket under our long-term key.
    ///
    /// Records the session key and initiator identity. Returns no actions.
    ///
    /// # Errors
    ///
    /// - [`SessionError::DecryptionFailure`] if the ticket was not sealed for
    ///   us or was modified in transit
    /// - [`SessionError::MalformedMessage`] / `UnexpectedFrame` on bad input
    pub fn handle_ticket(
        &mut self,
        frame: &Frame,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.expect_state(ResponderState::Listening, "handle_ticket")?;
        let result = self.open_ticket(frame, aead);
        self.guard(result)
    }

    /// Step 4: seal `N_B` under the session key.
    ///
    /// Returns `[SendFrame(Challenge)]`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] unless a ticket was received.
    pub fn send_challenge(
        &mut self,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.expect_state(ResponderState::TicketReceived, "send_challenge")?;
        let result = self.seal_challenge(aead);
        self.guard(result)
    }

    /// Step 5: check the initiator's answer.
    ///
    /// Returns `[Established, Close]` if the answer is `N_B - 1`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ChallengeMismatch`] for any other value
    /// - [`SessionError::DecryptionFailure`] if the answer is not sealed
    ///   under the session key
    /// - [`SessionError::MalformedMessage`] / `UnexpectedFrame` on bad input
    pub fn handle_challenge_response(
        &mut self,
        frame: &Frame,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.expect_state(ResponderState::ChallengeSent, "handle_challenge_response")?;
        let result = self.verify_response(frame, aead);
        self.guard(result)
    }

    fn open_ticket(
        &mut self,
        frame: &Frame,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let Payload::Ticket(sealed) = Payload::from_frame(frame)? else {
            return Err(self.unexpected(frame));
        };

        let ticket: TicketBody = open_record(aead, &self.long_term_key, &sealed)?;
        validate_key_len(ticket.session_key.as_bytes())?;

        self.peer = Some(ticket.initiator);
        self.session_key = Some(ticket.session_key);
        self.state = ResponderState::TicketReceived;

        Ok(Vec::new())
    }

    fn seal_challenge(
        &mut self,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let key = self.session_key()?;
        let sealed = seal_record(aead, key, &Challenge { nonce: self.challenge_nonce })?;
        let frame = Payload::Challenge(sealed).into_frame()?;

        self.state = ResponderState::ChallengeSent;
        Ok(vec![SessionAction::SendFrame(frame)])
    }

    fn verify_response(
        &mut self,
        frame: &Frame,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let Payload::ChallengeResponse(sealed) = Payload::from_frame(frame)? else {
            return Err(self.unexpected(frame));
        };

        let response: ChallengeResponse = open_record(aead, self.session_key()?, &sealed)?;
        let expected = self.challenge_nonce.wrapping_sub(1);

        if !bool::from(response.value.ct_eq(&expected)) {
            return Err(SessionError::ChallengeMismatch);
        }

        let (Some(peer), Some(session_key)) = (self.peer.clone(), self.session_key.clone()) else {
            return Err(SessionError::InvalidState {
                state: self.state.name(),
                operation: "handle_challenge_response",
            });
        };
        self.state = ResponderState::Authenticated;

        Ok(vec![
            SessionAction::Established { peer, session_key },
            SessionAction::Close { reason: "initiator authenticated".to_string() },
        ])
    }

    fn session_key(&self) -> Result<&KeyMaterial, SessionError> {
        self.session_key.as_ref().ok_or(SessionError::InvalidState {
            state: self.state.name(),
            operation: "use session key",
        })
    }

    fn expect_state(
        &self,
        expected: ResponderState,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState { state: self.state.name(), operation })
        }
    }

    fn unexpected(&self, frame: &Frame) -> SessionError {
        SessionError::UnexpectedFrame { state: self.state.name(), opcode: frame.header.opcode() }
    }

    /// Move to `Failed` on error, discarding the session key.
    fn guard<T>(&mut self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if result.is_err() {
            self.state = ResponderState::Failed;
            self.session_key = None;
        }
        result
    }
}
