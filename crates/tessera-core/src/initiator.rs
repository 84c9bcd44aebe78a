//! Initiator side of the protocol.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ start ┌───────────────┐ KdcReply ┌────────────┐ Challenge ┌───────────────┐
//! │ Init │──────>│ AwaitKdcReply │─────────>│ TicketSent │──────────>│ Authenticated │
//! └──────┘       └───────────────┘          └────────────┘           └───────────────┘
//!                        │                        │
//!                        │ any error              │ any error
//!                        ↓                        ↓
//!                   ┌────────┐               ┌────────┐
//!                   │ Failed │               │ Failed │
//!                   └────────┘               └────────┘
//! ```
//!
//! The protocol's await-challenge and challenge-answered steps have no
//! states of their own. `TicketSent` is where the initiator waits for the
//! responder's challenge. Answering the challenge is the last message of the
//! protocol: there is no confirmation from the responder, so the initiator
//! goes straight to `Authenticated` in the same call that produces the
//! answer.
//!
//! # Security
//!
//! - **Freshness Binding**: the KDC reply must echo `N_A`. A stale or
//!   replayed reply fails with [`SessionError::NonceMismatch`] and no ticket
//!   is ever forwarded.
//! - **Opaque Ticket**: the ticket is relayed byte-for-byte; the initiator
//!   cannot read it.

use subtle::ConstantTimeEq;
use tessera_proto::{
    Frame, KeyMaterial, Payload, PrincipalId,
    payloads::{
        challenge::{Challenge, ChallengeResponse},
        kdc::{AuthRequest, KdcReplyBody},
    },
};

use crate::{
    crypto::{AeadChannel, validate_key_len},
    error::SessionError,
    session::{SessionAction, open_record, seal_record},
};

/// Initiator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorState {
    /// Nothing sent yet
    Init,
    /// Request sent, waiting for the KDC
    AwaitKdcReply,
    /// Ticket forwarded, waiting for the responder's challenge
    TicketSent,
    /// Challenge answered; session key established
    Authenticated,
    /// Run aborted
    Failed,
}

impl InitiatorState {
    /// State name for errors and logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::AwaitKdcReply => "AwaitKdcReply",
            Self::TicketSent => "TicketSent",
            Self::Authenticated => "Authenticated",
            Self::Failed => "Failed",
        }
    }
}

/// One protocol run from the requesting principal's side.
///
/// This is a pure state machine. The request nonce `N_A` is supplied at
/// construction so that drivers draw it from a
/// [`NonceSource`](crate::env::NonceSource) and tests can pin it.
#[derive(Debug, Clone)]
pub struct InitiatorSession {
    local: PrincipalId,
    peer: PrincipalId,
    long_term_key: KeyMaterial,
    nonce: u64,
    state: InitiatorState,
    session_key: Option<KeyMaterial>,
}

impl InitiatorSession {
    /// Create a run from `local` to `peer` in [`InitiatorState::Init`].
    #[must_use]
    pub fn new(
        local: PrincipalId,
        peer: PrincipalId,
        long_term_key: KeyMaterial,
        nonce: u64,
    ) -> Self {
        Self {
            local,
            peer,
            long_term_key,
            nonce,
            state: InitiatorState::Init,
            session_key: None,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> InitiatorState {
        self.state
    }

    /// Our identity
    #[must_use]
    pub fn local(&self) -> &PrincipalId {
        &self.local
    }

    /// The responder we want to talk to
    #[must_use]
    pub fn peer(&self) -> &PrincipalId {
        &self.peer
    }

    /// Request nonce `N_A`
    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Session key once the KDC reply has been accepted
    #[must_use]
    pub fn session_key(&self) -> Option<&KeyMaterial> {
        self.session_key.as_ref()
    }

    /// Step 1: build the request for the KDC.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] unless in `Init`.
    pub fn start(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        self.expect_state(InitiatorState::Init, "start")?;

        let request = AuthRequest {
            initiator: self.local.clone(),
            responder: self.peer.clone(),
            nonce: self.nonce,
        };
        let frame = self.guard(Payload::AuthRequest(request).into_frame().map_err(Into::into))?;

        self.state = InitiatorState::AwaitKdcReply;
        Ok(vec![SessionAction::SendFrame(frame)])
    }

    /// Dispatch an inbound frame according to the current state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnexpectedFrame`] if the opcode does not fit
    /// the state, or any error of the matching handler.
    pub fn handle_frame(
        &mut self,
        frame: &Frame,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        match self.state {
            InitiatorState::AwaitKdcReply => self.handle_kdc_reply(frame, aead),
            InitiatorState::TicketSent => self.handle_challenge(frame, aead),
            state => Err(SessionError::InvalidState { state: state.name(), operation: "receive" }),
        }
    }

    /// Step 2: accept the KDC reply and forward the ticket.
    ///
    /// Returns `[SendFrame(Ticket)]` addressed to the responder.
    ///
    /// # Errors
    ///
    /// - [`SessionError::DecryptionFailure`] if the reply is not sealed under
    ///   our long-term key
    /// - [`SessionError::NonceMismatch`] if the echoed nonce is not `N_A`
    /// - [`SessionError::PeerMismatch`] if the key was issued for another
    ///   responder
    /// - [`SessionError::MalformedMessage`] / `UnexpectedFrame` on bad input
    pub fn handle_kdc_reply(
        &mut self,
        frame: &Frame,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.expect_state(InitiatorState::AwaitKdcReply, "handle_kdc_reply")?;
        let result = self.accept_kdc_reply(frame, aead);
        self.guard(result)
    }

    /// Step 4: answer the responder's challenge with `N_B - 1`.
    ///
    /// Returns `[SendFrame(ChallengeResponse), Established, Close]`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::DecryptionFailure`] if the challenge is not sealed
    ///   under the session key
    /// - [`SessionError::MalformedMessage`] / `UnexpectedFrame` on bad input
    pub fn handle_challenge(
        &mut self,
        frame: &Frame,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.expect_state(InitiatorState::TicketSent, "handle_challenge")?;
        let result = self.answer_challenge(frame, aead);
        self.guard(result)
    }

    fn accept_kdc_reply(
        &mut self,
        frame: &Frame,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let Payload::KdcReply(sealed) = Payload::from_frame(frame)? else {
            return Err(self.unexpected(frame));
        };

        let reply: KdcReplyBody = open_record(aead, &self.long_term_key, &sealed)?;

        if !bool::from(reply.nonce.ct_eq(&self.nonce)) {
            return Err(SessionError::NonceMismatch);
        }
        if reply.responder != self.peer {
            return Err(SessionError::PeerMismatch {
                expected: self.peer.clone(),
                actual: reply.responder,
            });
        }
        validate_key_len(reply.session_key.as_bytes())?;

        let ticket = Payload::Ticket(reply.ticket).into_frame()?;
        self.session_key = Some(reply.session_key);
        self.state = InitiatorState::TicketSent;

        Ok(vec![SessionAction::SendFrame(ticket)])
    }

    fn answer_challenge(
        &mut self,
        frame: &Frame,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let Payload::Challenge(sealed) = Payload::from_frame(frame)? else {
            return Err(self.unexpected(frame));
        };
        let session_key = self.session_key.clone().ok_or(SessionError::InvalidState {
            state: self.state.name(),
            operation: "handle_challenge",
        })?;

        let challenge: Challenge = open_record(aead, &session_key, &sealed)?;
        let answer = ChallengeResponse { value: challenge.nonce.wrapping_sub(1) };
        let response = seal_record(aead, &session_key, &answer)?;
        let frame = Payload::ChallengeResponse(response).into_frame()?;

        self.state = InitiatorState::Authenticated;

        Ok(vec![
            SessionAction::SendFrame(frame),
            SessionAction::Established { peer: self.peer.clone(), session_key },
            SessionAction::Close { reason: "challenge answered".to_string() },
        ])
    }

    fn expect_state(
        &self,
        expected: InitiatorState,
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

    /// Move to `Failed` on error, dropping any key material.
    fn guard<T>(&mut self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if result.is_err() {
            self.state = InitiatorState::Failed;
            self.session_key = None;
        }
        result
    }
}
