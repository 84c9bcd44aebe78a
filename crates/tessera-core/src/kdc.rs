//! Key distribution center.
//!
//! The KDC answers exactly one request type. For `AuthRequest { A, B, N_A }`
//! it draws a fresh session key `K_AB` and replies with
//!
//! ```text
//! E(K_A, { K_AB, B, N_A, E(K_B, { K_AB, A }) })
//! ```
//!
//! The inner ciphertext is the ticket; the initiator relays it to `B`
//! without being able to read it.
//!
//! # Invariants
//!
//! - **Stateless**: nothing is retained between requests. Concurrent requests
//!   only share the read-only registry.
//! - **Fresh Keys**: every reply carries a session key drawn from the
//!   environment's CSPRNG, never derived from a nonce.
//! - **Silent Rejection**: requests naming an unknown identity produce an
//!   error and no reply.

use std::sync::Arc;

use tessera_proto::{
    Frame, KeyMaterial, Payload, PrincipalId, Sealed,
    payloads::{
        kdc::{AuthRequest, KdcReplyBody},
        ticket::TicketBody,
    },
};

use crate::{
    crypto::{AeadChannel, SESSION_KEY_LEN},
    env::Environment,
    error::SessionError,
    registry::PrincipalRegistry,
    session::{SessionAction, seal_record},
};

/// Stateless KDC over a shared registry.
#[derive(Debug, Clone)]
pub struct KdcService {
    registry: Arc<PrincipalRegistry>,
}

impl KdcService {
    /// Create a KDC serving the principals in `registry`.
    #[must_use]
    pub fn new(registry: Arc<PrincipalRegistry>) -> Self {
        Self { registry }
    }

    /// Registry this KDC serves
    #[must_use]
    pub fn registry(&self) -> &PrincipalRegistry {
        &self.registry
    }

    /// Issue a session key and ticket for `request`.
    ///
    /// Returns the reply ciphertext sealed under the initiator's long-term
    /// key.
    ///
    /// # Errors
    ///
    /// - [`SessionError::UnknownPrincipal`] if either identity is not
    ///   registered (checked before any key is generated)
    /// - [`SessionError::Configuration`] if sealing fails
    pub fn issue(
        &self,
        request: &AuthRequest,
        env: &impl Environment,
        aead: &impl AeadChannel,
    ) -> Result<Sealed, SessionError> {
        let initiator_key = self.lookup(&request.initiator)?;
        let responder_key = self.lookup(&request.responder)?;

        let mut key_bytes = vec![0u8; SESSION_KEY_LEN];
        env.random_bytes(&mut key_bytes);
        let session_key = KeyMaterial::new(key_bytes);

        let ticket = seal_record(
            aead,
            responder_key,
            &TicketBody { session_key: session_key.clone(), initiator: request.initiator.clone() },
        )?;

        let reply = KdcReplyBody {
            session_key,
            responder: request.responder.clone(),
            nonce: request.nonce,
            ticket,
        };

        seal_record(aead, initiator_key, &reply)
    }

    /// Handle one inbound frame.
    ///
    /// Returns `[SendFrame(KdcReply), Close]` on success.
    ///
    /// # Errors
    ///
    /// - [`SessionError::UnexpectedFrame`] for anything but `AuthRequest`
    /// - [`SessionError::MalformedMessage`] if the request does not parse
    /// - any error from [`KdcService::issue`]
    pub fn handle_frame(
        &self,
        frame: &Frame,
        env: &impl Environment,
        aead: &impl AeadChannel,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let Payload::AuthRequest(request) = Payload::from_frame(frame)? else {
            return Err(SessionError::UnexpectedFrame {
                state: "Serving",
                opcode: frame.header.opcode(),
            });
        };

        let reply = self.issue(&request, env, aead)?;

        tracing::debug!(
            initiator = %request.initiator,
            responder = %request.responder,
            "issued session key"
        );

        Ok(vec![
            SessionAction::SendFrame(Payload::KdcReply(reply).into_frame()?),
            SessionAction::Close { reason: "reply sent".to_string() },
        ])
    }

    fn lookup(&self, id: &PrincipalId) -> Result<&KeyMaterial, SessionError> {
        self.registry.key(id).ok_or_else(|| SessionError::UnknownPrincipal(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use tessera_proto::Record;

    use super::*;
    use crate::{crypto::AesGcmChannel, env::testing::TestEnv, session::open_record};

    fn id(name: &str) -> PrincipalId {
        PrincipalId::new(name).unwrap()
    }

    fn setup() -> (KdcService, TestEnv, AesGcmChannel<TestEnv>) {
        let registry = PrincipalRegistry::new([
            (id("A"), KeyMaterial::new(vec![0xA0; 32])),
            (id("B"), KeyMaterial::new(vec![0xB0; 24])),
        ])
        .unwrap();
        let env = TestEnv::with_seed(3);
        (KdcService::new(Arc::new(registry)), env.clone(), AesGcmChannel::new(env))
    }

    fn request(responder: &str, nonce: u64) -> AuthRequest {
        AuthRequest { initiator: id("A"), responder: id(responder), nonce }
    }

    #[test]
    fn reply_binds_nonce_and_carries_ticket_for_responder() {
        let (kdc, env, aead) = setup();
        let sealed = kdc.issue(&request("B", 77), &env, &aead).unwrap();

        let a_key = KeyMaterial::new(vec![0xA0; 32]);
        let reply: KdcReplyBody = open_record(&aead, &a_key, &sealed).unwrap();
        assert_eq!(reply.nonce, 77);
        assert_eq!(reply.responder, id("B"));
        assert_eq!(reply.session_key.len(), SESSION_KEY_LEN);

        let b_key = KeyMaterial::new(vec![0xB0; 24]);
        let ticket: TicketBody = open_record(&aead, &b_key, &reply.ticket).unwrap();
        assert_eq!(ticket.session_key, reply.session_key);
        assert_eq!(ticket.initiator, id("A"));
    }

    #[test]
    fn reply_unreadable_under_other_keys() {
        let (kdc, env, aead) = setup();
        let sealed = kdc.issue(&request("B", 1), &env, &aead).unwrap();

        let b_key = KeyMaterial::new(vec![0xB0; 24]);
        let result: Result<KdcReplyBody, _> = open_record(&aead, &b_key, &sealed);
        assert_eq!(result.unwrap_err(), SessionError::DecryptionFailure);
    }

    #[test]
    fn unknown_responder_rejected() {
        let (kdc, env, aead) = setup();

        let result = kdc.issue(&request("Z", 1), &env, &aead);
        assert_eq!(result, Err(SessionError::UnknownPrincipal(id("Z"))));
    }

    #[test]
    fn each_request_gets_a_fresh_key() {
        let (kdc, env, aead) = setup();
        let a_key = KeyMaterial::new(vec![0xA0; 32]);

        let first: KdcReplyBody =
            open_record(&aead, &a_key, &kdc.issue(&request("B", 1), &env, &aead).unwrap())
                .unwrap();
        let second: KdcReplyBody =
            open_record(&aead, &a_key, &kdc.issue(&request("B", 1), &env, &aead).unwrap())
                .unwrap();

        assert_ne!(first.session_key, second.session_key);
    }

    #[test]
    fn frame_handling_replies_then_closes() {
        let (kdc, env, aead) = setup();
        let frame = Payload::AuthRequest(request("B", 5)).into_frame().unwrap();

        let actions = kdc.handle_frame(&frame, &env, &aead).unwrap();
        assert!(matches!(&actions[..], [SessionAction::SendFrame(_), SessionAction::Close { .. }]));
    }

    #[test]
    fn non_request_frames_rejected() {
        let (kdc, env, aead) = setup();
        let frame = Payload::Ticket(Sealed::from(vec![0; 40])).into_frame().unwrap();

        let result = kdc.handle_frame(&frame, &env, &aead);
        assert!(matches!(result, Err(SessionError::UnexpectedFrame { opcode: 0x0003, .. })));
    }

    #[test]
    fn garbage_request_is_malformed() {
        let (kdc, env, aead) = setup();
        let mut bytes = request("B", 5).to_bytes().unwrap();
        bytes.truncate(bytes.len() - 3);
        let frame = Frame::new(
            tessera_proto::FrameHeader::new(tessera_proto::Opcode::AuthRequest),
            bytes,
        );

        let result = kdc.handle_frame(&frame, &env, &aead);
        assert!(matches!(result, Err(SessionError::MalformedMessage(_))));
    }
}
