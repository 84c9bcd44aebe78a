//! Scenario tests for the five-message exchange.
//!
//! Each test drives KDC, initiator and responder in memory with pinned
//! nonces and checks the outcome with an oracle.

use tessera_core::{InitiatorState, ResponderState, SessionError, SessionKeyStore};
use tessera_harness::scenario::{
    Actor, Fault, Scenario,
    oracle::{self, all_of},
};
use tessera_proto::{Opcode, PrincipalId};

fn id(name: &str) -> PrincipalId {
    PrincipalId::new(name).unwrap()
}

#[test]
fn honest_run_authenticates_both_sides() {
    let world = Scenario::new()
        .with_responder_nonce(42)
        .oracle(oracle::mutual_authentication())
        .run()
        .unwrap();

    // B challenged with 42 and accepted the answer 41
    assert_eq!(world.responder().challenge_nonce(), 42);
    assert_eq!(world.responder().peer(), Some(&id("A")));

    let stored = world.store().load(&id("B"), &id("A")).unwrap().unwrap();
    assert_eq!(Some(&stored), world.established(Actor::Responder));
    assert_eq!(stored.len(), 32);
}

#[test]
fn wrong_answer_is_rejected() {
    let world = Scenario::new()
        .with_responder_nonce(42)
        .with_fault(Fault::WrongChallengeResponse(40))
        .oracle(all_of(vec![
            oracle::failed_with(Actor::Responder, SessionError::ChallengeMismatch),
            oracle::no_session(),
        ]))
        .run()
        .unwrap();

    assert_eq!(world.responder().state(), ResponderState::Failed);
}

#[test]
fn echoed_challenge_is_rejected() {
    Scenario::new()
        .with_responder_nonce(42)
        .with_fault(Fault::WrongChallengeResponse(42))
        .oracle(oracle::failed_with(Actor::Responder, SessionError::ChallengeMismatch))
        .run()
        .unwrap();
}

#[test]
fn unknown_responder_gets_no_ticket() {
    let world = Scenario::new()
        .with_fault(Fault::UnknownResponder)
        .oracle(all_of(vec![
            oracle::failed_with(Actor::Kdc, SessionError::UnknownPrincipal(id("Z"))),
            oracle::never_sent(Opcode::KdcReply),
            oracle::never_sent(Opcode::Ticket),
            oracle::no_session(),
        ]))
        .run()
        .unwrap();

    // Still waiting; the driver's timeout or the closed socket ends the run
    assert_eq!(world.initiator().state(), InitiatorState::AwaitKdcReply);
}

#[test]
fn stale_nonce_aborts_before_ticket() {
    let world = Scenario::new()
        .with_fault(Fault::StaleKdcReply)
        .oracle(all_of(vec![
            oracle::failed_with(Actor::Initiator, SessionError::NonceMismatch),
            oracle::never_sent(Opcode::Ticket),
            oracle::no_session(),
        ]))
        .run()
        .unwrap();

    assert_eq!(world.initiator().state(), InitiatorState::Failed);
    assert!(world.initiator().session_key().is_none());
}

#[test]
fn tampered_reply_fails_decryption() {
    Scenario::new()
        .with_fault(Fault::TamperKdcReply)
        .oracle(all_of(vec![
            oracle::failed_with(Actor::Initiator, SessionError::DecryptionFailure),
            oracle::never_sent(Opcode::Ticket),
            oracle::no_session(),
        ]))
        .run()
        .unwrap();
}

#[test]
fn tampered_ticket_fails_decryption() {
    let world = Scenario::new()
        .with_fault(Fault::TamperTicket)
        .oracle(all_of(vec![
            oracle::failed_with(Actor::Responder, SessionError::DecryptionFailure),
            oracle::never_sent(Opcode::Challenge),
            oracle::no_session(),
        ]))
        .run()
        .unwrap();

    assert_eq!(world.responder().peer(), None);
}

#[test]
fn every_long_term_key_size_works() {
    for key_len in [16, 24, 32] {
        let result = Scenario::new()
            .with_key("A", vec![0x11; key_len])
            .with_key("B", vec![0x22; key_len])
            .oracle(oracle::mutual_authentication())
            .run();
        assert!(result.is_ok(), "{key_len}-byte keys: {:?}", result.err());
    }
}

#[test]
fn zero_challenge_wraps() {
    Scenario::new()
        .with_responder_nonce(0)
        .oracle(oracle::mutual_authentication())
        .run()
        .unwrap();
}

#[test]
fn answer_to_zero_challenge_is_max() {
    let world = Scenario::new()
        .with_responder_nonce(0)
        .with_fault(Fault::WrongChallengeResponse(u64::MAX))
        .oracle(Box::new(|world| match world.responder().state() {
            ResponderState::Authenticated => Ok(()),
            other => Err(format!("responder ended in {other:?}")),
        }))
        .run()
        .unwrap();

    assert_eq!(world.store().len().unwrap(), 1);
}
