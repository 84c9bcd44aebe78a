//! Property-based scenarios.
//!
//! Random seeds and nonces drive the in-memory exchange; the oracles must
//! hold for every combination.

use proptest::prelude::*;
use tessera_core::SessionError;
use tessera_harness::scenario::{
    Actor, Fault, Scenario,
    oracle::{self, all_of},
};
use tessera_proto::Opcode;

proptest! {
    #[test]
    fn honest_runs_always_authenticate(
        seed in any::<u64>(),
        initiator_nonce in any::<u64>(),
        responder_nonce in any::<u64>(),
    ) {
        let world = Scenario::new()
            .with_seed(seed)
            .with_initiator_nonce(initiator_nonce)
            .with_responder_nonce(responder_nonce)
            .oracle(oracle::mutual_authentication())
            .run();

        prop_assert!(world.is_ok(), "{:?}", world.err());
    }

    #[test]
    fn only_the_decremented_challenge_is_accepted(
        seed in any::<u64>(),
        responder_nonce in any::<u64>(),
        answer in any::<u64>(),
    ) {
        prop_assume!(answer != responder_nonce.wrapping_sub(1));

        let world = Scenario::new()
            .with_seed(seed)
            .with_responder_nonce(responder_nonce)
            .with_fault(Fault::WrongChallengeResponse(answer))
            .oracle(all_of(vec![
                oracle::failed_with(Actor::Responder, SessionError::ChallengeMismatch),
                oracle::no_session(),
            ]))
            .run();

        prop_assert!(world.is_ok(), "{:?}", world.err());
    }

    #[test]
    fn stale_replies_never_reach_the_responder(seed in any::<u64>(), nonce in any::<u64>()) {
        let world = Scenario::new()
            .with_seed(seed)
            .with_initiator_nonce(nonce)
            .with_fault(Fault::StaleKdcReply)
            .oracle(all_of(vec![oracle::never_sent(Opcode::Ticket), oracle::no_session()]))
            .run();

        prop_assert!(world.is_ok(), "{:?}", world.err());
    }
}
