//! Decrypted plaintexts are attacker-influenced too (a principal can seal
//! anything under its own key). Every record decoder must reject garbage
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tessera_proto::{
    Record,
    payloads::{
        challenge::{Challenge, ChallengeResponse},
        kdc::{AuthRequest, KdcReplyBody},
        ticket::TicketBody,
    },
};

fn check<R: Record + PartialEq + std::fmt::Debug>(data: &[u8]) {
    if let Ok(record) = R::from_bytes(data) {
        let encoded = record.to_bytes().expect("decoded record must re-encode");
        assert_eq!(encoded, data);
    }
}

fuzz_target!(|data: &[u8]| {
    check::<AuthRequest>(data);
    check::<KdcReplyBody>(data);
    check::<TicketBody>(data);
    check::<Challenge>(data);
    check::<ChallengeResponse>(data);
});
