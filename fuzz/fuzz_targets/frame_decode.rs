//! Untrusted bytes off the wire: frame header, then payload dispatch.
//!
//! Anything that decodes must re-encode to the same bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tessera_proto::{Frame, Payload};

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    let encoded = frame.to_vec().expect("decoded frame must re-encode");
    assert_eq!(&encoded[..], &data[..encoded.len()]);

    if let Ok(payload) = Payload::from_frame(&frame) {
        let again = payload.into_frame().expect("decoded payload must re-encode");
        assert_eq!(again.payload, frame.payload);
    }
});
