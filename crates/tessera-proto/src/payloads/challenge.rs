//! Nonce challenge and response, both sealed under the session key.

use bytes::BufMut;

use crate::{
    codec::{FieldReader, Record, RecordTag},
    errors::Result,
};

/// Step 4: responder challenge carrying N_B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    /// Responder nonce N_B
    pub nonce: u64,
}

impl Record for Challenge {
    const TAG: RecordTag = RecordTag::Challenge;

    fn encode_fields(&self, dst: &mut impl BufMut) -> Result<()> {
        dst.put_u64(self.nonce);
        Ok(())
    }

    fn decode_fields(fields: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self { nonce: fields.u64("nonce")? })
    }
}

/// Step 5: initiator answer carrying N_B − 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeResponse {
    /// The transformed nonce
    pub value: u64,
}

impl Record for ChallengeResponse {
    const TAG: RecordTag = RecordTag::ChallengeResponse;

    fn encode_fields(&self, dst: &mut impl BufMut) -> Result<()> {
        dst.put_u64(self.value);
        Ok(())
    }

    fn decode_fields(fields: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self { value: fields.u64("value")? })
    }
}
