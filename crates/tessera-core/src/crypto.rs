//! Authenticated encryption for tickets, KDC replies and the nonce exchange.
//!
//! Every secret that crosses the wire is sealed with AES-GCM. The key length
//! selects the variant: 16, 24 or 32 bytes for AES-128, AES-192 or AES-256.
//!
//! Ciphertext layout:
//!
//! ```text
//! ┌──────────────┬─────────────────────┬──────────┐
//! │ nonce (12 B) │ ciphertext (len(m)) │ tag (16) │
//! └──────────────┴─────────────────────┴──────────┘
//! ```
//!
//! # Security
//!
//! - **Fresh Nonces**: a new random 96-bit nonce is drawn from the
//!   [`Environment`] for every call to [`AeadChannel::encrypt`], so sealing
//!   the same plaintext twice yields different ciphertexts.
//!
//! - **Fail Closed**: decryption either returns the whole plaintext or
//!   [`CryptoError::DecryptionFailed`]. Truncated input, a wrong key and a
//!   flipped bit are indistinguishable to the caller.

use aes_gcm::{
    Aes128Gcm, Aes256Gcm, AesGcm,
    aead::{Aead, AeadCore, KeyInit, consts::U12, generic_array::GenericArray},
    aes::Aes192,
};
use thiserror::Error;

use crate::env::Environment;

/// AES-192 in GCM mode with the standard 96-bit nonce
type Aes192Gcm = AesGcm<Aes192, U12>;

/// Size of the random nonce prefixed to every ciphertext
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Length of session keys issued by the KDC (AES-256)
pub const SESSION_KEY_LEN: usize = 32;

/// Key lengths accepted by [`AesGcmChannel`]
pub const VALID_KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// Errors from sealing and opening.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Key is not 16, 24 or 32 bytes
    #[error("invalid key length: {0} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength(usize),

    /// Tag check failed, input truncated, or wrong key
    #[error("decryption failed")]
    DecryptionFailed,

    /// Cipher refused to encrypt (plaintext too long)
    #[error("encryption failed")]
    EncryptionFailed,
}

/// Check that `key` has an accepted AES key length.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyLength`] otherwise.
pub fn validate_key_len(key: &[u8]) -> Result<(), CryptoError> {
    if VALID_KEY_LENGTHS.contains(&key.len()) {
        Ok(())
    } else {
        Err(CryptoError::InvalidKeyLength(key.len()))
    }
}

/// AEAD capability used by every protocol role.
///
/// Implementations must be non-deterministic on encrypt and fail closed on
/// decrypt. Key lengths are checked on every call.
pub trait AeadChannel: Send + Sync {
    /// Seal `plaintext` under `key`.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::InvalidKeyLength`] for an unsupported key size
    /// - [`CryptoError::EncryptionFailed`] if the cipher rejects the input
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Open `ciphertext` under `key`.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::InvalidKeyLength`] for an unsupported key size
    /// - [`CryptoError::DecryptionFailed`] on any integrity failure
    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// AES-GCM channel drawing its nonces from an [`Environment`].
#[derive(Clone)]
pub struct AesGcmChannel<E> {
    env: E,
}

impl<E: Environment> AesGcmChannel<E> {
    /// Create a channel using `env` as its nonce source.
    pub fn new(env: E) -> Self {
        Self { env }
    }
}

impl<E> std::fmt::Debug for AesGcmChannel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmChannel").finish_non_exhaustive()
    }
}

impl<E: Environment> AeadChannel for AesGcmChannel<E> {
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce = [0u8; NONCE_SIZE];
        self.env.random_bytes(&mut nonce);

        let sealed = match key.len() {
            16 => seal::<Aes128Gcm>(key, &nonce, plaintext),
            24 => seal::<Aes192Gcm>(key, &nonce, plaintext),
            32 => seal::<Aes256Gcm>(key, &nonce, plaintext),
            len => Err(CryptoError::InvalidKeyLength(len)),
        }?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        validate_key_len(key)?;

        if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }
        let (nonce, body) = ciphertext.split_at(NONCE_SIZE);

        match key.len() {
            16 => open::<Aes128Gcm>(key, nonce, body),
            24 => open::<Aes192Gcm>(key, nonce, body),
            _ => open::<Aes256Gcm>(key, nonce, body),
        }
    }
}

fn seal<C>(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: Aead + AeadCore<NonceSize = U12> + KeyInit,
{
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
    cipher
        .encrypt(GenericArray::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

fn open<C>(key: &[u8], nonce: &[u8], body: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: Aead + AeadCore<NonceSize = U12> + KeyInit,
{
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
    cipher.decrypt(GenericArray::from_slice(nonce), body).map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::env::testing::TestEnv;

    fn channel() -> AesGcmChannel<TestEnv> {
        AesGcmChannel::new(TestEnv::with_seed(1))
    }

    proptest! {
        #[test]
        fn round_trip_all_key_sizes(
            plaintext in prop::collection::vec(any::<u8>(), 0..256),
            key_len in prop::sample::select(VALID_KEY_LENGTHS.to_vec()),
            key_byte in any::<u8>(),
        ) {
            let aead = channel();
            let key = vec![key_byte; key_len];

            let sealed = aead.encrypt(&plaintext, &key).unwrap();
            prop_assert_eq!(sealed.len(), NONCE_SIZE + plaintext.len() + TAG_SIZE);
            prop_assert_eq!(aead.decrypt(&sealed, &key).unwrap(), plaintext);
        }

        #[test]
        fn any_bit_flip_is_rejected(
            plaintext in prop::collection::vec(any::<u8>(), 1..64),
            bit in any::<prop::sample::Index>(),
        ) {
            let aead = channel();
            let key = [0x42u8; 32];

            let mut sealed = aead.encrypt(&plaintext, &key).unwrap();
            let bit = bit.index(sealed.len() * 8);
            sealed[bit / 8] ^= 1 << (bit % 8);

            prop_assert_eq!(aead.decrypt(&sealed, &key), Err(CryptoError::DecryptionFailed));
        }
    }

    #[test]
    fn encryption_is_randomized() {
        let aead = channel();
        let key = [7u8; 16];

        let a = aead.encrypt(b"same", &key).unwrap();
        let b = aead.encrypt(b"same", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_closed() {
        let aead = channel();
        let sealed = aead.encrypt(b"secret", &[1u8; 32]).unwrap();

        assert_eq!(aead.decrypt(&sealed, &[2u8; 32]), Err(CryptoError::DecryptionFailed));
        assert_eq!(aead.decrypt(&sealed, &[1u8; 16]), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn truncated_ciphertext_fails_closed() {
        let aead = channel();
        let sealed = aead.encrypt(b"", &[1u8; 24]).unwrap();

        for cut in 0..sealed.len() {
            let result = aead.decrypt(&sealed[..cut], &[1u8; 24]);
            assert_eq!(result, Err(CryptoError::DecryptionFailed));
        }
    }

    #[test]
    fn invalid_key_length_rejected_on_both_paths() {
        let aead = channel();

        assert_eq!(aead.encrypt(b"x", &[0u8; 15]), Err(CryptoError::InvalidKeyLength(15)));
        assert_eq!(aead.decrypt(&[0u8; 64], &[0u8; 33]), Err(CryptoError::InvalidKeyLength(33)));
    }
}
