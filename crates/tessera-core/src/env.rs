//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples protocol logic from system resources
//! (time and randomness). This enables:
//!
//! - Deterministic Simulation: Turmoil provides a virtual clock and the
//!   harness seeds a ChaCha20 RNG, so a failing run replays exactly.
//!
//! - Production Runtime: the node uses the system clock and the OS CSPRNG
//!   without any change to the protocol logic.
//!
//! # Design Philosophy: "The Hollow Shell"
//!
//! Protocol state machines in `tessera-core` are pure logic. They:
//!
//! - MUST NOT call `std::time::Instant::now()` or `tokio::time::sleep()`
//! - MUST NOT use `rand::thread_rng()` or system entropy directly
//! - receive nonces and key bytes that were drawn from an `Environment`
//!
//! The environment is implemented twice:
//!
//! 1. `SimEnv` (tessera-harness): virtual time and seeded RNG
//! 2. `SystemEnv` (tessera-node): real clock and OS entropy
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Determinism: Given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: Implementations must not share global state

use std::time::Duration;

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Implementations
///
/// - Simulation (`tessera-harness::SimEnv`): Virtual time that can be advanced
///   instantly, seeded RNG for reproducibility.
///
/// - Production (`tessera-node::SystemEnv`): Real system clock,
///   crypto-secure RNG from OS entropy pool.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// 1. Time monotonicity: `now()` never goes backwards
/// 2. RNG quality: `random_bytes()` uses cryptographically secure entropy in
///    production. Session keys, nonces and AEAD nonces all come from here.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Type representing a point in time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: This method MUST return values that never decrease
    ///   within a single execution context.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code uses this, to bound how long a protocol step may wait
    /// for the peer. State machines never sleep.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Security
    ///
    /// Production implementations MUST draw from the OS entropy pool.
    /// Simulation implementations MUST be seeded so runs are reproducible.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Source of protocol nonces (`N_A`, `N_B`).
///
/// Nonces are full-width unsigned 64-bit values drawn from a cryptographically
/// secure generator. No nonce is ever derived from earlier protocol state, so
/// a value is never knowingly reused across runs.
pub trait NonceSource {
    /// Draw the next nonce.
    fn next_nonce(&self) -> u64;
}

impl<E: Environment> NonceSource for E {
    fn next_nonce(&self) -> u64 {
        self.random_u64()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::Environment;

    /// Seeded environment for unit tests that never sleep.
    #[derive(Clone)]
    pub(crate) struct TestEnv {
        rng: Arc<Mutex<ChaCha20Rng>>,
    }

    impl TestEnv {
        pub(crate) fn with_seed(seed: u64) -> Self {
            Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
        }
    }

    impl Environment for TestEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            Instant::now()
        }

        async fn sleep(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            self.rng.lock().unwrap().fill_bytes(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{NonceSource, testing::TestEnv};

    #[test]
    fn nonces_do_not_collide() {
        let env = TestEnv::with_seed(7);
        let nonces: HashSet<u64> = (0..10_000).map(|_| env.next_nonce()).collect();

        assert_eq!(nonces.len(), 10_000);
    }

    #[test]
    fn same_seed_same_nonces() {
        let a = TestEnv::with_seed(99);
        let b = TestEnv::with_seed(99);

        for _ in 0..16 {
            assert_eq!(a.next_nonce(), b.next_nonce());
        }
    }
}
