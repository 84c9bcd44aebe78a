//! Production environment: system clock and OS entropy.

use std::time::{Duration, Instant};

use rand::{RngCore, rngs::OsRng};
use tessera_core::Environment;

/// [`Environment`] backed by the real monotonic clock, tokio timers and the
/// operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        OsRng.fill_bytes(buffer);
    }
}
