//! Tessera protocol core logic
//!
//! This crate contains the pure state machines of the Tessera key
//! distribution protocol (a symmetric Needham–Schroeder exchange) and thin
//! async drivers that run them over any byte stream.
//!
//! # Architecture: "The Hollow Shell"
//!
//! Protocol logic is strictly separated from transport concerns:
//!
//! ```text
//!       ┌────────────────────────────┐
//!       │ tessera-core               │
//!       │ - KDC / Initiator /        │
//!       │   Responder state machines │
//!       │ - AEAD sealing             │
//!       └────────────────────────────┘
//!          ↓                      ↓
//! ┌──────────────────┐  ┌──────────────────┐
//! │ tessera-harness  │  │ tessera-node     │
//! │ (Turmoil)        │  │ (Tokio TCP)      │
//! │ - Virtual time   │  │ - Real network   │
//! │ - Seeded RNG     │  │ - System clock   │
//! │ - Fault inject   │  │ - Key files      │
//! └──────────────────┘  └──────────────────┘
//! ```
//!
//! # Protocol
//!
//! ```text
//! 1. A → KDC : A, B, N_A
//! 2. KDC → A : E(K_A, { K_AB, B, N_A, E(K_B, { K_AB, A }) })
//! 3. A → B   : E(K_B, { K_AB, A })                     (ticket)
//! 4. B → A   : E(K_AB, N_B)                            (challenge)
//! 5. A → B   : E(K_AB, N_B - 1)                        (response)
//! ```
//!
//! # Key Principles
//!
//! - No I/O in state machines: they consume frames and return
//!   [`SessionAction`]s
//! - Environment Trait: time and randomness go through [`Environment`]
//! - Deterministic: Given the same inputs and environment state, produce the
//!   same outputs
//!
//! # Modules
//!
//! - [`kdc`]: Stateless key distribution center
//! - [`initiator`]: Requesting principal's state machine
//! - [`responder`]: Receiving principal's state machine
//! - [`crypto`]: AEAD contract and AES-GCM implementation
//! - [`registry`]: Long-term key table
//! - [`env`]: Environment abstraction (time, RNG, nonces)
//! - [`transport`]: Transport abstraction and frame I/O
//! - [`driver`]: Async drivers for one run per connection
//! - [`storage`]: Session key persistence
//! - [`session_table`]: Shared peer → session key map
//! - [`error`]: Run-level error taxonomy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod crypto;
pub mod driver;
pub mod env;
pub mod error;
pub mod initiator;
pub mod kdc;
pub mod registry;
pub mod responder;
pub mod session;
pub mod session_table;
pub mod storage;
pub mod transport;

pub use crypto::{AeadChannel, AesGcmChannel, CryptoError};
pub use driver::{Driver, DriverConfig, Established};
pub use env::{Environment, NonceSource};
pub use error::SessionError;
pub use initiator::{InitiatorSession, InitiatorState};
pub use kdc::KdcService;
pub use registry::{PrincipalRegistry, RegistryError};
pub use responder::{ResponderSession, ResponderState};
pub use session::SessionAction;
pub use session_table::SessionTable;
pub use storage::{MemoryKeyStore, SessionKeyStore, StoreError};
pub use transport::Transport;
