//! Deterministic simulation harness for the Tessera protocol.
//!
//! This crate provides:
//!
//! - [`SimEnv`]: seeded RNG and tokio virtual time, so runs replay exactly
//! - [`SimTransport`]: turmoil's simulated TCP behind the core `Transport`
//!   trait, for end-to-end runs of the real drivers and accept loops
//! - [`scenario`]: an in-memory driver for the five-message exchange with
//!   fault injection and mandatory oracles

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scenario;
pub mod sim_env;
pub mod sim_transport;

pub use sim_env::SimEnv;
pub use sim_transport::SimTransport;
