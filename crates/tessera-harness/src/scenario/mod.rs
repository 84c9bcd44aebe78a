//! Scenario testing framework for the five-message exchange.
//!
//! A scenario wires a KDC, an initiator and a responder together in memory
//! (no transport, no timers), drives the exchange to completion or to the
//! first failure, and hands the resulting [`World`] to a mandatory oracle.
//! Faults can be injected at fixed points of the exchange.

mod actor;
mod builder;
pub mod oracle;
mod world;

pub use actor::Actor;
pub use builder::{Fault, KEY_A, KEY_B, RunnableScenario, Scenario};
pub use oracle::OracleFn;
pub use world::World;
