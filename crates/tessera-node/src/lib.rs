//! Production shell for the Tessera key distribution protocol.
//!
//! `tessera-core` holds the protocol logic and never touches a socket, a
//! clock or the filesystem. This crate supplies those pieces:
//!
//! - [`SystemEnv`]: real clock and OS entropy
//! - [`TcpTransport`]: tokio TCP listener and dialer
//! - [`FileKeyStore`]: one `<min>_<max>.key` file per principal pair
//! - [`NodeConfig`]: the JSON principal table and addresses
//! - [`runtime`]: the KDC accept loop and [`PrincipalNode`]
//!
//! The `tessera` binary wires them together behind a small CLI.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod config;
pub mod error;
pub mod file_store;
pub mod logging;
pub mod runtime;
pub mod system_env;
pub mod tcp;

pub use config::{NodeConfig, PrincipalEntry};
pub use error::NodeError;
pub use file_store::FileKeyStore;
pub use runtime::{PrincipalNode, serve_kdc};
pub use system_env::SystemEnv;
pub use tcp::TcpTransport;
