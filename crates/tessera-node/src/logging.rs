//! Logging bootstrap for the `tessera` binary.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::NodeError;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Output is compact and
/// goes to stderr, leaving stdout to the interactive command loop.
///
/// # Errors
///
/// Returns [`NodeError::Config`] if `default_level` is not a valid filter or
/// a subscriber is already installed.
pub fn init(default_level: &str) -> Result<(), NodeError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|err| NodeError::Config(format!("log level {default_level:?}: {err}")))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .map_err(|err| NodeError::Config(format!("logging: {err}")))
}

/// Root span wrapping everything a node does.
#[must_use]
pub fn root_span(role: &str, name: Option<&str>) -> tracing::Span {
    tracing::info_span!("tessera", role, name = name.unwrap_or("-"))
}
