//! Logging setup.
//!
//! Every crate in the workspace logs through `tracing`. This installs a
//! formatting subscriber filtered by `RUST_LOG`, defaulting to
//! `battleofai=info`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::BattleOfAiError;

/// The filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "battleofai=info";

/// Installs the global subscriber.
///
/// # Errors
/// [`BattleOfAiError::Config`] if a global subscriber is already set.
pub fn try_init() -> Result<(), BattleOfAiError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .map_err(|e| BattleOfAiError::Config(e.to_string()))
}

/// Installs the global subscriber, ignoring one that is already set.
pub fn init() {
    let _ = try_init();
}
