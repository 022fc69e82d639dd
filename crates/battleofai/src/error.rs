//! Unified error type for the battleofai client.

use battleofai_gateway::GatewayError;
use battleofai_match::MatchError;
use battleofai_protocol::ProtocolError;
use battleofai_session::SessionError;
use battleofai_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `battleofai` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BattleOfAiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A remote call failed (including a rejected login).
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Missing or malformed configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The `on_ready` hook panicked or was aborted.
    #[error("ready hook failed: {0}")]
    ReadyHook(#[from] tokio::task::JoinError),
}
