//! Error types for the session layer.

use battleofai_gateway::GatewayError;
use battleofai_match::{GameKind, MatchError};
use battleofai_protocol::{GameId, GameState, PlayerId};

/// Errors that can occur while setting up, running, or awaiting a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The match driver failed and the failure was not recoverable here.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The session has no host yet.
    #[error("session is not registered with a client")]
    NotRegistered,

    /// A session belongs to exactly one host.
    #[error("session {0} is already registered")]
    AlreadyRegistered(String),

    /// `run` was called while a previous run is still pending.
    #[error("session {0} is still running")]
    AlreadyRunning(String),

    /// `wait` was called without a run to wait for.
    #[error("session {0} has no run to wait for")]
    NotRunning(String),

    /// The game handed to `set_match` is neither waiting nor started.
    #[error("game {id} is {state} and cannot be played")]
    NotReady { id: GameId, state: GameState },

    /// The game handed to `set_match` does not include the local player.
    #[error("player {player} does not participate in game {id}")]
    NotParticipant { id: GameId, player: PlayerId },

    /// Neither the session nor its host has a callback for this kind.
    #[error("no callback registered for {0}")]
    NoCallback(GameKind),

    /// The run was cancelled before it finished.
    #[error("session {0} was cancelled")]
    Cancelled(String),

    /// The run's task panicked, most likely inside the turn callback.
    #[error("session {0} panicked")]
    Panicked(String),
}

impl From<GatewayError> for SessionError {
    fn from(e: GatewayError) -> Self {
        Self::Match(MatchError::Gateway(e))
    }
}

impl SessionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
