//! Error types for the match layer.

use battleofai_gateway::GatewayError;
use battleofai_protocol::{GameId, GameState, PlayerId};

use crate::{CallbackError, GameKind};

/// Errors that can occur while joining or playing a match.
///
/// Apart from [`MatchError::Gateway`], every variant is a broken contract
/// (acting out of turn, playing a game that never started, ...). Those are
/// programming errors and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// A remote call failed. Passed through untouched, including
    /// `Unauthorized`, which the session layer handles.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The driver has no match yet; call `join` first.
    #[error("no match joined")]
    NotJoined,

    /// Registering for a game that must accept us was refused.
    #[error("registration for game {0} was rejected")]
    RegistrationRejected(GameId),

    /// The game left the waiting state without starting.
    #[error("game {id} became {state} while waiting for players")]
    Abandoned { id: GameId, state: GameState },

    /// The local player is not one of the game's participants.
    #[error("player {player} does not participate in game {id}")]
    NotParticipant { id: GameId, player: PlayerId },

    /// The game is of a different type than the driver plays.
    #[error("game {id} is a {found} game, expected {expected}")]
    WrongGame {
        id: GameId,
        expected: GameKind,
        found: String,
    },

    /// The game is not running.
    #[error("game {id} is {state}, not started")]
    NotStarted { id: GameId, state: GameState },

    /// The game started with slots still open.
    #[error("game {id} still has {open} open slots")]
    SlotsOpen { id: GameId, open: u32 },

    /// A turn was attempted while another player is to move.
    #[error("it is not player {player}'s turn in game {id}")]
    NotYourTurn { id: GameId, player: PlayerId },

    /// The game type has no symbol for this seat.
    #[error("{kind} has no symbol for seat {seat}")]
    NoSymbol { kind: GameKind, seat: usize },

    /// The user callback could not produce a move.
    #[error("turn callback failed: {0}")]
    Callback(#[source] CallbackError),
}

impl MatchError {
    /// Returns `true` if a re-login could fix this error.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Gateway(e) if e.is_unauthorized())
    }
}
