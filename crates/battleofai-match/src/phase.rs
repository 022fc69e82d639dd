//! Driver pacing and the driver's lifecycle state.

use std::fmt;
use std::time::Duration;

use battleofai_protocol::GameState;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PlayConfig
// ---------------------------------------------------------------------------

/// How often the driver polls the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayConfig {
    /// Pause after every poll of a running game.
    pub turn_interval: Duration,

    /// Pause between polls while waiting for opponents.
    pub matchmaking_interval: Duration,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            turn_interval: Duration::from_secs(5),
            matchmaking_interval: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// MatchPhase
// ---------------------------------------------------------------------------

/// Where a driver is in its lifecycle.
///
/// ```text
/// Unjoined → Matchmaking → Waiting → Active ⇄ Active → Terminal
///                       ↘─────────↗
/// ```
///
/// - **Unjoined**: no match yet.
/// - **Matchmaking**: scanning open games, or creating one.
/// - **Waiting**: joined, the game has open slots.
/// - **Active**: the game runs; `my_turn` as of the last refresh.
/// - **Terminal**: the game ended. `won` is `None` without a winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Unjoined,
    Matchmaking,
    Waiting,
    Active { my_turn: bool },
    Terminal { won: Option<bool> },
}

impl MatchPhase {
    /// The phase a freshly joined game is in, judged by its remote state.
    pub fn after_join(state: GameState) -> Self {
        match state {
            GameState::Started => Self::Active { my_turn: false },
            _ => Self::Waiting,
        }
    }

    /// Returns `true` once the driver holds a match.
    pub fn is_joined(&self) -> bool {
        !matches!(self, Self::Unjoined | Self::Matchmaking)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unjoined => write!(f, "Unjoined"),
            Self::Matchmaking => write!(f, "Matchmaking"),
            Self::Waiting => write!(f, "Waiting"),
            Self::Active { my_turn: true } => write!(f, "Active(my turn)"),
            Self::Active { my_turn: false } => write!(f, "Active"),
            Self::Terminal { won: Some(true) } => write!(f, "Terminal(won)"),
            Self::Terminal { won: Some(false) } => write!(f, "Terminal(lost)"),
            Self::Terminal { won: None } => write!(f, "Terminal"),
        }
    }
}
