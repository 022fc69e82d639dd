//! The `GameType` trait: what a driver needs to know about a game's rules.
//!
//! The client never evaluates a move itself, the service referees
//! everything. All a driver needs from a game type is the name the service
//! files its games under and the symbol each seat plays with.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A registry key naming a game type.
///
/// `Core` is the built-in two-player board game. Anything else the
/// service offers is addressed by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameKind {
    Core,
    Custom(String),
}

impl GameKind {
    /// The `game_name` the service uses for this kind.
    pub fn name(&self) -> &str {
        match self {
            Self::Core => "Core",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for GameKind {
    fn from(name: String) -> Self {
        if name == "Core" {
            Self::Core
        } else {
            Self::Custom(name)
        }
    }
}

impl From<&str> for GameKind {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<GameKind> for String {
    fn from(kind: GameKind) -> Self {
        kind.name().to_string()
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The mark a seat places on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(pub char);

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Describes a game type to the driver.
///
/// Implementors are plain values shared behind an `Arc`, so one instance
/// can back any number of sessions.
pub trait GameType: Send + Sync + 'static {
    /// Which games this type plays.
    fn kind(&self) -> GameKind;

    /// The symbol for the player at `seat` (an index into the game's
    /// player list). `None` if the game has no such seat.
    fn symbol(&self, seat: usize) -> Option<Symbol>;
}

/// The built-in game: two seats, `X` moves first, then `O`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Core;

impl Core {
    const SYMBOLS: [char; 2] = ['X', 'O'];
}

impl GameType for Core {
    fn kind(&self) -> GameKind {
        GameKind::Core
    }

    fn symbol(&self, seat: usize) -> Option<Symbol> {
        Self::SYMBOLS.get(seat).copied().map(Symbol)
    }
}
