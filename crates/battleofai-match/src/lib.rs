//! Matches and the state machine that plays them.
//!
//! A [`Match`] is a local handle on one remote game. A [`MatchDriver`]
//! takes the logged-in player from "no game" to "game over":
//!
//! ```text
//! join / rejoin ──→ wait for opponents ──→ poll, move when it's our turn ──→ outcome
//! ```
//!
//! # Key types
//!
//! - [`GameType`]: names a game type and maps seats to symbols
//! - [`Match`]: one remote game and its latest snapshot
//! - [`MatchDriver`]: join, rejoin, play, make a single turn
//! - [`TurnCallback`] / [`CallbackRegistry`]: user move generators per kind
//! - [`MatchPhase`]: the driver's lifecycle state

mod callback;
mod driver;
mod error;
mod kind;
mod phase;
mod resource;

pub use callback::{Board, CallbackError, CallbackRegistry, Move, TurnCallback};
pub use driver::MatchDriver;
pub use error::MatchError;
pub use kind::{Core, GameKind, GameType, Symbol};
pub use phase::{MatchPhase, PlayConfig};
pub use resource::Match;
