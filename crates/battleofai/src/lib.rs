//! # battleofai
//!
//! Client library for the battleofai turn-based game service.
//!
//! You write one function: given the board and your symbol, return a move.
//! The library logs in, finds or creates matches, waits for opponents,
//! polls the game, and calls your function whenever it is your turn, across
//! as many concurrent matches as you like.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use battleofai::prelude::*;
//!
//! battleofai::logging::init();
//! let client = Client::new(ClientConfig::from_env())?;
//! client.on_turn(Some(GameKind::Core), |board: &Board, _symbol: Symbol| {
//!     // First free cell.
//!     for (x, row) in board.as_array().into_iter().flatten().enumerate() {
//!         for (y, cell) in row.as_array().into_iter().flatten().enumerate() {
//!             if cell == "#" {
//!                 return Some((x, y));
//!             }
//!         }
//!     }
//!     None
//! });
//! client.play(Core, SessionConfig::default())?;
//! # Ok::<(), battleofai::BattleOfAiError>(())
//! ```
//!
//! ## Crates
//!
//! - [`transport`]: raw HTTP exchange
//! - [`protocol`]: wire types
//! - [`gateway`]: typed remote calls
//! - [`matches`]: the match resource and driver
//! - [`session`]: concurrent sessions

mod client;
mod config;
mod error;
pub mod logging;

pub use client::{Client, ClientRef, Session};
pub use config::{ClientConfig, GAMES_URL_VAR, IAM_URL_VAR, PASSWORD_VAR, USERNAME_VAR};
pub use error::BattleOfAiError;

pub use battleofai_gateway as gateway;
pub use battleofai_match as matches;
pub use battleofai_protocol as protocol;
pub use battleofai_session as session;
pub use battleofai_transport as transport;

pub mod prelude {
    pub use crate::{BattleOfAiError, Client, ClientConfig, Session};
    pub use battleofai_match::{Board, Core, GameKind, GameType, Symbol, TurnCallback};
    pub use battleofai_protocol::{GameId, GameState, PlayerId};
    pub use battleofai_session::SessionConfig;
}
