//! Game sessions for the battleofai client.
//!
//! A session is one independently scheduled match: it finds or rejoins a
//! game, plays it through a [`MatchDriver`](battleofai_match::MatchDriver),
//! and resolves to whether the player won.
//!
//! This crate handles:
//!
//! 1. **Scheduling**: each run is a Tokio task ([`GameSession::run`])
//! 2. **Re-authentication**: a rejected token triggers one re-login and
//!    the same game resumes, bounded by
//!    [`SessionConfig::max_reauth_attempts`]
//! 3. **Cancellation**: cooperative, observed at the next network call or
//!    sleep ([`GameSession::cancel`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)              ← implements SessionHost, starts sessions
//!     ↕
//! Session layer (this crate)  ← runs drivers, retries on Unauthorized
//!     ↕
//! Match layer (below)         ← join, rejoin, play
//! ```

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod held;
mod host;
mod session;

pub use config::SessionConfig;
pub use error::SessionError;
pub use held::{HeldGame, HeldGames};
pub use host::SessionHost;
pub use session::{GameSession, SessionResult};
