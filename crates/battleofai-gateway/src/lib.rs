//! Gateway to the battleofai remote service.
//!
//! This crate turns the two remote resource groups into typed async calls:
//!
//! - **Account (IAM)**: `login`, `validate_token`
//! - **Games**: `list_games`, `create_game`, `get_game`,
//!   `register_player`, `make_turn`
//!
//! # How it fits in the stack
//!
//! ```text
//! Match layer (above)   ← refreshes games, registers, submits turns
//!     ↕
//! Gateway (this crate)  ← routes, auth tokens, status classification
//!     ↕
//! Protocol + Transport (below) ← payload types, raw HTTP exchange
//! ```
//!
//! No retries happen here. A 401 comes back as
//! [`GatewayError::Unauthorized`] and it is the session layer's job to log
//! in again.
//!
//! # Feature Flags
//!
//! - `http` (default): enables the real HTTP transport
//! - `testing`: exposes [`testing::FakeService`], an in-memory service

#![allow(async_fn_in_trait)]

mod error;
mod gateway;
mod route;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{GatewayError, HttpFailure};
pub use gateway::Gateway;
pub use route::{DEFAULT_GAMES_URL, DEFAULT_IAM_URL, Endpoints};
