//! Wire protocol for the battleofai service.
//!
//! This crate defines the "language" the client and the remote service
//! speak:
//!
//! - **Types** ([`GameSnapshot`], [`GameState`], [`TokenSet`], ...):
//!   the payloads sent to and received from the IAM and games APIs.
//! - **Codec** ([`Body`], [`encode_json`]): how those payloads become
//!   bytes, and how a response body (JSON or plain text) is read back.
//! - **Errors** ([`ProtocolError`]): what can go wrong doing that.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (typed payloads) → Gateway (remote calls)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Body, encode_json};
pub use error::ProtocolError;
pub use types::{
    CreateGameRequest, GameId, GameList, GameSnapshot, GameState, GameSummary, ListCriteria,
    LoginRequest, LoginResponse, PlayerAuth, PlayerId, PlayerRef, TokenSet, TurnRecord,
    TurnRequest, ValidateTokenRequest, ValidateTokenResponse,
};
