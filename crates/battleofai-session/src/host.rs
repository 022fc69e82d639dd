//! The host a session runs for.
//!
//! A session does not own credentials or callbacks. It borrows them from
//! whoever it is registered with, usually the `Client` in the `battleofai`
//! crate. [`SessionHost`] is that contract, so this crate stays free of
//! the client and tests can plug in a small host of their own.

use std::future::Future;
use std::sync::Arc;

use battleofai_gateway::{Gateway, GatewayError};
use battleofai_match::{GameKind, TurnCallback};
use battleofai_transport::Transport;

use crate::HeldGames;

/// What a session needs from the client it is registered with.
///
/// # Trait bounds
///
/// - `Clone` → every session keeps its own handle. Hosts are expected to
///   be cheap handles around shared state.
/// - `Send + Sync + 'static` → handles move into spawned session tasks.
pub trait SessionHost: Clone + Send + Sync + 'static {
    type Transport: Transport;

    /// The gateway shared by all sessions of this host.
    fn gateway(&self) -> &Arc<Gateway<Self::Transport>>;

    /// The callback for `kind`, falling back to the wildcard entry.
    fn callback(&self, kind: &GameKind) -> Option<TurnCallback>;

    /// How many sessions the host already has. Used to name new ones.
    fn session_count(&self) -> usize;

    /// Games currently played by the host's sessions.
    fn held_games(&self) -> &Arc<HeldGames>;

    /// Restores valid credentials after the service rejected a token:
    /// validates the current token set and logs in again only if it is
    /// no longer valid.
    fn reauthenticate(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
