//! Turn callbacks and the registry that resolves them per game kind.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::{GameKind, Symbol};

/// The board as the service sends it. Its shape depends on the game type.
pub type Board = Value;

/// A move, already in the JSON form the service expects.
pub type Move = Value;

/// Anything a callback may fail with.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

type CallbackFn = dyn Fn(&Board, Symbol) -> Result<Move, CallbackError> + Send + Sync;

/// The user-supplied move generator.
///
/// Called with the current board and the local player's symbol; returns
/// the move to submit. Callbacks are synchronous, so a long computation
/// stalls every session on the same runtime until it returns.
#[derive(Clone)]
pub struct TurnCallback(Arc<CallbackFn>);

impl TurnCallback {
    /// Wraps an infallible callback returning any serializable move.
    pub fn new<F, M>(f: F) -> Self
    where
        F: Fn(&Board, Symbol) -> M + Send + Sync + 'static,
        M: Serialize,
    {
        Self(Arc::new(move |board, symbol| {
            serde_json::to_value(f(board, symbol)).map_err(Into::into)
        }))
    }

    /// Wraps a callback that can refuse to move.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&Board, Symbol) -> Result<Move, CallbackError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, board: &Board, symbol: Symbol) -> Result<Move, CallbackError> {
        (self.0)(board, symbol)
    }
}

impl fmt::Debug for TurnCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnCallback").finish_non_exhaustive()
    }
}

/// Maps game kinds to callbacks, with an optional wildcard entry.
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    /// `None` is the wildcard.
    callbacks: HashMap<Option<GameKind>, TurnCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `kind`, or as the wildcard when `kind` is
    /// `None`. A later registration for the same key replaces the earlier.
    pub fn register(&mut self, kind: Option<GameKind>, callback: TurnCallback) {
        self.callbacks.insert(kind, callback);
    }

    /// Resolves the callback for `kind`: the exact entry if there is one,
    /// the wildcard otherwise.
    pub fn get(&self, kind: &GameKind) -> Option<TurnCallback> {
        if let Some(cb) = self.callbacks.get(&Some(kind.clone())) {
            return Some(cb.clone());
        }
        let fallback = self.callbacks.get(&None).cloned();
        if fallback.is_some() {
            tracing::warn!(%kind, "no callback registered for game kind, using the wildcard");
        }
        fallback
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
