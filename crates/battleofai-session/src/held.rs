//! Tracks which games a host's sessions are playing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use battleofai_protocol::GameId;

/// The set of games held by running sessions.
///
/// Rejoining skips these, so two sessions of one client never resume the
/// same game. A game may be held more than once (sessions joining their
/// own games share one); it stays held until every holder is gone.
#[derive(Debug, Default)]
pub struct HeldGames {
    counts: Mutex<HashMap<GameId, usize>>,
}

impl HeldGames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as held until the returned guard is dropped.
    pub fn hold(self: &Arc<Self>, id: GameId) -> HeldGame {
        *self.counts().entry(id).or_default() += 1;
        HeldGame {
            games: self.clone(),
            id,
        }
    }

    pub fn contains(&self, id: GameId) -> bool {
        self.counts().contains_key(&id)
    }

    /// A copy of the held ids.
    pub fn snapshot(&self) -> HashSet<GameId> {
        self.counts().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.counts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts().is_empty()
    }

    fn release(&self, id: GameId) {
        let mut counts = self.counts();
        if let Some(n) = counts.get_mut(&id) {
            *n -= 1;
            if *n == 0 {
                counts.remove(&id);
            }
        }
    }

    fn counts(&self) -> MutexGuard<'_, HashMap<GameId, usize>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its game when dropped, including when a run is cancelled.
#[derive(Debug)]
pub struct HeldGame {
    games: Arc<HeldGames>,
    id: GameId,
}

impl HeldGame {
    pub fn id(&self) -> GameId {
        self.id
    }
}

impl Drop for HeldGame {
    fn drop(&mut self) {
        self.games.release(self.id);
    }
}
