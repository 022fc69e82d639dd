//! `Match`: a local handle on one remote game.

use std::sync::Arc;

use battleofai_gateway::{Gateway, GatewayError};
use battleofai_protocol::{GameId, GameSnapshot, GameState, ListCriteria, PlayerId};
use battleofai_transport::Transport;
use futures_util::stream::{self, Stream};

use crate::callback::{Board, Move};

/// One remote game plus the most recent snapshot of it.
///
/// The snapshot only changes through [`Match::refresh`], which swaps it
/// out whole. Readers therefore always see one consistent server response,
/// never a mix of two.
pub struct Match<T: Transport> {
    gateway: Arc<Gateway<T>>,
    id: GameId,
    snapshot: GameSnapshot,
}

impl<T: Transport> Match<T> {
    /// Creates a new game of the named type and fetches its initial state.
    pub async fn create(gateway: Arc<Gateway<T>>, game_name: &str) -> Result<Self, GatewayError> {
        let id = gateway.create_game(game_name).await?;
        tracing::debug!(game_id = %id, game_name, "created game");
        Self::get(gateway, id).await
    }

    /// Fetches an existing game.
    pub async fn get(gateway: Arc<Gateway<T>>, id: GameId) -> Result<Self, GatewayError> {
        let snapshot = gateway.get_game(id).await?;
        Ok(Self {
            gateway,
            id,
            snapshot,
        })
    }

    /// Lists games matching `criteria`, in the order the service returns
    /// them.
    ///
    /// The listing itself is one request. Each game's full state is then
    /// fetched only when the stream is polled for it, so a consumer that
    /// stops early never pays for the rest.
    pub fn list(
        gateway: Arc<Gateway<T>>,
        criteria: ListCriteria,
    ) -> impl Stream<Item = Result<Self, GatewayError>> + Send {
        stream::unfold(Listing::Start(gateway, criteria), |state| async move {
            match state {
                Listing::Start(gateway, criteria) => match gateway.list_games(&criteria).await {
                    Ok(ids) => Self::fetch_next(gateway, ids.into_iter()).await,
                    Err(e) => Some((Err(e), Listing::Done)),
                },
                Listing::Fetching(gateway, ids) => Self::fetch_next(gateway, ids).await,
                Listing::Done => None,
            }
        })
    }

    /// Lists and fetches every matching game eagerly.
    pub async fn list_all(
        gateway: Arc<Gateway<T>>,
        criteria: &ListCriteria,
    ) -> Result<Vec<Self>, GatewayError> {
        let ids = gateway.list_games(criteria).await?;
        let mut games = Vec::with_capacity(ids.len());
        for id in ids {
            games.push(Self::get(gateway.clone(), id).await?);
        }
        Ok(games)
    }

    async fn fetch_next(
        gateway: Arc<Gateway<T>>,
        mut ids: std::vec::IntoIter<GameId>,
    ) -> Option<(Result<Self, GatewayError>, Listing<T>)> {
        let id = ids.next()?;
        let item = Self::get(gateway.clone(), id).await;
        Some((item, Listing::Fetching(gateway, ids)))
    }

    /// Replaces the snapshot with the service's current view.
    ///
    /// On failure the old snapshot is kept.
    pub async fn refresh(&mut self) -> Result<(), GatewayError> {
        self.snapshot = self.gateway.get_game(self.id).await?;
        Ok(())
    }

    /// Submits a move. Returns whether the game continues.
    ///
    /// The snapshot is not refreshed; the next [`Match::refresh`] shows
    /// the move's effect.
    pub async fn submit_turn(&self, turn: &Move) -> Result<bool, GatewayError> {
        self.gateway.make_turn(self.id, turn).await
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn gateway(&self) -> &Arc<Gateway<T>> {
        &self.gateway
    }

    pub fn snapshot(&self) -> &GameSnapshot {
        &self.snapshot
    }

    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    pub fn state(&self) -> GameState {
        self.snapshot.state
    }

    pub fn open_slots(&self) -> u32 {
        self.snapshot.open_slots
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.snapshot.player_ids()
    }

    /// Seat index of the player to move.
    pub fn active_player(&self) -> Option<usize> {
        self.snapshot.active_player
    }

    pub fn winning_player(&self) -> Option<usize> {
        self.snapshot.winning_player
    }

    /// The board after the latest turn, or `null` before any.
    pub fn current_board(&self) -> Board {
        self.snapshot
            .current_board()
            .cloned()
            .unwrap_or(Board::Null)
    }

    /// Returns `true` if the game can still be joined or played.
    pub fn is_ready(&self) -> bool {
        matches!(self.state(), GameState::Waiting | GameState::Started)
    }

    /// Returns `true` if it is `player`'s turn.
    pub fn is_turn_of(&self, player: &PlayerId) -> bool {
        self.snapshot.active_player_id() == Some(player)
    }

    /// Everyone in the game except `player`.
    pub fn opponents(&self, player: &PlayerId) -> Vec<PlayerId> {
        self.players().filter(|p| *p != player).cloned().collect()
    }
}

impl<T: Transport> std::fmt::Debug for Match<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Match")
            .field("id", &self.id)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

enum Listing<T: Transport> {
    Start(Arc<Gateway<T>>, ListCriteria),
    Fetching(Arc<Gateway<T>>, std::vec::IntoIter<GameId>),
    Done,
}
