//! `MatchDriver`: finds a game, waits for it to start, and plays it out.
//!
//! The driver is a plain state machine over one [`Match`]. It owns no
//! task of its own; the session layer runs it and decides what to do with
//! its errors (in particular, logging in again on `Unauthorized`).

use std::collections::HashSet;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use battleofai_gateway::{Gateway, GatewayError};
use battleofai_protocol::{GameId, GameState, ListCriteria, PlayerId};
use battleofai_transport::Transport;
use futures_util::StreamExt;

use crate::{GameKind, GameType, Match, MatchError, MatchPhase, PlayConfig, Symbol, TurnCallback};

/// Drives one match for the logged-in player.
pub struct MatchDriver<T: Transport> {
    gateway: Arc<Gateway<T>>,
    game_type: Arc<dyn GameType>,
    callback: TurnCallback,
    current: Option<Match<T>>,
    phase: MatchPhase,
    /// Set once the joined match passed the start checks; `play` then
    /// resumes the turn loop instead of starting over.
    started: bool,
}

impl<T: Transport> MatchDriver<T> {
    pub fn new(
        gateway: Arc<Gateway<T>>,
        game_type: Arc<dyn GameType>,
        callback: TurnCallback,
    ) -> Self {
        Self {
            gateway,
            game_type,
            callback,
            current: None,
            phase: MatchPhase::Unjoined,
            started: false,
        }
    }

    pub fn kind(&self) -> GameKind {
        self.game_type.kind()
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// The joined match, if any.
    pub fn current(&self) -> Option<&Match<T>> {
        self.current.as_ref()
    }

    pub fn game_id(&self) -> Option<GameId> {
        self.current.as_ref().map(Match::id)
    }

    /// Takes over a match obtained elsewhere, without registering.
    pub fn adopt(&mut self, game: Match<T>) {
        self.phase = MatchPhase::after_join(game.state());
        self.current = Some(game);
        self.started = false;
    }

    // -----------------------------------------------------------------------
    // Joining
    // -----------------------------------------------------------------------

    /// Joins `game`, or finds one to join when `None`.
    ///
    /// Without a game, open games of the driver's kind are tried in listing
    /// order until a registration is accepted. Games the player already sits
    /// in are skipped unless `join_own_games` is set. If nothing accepts, a
    /// new game is created and joined.
    ///
    /// With a game, the player registers unless already seated; a seated
    /// player registers again only with `join_own_games`.
    ///
    /// On success the driver is `Waiting` or `Active`.
    pub async fn join(
        &mut self,
        game: Option<Match<T>>,
        join_own_games: bool,
    ) -> Result<(), MatchError> {
        let me = self.me().await?;
        let mut game = match game {
            Some(game) => {
                let seated = game.snapshot().has_player(&me);
                if !seated && !self.gateway.register_player(game.id()).await? {
                    return Err(MatchError::RegistrationRejected(game.id()));
                }
                if seated && join_own_games {
                    // Acceptance is up to the service; we already hold a seat.
                    self.gateway.register_player(game.id()).await?;
                }
                game
            }
            None => self.find_or_create(&me, join_own_games).await?,
        };
        game.refresh().await?;
        tracing::info!(game_id = %game.id(), state = %game.state(), "joined game");
        self.adopt(game);
        Ok(())
    }

    async fn find_or_create(
        &mut self,
        me: &PlayerId,
        join_own_games: bool,
    ) -> Result<Match<T>, MatchError> {
        self.phase = MatchPhase::Matchmaking;
        let kind = self.kind();
        let mut open = pin!(Match::list(
            self.gateway.clone(),
            ListCriteria::open(kind.name())
        ));

        while let Some(item) = open.next().await {
            let game = match item {
                Ok(game) => game,
                // Gone between listing and fetching.
                Err(GatewayError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            if game.snapshot().has_player(me) && !join_own_games {
                tracing::debug!(game_id = %game.id(), "skipping own game");
                continue;
            }
            if self.gateway.register_player(game.id()).await? {
                tracing::info!(game_id = %game.id(), "found open game");
                return Ok(game);
            }
        }

        let game = Match::create(self.gateway.clone(), kind.name()).await?;
        if !self.gateway.register_player(game.id()).await? {
            return Err(MatchError::RegistrationRejected(game.id()));
        }
        tracing::info!(game_id = %game.id(), "created new game");
        Ok(game)
    }

    /// Resumes an ongoing game the player already sits in.
    ///
    /// Picks the last entry of the service's listing of started games of
    /// this kind with the player in them, ignoring ids in `exclude`.
    /// Returns `false` when there is none; the driver is then unchanged.
    pub async fn rejoin(&mut self, exclude: &HashSet<GameId>) -> Result<bool, MatchError> {
        let me = self.me().await?;
        let criteria = ListCriteria::ongoing_for(self.kind().name(), me);
        let ids = self.gateway.list_games(&criteria).await?;

        let Some(id) = ids.into_iter().rfind(|id| !exclude.contains(id)) else {
            return Ok(false);
        };
        let game = Match::get(self.gateway.clone(), id).await?;
        tracing::info!(game_id = %id, "rejoining ongoing game");
        self.join(Some(game), false).await?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Playing
    // -----------------------------------------------------------------------

    /// Plays the joined match to its end.
    ///
    /// Waits while the game has open slots, then polls it every
    /// `turn_interval`, submitting a move whenever it is the player's turn.
    /// Returns whether the player won, or `None` when there is no winner.
    ///
    /// Safe to call again after an error: once the game has started, a
    /// second call resumes the turn loop, so a game that ended in between
    /// still resolves to its outcome.
    pub async fn play(&mut self, config: &PlayConfig) -> Result<Option<bool>, MatchError> {
        let me = self.me().await?;
        if !self.started {
            self.wait_for_start(config.matchmaking_interval).await?;
            self.check_playable(&me)?;
            self.started = true;
        }
        self.drive(&me, config.turn_interval).await
    }

    /// The turn loop. Leaves as soon as a refresh shows the game is no
    /// longer running, then reads the outcome from a final snapshot.
    async fn drive(
        &mut self,
        me: &PlayerId,
        interval: Duration,
    ) -> Result<Option<bool>, MatchError> {
        loop {
            let game = self.current.as_mut().ok_or(MatchError::NotJoined)?;
            game.refresh().await?;
            if game.state() != GameState::Started {
                break;
            }

            let my_turn = game.is_turn_of(me);
            self.phase = MatchPhase::Active { my_turn };
            if my_turn {
                let continues = self.take_turn(me).await?;
                if !continues {
                    break;
                }
            }
            tokio::time::sleep(interval).await;
        }

        let game = self.current.as_mut().ok_or(MatchError::NotJoined)?;
        game.refresh().await?;
        let won = Self::outcome(game, me);
        self.phase = MatchPhase::Terminal { won };
        tracing::info!(game_id = %game.id(), state = %game.state(), ?won, "game over");
        Ok(won)
    }

    /// Submits one move from a fresh snapshot.
    ///
    /// Returns whether the game continues.
    ///
    /// # Errors
    /// [`MatchError::NotYourTurn`] if another player is to move.
    pub async fn make_turn(&mut self) -> Result<bool, MatchError> {
        let me = self.me().await?;
        let game = self.current.as_mut().ok_or(MatchError::NotJoined)?;
        game.refresh().await?;
        self.take_turn(&me).await
    }

    /// Whether the player won the joined match, from the last snapshot.
    pub async fn won(&self) -> Result<Option<bool>, MatchError> {
        let me = self.me().await?;
        let game = self.current.as_ref().ok_or(MatchError::NotJoined)?;
        Ok(Self::outcome(game, &me))
    }

    /// Whether it is the player's turn, from the last snapshot.
    pub async fn is_active(&self) -> Result<bool, MatchError> {
        let me = self.me().await?;
        let game = self.current.as_ref().ok_or(MatchError::NotJoined)?;
        Ok(game.state() == GameState::Started && game.is_turn_of(&me))
    }

    pub async fn opponents(&self) -> Result<Vec<PlayerId>, MatchError> {
        let me = self.me().await?;
        let game = self.current.as_ref().ok_or(MatchError::NotJoined)?;
        Ok(game.opponents(&me))
    }

    async fn wait_for_start(&mut self, interval: Duration) -> Result<(), MatchError> {
        let game = self.current.as_mut().ok_or(MatchError::NotJoined)?;
        game.refresh().await?;
        let mut waited = Duration::ZERO;
        while game.state() == GameState::Waiting {
            self.phase = MatchPhase::Waiting;
            tracing::info!(
                game_id = %game.id(),
                waited_secs = waited.as_secs(),
                "waiting for other players"
            );
            tokio::time::sleep(interval).await;
            waited += interval;
            game.refresh().await?;
        }
        if game.state() != GameState::Started {
            return Err(MatchError::Abandoned {
                id: game.id(),
                state: game.state(),
            });
        }
        Ok(())
    }

    fn check_playable(&self, me: &PlayerId) -> Result<(), MatchError> {
        let game = self.current.as_ref().ok_or(MatchError::NotJoined)?;
        let expected = self.kind();
        if game.name() != expected.name() {
            return Err(MatchError::WrongGame {
                id: game.id(),
                expected,
                found: game.name().to_string(),
            });
        }
        if !game.snapshot().has_player(me) {
            return Err(MatchError::NotParticipant {
                id: game.id(),
                player: me.clone(),
            });
        }
        if game.state() != GameState::Started {
            return Err(MatchError::NotStarted {
                id: game.id(),
                state: game.state(),
            });
        }
        if game.open_slots() != 0 {
            return Err(MatchError::SlotsOpen {
                id: game.id(),
                open: game.open_slots(),
            });
        }
        Ok(())
    }

    /// Asks the callback for a move and submits it, from the current
    /// snapshot.
    async fn take_turn(&self, me: &PlayerId) -> Result<bool, MatchError> {
        let game = self.current.as_ref().ok_or(MatchError::NotJoined)?;
        if game.state() != GameState::Started {
            return Err(MatchError::NotStarted {
                id: game.id(),
                state: game.state(),
            });
        }
        let seat = match game.active_player() {
            Some(seat) if game.is_turn_of(me) => seat,
            _ => {
                return Err(MatchError::NotYourTurn {
                    id: game.id(),
                    player: me.clone(),
                });
            }
        };
        let symbol = self.symbol(seat)?;
        let board = game.current_board();
        let turn = self.callback.call(&board, symbol).map_err(MatchError::Callback)?;
        tracing::debug!(game_id = %game.id(), %symbol, %turn, "submitting turn");
        Ok(game.submit_turn(&turn).await?)
    }

    fn symbol(&self, seat: usize) -> Result<Symbol, MatchError> {
        self.game_type.symbol(seat).ok_or(MatchError::NoSymbol {
            kind: self.kind(),
            seat,
        })
    }

    fn outcome(game: &Match<T>, me: &PlayerId) -> Option<bool> {
        game.snapshot().winner_id().map(|winner| winner == me)
    }

    async fn me(&self) -> Result<PlayerId, MatchError> {
        self.gateway
            .user_id()
            .await
            .ok_or(MatchError::Gateway(GatewayError::NotLoggedIn))
    }
}
