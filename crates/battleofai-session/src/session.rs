//! `GameSession`: one named, independently scheduled match.
//!
//! A session pairs a host (credentials, callbacks) with the lifecycle of
//! one [`MatchDriver`]:
//!
//! ```text
//! new ──→ register ──→ [set_match] ──→ run ──→ wait
//!                                        │
//!                                     cancel
//! ```
//!
//! `run` spawns the find/join/play sequence as a Tokio task. The task is
//! the only place a driver lives; the session handle just starts, cancels,
//! and awaits it.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use battleofai_gateway::GatewayError;
use battleofai_match::{GameType, Match, MatchDriver, MatchError, TurnCallback};
use battleofai_protocol::GameId;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{SessionConfig, SessionError, SessionHost};

type HostTransport<H> = <H as SessionHost>::Transport;

/// What a finished run resolves to: whether the player won, `None` if the
/// game ended without a winner.
pub type SessionResult = Result<Option<bool>, SessionError>;

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// A handle on one session.
///
/// Clones share the session: registering, running, or cancelling through
/// one clone is seen by all. The game type, config, and callback override
/// are fixed when the session is built.
pub struct GameSession<H: SessionHost> {
    game_type: Arc<dyn GameType>,
    config: SessionConfig,
    callback: Option<TurnCallback>,
    shared: Arc<Shared<H>>,
}

struct Shared<H: SessionHost> {
    name: OnceLock<String>,
    host: OnceLock<H>,
    /// A match handed over through `set_match`, consumed by the next run.
    pending: Mutex<Option<Match<HostTransport<H>>>>,
    /// The spawned run. Stays here until a `wait` sees it complete, so a
    /// dropped `wait` leaves the run pending.
    task: tokio::sync::Mutex<Option<JoinHandle<SessionResult>>>,
    run: Mutex<RunSlot>,
}

#[derive(Default)]
struct RunSlot {
    cancel: CancellationToken,
    game: Option<GameId>,
    outcome: Option<Option<bool>>,
}

impl<H: SessionHost> Clone for GameSession<H> {
    fn clone(&self) -> Self {
        Self {
            game_type: self.game_type.clone(),
            config: self.config.clone(),
            callback: self.callback.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<H: SessionHost> GameSession<H> {
    pub fn new(game_type: impl GameType, config: SessionConfig) -> Self {
        Self::from_arc(Arc::new(game_type), config)
    }

    /// Builds a session around a shared game type.
    pub fn from_arc(game_type: Arc<dyn GameType>, config: SessionConfig) -> Self {
        Self {
            game_type,
            config,
            callback: None,
            shared: Arc::new(Shared {
                name: OnceLock::new(),
                host: OnceLock::new(),
                pending: Mutex::new(None),
                task: tokio::sync::Mutex::new(None),
                run: Mutex::new(RunSlot::default()),
            }),
        }
    }

    /// Names the session. Unnamed sessions get `Session #n` on
    /// registration.
    pub fn named(self, name: impl Into<String>) -> Self {
        let _ = self.shared.name.set(name.into());
        self
    }

    /// Uses `callback` instead of the one registered on the host.
    pub fn with_callback(mut self, callback: TurnCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn name(&self) -> &str {
        self.shared.name.get().map_or("unnamed session", String::as_str)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn game_type(&self) -> &Arc<dyn GameType> {
        &self.game_type
    }

    pub fn host(&self) -> Option<&H> {
        self.shared.host.get()
    }

    /// The game the current or last run joined.
    pub fn game_id(&self) -> Option<GameId> {
        self.shared.slot().game
    }

    /// The outcome of the last run that finished normally.
    pub fn outcome(&self) -> Option<Option<bool>> {
        self.shared.slot().outcome
    }

    /// Returns `true` while a spawned run has not finished or a `wait`
    /// is still collecting its result.
    pub fn is_running(&self) -> bool {
        match self.shared.task.try_lock() {
            Ok(task) => task.as_ref().is_some_and(|task| !task.is_finished()),
            Err(_) => true,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Attaches the session to `host`. Allowed exactly once.
    pub fn register(&self, host: H) -> Result<(), SessionError> {
        let count = host.session_count();
        self.shared
            .host
            .set(host)
            .map_err(|_| SessionError::AlreadyRegistered(self.name().to_string()))?;
        let _ = self.shared.name.set(format!("Session #{}", count + 1));
        tracing::debug!(session = self.name(), "registered");
        Ok(())
    }

    /// Plays `game` on the next run instead of matchmaking.
    ///
    /// # Errors
    /// - [`SessionError::NotRegistered`] before `register`
    /// - [`SessionError::NotReady`] unless the game is waiting or started
    /// - [`SessionError::NotParticipant`] if the local player is not in it
    pub async fn set_match(&self, game: Match<HostTransport<H>>) -> Result<(), SessionError> {
        let host = self.host().ok_or(SessionError::NotRegistered)?;
        if !game.is_ready() {
            return Err(SessionError::NotReady {
                id: game.id(),
                state: game.state(),
            });
        }
        let me = host
            .gateway()
            .user_id()
            .await
            .ok_or(GatewayError::NotLoggedIn)?;
        if !game.snapshot().has_player(&me) {
            return Err(SessionError::NotParticipant {
                id: game.id(),
                player: me,
            });
        }
        *self.shared.pending() = Some(game);
        Ok(())
    }

    /// Spawns a run onto the current Tokio runtime.
    ///
    /// The run rejoins, joins, or picks up the match from `set_match`,
    /// then plays it to the end. When the service rejects the token mid
    /// game, the run logs in again and resumes the same game.
    ///
    /// # Panics
    /// When called outside a Tokio runtime.
    pub fn run(&self) -> Result<(), SessionError> {
        let host = self.host().cloned().ok_or(SessionError::NotRegistered)?;
        let kind = self.game_type.kind();
        let callback = self
            .callback
            .clone()
            .or_else(|| host.callback(&kind))
            .ok_or(SessionError::NoCallback(kind))?;

        let already_running = || SessionError::AlreadyRunning(self.name().to_string());
        let mut task = self.shared.task.try_lock().map_err(|_| already_running())?;
        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            return Err(already_running());
        }

        let driver = MatchDriver::new(host.gateway().clone(), self.game_type.clone(), callback);
        let run = Run {
            host,
            driver,
            pending: self.shared.pending().take(),
            config: self.config.clone(),
            shared: self.shared.clone(),
        };
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let name = self.name().to_string();
        let span = tracing::info_span!("session", name = %name);

        {
            let mut slot = self.shared.slot();
            slot.cancel = cancel;
            slot.game = None;
        }
        *task = Some(tokio::spawn(
            async move {
                let result = tokio::select! {
                    _ = token.cancelled() => Err(SessionError::Cancelled(name.clone())),
                    result = run.execute() => result,
                };
                log_done(&name, &result);
                result
            }
            .instrument(span),
        ));
        Ok(())
    }

    /// Requests cancellation of the current run.
    ///
    /// Observed at the run's next network call or sleep. A callback that
    /// is already executing finishes first.
    pub fn cancel(&self) {
        self.shared.slot().cancel.cancel();
    }

    /// Waits for the current run and returns its result.
    ///
    /// The result goes to the first caller; later calls get
    /// [`SessionError::NotRunning`] until the next `run`. Dropping the
    /// returned future before it completes leaves the run pending.
    pub async fn wait(&self) -> SessionResult {
        let mut task = self.shared.task.lock().await;
        let handle = task
            .as_mut()
            .ok_or_else(|| SessionError::NotRunning(self.name().to_string()))?;

        let joined = handle.await;
        *task = None;
        drop(task);

        let result = match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(SessionError::Panicked(self.name().to_string())),
            Err(_) => Err(SessionError::Cancelled(self.name().to_string())),
        };
        if let Ok(outcome) = result {
            self.shared.slot().outcome = Some(outcome);
        }
        result
    }
}

impl<H: SessionHost> std::fmt::Debug for GameSession<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("name", &self.name())
            .field("kind", &self.game_type.kind())
            .field("config", &self.config)
            .field("game", &self.game_id())
            .finish_non_exhaustive()
    }
}

impl<H: SessionHost> Shared<H> {
    fn slot(&self) -> MutexGuard<'_, RunSlot> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, Option<Match<HostTransport<H>>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Everything one spawned run owns.
struct Run<H: SessionHost> {
    host: H,
    driver: MatchDriver<HostTransport<H>>,
    pending: Option<Match<HostTransport<H>>>,
    config: SessionConfig,
    shared: Arc<Shared<H>>,
}

impl<H: SessionHost> Run<H> {
    async fn execute(mut self) -> SessionResult {
        let delay = jitter(self.config.start_jitter);
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "delaying start");
            tokio::time::sleep(delay).await;
        }

        match self.pending.take() {
            Some(game) => self.driver.adopt(game),
            None => {
                let held = self.host.held_games().snapshot();
                let resumed =
                    self.config.rejoin_ongoing_games && self.driver.rejoin(&held).await?;
                if !resumed {
                    self.driver.join(None, self.config.join_own_games).await?;
                }
            }
        }

        let id = self.driver.game_id().ok_or(MatchError::NotJoined)?;
        self.shared.slot().game = Some(id);
        let _held = self.host.held_games().hold(id);

        let play = self.config.play_config();
        let mut reauths = 0;
        loop {
            match self.driver.play(&play).await {
                Ok(won) => return Ok(won),
                Err(e) if e.is_unauthorized() && reauths < self.config.max_reauth_attempts => {
                    reauths += 1;
                    tracing::warn!(game_id = %id, attempt = reauths, "token rejected, re-authenticating");
                    self.host.reauthenticate().await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let ms = rand::rng().random_range(0..=max.as_millis() as u64);
    Duration::from_millis(ms)
}

fn log_done(name: &str, result: &SessionResult) {
    match result {
        Ok(Some(true)) => tracing::info!("{name} is done: won"),
        Ok(Some(false)) => tracing::info!("{name} is done: lost"),
        Ok(None) => tracing::info!("{name} is done: no winner"),
        Err(SessionError::Cancelled(_)) => tracing::debug!("{name} was cancelled"),
        Err(e) => tracing::info!("{name} is done: {e}"),
    }
}
