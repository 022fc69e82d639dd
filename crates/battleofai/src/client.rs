//! The `Client`: credentials, callbacks, and the sessions run with them.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use battleofai_gateway::{Gateway, GatewayError};
use battleofai_match::{Board, CallbackRegistry, GameKind, GameType, Symbol, TurnCallback};
use battleofai_protocol::PlayerId;
use battleofai_session::{GameSession, HeldGames, SessionConfig, SessionHost};
use battleofai_transport::{HttpTransport, Transport};
use futures_util::future::{BoxFuture, join_all};
use serde::Serialize;

use crate::{BattleOfAiError, ClientConfig};

/// A session run by a [`Client`].
pub type Session<T = HttpTransport> = GameSession<ClientRef<T>>;

type ReadyHook<T> = Box<dyn FnOnce(Client<T>) -> BoxFuture<'static, ()> + Send>;

/// The entry point: logs in, owns the callbacks, and runs sessions.
///
/// `Client` is a cheap handle; clones share everything. Sessions only
/// hold a [`ClientRef`] back to it, so dropping the last `Client` frees
/// the client and its sessions even without [`Client::close`].
///
/// # Example
///
/// ```rust,no_run
/// use battleofai::prelude::*;
///
/// let client = Client::new(ClientConfig::with_credentials("alice", "secret"))?;
/// client.on_turn(None, |board: &Board, _symbol: Symbol| {
///     // Pick a move from `board`; any serializable value works.
///     [0, 0]
/// });
/// let won = client.play(Core, SessionConfig::default())?;
/// # Ok::<(), battleofai::BattleOfAiError>(())
/// ```
pub struct Client<T: Transport = HttpTransport> {
    inner: Arc<Inner<T>>,
}

struct Inner<T: Transport> {
    gateway: Arc<Gateway<T>>,
    config: Mutex<ClientConfig>,
    callbacks: RwLock<CallbackRegistry>,
    sessions: Mutex<Vec<Session<T>>>,
    held: Arc<HeldGames>,
    on_ready: Mutex<Option<ReadyHook<T>>>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Client<HttpTransport> {
    /// A client talking HTTP to the configured endpoints.
    pub fn new(config: ClientConfig) -> Result<Self, BattleOfAiError> {
        Ok(Self::with_transport(HttpTransport::new()?, config))
    }
}

impl<T: Transport> Client<T> {
    /// A client over any transport.
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        let gateway = Gateway::with_endpoints(transport, config.endpoints.clone());
        Self {
            inner: Arc::new(Inner {
                gateway: Arc::new(gateway),
                config: Mutex::new(config),
                callbacks: RwLock::new(CallbackRegistry::new()),
                sessions: Mutex::new(Vec::new()),
                held: Arc::new(HeldGames::new()),
                on_ready: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> ClientConfig {
        self.config_guard().clone()
    }

    /// Replaces the credentials used by the next login.
    pub fn set_credentials(&self, username: impl Into<String>, password: impl Into<String>) {
        self.config_guard().set_credentials(username, password);
    }

    pub fn gateway(&self) -> &Arc<Gateway<T>> {
        &self.inner.gateway
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    /// Logs in with the configured credentials.
    ///
    /// # Errors
    /// - [`BattleOfAiError::Config`] if a username or password is missing
    /// - [`GatewayError::LoginFailure`] if the service rejects them
    pub async fn login(&self) -> Result<PlayerId, BattleOfAiError> {
        let (username, password) = {
            let config = self.config_guard();
            let (u, p) = config.credentials()?;
            (u.to_string(), p.to_string())
        };
        let (id, _) = self.inner.gateway.login(&username, &password).await?;
        tracing::info!(player = %id, "logged in");
        Ok(id)
    }

    /// Validates the current token set and logs in again if the service
    /// no longer accepts it. Returns `true` if a new login happened.
    pub async fn check_and_update_token(&self) -> Result<bool, GatewayError> {
        if self.inner.gateway.validate_token().await? {
            return Ok(false);
        }
        tracing::info!("token has expired, requesting a new one");
        match self.login().await {
            Ok(_) => Ok(true),
            Err(BattleOfAiError::Gateway(e)) => Err(e),
            // Credentials vanished since the first login.
            Err(_) => Err(GatewayError::LoginFailure),
        }
    }

    // -----------------------------------------------------------------------
    // Callbacks
    // -----------------------------------------------------------------------

    /// Registers `callback` for `kind`, or for every kind without its own
    /// callback when `kind` is `None`.
    pub fn register_callback(&self, kind: Option<GameKind>, callback: TurnCallback) {
        self.inner
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(kind, callback);
    }

    /// Registers a closure returning any serializable move.
    pub fn on_turn<F, M>(&self, kind: Option<GameKind>, f: F)
    where
        F: Fn(&Board, Symbol) -> M + Send + Sync + 'static,
        M: Serialize,
    {
        self.register_callback(kind, TurnCallback::new(f));
    }

    /// The callback for `kind`, falling back to the wildcard with a
    /// warning.
    pub fn get_callback(&self, kind: &GameKind) -> Option<TurnCallback> {
        self.inner
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
    }

    /// Runs `hook` alongside the sessions once [`Client::start`] has logged
    /// in. The hook gets a client handle and may create and run sessions
    /// of its own.
    pub fn on_ready<F, Fut>(&self, hook: F)
    where
        F: FnOnce(Client<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: ReadyHook<T> = Box::new(move |client| Box::pin(hook(client)));
        *self
            .inner
            .on_ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// All sessions registered so far.
    pub fn sessions(&self) -> Vec<Session<T>> {
        self.sessions_guard().clone()
    }

    /// Registers an existing session with this client.
    pub fn register_session(&self, session: &Session<T>) -> Result<(), BattleOfAiError> {
        session.register(self.downgrade())?;
        self.sessions_guard().push(session.clone());
        Ok(())
    }

    /// Creates and registers a session for `game_type`.
    pub fn create_session(
        &self,
        game_type: impl GameType,
        config: SessionConfig,
    ) -> Result<Session<T>, BattleOfAiError> {
        let session = GameSession::new(game_type, config);
        self.register_session(&session)?;
        Ok(session)
    }

    /// Runs every registered session that is not already running and waits
    /// for all of them.
    ///
    /// Returns each session's outcome in registration order, or the first
    /// failure once all have finished.
    pub async fn run_sessions(&self) -> Result<Vec<Option<bool>>, BattleOfAiError> {
        let sessions = self.sessions();
        for session in sessions.iter().filter(|s| !s.is_running()) {
            session.run()?;
        }
        join_all(sessions.iter().map(|s| s.wait()))
            .await
            .into_iter()
            .map(|r| r.map_err(BattleOfAiError::from))
            .collect()
    }

    /// Logs in, then runs all sessions and the `on_ready` hook
    /// concurrently and waits for both.
    pub async fn start(&self) -> Result<(), BattleOfAiError> {
        self.login().await?;

        let hook = self
            .inner
            .on_ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let ready = hook.map(|hook| tokio::spawn(hook(self.clone())));

        let results = self.run_sessions().await;
        if let Some(ready) = ready {
            ready.await?;
        }
        results.map(|_| ())
    }

    /// Cancels every session, forgets them, and closes the transport.
    pub async fn close(&self) {
        let sessions = std::mem::take(&mut *self.sessions_guard());
        for session in &sessions {
            session.cancel();
        }
        self.inner.gateway.close().await;
        tracing::debug!(sessions = sessions.len(), "client closed");
    }

    /// Blocks the current thread until [`Client::start`] completes, on a
    /// fresh single-threaded runtime. Ctrl-C cancels the sessions.
    ///
    /// The transport is closed before the runtime shuts down.
    ///
    /// # Panics
    /// When called from inside a Tokio runtime.
    pub fn run(&self) -> Result<(), BattleOfAiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let result = tokio::select! {
                result = self.start() => result,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("received signal to terminate");
                    Ok(())
                }
            };
            self.close().await;
            result
        })
    }

    /// Plays a single game of `game_type` and returns whether the player
    /// won. Blocks like [`Client::run`].
    pub fn play(
        &self,
        game_type: impl GameType,
        config: SessionConfig,
    ) -> Result<Option<bool>, BattleOfAiError> {
        let session = self.create_session(game_type, config)?;
        self.run()?;
        Ok(session.outcome().flatten())
    }

    /// A non-owning handle, as held by this client's sessions.
    pub fn downgrade(&self) -> ClientRef<T> {
        ClientRef {
            gateway: self.inner.gateway.clone(),
            held: self.inner.held.clone(),
            client: Arc::downgrade(&self.inner),
        }
    }

    fn config_guard(&self) -> MutexGuard<'_, ClientConfig> {
        self.inner
            .config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions_guard(&self) -> MutexGuard<'_, Vec<Session<T>>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config())
            .field("sessions", &self.sessions_guard().len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ClientRef
// ---------------------------------------------------------------------------

/// A session's handle on its [`Client`].
///
/// Shares the gateway and the held-games set, but does not keep the
/// client alive. Once the client is gone, callback lookups find nothing
/// and re-authentication fails with [`GatewayError::NotLoggedIn`].
pub struct ClientRef<T: Transport = HttpTransport> {
    gateway: Arc<Gateway<T>>,
    held: Arc<HeldGames>,
    client: Weak<Inner<T>>,
}

impl<T: Transport> ClientRef<T> {
    /// The client, if it still exists.
    pub fn client(&self) -> Option<Client<T>> {
        self.client.upgrade().map(|inner| Client { inner })
    }
}

impl<T: Transport> Clone for ClientRef<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            held: self.held.clone(),
            client: self.client.clone(),
        }
    }
}

impl<T: Transport> std::fmt::Debug for ClientRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRef")
            .field("alive", &(self.client.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

impl<T: Transport> SessionHost for ClientRef<T> {
    type Transport = T;

    fn gateway(&self) -> &Arc<Gateway<T>> {
        &self.gateway
    }

    fn callback(&self, kind: &GameKind) -> Option<TurnCallback> {
        self.client()?.get_callback(kind)
    }

    fn session_count(&self) -> usize {
        self.client().map_or(0, |client| client.sessions().len())
    }

    fn held_games(&self) -> &Arc<HeldGames> {
        &self.held
    }

    async fn reauthenticate(&self) -> Result<(), GatewayError> {
        let client = self.client().ok_or(GatewayError::NotLoggedIn)?;
        client.check_and_update_token().await.map(|_| ())
    }
}
