//! Integration tests for game sessions against the in-memory fake service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use battleofai_gateway::testing::{EMPTY_CELL, FakeService, game_fixture};
use battleofai_gateway::{Gateway, GatewayError};
use battleofai_match::{Board, CallbackRegistry, Core, GameKind, Match, TurnCallback};
use battleofai_protocol::{GameId, GameState};
use battleofai_session::{GameSession, HeldGames, SessionConfig, SessionError, SessionHost};
use serde_json::{Value, json};

// =========================================================================
// Test host
// =========================================================================

#[derive(Clone)]
struct TestHost {
    user: &'static str,
    gateway: Arc<Gateway<FakeService>>,
    callbacks: Arc<CallbackRegistry>,
    held: Arc<HeldGames>,
    sessions: Arc<AtomicUsize>,
}

impl TestHost {
    async fn login(fake: &FakeService, user: &'static str, callbacks: CallbackRegistry) -> Self {
        fake.add_user(user, "secret", user);
        let gateway = Arc::new(Gateway::new(fake.clone()));
        gateway.login(user, "secret").await.unwrap();
        Self {
            user,
            gateway,
            callbacks: Arc::new(callbacks),
            held: Arc::new(HeldGames::new()),
            sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn session(&self, config: SessionConfig) -> GameSession<Self> {
        let session = GameSession::new(Core, config);
        session.register(self.clone()).unwrap();
        self.sessions.fetch_add(1, Ordering::SeqCst);
        session
    }
}

impl SessionHost for TestHost {
    type Transport = FakeService;

    fn gateway(&self) -> &Arc<Gateway<FakeService>> {
        &self.gateway
    }

    fn callback(&self, kind: &GameKind) -> Option<TurnCallback> {
        self.callbacks.get(kind)
    }

    fn session_count(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    fn held_games(&self) -> &Arc<HeldGames> {
        &self.held
    }

    async fn reauthenticate(&self) -> Result<(), GatewayError> {
        if !self.gateway.validate_token().await? {
            self.gateway.login(self.user, "secret").await?;
        }
        Ok(())
    }
}

fn first_free_cell(board: &Board) -> Value {
    for (x, row) in board.as_array().into_iter().flatten().enumerate() {
        for (y, cell) in row.as_array().into_iter().flatten().enumerate() {
            if cell.as_str() == Some(EMPTY_CELL) {
                return json!([x, y]);
            }
        }
    }
    Value::Null
}

fn registry(callback: TurnCallback) -> CallbackRegistry {
    let mut reg = CallbackRegistry::new();
    reg.register(None, callback);
    reg
}

fn scripted() -> CallbackRegistry {
    registry(TurnCallback::new(|board: &Board, _| first_free_cell(board)))
}

fn fast() -> SessionConfig {
    SessionConfig {
        turn_interval: Duration::from_millis(500),
        ..SessionConfig::default()
    }
}

// =========================================================================
// Registration
// =========================================================================

#[tokio::test]
async fn test_register_assigns_default_name() {
    let fake = FakeService::new();
    let host = TestHost::login(&fake, "alice", scripted()).await;

    let first = host.session(fast());
    let second = host.session(fast());
    let named = GameSession::<TestHost>::new(Core, fast()).named("ranked");
    named.register(host.clone()).unwrap();

    assert_eq!(first.name(), "Session #1");
    assert_eq!(second.name(), "Session #2");
    assert_eq!(named.name(), "ranked");
}

#[tokio::test]
async fn test_register_twice_is_rejected() {
    let fake = FakeService::new();
    let host = TestHost::login(&fake, "alice", scripted()).await;
    let session = host.session(fast());

    let err = session.register(host.clone()).unwrap_err();

    assert!(matches!(err, SessionError::AlreadyRegistered(name) if name == "Session #1"));
}

#[tokio::test]
async fn test_run_unregistered_is_rejected() {
    let session = GameSession::<TestHost>::new(Core, fast());
    assert!(matches!(session.run(), Err(SessionError::NotRegistered)));
}

#[tokio::test]
async fn test_run_without_callback_is_rejected() {
    let fake = FakeService::new();
    let host = TestHost::login(&fake, "alice", CallbackRegistry::new()).await;
    let session = host.session(fast());

    let err = session.run().unwrap_err();

    assert!(matches!(err, SessionError::NoCallback(GameKind::Core)));
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_wait_without_run_is_rejected() {
    let fake = FakeService::new();
    let host = TestHost::login(&fake, "alice", scripted()).await;
    let session = host.session(fast());

    assert!(matches!(session.wait().await, Err(SessionError::NotRunning(_))));
}

// =========================================================================
// set_match
// =========================================================================

#[tokio::test]
async fn test_set_match_rejects_non_participant() {
    let fake = FakeService::new();
    fake.insert_game(GameId(3), game_fixture("Core", GameState::Started, &["bob", "carol"]));
    let host = TestHost::login(&fake, "alice", scripted()).await;
    let session = host.session(fast());

    let game = Match::get(host.gateway.clone(), GameId(3)).await.unwrap();
    let err = session.set_match(game).await.unwrap_err();

    assert!(matches!(err, SessionError::NotParticipant { .. }));
}

#[tokio::test]
async fn test_set_match_rejects_finished_game() {
    let fake = FakeService::new();
    fake.insert_game(GameId(3), game_fixture("Core", GameState::Finished, &["alice", "bob"]));
    let host = TestHost::login(&fake, "alice", scripted()).await;
    let session = host.session(fast());

    let game = Match::get(host.gateway.clone(), GameId(3)).await.unwrap();
    let err = session.set_match(game).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::NotReady { state: GameState::Finished, .. }
    ));
}

#[tokio::test]
async fn test_set_match_before_register_is_rejected() {
    let fake = FakeService::new();
    fake.insert_game(GameId(3), game_fixture("Core", GameState::Started, &["alice", "bob"]));
    let host = TestHost::login(&fake, "alice", scripted()).await;
    let session = GameSession::<TestHost>::new(Core, fast());

    let game = Match::get(host.gateway.clone(), GameId(3)).await.unwrap();
    assert!(matches!(
        session.set_match(game).await,
        Err(SessionError::NotRegistered)
    ));
}

// =========================================================================
// Running
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_two_players_play_to_a_win_and_a_loss() {
    let fake = FakeService::new();
    let alice = TestHost::login(&fake, "alice", scripted()).await;
    let bob = TestHost::login(&fake, "bob", scripted()).await;
    let config = SessionConfig {
        join_own_games: true,
        ..fast()
    };

    let a = alice.session(config.clone());
    a.run().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let b = bob.session(config);
    b.run().unwrap();

    assert_eq!(a.wait().await.unwrap(), Some(true));
    assert_eq!(b.wait().await.unwrap(), Some(false));
    assert_eq!(a.game_id(), b.game_id());
    assert_eq!(a.outcome(), Some(Some(true)));
    assert_eq!(fake.calls("createGame"), 1);
    assert_eq!(fake.calls("makeTurn"), 7);
    assert!(alice.held.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_mid_play_relogs_once_and_resumes() {
    let fake = FakeService::new();
    let expired = Arc::new(AtomicBool::new(false));
    let service = fake.clone();
    let flag = expired.clone();
    let expiring = registry(TurnCallback::new(move |board: &Board, _| {
        if !flag.swap(true, Ordering::SeqCst) {
            service.expire_tokens();
        }
        first_free_cell(board)
    }));
    let alice = TestHost::login(&fake, "alice", expiring).await;
    let bob = TestHost::login(&fake, "bob", scripted()).await;

    let a = alice.session(fast());
    a.run().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let b = bob.session(fast());
    b.run().unwrap();

    assert_eq!(a.wait().await.unwrap(), Some(true));
    assert_eq!(b.wait().await.unwrap(), Some(false));
    // Expiry hits every issued token, so each player logs in once more.
    assert_eq!(fake.calls("login"), 4);
    assert_eq!(fake.calls("validateToken"), 2);
    assert_eq!(fake.calls("listGames"), 2);
    assert_eq!(fake.calls("createGame"), 1);
    assert_eq!(fake.calls("registerPlayer"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_token_expiring_as_game_ends_still_resolves_outcome() {
    let fake = FakeService::new();
    fake.expire_tokens_on_game_end();
    let alice = TestHost::login(&fake, "alice", scripted()).await;
    let bob = TestHost::login(&fake, "bob", scripted()).await;

    let a = alice.session(fast());
    a.run().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let b = bob.session(fast());
    b.run().unwrap();

    assert_eq!(a.wait().await.unwrap(), Some(true));
    assert_eq!(b.wait().await.unwrap(), Some(false));
    assert_eq!(fake.calls("login"), 4);
    assert_eq!(fake.calls("makeTurn"), 7);
    assert_eq!(fake.calls("createGame"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reauth_limit_surfaces_unauthorized() {
    let fake = FakeService::new();
    fake.insert_game(GameId(8), game_fixture("Core", GameState::Started, &["alice", "bob"]));
    let host = TestHost::login(&fake, "alice", CallbackRegistry::new()).await;
    let service = fake.clone();
    let always_expire = TurnCallback::new(move |board: &Board, _| {
        service.expire_tokens();
        first_free_cell(board)
    });
    let session = GameSession::new(
        Core,
        SessionConfig {
            max_reauth_attempts: 1,
            ..fast()
        },
    )
    .with_callback(always_expire);
    session.register(host.clone()).unwrap();
    let game = Match::get(host.gateway.clone(), GameId(8)).await.unwrap();
    session.set_match(game).await.unwrap();

    session.run().unwrap();
    let err = session.wait().await.unwrap_err();

    assert!(matches!(&err, SessionError::Match(e) if e.is_unauthorized()));
    assert_eq!(fake.calls("login"), 2);
    assert_eq!(fake.calls("makeTurn"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_and_set_match_resume_without_matchmaking() {
    let fake = FakeService::new();
    for id in [12, 47, 9] {
        fake.insert_game(GameId(id), game_fixture("Core", GameState::Started, &["alice", "bob"]));
    }
    let alice = TestHost::login(&fake, "alice", scripted()).await;
    let bob = TestHost::login(&fake, "bob", scripted()).await;

    let a = alice.session(SessionConfig {
        rejoin_ongoing_games: true,
        ..fast()
    });
    let b = bob.session(fast());
    let game = Match::get(bob.gateway.clone(), GameId(9)).await.unwrap();
    b.set_match(game).await.unwrap();

    a.run().unwrap();
    b.run().unwrap();

    assert_eq!(a.wait().await.unwrap(), Some(true));
    assert_eq!(b.wait().await.unwrap(), Some(false));
    assert_eq!(a.game_id(), Some(GameId(9)));
    assert_eq!(b.game_id(), Some(GameId(9)));
    assert_eq!(fake.calls("createGame"), 0);
    assert_eq!(fake.calls("registerPlayer"), 0);
    assert_eq!(fake.game(GameId(12)).unwrap().history.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_skips_game_held_by_sibling_session() {
    let fake = FakeService::new();
    for id in [12, 47] {
        fake.insert_game(GameId(id), game_fixture("Core", GameState::Started, &["alice", "bob"]));
    }
    let host = TestHost::login(&fake, "alice", scripted()).await;
    let config = SessionConfig {
        rejoin_ongoing_games: true,
        ..fast()
    };

    let first = host.session(config.clone());
    first.run().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = host.session(config);
    second.run().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(first.game_id(), Some(GameId(47)));
    assert_eq!(second.game_id(), Some(GameId(12)));
    assert_eq!(host.held.len(), 2);

    first.cancel();
    second.cancel();
    assert!(first.wait().await.unwrap_err().is_cancelled());
    assert!(second.wait().await.unwrap_err().is_cancelled());
    assert!(host.held.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_while_pending_is_rejected_and_cancel_stops_waiting() {
    let fake = FakeService::new();
    let host = TestHost::login(&fake, "alice", scripted()).await;
    let session = host.session(fast());

    session.run().unwrap();
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(session.is_running());
    assert!(matches!(session.run(), Err(SessionError::AlreadyRunning(_))));

    session.cancel();
    let err = session.wait().await.unwrap_err();

    assert!(matches!(err, SessionError::Cancelled(name) if name == "Session #1"));
    assert!(!session.is_running());
    assert!(host.held.is_empty());
    assert_eq!(fake.calls("makeTurn"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_wait_keeps_run_pending() {
    let fake = FakeService::new();
    let host = TestHost::login(&fake, "alice", scripted()).await;
    let session = host.session(fast());

    session.run().unwrap();
    let waited = tokio::time::timeout(Duration::from_secs(2), session.wait()).await;
    assert!(waited.is_err());

    assert!(session.is_running());
    assert!(matches!(session.run(), Err(SessionError::AlreadyRunning(_))));

    session.cancel();
    assert!(session.wait().await.unwrap_err().is_cancelled());
    assert!(!session.is_running());
    assert_eq!(fake.calls("createGame"), 1);
}
