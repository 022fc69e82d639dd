//! Integration tests for matches and the match driver, against the
//! in-memory fake service.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use battleofai_gateway::Gateway;
use battleofai_gateway::testing::{EMPTY_CELL, FakeService, game_fixture};
use battleofai_match::{
    Board, Core, GameType, Match, MatchDriver, MatchError, MatchPhase, PlayConfig, TurnCallback,
};
use battleofai_protocol::{GameId, GameState, ListCriteria, PlayerId};
use futures_util::StreamExt;
use serde_json::{Value, json};

// =========================================================================
// Helpers
// =========================================================================

async fn logged_in(fake: &FakeService, user: &str) -> Arc<Gateway<FakeService>> {
    fake.add_user(user, "secret", user);
    let gateway = Arc::new(Gateway::new(fake.clone()));
    gateway.login(user, "secret").await.unwrap();
    gateway
}

/// Plays the first empty cell, scanning row by row.
fn first_free_cell() -> TurnCallback {
    TurnCallback::new(|board: &Board, _symbol| {
        for (x, row) in board.as_array().into_iter().flatten().enumerate() {
            for (y, cell) in row.as_array().into_iter().flatten().enumerate() {
                if cell.as_str() == Some(EMPTY_CELL) {
                    return json!([x, y]);
                }
            }
        }
        Value::Null
    })
}

fn driver(gateway: Arc<Gateway<FakeService>>) -> MatchDriver<FakeService> {
    let core: Arc<dyn GameType> = Arc::new(Core);
    MatchDriver::new(gateway, core, first_free_cell())
}

fn fast() -> PlayConfig {
    PlayConfig {
        turn_interval: Duration::from_secs(1),
        matchmaking_interval: Duration::from_secs(5),
    }
}

fn started(players: &[&str]) -> battleofai_protocol::GameSnapshot {
    game_fixture("Core", GameState::Started, players)
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_join_without_open_games_creates_one() {
    let fake = FakeService::new();
    let mut alice = driver(logged_in(&fake, "alice").await);

    alice.join(None, false).await.unwrap();

    assert_eq!(fake.calls("createGame"), 1);
    assert_eq!(fake.calls("registerPlayer"), 1);
    assert_eq!(alice.phase(), MatchPhase::Waiting);
    let game = alice.current().unwrap();
    assert!(game.snapshot().has_player(&PlayerId::from("alice")));
    assert_eq!(game.open_slots(), 1);
}

#[tokio::test]
async fn test_join_prefers_open_game_over_creating() {
    let fake = FakeService::new();
    fake.insert_game(
        GameId(5),
        game_fixture("Core", GameState::Waiting, &["bob"]),
    );
    let mut alice = driver(logged_in(&fake, "alice").await);

    alice.join(None, false).await.unwrap();

    assert_eq!(alice.game_id(), Some(GameId(5)));
    assert_eq!(fake.calls("createGame"), 0);
}

#[tokio::test]
async fn test_join_ignores_open_games_of_other_kinds() {
    let fake = FakeService::new();
    fake.insert_game(
        GameId(5),
        game_fixture("Chess", GameState::Waiting, &["bob"]),
    );
    let mut alice = driver(logged_in(&fake, "alice").await);

    alice.join(None, false).await.unwrap();

    assert_ne!(alice.game_id(), Some(GameId(5)));
    assert_eq!(fake.calls("createGame"), 1);
}

#[tokio::test]
async fn test_join_skips_own_open_game_by_default() {
    let fake = FakeService::new();
    fake.insert_game(
        GameId(5),
        game_fixture("Core", GameState::Waiting, &["alice"]),
    );
    let mut alice = driver(logged_in(&fake, "alice").await);

    alice.join(None, false).await.unwrap();

    assert_eq!(alice.game_id(), Some(GameId(6)));
    assert_eq!(fake.calls("createGame"), 1);
}

#[tokio::test]
async fn test_join_own_games_registers_again() {
    let fake = FakeService::new();
    fake.insert_game(
        GameId(5),
        game_fixture("Core", GameState::Waiting, &["alice"]),
    );
    let mut alice = driver(logged_in(&fake, "alice").await);

    alice.join(None, true).await.unwrap();

    assert_eq!(alice.game_id(), Some(GameId(5)));
    assert_eq!(fake.calls("createGame"), 0);
    assert_eq!(alice.current().unwrap().players().count(), 2);
}

#[tokio::test]
async fn test_join_explicit_game_already_seated_skips_registration() {
    let fake = FakeService::new();
    fake.insert_game(GameId(3), started(&["alice", "bob"]));
    let gateway = logged_in(&fake, "alice").await;
    let mut alice = driver(gateway.clone());

    let game = Match::get(gateway, GameId(3)).await.unwrap();
    alice.join(Some(game), false).await.unwrap();

    assert_eq!(fake.calls("registerPlayer"), 0);
    assert_eq!(alice.game_id(), Some(GameId(3)));
    assert!(alice.phase().is_joined());
}

#[tokio::test]
async fn test_join_explicit_game_rejected_is_an_error() {
    let fake = FakeService::new();
    fake.insert_game(GameId(3), started(&["bob", "carol"]));
    let gateway = logged_in(&fake, "alice").await;
    let mut alice = driver(gateway.clone());

    let game = Match::get(gateway, GameId(3)).await.unwrap();
    let err = alice.join(Some(game), false).await.unwrap_err();

    assert!(matches!(err, MatchError::RegistrationRejected(GameId(3))));
    assert_eq!(alice.phase(), MatchPhase::Unjoined);
}

#[tokio::test]
async fn test_join_without_login_fails() {
    let fake = FakeService::new();
    let mut anon = driver(Arc::new(Gateway::new(fake.clone())));

    let err = anon.join(None, false).await.unwrap_err();

    assert!(matches!(
        err,
        MatchError::Gateway(battleofai_gateway::GatewayError::NotLoggedIn)
    ));
    assert!(fake.requests().is_empty());
}

// =========================================================================
// Rejoining
// =========================================================================

#[tokio::test]
async fn test_rejoin_picks_last_listed_game() {
    let fake = FakeService::new();
    for id in [12, 47, 9] {
        fake.insert_game(GameId(id), started(&["alice", "bob"]));
    }
    let mut alice = driver(logged_in(&fake, "alice").await);

    assert!(alice.rejoin(&HashSet::new()).await.unwrap());

    assert_eq!(alice.game_id(), Some(GameId(9)));
    assert_eq!(fake.calls("registerPlayer"), 0);
    assert_eq!(fake.calls("createGame"), 0);
}

#[tokio::test]
async fn test_rejoin_skips_excluded_games() {
    let fake = FakeService::new();
    for id in [12, 47, 9] {
        fake.insert_game(GameId(id), started(&["alice", "bob"]));
    }
    let mut alice = driver(logged_in(&fake, "alice").await);

    let held = HashSet::from([GameId(9)]);
    assert!(alice.rejoin(&held).await.unwrap());

    assert_eq!(alice.game_id(), Some(GameId(47)));
}

#[tokio::test]
async fn test_rejoin_without_ongoing_games_leaves_driver_unjoined() {
    let fake = FakeService::new();
    fake.insert_game(GameId(1), started(&["bob", "carol"]));
    fake.insert_game(
        GameId(2),
        game_fixture("Core", GameState::Finished, &["alice", "bob"]),
    );
    let mut alice = driver(logged_in(&fake, "alice").await);

    assert!(!alice.rejoin(&HashSet::new()).await.unwrap());

    assert_eq!(alice.phase(), MatchPhase::Unjoined);
    assert_eq!(fake.calls("getGame"), 0);
}

// =========================================================================
// Playing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_play_two_drivers_finish_with_one_winner() {
    let fake = FakeService::new();
    let mut alice = driver(logged_in(&fake, "alice").await);
    let mut bob = driver(logged_in(&fake, "bob").await);

    alice.join(None, false).await.unwrap();
    bob.join(None, false).await.unwrap();
    assert_eq!(alice.game_id(), bob.game_id());

    let config = fast();
    let (a, b) = tokio::join!(alice.play(&config), bob.play(&config));

    // X fills (0,0) (0,2) (1,1) (2,0): the anti-diagonal on move seven.
    assert_eq!(a.unwrap(), Some(true));
    assert_eq!(b.unwrap(), Some(false));
    assert_eq!(fake.calls("makeTurn"), 7);
    assert_eq!(alice.phase(), MatchPhase::Terminal { won: Some(true) });
    assert_eq!(bob.phase(), MatchPhase::Terminal { won: Some(false) });
    assert_eq!(
        alice.opponents().await.unwrap(),
        vec![PlayerId::from("bob")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_play_again_after_expiry_at_game_end_resolves_outcome() {
    let fake = FakeService::new();
    fake.expire_tokens_on_game_end();
    let alice_gw = logged_in(&fake, "alice").await;
    let bob_gw = logged_in(&fake, "bob").await;
    let mut alice = driver(alice_gw.clone());
    let mut bob = driver(bob_gw.clone());
    alice.join(None, false).await.unwrap();
    bob.join(None, false).await.unwrap();

    let config = fast();
    let (a, b) = tokio::join!(alice.play(&config), bob.play(&config));
    assert!(a.unwrap_err().is_unauthorized());
    assert!(b.unwrap_err().is_unauthorized());

    alice_gw.login("alice", "secret").await.unwrap();
    bob_gw.login("bob", "secret").await.unwrap();

    assert_eq!(alice.play(&config).await.unwrap(), Some(true));
    assert_eq!(bob.play(&config).await.unwrap(), Some(false));
    assert_eq!(fake.calls("makeTurn"), 7);
    assert_eq!(alice.phase(), MatchPhase::Terminal { won: Some(true) });
}

#[tokio::test(start_paused = true)]
async fn test_play_aborted_while_waiting_is_abandoned() {
    let fake = FakeService::new();
    let mut alice = driver(logged_in(&fake, "alice").await);
    alice.join(None, false).await.unwrap();
    let id = alice.game_id().unwrap();

    let service = fake.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        service.update_game(id, |g| g.state = GameState::Aborted);
    });

    let err = alice.play(&fast()).await.unwrap_err();

    assert!(matches!(
        err,
        MatchError::Abandoned { state: GameState::Aborted, .. }
    ));
    assert_eq!(fake.calls("makeTurn"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_play_rejects_game_of_other_kind() {
    let fake = FakeService::new();
    fake.insert_game(
        GameId(4),
        game_fixture("Chess", GameState::Started, &["alice", "bob"]),
    );
    let gateway = logged_in(&fake, "alice").await;
    let mut alice = driver(gateway.clone());
    alice.adopt(Match::get(gateway, GameId(4)).await.unwrap());

    let err = alice.play(&fast()).await.unwrap_err();

    assert!(matches!(err, MatchError::WrongGame { .. }));
    assert_eq!(fake.calls("makeTurn"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_play_rejects_non_participant() {
    let fake = FakeService::new();
    fake.insert_game(GameId(4), started(&["bob", "carol"]));
    let gateway = logged_in(&fake, "alice").await;
    let mut alice = driver(gateway.clone());
    alice.adopt(Match::get(gateway, GameId(4)).await.unwrap());

    let err = alice.play(&fast()).await.unwrap_err();

    assert!(matches!(err, MatchError::NotParticipant { .. }));
}

#[tokio::test]
async fn test_play_without_match_is_not_joined() {
    let fake = FakeService::new();
    let mut alice = driver(logged_in(&fake, "alice").await);

    let err = alice.play(&fast()).await.unwrap_err();

    assert!(matches!(err, MatchError::NotJoined));
}

// =========================================================================
// Single turns
// =========================================================================

#[tokio::test]
async fn test_make_turn_out_of_turn_is_rejected_locally() {
    let fake = FakeService::new();
    fake.insert_game(GameId(2), started(&["alice", "bob"]));
    let gateway = logged_in(&fake, "bob").await;
    let mut bob = driver(gateway.clone());
    bob.adopt(Match::get(gateway, GameId(2)).await.unwrap());

    let err = bob.make_turn().await.unwrap_err();

    assert!(matches!(err, MatchError::NotYourTurn { .. }));
    assert_eq!(fake.calls("makeTurn"), 0);
    assert!(!bob.is_active().await.unwrap());
}

#[tokio::test]
async fn test_make_turn_submits_callback_move() {
    let fake = FakeService::new();
    fake.insert_game(GameId(2), started(&["alice", "bob"]));
    let gateway = logged_in(&fake, "alice").await;
    let mut alice = driver(gateway.clone());
    alice.adopt(Match::get(gateway, GameId(2)).await.unwrap());
    assert!(alice.is_active().await.unwrap());

    assert!(alice.make_turn().await.unwrap());

    let game = fake.game(GameId(2)).unwrap();
    assert_eq!(game.current_board().unwrap()[0][0], json!("X"));
    assert_eq!(game.active_player, Some(1));
}

#[tokio::test]
async fn test_make_turn_callback_failure_sends_nothing() {
    let fake = FakeService::new();
    fake.insert_game(GameId(2), started(&["alice", "bob"]));
    let gateway = logged_in(&fake, "alice").await;
    let core: Arc<dyn GameType> = Arc::new(Core);
    let refuse = TurnCallback::fallible(|_, _| Err("thinking too hard".into()));
    let mut alice = MatchDriver::new(gateway.clone(), core, refuse);
    alice.adopt(Match::get(gateway, GameId(2)).await.unwrap());

    let err = alice.make_turn().await.unwrap_err();

    assert!(matches!(err, MatchError::Callback(_)));
    assert_eq!(fake.calls("makeTurn"), 0);
}

#[tokio::test]
async fn test_make_turn_with_expired_token_is_unauthorized() {
    let fake = FakeService::new();
    fake.insert_game(GameId(2), started(&["alice", "bob"]));
    let gateway = logged_in(&fake, "alice").await;
    let mut alice = driver(gateway.clone());
    alice.adopt(Match::get(gateway, GameId(2)).await.unwrap());

    fake.expire_tokens();
    let err = alice.make_turn().await.unwrap_err();

    assert!(err.is_unauthorized());
}

// =========================================================================
// Match resource
// =========================================================================

#[tokio::test]
async fn test_list_fetches_games_lazily() {
    let fake = FakeService::new();
    for id in [1, 2, 3] {
        fake.insert_game(GameId(id), game_fixture("Core", GameState::Waiting, &[]));
    }
    let gateway = logged_in(&fake, "alice").await;

    let mut games = std::pin::pin!(Match::list(gateway, ListCriteria::open("Core")));
    let first = games.next().await.unwrap().unwrap();

    assert_eq!(first.id(), GameId(1));
    assert_eq!(fake.calls("listGames"), 1);
    assert_eq!(fake.calls("getGame"), 1);
}

#[tokio::test]
async fn test_refresh_replaces_snapshot_whole() {
    let fake = FakeService::new();
    fake.insert_game(GameId(2), started(&["alice", "bob"]));
    let gateway = logged_in(&fake, "alice").await;
    let mut game = Match::get(gateway, GameId(2)).await.unwrap();

    fake.update_game(GameId(2), |g| {
        g.state = GameState::Finished;
        g.winning_player = Some(1);
    });
    assert_eq!(game.state(), GameState::Started);

    game.refresh().await.unwrap();

    assert_eq!(game.state(), GameState::Finished);
    assert_eq!(game.winning_player(), Some(1));
}

#[tokio::test]
async fn test_get_unknown_game_is_not_found() {
    let fake = FakeService::new();
    let gateway = logged_in(&fake, "alice").await;

    let err = Match::get(gateway, GameId(404)).await.unwrap_err();

    assert!(matches!(err, battleofai_gateway::GatewayError::NotFound(_)));
}
