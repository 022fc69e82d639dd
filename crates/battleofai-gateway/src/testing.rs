//! An in-memory fake of the remote service, for tests.
//!
//! [`FakeService`] implements [`Transport`], so a real [`Gateway`](crate::Gateway)
//! can be pointed at it and every layer above runs unmodified. It keeps
//! accounts, issued tokens, and games in memory, referees moves with
//! 3×3 tic-tac-toe rules (first player `X`, second `O`), and counts every
//! call per endpoint so tests can assert on exact traffic.
//!
//! Content types deliberately vary the way the real service does:
//! `createGame` and `registerPlayer` answer in `text/plain`, everything
//! else in `application/json`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use battleofai_protocol::{
    CreateGameRequest, GameId, GameSnapshot, GameState, LoginRequest, PlayerAuth, PlayerId,
    PlayerRef, TokenSet, TurnRecord, TurnRequest, ValidateTokenRequest,
};
use battleofai_transport::{Method, Request, Response, Transport, TransportError};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::Endpoints;

/// Number of registrations needed before a fresh game starts.
const DEFAULT_SLOTS: u32 = 2;

/// The marker every empty cell of the fake board carries.
pub const EMPTY_CELL: &str = "#";

/// Builds a game in the given state with the given participants, for use
/// with [`FakeService::insert_game`].
///
/// Started games get `open_slots = 0` and the first player to move.
pub fn game_fixture(name: &str, state: GameState, players: &[&str]) -> GameSnapshot {
    let started = state == GameState::Started;
    GameSnapshot {
        name: name.to_string(),
        state,
        open_slots: if started { 0 } else { DEFAULT_SLOTS },
        players: players
            .iter()
            .map(|p| PlayerRef {
                id: PlayerId::from(*p),
            })
            .collect(),
        active_player: started.then_some(0),
        history: vec![empty_turn()],
        winning_player: None,
    }
}

fn empty_turn() -> TurnRecord {
    TurnRecord {
        board: json!([
            [EMPTY_CELL, EMPTY_CELL, EMPTY_CELL],
            [EMPTY_CELL, EMPTY_CELL, EMPTY_CELL],
            [EMPTY_CELL, EMPTY_CELL, EMPTY_CELL]
        ]),
        extra: Default::default(),
    }
}

struct Account {
    username: String,
    password: String,
    id: PlayerId,
}

#[derive(Default)]
struct FakeState {
    accounts: Vec<Account>,
    /// The one valid token set per player. Expiry just forgets it.
    issued: HashMap<PlayerId, TokenSet>,
    tokens_minted: u64,
    /// Insertion order is listing order.
    games: Vec<(GameId, GameSnapshot)>,
    next_game_id: u64,
    slots_per_game: u32,
    /// Forget all tokens as soon as a move ends a game.
    expire_on_game_end: bool,
    calls: HashMap<&'static str, usize>,
    requests: Vec<Request>,
}

impl FakeState {
    fn game_mut(&mut self, id: GameId) -> Option<&mut GameSnapshot> {
        self.games
            .iter_mut()
            .find(|(gid, _)| *gid == id)
            .map(|(_, g)| g)
    }

    fn is_valid(&self, auth: &PlayerAuth) -> bool {
        self.issued
            .get(&auth.id)
            .is_some_and(|t| t.combined() == auth.token)
    }
}

/// In-memory stand-in for the IAM and games APIs.
///
/// Cheap to clone; clones share state, so a test keeps one handle while
/// the gateway under test owns another.
#[derive(Clone)]
pub struct FakeService {
    endpoints: Endpoints,
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeService {
    /// A fake answering on the default endpoints, two slots per game.
    pub fn new() -> Self {
        Self::with_endpoints(Endpoints::default())
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            state: Arc::new(Mutex::new(FakeState {
                next_game_id: 1,
                slots_per_game: DEFAULT_SLOTS,
                ..FakeState::default()
            })),
        }
    }

    /// Sets how many registrations newly created games need to start.
    pub fn with_slots(self, slots: u32) -> Self {
        self.state().slots_per_game = slots;
        self
    }

    /// Adds an account.
    pub fn add_user(&self, username: &str, password: &str, id: &str) {
        self.state().accounts.push(Account {
            username: username.to_string(),
            password: password.to_string(),
            id: PlayerId::from(id),
        });
    }

    /// Invalidates every issued token set. Authenticated calls answer 401
    /// and `validateToken` answers `false` until the next login.
    pub fn expire_tokens(&self) {
        self.state().issued.clear();
    }

    /// Expires every token set whenever a move ends a game, so the next
    /// authenticated call of every player answers 401.
    pub fn expire_tokens_on_game_end(&self) {
        self.state().expire_on_game_end = true;
    }

    /// Inserts a game under a chosen id. Listing order is insertion order.
    pub fn insert_game(&self, id: GameId, game: GameSnapshot) {
        let mut state = self.state();
        state.next_game_id = state.next_game_id.max(id.0 + 1);
        state.games.push((id, game));
    }

    /// The current state of one game.
    pub fn game(&self, id: GameId) -> Option<GameSnapshot> {
        self.state()
            .games
            .iter()
            .find(|(gid, _)| *gid == id)
            .map(|(_, g)| g.clone())
    }

    /// Mutates one game in place (e.g. to abort it mid-test).
    pub fn update_game(&self, id: GameId, f: impl FnOnce(&mut GameSnapshot)) {
        if let Some(game) = self.state().game_mut(id) {
            f(game);
        }
    }

    /// Ids of all games, in listing order.
    pub fn game_ids(&self) -> Vec<GameId> {
        self.state().games.iter().map(|(id, _)| *id).collect()
    }

    /// How many requests reached an endpoint. Names: `login`,
    /// `validateToken`, `listGames`, `createGame`, `getGame`,
    /// `registerPlayer`, `makeTurn`.
    pub fn calls(&self, endpoint: &str) -> usize {
        self.state().calls.get(endpoint).copied().unwrap_or(0)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.state().requests.clone()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, req: Request) -> Response {
        let mut state = self.state();
        state.requests.push(req.clone());

        let iam = self.endpoints.iam.trim_end_matches('/');
        let games = self.endpoints.games.trim_end_matches('/');

        if let Some(path) = req.url.strip_prefix(iam) {
            return match (req.method, path) {
                (Method::Post, "/login") => login(&mut state, &req),
                (Method::Post, "/validateToken") => validate_token(&mut state, &req),
                _ => not_found("no such endpoint"),
            };
        }

        if let Some(path) = req.url.strip_prefix(games) {
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            let id = segments
                .first()
                .and_then(|s| s.parse::<u64>().ok())
                .map(GameId);
            return match (req.method, segments.as_slice(), id) {
                (Method::Get, [], _) => list_games(&mut state, &req),
                (Method::Post, ["createGame"], _) => create_game(&mut state, &req),
                (Method::Get, [_], Some(id)) => get_game(&mut state, id),
                (Method::Post, [_, "registerPlayer"], Some(id)) => {
                    register_player(&mut state, &req, id)
                }
                (Method::Post, [_, "makeTurn"], Some(id)) => make_turn(&mut state, &req, id),
                _ => not_found("no such endpoint"),
            };
        }

        not_found("unknown host")
    }
}

impl Transport for FakeService {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        Ok(self.handle(request))
    }
}

// ---------------------------------------------------------------------------
// Endpoint handlers
// ---------------------------------------------------------------------------

fn count(state: &mut FakeState, endpoint: &'static str) {
    *state.calls.entry(endpoint).or_default() += 1;
}

fn login(state: &mut FakeState, req: &Request) -> Response {
    count(state, "login");
    let Some(body) = parse::<LoginRequest>(req) else {
        return bad_request();
    };

    let id = state
        .accounts
        .iter()
        .find(|a| a.username == body.username && a.password == body.password)
        .map(|a| a.id.clone());

    let Some(id) = id else {
        return json_response(
            200,
            json!({"userid": null, "token": null, "session_token": null}),
        );
    };

    state.tokens_minted += 1;
    let n = state.tokens_minted;
    let tokens = TokenSet {
        user_id: id.clone(),
        user_token: format!("user-token-{n}"),
        session_token: format!("session-token-{n}"),
    };
    let resp = json!({
        "userid": id,
        "token": tokens.user_token,
        "session_token": tokens.session_token,
    });
    state.issued.insert(id, tokens);
    json_response(200, resp)
}

fn validate_token(state: &mut FakeState, req: &Request) -> Response {
    count(state, "validateToken");
    let Some(body) = parse::<ValidateTokenRequest>(req) else {
        return bad_request();
    };
    let success = state.issued.get(&body.userid).is_some_and(|t| {
        t.user_token == body.token && t.session_token == body.session_token
    });
    json_response(200, json!({ "success": success }))
}

fn list_games(state: &mut FakeState, req: &Request) -> Response {
    count(state, "listGames");
    let param = |name: &str| {
        req.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };
    let name = param("game_name");
    let game_state = param("game_state").and_then(GameState::from_wire);
    let player = param("player_ids").map(PlayerId::from);

    let games: Vec<Value> = state
        .games
        .iter()
        .filter(|(_, g)| name.is_none_or(|n| g.name == n))
        .filter(|(_, g)| game_state.is_none_or(|s| g.state == s))
        .filter(|(_, g)| player.as_ref().is_none_or(|p| g.has_player(p)))
        .map(|(id, _)| json!({ "id": id }))
        .collect();
    json_response(200, json!({ "games": games }))
}

fn create_game(state: &mut FakeState, req: &Request) -> Response {
    count(state, "createGame");
    let Some(body) = parse::<CreateGameRequest>(req) else {
        return bad_request();
    };
    let id = GameId(state.next_game_id);
    state.next_game_id += 1;
    let mut game = game_fixture(&body.game_name, GameState::Waiting, &[]);
    game.open_slots = state.slots_per_game;
    state.games.push((id, game));
    text_response(200, &id.to_string())
}

fn get_game(state: &mut FakeState, id: GameId) -> Response {
    count(state, "getGame");
    match state.game_mut(id) {
        Some(game) => match serde_json::to_value(&*game) {
            Ok(value) => json_response(200, value),
            Err(_) => json_response(500, json!({"message": "encode failed"})),
        },
        None => not_found("game not found"),
    }
}

fn register_player(state: &mut FakeState, req: &Request, id: GameId) -> Response {
    count(state, "registerPlayer");
    let Some(auth) = parse::<PlayerAuth>(req) else {
        return bad_request();
    };
    if !state.is_valid(&auth) {
        return unauthorized();
    }
    let Some(game) = state.game_mut(id) else {
        return not_found("game not found");
    };
    if game.state != GameState::Waiting || game.open_slots == 0 {
        return text_response(200, "false");
    }

    game.players.push(PlayerRef { id: auth.id });
    game.open_slots -= 1;
    if game.open_slots == 0 {
        game.state = GameState::Started;
        game.active_player = Some(0);
    }
    text_response(200, "true")
}

fn make_turn(state: &mut FakeState, req: &Request, id: GameId) -> Response {
    count(state, "makeTurn");
    let Some(body) = parse::<TurnRequest>(req) else {
        return bad_request();
    };
    if !state.is_valid(&body.player) {
        return unauthorized();
    }
    let Some(game) = state.game_mut(id) else {
        return not_found("game not found");
    };
    if game.state != GameState::Started {
        return forbidden("game is not running");
    }
    if game.active_player_id() != Some(&body.player.id) {
        return forbidden("not your turn");
    }
    let Ok(turn) = serde_json::from_str::<Value>(&body.turn) else {
        return forbidden("turn is not valid JSON");
    };
    match referee(game, &turn) {
        Ok(ongoing) => {
            if !ongoing && state.expire_on_game_end {
                state.issued.clear();
            }
            json_response(200, json!(ongoing))
        }
        Err(msg) => forbidden(msg),
    }
}

/// Applies `turn` (`[x, y]`) for the active player. Returns whether the
/// game continues.
fn referee(game: &mut GameSnapshot, turn: &Value) -> Result<bool, &'static str> {
    let (Some(x), Some(y)) = (
        turn.get(0).and_then(Value::as_u64),
        turn.get(1).and_then(Value::as_u64),
    ) else {
        return Err("turn must be [x, y]");
    };
    let (x, y) = (x as usize, y as usize);
    let active = game.active_player.ok_or("no active player")?;
    let symbol = ["X", "O"].get(active).copied().unwrap_or("?");

    let mut board = game.current_board().cloned().unwrap_or(Value::Null);
    let cell = board
        .get_mut(x)
        .and_then(|row| row.get_mut(y))
        .ok_or("move off the board")?;
    if cell.as_str() != Some(EMPTY_CELL) {
        return Err("cell is occupied");
    }
    *cell = json!(symbol);

    let at = |x: usize, y: usize| board.get(x).and_then(|r| r.get(y)).and_then(Value::as_str);
    let lines = [
        [(0, 0), (0, 1), (0, 2)],
        [(1, 0), (1, 1), (1, 2)],
        [(2, 0), (2, 1), (2, 2)],
        [(0, 0), (1, 0), (2, 0)],
        [(0, 1), (1, 1), (2, 1)],
        [(0, 2), (1, 2), (2, 2)],
        [(0, 0), (1, 1), (2, 2)],
        [(0, 2), (1, 1), (2, 0)],
    ];
    let won = lines
        .iter()
        .any(|line| line.iter().all(|&(x, y)| at(x, y) == Some(symbol)));
    let full = (0..3).all(|x| (0..3).all(|y| at(x, y) != Some(EMPTY_CELL)));

    game.history.push(TurnRecord {
        board,
        extra: Default::default(),
    });

    if won {
        game.state = GameState::Finished;
        game.winning_player = Some(active);
    } else if full {
        game.state = GameState::Finished;
    } else {
        game.active_player = Some((active + 1) % game.players.len().max(1));
    }
    Ok(game.state == GameState::Started)
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn parse<T: DeserializeOwned>(req: &Request) -> Option<T> {
    req.body
        .as_deref()
        .and_then(|b| serde_json::from_slice(b).ok())
}

fn json_response(status: u16, value: Value) -> Response {
    Response {
        status,
        reason: reason(status).to_string(),
        content_type: Some("application/json".to_string()),
        body: value.to_string().into_bytes(),
    }
}

fn text_response(status: u16, text: &str) -> Response {
    Response {
        status,
        reason: reason(status).to_string(),
        content_type: Some("text/plain; charset=utf-8".to_string()),
        body: text.as_bytes().to_vec(),
    }
}

fn bad_request() -> Response {
    json_response(400, json!({"message": "malformed request body"}))
}

fn unauthorized() -> Response {
    json_response(401, json!({"message": "invalid token"}))
}

fn forbidden(msg: &str) -> Response {
    json_response(403, json!({ "message": msg }))
}

fn not_found(msg: &str) -> Response {
    json_response(404, json!({ "message": msg }))
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}
