//! Core protocol types for the battleofai wire format.
//!
//! Every type here is either sent to or received from one of the two
//! remote resource groups: the IAM (account) API and the games API.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a game on the remote service.
///
/// Newtype wrapper around the numeric id the service hands out, so a game
/// id can never be confused with a player id. Serialized as the bare
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player's identity as issued by the IAM service at login.
///
/// The service is not consistent about the JSON type of user ids (numbers
/// in some payloads, strings in others), so deserialization accepts both
/// and normalizes to the string form. Serialization always emits a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for PlayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PlayerIdVisitor;

        impl Visitor<'_> for PlayerIdVisitor {
            type Value = PlayerId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a player id as string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<PlayerId, E> {
                Ok(PlayerId(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<PlayerId, E> {
                Ok(PlayerId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<PlayerId, E> {
                Ok(PlayerId(v.to_string()))
            }
        }

        deserializer.deserialize_any(PlayerIdVisitor)
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// Lifecycle state of a remote game.
///
/// ```text
/// Waiting ──(all slots filled)──→ Started ──→ Finished
///                                    └──────→ Aborted
/// ```
///
/// `NonExistent` is how the service reports a game with no state at all
/// (`null` on the wire). No transition back to `Waiting` is ever observed
/// once a game has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    #[default]
    NonExistent,
    Waiting,
    Started,
    Aborted,
    Finished,
}

impl GameState {
    /// The wire string for this state, `None` for `NonExistent`.
    pub fn as_wire(&self) -> Option<&'static str> {
        match self {
            Self::NonExistent => None,
            Self::Waiting => Some("WAITING"),
            Self::Started => Some("STARTED"),
            Self::Aborted => Some("ABORTED"),
            Self::Finished => Some("FINISHED"),
        }
    }

    /// Parses a wire string. Unknown strings yield `None`.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "WAITING" => Some(Self::Waiting),
            "STARTED" => Some(Self::Started),
            "ABORTED" => Some(Self::Aborted),
            "FINISHED" => Some(Self::Finished),
            _ => None,
        }
    }

    /// Returns `true` if a game in this state can still be joined or played.
    pub fn is_ongoing(&self) -> bool {
        matches!(self, Self::Waiting | Self::Started)
    }

    /// Returns `true` once the game can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted | Self::Finished)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire().unwrap_or("NON_EXISTENT"))
    }
}

impl Serialize for GameState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_wire() {
            Some(s) => serializer.serialize_str(s),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for GameState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(Self::NonExistent),
            Some(s) => Self::from_wire(&s)
                .ok_or_else(|| de::Error::custom(format!("unknown game state {s:?}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Game snapshot
// ---------------------------------------------------------------------------

/// One participant entry in a game's `players` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: PlayerId,
}

/// One entry in a game's turn history.
///
/// Only `board` is interpreted (as an opaque snapshot handed to callbacks).
/// Anything else the service sends is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    #[serde(default)]
    pub board: serde_json::Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The full state of one game, exactly as a single `GET /games/{id}`
/// returns it.
///
/// This is always replaced wholesale; the client never patches
/// individual fields, so a snapshot is by construction one consistent
/// view of the remote game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// The game type (e.g. `"Core"`).
    #[serde(rename = "game_name")]
    pub name: String,

    #[serde(rename = "game_state", default)]
    pub state: GameState,

    #[serde(default, deserialize_with = "null_as_default")]
    pub open_slots: u32,

    /// Participants in turn order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub players: Vec<PlayerRef>,

    /// Index into `players` of whoever moves next.
    #[serde(default)]
    pub active_player: Option<usize>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<TurnRecord>,

    /// Index into `players` of the winner, once there is one.
    #[serde(default)]
    pub winning_player: Option<usize>,
}

impl GameSnapshot {
    /// Participant ids in turn order.
    pub fn player_ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.iter().map(|p| &p.id)
    }

    /// Returns `true` if `player` is one of the participants.
    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.player_ids().any(|p| p == player)
    }

    /// The participant whose turn it is.
    pub fn active_player_id(&self) -> Option<&PlayerId> {
        self.active_player
            .and_then(|idx| self.players.get(idx))
            .map(|p| &p.id)
    }

    /// The winning participant, if the game has one.
    pub fn winner_id(&self) -> Option<&PlayerId> {
        self.winning_player
            .and_then(|idx| self.players.get(idx))
            .map(|p| &p.id)
    }

    /// The board after the most recent turn.
    pub fn current_board(&self) -> Option<&serde_json::Value> {
        self.history.last().map(|t| &t.board)
    }
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One entry of a `GET /games/` listing. Only the id is used; the client
/// fetches the full state separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: GameId,
}

/// Body of a `GET /games/` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameList {
    #[serde(default)]
    pub games: Vec<GameSummary>,
}

/// Filters for listing games. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCriteria {
    pub game_name: Option<String>,
    pub game_state: Option<GameState>,
    pub player_ids: Option<PlayerId>,
}

impl ListCriteria {
    /// Criteria for joinable games of one type.
    pub fn open(game_name: impl Into<String>) -> Self {
        Self {
            game_name: Some(game_name.into()),
            game_state: Some(GameState::Waiting),
            player_ids: None,
        }
    }

    /// Criteria for started games of one type that `player` takes part in.
    pub fn ongoing_for(game_name: impl Into<String>, player: PlayerId) -> Self {
        Self {
            game_name: Some(game_name.into()),
            game_state: Some(GameState::Started),
            player_ids: Some(player),
        }
    }

    /// Query-string pairs in a stable order.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(name) = &self.game_name {
            query.push(("game_name".to_string(), name.clone()));
        }
        if let Some(state) = self.game_state.and_then(|s| s.as_wire()) {
            query.push(("game_state".to_string(), state.to_string()));
        }
        if let Some(player) = &self.player_ids {
            query.push(("player_ids".to_string(), player.to_string()));
        }
        query
    }
}

// ---------------------------------------------------------------------------
// Account (IAM) payloads
// ---------------------------------------------------------------------------

/// Body of `POST /iam/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response of `POST /iam/login`. Any `None` field means the login failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub userid: Option<PlayerId>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl LoginResponse {
    /// Converts into a token set if every field is present.
    pub fn into_token_set(self) -> Option<TokenSet> {
        Some(TokenSet {
            user_id: self.userid?,
            user_token: self.token?,
            session_token: self.session_token?,
        })
    }
}

/// Body of `POST /iam/validateToken`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateTokenRequest {
    pub userid: PlayerId,
    pub token: String,
    pub session_token: String,
}

/// Response of `POST /iam/validateToken`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateTokenResponse {
    pub success: bool,
}

/// The credentials issued at login.
///
/// Opaque to the client: valid until the service rejects it. There is no
/// local expiry clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub user_id: PlayerId,
    pub user_token: String,
    pub session_token: String,
}

impl TokenSet {
    /// The combined token string the games API expects:
    /// `['<user_token>', '<session_token>']`.
    pub fn combined(&self) -> String {
        format!("['{}', '{}']", self.user_token, self.session_token)
    }

    /// The `{id, token}` object attached to authenticated game requests.
    pub fn player_auth(&self) -> PlayerAuth {
        PlayerAuth {
            id: self.user_id.clone(),
            token: self.combined(),
        }
    }

    pub fn validate_request(&self) -> ValidateTokenRequest {
        ValidateTokenRequest {
            userid: self.user_id.clone(),
            token: self.user_token.clone(),
            session_token: self.session_token.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Game payloads
// ---------------------------------------------------------------------------

/// A player's identity plus its current token, as the games API wants it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAuth {
    pub id: PlayerId,
    pub token: String,
}

/// Body of `POST /games/createGame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameRequest {
    pub game_name: String,
}

/// Body of `POST /games/{id}/makeTurn`.
///
/// `turn` holds the move JSON-encoded as a string; the service decodes it
/// a second time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub player: PlayerAuth,
    pub turn: String,
}
