//! Endpoint URLs and the routes built on them.

use battleofai_protocol::GameId;
use battleofai_transport::Method;
use serde::{Deserialize, Serialize};

/// Default base URL of the account (IAM) API.
pub const DEFAULT_IAM_URL: &str = "https://iam.battleofai.net/api/iam";

/// Default base URL of the games API.
pub const DEFAULT_GAMES_URL: &str = "https://games.battleofai.net/api/games";

/// Base URLs of the two resource groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub iam: String,
    pub games: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            iam: DEFAULT_IAM_URL.to_string(),
            games: DEFAULT_GAMES_URL.to_string(),
        }
    }
}

/// One remote endpoint: a verb plus the fully expanded URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Route {
    pub(crate) method: Method,
    pub(crate) url: String,
}

impl Route {
    pub(crate) fn login(ep: &Endpoints) -> Self {
        Self::new(Method::Post, &ep.iam, "/login")
    }

    pub(crate) fn validate_token(ep: &Endpoints) -> Self {
        Self::new(Method::Post, &ep.iam, "/validateToken")
    }

    pub(crate) fn list_games(ep: &Endpoints) -> Self {
        Self::new(Method::Get, &ep.games, "/")
    }

    pub(crate) fn create_game(ep: &Endpoints) -> Self {
        Self::new(Method::Post, &ep.games, "/createGame")
    }

    pub(crate) fn get_game(ep: &Endpoints, id: GameId) -> Self {
        Self::new(Method::Get, &ep.games, &format!("/{id}"))
    }

    pub(crate) fn register_player(ep: &Endpoints, id: GameId) -> Self {
        Self::new(Method::Post, &ep.games, &format!("/{id}/registerPlayer"))
    }

    pub(crate) fn make_turn(ep: &Endpoints, id: GameId) -> Self {
        Self::new(Method::Post, &ep.games, &format!("/{id}/makeTurn"))
    }

    fn new(method: Method, base: &str, path: &str) -> Self {
        Self {
            method,
            url: format!("{}{}", base.trim_end_matches('/'), path),
        }
    }
}
