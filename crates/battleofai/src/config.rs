//! Client configuration: credentials and service endpoints.

use std::path::Path;

use battleofai_gateway::Endpoints;
use serde::{Deserialize, Serialize};

use crate::BattleOfAiError;

/// Environment variable holding the account name.
pub const USERNAME_VAR: &str = "BOAI_USERNAME";
/// Environment variable holding the account password.
pub const PASSWORD_VAR: &str = "BOAI_PASSWORD";
/// Environment variable overriding the IAM base URL.
pub const IAM_URL_VAR: &str = "BOAI_IAM_URL";
/// Environment variable overriding the games base URL.
pub const GAMES_URL_VAR: &str = "BOAI_GAMES_URL";

/// Everything a [`Client`](crate::Client) needs before logging in.
///
/// ```json
/// {
///   "username": "alice",
///   "password": "hunter2",
///   "endpoints": { "games": "http://localhost:8080/api/games" }
/// }
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub endpoints: Endpoints,
}

impl ClientConfig {
    /// A config for the public service with the given credentials.
    pub fn with_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            endpoints: Endpoints::default(),
        }
    }

    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BattleOfAiError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| BattleOfAiError::Config(format!("{}: {e}", path.display())))
    }

    /// Reads `BOAI_USERNAME`, `BOAI_PASSWORD`, and optionally
    /// `BOAI_IAM_URL` / `BOAI_GAMES_URL` from the environment.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`ClientConfig::from_env`], reading variables through `var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self {
            username: var(USERNAME_VAR),
            password: var(PASSWORD_VAR),
            endpoints: Endpoints::default(),
        };
        if let Some(iam) = var(IAM_URL_VAR) {
            config.endpoints.iam = iam;
        }
        if let Some(games) = var(GAMES_URL_VAR) {
            config.endpoints.games = games;
        }
        config
    }

    /// Overrides the credentials.
    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.username = Some(username.into());
        self.password = Some(password.into());
    }

    /// The username and password, or a config error naming what is missing.
    pub fn credentials(&self) -> Result<(&str, &str), BattleOfAiError> {
        let username = self
            .username
            .as_deref()
            .ok_or_else(|| BattleOfAiError::Config("missing username".into()))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| BattleOfAiError::Config("missing password".into()))?;
        Ok((username, password))
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("endpoints", &self.endpoints)
            .finish()
    }
}
