//! The gateway: one method per remote operation.
//!
//! All sessions of a client share one [`Gateway`] (behind an `Arc`). The
//! token set they authenticate with lives in a single cell inside it:
//!
//! - every authenticated request reads the cell at call time, never a
//!   copy cached earlier, so a re-login by one session is seen by all;
//! - a login replaces the whole token set in one write, so no request ever
//!   sees a mix of old and new tokens.

use battleofai_protocol::{
    Body, CreateGameRequest, GameId, GameList, GameSnapshot, ListCriteria, LoginRequest,
    LoginResponse, PlayerAuth, PlayerId, ProtocolError, TokenSet, TurnRequest,
    ValidateTokenResponse, encode_json,
};
use battleofai_transport::{Request, Transport};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::route::{Endpoints, Route};
use crate::{GatewayError, HttpFailure};

/// Typed access to the remote service.
pub struct Gateway<T: Transport> {
    transport: T,
    endpoints: Endpoints,
    user_agent: String,
    tokens: RwLock<Option<TokenSet>>,
}

impl<T: Transport> Gateway<T> {
    /// Creates a gateway against the default public endpoints.
    pub fn new(transport: T) -> Self {
        Self::with_endpoints(transport, Endpoints::default())
    }

    pub fn with_endpoints(transport: T, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
            user_agent: format!("battleofai-rs/{}", env!("CARGO_PKG_VERSION")),
            tokens: RwLock::new(None),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The current token set, if logged in.
    pub async fn tokens(&self) -> Option<TokenSet> {
        self.tokens.read().await.clone()
    }

    /// The logged-in player's id.
    pub async fn user_id(&self) -> Option<PlayerId> {
        self.tokens.read().await.as_ref().map(|t| t.user_id.clone())
    }

    /// Replaces the token set wholesale.
    pub async fn set_tokens(&self, tokens: TokenSet) {
        *self.tokens.write().await = Some(tokens);
    }

    /// Logs in and stores the issued token set.
    ///
    /// Returns the player id and the combined token string.
    ///
    /// # Errors
    /// [`GatewayError::LoginFailure`] if the service answers without a
    /// complete token set; any classified HTTP failure otherwise.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(PlayerId, String), GatewayError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp: LoginResponse = self
            .request(Route::login(&self.endpoints), Vec::new(), Some(&body))
            .await?
            .into_json()?;

        let tokens = resp.into_token_set().ok_or(GatewayError::LoginFailure)?;
        let result = (tokens.user_id.clone(), tokens.combined());
        self.set_tokens(tokens).await;

        tracing::info!(user_id = %result.0, "logged in");
        Ok(result)
    }

    /// Asks the service whether the current token set is still valid.
    pub async fn validate_token(&self) -> Result<bool, GatewayError> {
        let tokens = self.tokens().await.ok_or(GatewayError::NotLoggedIn)?;
        let resp: ValidateTokenResponse = self
            .request(
                Route::validate_token(&self.endpoints),
                Vec::new(),
                Some(&tokens.validate_request()),
            )
            .await?
            .into_json()?;
        Ok(resp.success)
    }

    /// Lists the ids of all games meeting `criteria`, in the order the
    /// service returns them (oldest first).
    pub async fn list_games(&self, criteria: &ListCriteria) -> Result<Vec<GameId>, GatewayError> {
        let list: GameList = self
            .request::<()>(Route::list_games(&self.endpoints), criteria.to_query(), None)
            .await?
            .into_json()?;
        Ok(list.games.into_iter().map(|g| g.id).collect())
    }

    /// Creates a new game of the given type and returns its id.
    pub async fn create_game(&self, game_name: &str) -> Result<GameId, GatewayError> {
        let body = CreateGameRequest {
            game_name: game_name.to_string(),
        };
        let id = self
            .request(Route::create_game(&self.endpoints), Vec::new(), Some(&body))
            .await?
            .as_u64()?;
        Ok(GameId(id))
    }

    /// Fetches the full state of one game.
    pub async fn get_game(&self, id: GameId) -> Result<GameSnapshot, GatewayError> {
        let snapshot = self
            .request::<()>(Route::get_game(&self.endpoints, id), Vec::new(), None)
            .await?
            .into_json()?;
        Ok(snapshot)
    }

    /// Registers the logged-in player for a game.
    ///
    /// Returns `true` if the service accepted the registration.
    pub async fn register_player(&self, id: GameId) -> Result<bool, GatewayError> {
        let auth = self.player_auth().await?;
        let accepted = self
            .request(Route::register_player(&self.endpoints, id), Vec::new(), Some(&auth))
            .await?
            .as_bool()?;
        Ok(accepted)
    }

    /// Submits a move. Returns `true` if the game continues afterwards.
    pub async fn make_turn(
        &self,
        id: GameId,
        turn: &serde_json::Value,
    ) -> Result<bool, GatewayError> {
        let body = TurnRequest {
            player: self.player_auth().await?,
            turn: serde_json::to_string(turn).map_err(ProtocolError::Encode)?,
        };
        let ongoing = self
            .request(Route::make_turn(&self.endpoints, id), Vec::new(), Some(&body))
            .await?
            .as_bool()?;
        Ok(ongoing)
    }

    /// Tears down the underlying transport.
    pub async fn close(&self) {
        self.transport.close().await;
    }

    async fn player_auth(&self) -> Result<PlayerAuth, GatewayError> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(TokenSet::player_auth)
            .ok_or(GatewayError::NotLoggedIn)
    }

    /// Sends one request and classifies the outcome.
    async fn request<B: Serialize>(
        &self,
        route: Route,
        query: Vec<(String, String)>,
        body: Option<&B>,
    ) -> Result<Body, GatewayError> {
        let mut req = Request::new(route.method, route.url)
            .header("User-Agent", self.user_agent.as_str())
            .query(query);
        if let Some(body) = body {
            req = req.json_body(encode_json(body)?);
        }

        let method = req.method;
        let url = req.url.clone();
        let resp = self.transport.send(req).await?;
        tracing::debug!(%method, %url, status = resp.status, "request returned");

        if !resp.is_success() {
            // An error page that lies about being JSON still yields its text.
            let message = Body::decode(&resp.body, resp.is_json())
                .map(|b| b.message())
                .unwrap_or_else(|_| String::from_utf8_lossy(&resp.body).into_owned());
            return Err(GatewayError::from_status(HttpFailure {
                status: resp.status,
                reason: resp.reason,
                message,
            }));
        }

        let body = Body::decode(&resp.body, resp.is_json())?;
        tracing::trace!(%method, %url, ?body, "received");
        Ok(body)
    }
}
