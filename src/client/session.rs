//! Auth session provider for one client (one browser tab).
//!
//! Constructed explicitly and passed to whoever renders; nothing global.
//! State changes are published on a `watch` channel.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::fetch::{ApiClient, FetchRequest};
use super::realtime::{RealtimeConnection, RealtimeConnector};
use super::user::User;
use crate::auth::{AuthError, IssuedTokens, RefreshCoordinator, TokenStore};

pub const ME_PATH: &str = "/auth/me";
pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// What the rendering layer sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub loading: bool,
}

impl SessionState {
    /// State before `init` has finished.
    pub fn loading() -> Self {
        Self {
            user: None,
            token: None,
            is_authenticated: false,
            loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            loading: false,
            ..Self::loading()
        }
    }

    pub fn signed_in(user: User, token: Option<String>) -> Self {
        Self {
            user: Some(user),
            token,
            is_authenticated: true,
            loading: false,
        }
    }
}

/// Email/password credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

struct OpenConnection {
    identity: String,
    connection: Box<dyn RealtimeConnection>,
}

/// Session provider: user, token and realtime connection of one client.
pub struct AuthSession {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    refresher: RefreshCoordinator,
    connector: Arc<dyn RealtimeConnector>,
    connection: Mutex<Option<OpenConnection>>,
    state: watch::Sender<SessionState>,
}

impl AuthSession {
    pub fn new(
        api: ApiClient,
        store: Arc<dyn TokenStore>,
        connector: Arc<dyn RealtimeConnector>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::loading());
        Self {
            refresher: RefreshCoordinator::new(api.clone()),
            api,
            store,
            connector,
            connection: Mutex::new(None),
            state,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Resolve the session from the stored tokens. `loading` is false
    /// afterwards whatever the outcome.
    pub async fn init(&self) -> SessionState {
        if self.store.refresh_token().is_some() && self.refresher.is_expiring_soon(&*self.store) {
            if let Err(e) = self.refresher.refresh(&*self.store).await {
                debug!(error = %e, "Refresh before session init failed");
            }
        }

        match self.fetch_me().await {
            Ok(user) => {
                info!(user_id = %user.id, "Session restored");
                self.establish(user).await;
            }
            Err(e) => {
                debug!(error = %e, "No session");
                self.state.send_replace(SessionState::signed_out());
            }
        }
        self.state()
    }

    /// Sign in with credentials, persisting the issued tokens.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User, AuthError> {
        let body =
            serde_json::to_value(credentials).map_err(|e| AuthError::Decode(e.to_string()))?;
        let request = FetchRequest::post(LOGIN_PATH).json(body);
        let response = self
            .api
            .fetch_with_token(None, request)
            .await?
            .error_for_status()?;

        let tokens = IssuedTokens::from_body(&response.body)
            .ok_or_else(|| AuthError::Decode("Login response carried no access token".into()))?;
        tokens.persist(&*self.store);

        let user = match User::from_body(&response.body) {
            Some(user) => user,
            None => match self.fetch_me().await {
                Ok(user) => user,
                Err(e) => {
                    // Stored tokens require a resolved user
                    self.store.clear();
                    return Err(e);
                }
            },
        };

        info!(user_id = %user.id, "Signed in");
        self.establish(user.clone()).await;
        Ok(user)
    }

    /// Sign out: tell the backend, clear tokens, close realtime. Backend
    /// failures are logged and do not keep the session alive.
    pub async fn logout(&self) {
        if self.store.get().is_some() {
            let result = self
                .api
                .fetch(&*self.store, FetchRequest::post(LOGOUT_PATH))
                .await
                .and_then(|r| r.error_for_status());
            if let Err(e) = result {
                warn!(error = %e, "Backend logout failed");
            }
        }

        self.store.clear();
        self.close_realtime().await;
        self.state.send_replace(SessionState::signed_out());
        info!("Signed out");
    }

    async fn fetch_me(&self) -> Result<User, AuthError> {
        let response = self
            .api
            .fetch(&*self.store, FetchRequest::get(ME_PATH))
            .await?
            .error_for_status()?;
        User::from_body(&response.body)
            .ok_or_else(|| AuthError::Decode("No user in /auth/me response".into()))
    }

    async fn establish(&self, user: User) {
        let token = self.store.get();
        if let Some(token) = &token {
            self.connect_realtime(token, &user).await;
        }
        self.state.send_replace(SessionState::signed_in(user, token));
    }

    /// Open the realtime connection for this identity, replacing any
    /// connection opened for a different user or token.
    async fn connect_realtime(&self, token: &str, user: &User) {
        let identity = format!("{}:{}", user.id, token);
        let mut slot = self.connection.lock().await;

        if slot.as_ref().is_some_and(|open| open.identity == identity) {
            return;
        }
        if let Some(old) = slot.take() {
            old.connection.close();
        }

        match self.connector.connect(token, user).await {
            Ok(connection) => {
                debug!(user_id = %user.id, "Realtime connected");
                *slot = Some(OpenConnection {
                    identity,
                    connection,
                });
            }
            Err(e) => warn!(error = %e, "Realtime connection failed"),
        }
    }

    async fn close_realtime(&self) {
        if let Some(open) = self.connection.lock().await.take() {
            open.connection.close();
            debug!("Realtime closed");
        }
    }

    /// Whether a realtime connection is currently open.
    pub async fn has_realtime(&self) -> bool {
        self.connection.lock().await.is_some()
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        if let Some(open) = self.connection.get_mut().take() {
            open.connection.close();
        }
    }
}
