//! Auth proxy routes.
//!
//! - GET `/me` - Current user (refreshes first when the token is expiring)
//! - POST `/login` - Exchange credentials for cookies
//! - POST `/refresh` - Exchange the refresh cookie for a new access cookie
//! - POST `/logout` - Revoke on the backend and clear cookies
//! - GET `/callback` - OAuth redirect target

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::error::{ApiError, Reply, parse_json_object};
use crate::auth::{
    AuthError, Credential, IssuedTokens, RefreshCoordinator, RequestTokens, TokenStore,
};
use crate::client::{ApiClient, FetchRequest, LOGIN_PATH, LOGOUT_PATH, ME_PATH, User};
use crate::impl_has_cookie_settings;

/// Backend path that exchanges an OAuth authorization code for tokens.
pub const OAUTH_CALLBACK_PATH: &str = "/auth/oauth/callback";

const TOKEN_FIELDS: &[&str] = &[
    "access_token",
    "accessToken",
    "refresh_token",
    "refreshToken",
    "expires_in",
    "expiresIn",
    "refresh_expires_in",
    "refreshExpiresIn",
];

#[derive(Clone)]
pub struct AuthRoutesState {
    pub api: ApiClient,
    pub refresher: RefreshCoordinator,
    pub secure_cookies: bool,
    pub sign_in_path: String,
    pub dashboard_path: String,
}

impl_has_cookie_settings!(AuthRoutesState);

pub fn router(state: AuthRoutesState) -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/callback", get(oauth_callback))
        .with_state(state)
}

async fn me(
    State(state): State<AuthRoutesState>,
    RequestTokens(store): RequestTokens,
) -> Result<Response, ApiError> {
    if store.refresh_token().is_some() && state.refresher.is_expiring_soon(&store) {
        if let Err(e) = state.refresher.refresh(&store).await {
            debug!(error = %e, "Refresh before /me failed");
        }
    }
    if store.get().is_none() {
        return Err(AuthError::NoCredential(Credential::Access).into());
    }

    let response = state
        .api
        .fetch(&store, FetchRequest::get(ME_PATH))
        .await?
        .error_for_status()?;

    let user = User::from_body(&response.body)
        .ok_or_else(|| ApiError::from(AuthError::Decode("No user in response".into())))?;
    let data = serde_json::to_value(&user).map_err(|_| ApiError::internal("Encoding error"))?;

    Ok(store.apply(Reply::ok("OK", Some(data)).into_response()))
}

/// Drop token fields so tokens only ever reach the browser as cookies.
fn strip_tokens(mut body: Value) -> Value {
    fn strip(value: &mut Value) {
        if let Value::Object(map) = value {
            for field in TOKEN_FIELDS {
                map.remove(*field);
            }
        }
    }
    strip(&mut body);
    if let Some(data) = body.get_mut("data") {
        strip(data);
    }
    body
}

async fn login(
    State(state): State<AuthRoutesState>,
    RequestTokens(store): RequestTokens,
    body: Bytes,
) -> Result<Response, ApiError> {
    let fields = parse_json_object(&body)?;
    let request = FetchRequest::post(LOGIN_PATH).json(Value::Object(fields));

    let response = state
        .api
        .fetch_with_token(None, request)
        .await?
        .error_for_status()?;

    let tokens = IssuedTokens::from_body(&response.body)
        .ok_or_else(|| ApiError::from(AuthError::Decode("No access token issued".into())))?;
    tokens.persist(&store);

    let user = User::from_body(&response.body);
    info!(user_id = user.as_ref().map(|u| u.id.as_str()).unwrap_or("-"), "Login relayed");

    let data = match user {
        Some(user) => json!({ "user": user }),
        None => strip_tokens(response.data()),
    };
    Ok(store.apply(Reply::ok("Signed in", Some(data)).into_response()))
}

async fn refresh(
    State(state): State<AuthRoutesState>,
    RequestTokens(store): RequestTokens,
) -> Response {
    match state.refresher.refresh(&store).await {
        Ok(()) => store.apply(Reply::ok("Token refreshed", None).into_response()),
        Err(e) => e.into_response(),
    }
}

async fn logout(
    State(state): State<AuthRoutesState>,
    RequestTokens(store): RequestTokens,
) -> Response {
    if store.get().is_some() {
        let result = state
            .api
            .fetch(&store, FetchRequest::post(LOGOUT_PATH))
            .await
            .and_then(|r| r.error_for_status());
        if let Err(e) = result {
            warn!(error = %e, "Backend logout failed, clearing cookies anyway");
        }
    }
    store.clear();
    info!("Logout relayed");
    store.apply(Reply::ok("Logged out", None).into_response())
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn sign_in_with_error(sign_in_path: &str, error: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(error.as_bytes()).collect();
    format!("{}?error={}", sign_in_path, encoded)
}

async fn oauth_callback(
    State(state): State<AuthRoutesState>,
    RequestTokens(store): RequestTokens,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error {
        warn!(error = %error, "OAuth provider returned an error");
        return Redirect::temporary(&sign_in_with_error(&state.sign_in_path, &error))
            .into_response();
    }
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return Redirect::temporary(&sign_in_with_error(&state.sign_in_path, "missing_code"))
            .into_response();
    };

    let request = FetchRequest::post(OAUTH_CALLBACK_PATH)
        .json(json!({ "code": code, "state": query.state }));

    let tokens = match exchange_code(&state, request).await {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!(error = %e, "OAuth code exchange failed");
            return Redirect::temporary(&sign_in_with_error(&state.sign_in_path, "oauth_failed"))
                .into_response();
        }
    };

    tokens.persist(&store);
    info!("OAuth sign-in completed");
    store.apply(Redirect::temporary(&state.dashboard_path).into_response())
}

async fn exchange_code(
    state: &AuthRoutesState,
    request: FetchRequest,
) -> Result<IssuedTokens, AuthError> {
    let response = state
        .api
        .fetch_with_token(None, request)
        .await?
        .error_for_status()?;
    IssuedTokens::from_body(&response.body)
        .ok_or_else(|| AuthError::Decode("No access token issued".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tokens() {
        let body = json!({
            "access_token": "a",
            "data": {"accessToken": "a", "refreshToken": "r", "profile": {"id": "u1"}}
        });
        assert_eq!(
            strip_tokens(body),
            json!({"data": {"profile": {"id": "u1"}}})
        );
    }

    #[test]
    fn test_sign_in_with_error_encodes() {
        assert_eq!(
            sign_in_with_error("/sign-in", "access denied"),
            "/sign-in?error=access+denied"
        );
    }
}
