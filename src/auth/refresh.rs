//! Refresh coordination: decide when to renew the access token and do it.
//!
//! Exchanges the refresh token at `POST /auth/refresh` and writes the result
//! back through the caller's [`TokenStore`]. There is no retry and no lock
//! across contexts: two tabs refreshing at once each get an answer from the
//! backend, which decides how rotated refresh tokens behave.

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::claims;
use super::errors::{AuthError, Credential};
use super::store::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, TokenStore};
use crate::client::{ApiClient, FetchRequest};

/// Backend path of the refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Token pair issued by the auth service (refresh, login, OAuth callback).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuedTokens {
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub refresh_expires_in: Option<u64>,
}

/// First non-empty string among `names`.
fn string_field(object: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| object.get(*name).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Lifetime in seconds from an integer, a float, or a numeric string.
/// Anything else reads as unspecified.
fn seconds_field(object: &Map<String, Value>, names: &[&str]) -> Option<u64> {
    names
        .iter()
        .filter_map(|name| object.get(*name))
        .find_map(|value| match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<u64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f as u64)
                })
            }
            _ => None,
        })
}

impl IssuedTokens {
    /// Read tokens from a response body, accepting a `data` wrapper.
    ///
    /// Only a non-empty access token is required; malformed lifetimes fall
    /// back to the defaults.
    pub fn from_body(body: &Value) -> Option<Self> {
        let parse = |v: &Value| {
            let object = v.as_object()?;
            let access_token = string_field(object, &["access_token", "accessToken"])?;
            Some(IssuedTokens {
                access_token: Some(access_token),
                expires_in: seconds_field(object, &["expires_in", "expiresIn"]),
                refresh_token: string_field(object, &["refresh_token", "refreshToken"]),
                refresh_expires_in: seconds_field(
                    object,
                    &["refresh_expires_in", "refreshExpiresIn"],
                ),
            })
        };
        parse(body).or_else(|| body.get("data").and_then(parse))
    }

    /// Write the tokens into `store`, applying default lifetimes.
    pub fn persist(&self, store: &dyn TokenStore) {
        if let Some(access) = &self.access_token {
            store.set(access, self.expires_in.unwrap_or(DEFAULT_ACCESS_TTL_SECS));
        }
        if let Some(refresh) = &self.refresh_token {
            store.set_refresh_token(
                refresh,
                self.refresh_expires_in.unwrap_or(DEFAULT_REFRESH_TTL_SECS),
            );
        }
    }
}

/// Renews access tokens through the auth service.
#[derive(Debug, Clone)]
pub struct RefreshCoordinator {
    api: ApiClient,
}

impl RefreshCoordinator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// True if the store's access token is absent, undecodable, or has
    /// fewer than five minutes left.
    pub fn is_expiring_soon(&self, store: &dyn TokenStore) -> bool {
        claims::is_expiring_soon(store.get().as_deref())
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Never panics and never clears the existing access token on failure.
    pub async fn refresh(&self, store: &dyn TokenStore) -> Result<(), AuthError> {
        let refresh_token = store
            .refresh_token()
            .ok_or(AuthError::NoCredential(Credential::Refresh))?;

        let request =
            FetchRequest::post(REFRESH_PATH).json(json!({ "refresh_token": refresh_token }));

        let response = match self.api.fetch_with_token(None, request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return Err(e);
            }
        };

        let response = response.error_for_status().inspect_err(|e| {
            warn!(error = %e, "Token refresh rejected");
        })?;

        let tokens = IssuedTokens::from_body(&response.body).ok_or_else(|| {
            warn!("Token refresh response carried no access token");
            AuthError::Upstream {
                status: axum::http::StatusCode::BAD_GATEWAY,
                message: "Token refresh failed".to_string(),
            }
        })?;

        tokens.persist(store);
        info!(
            expires_in = tokens.expires_in.unwrap_or(DEFAULT_ACCESS_TTL_SECS),
            rotated = tokens.refresh_token.is_some(),
            "Access token refreshed"
        );
        Ok(())
    }

    /// Refresh only when the current token is expiring soon.
    pub async fn ensure_fresh(&self, store: &dyn TokenStore) -> Result<(), AuthError> {
        if self.is_expiring_soon(store) {
            self.refresh(store).await
        } else {
            Ok(())
        }
    }
}
