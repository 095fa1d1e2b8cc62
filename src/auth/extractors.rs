//! Axum extractors that build the request-scoped token store.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::{AuthError, Credential};
use super::state::HasCookieSettings;
use super::store::{RequestTokenStore, TokenStore};

/// Token store for the current request. Never fails.
pub struct RequestTokens(pub RequestTokenStore);

impl<S> FromRequestParts<S> for RequestTokens
where
    S: HasCookieSettings + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestTokens(RequestTokenStore::from_headers(
            &parts.headers,
            state.secure_cookies(),
        )))
    }
}

/// Token store for a request that must carry a bearer credential, either in
/// `Authorization` or in one of the access cookie candidates.
///
/// Rejects with 401 before any backend call is made. The token is not
/// validated here; the backend is the authority.
pub struct RequireBearer(pub RequestTokenStore);

impl<S> FromRequestParts<S> for RequireBearer
where
    S: HasCookieSettings + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = RequestTokenStore::from_headers(&parts.headers, state.secure_cookies());
        if store.get().is_none() {
            tracing::debug!(path = %parts.uri.path(), "Rejecting request without credential");
            return Err(AuthError::NoCredential(Credential::Access));
        }
        Ok(RequireBearer(store))
    }
}
