//! Access token claim inspection.
//!
//! Tokens are issued and verified by the backend. The gateway only reads the
//! `exp` claim to decide when to refresh, so signatures are not checked here.

use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Refresh when fewer than this many seconds remain: 5 minutes.
pub const REFRESH_WINDOW_SECS: u64 = 5 * 60;

/// Claims the gateway cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpiryClaims {
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Subject (user id), when present
    #[serde(default)]
    pub sub: Option<String>,
}

/// Errors that can occur while decoding a token payload.
#[derive(Debug)]
pub enum ClaimsError {
    /// Token structure or payload could not be decoded
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for ClaimsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimsError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            ClaimsError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for ClaimsError {}

/// Decode the payload of a JWT without verifying its signature or expiry.
///
/// Works for any signing algorithm, since no key is involved.
pub fn decode_unverified(token: &str) -> Result<ExpiryClaims, ClaimsError> {
    jsonwebtoken::dangerous::insecure_decode::<ExpiryClaims>(token)
        .map(|data| data.claims)
        .map_err(ClaimsError::Decoding)
}

/// Current Unix time in seconds.
pub fn now_secs() -> Result<u64, ClaimsError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| ClaimsError::TimeError)
}

/// Whether `token` expires within `window` seconds of `now`.
///
/// Absent or undecodable tokens count as expiring.
pub fn expires_within(token: Option<&str>, now: u64, window: u64) -> bool {
    let Some(token) = token else {
        return true;
    };
    match decode_unverified(token) {
        Ok(claims) => claims.exp.saturating_sub(now) < window,
        Err(e) => {
            tracing::debug!(error = %e, "Treating undecodable token as expiring");
            true
        }
    }
}

/// Whether `token` is absent, undecodable, or within the refresh window.
pub fn is_expiring_soon(token: Option<&str>) -> bool {
    match now_secs() {
        Ok(now) => expires_within(token, now, REFRESH_WINDOW_SECS),
        Err(_) => true,
    }
}
