//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Which credential was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Access,
    Refresh,
}

/// Errors produced by the token lifecycle and authenticated fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No access or refresh token available
    NoCredential(Credential),
    /// The backend answered with a non-2xx status
    Upstream { status: StatusCode, message: String },
    /// Transport failure talking to the backend
    Connection(String),
    /// Malformed token or response payload
    Decode(String),
}

/// Message used when the backend could not be reached.
pub const CONNECTION_ERROR_MESSAGE: &str = "Failed to reach server";

impl AuthError {
    /// Stable machine-readable code, suitable for JSON `error` fields.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NoCredential(Credential::Access) => "NoAccessToken",
            AuthError::NoCredential(Credential::Refresh) => "NoRefreshToken",
            AuthError::Upstream { .. } => "UpstreamFailure",
            AuthError::Connection(_) => "ConnectionError",
            AuthError::Decode(_) => "DecodeError",
        }
    }

    /// HTTP status a gateway route should answer with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NoCredential(_) => StatusCode::UNAUTHORIZED,
            AuthError::Upstream { status, .. } => *status,
            AuthError::Connection(_) | AuthError::Decode(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Human-readable message passed through to the browser.
    pub fn message(&self) -> String {
        match self {
            AuthError::NoCredential(Credential::Access) => "Unauthorized".to_string(),
            AuthError::NoCredential(Credential::Refresh) => "No refresh token".to_string(),
            AuthError::Upstream { message, .. } => message.clone(),
            AuthError::Connection(_) => CONNECTION_ERROR_MESSAGE.to_string(),
            AuthError::Decode(_) => "Invalid response from server".to_string(),
        }
    }

    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AuthError::Decode(e.to_string())
        } else {
            AuthError::Connection(e.to_string())
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NoCredential(Credential::Access) => write!(f, "No access token"),
            AuthError::NoCredential(Credential::Refresh) => write!(f, "No refresh token"),
            AuthError::Upstream { status, message } => {
                write!(f, "Backend returned {}: {}", status.as_u16(), message)
            }
            AuthError::Connection(e) => write!(f, "Connection error: {}", e),
            AuthError::Decode(e) => write!(f, "Decode error: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    error: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                success: false,
                message: self.message(),
                error: self.code(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            AuthError::NoCredential(Credential::Refresh).code(),
            "NoRefreshToken"
        );
        assert_eq!(AuthError::Connection("x".into()).code(), "ConnectionError");
    }

    #[test]
    fn test_upstream_keeps_status_and_message() {
        let err = AuthError::Upstream {
            status: StatusCode::PAYMENT_REQUIRED,
            message: "Card declined".into(),
        };
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.message(), "Card declined");
    }

    #[test]
    fn test_connection_error_is_generic() {
        let err = AuthError::Connection("tcp reset by peer".into());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.message(), CONNECTION_ERROR_MESSAGE);
    }
}
