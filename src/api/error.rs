//! Shared error and reply handling for gateway routes.
//!
//! Every route answers with a `{success, message, data?}` JSON body, errors
//! included, so the browser never sees a bare status.

use axum::{
    Json,
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::client::FetchResponse;

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    /// Backend status and message passed through
    Upstream(StatusCode, String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Upstream(status, msg) => (status, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match &e {
            AuthError::NoCredential(_) => ApiError::Unauthorized(e.message()),
            AuthError::Upstream { status, .. } => {
                warn!(status = status.as_u16(), error = %e, "Backend rejected request");
                ApiError::Upstream(*status, e.message())
            }
            AuthError::Connection(_) | AuthError::Decode(_) => {
                error!(error = %e, "Backend unavailable");
                ApiError::BadGateway(e.message())
            }
        }
    }
}

/// Body shape shared by every gateway response.
#[derive(Debug, Serialize)]
pub struct Reply {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Reply {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    /// Wrap a successful backend response, keeping its message if it has one.
    pub fn relay(response: &FetchResponse, default_message: &str) -> Self {
        let data = match &response.body {
            Value::Object(map) if map.contains_key("data") => {
                map.get("data").filter(|v| !v.is_null()).cloned()
            }
            // An envelope without data.
            Value::Object(map) if map.contains_key("success") || map.contains_key("message") => {
                None
            }
            Value::Null => None,
            other => Some(other.clone()),
        };
        Self::ok(response.message().unwrap_or(default_message), data)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (
            status,
            Json(Reply {
                success: false,
                message,
                data: None,
            }),
        )
            .into_response()
    }
}

/// Parse a JSON object body; an empty body reads as `{}`.
pub fn parse_json_object(body: &Bytes) -> Result<serde_json::Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(_) => Err(ApiError::bad_request("Invalid JSON body")),
    }
}

/// Validate an identifier that will be placed in a backend path.
pub fn validate_id(id: &str, what: &str) -> Result<(), ApiError> {
    if id.is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", what)));
    }
    if id.len() > 64 {
        return Err(ApiError::bad_request(format!("{} is too long", what)));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::bad_request(format!("Invalid {}", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_object() {
        assert!(parse_json_object(&Bytes::from_static(b"")).unwrap().is_empty());
        let map = parse_json_object(&Bytes::from_static(br#"{"a":1}"#)).unwrap();
        assert_eq!(map["a"], json!(1));
        assert!(parse_json_object(&Bytes::from_static(b"[1]")).is_err());
        assert!(parse_json_object(&Bytes::from_static(b"{oops")).is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("c1", "communityId").is_ok());
        assert!(validate_id("65f0a1b2-c3_d4", "communityId").is_ok());
        assert!(validate_id("", "communityId").is_err());
        assert!(validate_id("../admin", "communityId").is_err());
        assert!(validate_id(&"a".repeat(65), "communityId").is_err());
    }

    #[test]
    fn test_auth_error_mapping() {
        let err: ApiError = AuthError::Connection("refused".into()).into();
        assert!(matches!(err, ApiError::BadGateway(_)));

        let err: ApiError = AuthError::Upstream {
            status: StatusCode::PAYMENT_REQUIRED,
            message: "Card declined".into(),
        }
        .into();
        assert_eq!(
            err.status_and_message(),
            (StatusCode::PAYMENT_REQUIRED, "Card declined".to_string())
        );
    }
}
