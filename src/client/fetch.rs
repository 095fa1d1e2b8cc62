//! Authenticated fetch against the backend API.
//!
//! The caller chooses where the bearer comes from by passing a
//! [`TokenStore`]: a [`RequestTokenStore`](crate::auth::RequestTokenStore)
//! inside gateway routes, a [`MemoryTokenStore`](crate::auth::MemoryTokenStore)
//! for a client session.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::{AuthError, TokenStore};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Request body variants.
#[derive(Debug, Default)]
pub enum FetchBody {
    #[default]
    Empty,
    Json(Value),
    /// Multipart form data; reqwest sets the boundary content type.
    Multipart(Form),
}

/// A request to send through [`ApiClient::fetch`].
#[derive(Debug)]
pub struct FetchRequest {
    pub method: Method,
    pub path: String,
    pub body: FetchBody,
    pub headers: HeaderMap,
}

impl FetchRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: FetchBody::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = FetchBody::Json(body);
        self
    }

    pub fn multipart(mut self, form: Form) -> Self {
        self.body = FetchBody::Multipart(form);
        self
    }

    /// Add or override a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }
}

/// Backend response with its JSON body.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The backend's `message` (or `error`) field.
    pub fn message(&self) -> Option<&str> {
        self.body
            .get("message")
            .or_else(|| self.body.get("error"))
            .and_then(Value::as_str)
    }

    /// The backend's `data` field, or the whole body when there is none.
    pub fn data(&self) -> Value {
        match self.body.get("data") {
            Some(data) => data.clone(),
            None => self.body.clone(),
        }
    }

    /// Convert a non-2xx response into [`AuthError::Upstream`].
    pub fn error_for_status(self) -> Result<Self, AuthError> {
        if self.is_success() {
            return Ok(self);
        }
        let message = self
            .message()
            .map(str::to_string)
            .or_else(|| self.status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "Request failed".to_string());
        Err(AuthError::Upstream {
            status: axum::http::StatusCode::from_u16(self.status.as_u16())
                .unwrap_or(axum::http::StatusCode::BAD_GATEWAY),
            message,
        })
    }
}

/// HTTP client for the backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &Url) -> Self {
        Self::with_client(
            reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
        )
    }

    pub fn with_client(http: reqwest::Client, base_url: &Url) -> Self {
        Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send `request` with the store's access token attached, if any.
    ///
    /// A missing token degrades to an anonymous request. A 401 is returned
    /// as a normal response; refreshing is the caller's decision.
    pub async fn fetch(
        &self,
        store: &dyn TokenStore,
        request: FetchRequest,
    ) -> Result<FetchResponse, AuthError> {
        let token = store.get();
        self.fetch_with_token(token.as_deref(), request).await
    }

    /// Send `request` with an explicit bearer (or none).
    pub async fn fetch_with_token(
        &self,
        token: Option<&str>,
        request: FetchRequest,
    ) -> Result<FetchResponse, AuthError> {
        let FetchRequest {
            method,
            path,
            body,
            headers,
        } = request;
        let url = self.url(&path);

        let mut builder = self.http.request(method.clone(), &url);

        builder = match body {
            FetchBody::Empty => builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE),
            FetchBody::Json(value) => builder
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(value.to_string()),
            FetchBody::Multipart(form) => builder.multipart(form),
        };

        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        // Replaces same-named defaults set above.
        builder = builder.headers(headers);

        debug!(method = %method, url = %url, authenticated = token.is_some(), "Backend request");

        let response = builder.send().await.map_err(AuthError::from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(AuthError::from_reqwest)?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({ "message": text }))
        };

        Ok(FetchResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new(&Url::parse("http://backend.local/api/").unwrap());
        assert_eq!(client.url("/auth/me"), "http://backend.local/api/auth/me");
        assert_eq!(client.url("auth/me"), "http://backend.local/api/auth/me");
    }

    #[test]
    fn test_header_override() {
        let request = FetchRequest::post("/x").header("content-type", "text/plain");
        assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_message_and_data() {
        let response = FetchResponse {
            status: StatusCode::OK,
            body: json!({"success": true, "message": "ok", "data": {"id": 1}}),
        };
        assert_eq!(response.message(), Some("ok"));
        assert_eq!(response.data(), json!({"id": 1}));

        let bare = FetchResponse {
            status: StatusCode::OK,
            body: json!({"id": 2}),
        };
        assert_eq!(bare.data(), json!({"id": 2}));
    }

    #[test]
    fn test_error_for_status_uses_backend_message() {
        let response = FetchResponse {
            status: StatusCode::FORBIDDEN,
            body: json!({"error": "Not a member"}),
        };
        let err = response.error_for_status().unwrap_err();
        assert_eq!(
            err,
            AuthError::Upstream {
                status: axum::http::StatusCode::FORBIDDEN,
                message: "Not a member".into()
            }
        );
    }

    #[test]
    fn test_error_for_status_falls_back_to_reason() {
        let response = FetchResponse {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: Value::Null,
        };
        let err = response.error_for_status().unwrap_err();
        assert_eq!(err.message(), "Service Unavailable");
    }
}
