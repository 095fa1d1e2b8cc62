//! Token stores: where the current access and refresh tokens live.
//!
//! Two implementations, picked by the caller's execution context:
//! - [`RequestTokenStore`]: request-scoped cookie jar used by gateway routes.
//!   Reads the incoming `Authorization` header and cookies, and queues
//!   `Set-Cookie` headers for the response.
//! - [`MemoryTokenStore`]: in-process storage for one client session.

use std::sync::{Mutex, RwLock};

use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::Response;

use super::cookie::{
    ACCESS_COOKIE_CANDIDATES, ACCESS_COOKIE_NAME, REFRESH_COOKIE_CANDIDATES, REFRESH_COOKIE_NAME,
    auth_cookie, clear_cookie, get_bearer, get_first_cookie,
};

/// Access token lifetime used when the backend omits `expires_in`: 2 hours.
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 7200;

/// Refresh token lifetime used when the backend omits it: 30 days.
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Single source of truth for the current tokens of one execution context.
///
/// Failures are silent: an unavailable store reads as empty.
pub trait TokenStore: Send + Sync {
    /// Current access token, without expiry validation.
    fn get(&self) -> Option<String>;
    /// Replace the access token.
    fn set(&self, token: &str, ttl_secs: u64);
    /// Current refresh token.
    fn refresh_token(&self) -> Option<String>;
    /// Replace the refresh token (backend rotation or login).
    fn set_refresh_token(&self, token: &str, ttl_secs: u64);
    /// Remove both tokens.
    fn clear(&self);
}

/// Overrides written during the request, shadowing the incoming cookies.
#[derive(Debug, Default)]
struct Written {
    access: Option<Option<String>>,
    refresh: Option<Option<String>>,
    set_cookies: Vec<String>,
}

/// Request-scoped token store backed by the request's cookie jar.
#[derive(Debug)]
pub struct RequestTokenStore {
    incoming_access: Option<String>,
    incoming_refresh: Option<String>,
    secure_cookies: bool,
    written: Mutex<Written>,
}

impl RequestTokenStore {
    /// Build from the incoming request headers.
    ///
    /// An `Authorization: Bearer` header takes precedence over cookies.
    pub fn from_headers(headers: &HeaderMap, secure_cookies: bool) -> Self {
        let incoming_access = get_bearer(headers)
            .or_else(|| get_first_cookie(headers, ACCESS_COOKIE_CANDIDATES))
            .map(str::to_string);
        let incoming_refresh =
            get_first_cookie(headers, REFRESH_COOKIE_CANDIDATES).map(str::to_string);

        Self {
            incoming_access,
            incoming_refresh,
            secure_cookies,
            written: Mutex::new(Written::default()),
        }
    }

    /// `Set-Cookie` values queued so far.
    pub fn set_cookies(&self) -> Vec<String> {
        self.written
            .lock()
            .map(|w| w.set_cookies.clone())
            .unwrap_or_default()
    }

    /// Append queued `Set-Cookie` headers to a response.
    pub fn apply(&self, mut response: Response) -> Response {
        let headers = response.headers_mut();
        for cookie in self.set_cookies() {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                headers.append(header::SET_COOKIE, value);
            }
        }
        response
    }

    fn write(&self, f: impl FnOnce(&mut Written)) {
        if let Ok(mut written) = self.written.lock() {
            f(&mut written);
        } else {
            tracing::warn!("Token store lock poisoned, dropping cookie update");
        }
    }
}

impl TokenStore for RequestTokenStore {
    fn get(&self) -> Option<String> {
        let written = self.written.lock().ok()?;
        match &written.access {
            Some(overridden) => overridden.clone(),
            None => self.incoming_access.clone(),
        }
    }

    fn set(&self, token: &str, ttl_secs: u64) {
        let cookie = auth_cookie(ACCESS_COOKIE_NAME, token, ttl_secs, self.secure_cookies);
        self.write(|w| {
            w.access = Some(Some(token.to_string()));
            w.set_cookies.push(cookie);
        });
    }

    fn refresh_token(&self) -> Option<String> {
        let written = self.written.lock().ok()?;
        match &written.refresh {
            Some(overridden) => overridden.clone(),
            None => self.incoming_refresh.clone(),
        }
    }

    fn set_refresh_token(&self, token: &str, ttl_secs: u64) {
        let cookie = auth_cookie(REFRESH_COOKIE_NAME, token, ttl_secs, self.secure_cookies);
        self.write(|w| {
            w.refresh = Some(Some(token.to_string()));
            w.set_cookies.push(cookie);
        });
    }

    fn clear(&self) {
        let secure = self.secure_cookies;
        self.write(|w| {
            w.access = Some(None);
            w.refresh = Some(None);
            for name in ACCESS_COOKIE_CANDIDATES.iter().chain(REFRESH_COOKIE_CANDIDATES) {
                w.set_cookies.push(clear_cookie(name, secure));
            }
        });
    }
}

#[derive(Debug, Clone)]
struct StoredToken {
    value: String,
    ttl_secs: u64,
}

/// In-memory token store for one client session.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    access: RwLock<Option<StoredToken>>,
    refresh: RwLock<Option<StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL the current access token was stored with.
    pub fn access_ttl(&self) -> Option<u64> {
        self.access.read().ok()?.as_ref().map(|t| t.ttl_secs)
    }

    /// TTL the current refresh token was stored with.
    pub fn refresh_ttl(&self) -> Option<u64> {
        self.refresh.read().ok()?.as_ref().map(|t| t.ttl_secs)
    }
}

fn replace(slot: &RwLock<Option<StoredToken>>, value: Option<StoredToken>) {
    if let Ok(mut guard) = slot.write() {
        *guard = value;
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.access.read().ok()?.as_ref().map(|t| t.value.clone())
    }

    fn set(&self, token: &str, ttl_secs: u64) {
        replace(
            &self.access,
            Some(StoredToken {
                value: token.to_string(),
                ttl_secs,
            }),
        );
    }

    fn refresh_token(&self) -> Option<String> {
        self.refresh.read().ok()?.as_ref().map(|t| t.value.clone())
    }

    fn set_refresh_token(&self, token: &str, ttl_secs: u64) {
        replace(
            &self.refresh,
            Some(StoredToken {
                value: token.to_string(),
                ttl_secs,
            }),
        );
    }

    fn clear(&self) {
        replace(&self.access, None);
        replace(&self.refresh, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(
                header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static(value),
            );
        }
        headers
    }

    #[test]
    fn test_request_store_reads_cookie() {
        let store = RequestTokenStore::from_headers(
            &headers(&[("cookie", "accessToken=a1; refreshToken=r1")]),
            false,
        );
        assert_eq!(store.get().as_deref(), Some("a1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
    }

    #[test]
    fn test_request_store_prefers_authorization_header() {
        let store = RequestTokenStore::from_headers(
            &headers(&[
                ("authorization", "Bearer from-header"),
                ("cookie", "access_token=from-cookie"),
            ]),
            false,
        );
        assert_eq!(store.get().as_deref(), Some("from-header"));
    }

    #[test]
    fn test_request_store_set_is_visible_and_queued() {
        let store =
            RequestTokenStore::from_headers(&headers(&[("cookie", "access_token=old")]), true);
        store.set("new", 3600);

        assert_eq!(store.get().as_deref(), Some("new"));
        assert_eq!(
            store.set_cookies(),
            vec!["access_token=new; HttpOnly; SameSite=Lax; Path=/; Max-Age=3600; Secure"]
        );
    }

    #[test]
    fn test_request_store_clear_expires_every_candidate() {
        let store = RequestTokenStore::from_headers(
            &headers(&[("cookie", "access_token=a; refresh_token=r")]),
            false,
        );
        store.clear();

        assert_eq!(store.get(), None);
        assert_eq!(store.refresh_token(), None);
        let cookies = store.set_cookies();
        assert_eq!(cookies.len(), 4);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
        assert!(cookies.iter().any(|c| c.starts_with("refreshToken=;")));
    }

    #[test]
    fn test_request_store_apply_appends_headers() {
        let store = RequestTokenStore::from_headers(&HeaderMap::new(), false);
        store.set("a", 10);
        store.set_refresh_token("r", 20);

        let response = store.apply(Response::new(axum::body::Body::empty()));
        let values: Vec<_> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values[0].starts_with("access_token=a;"));
        assert!(values[1].starts_with("refresh_token=r;"));
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(), None);

        store.set("abc", 3600);
        store.set_refresh_token("r", 60);
        assert_eq!(store.get().as_deref(), Some("abc"));
        assert_eq!(store.access_ttl(), Some(3600));
        assert_eq!(store.refresh_token().as_deref(), Some("r"));

        store.clear();
        assert_eq!(store.get(), None);
        assert_eq!(store.refresh_token(), None);
    }
}
