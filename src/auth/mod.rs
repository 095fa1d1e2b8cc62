//! Access-token lifecycle.
//!
//! Stores hold the current access and refresh tokens for one execution
//! context, claims inspection decides when a token is about to expire, and
//! the refresh coordinator renews it through the backend auth service.

pub mod claims;
mod cookie;
mod errors;
mod extractors;
mod refresh;
mod state;
mod store;

pub use claims::{REFRESH_WINDOW_SECS, expires_within, is_expiring_soon};
pub use cookie::{
    ACCESS_COOKIE_CANDIDATES, ACCESS_COOKIE_NAME, REFRESH_COOKIE_CANDIDATES, REFRESH_COOKIE_NAME,
    get_bearer, get_cookie, get_first_cookie,
};
pub use errors::{AuthError, CONNECTION_ERROR_MESSAGE, Credential};
pub use extractors::{RequestTokens, RequireBearer};
pub use refresh::{IssuedTokens, REFRESH_PATH, RefreshCoordinator};
pub use state::HasCookieSettings;
pub use store::{
    DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, MemoryTokenStore, RequestTokenStore,
    TokenStore,
};
