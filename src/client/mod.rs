//! Client-side pieces of the token lifecycle: authenticated fetch, the
//! session provider, and the route guard.

mod fetch;
mod guard;
mod realtime;
mod session;
mod user;

pub use fetch::{ApiClient, FetchBody, FetchRequest, FetchResponse};
pub use guard::{Guard, GuardDecision, Requirement};
pub use realtime::{HubConnection, HubConnector, NoRealtime, RealtimeConnection, RealtimeConnector};
pub use session::{AuthSession, LOGIN_PATH, LOGOUT_PATH, LoginCredentials, ME_PATH, SessionState};
pub use user::{User, UserRole};
