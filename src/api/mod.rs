mod auth;
mod community;
mod error;
mod payments;
mod presence;

use axum::Router;
use std::sync::Arc;

use crate::auth::RefreshCoordinator;
use crate::client::ApiClient;
use crate::presence::PresenceHub;

pub use community::{ALREADY_MEMBER_MESSAGE, CHECKOUT_MESSAGE, JOINED_MESSAGE};
pub use error::{ApiError, Reply};

/// Create the API router.
pub fn create_api_router(
    api: ApiClient,
    hub: Arc<PresenceHub>,
    secure_cookies: bool,
    sign_in_path: String,
    dashboard_path: String,
) -> Router {
    let auth_state = auth::AuthRoutesState {
        api: api.clone(),
        refresher: RefreshCoordinator::new(api.clone()),
        secure_cookies,
        sign_in_path,
        dashboard_path,
    };

    let community_state = community::CommunityState {
        api: api.clone(),
        secure_cookies,
    };

    let payments_state = payments::PaymentsState {
        api: api.clone(),
        secure_cookies,
    };

    let presence_state = presence::PresenceState {
        api,
        hub,
        secure_cookies,
    };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/community", community::router(community_state))
        .nest("/payments", payments::router(payments_state))
        .nest("/presence", presence::router(presence_state))
}
