//! Community membership proxy routes.
//!
//! - POST `/join` - Join a community
//! - POST `/checkout` - Start a paid membership checkout
//!
//! A backend `409 Conflict` means the user is already a member (or already
//! has a pending checkout), which is reported as success.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;
use tracing::info;

use super::error::{ApiError, Reply, parse_json_object, validate_id};
use crate::auth::{RequestTokenStore, RequireBearer};
use crate::client::{ApiClient, FetchRequest, FetchResponse};
use crate::impl_has_cookie_settings;

pub const JOINED_MESSAGE: &str = "Successfully joined community";
pub const ALREADY_MEMBER_MESSAGE: &str = "You are already a member of this community";
pub const CHECKOUT_MESSAGE: &str = "Checkout session created";

#[derive(Clone)]
pub struct CommunityState {
    pub api: ApiClient,
    pub secure_cookies: bool,
}

impl_has_cookie_settings!(CommunityState);

pub fn router(state: CommunityState) -> Router {
    Router::new()
        .route("/join", post(join_community))
        .route("/checkout", post(checkout))
        .with_state(state)
}

/// Which membership action a request performs.
#[derive(Debug, Clone, Copy)]
enum Action {
    Join,
    Checkout,
}

impl Action {
    fn segment(self) -> &'static str {
        match self {
            Action::Join => "join",
            Action::Checkout => "checkout",
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            Action::Join => JOINED_MESSAGE,
            Action::Checkout => CHECKOUT_MESSAGE,
        }
    }
}

async fn join_community(
    State(state): State<CommunityState>,
    RequireBearer(store): RequireBearer,
    body: Bytes,
) -> Result<Response, ApiError> {
    relay_action(&state, &store, Action::Join, &body).await
}

async fn checkout(
    State(state): State<CommunityState>,
    RequireBearer(store): RequireBearer,
    body: Bytes,
) -> Result<Response, ApiError> {
    relay_action(&state, &store, Action::Checkout, &body).await
}

async fn relay_action(
    state: &CommunityState,
    store: &RequestTokenStore,
    action: Action,
    body: &Bytes,
) -> Result<Response, ApiError> {
    let mut fields = parse_json_object(body)?;
    let community_id = match fields.remove("communityId") {
        Some(Value::String(id)) => id,
        Some(_) => return Err(ApiError::bad_request("Invalid communityId")),
        None => return Err(ApiError::bad_request("communityId is required")),
    };
    validate_id(&community_id, "communityId")?;

    let request = FetchRequest::post(format!(
        "/communities/{}/{}",
        community_id,
        action.segment()
    ))
    .json(Value::Object(fields));

    let response = state.api.fetch(store, request).await?;
    info!(
        community_id = %community_id,
        action = action.segment(),
        status = response.status.as_u16(),
        "Community action relayed"
    );

    Ok(store.apply(translate(action, response)?.into_response()))
}

fn translate(action: Action, response: FetchResponse) -> Result<Reply, ApiError> {
    if response.status.as_u16() == StatusCode::CONFLICT.as_u16() {
        let message = response.message().unwrap_or(ALREADY_MEMBER_MESSAGE);
        return Ok(Reply::ok(message, None));
    }
    let response = response.error_for_status()?;
    let data = Reply::relay(&response, action.success_message()).data;
    Ok(Reply::ok(action.success_message(), data))
}
