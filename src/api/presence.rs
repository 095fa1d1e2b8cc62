//! Presence websocket.
//!
//! The bearer is passed at connect time as `?token=`, an `Authorization`
//! header, or the access cookie. The backend's `/auth/me` identifies the
//! user; the connection then counts toward that user being online.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::auth::{RequestTokenStore, TokenStore};
use crate::client::{ApiClient, FetchRequest, ME_PATH, User};
use crate::impl_has_cookie_settings;
use crate::presence::{ClientRequest, PresenceHub, ServerEvent};

const PING_INTERVAL_SECS: u64 = 30;

/// State for the presence endpoint.
#[derive(Clone)]
pub struct PresenceState {
    pub api: ApiClient,
    pub hub: Arc<PresenceHub>,
    pub secure_cookies: bool,
}

impl_has_cookie_settings!(PresenceState);

#[derive(Debug, Deserialize)]
struct ConnectQuery {
    token: Option<String>,
}

pub fn router(state: PresenceState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/online", get(online_users))
        .with_state(state)
}

/// Snapshot of online users for clients without a socket.
async fn online_users(State(state): State<PresenceState>) -> impl IntoResponse {
    axum::Json(ServerEvent::OnlineUsers {
        user_ids: state.hub.online_users(),
    })
}

async fn ws_handler(
    State(state): State<PresenceState>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, "Expected WebSocket upgrade").into_response();
        }
    };

    let token = query
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| RequestTokenStore::from_headers(&headers, state.secure_cookies).get());
    let Some(token) = token else {
        return (StatusCode::UNAUTHORIZED, "Not authenticated").into_response();
    };

    // The backend decides whether the token is valid
    let user = match state
        .api
        .fetch_with_token(Some(&token), FetchRequest::get(ME_PATH))
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(response) => match User::from_body(&response.body) {
            Some(user) => user,
            None => return (StatusCode::UNAUTHORIZED, "Unknown user").into_response(),
        },
        Err(e) if e.status_code() == StatusCode::UNAUTHORIZED => {
            return (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
        }
        Err(e) => {
            warn!(error = %e, "Presence identity lookup failed");
            return (StatusCode::BAD_GATEWAY, "Failed to reach server").into_response();
        }
    };

    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub, user))
}

async fn handle_socket(socket: WebSocket, hub: Arc<PresenceHub>, user: User) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before joining so our own online event is delivered too
    let mut events = hub.subscribe();
    let guard = hub.join(&user.id);

    let (tx, mut rx) = mpsc::channel::<ServerEvent>(32);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    let tx_events = tx.clone();
    let mut events_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if tx_events.send(event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Presence subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let tx_ping = tx.clone();
    let mut ping_task = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(PING_INTERVAL_SECS));
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx_ping.send(ServerEvent::Ping).await.is_err() {
                break;
            }
        }
    });

    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientRequest>(&text) {
                    Ok(ClientRequest::GetOnlineUsers) => {
                        let snapshot = ServerEvent::OnlineUsers {
                            user_ids: recv_hub.online_users(),
                        };
                        if tx.send(snapshot).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        let error = ServerEvent::Error {
                            message: "Unknown request".to_string(),
                        };
                        if tx.send(error).await.is_err() {
                            break;
                        }
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {},
        _ = &mut recv_task => {},
        _ = &mut events_task => {},
        _ = &mut ping_task => {},
    }

    send_task.abort();
    recv_task.abort();
    events_task.abort();
    ping_task.abort();

    guard.leave();
    info!(user_id = %user.id, "Presence socket disconnected");
}
