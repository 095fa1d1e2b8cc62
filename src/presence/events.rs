//! Wire messages of the presence channel.

use serde::{Deserialize, Serialize};

/// Online status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Offline,
}

/// Messages pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// A user's status changed
    #[serde(rename = "user:status")]
    UserStatus {
        #[serde(rename = "userId")]
        user_id: String,
        status: Status,
    },
    /// Snapshot answering `get_online_users`
    #[serde(rename = "online_users")]
    OnlineUsers {
        #[serde(rename = "userIds")]
        user_ids: Vec<String>,
    },
    /// Keepalive
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "error")]
    Error { message: String },
}

/// Messages sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    GetOnlineUsers,
}
