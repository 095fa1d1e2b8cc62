//! Server-side presence registry.
//!
//! Counts live connections per user. The first connection of a user
//! broadcasts `online`, the last disconnect broadcasts `offline`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::events::{ServerEvent, Status};

const EVENT_CAPACITY: usize = 256;

/// Registry of online users shared by all presence connections.
#[derive(Debug)]
pub struct PresenceHub {
    connections: Mutex<HashMap<String, usize>>,
    events: broadcast::Sender<ServerEvent>,
}

impl Default for PresenceHub {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            connections: Mutex::new(HashMap::new()),
            events,
        }
    }
}

impl PresenceHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Receive status changes broadcast after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Sorted list of users with at least one live connection.
    pub fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = match self.connections.lock() {
            Ok(connections) => connections.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        users.sort();
        users
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.connections
            .lock()
            .map(|c| c.contains_key(user_id))
            .unwrap_or(false)
    }

    /// Register a connection for `user_id`. The user stays online until the
    /// returned guard is dropped or [`PresenceGuard::leave`] is called.
    pub fn join(self: &Arc<Self>, user_id: &str) -> PresenceGuard {
        let first = match self.connections.lock() {
            Ok(mut connections) => {
                let count = connections.entry(user_id.to_string()).or_insert(0);
                *count += 1;
                *count == 1
            }
            Err(_) => false,
        };

        let connection_id = Uuid::new_v4();
        debug!(user_id = %user_id, connection_id = %connection_id, "Presence connection opened");

        if first {
            info!(user_id = %user_id, "User online");
            self.broadcast(user_id, Status::Online);
        }

        PresenceGuard {
            hub: Arc::clone(self),
            user_id: user_id.to_string(),
            connection_id,
            left: false,
        }
    }

    fn leave(&self, user_id: &str) {
        let last = match self.connections.lock() {
            Ok(mut connections) => match connections.get_mut(user_id) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    connections.remove(user_id);
                    true
                }
                None => false,
            },
            Err(_) => false,
        };

        if last {
            info!(user_id = %user_id, "User offline");
            self.broadcast(user_id, Status::Offline);
        }
    }

    fn broadcast(&self, user_id: &str, status: Status) {
        // No subscribers is not an error.
        let _ = self.events.send(ServerEvent::UserStatus {
            user_id: user_id.to_string(),
            status,
        });
    }
}

/// Keeps one presence connection registered.
#[derive(Debug)]
pub struct PresenceGuard {
    hub: Arc<PresenceHub>,
    user_id: String,
    connection_id: Uuid,
    left: bool,
}

impl PresenceGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Unregister now instead of on drop.
    pub fn leave(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.left {
            self.left = true;
            debug!(user_id = %self.user_id, connection_id = %self.connection_id, "Presence connection closed");
            self.hub.leave(&self.user_id);
        }
    }
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        self.release();
    }
}
