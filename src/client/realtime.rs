//! Realtime connection seam used by the session.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::user::User;
use crate::auth::AuthError;
use crate::presence::{OnlineUsers, PresenceGuard, PresenceHub, ServerEvent};

/// An open realtime connection.
pub trait RealtimeConnection: Send + Sync {
    fn close(self: Box<Self>);
}

/// Opens realtime connections for an authenticated user.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(
        &self,
        token: &str,
        user: &User,
    ) -> Result<Box<dyn RealtimeConnection>, AuthError>;
}

/// Connector for sessions that run without a realtime channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRealtime;

struct NoConnection;

impl RealtimeConnection for NoConnection {
    fn close(self: Box<Self>) {}
}

#[async_trait]
impl RealtimeConnector for NoRealtime {
    async fn connect(
        &self,
        _token: &str,
        _user: &User,
    ) -> Result<Box<dyn RealtimeConnection>, AuthError> {
        Ok(Box::new(NoConnection))
    }
}

/// Connects sessions to an in-process [`PresenceHub`].
#[derive(Debug, Clone)]
pub struct HubConnector {
    hub: Arc<PresenceHub>,
}

impl HubConnector {
    pub fn new(hub: Arc<PresenceHub>) -> Self {
        Self { hub }
    }
}

/// Presence connection to a [`PresenceHub`], tracking online users.
pub struct HubConnection {
    guard: PresenceGuard,
    events: Mutex<broadcast::Receiver<ServerEvent>>,
    online: Mutex<OnlineUsers>,
}

impl HubConnection {
    /// Drain pending events and return the current online set.
    pub fn online_users(&self) -> Vec<String> {
        let (Ok(mut events), Ok(mut online)) = (self.events.lock(), self.online.lock()) else {
            return Vec::new();
        };
        loop {
            match events.try_recv() {
                Ok(event) => {
                    online.apply(&event);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Presence events lagged");
                }
                Err(_) => break,
            }
        }
        online.to_vec()
    }

    pub fn user_id(&self) -> &str {
        self.guard.user_id()
    }
}

impl RealtimeConnection for HubConnection {
    fn close(self: Box<Self>) {
        self.guard.leave();
    }
}

#[async_trait]
impl RealtimeConnector for HubConnector {
    async fn connect(
        &self,
        _token: &str,
        user: &User,
    ) -> Result<Box<dyn RealtimeConnection>, AuthError> {
        Ok(Box::new(self.open(user)))
    }
}

impl HubConnector {
    /// Join the hub as `user` and seed the online set from a snapshot.
    pub fn open(&self, user: &User) -> HubConnection {
        let events = self.hub.subscribe();
        let guard = self.hub.join(&user.id);
        let mut online = OnlineUsers::new();
        online.apply(&ServerEvent::OnlineUsers {
            user_ids: self.hub.online_users(),
        });
        HubConnection {
            guard,
            events: Mutex::new(events),
            online: Mutex::new(online),
        }
    }
}
