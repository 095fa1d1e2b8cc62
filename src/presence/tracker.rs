//! Client-side view of who is online.

use std::collections::HashSet;

use super::events::{ServerEvent, Status};

/// Set of online user ids maintained from server-pushed events.
#[derive(Debug, Clone, Default)]
pub struct OnlineUsers {
    users: HashSet<String>,
}

impl OnlineUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event. Returns true if the set changed.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::UserStatus {
                user_id,
                status: Status::Online,
            } => self.users.insert(user_id.clone()),
            ServerEvent::UserStatus {
                user_id,
                status: Status::Offline,
            } => self.users.remove(user_id),
            ServerEvent::OnlineUsers { user_ids } => {
                let next: HashSet<String> = user_ids.iter().cloned().collect();
                let changed = next != self.users;
                self.users = next;
                changed
            }
            ServerEvent::Ping | ServerEvent::Error { .. } => false,
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.users.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Sorted snapshot of online user ids.
    pub fn to_vec(&self) -> Vec<String> {
        let mut users: Vec<_> = self.users.iter().cloned().collect();
        users.sort();
        users
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(user_id: &str, status: Status) -> ServerEvent {
        ServerEvent::UserStatus {
            user_id: user_id.into(),
            status,
        }
    }

    #[test]
    fn test_online_then_offline() {
        let mut users = OnlineUsers::new();
        assert!(users.apply(&status("u1", Status::Online)));
        assert!(!users.apply(&status("u1", Status::Online)));
        assert!(users.is_online("u1"));

        assert!(users.apply(&status("u1", Status::Offline)));
        assert!(!users.is_online("u1"));
        assert!(users.is_empty());
    }

    #[test]
    fn test_snapshot_replaces_set() {
        let mut users = OnlineUsers::new();
        users.apply(&status("stale", Status::Online));

        let changed = users.apply(&ServerEvent::OnlineUsers {
            user_ids: vec!["b".into(), "a".into()],
        });
        assert!(changed);
        assert_eq!(users.to_vec(), vec!["a", "b"]);
        assert!(!users.is_online("stale"));
    }

    #[test]
    fn test_ping_is_ignored() {
        let mut users = OnlineUsers::new();
        assert!(!users.apply(&ServerEvent::Ping));
        assert_eq!(users.len(), 0);
    }
}
