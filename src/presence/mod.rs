//! Online-user presence.
//!
//! [`PresenceHub`] is the server-side registry behind the websocket channel;
//! [`OnlineUsers`] is the client-side set rebuilt from `user:status` events.

mod events;
mod hub;
mod tracker;

pub use events::{ClientRequest, ServerEvent, Status};
pub use hub::{PresenceGuard, PresenceHub};
pub use tracker::OnlineUsers;
