//! Fan-out to connected client sessions.
//!
//! Unlike a bare `tokio::sync::broadcast` channel, sessions are tracked in an explicit
//! registry so a session whose send fails can be removed and never selected again by
//! a later `broadcast` — a broadcast channel's receivers don't support that per-
//! receiver removal, which is the behavior this component is required to have.

mod message;

pub use message::WebsocketMessage;

use std::collections::HashMap;
use std::sync::Mutex;

use scuttle_events::Event;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque handle to a long-lived client connection, owned by the [`Broadcaster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Holds the set of connected sessions and fans out broadcasted messages to each.
#[derive(Default)]
pub struct Broadcaster {
    sessions: Mutex<HashMap<SessionId, mpsc::UnboundedSender<WebsocketMessage>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a new session and returns its id plus the receiving half of its
    /// outbound channel (typically forwarded into an SSE/WebSocket response stream).
    pub fn connect(&self) -> (SessionId, mpsc::UnboundedReceiver<WebsocketMessage>) {
        let id = SessionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.lock().expect("broadcaster lock poisoned").insert(id, tx);
        (id, rx)
    }

    /// Removes a session. Idempotent: disconnecting an already-removed or unknown
    /// session is a no-op.
    pub fn disconnect(&self, id: SessionId) {
        self.sessions.lock().expect("broadcaster lock poisoned").remove(&id);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("broadcaster lock poisoned").len()
    }

    /// Attempts to send `message` to every connected session. A session whose send
    /// fails is collected and removed only after every session has been attempted, so
    /// one dead session can't shrink the set mid-iteration.
    pub fn broadcast(&self, message: WebsocketMessage) {
        let mut dead = Vec::new();
        {
            let sessions = self.sessions.lock().expect("broadcaster lock poisoned");
            for (id, sender) in sessions.iter() {
                if sender.send(message.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }
        if !dead.is_empty() {
            let mut sessions = self.sessions.lock().expect("broadcaster lock poisoned");
            for id in dead {
                sessions.remove(&id);
                tracing::debug!(session = %id, "removed broken broadcaster session");
            }
        }
    }

    pub fn broadcast_event(&self, event: &Event) {
        self.broadcast(WebsocketMessage::from_event(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(action: &str) -> WebsocketMessage {
        WebsocketMessage {
            source: "play_queue".into(),
            action: action.into(),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn broadcast_reaches_all_connected_sessions() {
        let broadcaster = Broadcaster::new();
        let (_id1, mut rx1) = broadcaster.connect();
        let (_id2, mut rx2) = broadcaster.connect();

        broadcaster.broadcast(msg("push"));

        assert_eq!(rx1.try_recv().unwrap().action, "push");
        assert_eq!(rx2.try_recv().unwrap().action, "push");
    }

    #[test]
    fn a_session_whose_send_fails_is_never_selected_again() {
        let broadcaster = Broadcaster::new();
        let (id, rx) = broadcaster.connect();
        drop(rx); // receiver dropped => sender.send() will fail on next broadcast

        assert_eq!(broadcaster.session_count(), 1);
        broadcaster.broadcast(msg("push"));
        assert_eq!(broadcaster.session_count(), 0);

        // A second broadcast must not touch the now-removed session again; nothing to
        // assert on directly besides the session staying gone.
        broadcaster.broadcast(msg("pop"));
        assert_eq!(broadcaster.session_count(), 0);
        let _ = id;
    }

    #[test]
    fn disconnect_is_idempotent() {
        let broadcaster = Broadcaster::new();
        let (id, _rx) = broadcaster.connect();
        broadcaster.disconnect(id);
        broadcaster.disconnect(id);
        assert_eq!(broadcaster.session_count(), 0);
    }
}
