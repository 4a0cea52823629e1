use std::sync::Arc;

use scuttle_events::EventBus;

use crate::observable::ObservableQueue;

/// Action vocabulary for the play queue, in the closed set expected by the
/// broadcaster's subscription list.
pub mod action {
    pub const SET_ALL: &str = "set_all";
    pub const SET_FIRST: &str = "set_first";
    pub const INSERT_NEXT: &str = "insert_next";
    pub const PUSH: &str = "push";
    pub const POP: &str = "pop";
    pub const REMOVE: &str = "remove";
    pub const CLEAR: &str = "clear";
    pub const SEND_CONTENT: &str = "send_content";
}

pub const PLAY_QUEUE_NAME: &str = "play_queue";

fn snapshot(ids: &[String]) -> serde_json::Value {
    serde_json::json!(ids)
}

/// Ordered list of track ids awaiting playback. Element identity is the id itself.
pub struct PlayQueue {
    inner: ObservableQueue<String>,
}

impl PlayQueue {
    pub fn new(event_bus: Option<Arc<EventBus>>) -> Self {
        Self {
            inner: ObservableQueue::new(PLAY_QUEUE_NAME, event_bus),
        }
    }

    fn contents(inner: &crate::OrderedQueue<String>) -> Vec<String> {
        inner.iter().cloned().collect()
    }

    /// Clears the queue and pushes every id in order, as if loading a shuffled
    /// playlist.
    pub async fn set_all(&self, ids: Vec<String>) {
        let contents = {
            let mut guard = self.inner.lock().await;
            guard.clear();
            for id in &ids {
                guard.push(id.clone());
            }
            Self::contents(&guard)
        };
        self.inner
            .emit(action::SET_ALL, serde_json::json!({ "ids": ids, "content": snapshot(&contents) }))
            .await;
        self.inner.wake_one();
    }

    /// Replaces the head, as if pressing play and overwriting the current song.
    pub async fn set_first(&self, id: String) {
        let contents = {
            let mut guard = self.inner.lock().await;
            guard.pop();
            guard.insert_at(0, id.clone());
            Self::contents(&guard)
        };
        self.inner
            .emit(action::SET_FIRST, serde_json::json!({ "id": id, "content": snapshot(&contents) }))
            .await;
        self.inner.wake_one();
    }

    /// Queues `id` right after the current head.
    pub async fn insert_next(&self, id: String) {
        let contents = {
            let mut guard = self.inner.lock().await;
            guard.insert_at(1, id.clone());
            Self::contents(&guard)
        };
        self.inner
            .emit(action::INSERT_NEXT, serde_json::json!({ "id": id, "content": snapshot(&contents) }))
            .await;
        self.inner.wake_one();
    }

    pub async fn push(&self, id: String) {
        let contents = {
            let mut guard = self.inner.lock().await;
            guard.push(id.clone());
            Self::contents(&guard)
        };
        self.inner
            .emit(action::PUSH, serde_json::json!({ "id": id, "content": snapshot(&contents) }))
            .await;
        self.inner.wake_one();
    }

    /// Blocking pop of the head id.
    pub async fn pop(&self) -> String {
        self.inner
            .pop_blocking(action::POP, |id, snapshot_queue| {
                let contents: Vec<String> = snapshot_queue.iter().cloned().collect();
                serde_json::json!({ "id": id, "content": contents })
            })
            .await
    }

    /// Removes the item at `index` only if it still matches `id` (guards against a
    /// stale client-side index racing a concurrent mutation).
    pub async fn remove_at(&self, id: &str, index: usize) {
        let removed = {
            let mut guard = self.inner.lock().await;
            if guard.peek_at(index).map(|v| v.as_str()) == Some(id) {
                guard.remove_at(index)
            } else {
                None
            }
        };
        if let Some(removed) = removed {
            let contents = { self.inner.lock().await.iter().cloned().collect::<Vec<_>>() };
            self.inner
                .emit(action::REMOVE, serde_json::json!({ "id": removed, "content": contents }))
                .await;
        }
    }

    pub async fn clear(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.clear();
        }
        self.inner.emit(action::CLEAR, serde_json::json!({ "content": Vec::<String>::new() })).await;
    }

    pub async fn send_content(&self) {
        let contents = self.inner.lock().await.iter().cloned().collect::<Vec<_>>();
        self.inner
            .emit(action::SEND_CONTENT, serde_json::json!({ "content": contents }))
            .await;
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.lock().await.contains(|existing| existing == id)
    }

    pub async fn peek_at(&self, index: usize) -> Option<String> {
        self.inner.lock().await.peek_at(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_next_then_pop_preserves_order() {
        let queue = PlayQueue::new(None);
        queue.push("A".into()).await;
        queue.push("B".into()).await;
        queue.insert_next("X".into()).await;

        assert_eq!(queue.peek_at(0).await.as_deref(), Some("A"));
        assert_eq!(queue.peek_at(1).await.as_deref(), Some("X"));
        assert_eq!(queue.peek_at(2).await.as_deref(), Some("B"));

        let popped = queue.pop().await;
        assert_eq!(popped, "A");
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn remove_at_requires_matching_id() {
        let queue = PlayQueue::new(None);
        queue.push("A".into()).await;
        queue.push("B".into()).await;

        queue.remove_at("WRONG", 0).await;
        assert_eq!(queue.len().await, 2);

        queue.remove_at("A", 0).await;
        assert_eq!(queue.len().await, 1);
        assert_eq!(queue.peek_at(0).await.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn set_all_replaces_contents() {
        let queue = PlayQueue::new(None);
        queue.push("A".into()).await;
        queue.set_all(vec!["X".into(), "Y".into()]).await;
        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.peek_at(0).await.as_deref(), Some("X"));
    }
}
