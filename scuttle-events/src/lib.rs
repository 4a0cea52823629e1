//! In-process publish/subscribe keyed on `(source, action)`.
//!
//! Subscriptions are registered once at boot and the bus is read-only thereafter, so
//! the subscriber map is a plain `RwLock` rather than anything lock-free: contention
//! only ever happens on the read side.

mod payload;

pub use payload::{PayloadValue, Serializable};

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// An immutable fact published once and fanned out to every matching subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub source: String,
    pub action: String,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(source: impl Into<String>, action: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            source: source.into(),
            action: action.into(),
            payload,
        }
    }
}

pub type HandlerResult = Result<(), anyhow::Error>;
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// A subscriber callback. Boxed as `Arc` so the same handler can be registered under
/// more than one `(source, action)` pair without cloning its captured state.
pub type Handler = Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<String, HashMap<String, Vec<Handler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Appends `handler` to the list for `(source, action)`. Subscription order is
    /// preserved; the first handler subscribed is the first one invoked on publish.
    pub fn subscribe(&self, source: impl Into<String>, action: impl Into<String>, handler: Handler) {
        let mut subs = self.subscribers.write().expect("event bus lock poisoned");
        subs.entry(source.into())
            .or_default()
            .entry(action.into())
            .or_default()
            .push(handler);
    }

    /// Invokes every handler registered for `event`'s `(source, action)`, in
    /// subscription order. A handler that returns an error is logged and does not
    /// prevent the remaining handlers from running.
    pub async fn publish(&self, event: Event) {
        let handlers: Vec<Handler> = {
            let subs = self.subscribers.read().expect("event bus lock poisoned");
            subs.get(&event.source)
                .and_then(|by_action| by_action.get(&event.action))
                .cloned()
                .unwrap_or_default()
        };

        for handler in handlers {
            if let Err(err) = handler(event.clone()).await {
                tracing::error!(
                    source = %event.source,
                    action = %event.action,
                    error = %err,
                    "event handler failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_handler(counter: Arc<AtomicU32>, order: Arc<std::sync::Mutex<Vec<u32>>>, id: u32) -> Handler {
        Arc::new(move |_event| {
            let counter = counter.clone();
            let order = order.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                order.lock().unwrap().push(id);
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn publish_invokes_subscribers_in_subscription_order() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicU32::new(0));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        bus.subscribe("play_queue", "push", counting_handler(counter.clone(), order.clone(), 1));
        bus.subscribe("play_queue", "push", counting_handler(counter.clone(), order.clone(), 2));

        bus.publish(Event::new("play_queue", "push", serde_json::json!({}))).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_a_noop() {
        let bus = EventBus::new();
        bus.publish(Event::new("nobody", "listens", serde_json::json!(null))).await;
    }

    #[tokio::test]
    async fn failing_handler_does_not_block_the_next_one() {
        let bus = EventBus::new();
        let ran = Arc::new(AtomicU32::new(0));

        let ran_clone = ran.clone();
        bus.subscribe(
            "download_queue",
            "pop",
            Arc::new(move |_event| {
                Box::pin(async move { Err(anyhow::anyhow!("boom")) }) as HandlerFuture
            }),
        );
        let ran_clone2 = ran.clone();
        bus.subscribe(
            "download_queue",
            "pop",
            Arc::new(move |_event| {
                let ran = ran_clone2.clone();
                Box::pin(async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            }),
        );
        let _ = ran_clone;

        bus.publish(Event::new("download_queue", "pop", serde_json::json!({}))).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
