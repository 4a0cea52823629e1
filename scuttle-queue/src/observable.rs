use std::sync::Arc;

use scuttle_events::{Event, EventBus};
use tokio::sync::{Mutex, MutexGuard, Notify};

use crate::ordered::OrderedQueue;

/// Wraps an [`OrderedQueue`] with a mutex and a condition variable (`tokio::sync::
/// Notify`), emitting a structured event on every mutation before the lock is
/// released and signalling the condition on every insertion.
///
/// `pop`-style consumers park on the notifier when the queue is empty; this is the
/// only natural back-pressure point in the system.
pub struct ObservableQueue<T> {
    inner: Mutex<OrderedQueue<T>>,
    notify: Notify,
    event_bus: Option<Arc<EventBus>>,
    source: String,
}

impl<T> ObservableQueue<T> {
    pub fn new(source: impl Into<String>, event_bus: Option<Arc<EventBus>>) -> Self {
        Self {
            inner: Mutex::new(OrderedQueue::new()),
            notify: Notify::new(),
            event_bus,
            source: source.into(),
        }
    }

    /// Acquires the lock and runs `f` against the underlying container. Intended for
    /// use by concrete queue wrappers that need to mutate and then build their own
    /// action-specific event payload before releasing the lock.
    pub async fn lock(&self) -> MutexGuard<'_, OrderedQueue<T>> {
        self.inner.lock().await
    }

    pub fn wake_one(&self) {
        self.notify.notify_one();
    }

    pub async fn emit(&self, action: &str, payload: serde_json::Value) {
        if let Some(bus) = &self.event_bus {
            bus.publish(Event::new(self.source.clone(), action, payload)).await;
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Blocks until an item is available, pops it, emits `action`, and returns it.
    /// `build_payload` receives the popped value and the queue's post-pop state so
    /// callers can include a full snapshot in the emitted event.
    pub async fn pop_blocking<F>(&self, action: &str, build_payload: F) -> T
    where
        F: Fn(&T, &OrderedQueue<T>) -> serde_json::Value,
    {
        loop {
            let notified = self.notify.notified();
            {
                let mut guard = self.inner.lock().await;
                if let Some(value) = guard.pop() {
                    let payload = build_payload(&value, &guard);
                    drop(guard);
                    self.emit(action, payload).await;
                    return value;
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pop_blocking_parks_until_pushed() {
        let queue: Arc<ObservableQueue<i32>> = Arc::new(ObservableQueue::new("test_queue", None));

        let reader = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .pop_blocking("pop", |value, _snapshot| serde_json::json!({ "id": value }))
                    .await
            })
        };

        tokio::task::yield_now().await;
        {
            let mut guard = queue.lock().await;
            guard.push(42);
        }
        queue.wake_one();

        let popped = reader.await.unwrap();
        assert_eq!(popped, 42);
    }
}
