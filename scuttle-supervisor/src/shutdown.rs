use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A one-shot "stop everything" signal, set either by `Ctrl-C`, a `STOP` line on
/// the control port, or process signals. Idempotent and observable from any number
/// of waiters.
#[derive(Default)]
pub struct ShutdownSignal {
    flag: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves immediately if already triggered; otherwise waits for the next
    /// `trigger()`.
    pub async fn wait(&self) {
        if self.is_set() {
            return;
        }
        self.notify.notified().await;
    }
}
