use std::sync::Arc;

use scuttle_events::EventBus;

use crate::download_job::DownloadJob;
use crate::observable::ObservableQueue;

/// Action vocabulary for the download queue. No `set_all` — unlike the play
/// queue, jobs are never bulk-replaced.
pub mod action {
    pub const INSERT_NEXT: &str = "insert_next";
    pub const PUSH: &str = "push";
    pub const POP: &str = "pop";
    pub const REMOVE: &str = "remove";
    pub const SEND_CONTENT: &str = "send_content";
}

pub const DOWNLOAD_QUEUE_NAME: &str = "download_queue";

fn job_content(jobs: &[&DownloadJob]) -> serde_json::Value {
    serde_json::json!(jobs.iter().map(|j| serde_json::to_value(j).unwrap()).collect::<Vec<_>>())
}

/// Ordered list of pending `DownloadJob`s. Element identity is `DownloadJob::identifier`.
pub struct DownloadQueue {
    inner: ObservableQueue<DownloadJob>,
}

impl DownloadQueue {
    pub fn new(event_bus: Option<Arc<EventBus>>) -> Self {
        Self {
            inner: ObservableQueue::new(DOWNLOAD_QUEUE_NAME, event_bus),
        }
    }

    /// Queues `job` right after the current head.
    pub async fn insert_next(&self, job: DownloadJob) {
        let (payload_job, contents) = {
            let mut guard = self.inner.lock().await;
            guard.insert_at(1, job.clone());
            let contents: Vec<_> = guard.iter().collect();
            (job.clone(), job_content(&contents))
        };
        self.inner
            .emit(action::INSERT_NEXT, serde_json::json!({ "job": payload_job, "content": contents }))
            .await;
        self.inner.wake_one();
    }

    pub async fn push(&self, job: DownloadJob) {
        let (payload_job, contents) = {
            let mut guard = self.inner.lock().await;
            guard.push(job.clone());
            let contents: Vec<_> = guard.iter().collect();
            (job.clone(), job_content(&contents))
        };
        self.inner
            .emit(action::PUSH, serde_json::json!({ "job": payload_job, "content": contents }))
            .await;
        self.inner.wake_one();
    }

    /// Blocking pop of the head job.
    pub async fn pop(&self) -> DownloadJob {
        self.inner
            .pop_blocking(action::POP, |job, snapshot_queue| {
                let contents: Vec<_> = snapshot_queue.iter().collect();
                serde_json::json!({ "job": job, "content": job_content(&contents) })
            })
            .await
    }

    pub async fn remove_at(&self, index: usize) {
        let removed = self.inner.lock().await.remove_at(index);
        if let Some(removed) = removed {
            let contents = { self.inner.lock().await.iter().collect::<Vec<_>>() };
            self.inner
                .emit(
                    action::REMOVE,
                    serde_json::json!({ "job": removed, "content": job_content(&contents) }),
                )
                .await;
        }
    }

    pub async fn send_content(&self) {
        let contents = { self.inner.lock().await.iter().collect::<Vec<_>>() };
        self.inner
            .emit(action::SEND_CONTENT, serde_json::json!({ "content": job_content(&contents) }))
            .await;
    }

    /// Identity-based membership check, mirroring `contains(item)` semantics: a job
    /// whose `identifier()` matches an already-queued job's is rejected by the caller
    /// before it ever reaches `push`/`insert_next`.
    pub async fn contains(&self, identifier: &str) -> bool {
        self.inner.lock().await.contains(|job| job.identifier() == identifier)
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_identifier_is_detected_before_push() {
        let queue = DownloadQueue::new(None);
        let job = DownloadJob::by_id("YT___abc");
        queue.push(job.clone()).await;

        assert!(queue.contains("YT___abc").await);
        assert!(!queue.contains("YT___other").await);
    }

    #[tokio::test]
    async fn pop_blocks_then_returns_pushed_job() {
        let queue = Arc::new(DownloadQueue::new(None));
        let reader = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::task::yield_now().await;
        queue.push(DownloadJob::by_query("some song")).await;

        let popped = reader.await.unwrap();
        assert_eq!(popped.query(), Some("some song"));
    }

    #[tokio::test]
    async fn sentinel_unblocks_shutdown() {
        let queue = Arc::new(DownloadQueue::new(None));
        let reader = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::task::yield_now().await;
        queue.push(DownloadJob::shutdown_sentinel()).await;

        let popped = reader.await.unwrap();
        assert!(popped.is_sentinel());
    }
}
