use std::sync::Arc;
use std::time::Duration;

use scuttle_catalog::Catalog;
use scuttle_fetcher::Fetcher;
use scuttle_queue::{DownloadJob, DownloadQueue, PlayQueue};

fn to_fetcher_metadata(metadata: scuttle_queue::MetadataOverride) -> scuttle_fetcher::MetadataOverride {
    scuttle_fetcher::MetadataOverride { title: metadata.title, artist: metadata.artist }
}

fn to_catalog_updates(updates: Vec<scuttle_queue::PlaylistUpdate>) -> Vec<scuttle_catalog::PlaylistUpdate> {
    updates
        .into_iter()
        .map(|u| scuttle_catalog::PlaylistUpdate { playlist_id: u.playlist_id, checked: u.checked })
        .collect()
}

/// The single cooperative task that drains the download queue, dispatches to
/// the fetcher, commits to the catalog, and optionally enqueues into the play
/// queue. Errors at any step are logged with context; the loop always continues.
pub struct DownloadWorker {
    play_queue: Arc<PlayQueue>,
    download_queue: Arc<DownloadQueue>,
    fetcher: Arc<Fetcher>,
    catalog: Arc<Catalog>,
    fetch_timeout: Duration,
}

impl DownloadWorker {
    pub fn new(
        play_queue: Arc<PlayQueue>,
        download_queue: Arc<DownloadQueue>,
        fetcher: Arc<Fetcher>,
        catalog: Arc<Catalog>,
        fetch_timeout: Duration,
    ) -> Self {
        Self { play_queue, download_queue, fetcher, catalog, fetch_timeout }
    }

    /// Runs until a shutdown sentinel job is popped. Intended to be driven by
    /// `tokio::spawn`; shutdown is cooperative — push
    /// `DownloadJob::shutdown_sentinel()` onto the download queue to unblock the
    /// parked `pop()` and stop the loop.
    pub async fn run(&self) {
        loop {
            let job = self.download_queue.pop().await;
            if job.is_sentinel() {
                tracing::info!("download worker received shutdown sentinel");
                return;
            }
            self.handle(job).await;
        }
    }

    async fn handle(&self, job: DownloadJob) {
        let metadata = job.metadata.clone().map(to_fetcher_metadata);

        let track = if let Some(id) = job.id() {
            self.fetcher.download_by_id(id, self.fetch_timeout, metadata).await
        } else if let Some(query) = job.query() {
            self.fetcher.download_by_query(query, self.fetch_timeout, metadata).await.and_then(|opt| {
                opt.ok_or_else(|| scuttle_fetcher::FetchError::FetchFailed(format!("no search results for {query}")))
            })
        } else {
            tracing::warn!("dispatched job has neither id nor query");
            return;
        };

        let track = match track {
            Ok(track) => track,
            Err(e) => {
                tracing::error!(error = %e, job = ?job, "download worker: fetch failed for job");
                return;
            }
        };

        if let Err(e) = self.catalog.register_track(&track).await {
            tracing::error!(error = %e, id = track.id, "download worker: failed to register track");
            return;
        }
        if let Err(e) = self.catalog.register_download(&track.id).await {
            tracing::error!(error = %e, id = track.id, "download worker: failed to register download");
            return;
        }

        if let Some(updates) = job.updates.clone() {
            let updates = to_catalog_updates(updates);
            if let Err(e) = self.catalog.update_track_playlists(&track.id, &updates).await {
                tracing::error!(error = %e, id = track.id, "download worker: failed to update playlists");
            }
        }

        if job.queue_first {
            self.play_queue.insert_next(track.id.clone()).await;
        }
        if job.queue_last {
            self.play_queue.push(track.id.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_sentinel_stops_the_loop_without_dispatching() {
        let download_queue = Arc::new(DownloadQueue::new(None));
        let play_queue = Arc::new(PlayQueue::new(None));

        let db_dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(Catalog::open(&db_dir.path().join("audio.db"), None).unwrap());
        catalog.build_schema().await.unwrap();

        let fetcher = Arc::new(Fetcher::new(
            scuttle_fetcher::FetcherConfig {
                binary_path: "/bin/true".into(),
                download_dir: std::env::temp_dir(),
                source_tag: "YT___".into(),
                codec: "opus".into(),
            },
            scuttle_postprocess::PostProcessor::new("/bin/true"),
            None,
        ));

        let worker = DownloadWorker::new(play_queue, download_queue.clone(), fetcher, catalog, Duration::from_secs(1));

        download_queue.push(DownloadJob::shutdown_sentinel()).await;
        tokio::time::timeout(Duration::from_secs(2), worker.run()).await.expect("worker should stop promptly");
    }
}
