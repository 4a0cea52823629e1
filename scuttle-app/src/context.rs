use std::sync::Arc;

use anyhow::Result;
use scuttle_broadcaster::Broadcaster;
use scuttle_catalog::{Catalog, Playlist};
use scuttle_config::Config;
use scuttle_events::EventBus;
use scuttle_fetcher::{Fetcher, FetcherConfig};
use scuttle_playlist_import::PlaylistImportRegistry;
use scuttle_postprocess::PostProcessor;
use scuttle_queue::{DownloadJob, DownloadQueue, PlayQueue, PlaylistUpdate};
use scuttle_worker::DownloadWorker;

use crate::subscriptions::register_broadcaster_subscriptions;

/// Every long-lived component, constructed once at boot and shared by `Arc`.
/// There is no ambient global beyond this struct and the config
/// singleton/tracing subscriber it is built from.
pub struct AppContext {
    pub config: &'static Config,
    pub event_bus: Arc<EventBus>,
    pub play_queue: Arc<PlayQueue>,
    pub download_queue: Arc<DownloadQueue>,
    pub catalog: Arc<Catalog>,
    pub fetcher: Arc<Fetcher>,
    pub broadcaster: Arc<Broadcaster>,
    pub playlist_import: Arc<PlaylistImportRegistry>,
}

impl AppContext {
    /// Constructs every component, runs the boot-time orphan-file sweep, seeds the
    /// catalog from the bundled CSV if empty, and wires the broadcaster's
    /// subscriptions onto the event bus before anything else can observe it.
    pub async fn bootstrap(config: &'static Config) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new());
        let broadcaster = Arc::new(Broadcaster::new());
        register_broadcaster_subscriptions(&event_bus, broadcaster.clone());

        let play_queue = Arc::new(PlayQueue::new(Some(event_bus.clone())));
        let download_queue = Arc::new(DownloadQueue::new(Some(event_bus.clone())));

        let catalog = Arc::new(Catalog::open(&config.db_path(), Some(event_bus.clone()))?);
        catalog.build_schema().await?;
        catalog.seed().await?;

        std::fs::create_dir_all(config.download_dir())?;
        scuttle_streamer::cleanup_download_folder(&catalog, &config.download_dir()).await;

        let postprocessor = PostProcessor::new(config.ffmpeg_path());
        let fetcher = Arc::new(Fetcher::new(
            FetcherConfig {
                binary_path: config.fetcher_binary_path(),
                download_dir: config.download_dir(),
                source_tag: config.fetcher_source_tag(),
                codec: config.fetcher_codec(),
            },
            postprocessor,
            Some(event_bus.clone()),
        ));

        let playlist_import = Arc::new(PlaylistImportRegistry::new());

        Ok(Self { config, event_bus, play_queue, download_queue, catalog, fetcher, broadcaster, playlist_import })
    }

    /// Builds the single cooperative download worker task but does not
    /// start it — callers spawn it so they retain the `JoinHandle`.
    pub fn worker(&self) -> DownloadWorker {
        DownloadWorker::new(
            self.play_queue.clone(),
            self.download_queue.clone(),
            self.fetcher.clone(),
            self.catalog.clone(),
            self.config.fetch_timeout(),
        )
    }

    /// Creates a playlist, and if `import_url` is given, resolves it through the
    /// playlist importer and seeds the download queue with one `DownloadJob` per
    /// imported track, each carrying `updates=[{playlist_id, checked=true}]` and
    /// `queue_last=true`.
    pub async fn create_playlist_with_import(&self, name: &str, import_url: Option<&str>) -> Result<Playlist> {
        let playlist = self.catalog.create_playlist(name, import_url).await?;

        if let Some(url) = import_url {
            let imported = self.playlist_import.import(url).await;
            tracing::info!(playlist = playlist.id, count = imported.len(), url, "seeding playlist import");

            for track in imported {
                let mut job = DownloadJob::by_query(&track.download_query);
                job.updates = Some(vec![PlaylistUpdate { playlist_id: playlist.id, checked: true }]);
                job.queue_last = true;

                if self.download_queue.contains(job.identifier()).await {
                    tracing::debug!(query = %track.download_query, "import job already queued, skipping");
                    continue;
                }
                self.download_queue.push(job).await;
            }
        }

        Ok(playlist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scuttle_playlist_import::{ImportedTrack, PlaylistExtractor, PlaylistImportRegistry};

    struct FixedExtractor(Vec<ImportedTrack>);

    #[async_trait]
    impl PlaylistExtractor for FixedExtractor {
        fn matches(&self, url: &str) -> bool {
            url.starts_with("https://fixed.example/")
        }

        async fn fetch(&self, _url: &str) -> scuttle_playlist_import::Result<Vec<ImportedTrack>> {
            Ok(self.0.clone())
        }
    }

    async fn test_context() -> AppContext {
        let event_bus = Arc::new(EventBus::new());
        let broadcaster = Arc::new(Broadcaster::new());
        register_broadcaster_subscriptions(&event_bus, broadcaster.clone());

        let play_queue = Arc::new(PlayQueue::new(Some(event_bus.clone())));
        let download_queue = Arc::new(DownloadQueue::new(Some(event_bus.clone())));

        let catalog = Arc::new(Catalog::open_in_memory(Some(event_bus.clone())).unwrap());
        catalog.build_schema().await.unwrap();

        let postprocessor = PostProcessor::new("ffmpeg");
        let fetcher = Arc::new(Fetcher::new(
            FetcherConfig {
                binary_path: "tools/fetcher".into(),
                download_dir: "/tmp/scuttle-test-downloads".into(),
                source_tag: "YT___".to_string(),
                codec: "opus".to_string(),
            },
            postprocessor,
            Some(event_bus.clone()),
        ));

        let playlist_import = Arc::new(PlaylistImportRegistry::with_extractors(vec![Box::new(FixedExtractor(vec![
            ImportedTrack { download_query: "song one".into(), title: "Song One".into(), artist: "Someone".into() },
            ImportedTrack { download_query: "song two".into(), title: "Song Two".into(), artist: "Someone".into() },
        ]))]));

        AppContext {
            config: Box::leak(Box::new(scuttle_config::Config::load(std::env::temp_dir()).unwrap())),
            event_bus,
            play_queue,
            download_queue,
            catalog,
            fetcher,
            broadcaster,
            playlist_import,
        }
    }

    #[tokio::test]
    async fn create_playlist_without_import_url_leaves_download_queue_empty() {
        let ctx = test_context().await;
        let playlist = ctx.create_playlist_with_import("My Mix", None).await.unwrap();

        assert_eq!(playlist.name, "My Mix");
        assert_eq!(ctx.download_queue.len().await, 0);
    }

    #[tokio::test]
    async fn create_playlist_with_import_url_seeds_one_job_per_track() {
        let ctx = test_context().await;
        let playlist = ctx
            .create_playlist_with_import("Imported Mix", Some("https://fixed.example/playlist/1"))
            .await
            .unwrap();

        assert_eq!(ctx.download_queue.len().await, 2);
        let first = ctx.download_queue.pop().await;
        assert_eq!(first.query(), Some("song one"));
        assert_eq!(first.updates.as_ref().unwrap()[0].playlist_id, playlist.id);
        assert!(first.queue_last);
    }

    #[tokio::test]
    async fn create_playlist_with_import_skips_already_queued_jobs() {
        let ctx = test_context().await;
        ctx.download_queue.push(DownloadJob::by_query("song one")).await;

        ctx.create_playlist_with_import("Imported Mix", Some("https://fixed.example/playlist/1")).await.unwrap();

        assert_eq!(ctx.download_queue.len().await, 2);
    }
}
