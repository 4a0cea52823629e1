use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use scuttle_catalog::Track;
use scuttle_events::{Event, EventBus};
use scuttle_postprocess::PostProcessor;
use tokio::process::Command;

use crate::error::{FetchError, Result};
use crate::parse::{parse_line, RawResult};
use crate::process::run_with_timeout;

pub const FETCHER_NAME: &str = "fetcher";

pub mod action {
    pub const SEARCH: &str = "search";
    pub const DOWNLOAD: &str = "download";
    pub const TASK_START: &str = "task_start";
    pub const TASK_FINISH: &str = "task_finish";
    pub const ERROR: &str = "error";
}

/// Field-by-field override applied after a successful fetch: non-empty wins.
#[derive(Debug, Clone, Default)]
pub struct MetadataOverride {
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl MetadataOverride {
    fn apply(&self, mut track: Track) -> Track {
        if let Some(title) = self.title.as_deref().filter(|s| !s.is_empty()) {
            track.title_display = Some(title.to_string());
        }
        if let Some(artist) = self.artist.as_deref().filter(|s| !s.is_empty()) {
            track.artist_display = Some(artist.to_string());
        }
        track
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Path to the external search/download binary (a yt-dlp-compatible tool).
    pub binary_path: PathBuf,
    pub download_dir: PathBuf,
    /// Prefixed onto every id this fetcher produces, e.g. `YT___`.
    pub source_tag: String,
    /// Final audio codec handed to the post-processor's `compress` step.
    pub codec: String,
}

/// Wraps the external binary: U+001F-delimited output parsing, one
/// self-update + one retry on failure, source-tag id prefixing, and the
/// `task_start`/`task_finish`/`error`/`search`/`download` event envelope.
pub struct Fetcher {
    config: FetcherConfig,
    postprocessor: PostProcessor,
    event_bus: Option<Arc<EventBus>>,
}

impl Fetcher {
    pub fn new(config: FetcherConfig, postprocessor: PostProcessor, event_bus: Option<Arc<EventBus>>) -> Self {
        Self { config, postprocessor, event_bus }
    }

    async fn emit(&self, action: &str, payload: serde_json::Value) {
        if let Some(bus) = &self.event_bus {
            bus.publish(Event::new(FETCHER_NAME, action, payload)).await;
        }
    }

    fn strip_tag<'a>(&self, id: &'a str) -> &'a str {
        id.strip_prefix(self.config.source_tag.as_str()).unwrap_or(id)
    }

    fn tag(&self, native_id: &str) -> String {
        format!("{}{native_id}", self.config.source_tag)
    }

    /// Runs `cmd`; on non-zero exit or timeout, attempts at most one self-update
    /// (`-U`) followed by at most one retry of the original command; applies
    /// uniformly to both search and download.
    async fn run_with_retry(&self, build_cmd: impl Fn() -> Command, timeout: Duration) -> Result<crate::process::RunOutput> {
        match run_with_timeout(build_cmd(), timeout).await {
            Ok(out) if out.status == 0 => return Ok(out),
            _ => {}
        }

        let mut update_cmd = Command::new(&self.config.binary_path);
        update_cmd.arg("-U");
        let _ = run_with_timeout(update_cmd, timeout).await;

        run_with_timeout(build_cmd(), timeout).await.and_then(|out| {
            if out.status == 0 {
                Ok(out)
            } else {
                Err(FetchError::FetchFailed(out.stderr))
            }
        })
    }

    /// Returns at most `limit` matches for `q`. Terminal failure yields `[]` rather
    /// than an error (`FetchFailed` surfaces as an empty result for search).
    pub async fn search(&self, q: &str, limit: usize, timeout: Duration) -> Vec<Track> {
        self.emit(action::TASK_START, serde_json::json!({ "query": q })).await;

        let binary = self.config.binary_path.clone();
        let query = q.to_string();
        let build = move || {
            let mut cmd = Command::new(&binary);
            cmd.arg(format!("ytsearch{limit}:{query}"))
                .arg("--print")
                .arg("%(id)s\u{1f}%(title)s\u{1f}%(uploader)s\u{1f}%(duration)s")
                .arg("--skip-download")
                .arg("--quiet");
            cmd
        };

        let tracks = match self.run_with_retry(build, timeout).await {
            Ok(out) => out
                .stdout
                .lines()
                .filter_map(|line| match parse_line(line) {
                    Some(raw) => Some(self.raw_to_track(raw)),
                    None => {
                        tracing::warn!(line, "skipping unparseable search result line");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, query = q, "search failed terminally");
                self.emit(action::ERROR, serde_json::json!({ "query": q, "error": e.to_string() })).await;
                Vec::new()
            }
        };

        self.emit(action::SEARCH, serde_json::json!({ "content": tracks })).await;
        self.emit(action::TASK_FINISH, serde_json::json!({ "query": q })).await;
        tracks
    }

    fn raw_to_track(&self, raw: RawResult) -> Track {
        Track::new(self.tag(&raw.id), raw.title, raw.uploader, raw.duration)
    }

    /// Downloads `id` (already source-tag-prefixed), post-processes the file, and
    /// returns the committed `Track`. The prefix is stripped when building the
    /// source URL.
    pub async fn download_by_id(&self, id: &str, timeout: Duration, metadata: Option<MetadataOverride>) -> Result<Track> {
        self.emit(action::TASK_START, serde_json::json!({ "id": id })).await;

        let native_id = self.strip_tag(id).to_string();
        let url = format!("https://www.youtube.com/watch?v={native_id}");
        let download_dir = self.config.download_dir.clone();
        std::fs::create_dir_all(&download_dir)?;
        let output_template = download_dir.join(format!("{native_id}.%(ext)s"));

        let binary = self.config.binary_path.clone();
        let url_for_cmd = url.clone();
        let template = output_template.clone();
        let build = move || {
            let mut cmd = Command::new(&binary);
            cmd.arg("-x")
                .arg("--print")
                .arg("after_move:%(id)s\u{1f}%(title)s\u{1f}%(uploader)s\u{1f}%(duration)s")
                .arg("-o")
                .arg(&template)
                .arg("--quiet")
                .arg("--no-playlist")
                .arg(&url_for_cmd);
            cmd
        };

        let result = self.run_with_retry(build, timeout).await;
        self.emit(action::TASK_FINISH, serde_json::json!({ "id": id })).await;

        let out = match result {
            Ok(out) => out,
            Err(e) => {
                self.emit(action::ERROR, serde_json::json!({ "id": id, "error": e.to_string() })).await;
                return Err(e);
            }
        };

        let raw = out
            .stdout
            .lines()
            .rev()
            .find_map(parse_line)
            .ok_or_else(|| FetchError::FetchFailed("no metadata printed after download".into()))?;

        let mut track = self.raw_to_track(raw);
        if let Some(metadata) = metadata {
            track = metadata.apply(track);
        }

        let downloaded_path = self.downloaded_file_path(&native_id)?;
        let final_path = self.postprocessor.run_default_pipeline(&downloaded_path, &self.config.codec).await?;
        tracing::info!(id, path = %final_path.display(), "post-processing complete");

        self.emit(action::DOWNLOAD, serde_json::to_value(&track).unwrap_or_default()).await;
        Ok(track)
    }

    /// `search(q, limit=1)` then `download_by_id`; `None` if the search is empty.
    pub async fn download_by_query(&self, q: &str, timeout: Duration, metadata: Option<MetadataOverride>) -> Result<Option<Track>> {
        let mut results = self.search(q, 1, timeout).await;
        let Some(track) = results.pop() else {
            return Ok(None);
        };
        self.download_by_id(&track.id, timeout, metadata).await.map(Some)
    }

    fn downloaded_file_path(&self, native_id: &str) -> Result<PathBuf> {
        let dir = std::fs::read_dir(&self.config.download_dir).map_err(FetchError::from)?;
        for entry in dir.flatten() {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(native_id) {
                return Ok(path);
            }
        }
        Err(FetchError::FetchFailed(format!("no downloaded file found for {native_id}")))
    }
}
