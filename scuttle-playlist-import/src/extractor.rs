use async_trait::async_trait;

/// A single track surfaced by a playlist import, ready to seed a download job.
/// The caller maps this into whatever `DownloadJob`/metadata shape
/// its own queue crate defines; this crate stays agnostic of the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedTrack {
    pub download_query: String,
    pub title: String,
    pub artist: String,
}

/// A pluggable handler for one playlist-hosting site. `matches` is cheap and
/// synchronous (URL shape only); `fetch` does the network work.
#[async_trait]
pub trait PlaylistExtractor: Send + Sync {
    fn matches(&self, url: &str) -> bool;
    async fn fetch(&self, url: &str) -> crate::Result<Vec<ImportedTrack>>;
}
