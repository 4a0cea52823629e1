use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `BadJob`: rejected at construction, never enqueued.
#[derive(Debug, Error)]
#[error("download job must set exactly one of `id` or `query`")]
pub struct BadJob;

/// Post-commit playlist membership change applied by the worker after a successful
/// download: `checked = true` adds, `checked = false` removes, absent entries are a
/// no-op (see `Catalog::update_track_playlists`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistUpdate {
    pub playlist_id: i64,
    pub checked: bool,
}

/// Field-by-field overrides applied to the fetched `Track` before it is committed;
/// empty/absent fields leave the fetched value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataOverride {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

/// A request to fetch-and-commit a track. Ephemeral: never persisted, only ever lives
/// inside the download queue.
///
/// Exactly one of `id`/`query` is set — enforced at construction, so every other call
/// site in the system can treat a `DownloadJob` as already valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadJob {
    id: Option<String>,
    query: Option<String>,
    pub metadata: Option<MetadataOverride>,
    pub updates: Option<Vec<PlaylistUpdate>>,
    pub queue_first: bool,
    pub queue_last: bool,
}

impl DownloadJob {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            query: None,
            metadata: None,
            updates: None,
            queue_first: false,
            queue_last: false,
        }
    }

    pub fn by_query(query: impl Into<String>) -> Self {
        Self {
            id: None,
            query: Some(query.into()),
            metadata: None,
            updates: None,
            queue_first: false,
            queue_last: false,
        }
    }

    /// Validating constructor matching the wire form: `{id?, query?, metadata?,
    /// updates?, queue_first?, queue_last?}`. `id XOR query` is checked once, here.
    pub fn new(
        id: Option<String>,
        query: Option<String>,
        metadata: Option<MetadataOverride>,
        updates: Option<Vec<PlaylistUpdate>>,
        queue_first: bool,
        queue_last: bool,
    ) -> Result<Self, BadJob> {
        let id = id.filter(|s| !s.is_empty());
        let query = query.filter(|s| !s.is_empty());
        match (&id, &query) {
            (Some(_), None) | (None, Some(_)) => Ok(Self {
                id,
                query,
                metadata,
                updates,
                queue_first,
                queue_last,
            }),
            _ => Err(BadJob),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataOverride) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_updates(mut self, updates: Vec<PlaylistUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn queue_first(mut self, value: bool) -> Self {
        self.queue_first = value;
        self
    }

    pub fn queue_last(mut self, value: bool) -> Self {
        self.queue_last = value;
        self
    }

    /// A sentinel used only to unblock a parked `pop()` on worker shutdown; it is
    /// never dispatched to the fetcher (the worker checks `is_sentinel` first).
    pub fn shutdown_sentinel() -> Self {
        Self {
            id: None,
            query: None,
            metadata: None,
            updates: None,
            queue_first: false,
            queue_last: false,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id.is_none() && self.query.is_none()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Identity for queue containment checks: `id` if present, else `query`.
    pub fn identifier(&self) -> &str {
        self.id.as_deref().or(self.query.as_deref()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_neither_id_nor_query() {
        assert!(DownloadJob::new(None, None, None, None, false, false).is_err());
    }

    #[test]
    fn rejects_both_id_and_query() {
        assert!(DownloadJob::new(
            Some("YT___a".into()),
            Some("some query".into()),
            None,
            None,
            false,
            false
        )
        .is_err());
    }

    #[test]
    fn empty_string_id_counts_as_absent() {
        assert!(DownloadJob::new(Some(String::new()), Some("q".into()), None, None, false, false).is_ok());
    }

    #[test]
    fn identifier_prefers_id_over_query() {
        let job = DownloadJob::by_id("YT___abc");
        assert_eq!(job.identifier(), "YT___abc");
        let job = DownloadJob::by_query("hello world");
        assert_eq!(job.identifier(), "hello world");
    }

    #[test]
    fn sentinel_is_recognized() {
        assert!(DownloadJob::shutdown_sentinel().is_sentinel());
        assert!(!DownloadJob::by_id("x").is_sentinel());
    }
}
