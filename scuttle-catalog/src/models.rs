use serde::{Deserialize, Serialize};

/// The authoritative identity of an audio item. `title`/`artist` are canonical;
/// `title_display`/`artist_display` are optional user overrides applied via coalesce
/// on every read path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration: f64,
    #[serde(default)]
    pub title_display: Option<String>,
    #[serde(default)]
    pub artist_display: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            duration,
            title_display: None,
            artist_display: None,
        }
    }

    /// The title actually shown to readers: the custom override if set, else canonical.
    pub fn display_title(&self) -> &str {
        self.title_display.as_deref().filter(|s| !s.is_empty()).unwrap_or(&self.title)
    }

    pub fn display_artist(&self) -> &str {
        self.artist_display.as_deref().filter(|s| !s.is_empty()).unwrap_or(&self.artist)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    #[serde(default)]
    pub import_url: Option<String>,
}

/// A track as it appears inside a playlist or the likes list, with its fractional
/// position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderedTrackEntry {
    #[serde(flatten)]
    pub track: Track,
    pub position: f64,
}

/// `true` adds the track to the playlist; `false` removes it; the third state
/// (absent) is modeled by simply not including the entry in `updates` at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistUpdate {
    pub playlist_id: i64,
    pub checked: bool,
}
