use serde::{Deserialize, Serialize};

use crate::catalog::{action, Catalog};
use crate::error::Result;
use crate::models::Track;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistContent {
    pub id: i64,
    pub name: Option<String>,
    #[serde(rename = "trackIds")]
    pub track_ids: Vec<String>,
}

const TRACK_COLUMNS: &str = "t.id, COALESCE(t.title_display, t.title) AS title, duration, artist";

fn row_to_track(row: &rusqlite::Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        duration: row.get(2)?,
        artist: row.get(3)?,
        title_display: None,
        artist_display: None,
    })
}

impl Catalog {
    /// Full metadata for every downloaded track, most-recently-downloaded first.
    /// Emits `get_downloads_content`.
    pub async fn get_downloads_content(&self) -> Result<Vec<Track>> {
        let tracks = {
            let conn = self.conn.lock().await;
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRACK_COLUMNS}
                 FROM (
                    SELECT t.id, t.title_display, t.title, t.duration,
                           COALESCE(GROUP_CONCAT(COALESCE(t.artist_display, a.artist), ', '), '') AS artist,
                           d.downloaded_at, d.rowid AS download_rowid
                    FROM tracks t
                    INNER JOIN downloads d ON d.id = t.id
                    LEFT JOIN track_artists ta ON ta.track_rowid = t.rowid
                    LEFT JOIN artists a ON a.rowid = ta.artist_rowid
                    GROUP BY t.id
                 ) t
                 ORDER BY t.downloaded_at DESC, t.download_rowid DESC"
            ))?;
            stmt.query_map([], row_to_track)?.collect::<std::result::Result<Vec<_>, _>>()?
        };
        self.emit(action::GET_DOWNLOADS_CONTENT, serde_json::json!({ "content": tracks })).await;
        Ok(tracks)
    }

    /// All playlists, ordered by id. Emits `get_all_playlists`.
    pub async fn get_all_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let playlists = {
            let conn = self.conn.lock().await;
            let mut stmt = conn.prepare("SELECT id, name FROM playlists ORDER BY id")?;
            stmt.query_map([], |row| Ok(PlaylistSummary { id: row.get(0)?, name: row.get(1)? }))?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        self.emit(action::GET_ALL_PLAYLISTS, serde_json::json!({ "content": playlists })).await;
        Ok(playlists)
    }

    /// A playlist's ordered track ids. `name` is `None` when `playlist_id` does not
    /// exist (mirrors the original's tolerant "playlist not found" shape rather than
    /// an error). Emits `get_playlist_content`.
    pub async fn get_playlist_content(&self, playlist_id: i64) -> Result<PlaylistContent> {
        let conn = self.conn.lock().await;
        let name: Option<String> = conn
            .query_row("SELECT name FROM playlists WHERE id = ?1", rusqlite::params![playlist_id], |row| row.get(0))
            .ok();

        let track_ids = if name.is_some() {
            let mut stmt = conn.prepare(
                "SELECT track_id FROM playlist_tracks WHERE playlist_id = ?1 ORDER BY position ASC",
            )?;
            stmt.query_map(rusqlite::params![playlist_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };
        drop(conn);

        let content = PlaylistContent { id: playlist_id, name, track_ids };
        self.emit(action::GET_PLAYLIST_CONTENT, serde_json::to_value(&content).unwrap_or_default()).await;
        Ok(content)
    }
}
