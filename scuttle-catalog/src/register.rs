use crate::catalog::{action, Catalog};
use crate::error::{CatalogError, Result};
use crate::models::Track;

impl Catalog {
    /// Upserts `track` by id, splitting `artist` into one-or-more artist rows linked
    /// via the join table. Emits `log_track`.
    pub async fn register_track(&self, track: &Track) -> Result<()> {
        {
            let conn = self.conn.lock().await;
            conn.execute(
                "INSERT INTO tracks (id, title, duration, title_display)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    duration = excluded.duration,
                    title_display = COALESCE(tracks.title_display, excluded.title_display)",
                rusqlite::params![track.id, track.title, track.duration, track.title_display],
            )?;

            for name in track.artist.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
                let artist_id = name.to_lowercase();
                conn.execute(
                    "INSERT OR IGNORE INTO artists (id, artist) VALUES (?1, ?2)",
                    rusqlite::params![artist_id, name],
                )?;
                conn.execute(
                    "INSERT OR IGNORE INTO track_artists (track_rowid, artist_rowid)
                     SELECT t.rowid, a.rowid FROM tracks t, artists a
                     WHERE t.id = ?1 AND a.id = ?2",
                    rusqlite::params![track.id, artist_id],
                )?;
            }
        }
        self.rebuild_search_index().await?;
        self.emit(action::LOG_TRACK, serde_json::to_value(track).unwrap_or_default()).await;
        Ok(())
    }

    /// Cascades through downloads, likes, playlist memberships, and artist links.
    pub async fn unregister_track(&self, id: &str) -> Result<()> {
        {
            let conn = self.conn.lock().await;
            conn.execute("DELETE FROM tracks WHERE id = ?1", rusqlite::params![id])?;
        }
        self.rebuild_search_index().await?;
        self.emit(action::UNLOG_TRACK, serde_json::json!({ "id": id })).await;
        Ok(())
    }

    pub async fn is_registered(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks WHERE id = ?1", rusqlite::params![id], |r| r.get(0))?;
        Ok(count > 0)
    }

    /// Insert-or-ignore into `downloads`; fails with `UnknownTrack` if the track row
    /// is missing. Emits `log_download` with the full (coalesced) track object.
    pub async fn register_download(&self, id: &str) -> Result<Track> {
        let track = self.fetch_track(id).await?.ok_or_else(|| CatalogError::UnknownTrack(id.to_string()))?;
        {
            let conn = self.conn.lock().await;
            conn.execute("INSERT OR IGNORE INTO downloads (id) VALUES (?1)", rusqlite::params![id])?;
        }
        self.emit(action::LOG_DOWNLOAD, serde_json::to_value(&track).unwrap_or_default()).await;
        Ok(track)
    }

    /// Removes the `downloads` row without touching track metadata — preserves
    /// searchable history.
    pub async fn unregister_download(&self, id: &str) -> Result<()> {
        {
            let conn = self.conn.lock().await;
            conn.execute("DELETE FROM downloads WHERE id = ?1", rusqlite::params![id])?;
        }
        self.emit(action::UNLOG_DOWNLOAD, serde_json::json!({ "id": id })).await;
        Ok(())
    }

    pub async fn is_downloaded(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM downloads WHERE id = ?1", rusqlite::params![id], |r| r.get(0))?;
        Ok(count > 0)
    }

    /// `title`/`artist` empty strings are normalized to `NULL` (clearing the override).
    pub async fn set_custom_metadata(&self, id: &str, title: Option<&str>, artist: Option<&str>) -> Result<()> {
        let title_display = title.filter(|s| !s.is_empty());
        let artist_display = artist.filter(|s| !s.is_empty());
        {
            let conn = self.conn.lock().await;
            conn.execute(
                "UPDATE tracks SET title_display = ?2, artist_display = ?3 WHERE id = ?1",
                rusqlite::params![id, title_display, artist_display],
            )?;
        }
        self.emit(action::SET_METADATA, serde_json::json!({ "id": id, "title": title_display, "artist": artist_display })).await;
        Ok(())
    }

    /// Fetches the denormalized track row (custom overrides already coalesced into
    /// `title`/`artist` by the caller via `Track::display_title`/`display_artist`, but
    /// the raw canonical/override pair is preserved here so callers can choose).
    pub(crate) async fn fetch_track(&self, id: &str) -> Result<Option<Track>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT t.id, t.title, t.title_display, t.duration, t.artist_display,
                    COALESCE(GROUP_CONCAT(a.artist, ', '), '') AS artist
             FROM tracks t
             LEFT JOIN track_artists ta ON ta.track_rowid = t.rowid
             LEFT JOIN artists a ON a.rowid = ta.artist_rowid
             WHERE t.id = ?1
             GROUP BY t.rowid",
        )?;
        let mut rows = stmt.query(rusqlite::params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Track {
                id: row.get(0)?,
                title: row.get(1)?,
                title_display: row.get(2)?,
                duration: row.get(3)?,
                artist_display: row.get(4)?,
                artist: row.get(5)?,
            }))
        } else {
            Ok(None)
        }
    }
}
