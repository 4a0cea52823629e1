use crate::catalog::{action, Catalog};
use crate::error::{CatalogError, Result};
use crate::models::{Playlist, PlaylistUpdate};
use crate::position::position_for_index;

impl Catalog {
    /// Inserts a new playlist, optionally recording the URL it was imported from.
    /// Emits `create_playlist`.
    pub async fn create_playlist(&self, name: &str, import_url: Option<&str>) -> Result<Playlist> {
        let playlist = {
            let conn = self.conn.lock().await;
            conn.execute(
                "INSERT INTO playlists (name, import_url) VALUES (?1, ?2)",
                rusqlite::params![name, import_url],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                "SELECT id, name, created_at, import_url FROM playlists WHERE id = ?1",
                rusqlite::params![id],
                |row| {
                    Ok(Playlist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                        import_url: row.get(3)?,
                    })
                },
            )?
        };
        self.emit(action::CREATE_PLAYLIST, serde_json::to_value(&playlist).unwrap_or_default()).await;
        Ok(playlist)
    }

    /// Applies each `{playlist_id, checked}` update in order: `true` inserts at the
    /// tail (`MAX(position)+1`, ignored if already present); `false` removes the row.
    pub async fn update_track_playlists(&self, track_id: &str, updates: &[PlaylistUpdate]) -> Result<()> {
        {
            let conn = self.conn.lock().await;
            for update in updates {
                if update.checked {
                    let max_pos: Option<f64> = conn.query_row(
                        "SELECT MAX(position) FROM playlist_tracks WHERE playlist_id = ?1",
                        rusqlite::params![update.playlist_id],
                        |row| row.get(0),
                    )?;
                    let new_position = max_pos.unwrap_or(0.0) + 1.0;
                    conn.execute(
                        "INSERT INTO playlist_tracks (playlist_id, track_id, position)
                         VALUES (?1, ?2, ?3)
                         ON CONFLICT(playlist_id, track_id) DO NOTHING",
                        rusqlite::params![update.playlist_id, track_id, new_position],
                    )?;
                } else {
                    conn.execute(
                        "DELETE FROM playlist_tracks WHERE playlist_id = ?1 AND track_id = ?2",
                        rusqlite::params![update.playlist_id, track_id],
                    )?;
                }
            }
        }
        self.emit(
            action::UPDATE_PLAYLISTS,
            serde_json::json!({ "id": track_id, "updates": updates }),
        )
        .await;
        Ok(())
    }

    /// Moves the playlist track at `from` to `to` (both 0-based, pre-removal indices).
    /// Returns `false` on an out-of-range index.
    pub async fn reorder_playlist_track(&self, playlist_id: i64, from: usize, to: usize) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT track_id, position FROM playlist_tracks WHERE playlist_id = ?1 ORDER BY position ASC",
        )?;
        let rows: Vec<(String, f64)> = stmt
            .query_map(rusqlite::params![playlist_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if rows.is_empty() || from >= rows.len() || to >= rows.len() {
            return Ok(false);
        }

        let mut remaining = rows;
        let (track_id, _) = remaining.remove(from);
        let remaining_positions: Vec<f64> = remaining.iter().map(|(_, p)| *p).collect();
        let new_position = position_for_index(&remaining_positions, to);

        conn.execute(
            "UPDATE playlist_tracks SET position = ?1 WHERE playlist_id = ?2 AND track_id = ?3",
            rusqlite::params![new_position, playlist_id, track_id],
        )?;
        Ok(true)
    }

    /// Renames a playlist. Emits `edit_playlist`.
    pub async fn edit_playlist(&self, playlist_id: i64, name: &str) -> Result<()> {
        {
            let conn = self.conn.lock().await;
            let changed = conn.execute(
                "UPDATE playlists SET name = ?1 WHERE id = ?2",
                rusqlite::params![name, playlist_id],
            )?;
            if changed == 0 {
                return Err(CatalogError::UnknownPlaylist(playlist_id));
            }
        }
        self.emit(action::EDIT_PLAYLIST, serde_json::json!({ "id": playlist_id, "name": name })).await;
        Ok(())
    }

    /// Deletes a playlist; cascades to `playlist_tracks`. Emits `delete_playlist`.
    pub async fn delete_playlist(&self, playlist_id: i64) -> Result<()> {
        {
            let conn = self.conn.lock().await;
            conn.execute("DELETE FROM playlists WHERE id = ?1", rusqlite::params![playlist_id])?;
        }
        self.emit(action::DELETE_PLAYLIST, serde_json::json!({ "id": playlist_id })).await;
        Ok(())
    }
}
