use crate::catalog::{action, Catalog};
use crate::error::Result;
use crate::models::Track;

const SEARCH_CAP: i64 = 30;

impl Catalog {
    /// Empty `q` returns every downloaded track, most recent first. Non-empty `q` is
    /// tokenized, each token suffixed with `*` for an FTS5 prefix match, and ranked by
    /// `bm25(title_weight=1.0, artist_weight=1.5) * title.pref_weight * max(artist.pref_weight)`
    /// (lower is better), capped at 30 rows. Emits `search`.
    pub async fn search(&self, q: &str) -> Result<Vec<Track>> {
        let q = q.trim();
        let tracks = if q.is_empty() {
            self.search_empty().await?
        } else {
            self.search_query(q).await?
        };
        self.emit(action::SEARCH, serde_json::json!({ "content": tracks })).await;
        Ok(tracks)
    }

    async fn search_empty(&self) -> Result<Vec<Track>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT t.id, COALESCE(t.title_display, t.title) AS title, t.duration,
                    COALESCE(GROUP_CONCAT(COALESCE(t.artist_display, a.artist), ', '), '') AS artist
             FROM tracks t
             INNER JOIN downloads d ON d.id = t.id
             LEFT JOIN track_artists ta ON ta.track_rowid = t.rowid
             LEFT JOIN artists a ON a.rowid = ta.artist_rowid
             GROUP BY t.id
             ORDER BY d.downloaded_at DESC, d.rowid DESC",
        )?;
        let tracks = stmt
            .query_map([], |row| {
                Ok(Track {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    duration: row.get(2)?,
                    artist: row.get(3)?,
                    title_display: None,
                    artist_display: None,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    async fn search_query(&self, q: &str) -> Result<Vec<Track>> {
        let fts_query = q.split_whitespace().map(|token| format!("{token}*")).collect::<Vec<_>>().join(" ");

        let conn = self.conn.lock().await;
        // Ranking can't be expressed as a single ORDER BY (LN_BOOST needs a GROUP BY
        // aggregate over artists), so rank rows in Rust after fetching.
        let mut stmt = conn.prepare(
            "SELECT t.id, COALESCE(t.title_display, t.title) AS title, t.duration,
                    COALESCE(GROUP_CONCAT(COALESCE(t.artist_display, a.artist), ', '), '') AS artist,
                    bm25(catalog_fts, 1.0, 1.5) AS rank,
                    LN_BOOST(t.pref) AS title_pref_weight,
                    MAX(COALESCE(LN_BOOST(a.pref), 1.0)) AS artist_pref_weight
             FROM tracks t
             JOIN catalog_fts fts ON fts.rowid = t.rowid
             LEFT JOIN track_artists ta ON ta.track_rowid = t.rowid
             LEFT JOIN artists a ON a.rowid = ta.artist_rowid
             WHERE catalog_fts MATCH ?1
             GROUP BY t.id",
        )?;

        let mut scored: Vec<(f64, Track)> = stmt
            .query_map(rusqlite::params![fts_query], |row| {
                let rank: f64 = row.get(4)?;
                let title_pref: f64 = row.get(5)?;
                let artist_pref: f64 = row.get(6)?;
                let track = Track {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    duration: row.get(2)?,
                    artist: row.get(3)?,
                    title_display: None,
                    artist_display: None,
                };
                Ok((rank * title_pref * artist_pref, track))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(SEARCH_CAP as usize);
        Ok(scored.into_iter().map(|(_, track)| track).collect())
    }
}
