use crate::catalog::{action, Catalog};
use crate::error::Result;
use crate::position::position_for_index;

impl Catalog {
    /// Toggles the liked status of `id`: removes it if present, else inserts it at
    /// the head (`MIN(position) - 1`).
    pub async fn toggle_like(&self, id: &str) -> Result<()> {
        {
            let conn = self.conn.lock().await;
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM likes WHERE track_id = ?1)",
                rusqlite::params![id],
                |row| row.get(0),
            )?;

            if exists {
                conn.execute("DELETE FROM likes WHERE track_id = ?1", rusqlite::params![id])?;
            } else {
                let min_pos: Option<f64> =
                    conn.query_row("SELECT MIN(position) FROM likes", [], |row| row.get(0))?;
                let new_position = min_pos.unwrap_or(0.0) - 1.0;
                conn.execute(
                    "INSERT INTO likes (track_id, position) VALUES (?1, ?2)",
                    rusqlite::params![id, new_position],
                )?;
            }
        }
        Ok(())
    }

    /// Ordered track ids in the likes list. Emits `fetch_likes`.
    pub async fn fetch_liked_tracks(&self) -> Result<Vec<String>> {
        let ids = {
            let conn = self.conn.lock().await;
            let mut stmt = conn.prepare("SELECT track_id FROM likes ORDER BY position ASC")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ids
        };
        self.emit(action::FETCH_LIKES, serde_json::json!({ "content": ids })).await;
        Ok(ids)
    }

    /// Moves the liked track at `from` to `to` (both 0-based, pre-removal indices).
    /// Returns `false` on an out-of-range index instead of raising.
    pub async fn reorder_likes(&self, from: usize, to: usize) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT track_id, position FROM likes ORDER BY position ASC")?;
        let rows: Vec<(String, f64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if rows.is_empty() || from >= rows.len() || to >= rows.len() {
            return Ok(false);
        }

        let mut remaining = rows;
        let (track_id, _) = remaining.remove(from);
        let remaining_positions: Vec<f64> = remaining.iter().map(|(_, p)| *p).collect();
        let new_position = position_for_index(&remaining_positions, to);

        conn.execute(
            "UPDATE likes SET position = ?1 WHERE track_id = ?2",
            rusqlite::params![new_position, track_id],
        )?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::Track;
    use crate::Catalog;

    async fn fresh_catalog() -> Catalog {
        let catalog = Catalog::open_in_memory(None).unwrap();
        catalog.build_schema().await.unwrap();
        catalog
    }

    async fn seed_track(catalog: &Catalog, id: &str) {
        catalog.register_track(&Track::new(id, id, "Artist", 1.0)).await.unwrap();
    }

    #[tokio::test]
    async fn toggle_like_twice_is_identity() {
        let catalog = fresh_catalog().await;
        seed_track(&catalog, "a").await;
        catalog.toggle_like("a").await.unwrap();
        assert_eq!(catalog.fetch_liked_tracks().await.unwrap(), vec!["a".to_string()]);
        catalog.toggle_like("a").await.unwrap();
        assert!(catalog.fetch_liked_tracks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_like_goes_to_the_top() {
        let catalog = fresh_catalog().await;
        for id in ["a", "b"] {
            seed_track(&catalog, id).await;
            catalog.toggle_like(id).await.unwrap();
        }
        assert_eq!(catalog.fetch_liked_tracks().await.unwrap(), vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn reorder_out_of_range_returns_false() {
        let catalog = fresh_catalog().await;
        seed_track(&catalog, "a").await;
        catalog.toggle_like("a").await.unwrap();
        assert!(!catalog.reorder_likes(5, 0).await.unwrap());
    }

    #[tokio::test]
    async fn reorder_moves_track_and_preserves_order_of_the_rest() {
        let catalog = fresh_catalog().await;
        for id in ["a", "b", "c"] {
            seed_track(&catalog, id).await;
        }
        // pushed in order a, b, c -> liked list ends up [c, b, a]
        for id in ["a", "b", "c"] {
            catalog.toggle_like(id).await.unwrap();
        }
        assert!(catalog.reorder_likes(2, 0).await.unwrap());
        assert_eq!(catalog.fetch_liked_tracks().await.unwrap(), vec!["a".to_string(), "c".to_string(), "b".to_string()]);
    }
}
