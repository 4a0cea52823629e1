use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use scuttle_events::{Event, EventBus};
use tokio::sync::Mutex;

use crate::error::Result;

const SCHEMA_SQL: &str = include_str!("../schema/schema.sql");
const SEED_CSV: &str = include_str!("../schema/seed.csv");

pub const CATALOG_NAME: &str = "audio_database";

pub mod action {
    pub const SET_METADATA: &str = "set_metadata";
    pub const CREATE_PLAYLIST: &str = "create_playlist";
    pub const UPDATE_PLAYLISTS: &str = "update_playlists";
    pub const EDIT_PLAYLIST: &str = "edit_playlist";
    pub const DELETE_PLAYLIST: &str = "delete_playlist";
    pub const LOG_TRACK: &str = "log_track";
    pub const UNLOG_TRACK: &str = "unlog_track";
    pub const LOG_DOWNLOAD: &str = "log_download";
    pub const UNLOG_DOWNLOAD: &str = "unlog_download";
    pub const GET_DOWNLOADS_CONTENT: &str = "get_downloads_content";
    pub const SEARCH: &str = "search";
    pub const FETCH_LIKES: &str = "fetch_likes";
    pub const GET_ALL_PLAYLISTS: &str = "get_all_playlists";
    pub const GET_PLAYLIST_CONTENT: &str = "get_playlist_content";
}

/// Relational store backing the track/playlist catalog. Every public method takes the async lock, so the
/// underlying `rusqlite::Connection` only ever sees one caller at a time.
pub struct Catalog {
    pub(crate) conn: Mutex<Connection>,
    pub(crate) event_bus: Option<Arc<EventBus>>,
}

fn sql_ln_boost(pref: f64) -> f64 {
    // at x=0 y=1, at x=1 y≈1.69 — a ~70% max boost.
    1.0 + (pref + 1.0).ln()
}

impl Catalog {
    /// Opens (creating if absent) the catalog at `path`, applies pragmas, registers
    /// `LN_BOOST`, and builds the schema if the database is new.
    pub fn open(path: &Path, event_bus: Option<Arc<EventBus>>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let is_new = !path.exists();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        conn.create_scalar_function(
            "LN_BOOST",
            1,
            rusqlite::functions::FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let pref: f64 = ctx.get(0)?;
                Ok(sql_ln_boost(pref))
            },
        )?;

        let catalog = Self {
            conn: Mutex::new(conn),
            event_bus,
        };

        if is_new {
            tracing::info!(path = %path.display(), "creating new catalog database");
        }
        Ok(catalog)
    }

    /// In-memory catalog, used by tests.
    #[cfg(test)]
    pub fn open_in_memory(event_bus: Option<Arc<EventBus>>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.create_scalar_function(
            "LN_BOOST",
            1,
            rusqlite::functions::FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let pref: f64 = ctx.get(0)?;
                Ok(sql_ln_boost(pref))
            },
        )?;
        let catalog = Self {
            conn: Mutex::new(conn),
            event_bus,
        };
        Ok(catalog)
    }

    pub async fn build_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Populates the catalog from the embedded seed CSV if `tracks` is currently
    /// empty. A no-op on a catalog that already has data, or when the seed file is
    /// empty (the shipped default has a header row only).
    pub async fn seed(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        let mut reader = csv::Reader::from_reader(SEED_CSV.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().filter_map(|r| r.ok()).collect();
        if rows.is_empty() {
            return Ok(());
        }

        let headers = reader.headers()?.clone();
        let col = |row: &csv::StringRecord, name: &str| -> String {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|i| row.get(i))
                .unwrap_or("")
                .to_string()
        };

        let pops: Vec<f64> = rows
            .iter()
            .filter_map(|r| col(r, "popularity").parse::<f64>().ok())
            .collect();
        let min_pop = pops.iter().cloned().fold(f64::INFINITY, f64::min);
        let min_pop = if min_pop.is_finite() { min_pop } else { 0.0 };

        conn.execute_batch("PRAGMA synchronous = OFF; PRAGMA journal_mode = MEMORY;")?;

        for row in &rows {
            let title = col(row, "track_name");
            let native_id = col(row, "track_id");
            let title_id = format!("SEED___{native_id}");
            let popularity: f64 = col(row, "popularity").parse().unwrap_or(min_pop);
            let pref = (popularity - min_pop) / 50.0;
            let duration: f64 = col(row, "duration").parse().unwrap_or(0.0);

            conn.execute(
                "INSERT OR IGNORE INTO tracks (id, title, duration, pref) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![title_id, title, duration, pref],
            )?;

            let names: Vec<&str> = col(row, "artist_names").split('|').map(|s| s.trim()).collect();
            let artist_ids: Vec<String> = col(row, "artist_ids").split('|').map(|s| s.trim().to_string()).collect();

            for (name, artist_id) in names.iter().zip(artist_ids.iter()) {
                if name.is_empty() || artist_id.is_empty() {
                    continue;
                }
                conn.execute(
                    "INSERT OR IGNORE INTO artists (id, artist) VALUES (?1, ?2)",
                    rusqlite::params![artist_id, name],
                )?;
                conn.execute(
                    "INSERT OR IGNORE INTO track_artists (track_rowid, artist_rowid)
                     SELECT t.rowid, a.rowid FROM tracks t, artists a
                     WHERE t.id = ?1 AND a.id = ?2",
                    rusqlite::params![title_id, artist_id],
                )?;
            }
        }

        drop(conn);
        self.rebuild_search_index().await?;
        tracing::info!(rows = rows.len(), "catalog seed complete");
        Ok(())
    }

    /// Deletes and repopulates the FTS index from `tracks_search`. Idempotent; safe to
    /// call after any bulk mutation.
    pub async fn rebuild_search_index(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute("INSERT INTO catalog_fts(catalog_fts) VALUES ('delete-all')", [])?;
        conn.execute("INSERT INTO catalog_fts(catalog_fts) VALUES ('rebuild')", [])?;
        Ok(())
    }

    pub(crate) async fn emit(&self, action: &str, payload: serde_json::Value) {
        if let Some(bus) = &self.event_bus {
            bus.publish(Event::new(CATALOG_NAME, action, payload)).await;
        }
    }
}
