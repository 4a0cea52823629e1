//! Configuration for the audio service: an embedded default YAML document merged
//! with an optional on-disk override and environment-variable overrides, exposed as
//! a process-wide singleton.
//!
//! Covers just this service's needs: paths, the HTTP port, fetcher/post-processor
//! binary locations and timeouts, and log level.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use serde_yaml::{Mapping, Value};

const DEFAULT_CONFIG: &str = include_str!("scuttle.yaml");

const ENV_CONFIG_DIR: &str = "SCUTTLE_CONFIG_DIR";
const ENV_PREFIX: &str = "SCUTTLE_CONFIG__";

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_DOWNLOAD_DIR: &str = "backend/data/downloads";
const DEFAULT_DB_PATH: &str = "backend/data/audio.db";
const DEFAULT_TOOLS_DIR: &str = "tools";
const DEFAULT_SOURCE_TAG: &str = "YT___";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;
const DEFAULT_LOG_MIN_LEVEL: &str = "info";

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Process-wide configuration, loaded once and shared behind a singleton.
///
/// Values are stored as a merged `serde_yaml::Value` tree: typed getters read out
/// of the tree with sane defaults rather than failing the whole process on a
/// missing key.
#[derive(Debug)]
pub struct Config {
    root: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Loads configuration rooted at `root`: reads `<root>/scuttle.yaml` if present,
    /// merges it over the embedded default document, then applies `SCUTTLE_CONFIG__`
    /// environment overrides (double underscore splits nested keys, e.g.
    /// `SCUTTLE_CONFIG__SERVER__HTTP_PORT=9000`).
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("creating config root {}", root.display()))?;

        let mut merged: Value = serde_yaml::from_str(DEFAULT_CONFIG)
            .context("parsing embedded default configuration")?;

        let override_path = root.join("scuttle.yaml");
        if let Ok(bytes) = std::fs::read(&override_path) {
            let external: Value = serde_yaml::from_slice(&bytes)
                .with_context(|| format!("parsing {}", override_path.display()))?;
            merge_yaml(&mut merged, &external);
        }

        apply_env_overrides(&mut merged);

        tracing::info!(root = %root.display(), "loaded scuttle configuration");
        Ok(Self { root, data: Mutex::new(merged) })
    }

    /// Loads from `SCUTTLE_CONFIG_DIR` if set, else the current directory.
    pub fn load_default() -> Result<Self> {
        let root = env::var(ENV_CONFIG_DIR).unwrap_or_else(|_| ".".to_string());
        Self::load(root)
    }

    fn get(&self, path: &[&str]) -> Option<Value> {
        let data = self.data.lock().expect("config lock poisoned");
        let mut current = &*data;
        for key in path {
            match current {
                Value::Mapping(map) => current = map.get(Value::String(key.to_string()))?,
                _ => return None,
            }
        }
        Some(current.clone())
    }

    fn get_str(&self, path: &[&str]) -> Option<String> {
        match self.get(path)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn resolve_path(&self, relative: &str) -> PathBuf {
        let p = Path::new(relative);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    pub fn config_root(&self) -> &Path {
        &self.root
    }

    pub fn download_dir(&self) -> PathBuf {
        let rel = self.get_str(&["paths", "download_dir"]).unwrap_or_else(|| DEFAULT_DOWNLOAD_DIR.to_string());
        self.resolve_path(&rel)
    }

    pub fn db_path(&self) -> PathBuf {
        let rel = self.get_str(&["paths", "db_path"]).unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        self.resolve_path(&rel)
    }

    pub fn tools_dir(&self) -> PathBuf {
        let rel = self.get_str(&["paths", "tools_dir"]).unwrap_or_else(|| DEFAULT_TOOLS_DIR.to_string());
        self.resolve_path(&rel)
    }

    pub fn http_port(&self) -> u16 {
        match self.get(&["server", "http_port"]) {
            Some(Value::Number(n)) => n.as_u64().map(|v| v as u16).unwrap_or(DEFAULT_HTTP_PORT),
            Some(Value::String(s)) => s.parse().unwrap_or(DEFAULT_HTTP_PORT),
            _ => DEFAULT_HTTP_PORT,
        }
    }

    pub fn log_min_level(&self) -> String {
        self.get_str(&["log", "min_level"]).unwrap_or_else(|| DEFAULT_LOG_MIN_LEVEL.to_string())
    }

    pub fn fetcher_codec(&self) -> String {
        self.get_str(&["fetcher", "codec"]).unwrap_or_else(|| "opus".to_string())
    }

    pub fn fetcher_source_tag(&self) -> String {
        self.get_str(&["fetcher", "source_tag"]).unwrap_or_else(|| DEFAULT_SOURCE_TAG.to_string())
    }

    pub fn fetcher_binary_path(&self) -> PathBuf {
        let rel = self.get_str(&["fetcher", "binary_path"]).unwrap_or_else(|| "tools/fetcher".to_string());
        self.resolve_path(&rel)
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        let secs = match self.get(&["fetcher", "fetch_timeout_secs"]) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            _ => DEFAULT_FETCH_TIMEOUT_SECS,
        };
        std::time::Duration::from_secs(secs)
    }

    pub fn ffmpeg_path(&self) -> String {
        self.get_str(&["postprocess", "ffmpeg_path"]).unwrap_or_else(|| "ffmpeg".to_string())
    }

    pub fn tunnel_binary_path(&self) -> Option<PathBuf> {
        self.get_str(&["supervisor", "tunnel_bin_path"])
            .or_else(|| env::var("TUNNEL_BIN_PATH").ok())
            .map(|s| self.resolve_path(&s))
    }

    pub fn webhook_url(&self) -> Option<String> {
        self.get_str(&["supervisor", "webhook_url"])
            .filter(|s| !s.is_empty())
            .or_else(|| env::var("DISCORD_WEBHOOK_URL").ok())
    }

    pub fn supervisor_poll_interval(&self) -> std::time::Duration {
        let secs = match self.get(&["supervisor", "poll_interval_secs"]) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(60),
            _ => 60,
        };
        std::time::Duration::from_secs(secs)
    }

    pub fn supervisor_activity_timeout(&self) -> std::time::Duration {
        let secs = match self.get(&["supervisor", "activity_timeout_secs"]) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(3 * 60 * 60),
            _ => 3 * 60 * 60,
        };
        std::time::Duration::from_secs(secs)
    }

    pub fn control_port(&self) -> Option<u16> {
        match self.get(&["supervisor", "control_port"]) {
            Some(Value::Number(n)) => match n.as_u64() {
                Some(0) | None => None,
                Some(v) => Some(v as u16),
            },
            _ => None,
        }
    }

    /// Persists `url` under `supervisor.webhook_url` and rewrites `<root>/scuttle.yaml`.
    /// Backs `--set-webhook`.
    pub fn persist_webhook_url(&self, url: &str) -> Result<()> {
        {
            let mut data = self.data.lock().expect("config lock poisoned");
            set_path(&mut data, &["supervisor", "webhook_url"], Value::String(url.to_string()));
        }
        self.save()
    }

    fn save(&self) -> Result<()> {
        let data = self.data.lock().expect("config lock poisoned");
        let yaml = serde_yaml::to_string(&*data)?;
        std::fs::write(self.root.join("scuttle.yaml"), yaml)?;
        Ok(())
    }
}

fn set_path(root: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        *root = value;
        return;
    }
    if !matches!(root, Value::Mapping(_)) {
        *root = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(map) = root {
        let key = Value::String(path[0].to_string());
        if path.len() == 1 {
            map.insert(key, value);
        } else {
            let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
            set_path(entry, &path[1..], value);
        }
    }
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

fn apply_env_overrides(config: &mut Value) {
    for (key, value) in env::vars() {
        if let Some(rest) = key.strip_prefix(ENV_PREFIX) {
            let path: Vec<&str> = rest.split("__").collect();
            let lowered: Vec<String> = path.iter().map(|s| s.to_lowercase()).collect();
            let path_refs: Vec<&str> = lowered.iter().map(|s| s.as_str()).collect();
            let yaml_value = serde_yaml::from_str::<Value>(&value).unwrap_or(Value::String(value));
            set_path(config, &path_refs, yaml_value);
        }
    }
}

/// Loads (if not already loaded) and returns the process-wide configuration.
///
/// # Panics
/// Panics if configuration has not yet been initialized via [`init`] and
/// [`Config::load_default`] fails (missing permissions, unparseable override file).
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| Config::load_default().expect("failed to load scuttle configuration"))
}

/// Explicitly initializes the singleton from a specific root, for binaries that take
/// a `--config-dir`-style flag. Must be called before the first [`get_config`] call;
/// a second call is a no-op and returns an error so callers notice the race.
pub fn init(root: impl Into<PathBuf>) -> Result<()> {
    let config = Config::load(root)?;
    CONFIG.set(config).map_err(|_| anyhow!("scuttle configuration already initialized"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.http_port(), DEFAULT_HTTP_PORT);
        assert_eq!(config.download_dir(), dir.path().join(DEFAULT_DOWNLOAD_DIR));
        assert_eq!(config.fetcher_source_tag(), DEFAULT_SOURCE_TAG);
    }

    #[test]
    fn override_file_wins_over_embedded_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scuttle.yaml"), "server:\n  http_port: 9001\n").unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.http_port(), 9001);
        // untouched keys still come from the embedded default
        assert_eq!(config.fetcher_codec(), "opus");
    }

    #[test]
    fn env_override_wins_over_both() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scuttle.yaml"), "server:\n  http_port: 9001\n").unwrap();

        // SAFETY: test-local env var, no other test in this process reads it concurrently.
        unsafe { env::set_var("SCUTTLE_CONFIG__SERVER__HTTP_PORT", "9500") };
        let config = Config::load(dir.path()).unwrap();
        unsafe { env::remove_var("SCUTTLE_CONFIG__SERVER__HTTP_PORT") };

        assert_eq!(config.http_port(), 9500);
    }

    #[test]
    fn persist_webhook_url_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        config.persist_webhook_url("https://discord.example/hooks/abc").unwrap();

        let reloaded = Config::load(dir.path()).unwrap();
        assert_eq!(reloaded.webhook_url().as_deref(), Some("https://discord.example/hooks/abc"));
    }
}
