use std::path::PathBuf;

use anyhow::Result;
use scuttle_config::Config;

/// One external tool this service depends on, and the environment key its
/// resolved path is recorded under.
struct ToolSpec {
    env_key: &'static str,
    candidates: &'static [&'static str],
}

const TOOLS: &[ToolSpec] = &[
    ToolSpec { env_key: "TUNNEL_BIN_PATH", candidates: &["cloudflared"] },
    ToolSpec { env_key: "PYTHON_BIN_PATH", candidates: &["python3", "python"] },
    ToolSpec { env_key: "FFMPEG_BIN_PATH", candidates: &["ffmpeg"] },
    ToolSpec { env_key: "FFPROBE_BIN_PATH", candidates: &["ffprobe"] },
    ToolSpec { env_key: "JS_RUNTIME_BIN_PATH", candidates: &["node", "deno", "bun"] },
];

fn locate_on_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).map(|dir| dir.join(name)).find(|candidate| {
        candidate.is_file()
            && candidate
                .metadata()
                .map(|m| {
                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::PermissionsExt;
                        m.permissions().mode() & 0o111 != 0
                    }
                    #[cfg(not(unix))]
                    {
                        true
                    }
                })
                .unwrap_or(false)
    })
}

/// `--setup`: resolves every external tool binary from `PATH`, records the
/// resolved paths as `KEY=value` lines in `<tools_dir>/tool_paths.env`, and
/// creates `tools_dir` if absent. Never fails the process — a missing tool is
/// logged and left unresolved, since the operator may install it later.
pub fn run(config: &Config) -> Result<()> {
    let tools_dir = config.tools_dir();
    std::fs::create_dir_all(&tools_dir)?;

    let mut resolved = Vec::new();
    for tool in TOOLS {
        let found = tool.candidates.iter().find_map(|name| locate_on_path(name));
        match found {
            Some(path) => {
                tracing::info!(tool = tool.env_key, path = %path.display(), "resolved tool binary");
                resolved.push((tool.env_key, path));
            }
            None => {
                tracing::warn!(tool = tool.env_key, candidates = ?tool.candidates, "tool binary not found on PATH");
            }
        }
    }

    let env_file = tools_dir.join("tool_paths.env");
    let contents = resolved
        .iter()
        .map(|(key, path)| format!("{key}={}\n", path.display()))
        .collect::<String>();
    std::fs::write(&env_file, contents)?;

    tracing::info!(
        resolved = resolved.len(),
        total = TOOLS.len(),
        env_file = %env_file.display(),
        "setup complete"
    );
    Ok(())
}

/// `--set-webhook URL`: persists the webhook URL to the config override file.
pub fn run_set_webhook(config: &Config, url: &str) -> Result<()> {
    config.persist_webhook_url(url)?;
    tracing::info!("webhook URL saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_creates_tools_dir_and_env_file_even_with_missing_tools() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        run(&config).unwrap();

        assert!(config.tools_dir().join("tool_paths.env").exists());
    }

    #[test]
    fn set_webhook_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        run_set_webhook(&config, "https://discord.example/hooks/xyz").unwrap();

        let reloaded = Config::load(dir.path()).unwrap();
        assert_eq!(reloaded.webhook_url().as_deref(), Some("https://discord.example/hooks/xyz"));
    }
}
