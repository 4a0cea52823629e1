use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use scuttle_config::Config;
use scuttle_supervisor::{serve_control_port, run_set_webhook, run_setup, ShutdownSignal, SleepInhibitor, Supervisor, SupervisorConfig};
use tokio::process::Command;
use tracing_subscriber::EnvFilter;

/// Supervises the audio service's HTTP server and public tunnel.
#[derive(Parser, Debug)]
#[command(name = "scuttle-supervisor")]
struct Cli {
    /// Install external tool binaries into `<root>/tools/` and exit.
    #[arg(long)]
    setup: bool,

    /// Persist a webhook URL to the on-disk config and exit.
    #[arg(long, value_name = "URL")]
    set_webhook: Option<String>,

    /// Override the control port from config (0 disables it).
    #[arg(long)]
    control_port: Option<u16>,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Root directory holding `scuttle.yaml` and the `tools/`/`backend/` layout.
    #[arg(long, default_value = ".")]
    config_dir: String,
}

fn init_tracing(verbose: bool, configured_level: &str) {
    let default_level = if verbose { "debug" } else { configured_level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    scuttle_config::init(cli.config_dir.clone()).ok();
    let config = scuttle_config::get_config();
    init_tracing(cli.verbose, &config.log_min_level());

    if cli.setup {
        run_setup(config)?;
        return Ok(());
    }
    if let Some(url) = cli.set_webhook {
        run_set_webhook(config, &url)?;
        return Ok(());
    }

    let shutdown = Arc::new(ShutdownSignal::new());

    let ctrl_c_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down supervisor");
            ctrl_c_signal.trigger();
        }
    });

    let control_port = cli.control_port.or_else(|| config.control_port());
    if let Some(port) = control_port {
        let signal = shutdown.clone();
        tokio::spawn(async move { serve_control_port(port, signal).await });
    }

    let inhibitor = SleepInhibitor::acquire();

    let http_port = config.http_port();
    let tunnel_bin = config.tunnel_binary_path().unwrap_or_else(|| "cloudflared".into());
    let server_bin = std::env::current_exe().unwrap_or_else(|_| "scuttle-server".into());

    let sup_config = SupervisorConfig {
        poll_interval: config.supervisor_poll_interval(),
        activity_timeout: config.supervisor_activity_timeout(),
        webhook_url: config.webhook_url(),
        ..SupervisorConfig::default()
    };

    let supervisor = Supervisor::new(
        sup_config,
        move || {
            let mut cmd = Command::new(&server_bin);
            cmd.arg("serve").arg("--port").arg(http_port.to_string());
            cmd
        },
        move || {
            let mut cmd = Command::new(&tunnel_bin);
            cmd.arg("tunnel").arg("--url").arg(format!("http://localhost:{http_port}"));
            cmd
        },
    );

    supervisor.run(shutdown).await;
    inhibitor.release().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
