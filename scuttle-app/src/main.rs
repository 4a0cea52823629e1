use scuttle_app::AppContext;
use scuttle_queue::DownloadJob;
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = scuttle_config::get_config();
    init_tracing(&config.log_min_level());

    tracing::info!("booting audio service core");
    let ctx = AppContext::bootstrap(config).await?;

    let worker = ctx.worker();
    let worker_handle = tokio::spawn(async move { worker.run().await });

    tracing::info!(port = config.http_port(), "core ready; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutdown requested, draining download worker");
    ctx.download_queue.push(DownloadJob::shutdown_sentinel()).await;
    let _ = worker_handle.await;

    tracing::info!("audio service core stopped");
    Ok(())
}
