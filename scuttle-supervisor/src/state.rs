use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::child::ManagedChild;
use crate::shutdown::ShutdownSignal;
use crate::url_extract::extract_url;
use crate::webhook::notify;

/// Knobs for the supervision state machine. Durations are fields (rather than
/// constants) so tests can shrink the poll interval and activity timeout instead
/// of waiting on the production values.
pub struct SupervisorConfig {
    pub poll_interval: Duration,
    pub activity_timeout: Duration,
    pub terminate_grace: Duration,
    pub url_extract_timeout: Duration,
    pub restart_backoff: Duration,
    pub webhook_url: Option<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            activity_timeout: Duration::from_secs(3 * 60 * 60),
            terminate_grace: Duration::from_secs(5),
            url_extract_timeout: Duration::from_secs(60),
            restart_backoff: Duration::from_secs(2),
            webhook_url: None,
        }
    }
}

/// Boots and supervises the HTTP server and tunnel child processes, restarting
/// them on crash or inactivity and reporting lifecycle transitions to the
/// notification webhook.
pub struct Supervisor {
    config: SupervisorConfig,
    server_cmd: Box<dyn Fn() -> Command + Send + Sync>,
    tunnel_cmd: Box<dyn Fn() -> Command + Send + Sync>,
    http: reqwest::Client,
}

impl Supervisor {
    pub fn new(
        config: SupervisorConfig,
        server_cmd: impl Fn() -> Command + Send + Sync + 'static,
        tunnel_cmd: impl Fn() -> Command + Send + Sync + 'static,
    ) -> Self {
        Self { config, server_cmd: Box::new(server_cmd), tunnel_cmd: Box::new(tunnel_cmd), http: reqwest::Client::new() }
    }

    async fn notify(&self, text: &str) {
        notify(&self.http, self.config.webhook_url.as_deref(), text).await;
    }

    /// Outer restart loop: runs `run_once` until `shutdown` fires, applying a fixed
    /// backoff between crashed supervision cycles and posting the
    /// `"Supervisor starting"` / `"Supervisor stopped"` lifecycle messages on
    /// entry/exit. A cycle that errors is logged, not re-raised.
    pub async fn run(&self, shutdown: Arc<ShutdownSignal>) {
        self.notify("Supervisor starting").await;

        while !shutdown.is_set() {
            self.run_once(&shutdown).await;
            if shutdown.is_set() {
                break;
            }
            tracing::warn!(backoff = ?self.config.restart_backoff, "supervision cycle ended; restarting");
            tokio::time::sleep(self.config.restart_backoff).await;
        }

        self.notify("Supervisor stopped").await;
    }

    /// One INIT→START_SERVER→WAIT_READY→START_TUNNEL→EXTRACT_URL→SUPERVISE cycle.
    /// Returns when the whole cycle needs restarting (server died) or `shutdown`
    /// fired — in the latter case both children are terminated before returning.
    async fn run_once(&self, shutdown: &ShutdownSignal) {
        let mut server = match ManagedChild::spawn("server", (self.server_cmd)()) {
            Ok(c) => c,
            Err(err) => {
                tracing::error!(error = %err, "failed to start server");
                return;
            }
        };
        // WAIT_READY: no HTTP readiness probe here — give the server a moment to
        // bind before the tunnel starts pointing traffic at it.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let mut last_activity = Instant::now();

        loop {
            let mut tunnel = match ManagedChild::spawn("tunnel", (self.tunnel_cmd)()) {
                Ok(c) => c,
                Err(err) => {
                    tracing::error!(error = %err, "failed to start tunnel");
                    server.terminate(self.config.terminate_grace).await;
                    return;
                }
            };

            let url = self.extract_tunnel_url(&mut tunnel).await;
            match url {
                Some(url) => self.notify(&format!("tunnel ready: {url}")).await,
                None => self.notify("tunnel started but no public URL was detected").await,
            }

            let outcome = self.supervise(&mut server, &mut tunnel, &mut last_activity, shutdown).await;
            match outcome {
                SuperviseOutcome::Shutdown => {
                    tunnel.terminate(self.config.terminate_grace).await;
                    server.terminate(self.config.terminate_grace).await;
                    return;
                }
                SuperviseOutcome::RestartTunnel => {
                    self.notify("tunnel died; restarting tunnel only").await;
                    continue;
                }
                SuperviseOutcome::RestartBoth => {
                    tunnel.terminate(self.config.terminate_grace).await;
                    self.notify("restarting server and tunnel").await;
                    return;
                }
            }
        }
    }

    async fn extract_tunnel_url(&self, tunnel: &mut ManagedChild) -> Option<String> {
        let deadline = Instant::now() + self.config.url_extract_timeout;
        loop {
            for line in tunnel.drain_lines() {
                if let Some(url) = extract_url(&line) {
                    return Some(url);
                }
            }
            if !tunnel.is_alive() || Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    /// The SUPERVISE state: polls every `poll_interval` until a restart condition
    /// fires or `shutdown` is set.
    async fn supervise(
        &self,
        server: &mut ManagedChild,
        tunnel: &mut ManagedChild,
        last_activity: &mut Instant,
        shutdown: &ShutdownSignal,
    ) -> SuperviseOutcome {
        loop {
            tokio::select! {
                _ = shutdown.wait() => return SuperviseOutcome::Shutdown,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            if !server.drain_lines().is_empty() {
                *last_activity = Instant::now();
            }
            let _ = tunnel.drain_lines();

            if !server.is_alive() {
                tracing::error!("server process died");
                return SuperviseOutcome::RestartBoth;
            }
            if !tunnel.is_alive() {
                tracing::warn!("tunnel process died");
                return SuperviseOutcome::RestartTunnel;
            }
            if last_activity.elapsed() > self.config.activity_timeout {
                tracing::warn!(elapsed = ?last_activity.elapsed(), "no server stdout activity within timeout");
                return SuperviseOutcome::RestartBoth;
            }
        }
    }
}

enum SuperviseOutcome {
    Shutdown,
    RestartTunnel,
    RestartBoth,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleeper_cmd(secs: u64) -> Command {
        let mut cmd = Command::new("/bin/sleep");
        cmd.arg(secs.to_string());
        cmd
    }

    fn url_printer_cmd() -> Command {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg("echo 'tunnel up at https://fake.trycloudflare.com'; sleep 30");
        cmd
    }

    #[tokio::test]
    async fn restarts_tunnel_only_when_tunnel_dies() {
        let config = SupervisorConfig {
            poll_interval: Duration::from_millis(100),
            activity_timeout: Duration::from_secs(60),
            terminate_grace: Duration::from_millis(200),
            url_extract_timeout: Duration::from_millis(500),
            restart_backoff: Duration::from_millis(50),
            webhook_url: None,
        };
        let supervisor = Supervisor::new(config, || sleeper_cmd(30), || {
            let mut cmd = Command::new("/bin/sh");
            cmd.arg("-c").arg("exit 1");
            cmd
        });

        let shutdown = Arc::new(ShutdownSignal::new());
        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(400)).await;
            shutdown_clone.trigger();
        });

        tokio::time::timeout(Duration::from_secs(5), supervisor.run(shutdown)).await.unwrap();
    }

    #[tokio::test]
    async fn extracts_tunnel_url_and_continues_supervising() {
        let config = SupervisorConfig {
            poll_interval: Duration::from_millis(100),
            activity_timeout: Duration::from_secs(60),
            terminate_grace: Duration::from_millis(200),
            url_extract_timeout: Duration::from_secs(2),
            restart_backoff: Duration::from_millis(50),
            webhook_url: None,
        };
        let supervisor = Supervisor::new(config, || sleeper_cmd(30), url_printer_cmd);

        let shutdown = Arc::new(ShutdownSignal::new());
        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            shutdown_clone.trigger();
        });

        tokio::time::timeout(Duration::from_secs(5), supervisor.run(shutdown)).await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_during_supervise_terminates_both_children() {
        let config = SupervisorConfig {
            poll_interval: Duration::from_secs(30),
            activity_timeout: Duration::from_secs(60),
            terminate_grace: Duration::from_millis(200),
            url_extract_timeout: Duration::from_millis(200),
            restart_backoff: Duration::from_millis(50),
            webhook_url: None,
        };
        let supervisor = Supervisor::new(config, || sleeper_cmd(30), || sleeper_cmd(30));

        let shutdown = Arc::new(ShutdownSignal::new());
        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            shutdown_clone.trigger();
        });

        tokio::time::timeout(Duration::from_secs(5), supervisor.run(shutdown)).await.unwrap();
    }
}
