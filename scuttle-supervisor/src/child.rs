use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::error::{Result, SupervisorError};

/// A supervised child process whose stdout is drained line-by-line into an
/// unbounded queue by a background task: the supervise loop polls the queue
/// non-blockingly to detect activity without ever blocking on the child's I/O.
pub struct ManagedChild {
    name: String,
    child: Child,
    lines: mpsc::UnboundedReceiver<String>,
}

impl ManagedChild {
    /// Spawns `cmd` with stdout piped and merged-in-spirit stderr (redirected to
    /// stdout, matching `subprocess.STDOUT` in the original), and starts a
    /// background task forwarding each line into an unbounded channel.
    pub fn spawn(name: impl Into<String>, mut cmd: Command) -> Result<Self> {
        let name = name.into();
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn { name: name.clone(), source })?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");
        let (tx, rx) = mpsc::unbounded_channel();

        let tx_out = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx_out.send(line).is_err() {
                    break;
                }
            }
        });
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        tracing::info!(name = %name, pid = child.id(), "spawned child process");
        Ok(Self { name, child, lines: rx })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-blocking: `true` if the process has not yet exited.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Drains every line currently buffered without blocking. Returns an empty
    /// `Vec` if nothing has arrived since the last drain.
    pub fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.lines.try_recv() {
            lines.push(line);
        }
        lines
    }

    /// SIGTERM, wait up to `grace`, SIGKILL if still alive, then reap.
    pub async fn terminate(&mut self, grace: Duration) {
        if !self.is_alive() {
            return;
        }
        tracing::info!(name = %self.name, "terminating child process");
        send_sigterm(self.child.id()).await;

        let deadline = tokio::time::Instant::now() + grace;
        while tokio::time::Instant::now() < deadline {
            if !self.is_alive() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        if self.is_alive() {
            tracing::warn!(name = %self.name, "child did not exit after SIGTERM, sending SIGKILL");
            let _ = self.child.kill().await;
        }
        let _ = self.child.wait().await;
    }
}

#[cfg(unix)]
async fn send_sigterm(pid: Option<u32>) {
    if let Some(pid) = pid {
        let _ = Command::new("kill").arg("-TERM").arg(pid.to_string()).status().await;
    }
}

#[cfg(not(unix))]
async fn send_sigterm(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drains_stdout_lines_as_they_arrive() {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg("echo one; echo two");
        let mut child = ManagedChild::spawn("echoer", cmd).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let lines = child.drain_lines();
        assert!(lines.contains(&"one".to_string()));
        assert!(lines.contains(&"two".to_string()));
    }

    #[tokio::test]
    async fn is_alive_reflects_process_state() {
        let mut cmd = Command::new("/bin/sleep");
        cmd.arg("5");
        let mut child = ManagedChild::spawn("sleeper", cmd).unwrap();
        assert!(child.is_alive());

        child.terminate(Duration::from_secs(2)).await;
        assert!(!child.is_alive());
    }

    #[tokio::test]
    async fn terminate_on_already_exited_process_is_a_noop() {
        let mut cmd = Command::new("/bin/true");
        let mut child = ManagedChild::spawn("quick", cmd.arg("x")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!child.is_alive());

        child.terminate(Duration::from_secs(1)).await;
    }
}
