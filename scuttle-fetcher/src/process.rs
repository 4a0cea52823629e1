use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{FetchError, Result};

pub struct RunOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `cmd` as its own process group (Unix) so a timeout can reap the whole tree,
/// not just the immediate child yt-dlp spawns ffmpeg under. Stdout/stderr are
/// decoded as UTF-8 with replacement, matching tools that occasionally emit
/// non-UTF-8 bytes in titles from misencoded source metadata.
pub async fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<RunOutput> {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.as_std_mut().process_group(0);
    }
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| FetchError::FetchFailed(e.to_string()))?;
    let pid = child.id();

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(RunOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(e)) => Err(FetchError::FetchFailed(e.to_string())),
        Err(_elapsed) => {
            if let Some(pid) = pid {
                kill_process_group(pid).await;
            }
            Err(FetchError::Timeout(timeout))
        }
    }
}

#[cfg(unix)]
async fn kill_process_group(pid: u32) {
    // Best-effort: the child was placed in its own group above, so `-pid` reaches
    // every descendant (e.g. ffmpeg spawned by the fetch tool) in one signal.
    let _ = Command::new("kill").arg("-TERM").arg(format!("-{pid}")).status().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let _ = Command::new("kill").arg("-KILL").arg(format!("-{pid}")).status().await;
}

#[cfg(not(unix))]
async fn kill_process_group(_pid: u32) {}
