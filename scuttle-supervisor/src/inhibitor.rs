use std::time::Duration;

use tokio::process::Command;

use crate::child::ManagedChild;

/// Best-effort system-sleep inhibitor. On Linux this holds a
/// `systemd-inhibit` child alive for the supervisor's lifetime; on any other
/// platform, or if `systemd-inhibit` isn't on `PATH`, acquisition is a no-op — the
/// supervisor still runs, it just won't stop the host from suspending.
pub struct SleepInhibitor {
    holder: Option<ManagedChild>,
}

impl SleepInhibitor {
    #[cfg(target_os = "linux")]
    pub fn acquire() -> Self {
        let mut cmd = Command::new("systemd-inhibit");
        cmd.args([
            "--what=sleep",
            "--who=scuttle",
            "--why=audio download/streaming in progress",
            "--mode=block",
            "sleep",
            "infinity",
        ]);
        match ManagedChild::spawn("sleep-inhibitor", cmd) {
            Ok(child) => {
                tracing::info!("acquired sleep inhibitor");
                Self { holder: Some(child) }
            }
            Err(err) => {
                tracing::warn!(error = %err, "systemd-inhibit unavailable; sleep inhibitor disabled");
                Self { holder: None }
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn acquire() -> Self {
        tracing::info!("sleep inhibitor not implemented on this platform; no-op");
        Self { holder: None }
    }

    /// Releases the inhibitor, if one was acquired.
    pub async fn release(mut self) {
        if let Some(mut holder) = self.holder.take() {
            holder.terminate(Duration::from_secs(2)).await;
            tracing::info!("released sleep inhibitor");
        }
    }
}
