//! systemd-backed daemon manager
//!
//! Shells out to `systemctl`. Commands are bounded by a timeout so a hung
//! init system turns into an error instead of a stuck bootstrap.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::DaemonManager;
use crate::error::Error;
use crate::Result;

/// Timeout for individual systemctl invocations
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// [`DaemonManager`] implementation backed by systemctl
#[derive(Debug, Default)]
pub struct SystemdManager;

impl SystemdManager {
    /// Create a new systemd manager
    pub fn new() -> Self {
        Self
    }

    async fn systemctl(&self, unit: &str, args: &[&str]) -> Result<()> {
        debug!(unit = %unit, ?args, "Running systemctl");

        let output = tokio::time::timeout(
            COMMAND_TIMEOUT,
            Command::new("systemctl").args(args).output(),
        )
        .await
        .map_err(|_| Error::daemon(unit, format!("systemctl {args:?} timed out")))?
        .map_err(|e| Error::daemon(unit, format!("running systemctl: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::daemon(
                unit,
                format!("systemctl {args:?} failed: {}", stderr.trim()),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl DaemonManager for SystemdManager {
    async fn daemon_reload(&self) -> Result<()> {
        self.systemctl("*", &["daemon-reload"]).await
    }

    async fn enable_daemon(&self, name: &str) -> Result<()> {
        self.systemctl(name, &["enable", name]).await
    }

    async fn restart_daemon(&self, name: &str) -> Result<()> {
        self.systemctl(name, &["restart", name]).await
    }

    async fn stop_daemon(&self, name: &str) -> Result<()> {
        self.systemctl(name, &["stop", name]).await
    }

    fn close(&self) {}
}
