//! Daemon lifecycle abstraction
//!
//! Every node-local OS service required for cluster membership (container
//! runtime, kubelet, credential-refresh helper) implements [`Daemon`]: a
//! Configure/EnsureRunning/Stop lifecycle driven by a node provider. The
//! [`DaemonManager`] collaborator owns the actual init-system operations; a
//! systemctl-backed implementation is provided, and tests substitute a
//! recording fake.

mod systemd;

pub use systemd::SystemdManager;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::Result;

/// A node-local OS service with a managed lifecycle
#[async_trait]
pub trait Daemon: Send + Sync {
    /// The OS service unit name this daemon is bound to
    fn name(&self) -> &str;

    /// Write the daemon's configuration to disk
    async fn configure(&self) -> Result<()>;

    /// Bring the daemon up, restarting it if already running
    async fn ensure_running(&self) -> Result<()>;

    /// Hook invoked after the daemon has been started
    async fn post_launch(&self) -> Result<()>;

    /// Stop the daemon's unit
    async fn stop(&self) -> Result<()>;
}

impl std::fmt::Debug for dyn Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon").field("name", &self.name()).finish()
    }
}

/// Init-system adapter that starts, stops, and reloads named services
///
/// Implementations are collaborators: the core never reaches into global
/// state, it only calls through this trait.
#[async_trait]
pub trait DaemonManager: Send + Sync {
    /// Reload the init system's unit definitions
    async fn daemon_reload(&self) -> Result<()>;

    /// Enable the named unit to start at boot
    async fn enable_daemon(&self, name: &str) -> Result<()>;

    /// Restart the named unit, starting it if stopped
    async fn restart_daemon(&self, name: &str) -> Result<()>;

    /// Stop the named unit
    async fn stop_daemon(&self, name: &str) -> Result<()>;

    /// Release any resources held by the manager; safe to call repeatedly
    fn close(&self);
}
