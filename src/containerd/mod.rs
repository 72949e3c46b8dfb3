//! Container runtime daemon
//!
//! Writes the containerd configuration and brings the unit up. containerd
//! must be running before kubelet starts, so the node providers list this
//! daemon first.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{AwsConfig, NodeConfig};
use crate::daemon::{Daemon, DaemonManager};
use crate::util::write_file_with_dir;
use crate::Result;

/// Unit name of the container runtime daemon
pub const CONTAINERD_DAEMON_NAME: &str = "containerd";

/// Path of the containerd configuration file, relative to the install root
const CONFIG_PATH: &str = "etc/containerd/config.toml";

/// Configuration template for containerd
///
/// Pinned to config schema version 2; the CRI plugin settings match what
/// kubelet expects (systemd cgroups, regional sandbox image).
const CONFIG_TEMPLATE: &str = r#"version = 2
root = "/var/lib/containerd"
state = "/run/containerd"

[grpc]
address = "/run/containerd/containerd.sock"

[plugins."io.containerd.grpc.v1.cri"]
sandbox_image = "{sandbox_image}"

[plugins."io.containerd.grpc.v1.cri".containerd.runtimes.runc.options]
SystemdCgroup = true
"#;

/// Regional ECR pause image used as the sandbox container
fn sandbox_image(region: &str) -> String {
    format!("602401143452.dkr.ecr.{region}.amazonaws.com/eks/pause:3.9")
}

/// Container runtime [`Daemon`]
pub struct ContainerdDaemon {
    manager: Arc<dyn DaemonManager>,
    node_config: NodeConfig,
    aws_config: AwsConfig,
    root: PathBuf,
}

impl ContainerdDaemon {
    /// Create the containerd daemon
    pub fn new(
        manager: Arc<dyn DaemonManager>,
        node_config: NodeConfig,
        aws_config: AwsConfig,
    ) -> Self {
        Self {
            manager,
            node_config,
            aws_config,
            root: PathBuf::from("/"),
        }
    }

    /// Write files under the given root instead of `/`
    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }
}

#[async_trait]
impl Daemon for ContainerdDaemon {
    fn name(&self) -> &str {
        CONTAINERD_DAEMON_NAME
    }

    async fn configure(&self) -> Result<()> {
        info!("Configuring containerd");

        let mut config =
            CONFIG_TEMPLATE.replace("{sandbox_image}", &sandbox_image(&self.aws_config.region));
        // User-supplied TOML is appended verbatim; containerd resolves
        // duplicate tables in favor of the later definition.
        if !self.node_config.containerd.config.is_empty() {
            config.push('\n');
            config.push_str(&self.node_config.containerd.config);
        }

        write_file_with_dir(&self.root.join(CONFIG_PATH), config).await
    }

    async fn ensure_running(&self) -> Result<()> {
        self.manager.daemon_reload().await?;
        self.manager.enable_daemon(CONTAINERD_DAEMON_NAME).await?;
        self.manager.restart_daemon(CONTAINERD_DAEMON_NAME).await
    }

    async fn post_launch(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.manager.stop_daemon(CONTAINERD_DAEMON_NAME).await
    }
}
