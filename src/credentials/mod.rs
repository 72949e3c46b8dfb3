//! IAM Roles Anywhere credential-refresh helper
//!
//! Hybrid nodes authenticating through IAM Roles Anywhere can run a
//! background helper that keeps a shared AWS credentials file refreshed from
//! the node certificate. The helper is not part of the regular daemon
//! lineup; the hybrid provider configures and starts it during daemon
//! pre-processing, before containerd and kubelet are configured.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::IamRolesAnywhereSpec;
use crate::daemon::{Daemon, DaemonManager};
use crate::util::write_file_with_dir;
use crate::Result;

/// Unit name of the credential-refresh helper daemon
pub const SIGNING_HELPER_DAEMON_NAME: &str = "aws_signing_helper_update";

/// Path of the helper's service unit, relative to the install root
const SERVICE_PATH: &str = "etc/systemd/system/aws_signing_helper_update.service";

/// Credentials file the helper keeps refreshed
const CREDENTIALS_PATH: &str = "/eks-hybrid/.aws/credentials";

/// Credential-refresh helper [`Daemon`]
pub struct SigningHelperDaemon {
    manager: Arc<dyn DaemonManager>,
    spec: IamRolesAnywhereSpec,
    root: PathBuf,
}

impl SigningHelperDaemon {
    /// Create the helper daemon from the node's IAM Roles Anywhere settings
    pub fn new(manager: Arc<dyn DaemonManager>, spec: IamRolesAnywhereSpec) -> Self {
        Self {
            manager,
            spec,
            root: PathBuf::from("/"),
        }
    }

    /// Write files under the given root instead of `/`
    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    fn service_unit(&self) -> String {
        format!(
            r#"[Unit]
Description=Refreshes AWS credentials from IAM Roles Anywhere
After=network-online.target

[Service]
Type=exec
Restart=always
RestartSec=5
ExecStart=/usr/local/bin/aws_signing_helper update \
    --certificate {certificate} \
    --private-key {private_key} \
    --trust-anchor-arn {trust_anchor} \
    --profile-arn {profile} \
    --role-arn {role} \
    --aws-credentials-file {credentials}

[Install]
WantedBy=multi-user.target
"#,
            certificate = self.spec.certificate_path,
            private_key = self.spec.private_key_path,
            trust_anchor = self.spec.trust_anchor_arn,
            profile = self.spec.profile_arn,
            role = self.spec.role_arn,
            credentials = CREDENTIALS_PATH,
        )
    }
}

#[async_trait]
impl Daemon for SigningHelperDaemon {
    fn name(&self) -> &str {
        SIGNING_HELPER_DAEMON_NAME
    }

    async fn configure(&self) -> Result<()> {
        info!("Configuring credential-refresh helper");
        write_file_with_dir(&self.root.join(SERVICE_PATH), self.service_unit()).await
    }

    async fn ensure_running(&self) -> Result<()> {
        self.manager.daemon_reload().await?;
        self.manager.enable_daemon(SIGNING_HELPER_DAEMON_NAME).await?;
        self.manager.restart_daemon(SIGNING_HELPER_DAEMON_NAME).await
    }

    async fn post_launch(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.manager.stop_daemon(SIGNING_HELPER_DAEMON_NAME).await
    }
}
