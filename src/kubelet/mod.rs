//! Kubelet daemon
//!
//! Configures kubelet by writing its configuration file, kubeconfig,
//! image-credential-provider configuration, the cluster CA certificate, and
//! the environment file consumed by the service manager — in that order —
//! and only then runs the in-flight authenticated connectivity validation.
//! The ordering is load-bearing: the authenticated check is only meaningful
//! once a valid kubeconfig exists on disk.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::config::{AwsConfig, NodeConfig};
use crate::daemon::{Daemon, DaemonManager};
use crate::error::Error;
use crate::kubernetes::ApiServerValidator;
use crate::util::write_file_with_dir;
use crate::validation::Runner;
use crate::Result;

/// Unit name of the kubelet daemon
pub const KUBELET_DAEMON_NAME: &str = "kubelet";

/// Path of kubelet's configuration file, relative to the install root
const KUBELET_CONFIG_PATH: &str = "etc/kubernetes/kubelet/config.json";
/// Path of kubelet's kubeconfig, relative to the install root
const KUBECONFIG_PATH: &str = "var/lib/kubelet/kubeconfig";
/// Path of the image credential provider configuration
const CREDENTIAL_PROVIDER_CONFIG_PATH: &str = "etc/eks/image-credential-provider/config.json";
/// Path of the cluster CA certificate
const CA_CERT_PATH: &str = "etc/kubernetes/pki/ca.crt";
/// Path of the environment file consumed by the service manager
const ENVIRONMENT_PATH: &str = "etc/eks/kubelet/environment";

/// Credentials file kept fresh by the credential-refresh helper
const SHARED_CREDENTIALS_PATH: &str = "/eks-hybrid/.aws/credentials";

/// Kubelet [`Daemon`]
pub struct KubeletDaemon {
    manager: Arc<dyn DaemonManager>,
    node_config: NodeConfig,
    aws_config: AwsConfig,
    runner: Arc<dyn Runner<NodeConfig>>,
    root: PathBuf,
}

impl KubeletDaemon {
    /// Create the kubelet daemon
    ///
    /// `runner` performs the in-flight authenticated validation during
    /// [`Daemon::configure`]; topologies that skip it pass a no-op runner.
    pub fn new(
        manager: Arc<dyn DaemonManager>,
        node_config: NodeConfig,
        aws_config: AwsConfig,
        runner: Arc<dyn Runner<NodeConfig>>,
    ) -> Self {
        Self {
            manager,
            node_config,
            aws_config,
            runner,
            root: PathBuf::from("/"),
        }
    }

    /// Write files under the given root instead of `/`
    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Path of the kubeconfig this daemon writes
    pub fn kubeconfig_path(&self) -> PathBuf {
        self.root.join(KUBECONFIG_PATH)
    }

    async fn write_kubelet_config(&self) -> Result<()> {
        let mut config = json!({
            "apiVersion": "kubelet.config.k8s.io/v1beta1",
            "kind": "KubeletConfiguration",
            "address": "0.0.0.0",
            "authentication": {
                "anonymous": { "enabled": false },
                "webhook": { "enabled": true },
                "x509": { "clientCAFile": format!("/{CA_CERT_PATH}") },
            },
            "authorization": { "mode": "Webhook" },
            "cgroupDriver": "systemd",
            "clusterDomain": "cluster.local",
            "serializeImagePulls": false,
            "serverTLSBootstrap": true,
        });

        // User-supplied overrides win over the generated defaults.
        if let Some(serde_json::Value::Object(overrides)) = &self.node_config.kubelet.config {
            if let serde_json::Value::Object(base) = &mut config {
                for (key, value) in overrides {
                    base.insert(key.clone(), value.clone());
                }
            }
        }

        let content = serde_json::to_vec_pretty(&config)
            .map_err(|e| Error::serialization(format!("kubelet config: {e}")))?;
        write_file_with_dir(&self.root.join(KUBELET_CONFIG_PATH), content).await
    }

    async fn write_kubeconfig(&self) -> Result<()> {
        let cluster = &self.node_config.cluster;

        let mut exec = json!({
            "apiVersion": "client.authentication.k8s.io/v1beta1",
            "command": "aws",
            "args": [
                "eks", "get-token",
                "--cluster-name", cluster.name,
                "--region", self.aws_config.region,
            ],
        });
        // Hybrid nodes running the credential-refresh helper authenticate
        // from the credentials file it keeps fresh.
        if self.uses_credentials_file() {
            exec["env"] = json!([{
                "name": "AWS_SHARED_CREDENTIALS_FILE",
                "value": SHARED_CREDENTIALS_PATH,
            }]);
        }

        let kubeconfig = json!({
            "apiVersion": "v1",
            "kind": "Config",
            "clusters": [{
                "name": cluster.name,
                "cluster": {
                    "server": cluster.api_server_endpoint,
                    "certificate-authority": format!("/{CA_CERT_PATH}"),
                },
            }],
            "users": [{
                "name": "kubelet",
                "user": { "exec": exec },
            }],
            "contexts": [{
                "name": "kubelet",
                "context": { "cluster": cluster.name, "user": "kubelet" },
            }],
            "current-context": "kubelet",
        });

        let content = serde_yaml::to_string(&kubeconfig)
            .map_err(|e| Error::serialization(format!("kubeconfig: {e}")))?;
        write_file_with_dir(&self.kubeconfig_path(), content).await
    }

    async fn write_image_credential_provider_config(&self) -> Result<()> {
        let config = json!({
            "apiVersion": "kubelet.config.k8s.io/v1",
            "kind": "CredentialProviderConfig",
            "providers": [{
                "name": "ecr-credential-provider",
                "matchImages": [
                    "*.dkr.ecr.*.amazonaws.com",
                    "*.dkr.ecr.*.amazonaws.com.cn",
                ],
                "defaultCacheDuration": "12h",
                "apiVersion": "credentialprovider.kubelet.k8s.io/v1",
            }],
        });

        let content = serde_json::to_vec_pretty(&config)
            .map_err(|e| Error::serialization(format!("credential provider config: {e}")))?;
        write_file_with_dir(&self.root.join(CREDENTIAL_PROVIDER_CONFIG_PATH), content).await
    }

    async fn write_cluster_ca_cert(&self) -> Result<()> {
        let ca = self.node_config.cluster_ca_pem()?;
        write_file_with_dir(&self.root.join(CA_CERT_PATH), ca).await
    }

    async fn write_kubelet_environment(&self) -> Result<()> {
        let mut args = vec![
            format!("--config=/{KUBELET_CONFIG_PATH}"),
            format!("--kubeconfig=/{KUBECONFIG_PATH}"),
            format!("--image-credential-provider-config=/{CREDENTIAL_PROVIDER_CONFIG_PATH}"),
        ];
        args.extend(
            self.node_config
                .kubelet
                .flags
                .iter()
                .map(|flag| format!("--{flag}")),
        );

        let content = format!("KUBELET_ARGS=\"{}\"\n", args.join(" "));
        write_file_with_dir(&self.root.join(ENVIRONMENT_PATH), content).await
    }

    fn uses_credentials_file(&self) -> bool {
        self.node_config
            .hybrid
            .as_ref()
            .and_then(|h| h.iam_roles_anywhere.as_ref())
            .is_some_and(|iam_ra| iam_ra.enable_credentials_file)
    }
}

#[async_trait]
impl Daemon for KubeletDaemon {
    fn name(&self) -> &str {
        KUBELET_DAEMON_NAME
    }

    async fn configure(&self) -> Result<()> {
        info!("Configuring kubelet");

        self.write_kubelet_config().await?;
        self.write_kubeconfig().await?;
        self.write_image_credential_provider_config().await?;
        self.write_cluster_ca_cert().await?;
        self.write_kubelet_environment().await?;

        // At this point a valid kubeconfig exists on disk, so an
        // authenticated request can be made.
        let validator = ApiServerValidator::new(self.kubeconfig_path());
        self.runner
            .run(&self.node_config, &[validator.validation()])
            .await
            .map_err(Error::validation)?;

        Ok(())
    }

    async fn ensure_running(&self) -> Result<()> {
        // Reload before enabling: enabling a stopped unit before the
        // manager has reloaded can race on some init systems.
        self.manager.daemon_reload().await?;
        self.manager.enable_daemon(KUBELET_DAEMON_NAME).await?;
        self.manager.restart_daemon(KUBELET_DAEMON_NAME).await
    }

    async fn post_launch(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.manager.stop_daemon(KUBELET_DAEMON_NAME).await
    }
}
