//! Hybrid node provider
//!
//! Hybrid nodes join the cluster from outside the cloud fleet, so the
//! provider front-loads the checks that would otherwise surface as opaque
//! kubelet failures hours later: the node IP must be routable per the
//! cluster's remote-node-network policy, and any leftover kubelet client
//! certificate must belong to the target cluster. Both checks are
//! individually skippable through named phases.

mod cert;
mod ip;

pub use ip::{KubeletNetwork, Network};

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{ClusterDetails, ClusterLookup, NodeProvider};
use crate::config::{AwsConfig, NodeConfig};
use crate::containerd::ContainerdDaemon;
use crate::credentials::SigningHelperDaemon;
use crate::daemon::{Daemon, DaemonManager, SystemdManager};
use crate::error::Error;
use crate::kubelet::KubeletDaemon;
use crate::validation::{skip_list_from_phases, Runner, SingleRunner, TracingInformer};
use crate::Result;

/// Phase name that skips the node-IP validation
pub const NODE_IP_VALIDATION_PHASE: &str = "node-ip-validation";
/// Phase name that skips the kubelet certificate validation
pub const KUBELET_CERT_VALIDATION_PHASE: &str = "kubelet-cert-validation";

/// [`NodeProvider`] for on-premises nodes
pub struct HybridNodeProvider {
    node_config: NodeConfig,
    skip_phases: Vec<String>,
    aws_config: Option<AwsConfig>,
    manager: Arc<dyn DaemonManager>,
    runner: Arc<dyn Runner<NodeConfig>>,
    network: Box<dyn Network>,
    lookup: Option<Box<dyn ClusterLookup>>,
    cluster: OnceCell<ClusterDetails>,
    root: PathBuf,
}

impl HybridNodeProvider {
    /// Create a provider for the given node, skipping the named phases
    ///
    /// The skip-list handed to the in-flight validation runner is derived
    /// from the phase names by stripping the `-validation` suffix.
    pub fn new(node_config: NodeConfig, skip_phases: Vec<String>) -> Self {
        let runner = SingleRunner::new(TracingInformer)
            .with_skipped_validations(skip_list_from_phases(&skip_phases));

        Self {
            node_config,
            skip_phases,
            aws_config: None,
            manager: Arc::new(SystemdManager::new()),
            runner: Arc::new(runner),
            network: Box::new(KubeletNetwork),
            lookup: None,
            cluster: OnceCell::new(),
            root: PathBuf::from("/"),
        }
    }

    /// Supply the AWS-side configuration required by the daemons
    pub fn with_aws_config(mut self, aws_config: AwsConfig) -> Self {
        self.aws_config = Some(aws_config);
        self
    }

    /// Pre-seed the cluster descriptor, bypassing the lookup
    pub fn with_cluster(mut self, cluster: ClusterDetails) -> Self {
        self.cluster = OnceCell::new_with(Some(cluster));
        self
    }

    /// Supply the collaborator that fetches the cluster descriptor
    pub fn with_cluster_lookup(mut self, lookup: impl ClusterLookup + 'static) -> Self {
        self.lookup = Some(Box::new(lookup));
        self
    }

    /// Substitute the node IP resolution strategy
    pub fn with_network(mut self, network: impl Network + 'static) -> Self {
        self.network = Box::new(network);
        self
    }

    /// Substitute the daemon manager
    pub fn with_daemon_manager(mut self, manager: Arc<dyn DaemonManager>) -> Self {
        self.manager = manager;
        self
    }

    /// Substitute the in-flight validation runner
    pub fn with_runner(mut self, runner: Arc<dyn Runner<NodeConfig>>) -> Self {
        self.runner = runner;
        self
    }

    /// Read and write files under the given root instead of `/`
    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// The cluster descriptor, fetched at most once per run
    pub async fn get_cluster(&self) -> Result<&ClusterDetails> {
        self.cluster
            .get_or_try_init(|| async {
                let lookup = self
                    .lookup
                    .as_ref()
                    .ok_or_else(|| Error::cluster("cluster lookup not set"))?;
                debug!(cluster = %self.node_config.cluster.name, "Describing cluster");
                lookup.describe_cluster(&self.node_config).await
            })
            .await
    }

    fn should_run(&self, phase: &str) -> bool {
        !self.skip_phases.iter().any(|skip| skip == phase)
    }

    /// Remote node networks from the cluster descriptor when one is
    /// available, falling back to the node configuration.
    async fn remote_node_networks(&self) -> Result<Vec<String>> {
        if self.cluster.get().is_some() || self.lookup.is_some() {
            return Ok(self.get_cluster().await?.remote_node_networks.clone());
        }
        Ok(self.node_config.cluster.remote_node_networks.clone())
    }
}

#[async_trait]
impl NodeProvider for HybridNodeProvider {
    fn node_config(&self) -> &NodeConfig {
        &self.node_config
    }

    async fn validate(&self) -> Result<()> {
        if self.should_run(NODE_IP_VALIDATION_PHASE) {
            info!("Validating node IP");
            let node_ip = self
                .network
                .node_ip(&self.node_config.kubelet.flags)
                .map_err(Error::validation)?;
            let networks = self.remote_node_networks().await?;
            ip::validate_node_ip(node_ip, &networks).map_err(Error::validation)?;
        }

        if self.should_run(KUBELET_CERT_VALIDATION_PHASE) {
            info!("Validating kubelet certificate");
            let ca = self.node_config.cluster_ca_pem()?;
            cert::validate_kubelet_cert(&self.root, &ca).map_err(Error::validation)?;
        }

        Ok(())
    }

    fn get_daemons(&self) -> Result<Vec<Box<dyn Daemon>>> {
        let aws_config = self
            .aws_config
            .clone()
            .ok_or_else(|| Error::config("aws config not set"))?;

        Ok(vec![
            Box::new(
                ContainerdDaemon::new(
                    self.manager.clone(),
                    self.node_config.clone(),
                    aws_config.clone(),
                )
                .with_install_root(self.root.clone()),
            ),
            Box::new(
                KubeletDaemon::new(
                    self.manager.clone(),
                    self.node_config.clone(),
                    aws_config,
                    self.runner.clone(),
                )
                .with_install_root(self.root.clone()),
            ),
        ])
    }

    async fn pre_process_daemon(&self) -> Result<()> {
        let Some(iam_ra) = self
            .node_config
            .hybrid
            .as_ref()
            .and_then(|h| h.iam_roles_anywhere.as_ref())
        else {
            return Ok(());
        };
        if !iam_ra.enable_credentials_file {
            return Ok(());
        }

        info!("Configuring credential-refresh helper daemon");
        let helper = SigningHelperDaemon::new(self.manager.clone(), iam_ra.clone())
            .with_install_root(self.root.clone());
        helper.configure().await?;
        helper.ensure_running().await
    }

    fn cleanup(&self) -> Result<()> {
        self.manager.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::config::parse;
    use crate::daemon::fake::FakeManager;
    use crate::validation::ValidationError;

    const HYBRID_CONFIG: &str = r#"
cluster:
  name: my-cluster
  apiServerEndpoint: https://example.eks.amazonaws.com
  certificateAuthority: LS0tLS1CRUdJTg==
  remoteNodeNetworks:
    - 10.80.0.0/16
kubelet:
  flags:
    - node-ip=10.80.0.5
hybrid:
  iamRolesAnywhere:
    nodeName: my-node
    trustAnchorArn: arn:aws:rolesanywhere:us-west-2:111122223333:trust-anchor/ta
    profileArn: arn:aws:rolesanywhere:us-west-2:111122223333:profile/p
    roleArn: arn:aws:iam::111122223333:role/node
    certificatePath: /etc/certificates/node.crt
    privateKeyPath: /etc/certificates/node.key
    enableCredentialsFile: true
"#;

    struct FixedIp(IpAddr);

    impl Network for FixedIp {
        fn node_ip(&self, _kubelet_flags: &[String]) -> std::result::Result<IpAddr, ValidationError> {
            Ok(self.0)
        }
    }

    struct CountingLookup {
        calls: Arc<AtomicU32>,
        details: ClusterDetails,
    }

    #[async_trait]
    impl ClusterLookup for CountingLookup {
        async fn describe_cluster(&self, _node_config: &NodeConfig) -> Result<ClusterDetails> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.details.clone())
        }
    }

    fn hybrid_config() -> NodeConfig {
        parse(HYBRID_CONFIG).expect("test config parses")
    }

    fn test_provider(config: NodeConfig) -> HybridNodeProvider {
        HybridNodeProvider::new(config, Vec::new())
            .with_daemon_manager(Arc::new(FakeManager::new()))
    }

    #[test]
    fn test_get_daemons_requires_aws_config() {
        let provider = test_provider(hybrid_config());
        let err = provider.get_daemons().expect_err("no aws config");
        assert!(err.to_string().contains("aws config not set"));
    }

    #[test]
    fn test_get_daemons_returns_containerd_then_kubelet() {
        let provider = test_provider(hybrid_config()).with_aws_config(AwsConfig {
            region: "us-west-2".to_string(),
        });

        let daemons = provider.get_daemons().expect("daemons");
        let names: Vec<&str> = daemons.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["containerd", "kubelet"]);
    }

    #[tokio::test]
    async fn test_validate_passes_with_ip_in_remote_network() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = test_provider(hybrid_config()).with_install_root(dir.path());

        // node-ip comes from the kubelet flag, 10.80.0.5, inside 10.80.0.0/16;
        // no kubelet certificate exists yet.
        provider.validate().await.expect("all validations pass");
    }

    #[tokio::test]
    async fn test_validate_rejects_ip_outside_remote_networks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = test_provider(hybrid_config())
            .with_install_root(dir.path())
            .with_network(FixedIp("192.168.1.9".parse().expect("test ip")));

        let err = provider.validate().await.expect_err("out of range");
        assert!(err.to_string().contains("validation failed"));
    }

    #[tokio::test]
    async fn test_skip_phase_disables_the_node_ip_validation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = HybridNodeProvider::new(
            hybrid_config(),
            vec![NODE_IP_VALIDATION_PHASE.to_string()],
        )
        .with_daemon_manager(Arc::new(FakeManager::new()))
        .with_install_root(dir.path())
        .with_network(FixedIp("192.168.1.9".parse().expect("test ip")));

        provider.validate().await.expect("skipped check never runs");
    }

    #[tokio::test]
    async fn test_validate_uses_cluster_descriptor_networks_when_seeded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = test_provider(hybrid_config())
            .with_install_root(dir.path())
            .with_cluster(ClusterDetails {
                remote_node_networks: vec!["192.168.0.0/16".to_string()],
                ..ClusterDetails::default()
            })
            .with_network(FixedIp("192.168.1.9".parse().expect("test ip")));

        provider.validate().await.expect("in descriptor's range");
    }

    #[tokio::test]
    async fn test_get_cluster_fetches_once_and_caches() {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = test_provider(hybrid_config()).with_cluster_lookup(CountingLookup {
            calls: calls.clone(),
            details: ClusterDetails {
                status: "ACTIVE".to_string(),
                ..ClusterDetails::default()
            },
        });

        let first = provider.get_cluster().await.expect("lookup").clone();
        let second = provider.get_cluster().await.expect("cached").clone();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_cluster_without_lookup_is_an_error() {
        let provider = test_provider(hybrid_config());
        let err = provider.get_cluster().await.expect_err("no lookup");
        assert!(err.to_string().contains("cluster lookup not set"));
    }

    #[tokio::test]
    async fn test_pre_process_daemon_starts_the_helper_when_enabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = FakeManager::new();
        let provider = HybridNodeProvider::new(hybrid_config(), Vec::new())
            .with_daemon_manager(Arc::new(manager.clone()))
            .with_install_root(dir.path());

        provider.pre_process_daemon().await.expect("pre-process");

        assert_eq!(
            manager.operations(),
            vec![
                "daemon-reload",
                "enable aws_signing_helper_update",
                "restart aws_signing_helper_update",
            ],
        );
    }

    #[tokio::test]
    async fn test_pre_process_daemon_is_a_noop_when_disabled() {
        let mut config = hybrid_config();
        if let Some(iam_ra) = config
            .hybrid
            .as_mut()
            .and_then(|h| h.iam_roles_anywhere.as_mut())
        {
            iam_ra.enable_credentials_file = false;
        }

        let manager = FakeManager::new();
        let provider = HybridNodeProvider::new(config, Vec::new())
            .with_daemon_manager(Arc::new(manager.clone()));

        provider.pre_process_daemon().await.expect("no-op");

        assert!(manager.operations().is_empty());
    }

    #[test]
    fn test_cleanup_closes_the_manager() {
        let manager = FakeManager::new();
        let provider = HybridNodeProvider::new(hybrid_config(), Vec::new())
            .with_daemon_manager(Arc::new(manager.clone()));

        provider.cleanup().expect("cleanup");

        assert_eq!(manager.operations(), vec!["close"]);
    }
}
