//! Node providers
//!
//! A [`NodeProvider`] is the topology-specific orchestrator that sequences
//! validation and daemon setup for one node. Two topologies exist: hybrid
//! (on-premises machines joining through explicit credential bootstrapping)
//! and EC2 (cloud instances, which keep their legacy no-validation path).
//! [`init`] drives a provider end to end.

pub mod ec2;
pub mod hybrid;

use async_trait::async_trait;
use tracing::info;

use crate::config::NodeConfig;
use crate::daemon::Daemon;
use crate::Result;

/// Topology-specific orchestrator for one node bootstrap run
#[async_trait]
pub trait NodeProvider: Send + Sync {
    /// The node configuration this provider was built for
    fn node_config(&self) -> &NodeConfig;

    /// Run the topology's pre-flight validations
    async fn validate(&self) -> Result<()>;

    /// The daemons to configure and start, in order
    fn get_daemons(&self) -> Result<Vec<Box<dyn Daemon>>>;

    /// Topology-specific hook run before any daemon is configured
    async fn pre_process_daemon(&self) -> Result<()>;

    /// Release resources held by the provider; safe to call repeatedly
    fn cleanup(&self) -> Result<()>;
}

/// Remote description of the target cluster
///
/// Filled in by a [`ClusterLookup`] collaborator; the real lookup is an EKS
/// DescribeCluster call made outside this crate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterDetails {
    /// Kubernetes API server endpoint URL
    pub endpoint: String,
    /// Base64-encoded PEM cluster CA bundle
    pub certificate_authority: String,
    /// Cluster lifecycle status (e.g., "ACTIVE")
    pub status: String,
    /// CIDRs the cluster expects hybrid node IPs to fall within
    pub remote_node_networks: Vec<String>,
}

/// Collaborator that fetches the remote cluster descriptor
#[async_trait]
pub trait ClusterLookup: Send + Sync {
    /// Describe the cluster named in the node configuration
    async fn describe_cluster(&self, node_config: &NodeConfig) -> Result<ClusterDetails>;
}

/// Drive a provider through a full bootstrap run
///
/// Validate, list the daemons, run the topology's pre-processing hook, then
/// configure every daemon before starting any of them. Failures abort the
/// run immediately with the failing step's error.
pub async fn init(provider: &dyn NodeProvider) -> Result<()> {
    info!("Validating node");
    provider.validate().await?;

    let daemons = provider.get_daemons()?;

    provider.pre_process_daemon().await?;

    for daemon in &daemons {
        info!(daemon = %daemon.name(), "Configuring daemon");
        daemon.configure().await?;
    }

    for daemon in &daemons {
        info!(daemon = %daemon.name(), "Ensuring daemon is running");
        daemon.ensure_running().await?;
        daemon.post_launch().await?;
    }

    Ok(())
}
