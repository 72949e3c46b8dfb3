//! EC2 node provider
//!
//! Cloud instances join through the managed bootstrap path, which predates
//! the validation framework. To preserve that behavior the kubelet daemon
//! gets a no-op runner and there is no pre-processing or pre-flight
//! validation for this topology.

use std::sync::Arc;

use async_trait::async_trait;

use super::NodeProvider;
use crate::config::{AwsConfig, NodeConfig};
use crate::containerd::ContainerdDaemon;
use crate::daemon::{Daemon, DaemonManager, SystemdManager};
use crate::error::Error;
use crate::kubelet::KubeletDaemon;
use crate::validation::NoopSingleRunner;
use crate::Result;

/// [`NodeProvider`] for cloud instances
pub struct Ec2NodeProvider {
    node_config: NodeConfig,
    aws_config: Option<AwsConfig>,
    manager: Arc<dyn DaemonManager>,
}

impl Ec2NodeProvider {
    /// Create a provider for the given node
    pub fn new(node_config: NodeConfig) -> Self {
        Self {
            node_config,
            aws_config: None,
            manager: Arc::new(SystemdManager::new()),
        }
    }

    /// Supply the AWS-side configuration required by the daemons
    pub fn with_aws_config(mut self, aws_config: AwsConfig) -> Self {
        self.aws_config = Some(aws_config);
        self
    }

    /// Substitute the daemon manager
    pub fn with_daemon_manager(mut self, manager: Arc<dyn DaemonManager>) -> Self {
        self.manager = manager;
        self
    }
}

#[async_trait]
impl NodeProvider for Ec2NodeProvider {
    fn node_config(&self) -> &NodeConfig {
        &self.node_config
    }

    async fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn get_daemons(&self) -> Result<Vec<Box<dyn Daemon>>> {
        let aws_config = self
            .aws_config
            .clone()
            .ok_or_else(|| Error::config("aws config not set"))?;

        Ok(vec![
            Box::new(ContainerdDaemon::new(
                self.manager.clone(),
                self.node_config.clone(),
                aws_config.clone(),
            )),
            Box::new(KubeletDaemon::new(
                self.manager.clone(),
                self.node_config.clone(),
                aws_config,
                // EC2 nodes keep their pre-validation behavior: no in-flight
                // checks during kubelet configuration.
                Arc::new(NoopSingleRunner::new()),
            )),
        ])
    }

    async fn pre_process_daemon(&self) -> Result<()> {
        Ok(())
    }

    fn cleanup(&self) -> Result<()> {
        self.manager.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::fake::FakeManager;

    #[test]
    fn test_get_daemons_requires_aws_config() {
        let provider = Ec2NodeProvider::new(NodeConfig::default())
            .with_daemon_manager(Arc::new(FakeManager::new()));

        let err = provider.get_daemons().expect_err("no aws config");
        assert!(err.to_string().contains("aws config not set"));
    }

    #[test]
    fn test_get_daemons_returns_containerd_then_kubelet() {
        let provider = Ec2NodeProvider::new(NodeConfig::default())
            .with_daemon_manager(Arc::new(FakeManager::new()))
            .with_aws_config(AwsConfig {
                region: "us-east-1".to_string(),
            });

        let daemons = provider.get_daemons().expect("daemons");
        let names: Vec<&str> = daemons.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["containerd", "kubelet"]);
    }

    #[tokio::test]
    async fn test_validate_and_pre_process_are_noops() {
        let manager = FakeManager::new();
        let provider = Ec2NodeProvider::new(NodeConfig::default())
            .with_daemon_manager(Arc::new(manager.clone()));

        provider.validate().await.expect("no checks");
        provider.pre_process_daemon().await.expect("no-op");

        assert!(manager.operations().is_empty());
    }
}
