//! Authenticated request against the Kubernetes API server
//!
//! Confirms the node's own kubeconfig works end to end. Run by the kubelet
//! daemon's configure step, after the kubeconfig has been written to disk;
//! any response from the API server proves the TLS handshake and the
//! exchange of client credentials succeeded.

use std::path::PathBuf;

use kube::config::{KubeConfigOptions, Kubeconfig};

use crate::config::NodeConfig;
use crate::validation::{with_remediation, Informer, Validation, ValidationError};

/// Name of the authenticated request validation
pub const AUTHENTICATED_VALIDATION: &str = "k8s-authentication";

/// Source of the kubeconfig used for authenticated requests
pub trait KubeconfigSource: Send + Sync {
    /// Path to the kubeconfig on disk
    fn path(&self) -> PathBuf;
}

impl KubeconfigSource for PathBuf {
    fn path(&self) -> PathBuf {
        self.clone()
    }
}

/// Issues requests against the cluster API server using a node kubeconfig
#[derive(Debug, Clone)]
pub struct ApiServerValidator<K> {
    kubeconfig: K,
}

impl<K> ApiServerValidator<K>
where
    K: KubeconfigSource + Clone + 'static,
{
    /// Create a validator reading credentials from the given source
    pub fn new(kubeconfig: K) -> Self {
        Self { kubeconfig }
    }

    /// Issue an authenticated GET using the node's kubeconfig
    pub async fn make_authenticated_request(
        &self,
        _informer: &dyn Informer,
        _node: &NodeConfig,
    ) -> Result<(), ValidationError> {
        let path = self.kubeconfig.path();
        let kubeconfig = Kubeconfig::read_from(&path).map_err(|e| {
            with_remediation(
                format!("loading kubelet kubeconfig from {}: {e}", path.display()),
                "Ensure the kubelet kubeconfig exists and is readable.",
            )
        })?;

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| format!("building client config from kubelet kubeconfig: {e}"))?;

        let client = kube::Client::try_from(config)
            .map_err(|e| format!("building Kubernetes API client: {e}"))?;

        client.apiserver_version().await.map_err(|e| {
            with_remediation(
                format!("making authenticated request to Kubernetes API endpoint: {e}"),
                "Ensure the node's credentials are valid and the cluster is configured to trust them.",
            )
        })?;

        Ok(())
    }

    /// The authenticated request packaged as the single in-flight [`Validation`]
    pub fn validation(&self) -> Validation<NodeConfig> {
        let validator = self.clone();
        Validation::new(
            AUTHENTICATED_VALIDATION,
            move |informer: &dyn Informer, node: &NodeConfig| {
                let validator = validator.clone();
                Box::pin(async move { validator.make_authenticated_request(informer, node).await })
            },
        )
    }
}
