//! Node configuration model
//!
//! [`NodeConfig`] is the immutable (per bootstrap run) description of the
//! target node: cluster endpoint and CA, node topology, credential-provider
//! selection, and kubelet settings. It is owned exclusively by the node
//! provider for the duration of a run. `Clone` produces the structural deep
//! copy the validation runner uses to detect illegal mutation, and
//! `PartialEq` is the comparison that detects it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

/// Description of the node being bootstrapped
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    /// Target cluster
    pub cluster: ClusterSpec,
    /// Kubelet settings
    pub kubelet: KubeletSpec,
    /// Container runtime settings
    pub containerd: ContainerdSpec,
    /// Hybrid-node settings; present if and only if this is a hybrid node
    pub hybrid: Option<HybridSpec>,
}

/// Target cluster connection details
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterSpec {
    /// Cluster name
    pub name: String,
    /// Kubernetes API server endpoint URL
    pub api_server_endpoint: String,
    /// Base64-encoded PEM cluster CA bundle
    pub certificate_authority: String,
    /// CIDRs the cluster expects hybrid node IPs to fall within
    pub remote_node_networks: Vec<String>,
}

/// Kubelet settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KubeletSpec {
    /// Additional kubelet flags, without leading dashes (e.g., "node-ip=10.0.0.5")
    pub flags: Vec<String>,
    /// Overrides merged into the generated kubelet configuration file
    pub config: Option<serde_json::Value>,
}

/// Container runtime settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerdSpec {
    /// User-supplied TOML appended to the generated containerd configuration
    pub config: String,
}

/// Hybrid (on-premises) node settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HybridSpec {
    /// IAM Roles Anywhere credential provider settings
    pub iam_roles_anywhere: Option<IamRolesAnywhereSpec>,
    /// SSM credential provider settings
    pub ssm: Option<SsmSpec>,
}

/// IAM Roles Anywhere credential provider settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IamRolesAnywhereSpec {
    /// Name this node registers under
    pub node_name: String,
    /// Trust anchor ARN
    pub trust_anchor_arn: String,
    /// Profile ARN
    pub profile_arn: String,
    /// Role ARN assumed by the node
    pub role_arn: String,
    /// Path to the node certificate used for signing
    pub certificate_path: String,
    /// Path to the node private key used for signing
    pub private_key_path: String,
    /// Run the background helper that keeps a credentials file refreshed
    pub enable_credentials_file: bool,
}

/// SSM credential provider settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SsmSpec {
    /// Hybrid activation code
    pub activation_code: String,
    /// Hybrid activation ID
    pub activation_id: String,
}

/// AWS-side configuration required to talk to cluster services
///
/// Stands in for the SDK configuration the real clients are built from; the
/// clients themselves are collaborators outside this crate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AwsConfig {
    /// AWS region the cluster lives in
    pub region: String,
}

impl NodeConfig {
    /// Whether this node joins as a hybrid (on-premises) node
    pub fn is_hybrid_node(&self) -> bool {
        self.hybrid.is_some()
    }

    /// Whether this node uses the IAM Roles Anywhere credential provider
    pub fn is_iam_roles_anywhere(&self) -> bool {
        self.hybrid
            .as_ref()
            .is_some_and(|h| h.iam_roles_anywhere.is_some())
    }

    /// Decode the cluster CA bundle into PEM bytes
    pub fn cluster_ca_pem(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.cluster.certificate_authority.as_bytes())
            .map_err(|e| Error::config(format!("decoding cluster CA certificate: {e}")))
    }
}

/// Scheme prefix for file-backed configuration sources
const FILE_SCHEME: &str = "file://";

/// Load a [`NodeConfig`] from a configuration source
///
/// Supports `file://` URIs and bare paths; the content may be YAML or JSON.
/// IMDS and API sources are provided by external collaborators.
pub async fn load(source: &str) -> Result<NodeConfig> {
    let path = source.strip_prefix(FILE_SCHEME).unwrap_or(source);
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::config(format!("reading config source {path}: {e}")))?;
    parse(&content)
}

/// Parse a [`NodeConfig`] from YAML or JSON content
pub fn parse(content: &str) -> Result<NodeConfig> {
    serde_yaml::from_str(content)
        .map_err(|e| Error::config(format!("parsing node configuration: {e}")))
}
