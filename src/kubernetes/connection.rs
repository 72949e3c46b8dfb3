//! Unauthenticated reachability of the Kubernetes API endpoint

use url::Url;

use crate::config::NodeConfig;
use crate::network;
use crate::validation::{with_remediation, Informer, Validation, ValidationError};

/// Name of the endpoint reachability validation
pub const ENDPOINT_ACCESS_VALIDATION: &str = "kubernetes-endpoint-access";

/// Check basic network reachability of the cluster's API endpoint
pub async fn check_connection(
    _informer: &dyn Informer,
    node: &NodeConfig,
) -> Result<(), ValidationError> {
    let endpoint = Url::parse(&node.cluster.api_server_endpoint).map_err(|e| {
        with_remediation(
            format!("parsing Kubernetes API server endpoint: {e}"),
            "Ensure the Kubernetes API server endpoint provided is correct.",
        )
    })?;

    network::check_connection_to_host(&endpoint)
        .await
        .map_err(|e| {
            with_remediation(
                format!("checking network connection to Kubernetes API endpoint: {e}"),
                "Ensure your network configuration allows the node to access the Kubernetes API endpoint.",
            )
        })?;

    Ok(())
}

/// The reachability check packaged as a [`Validation`]
pub fn connection_validation() -> Validation<NodeConfig> {
    Validation::new(
        ENDPOINT_ACCESS_VALIDATION,
        |informer: &dyn Informer, node: &NodeConfig| Box::pin(check_connection(informer, node)),
    )
}
