//! Unauthenticated request against the Kubernetes API server
//!
//! Builds a TLS client trusting only the provided cluster CA and issues an
//! unauthenticated GET. The API server rejecting the request with 403 or 401
//! is the success condition: it proves the endpoint is correct and the CA
//! matches its serving certificate. The accepted status changed from
//! Forbidden to Unauthorized in Kubernetes 1.32, so both count.

use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::NodeConfig;
use crate::validation::{with_remediation, Informer, Validation, ValidationError};

/// Name of the unauthenticated request validation
pub const UNAUTHENTICATED_VALIDATION: &str = "kubernetes-unauthenticated-request";

/// Status body returned by the API server for rejected requests
#[derive(Debug, Default, Deserialize)]
struct ApiServerResponse {
    #[serde(default)]
    message: String,
}

/// Issue an unauthenticated GET to the API server, trusting only `ca_certificate`
pub async fn make_unauthenticated_request(
    endpoint: &str,
    ca_certificate: &[u8],
) -> Result<(), ValidationError> {
    let ca = reqwest::Certificate::from_pem(ca_certificate).map_err(|e| {
        with_remediation(
            format!("invalid Cluster CA certificate, could not parse it: {e}"),
            "Ensure the Cluster CA certificate provided is correct.",
        )
    })?;

    let url = Url::parse(endpoint).map_err(|e| {
        with_remediation(
            format!("making unauthenticated request to Kubernetes API endpoint: {e}"),
            "Ensure the Kubernetes API server endpoint provided is correct.",
        )
    })?;

    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .tls_built_in_root_certs(false)
        .add_root_certificate(ca)
        .build()
        .map_err(|e| format!("building Kubernetes API client: {e}"))?;

    let response = client.get(url).send().await.map_err(|e| {
        with_remediation(
            format!("making unauthenticated request to Kubernetes API endpoint: {e}"),
            "Ensure the provided Kubernetes API server endpoint is correct and the CA certificate is valid for that endpoint.",
        )
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("reading unauthenticated request response body: {e}"))?;
    let api_response: ApiServerResponse = serde_json::from_str(&body)
        .map_err(|e| format!("unmarshalling unauthenticated request response: {e}"))?;

    if status != StatusCode::FORBIDDEN && status != StatusCode::UNAUTHORIZED {
        return Err(with_remediation(
            format!(
                "expected status code from unauthenticated request {} or {}, got {}. Message: {}",
                StatusCode::FORBIDDEN.as_u16(),
                StatusCode::UNAUTHORIZED.as_u16(),
                status.as_u16(),
                api_response.message,
            ),
            "Ensure the Kubernetes API server endpoint provided is correct and the CA certificate is valid for that endpoint.",
        ));
    }

    Ok(())
}

/// Check that the cluster endpoint rejects an unauthenticated request
pub async fn check_unauthenticated_access(
    _informer: &dyn Informer,
    node: &NodeConfig,
) -> Result<(), ValidationError> {
    let ca = node.cluster_ca_pem().map_err(|e| {
        with_remediation(
            e.to_string(),
            "Ensure the Cluster CA certificate provided is correct.",
        )
    })?;

    make_unauthenticated_request(&node.cluster.api_server_endpoint, &ca).await
}

/// The unauthenticated request check packaged as a [`Validation`]
pub fn unauthenticated_validation() -> Validation<NodeConfig> {
    Validation::new(
        UNAUTHENTICATED_VALIDATION,
        |informer: &dyn Informer, node: &NodeConfig| {
            Box::pin(check_unauthenticated_access(informer, node))
        },
    )
}
