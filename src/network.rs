//! Basic network reachability checks

use std::time::Duration;

use tokio::net::TcpStream;
use url::Url;

use crate::error::BoxError;

/// How long to wait for a TCP connection before declaring the host unreachable
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Check that a TCP connection can be established to the URL's host
///
/// Uses the URL's explicit port when present, otherwise the scheme default.
/// This separates "can't reach the endpoint at all" from "reached it but the
/// TLS or credentials are wrong".
pub async fn check_connection_to_host(endpoint: &Url) -> Result<(), BoxError> {
    let host = endpoint
        .host_str()
        .ok_or_else(|| BoxError::from(format!("endpoint {endpoint} has no host")))?;
    let port = endpoint
        .port_or_known_default()
        .ok_or_else(|| BoxError::from(format!("endpoint {endpoint} has no port")))?;

    let address = format!("{host}:{port}");
    tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&address))
        .await
        .map_err(|_| BoxError::from(format!("connecting to {address}: timed out")))?
        .map_err(|e| BoxError::from(format!("connecting to {address}: {e}")))?;

    Ok(())
}
