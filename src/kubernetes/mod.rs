//! Kubernetes API connectivity validators
//!
//! Three standalone checks, each expressible as a [`Validation`] bound to
//! [`NodeConfig`]:
//!
//! - endpoint reachability — the API endpoint parses and its host accepts a
//!   TCP connection (separates "can't reach the endpoint at all" from
//!   "reached it but credentials are wrong");
//! - unauthenticated request — a TLS client trusting only the cluster CA
//!   gets an auth-rejection status back, proving TLS trust and endpoint
//!   correctness without credentials;
//! - authenticated request — a request with the node's own kubeconfig
//!   succeeds end to end.

mod authenticated;
mod connection;
mod unauthenticated;

pub use authenticated::{ApiServerValidator, KubeconfigSource, AUTHENTICATED_VALIDATION};
pub use connection::{check_connection, connection_validation, ENDPOINT_ACCESS_VALIDATION};
pub use unauthenticated::{
    check_unauthenticated_access, make_unauthenticated_request, unauthenticated_validation,
    UNAUTHENTICATED_VALIDATION,
};
