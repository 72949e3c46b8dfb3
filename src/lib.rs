//! nodeinit - Kubernetes worker-node bootstrap engine
//!
//! nodeinit turns a physical or virtual machine into a cluster worker node,
//! either as a cloud instance or as an on-premises ("hybrid") node. It
//! validates the machine and its network/credentials, writes the node-local
//! service configuration (container runtime, kubelet, credential helper),
//! brings the services up in a defined order, and reports actionable
//! remediation when something fails.
//!
//! # Architecture
//!
//! A topology-specific [`node::NodeProvider`] drives one [`config::NodeConfig`]
//! through pre-flight validations and then through each daemon's
//! configure/start lifecycle. Checks run through a generic
//! [`validation::SingleRunner`] that enforces a skip-list and the invariant
//! that no validation mutates its input. Failures carry remediation hints an
//! operator can act on directly.
//!
//! # Modules
//!
//! - [`config`] - Node configuration model and file-backed loading
//! - [`validation`] - Validation runner, informer, and remediable errors
//! - [`node`] - Node providers (hybrid, EC2) and the `init` orchestration
//! - [`daemon`] - Daemon lifecycle abstraction and the systemd manager
//! - [`containerd`] - Container runtime daemon
//! - [`kubelet`] - Kubelet daemon
//! - [`credentials`] - IAM Roles Anywhere credential-refresh helper
//! - [`kubernetes`] - Connectivity validators against the cluster API
//! - [`network`] - Low-level reachability helpers
//! - [`error`] - Error types for the bootstrap engine

#![deny(missing_docs)]

pub mod config;
pub mod containerd;
pub mod credentials;
pub mod daemon;
pub mod error;
pub mod kubelet;
pub mod kubernetes;
pub mod network;
pub mod node;
pub mod util;
pub mod validation;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
