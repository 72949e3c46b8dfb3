//! Error types for node bootstrap
//!
//! Errors are structured with fields to aid debugging on a failed join.
//! Each variant includes contextual information like daemon names, file
//! paths, and underlying causes. Validation failures keep their cause chain
//! intact so remediation text attached deep in the chain survives up to the
//! process boundary.

use thiserror::Error;

/// Boxed error type used for causes that cross module boundaries
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for node bootstrap operations
#[derive(Debug, Error)]
pub enum Error {
    /// Node configuration is missing or malformed
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's missing or invalid
        message: String,
    },

    /// A validation against the node configuration failed
    ///
    /// The source chain is preserved so remediation text can be extracted
    /// at the process boundary.
    #[error("validation failed: {source}")]
    Validation {
        /// The failing validation's error, unmodified
        source: BoxError,
    },

    /// An OS daemon operation failed
    #[error("daemon error [{name}]: {message}")]
    Daemon {
        /// Unit name the operation targeted (e.g., "kubelet")
        name: String,
        /// Description of what failed
        message: String,
    },

    /// Cluster descriptor lookup failed
    #[error("cluster lookup error: {message}")]
    Cluster {
        /// Description of what failed
        message: String,
    },

    /// Filesystem error while writing node-local service files
    #[error("writing {path}: {source}")]
    Io {
        /// Path being written
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a validation error, preserving its cause chain
    pub fn validation(source: impl Into<BoxError>) -> Self {
        Self::Validation {
            source: source.into(),
        }
    }

    /// Create a daemon error for the given unit
    pub fn daemon(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Daemon {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a cluster lookup error
    pub fn cluster(msg: impl Into<String>) -> Self {
        Self::Cluster {
            message: msg.into(),
        }
    }

    /// Create an IO error for the given path
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = Error::config("aws config not set");
        assert_eq!(err.to_string(), "configuration error: aws config not set");
    }

    #[test]
    fn test_daemon_error_includes_unit_name() {
        let err = Error::daemon("kubelet", "restart failed");
        assert!(err.to_string().contains("[kubelet]"));
        assert!(err.to_string().contains("restart failed"));
    }

    #[test]
    fn test_validation_error_preserves_cause_chain() {
        use std::error::Error as _;

        let cause = crate::validation::Remediable::new("bad endpoint", "fix the endpoint");
        let err = Error::validation(Box::new(cause));

        assert!(err.to_string().contains("bad endpoint"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = Error::io(
            "/etc/kubernetes/kubelet/config.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/etc/kubernetes/kubelet/config.json"));
    }
}
