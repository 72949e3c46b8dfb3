//! Remediation-carrying errors
//!
//! A validation failure is frequently debugged by an operator who did not
//! write the node configuration. Errors produced by validations can carry a
//! human-readable remediation hint that is surfaced at the process boundary.
//! The helpers here unwrap through arbitrary wrapping layers using standard
//! `source()` chain semantics, so remediation attached deep in a chain is
//! still found.

use std::error::Error as StdError;
use std::fmt;

use crate::error::BoxError;

/// Error type returned by validations
pub type ValidationError = BoxError;

/// An error carrying a suggested fix for the operator
#[derive(Debug)]
pub struct Remediable {
    cause: BoxError,
    remediation: String,
}

impl Remediable {
    /// Create a remediable error from a message and a remediation hint
    pub fn new(cause: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            cause: cause.into().into(),
            remediation: remediation.into(),
        }
    }

    /// The remediation hint attached to this error
    pub fn remediation(&self) -> &str {
        &self.remediation
    }
}

impl fmt::Display for Remediable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl StdError for Remediable {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Wrap an error, attaching a remediation hint
pub fn with_remediation(
    err: impl Into<BoxError>,
    remediation: impl Into<String>,
) -> ValidationError {
    Box::new(Remediable {
        cause: err.into(),
        remediation: remediation.into(),
    })
}

/// Check whether any error in the chain carries a remediation hint
pub fn is_remediable(err: &(dyn StdError + 'static)) -> bool {
    !remediation(err).is_empty()
}

/// Extract the remediation hint from the error chain
///
/// Returns the hint of the outermost remediable error in the chain, or the
/// empty string when no error in the chain is remediable.
pub fn remediation<'a>(err: &'a (dyn StdError + 'static)) -> &'a str {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(remediable) = e.downcast_ref::<Remediable>() {
            return remediable.remediation();
        }
        current = e.source();
    }
    ""
}

/// Flatten the remediation hint into the error message
///
/// Produces an error whose message is `"<cause>: <remediation>"` when the
/// chain is remediable, or the original message unchanged otherwise. Meant
/// for the outermost boundary, right before display to a human.
pub fn flatten_remediation(err: &(dyn StdError + 'static)) -> ValidationError {
    let hint = remediation(err);
    if hint.is_empty() {
        err.to_string().into()
    } else {
        format!("{}: {}", err, hint).into()
    }
}
