//! Validation framework
//!
//! A [`Validation`] is a named, side-effect-free check bound to an object
//! type. A [`Runner`] executes an ordered list of validations against one
//! object, enforcing a skip-list and the invariant that no validation may
//! mutate its input. An [`Informer`] observes starts and completions for
//! progress reporting; errors can carry remediation hints for the operator
//! (see [`with_remediation`]).

mod error;
mod informer;
mod runner;

pub use error::{
    flatten_remediation, is_remediable, remediation, with_remediation, Remediable,
    ValidationError,
};
pub use informer::{Event, Informer, NoopInformer, RecordingInformer, TracingInformer};
pub use runner::{NoopSingleRunner, Runner, SingleRunner, Validatable, Validation};

/// Suffix appended to validation names to form externally visible phase names
pub const PHASE_SUFFIX: &str = "-validation";

/// Derive the skip-list from externally supplied skip phases
///
/// Each phase name maps 1:1 to a validation name by stripping the fixed
/// `-validation` suffix. This derivation rule is the stable contract between
/// the CLI-facing skip-phase flag and internal validation names.
pub fn skip_list_from_phases(phases: &[String]) -> Vec<String> {
    phases
        .iter()
        .map(|phase| phase.strip_suffix(PHASE_SUFFIX).unwrap_or(phase).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_list_strips_phase_suffix() {
        let phases = vec![
            "node-ip-validation".to_string(),
            "kubelet-cert-validation".to_string(),
        ];
        assert_eq!(
            skip_list_from_phases(&phases),
            vec!["node-ip".to_string(), "kubelet-cert".to_string()],
        );
    }

    #[test]
    fn test_skip_list_leaves_bare_names_alone() {
        let phases = vec!["k8s-authentication".to_string()];
        assert_eq!(
            skip_list_from_phases(&phases),
            vec!["k8s-authentication".to_string()],
        );
    }
}
