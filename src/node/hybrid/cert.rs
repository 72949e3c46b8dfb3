//! Kubelet client certificate validation
//!
//! A node that previously joined a different cluster can be left with a
//! kubelet client certificate issued by the wrong CA; kubelet would then
//! fail authentication long after bootstrap reported success. An existing
//! certificate, if present, must be issued by the target cluster's CA and
//! still be time-valid. A missing certificate is fine (first join).

use std::path::Path;

use tracing::debug;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::validation::{with_remediation, ValidationError};

/// Location of kubelet's current client certificate, relative to the
/// install root
pub const KUBELET_CERT_PATH: &str = "var/lib/kubelet/pki/kubelet-client-current.pem";

/// Suggested fix shared by every certificate mismatch
const REMEDIATION: &str = "Delete the kubelet client certificate so kubelet requests a fresh one, or skip this check with the kubelet-cert-validation phase if the certificate is known to be correct.";

/// Check an existing kubelet client certificate against the cluster CA
pub fn validate_kubelet_cert(install_root: &Path, ca_pem: &[u8]) -> Result<(), ValidationError> {
    let path = install_root.join(KUBELET_CERT_PATH);
    let cert_pem = match std::fs::read(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No kubelet certificate present, nothing to check");
            return Ok(());
        }
        Err(e) => return Err(format!("reading kubelet certificate {}: {e}", path.display()).into()),
    };

    let cert_der = pem::parse(&cert_pem)
        .map_err(|e| format!("parsing kubelet certificate {}: {e}", path.display()))?;
    let (_, cert) = X509Certificate::from_der(cert_der.contents())
        .map_err(|e| format!("decoding kubelet certificate {}: {e}", path.display()))?;

    let ca_der = pem::parse(ca_pem)
        .map_err(|e| format!("parsing cluster CA certificate: {e}"))?;
    let (_, ca) = X509Certificate::from_der(ca_der.contents())
        .map_err(|e| format!("decoding cluster CA certificate: {e}"))?;

    if cert.issuer().as_raw() != ca.subject().as_raw() {
        return Err(with_remediation(
            format!(
                "kubelet certificate {} was issued by {}, not by the cluster CA {}",
                path.display(),
                cert.issuer(),
                ca.subject(),
            ),
            REMEDIATION,
        ));
    }

    if !cert.validity().is_valid() {
        return Err(with_remediation(
            format!("kubelet certificate {} is expired or not yet valid", path.display()),
            REMEDIATION,
        ));
    }

    debug!(path = %path.display(), "Existing kubelet certificate matches the cluster CA");
    Ok(())
}
