//! Node IP resolution and the node-IP validation
//!
//! Hybrid nodes must present an IP the cluster can route back to; the
//! cluster advertises the acceptable ranges as remote-node-network CIDRs.

use std::net::{IpAddr, UdpSocket};

use tracing::debug;

use crate::validation::{with_remediation, ValidationError};

/// Kubelet flag that pins the node IP explicitly
const NODE_IP_FLAG: &str = "node-ip=";

/// Resolves the IP this node will register with
///
/// Substituted in tests; the default implementation mirrors kubelet's own
/// selection order.
pub trait Network: Send + Sync {
    /// The IP this node will advertise, honoring an explicit kubelet flag
    fn node_ip(&self, kubelet_flags: &[String]) -> Result<IpAddr, ValidationError>;
}

/// Default [`Network`] backed by the host's routing table
#[derive(Debug, Default)]
pub struct KubeletNetwork;

impl Network for KubeletNetwork {
    fn node_ip(&self, kubelet_flags: &[String]) -> Result<IpAddr, ValidationError> {
        for flag in kubelet_flags {
            if let Some(ip) = flag.strip_prefix(NODE_IP_FLAG) {
                return ip
                    .parse()
                    .map_err(|e| format!("parsing node-ip kubelet flag {ip:?}: {e}").into());
            }
        }

        // Connecting a UDP socket sends no packets; it only asks the kernel
        // which local address would be used for the default route.
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| format!("resolving default node IP: {e}"))?;
        socket
            .connect("8.8.8.8:53")
            .map_err(|e| format!("resolving default node IP: {e}"))?;
        let addr = socket
            .local_addr()
            .map_err(|e| format!("resolving default node IP: {e}"))?;
        Ok(addr.ip())
    }
}

/// Check that the node IP falls inside one of the cluster's remote node
/// networks. An empty network list means the cluster hasn't constrained
/// hybrid node addressing, so any usable IP passes.
pub fn validate_node_ip(ip: IpAddr, remote_networks: &[String]) -> Result<(), ValidationError> {
    if ip.is_unspecified() || ip.is_multicast() {
        return Err(with_remediation(
            format!("node IP {ip} is not a usable unicast address"),
            "Set a routable node IP with the node-ip kubelet flag.",
        ));
    }

    if remote_networks.is_empty() {
        debug!(ip = %ip, "No remote node networks configured, skipping range check");
        return Ok(());
    }

    for network in remote_networks {
        if network_contains(network, ip)? {
            debug!(ip = %ip, network = %network, "Node IP is within a remote node network");
            return Ok(());
        }
    }

    Err(with_remediation(
        format!("node IP {ip} is not in any of the cluster's remote node networks {remote_networks:?}"),
        "Ensure the node's IP is within one of the remote node networks configured for the cluster, or set one explicitly with the node-ip kubelet flag.",
    ))
}

/// Whether the CIDR contains the given IP; non-matching address families
/// never match.
fn network_contains(cidr: &str, ip: IpAddr) -> Result<bool, ValidationError> {
    let (network, prefix_len) = cidr
        .split_once('/')
        .ok_or_else(|| format!("remote node network {cidr:?} is not in CIDR notation"))?;

    let prefix_len: u32 = prefix_len
        .parse()
        .map_err(|e| format!("parsing prefix length of {cidr:?}: {e}"))?;

    let network: IpAddr = network
        .parse()
        .map_err(|e| format!("parsing network address of {cidr:?}: {e}"))?;

    match (network, ip) {
        (IpAddr::V4(network), IpAddr::V4(ip)) => {
            if prefix_len > 32 {
                return Err(format!("prefix length of {cidr:?} exceeds 32").into());
            }
            Ok(u32::from(network) & v4_mask(prefix_len) == u32::from(ip) & v4_mask(prefix_len))
        }
        (IpAddr::V6(network), IpAddr::V6(ip)) => {
            if prefix_len > 128 {
                return Err(format!("prefix length of {cidr:?} exceeds 128").into());
            }
            Ok(u128::from(network) & v6_mask(prefix_len)
                == u128::from(ip) & v6_mask(prefix_len))
        }
        _ => Ok(false),
    }
}

fn v4_mask(prefix_len: u32) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len)
    }
}

fn v6_mask(prefix_len: u32) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::is_remediable;

    #[test]
    fn test_flag_pins_the_node_ip() {
        let network = KubeletNetwork;
        let ip = network
            .node_ip(&["v=2".to_string(), "node-ip=10.80.0.5".to_string()])
            .expect("flag should resolve");
        assert_eq!(ip, "10.80.0.5".parse::<IpAddr>().expect("test ip"));
    }

    #[test]
    fn test_garbage_flag_is_an_error() {
        let network = KubeletNetwork;
        assert!(network.node_ip(&["node-ip=not-an-ip".to_string()]).is_err());
    }

    #[test]
    fn test_ip_inside_remote_network_passes() {
        let ip = "10.80.1.2".parse().expect("test ip");
        validate_node_ip(ip, &["10.80.0.0/16".to_string()]).expect("in range");
    }

    #[test]
    fn test_ip_outside_remote_networks_fails_with_remediation() {
        let ip = "192.168.1.2".parse().expect("test ip");
        let err = validate_node_ip(ip, &["10.80.0.0/16".to_string()])
            .expect_err("out of range");
        assert!(is_remediable(err.as_ref()));
    }

    #[test]
    fn test_no_networks_means_no_range_check() {
        let ip = "192.168.1.2".parse().expect("test ip");
        validate_node_ip(ip, &[]).expect("unconstrained");
    }

    #[test]
    fn test_unspecified_ip_fails() {
        let ip = "0.0.0.0".parse().expect("test ip");
        assert!(validate_node_ip(ip, &[]).is_err());
    }

    #[test]
    fn test_address_families_never_cross_match() {
        let ip = "10.80.0.5".parse().expect("test ip");
        let err = validate_node_ip(ip, &["fd00::/8".to_string()])
            .expect_err("v4 address cannot be in a v6 network");
        assert!(is_remediable(err.as_ref()));
    }

    #[test]
    fn test_malformed_cidr_is_an_error() {
        let ip = "10.80.0.5".parse().expect("test ip");
        assert!(validate_node_ip(ip, &["10.80.0.0".to_string()]).is_err());
    }
}
