//! SSRF (Server-Side Request Forgery) protection.
//!
//! Validates that the host of every hop, including redirect targets,
//! resolves only to public addresses.
use std::net::IpAddr;
use std::time::Duration;

use url::{Host, Url};

/// Error type for SSRF validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SsrfError {
    #[error("blocked IP: {0} (private/reserved)")]
    BlockedIp(IpAddr),

    #[error("URL has no host")]
    MissingHost,

    #[error("DNS resolution failed: {0}")]
    DnsError(String),

    #[error("DNS resolution timed out after {0:?}")]
    DnsTimeout(Duration),
}

/// Check if an IP address is private, reserved, or otherwise blocked.
///
/// This covers:
/// - Loopback addresses (127.0.0.0/8, ::1)
/// - RFC 1918 private ranges (10/8, 172.16/12, 192.168/16)
/// - Link-local addresses (169.254/16, fe80::/10)
/// - Multicast addresses (224/4, ff00::/8)
/// - Unspecified addresses (0.0.0.0/8, ::)
/// - IPv6 unique local (fc00::/7)
/// - IPv4-mapped IPv6 addresses of any of the above
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 0
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_or_reserved(IpAddr::V4(v4));
            }
            v6.is_loopback()
                || v6.is_multicast()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Validate that an IP address is not private or reserved.
pub fn validate_ip(ip: IpAddr) -> Result<(), SsrfError> {
    if is_private_or_reserved(ip) { Err(SsrfError::BlockedIp(ip)) } else { Ok(()) }
}

/// Resolve the URL's host and validate every answer.
///
/// IP literals are checked directly; domain names go through the system
/// resolver, bounded by `timeout`, and are rejected if any A/AAAA answer is private.
pub async fn check_url(url: &Url, timeout: Duration) -> Result<(), SsrfError> {
    let port = url.port_or_known_default().unwrap_or(443);

    match url.host().ok_or(SsrfError::MissingHost)? {
        Host::Ipv4(v4) => validate_ip(IpAddr::V4(v4)),
        Host::Ipv6(v6) => validate_ip(IpAddr::V6(v6)),
        Host::Domain(domain) => {
            let addrs: Vec<_> = tokio::time::timeout(timeout, tokio::net::lookup_host((domain, port)))
                .await
                .map_err(|_| SsrfError::DnsTimeout(timeout))?
                .map_err(|e| SsrfError::DnsError(format!("{domain}: {e}")))?
                .collect();

            if addrs.is_empty() {
                return Err(SsrfError::DnsError(format!("{domain}: no addresses")));
            }

            for addr in addrs {
                validate_ip(addr.ip())?;
            }
            Ok(())
        }
    }
}
