//! Client IP allowlist evaluation.

/// Decide whether a client IP may use the proxy.
///
/// An empty allowlist permits everyone. A non-empty allowlist permits only
/// clients whose IP matches an entry verbatim; an unknown client IP is
/// rejected.
pub fn is_allowed(allow_ips: &[String], client_ip: Option<&str>) -> bool {
    if allow_ips.is_empty() {
        return true;
    }
    match client_ip {
        Some(ip) => allow_ips.iter().any(|allowed| allowed == ip),
        None => false,
    }
}
