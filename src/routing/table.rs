//! Host-based route lookup.

use std::collections::HashMap;

use axum::http::Uri;
use thiserror::Error;

/// No route is configured for the request's host.
///
/// Carries the normalized hostname so the handler can log it; callers map
/// this to a 404 response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no route configured for host {host:?}")]
pub struct UnknownHost {
    pub host: String,
}

/// Immutable mapping from lowercase hostname (no port) to upstream origin.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: HashMap<String, Uri>,
}

impl RoutingTable {
    /// Build the table from an already-normalized route map.
    pub fn new(routes: HashMap<String, Uri>) -> Self {
        Self { routes }
    }

    /// Resolve a raw `Host` header value to its configured upstream.
    ///
    /// The hostname portion is extracted (a trailing `:port` is stripped)
    /// and lowercased before the exact-match lookup. An absent header
    /// normalizes to the empty string, which never matches because route
    /// keys are non-empty by construction.
    pub fn resolve(&self, host_header: Option<&str>) -> Result<&Uri, UnknownHost> {
        let host = normalize_host(host_header.unwrap_or(""));
        self.routes.get(&host).ok_or(UnknownHost { host })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Strip a trailing `:port` and lowercase. Bracketed IPv6 literals keep
/// their brackets so they compare against route keys written the same way.
fn normalize_host(raw: &str) -> String {
    let raw = raw.trim();
    let host = match raw.rfind(']') {
        Some(end) => &raw[..=end],
        None => raw.split(':').next().unwrap_or(""),
    };
    host.to_lowercase()
}
