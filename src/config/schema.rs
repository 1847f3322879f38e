//! Configuration schema definitions.
//!
//! Two layers live here: the raw structures deserialized from the JSON
//! config file (camelCase, every field defaulted) and the normalized
//! [`ProxyConfig`] the rest of the proxy consumes. Normalization lives in
//! the loader; after it runs, downstream code never checks for "unset".

use std::collections::HashMap;
use std::path::PathBuf;

use axum::http::Uri;
use serde::Deserialize;

/// Root of the JSON configuration file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RawConfig {
    /// Listener settings.
    pub http: RawHttp,

    /// Hostname → upstream base URL.
    pub routes: HashMap<String, String>,

    /// Log unmatched hosts at error level instead of warn level.
    pub require_explicit_host: bool,

    /// Client IP allowlist; empty means unrestricted.
    pub allow_ips: Vec<String>,

    /// Optional TLS termination settings.
    pub tls: Option<RawTls>,
}

/// The `http` section of the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawHttp {
    /// Serve traffic at all. `false` is a legitimate inert state.
    pub enabled: bool,

    /// Bind host for the primary listener.
    pub host: String,

    /// Bind port for the primary listener.
    pub port: u16,

    /// Plain-HTTP → HTTPS redirect listener settings.
    pub redirect: RawRedirect,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 80,
            redirect: RawRedirect::default(),
        }
    }
}

/// The `http.redirect` section. Only meaningful when TLS is active.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRedirect {
    pub enabled: bool,
    pub port: u16,
    pub status_code: u16,
}

impl Default for RawRedirect {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 80,
            status_code: 307,
        }
    }
}

/// The `tls` section of the config file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTls {
    /// Explicit switch. When unset, TLS is inferred from cert+key presence.
    pub enabled: Option<bool>,

    /// Server certificate chain (PEM).
    pub cert_path: Option<String>,

    /// Server private key (PEM).
    pub key_path: Option<String>,

    /// CA certificates for client verification; a single path or a list.
    pub ca_path: Option<OneOrMany>,

    /// Passphrase for an encrypted PKCS#8 private key.
    pub passphrase: Option<String>,

    /// Request (and verify) a client certificate during the handshake.
    pub request_client_cert: bool,
}

/// A JSON value that may be a single string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Flatten into a list, preserving order.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Normalized, fully-defaulted proxy configuration.
///
/// Constructed exactly once per process start by the loader and shared by
/// reference across all handlers; immutable thereafter, so concurrent reads
/// need no synchronization.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub http: HttpConfig,

    /// Lowercase hostname (no port) → upstream origin.
    pub routes: HashMap<String, Uri>,

    /// Observability only: picks the log severity for unmatched hosts.
    pub require_explicit_host: bool,

    /// Trimmed, non-empty IP literals; empty means allow all.
    pub allow_ips: Vec<String>,

    /// Present when TLS termination is active.
    pub tls: Option<TlsSettings>,

    /// Directory of the loaded config file; base for relative paths.
    pub config_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub redirect: RedirectConfig,
}

#[derive(Debug, Clone)]
pub struct RedirectConfig {
    pub enabled: bool,
    pub port: u16,
    pub status_code: u16,
}

/// Resolved TLS material. All paths are absolute and existed at load time.
#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub ca_paths: Vec<PathBuf>,
    pub passphrase: Option<String>,
    pub request_client_cert: bool,
}

/// The built-in route set used when no config source is found or when a
/// config file normalizes to an empty route map.
pub fn default_routes() -> HashMap<String, Uri> {
    let mut routes = HashMap::new();
    routes.insert(
        "localhost".to_string(),
        Uri::from_static("http://127.0.0.1:3000"),
    );
    routes
}

impl Default for ProxyConfig {
    /// The hard-coded zero-configuration default: a single localhost route,
    /// plaintext port 80, no allowlist, no TLS.
    fn default() -> Self {
        Self {
            http: HttpConfig {
                enabled: true,
                host: "0.0.0.0".to_string(),
                port: 80,
                redirect: RedirectConfig {
                    enabled: false,
                    port: 80,
                    status_code: 307,
                },
            },
            routes: default_routes(),
            require_explicit_host: false,
            allow_ips: Vec::new(),
            tls: None,
            config_dir: PathBuf::from("."),
        }
    }
}
