//! Configuration loading and normalization.
//!
//! # Data Flow
//! ```text
//! explicit --config path > PROXY_CONFIG / VHOST_PROXY_CONFIG > search list
//!     → read + parse JSON (RawConfig)
//!     → normalize (defaults, route keys, path expansion, TLS inference)
//!     → validate TLS material exists on disk
//!     → ProxyConfig (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - An explicit path that does not exist is a hard error; the other
//!   sources fall through in order
//! - No source at all yields the built-in default config, so the proxy
//!   boots with zero configuration for local use
//! - Every failure names the exact offending path or route key

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use axum::http::{StatusCode, Uri};
use thiserror::Error;

use crate::config::paths;
use crate::config::schema::{
    default_routes, HttpConfig, ProxyConfig, RawConfig, RedirectConfig, TlsSettings,
};

/// Environment variables consulted when no explicit path is given.
pub const ENV_VARS: [&str; 2] = ["PROXY_CONFIG", "VHOST_PROXY_CONFIG"];

/// Conventional locations tried after the environment variables.
pub const SEARCH_PATHS: [&str; 3] = [
    "vhost-proxy.json",
    "config/vhost-proxy.json",
    "/etc/vhost-proxy/config.json",
];

/// Error type for configuration resolution. All variants are fatal at
/// startup; no listener may bind after one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} could not be read: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("config file given as {0} does not exist")]
    ExplicitPathMissing(PathBuf),

    #[error("route {key:?} has an invalid upstream URL {value:?}: an absolute http(s) URL is required")]
    InvalidUpstream { key: String, value: String },

    #[error("tls is enabled but {0} is missing from the configuration")]
    MissingTlsPath(&'static str),

    #[error("tls file does not exist: {0}")]
    TlsFileMissing(PathBuf),

    #[error("requestClientCert is set but no caPath is configured to verify against")]
    ClientCertRequiresCa,

    #[error("redirect statusCode {0} is not a redirect status")]
    InvalidRedirectStatus(u16),
}

/// Resolve the effective configuration, trying each source in precedence
/// order and falling back to the built-in default when none yields a file.
pub fn resolve(explicit: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let home = std::env::var_os("HOME").map(PathBuf::from);

    match discover(explicit)? {
        Some((path, source)) => {
            let config = load(&path, home.as_deref())?;
            tracing::info!(
                path = %path.display(),
                source,
                route_count = config.routes.len(),
                tls = config.tls.is_some(),
                "Configuration loaded"
            );
            Ok(config)
        }
        None => {
            tracing::info!("No configuration file found, using built-in defaults");
            Ok(ProxyConfig::default())
        }
    }
}

/// Pick the config file to load, if any. First success wins.
fn discover(explicit: Option<&Path>) -> Result<Option<(PathBuf, &'static str)>, ConfigError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::ExplicitPathMissing(path.to_path_buf()));
        }
        return Ok(Some((path.to_path_buf(), "cli")));
    }

    for var in ENV_VARS {
        if let Some(value) = std::env::var_os(var) {
            let path = PathBuf::from(value);
            if path.exists() {
                return Ok(Some((path, "env")));
            }
            tracing::warn!(
                var,
                path = %path.display(),
                "Environment variable points at a missing config file, trying next source"
            );
        }
    }

    for candidate in SEARCH_PATHS {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Ok(Some((path, "search-path")));
        }
    }

    Ok(None)
}

/// Load, normalize and validate a config file.
pub fn load(path: &Path, home: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let config_dir = std::path::absolute(parent).map_err(|source| ConfigError::Read {
        path: parent.to_path_buf(),
        source,
    })?;

    let config = normalize(raw, config_dir, home)?;
    validate_tls_material(&config)?;
    Ok(config)
}

/// Apply the normalization rules to a raw config. Pure except for logging.
pub fn normalize(
    raw: RawConfig,
    config_dir: PathBuf,
    home: Option<&Path>,
) -> Result<ProxyConfig, ConfigError> {
    let mut routes: HashMap<String, Uri> = HashMap::new();
    for (key, value) in raw.routes {
        let key = key.trim().to_lowercase();
        let value = value.trim().to_string();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let target: Uri = value
            .parse()
            .ok()
            .filter(|u: &Uri| u.scheme().is_some() && u.authority().is_some())
            .ok_or_else(|| ConfigError::InvalidUpstream {
                key: key.clone(),
                value: value.clone(),
            })?;
        routes.insert(key, target);
    }
    if routes.is_empty() {
        tracing::warn!("Config contains no usable routes, substituting the built-in default route");
        routes = default_routes();
    }

    let allow_ips: Vec<String> = raw
        .allow_ips
        .into_iter()
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .collect();

    if raw.http.redirect.enabled {
        let code = raw.http.redirect.status_code;
        if !StatusCode::from_u16(code).is_ok_and(|s| s.is_redirection()) {
            return Err(ConfigError::InvalidRedirectStatus(code));
        }
    }

    let tls = match raw.tls {
        Some(tls) => {
            let wanted = match tls.enabled {
                Some(explicit) => explicit,
                None => tls.cert_path.is_some() && tls.key_path.is_some(),
            };
            if wanted {
                let cert = tls.cert_path.ok_or(ConfigError::MissingTlsPath("certPath"))?;
                let key = tls.key_path.ok_or(ConfigError::MissingTlsPath("keyPath"))?;
                let ca_paths: Vec<PathBuf> = tls
                    .ca_path
                    .map(|ca| ca.into_vec())
                    .unwrap_or_default()
                    .iter()
                    .map(|p| paths::expand(p, &config_dir, home))
                    .collect();
                if tls.request_client_cert && ca_paths.is_empty() {
                    return Err(ConfigError::ClientCertRequiresCa);
                }
                Some(TlsSettings {
                    cert_path: paths::expand(&cert, &config_dir, home),
                    key_path: paths::expand(&key, &config_dir, home),
                    ca_paths,
                    passphrase: tls.passphrase,
                    request_client_cert: tls.request_client_cert,
                })
            } else {
                None
            }
        }
        None => None,
    };

    Ok(ProxyConfig {
        http: HttpConfig {
            enabled: raw.http.enabled,
            host: raw.http.host,
            port: raw.http.port,
            redirect: RedirectConfig {
                enabled: raw.http.redirect.enabled,
                port: raw.http.redirect.port,
                status_code: raw.http.redirect.status_code,
            },
        },
        routes,
        require_explicit_host: raw.require_explicit_host,
        allow_ips,
        tls,
        config_dir,
    })
}

/// Verify every piece of referenced TLS material exists on disk.
fn validate_tls_material(config: &ProxyConfig) -> Result<(), ConfigError> {
    let Some(tls) = &config.tls else {
        return Ok(());
    };
    for path in [&tls.cert_path, &tls.key_path]
        .into_iter()
        .chain(tls.ca_paths.iter())
    {
        if !path.exists() {
            return Err(ConfigError::TlsFileMissing(path.clone()));
        }
    }
    Ok(())
}
