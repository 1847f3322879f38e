//! Filesystem path expansion for configuration values.
//!
//! # Responsibilities
//! - Expand a leading `~` to the home directory
//! - Resolve relative paths against the config file's directory
//!
//! # Design Decisions
//! - Pure function: home and base directory are injected by the caller,
//!   so expansion is testable without touching the real environment
//! - `~` expansion happens before relative resolution

use std::path::{Path, PathBuf};

/// Expand a raw path from the config file into an absolute path.
///
/// A leading `~` (alone or `~/...`) is replaced with `home` when one is
/// available. Anything still relative afterwards is joined onto `base`,
/// the directory containing the config file.
pub fn expand(raw: &str, base: &Path, home: Option<&Path>) -> PathBuf {
    let expanded = match (raw.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() => home.to_path_buf(),
        (Some(rest), Some(home)) => match rest.strip_prefix('/') {
            Some(tail) => home.join(tail),
            // "~user" forms are not supported; keep the literal path
            None => PathBuf::from(raw),
        },
        _ => PathBuf::from(raw),
    };

    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_is_untouched() {
        let p = expand("/etc/ssl/cert.pem", Path::new("/conf"), Some(Path::new("/home/op")));
        assert_eq!(p, PathBuf::from("/etc/ssl/cert.pem"));
    }

    #[test]
    fn relative_path_resolves_against_base() {
        let p = expand("certs/cert.pem", Path::new("/etc/proxy"), None);
        assert_eq!(p, PathBuf::from("/etc/proxy/certs/cert.pem"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let p = expand("~/certs/key.pem", Path::new("/conf"), Some(Path::new("/home/op")));
        assert_eq!(p, PathBuf::from("/home/op/certs/key.pem"));
    }

    #[test]
    fn bare_tilde_is_home() {
        let p = expand("~", Path::new("/conf"), Some(Path::new("/home/op")));
        assert_eq!(p, PathBuf::from("/home/op"));
    }

    #[test]
    fn tilde_without_home_falls_back_to_base() {
        let p = expand("~/certs/key.pem", Path::new("/conf"), None);
        assert_eq!(p, PathBuf::from("/conf/~/certs/key.pem"));
    }

    #[test]
    fn tilde_user_form_is_left_literal() {
        let p = expand("~other/key.pem", Path::new("/conf"), Some(Path::new("/home/op")));
        assert_eq!(p, PathBuf::from("/conf/~other/key.pem"));
    }
}
