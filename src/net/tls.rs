//! TLS configuration and certificate loading.
//!
//! Assembles the rustls server config for the primary listener: PEM
//! certificate chain and private key (optionally passphrase-protected
//! PKCS#8), plus a required client-certificate verifier over the
//! configured CA roots when client certificates are requested.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use thiserror::Error;

use crate::config::TlsSettings;

const ENCRYPTED_PKCS8_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// Error type for TLS material loading. Fatal at startup.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse PEM in {path}: {source}")]
    Pem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no certificates found in {0}")]
    EmptyCertChain(PathBuf),

    #[error("no private key found in {0}")]
    NoPrivateKey(PathBuf),

    #[error("a passphrase is configured but {0} is not an encrypted PKCS#8 key")]
    NotEncrypted(PathBuf),

    #[error("could not decrypt private key {path}: {source}")]
    Decrypt {
        path: PathBuf,
        source: pkcs8::Error,
    },

    #[error("invalid client CA certificate in {path}: {source}")]
    CaCert {
        path: PathBuf,
        source: rustls::Error,
    },

    #[error("client certificate verifier rejected the CA set: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),

    #[error("TLS configuration rejected: {0}")]
    Config(#[from] rustls::Error),
}

/// Build the axum-server TLS config from resolved settings.
pub fn build_rustls_config(tls: &TlsSettings) -> Result<RustlsConfig, TlsError> {
    let certs = load_certs(&tls.cert_path)?;
    let key = load_private_key(&tls.key_path, tls.passphrase.as_deref())?;

    let builder = if tls.request_client_cert {
        let mut roots = RootCertStore::empty();
        for path in &tls.ca_paths {
            for cert in load_certs(path)? {
                roots.add(cert).map_err(|source| TlsError::CaCert {
                    path: path.clone(),
                    source,
                })?;
            }
        }
        // A required (not merely accepted) client certificate: the server
        // sends a CertificateRequest and fails the handshake without one.
        let verifier = WebPkiClientVerifier::builder(Arc::new(roots)).build()?;
        ServerConfig::builder().with_client_cert_verifier(verifier)
    } else {
        ServerConfig::builder().with_no_client_auth()
    };

    let mut config = builder.with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(RustlsConfig::from_config(Arc::new(config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let file = File::open(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<_, _>>()
        .map_err(|source| TlsError::Pem {
            path: path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::EmptyCertChain(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_private_key(
    path: &Path,
    passphrase: Option<&str>,
) -> Result<PrivateKeyDer<'static>, TlsError> {
    match passphrase {
        None => {
            let file = File::open(path).map_err(|source| TlsError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            rustls_pemfile::private_key(&mut BufReader::new(file))
                .map_err(|source| TlsError::Pem {
                    path: path.to_path_buf(),
                    source,
                })?
                .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
        }
        Some(passphrase) => decrypt_private_key(path, passphrase),
    }
}

/// Decrypt a passphrase-protected PKCS#8 private key.
fn decrypt_private_key(path: &Path, passphrase: &str) -> Result<PrivateKeyDer<'static>, TlsError> {
    let pem = fs::read_to_string(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (label, document) =
        pkcs8::SecretDocument::from_pem(&pem).map_err(|source| TlsError::Decrypt {
            path: path.to_path_buf(),
            source: pkcs8::Error::Asn1(source.into()),
        })?;
    if label != ENCRYPTED_PKCS8_LABEL {
        return Err(TlsError::NotEncrypted(path.to_path_buf()));
    }

    let encrypted = pkcs8::EncryptedPrivateKeyInfo::try_from(document.as_bytes()).map_err(
        |source| TlsError::Decrypt {
            path: path.to_path_buf(),
            source,
        },
    )?;
    let decrypted = encrypted
        .decrypt(passphrase)
        .map_err(|source| TlsError::Decrypt {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(PrivateKeyDer::from(PrivatePkcs8KeyDer::from(
        decrypted.as_bytes().to_vec(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vhost-proxy-tls-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_self_signed(dir: &Path) -> (PathBuf, PathBuf) {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_path = dir.join("cert.pem");
        let key_path = dir.join("key.pem");
        fs::write(&cert_path, cert.cert.pem()).unwrap();
        fs::write(&key_path, cert.key_pair.serialize_pem()).unwrap();
        (cert_path, key_path)
    }

    fn settings(cert_path: PathBuf, key_path: PathBuf) -> TlsSettings {
        TlsSettings {
            cert_path,
            key_path,
            ca_paths: Vec::new(),
            passphrase: None,
            request_client_cert: false,
        }
    }

    #[test]
    fn builds_from_self_signed_material() {
        let dir = scratch_dir("basic");
        let (cert_path, key_path) = write_self_signed(&dir);
        build_rustls_config(&settings(cert_path, key_path)).unwrap();
    }

    #[test]
    fn builds_with_required_client_certs() {
        let dir = scratch_dir("mtls");
        let (cert_path, key_path) = write_self_signed(&dir);
        let mut tls = settings(cert_path.clone(), key_path);
        tls.ca_paths = vec![cert_path];
        tls.request_client_cert = true;
        build_rustls_config(&tls).unwrap();
    }

    #[test]
    fn missing_cert_file_is_a_read_error() {
        let dir = scratch_dir("missing");
        let tls = settings(dir.join("absent.pem"), dir.join("absent.key"));
        assert!(matches!(
            build_rustls_config(&tls),
            Err(TlsError::Read { .. })
        ));
    }

    #[test]
    fn cert_file_without_certificates_is_rejected() {
        let dir = scratch_dir("empty");
        let cert_path = dir.join("empty.pem");
        fs::write(&cert_path, "").unwrap();
        assert!(matches!(
            load_certs(&cert_path),
            Err(TlsError::EmptyCertChain(_))
        ));
    }

    #[test]
    fn passphrase_on_unencrypted_key_is_rejected() {
        let dir = scratch_dir("plain-key");
        let (_, key_path) = write_self_signed(&dir);
        assert!(matches!(
            load_private_key(&key_path, Some("secret")),
            Err(TlsError::NotEncrypted(_))
        ));
    }
}
