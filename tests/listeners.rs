//! Listener wiring: TLS termination, the redirect listener and its loop
//! guard, and the disabled state.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Uri;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use vhost_proxy::config::{RedirectConfig, TlsSettings};

mod common;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vhost-proxy-it-{}-{}", tag, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write a self-signed certificate for `localhost` and return
/// (settings, root PEM for the client).
fn self_signed_tls(tag: &str) -> (TlsSettings, String) {
    let dir = scratch_dir(tag);
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_pem = cert.cert.pem();
    let cert_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");
    fs::write(&cert_path, &cert_pem).unwrap();
    fs::write(&key_path, cert.key_pair.serialize_pem()).unwrap();

    let settings = TlsSettings {
        cert_path,
        key_path,
        ca_paths: Vec::new(),
        passphrase: None,
        request_client_cert: false,
    };
    (settings, cert_pem)
}

/// Speak HTTP/1.1 over TLS, trusting `root_pem`, and return the response
/// as text.
async fn tls_request(addr: SocketAddr, server_name: &str, root_pem: &str, request: &str) -> String {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut root_pem.as_bytes()) {
        roots.add(cert.unwrap()).unwrap();
    }
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = tokio_rustls::TlsConnector::from(Arc::new(config));

    let tcp = TcpStream::connect(addr).await.unwrap();
    let server_name = rustls::pki_types::ServerName::try_from(server_name.to_string()).unwrap();
    let mut stream = connector.connect(server_name, tcp).await.unwrap();

    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    // Some servers skip close_notify; keep whatever arrived.
    let _ = stream.read_to_end(&mut response).await;
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn disabled_http_binds_nothing() {
    let mut config = common::test_config();
    config.http.enabled = false;

    let (proxy, _shutdown) = common::start_proxy(config).await;
    assert!(proxy.primary_addr.is_none());
    assert!(proxy.redirect_addr.is_none());
}

#[tokio::test]
async fn tls_listener_terminates_and_reports_https() {
    let (upstream, _) = common::start_echo_upstream().await;
    let (tls, root_pem) = self_signed_tls("roundtrip");

    let mut config = common::test_config();
    config.routes.insert(
        "localhost".to_string(),
        Uri::try_from(format!("http://{upstream}")).unwrap(),
    );
    config.tls = Some(tls);
    let (proxy, shutdown) = common::start_proxy(config).await;
    let addr = proxy.primary_addr.unwrap();

    let response = tls_request(
        addr,
        "localhost",
        &root_pem,
        "GET /secure HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
    assert!(response.contains("echo-x-forwarded-proto: https"));
    assert!(response.contains("echo-path: /secure"));

    shutdown.trigger();
    proxy.wait().await;
}

#[tokio::test]
async fn redirect_listener_points_at_the_primary_port() {
    let (tls, _root_pem) = self_signed_tls("redirect");

    let mut config = common::test_config();
    config.tls = Some(tls);
    config.http.redirect = RedirectConfig {
        enabled: true,
        port: common::free_port().await,
        status_code: 307,
    };
    let (proxy, shutdown) = common::start_proxy(config).await;
    let primary = proxy.primary_addr.unwrap();
    let redirect = proxy.redirect_addr.expect("redirect listener bound");

    let response = common::http_client()
        .get(format!("http://{redirect}/foo?q=1"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 307);
    assert_eq!(
        response.headers().get("location").unwrap(),
        format!("https://127.0.0.1:{}/foo?q=1", primary.port()).as_str()
    );
    assert_eq!(response.content_length(), Some(0));

    shutdown.trigger();
    proxy.wait().await;
}

#[tokio::test]
async fn redirect_listener_honors_the_configured_status() {
    let (tls, _root_pem) = self_signed_tls("redirect-status");

    let mut config = common::test_config();
    config.tls = Some(tls);
    config.http.redirect = RedirectConfig {
        enabled: true,
        port: common::free_port().await,
        status_code: 301,
    };
    let (proxy, shutdown) = common::start_proxy(config).await;
    let redirect = proxy.redirect_addr.expect("redirect listener bound");

    let response = common::http_client()
        .get(format!("http://{redirect}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 301);

    shutdown.trigger();
    proxy.wait().await;
}

#[tokio::test]
async fn redirect_listener_is_skipped_when_ports_collide() {
    let (tls, _root_pem) = self_signed_tls("loop-guard");

    let mut config = common::test_config();
    config.tls = Some(tls);
    // Same configured port as the primary listener: starting this
    // listener would redirect straight back to itself.
    config.http.redirect = RedirectConfig {
        enabled: true,
        port: config.http.port,
        status_code: 307,
    };
    let (proxy, shutdown) = common::start_proxy(config).await;

    assert!(proxy.primary_addr.is_some());
    assert!(proxy.redirect_addr.is_none());

    shutdown.trigger();
    proxy.wait().await;
}

#[tokio::test]
async fn plaintext_config_never_starts_a_redirect_listener() {
    let (upstream, _) = common::start_echo_upstream().await;

    let mut config = common::test_config();
    config.routes.insert(
        "127.0.0.1".to_string(),
        Uri::try_from(format!("http://{upstream}")).unwrap(),
    );
    config.http.redirect = RedirectConfig {
        enabled: true,
        port: common::free_port().await,
        status_code: 307,
    };
    let (proxy, shutdown) = common::start_proxy(config).await;

    assert!(proxy.primary_addr.is_some());
    assert!(proxy.redirect_addr.is_none());

    shutdown.trigger();
    proxy.wait().await;
}
