//! Shared utilities for the integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use vhost_proxy::config::ProxyConfig;
use vhost_proxy::{RunningProxy, Shutdown};

/// Start an upstream that echoes what it received: the body comes back
/// verbatim, and selected request facts are reported as `echo-*` response
/// headers. Returns its address and a hit counter.
pub async fn start_echo_upstream() -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_handler = hits.clone();

    let app = Router::new().fallback(move |request: Request<Body>| {
        let hits = hits_handler.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            echo(request).await
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, hits)
}

async fn echo(request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, 2 * 1024 * 1024)
        .await
        .unwrap_or_default();

    let mut builder = Response::builder()
        .status(200)
        .header("echo-method", parts.method.as_str())
        .header(
            "echo-path",
            parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/"),
        )
        .header("echo-body-len", bytes.len());

    for name in ["host", "x-forwarded-for", "x-forwarded-host", "x-forwarded-proto"] {
        if let Some(value) = parts.headers.get(name) {
            builder = builder.header(format!("echo-{name}"), value);
        }
    }

    builder.body(Body::from(bytes)).unwrap()
}

/// A base config suitable for tests: loopback bind, ephemeral port.
pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.http.host = "127.0.0.1".to_string();
    config.http.port = 0;
    config.routes.clear();
    config
}

/// Start the proxy under test. The returned Shutdown stops it.
pub async fn start_proxy(config: ProxyConfig) -> (RunningProxy, Shutdown) {
    let shutdown = Shutdown::new();
    let proxy = vhost_proxy::start(Arc::new(config), &shutdown)
        .await
        .expect("proxy should start");
    (proxy, shutdown)
}

/// Send a raw HTTP/1.x request and return the entire response as text.
/// The request should carry `Connection: close` so the read terminates.
#[allow(dead_code)]
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Reserve a port that nothing is listening on.
#[allow(dead_code)]
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// An HTTP client that neither follows redirects nor pools connections.
#[allow(dead_code)]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
