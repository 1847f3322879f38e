//! Outbound request construction and upstream relay.
//!
//! # Responsibilities
//! - Swap the request origin for the configured upstream, keeping path
//!   and query
//! - Rewrite proxy headers (drop Host, append X-Forwarded-For, set
//!   X-Forwarded-Host and X-Forwarded-Proto)
//! - Stream bodies both ways without buffering
//! - Map transport failures into a typed error the handler turns into 502
//!
//! # Design Decisions
//! - GET and HEAD are forwarded without a body even if one was attached
//! - Upstream redirects are not followed; 3xx responses pass through to
//!   the original caller untouched
//! - A fixed ceiling bounds the upstream call so a hung upstream becomes
//!   a 502 rather than a stuck handler

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Method, Request, Response, Uri};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Ceiling on a single upstream exchange.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared outbound client; speaks both http and https to upstreams.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Error type for a single forwarding attempt. Every variant maps to a
/// 502 at the handler boundary.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream transport failure: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {}s", UPSTREAM_TIMEOUT.as_secs())]
    Timeout,

    #[error("could not assemble outbound request: {0}")]
    Request(#[from] axum::http::Error),
}

/// Build the outbound client. The connector trusts the platform's native
/// roots for https upstreams and performs no redirect following, which is
/// exactly the pass-through behavior the proxy needs.
pub fn build_client() -> std::io::Result<HttpClient> {
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()?
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build();
    Ok(Client::builder(TokioExecutor::new()).build(connector))
}

/// Replace the origin of the inbound URI with the upstream's, keeping the
/// inbound path and query. Any path on the upstream base is discarded.
pub fn outbound_uri(upstream: &Uri, inbound: &Uri) -> Result<Uri, axum::http::Error> {
    let path_and_query = inbound
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let mut parts = upstream.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse()?);
    Ok(Uri::from_parts(parts)?)
}

/// Construct the outbound request from the inbound one.
pub fn build_outbound(
    request: Request<Body>,
    upstream: &Uri,
    client_ip: &str,
    scheme: &'static str,
) -> Result<Request<Body>, ForwardError> {
    let (parts, body) = request.into_parts();
    let uri = outbound_uri(upstream, &parts.uri)?;

    // HTTP/2 requests carry :authority instead of a Host header.
    let original_host = parts.headers.get(header::HOST).cloned().or_else(|| {
        parts
            .uri
            .authority()
            .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
    });

    let mut headers = parts.headers;
    headers.remove(header::HOST);

    let chain = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(previous) => format!("{previous}, {client_ip}"),
        None => client_ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
    if let Some(host) = original_host {
        headers.insert(X_FORWARDED_HOST, host);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(scheme));

    let body = if parts.method == Method::GET || parts.method == Method::HEAD {
        Body::empty()
    } else {
        body
    };

    let mut outbound = Request::builder()
        .method(parts.method)
        .uri(uri)
        .body(body)
        .map_err(ForwardError::Request)?;
    *outbound.headers_mut() = headers;
    Ok(outbound)
}

/// Forward the request to the upstream and relay the response verbatim.
///
/// The response body is handed back as a stream; neither latency nor
/// memory use scales with its size.
pub async fn forward(
    client: &HttpClient,
    request: Request<Body>,
    upstream: &Uri,
    client_ip: &str,
    scheme: &'static str,
) -> Result<Response<Body>, ForwardError> {
    let outbound = build_outbound(request, upstream, client_ip, scheme)?;

    let response = tokio::time::timeout(UPSTREAM_TIMEOUT, client.request(outbound))
        .await
        .map_err(|_| ForwardError::Timeout)??;

    let (parts, body) = response.into_parts();
    Ok(Response::from_parts(parts, Body::new(body)))
}
