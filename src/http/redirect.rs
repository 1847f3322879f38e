//! Plain-HTTP to HTTPS redirect application.
//!
//! Served by the secondary listener; every request is answered with an
//! empty-bodied redirect to the primary TLS listener, preserving host,
//! path and query. The port is omitted from the Location when the primary
//! listener sits on the default HTTPS port, producing canonical URLs.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;

/// State for the redirect handler.
#[derive(Debug, Clone)]
pub struct RedirectState {
    /// Status code taken from `http.redirect.statusCode`.
    pub status: StatusCode,
    /// Port of the primary TLS listener the Location points at.
    pub primary_port: u16,
}

/// Build the axum application served by the redirect listener.
pub fn build_app(state: RedirectState) -> Router {
    Router::new()
        .route("/{*path}", any(redirect_handler))
        .route("/", any(redirect_handler))
        .with_state(state)
}

async fn redirect_handler(
    State(state): State<RedirectState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host())
        .map(str::trim)
        .filter(|h| !h.is_empty());

    let Some(host) = host else {
        tracing::warn!(client_addr = %addr, "Redirect request without a Host header");
        return (StatusCode::BAD_REQUEST, "Host header required").into_response();
    };

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let location = location_for(host, state.primary_port, path_and_query);

    tracing::debug!(location = %location, "Redirecting to TLS listener");
    (state.status, [(header::LOCATION, location)]).into_response()
}

/// Assemble the redirect target. Any port on the inbound host is replaced
/// with the primary listener's port, which is spelled out unless it is 443.
pub fn location_for(host: &str, primary_port: u16, path_and_query: &str) -> String {
    let host = match host.rfind(']') {
        Some(end) => &host[..=end],
        None => host.split(':').next().unwrap_or(""),
    };
    if primary_port == 443 {
        format!("https://{host}{path_and_query}")
    } else {
        format!("https://{host}:{primary_port}{path_and_query}")
    }
}
