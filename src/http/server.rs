//! Proxy application setup and request dispatch.
//!
//! # Responsibilities
//! - Build the axum Router with the catch-all proxy handler
//! - Wire up request tracing middleware
//! - Run each request through access filter → host resolution → forwarder
//! - Map every per-request failure to its status code at this boundary
//!
//! # Design Decisions
//! - All shared state is immutable (config snapshot, routing table,
//!   outbound client); handlers never synchronize
//! - 403 is decided before any upstream work; 404 and 502 carry enough
//!   log detail to diagnose without a debugger

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::forward::{self, HttpClient};
use crate::routing::RoutingTable;
use crate::security;

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub table: Arc<RoutingTable>,
    pub client: HttpClient,
    /// Scheme of the listener this app is served from; becomes
    /// X-Forwarded-Proto on outbound requests.
    pub scheme: &'static str,
}

/// Build the proxy application for one listener.
pub fn build_app(config: Arc<ProxyConfig>, client: HttpClient, scheme: &'static str) -> Router {
    let table = Arc::new(RoutingTable::new(config.routes.clone()));
    let state = AppState {
        config,
        table,
        client,
        scheme,
    };

    Router::new()
        .route("/{*path}", any(proxy_handler))
        .route("/", any(proxy_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Main proxy handler: filter, resolve, forward.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let client_ip = addr.ip().to_string();

    if !security::is_allowed(&state.config.allow_ips, Some(&client_ip)) {
        tracing::warn!(client_ip = %client_ip, "Client IP is not in the allowlist");
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    // HTTP/2 requests carry :authority instead of a Host header.
    let host_header = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| request.uri().authority().map(|a| a.to_string()));

    let upstream = match state.table.resolve(host_header.as_deref()) {
        Ok(upstream) => upstream,
        Err(unknown) => {
            if state.config.require_explicit_host {
                tracing::error!(host = %unknown.host, "No route configured for host");
            } else {
                tracing::warn!(host = %unknown.host, "No route configured for host");
            }
            return (StatusCode::NOT_FOUND, "No route for host").into_response();
        }
    };

    match forward::forward(&state.client, request, upstream, &client_ip, state.scheme).await {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(
                upstream = %upstream,
                client_ip = %client_ip,
                error = %error,
                "Upstream request failed"
            );
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
