//! Listener management.
//!
//! # Responsibilities
//! - Bind the primary listener (TLS-terminating or plaintext)
//! - Bind the optional redirect listener, skipping it when its port would
//!   loop straight back to itself
//! - Map bind failures to actionable errors
//! - Hand back a [`RunningProxy`] with the bound addresses
//!
//! # Design Decisions
//! - Everything is bound before any traffic is served; bind errors are
//!   fatal and reach the caller, never a background task
//! - Listeners drain on the shared shutdown signal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::ProxyConfig;
use crate::http::redirect::{self, RedirectState};
use crate::http::{forward, server};
use crate::lifecycle::Shutdown;
use crate::net::tls::{self, TlsError};

/// Error type for listener startup. All variants are fatal.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}{hint}")]
    Bind {
        addr: String,
        source: std::io::Error,
        hint: &'static str,
    },

    #[error("could not initialize the upstream HTTP client: {0}")]
    Client(std::io::Error),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// Handles to the running listener tasks and their bound addresses.
pub struct RunningProxy {
    /// Address of the primary listener; `None` when serving is disabled.
    pub primary_addr: Option<SocketAddr>,
    /// Address of the redirect listener, when one was started.
    pub redirect_addr: Option<SocketAddr>,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningProxy {
    fn inert() -> Self {
        Self {
            primary_addr: None,
            redirect_addr: None,
            tasks: Vec::new(),
        }
    }

    /// Wait for every listener task to finish (normally after shutdown).
    pub async fn wait(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Bind all configured listeners and start serving.
pub async fn start(
    config: Arc<ProxyConfig>,
    shutdown: &Shutdown,
) -> Result<RunningProxy, ListenerError> {
    if !config.http.enabled {
        tracing::info!("HTTP serving is disabled by configuration, not binding any listener");
        return Ok(RunningProxy::inert());
    }

    let scheme: &'static str = if config.tls.is_some() { "https" } else { "http" };
    let listener = bind(format!("{}:{}", config.http.host, config.http.port)).await?;
    let primary_addr = local_addr(&listener)?;

    let client = forward::build_client().map_err(ListenerError::Client)?;
    let app = server::build_app(config.clone(), client, scheme);
    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    let mut tasks = Vec::new();

    match &config.tls {
        Some(settings) => {
            let rustls_config = tls::build_rustls_config(settings)?;
            let std_listener = listener.into_std().map_err(|source| ListenerError::Bind {
                addr: primary_addr.to_string(),
                source,
                hint: "",
            })?;

            let handle = axum_server::Handle::new();
            {
                let handle = handle.clone();
                let mut rx = shutdown.subscribe();
                tokio::spawn(async move {
                    let _ = rx.recv().await;
                    handle.graceful_shutdown(Some(Duration::from_secs(5)));
                });
            }

            tasks.push(tokio::spawn(async move {
                let result = axum_server::from_tcp_rustls(std_listener, rustls_config)
                    .handle(handle)
                    .serve(service)
                    .await;
                if let Err(error) = result {
                    tracing::error!(error = %error, "HTTPS listener terminated abnormally");
                }
            }));
        }
        None => {
            let mut rx = shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                let result = axum::serve(listener, service)
                    .with_graceful_shutdown(async move {
                        let _ = rx.recv().await;
                    })
                    .await;
                if let Err(error) = result {
                    tracing::error!(error = %error, "HTTP listener terminated abnormally");
                }
            }));
        }
    }

    tracing::info!(
        scheme,
        address = %primary_addr,
        routes = config.routes.len(),
        "Primary listener bound"
    );

    let mut redirect_addr = None;
    if config.http.redirect.enabled && config.tls.is_some() {
        if config.http.redirect.port == config.http.port {
            tracing::warn!(
                port = config.http.redirect.port,
                "Redirect listener port equals the primary port; skipping it to avoid a redirect loop"
            );
        } else {
            let redirect_listener =
                bind(format!("{}:{}", config.http.host, config.http.redirect.port)).await?;
            let addr = local_addr(&redirect_listener)?;

            // Validated during config load; 307 is the schema default.
            let status = StatusCode::from_u16(config.http.redirect.status_code)
                .unwrap_or(StatusCode::TEMPORARY_REDIRECT);
            let redirect_app = redirect::build_app(RedirectState {
                status,
                primary_port: primary_addr.port(),
            });
            let redirect_service =
                redirect_app.into_make_service_with_connect_info::<SocketAddr>();

            let mut rx = shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                let result = axum::serve(redirect_listener, redirect_service)
                    .with_graceful_shutdown(async move {
                        let _ = rx.recv().await;
                    })
                    .await;
                if let Err(error) = result {
                    tracing::error!(error = %error, "Redirect listener terminated abnormally");
                }
            }));

            tracing::info!(
                address = %addr,
                redirect_to_port = primary_addr.port(),
                status = status.as_u16(),
                "Redirect listener bound"
            );
            redirect_addr = Some(addr);
        }
    }

    Ok(RunningProxy {
        primary_addr: Some(primary_addr),
        redirect_addr,
        tasks,
    })
}

/// Bind a TCP listener, attaching a privilege hint when a low port is
/// refused.
async fn bind(addr: String) -> Result<TcpListener, ListenerError> {
    match TcpListener::bind(&addr).await {
        Ok(listener) => Ok(listener),
        Err(source) => {
            let hint = if source.kind() == std::io::ErrorKind::PermissionDenied {
                " (ports below 1024 require elevated privileges or CAP_NET_BIND_SERVICE)"
            } else {
                ""
            };
            Err(ListenerError::Bind { addr, source, hint })
        }
    }
}

fn local_addr(listener: &TcpListener) -> Result<SocketAddr, ListenerError> {
    listener.local_addr().map_err(|source| ListenerError::Bind {
        addr: "local address".to_string(),
        source,
        hint: "",
    })
}
