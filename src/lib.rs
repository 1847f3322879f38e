//! Host-based HTTP(S) reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 vhost-proxy                  │
//!                    │                                              │
//!   Client Request   │  ┌──────────┐   ┌──────────┐   ┌─────────┐  │
//!   ─────────────────┼─▶│   net    │──▶│ security │──▶│ routing │  │
//!                    │  │ listener │   │ allowlist│   │  table  │  │
//!                    │  └──────────┘   └──────────┘   └────┬────┘  │
//!                    │                                     │       │
//!   Client Response  │  ┌──────────┐   ┌──────────┐        ▼       │
//!   ◀────────────────┼──│ streamed │◀──│   http   │◀── upstream    │
//!                    │  │  relay   │   │ forwarder│    origin      │
//!                    │  └──────────┘   └──────────┘                │
//!                    │                                              │
//!                    │  config (immutable snapshot) · lifecycle     │
//!                    └──────────────────────────────────────────────┘
//! ```
//!
//! The upstream is chosen from the request's `Host` header alone; the
//! configuration is normalized once at startup and shared immutably, so
//! the request path takes no locks and touches no disk.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod security;

// Cross-cutting concerns
pub mod lifecycle;

pub use config::{ConfigError, ProxyConfig};
pub use lifecycle::Shutdown;
pub use net::{start, ListenerError, RunningProxy};
pub use routing::RoutingTable;
