//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyConfig
//!     → tls.rs (rustls server config from PEM material)
//!     → listener.rs (bind primary + optional redirect, start serving)
//!     → RunningProxy (bound addresses, task handles)
//! ```
//!
//! # Design Decisions
//! - TLS material is read once at startup, never on the request path
//! - A redirect listener only exists alongside an active TLS listener

pub mod listener;
pub mod tls;

pub use listener::{start, ListenerError, RunningProxy};
pub use tls::TlsError;
