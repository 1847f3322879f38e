//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Listener connection
//!     → server.rs (axum app: access filter, host resolution)
//!     → forward.rs (origin swap, proxy headers, streamed relay)
//!     → Response to client
//!
//! Redirect listener connection
//!     → redirect.rs (Location assembly, empty-bodied redirect)
//! ```

pub mod forward;
pub mod redirect;
pub mod server;

pub use forward::{build_client, HttpClient};
pub use server::build_app;
