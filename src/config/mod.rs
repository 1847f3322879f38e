//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON)
//!     → loader.rs (source discovery, parse, normalize, validate)
//!     → paths.rs (pure ~ and relative-path expansion)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is an immutable snapshot; it is built once, before any
//!   listener starts, and never mutated
//! - All fields have defaults so a minimal (or absent) config still boots
//! - Syntactic checks are serde's job; semantic checks live in the loader

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::{resolve, ConfigError};
pub use schema::{ProxyConfig, RedirectConfig, TlsSettings};
