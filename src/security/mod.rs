//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access.rs (client IP vs allowlist)
//!     → Pass to routing, or reject with 403
//! ```
//!
//! # Design Decisions
//! - Fail closed: a non-empty allowlist with no client IP rejects
//! - Exact IP literal comparison only, no CIDR and no IPv6 re-normalization

pub mod access;

pub use access::is_allowed;
