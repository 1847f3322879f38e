//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request Host header
//!     → table.rs (strip :port, lowercase, exact lookup)
//!     → Return: upstream origin or UnknownHost
//! ```
//!
//! # Design Decisions
//! - The table is a projection of the config's route map, built once at
//!   startup and immutable afterwards (thread-safe without locks)
//! - Exact matching only; no wildcard or suffix rules
//! - Explicit UnknownHost error rather than a silent default

pub mod table;

pub use table::{RoutingTable, UnknownHost};
