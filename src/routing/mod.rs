//! Vhost routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (Host header)
//!     → router.rs (exact lookup, then wildcard scan)
//!     → matcher.rs (host normalization, basic auth check)
//!     → Return: matched Route or no match (→ overload guard)
//! ```
//!
//! # Design Decisions
//! - Routes compiled from config, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same host always matches same route

pub mod matcher;
pub mod router;

pub use matcher::{normalize_host, BasicAuth, HostPattern};
pub use router::{Route, VhostRouter};
