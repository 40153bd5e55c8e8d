//! Raw TCP forwarding listeners.
//!
//! # Data Flow
//! ```text
//! Accepted TCP connection
//!     → sniffer (probe captured, verdict)
//!         HTTP-like and reject_http → close
//!         otherwise → connect backend, splice replayed stream both ways
//! ```
//!
//! # Design Decisions
//! - Rejection happens before any backend connection is opened
//! - The backend receives the probe bytes first, so sniffing is invisible to it

pub mod forward;

pub use forward::TcpForwarder;
