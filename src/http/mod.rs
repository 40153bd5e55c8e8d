//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted TCP connection
//!     → server.rs (sniff; non-HTTP and TLS connections are closed)
//!     → hyper serves HTTP/1.1 or HTTP/2 over the ReplayableConnection
//!     → proxy.rs (Host lookup)
//!         no route      → overload guard (503 page or 403)
//!         auth required → basic auth check (401 on failure)
//!         matched       → forward to backend (502 on upstream failure)
//! ```

pub mod proxy;
pub mod server;

pub use server::{EdgeServer, EdgeState};
