//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (id, live connection accounting)
//!     → sniffer captures the probe
//!     → replay.rs (probe bytes first, then the live stream)
//!     → Hand off to HTTP or TCP forwarding
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Sniffing never rewinds the socket; consumed bytes are replayed instead

pub mod connection;
pub mod listener;
pub mod replay;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use replay::{ProbeBuffer, ReplayableConnection, MAX_PROBE_LEN};
