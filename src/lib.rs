//! Ingress edge library.
//!
//! Accepts raw TCP connections, sniffs their first bytes to decide what
//! kind of traffic they carry, and hands a replayable stream on to the
//! virtual-host HTTP proxy or a raw TCP forwarder. Unroutable requests are
//! answered by the overload guard.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod overload;
pub mod routing;
pub mod sniff;
pub mod tcp;

pub use config::EdgeConfig;
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
pub use overload::OverloadGuard;
pub use sniff::Sniffer;
