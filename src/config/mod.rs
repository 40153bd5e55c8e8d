//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EdgeConfig (validated)
//!     → handed to the edge server at startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads and validates the new file
//!     → EdgeConfig sent over a channel to the running server
//!     → sniffer rules swapped, overload threshold reset, routes replaced
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - An invalid reload is logged and dropped; the running config stays

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, EdgeConfig, ListenerConfig, ObservabilityConfig, OverloadConfig, RouteConfig,
    SnifferConfig, TcpProxyConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
