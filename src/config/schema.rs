//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::sniff::RuleSet;

/// Root configuration for the ingress edge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Vhost HTTP listener.
    pub listener: ListenerConfig,

    /// Protocol sniffing settings.
    pub sniffer: SnifferConfig,

    /// Route-not-found shedding.
    pub overload: OverloadConfig,

    /// Vhost routes (Host header → backend).
    pub routes: Vec<RouteConfig>,

    /// Raw TCP forwarding listeners.
    pub tcp_proxies: Vec<TcpProxyConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    pub admin: AdminConfig,

    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SnifferConfig {
    /// Time budget for capturing the probe, in milliseconds.
    pub read_timeout_ms: u64,

    /// Probe length in bytes (at most 512).
    pub probe_bytes: usize,

    /// Initial detection categories.
    pub rules: RuleSet,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 500,
            probe_bytes: 512,
            rules: RuleSet::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OverloadConfig {
    /// Degrade pages served per window before switching to bare 403s.
    pub max_service_unavailable_count: u64,

    /// Counter reset interval in seconds.
    pub window_secs: u64,

    /// Custom degrade page, re-read on every serve.
    pub page_path: Option<PathBuf>,

    /// Product token for the `Server` header.
    pub server_name: String,

    /// Version token for the `Server` header.
    pub version: String,
}

impl OverloadConfig {
    /// `<server_name>/<version>`
    pub fn server_header(&self) -> String {
        format!("{}/{}", self.server_name, self.version)
    }
}

impl Default for OverloadConfig {
    fn default() -> Self {
        Self {
            max_service_unavailable_count: 10,
            window_secs: 60,
            page_path: None,
            server_name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Vhost route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Exact host, or `*.example.com` for any subdomain.
    pub host: String,

    /// Backend address (e.g., "127.0.0.1:3000").
    pub backend: String,

    /// Basic auth user; requires `http_password`.
    #[serde(default)]
    pub http_user: Option<String>,

    #[serde(default)]
    pub http_password: Option<String>,
}

/// Raw TCP forwarding listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TcpProxyConfig {
    /// Identifier for logs and metrics.
    pub name: String,

    pub bind_address: String,

    pub backend: String,

    /// Close connections that sniff as HTTP-like.
    #[serde(default = "default_reject_http")]
    pub reject_http: bool,
}

fn default_reject_http() -> bool {
    true
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin control surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
