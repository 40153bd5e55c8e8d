//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, probe length within bounds)
//! - Check addresses parse and route hosts are unique
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::EdgeConfig;
use crate::net::replay::MAX_PROBE_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: String, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("sniffer.probe_bytes must be at most {max}, got {0}", max = MAX_PROBE_LEN)]
    ProbeTooLong(usize),

    #[error("routes[{0}]: host must not be empty")]
    EmptyHost(usize),

    #[error("route host {0:?} is defined more than once")]
    DuplicateHost(String),

    #[error("route {0:?}: http_user and http_password must be set together")]
    IncompleteAuth(String),

    #[error("overload: server header {0:?} contains invalid characters")]
    InvalidServerHeader(String),
}

pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }

    if config.sniffer.read_timeout_ms == 0 {
        errors.push(ValidationError::Zero("sniffer.read_timeout_ms"));
    }
    if config.sniffer.probe_bytes == 0 {
        errors.push(ValidationError::Zero("sniffer.probe_bytes"));
    } else if config.sniffer.probe_bytes > MAX_PROBE_LEN {
        errors.push(ValidationError::ProbeTooLong(config.sniffer.probe_bytes));
    }

    if config.overload.window_secs == 0 {
        errors.push(ValidationError::Zero("overload.window_secs"));
    }
    let server = config.overload.server_header();
    if !server.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        errors.push(ValidationError::InvalidServerHeader(server));
    }

    let mut hosts = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let host = route.host.trim().to_ascii_lowercase();
        if host.is_empty() {
            errors.push(ValidationError::EmptyHost(i));
        } else if !hosts.insert(host.clone()) {
            errors.push(ValidationError::DuplicateHost(host));
        }
        check_addr(&mut errors, &format!("routes[{}].backend", i), &route.backend);
        if route.http_user.is_some() != route.http_password.is_some() {
            errors.push(ValidationError::IncompleteAuth(route.host.clone()));
        }
    }

    for proxy in &config.tcp_proxies {
        check_addr(&mut errors, &format!("tcp_proxies.{}.bind_address", proxy.name), &proxy.bind_address);
        check_addr(&mut errors, &format!("tcp_proxies.{}.backend", proxy.name), &proxy.backend);
    }

    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_addr(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    fn route(host: &str, backend: &str) -> RouteConfig {
        RouteConfig {
            host: host.into(),
            backend: backend.into(),
            http_user: None,
            http_password: None,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&EdgeConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = EdgeConfig::default();
        config.sniffer.probe_bytes = 4096;
        config.overload.window_secs = 0;
        config.routes.push(route("a.test", "nowhere"));
        config.routes.push(route("A.test", "127.0.0.1:1"));
        config.routes.push(RouteConfig {
            http_user: Some("u".into()),
            ..route("b.test", "127.0.0.1:2")
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ProbeTooLong(4096)));
        assert!(errors.contains(&ValidationError::Zero("overload.window_secs")));
        assert!(errors.contains(&ValidationError::DuplicateHost("a.test".into())));
        assert!(errors.contains(&ValidationError::IncompleteAuth("b.test".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidAddress { value, .. } if value == "nowhere")));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn rejects_control_characters_in_server_header() {
        let mut config = EdgeConfig::default();
        config.overload.version = "1.0\r\nX-Evil: 1".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidServerHeader(_)));
    }
}
