//! Vhost route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the route for a request's Host
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction; reloads build a new router and swap it in
//! - O(1) exact host lookup via HashMap
//! - Wildcards scanned longest suffix first, so the most specific wins

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::RouteConfig;
use crate::routing::matcher::{normalize_host, BasicAuth, HostPattern};

/// A compiled vhost route.
#[derive(Debug)]
pub struct Route {
    pub host: HostPattern,
    pub backend: SocketAddr,
    pub auth: Option<BasicAuth>,
}

#[derive(Debug, Default)]
pub struct VhostRouter {
    exact: HashMap<String, Arc<Route>>,
    wildcards: Vec<Arc<Route>>,
}

impl VhostRouter {
    /// Compile routes, skipping entries whose backend does not parse.
    pub fn from_config(routes: &[RouteConfig]) -> Self {
        let mut router = Self::default();

        for config in routes {
            let backend: SocketAddr = match config.backend.parse() {
                Ok(addr) => addr,
                Err(_) => {
                    tracing::warn!(host = %config.host, backend = %config.backend, "Invalid route backend, skipping");
                    continue;
                }
            };
            let auth = match (&config.http_user, &config.http_password) {
                (Some(user), Some(password)) => Some(BasicAuth::new(user, password)),
                _ => None,
            };
            let host = HostPattern::parse(&config.host);
            let route = Arc::new(Route { host: host.clone(), backend, auth });

            match host {
                HostPattern::Exact(name) => {
                    router.exact.insert(name, route);
                }
                HostPattern::Wildcard(_) => router.wildcards.push(route),
            }
        }

        router.wildcards.sort_by_key(|r| match &r.host {
            HostPattern::Wildcard(suffix) => std::cmp::Reverse(suffix.len()),
            HostPattern::Exact(_) => std::cmp::Reverse(0),
        });

        tracing::debug!(
            exact = router.exact.len(),
            wildcard = router.wildcards.len(),
            "Vhost routes compiled"
        );
        router
    }

    /// Find the route for a raw Host value (port allowed).
    pub fn lookup(&self, host: &str) -> Option<Arc<Route>> {
        let host = normalize_host(host);
        if host.is_empty() {
            return None;
        }
        if let Some(route) = self.exact.get(&host) {
            return Some(Arc::clone(route));
        }
        self.wildcards
            .iter()
            .find(|r| r.host.matches(&host))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(host: &str, backend: &str) -> RouteConfig {
        RouteConfig {
            host: host.into(),
            backend: backend.into(),
            http_user: None,
            http_password: None,
        }
    }

    #[test]
    fn exact_beats_wildcard() {
        let router = VhostRouter::from_config(&[
            route("*.apps.test", "127.0.0.1:1000"),
            route("api.apps.test", "127.0.0.1:2000"),
            route("*.eu.apps.test", "127.0.0.1:3000"),
        ]);

        assert_eq!(router.lookup("API.apps.test:8080").unwrap().backend.port(), 2000);
        assert_eq!(router.lookup("web.apps.test").unwrap().backend.port(), 1000);
        assert_eq!(router.lookup("web.eu.apps.test").unwrap().backend.port(), 3000);
        assert!(router.lookup("apps.test").is_none());
        assert!(router.lookup("").is_none());
    }

    #[test]
    fn invalid_backends_are_skipped() {
        let router = VhostRouter::from_config(&[route("a.test", "nowhere"), route("b.test", "127.0.0.1:1")]);
        assert_eq!(router.len(), 1);
        assert!(router.lookup("a.test").is_none());
    }

    #[test]
    fn auth_is_compiled_when_both_fields_set() {
        let router = VhostRouter::from_config(&[RouteConfig {
            http_user: Some("u".into()),
            http_password: Some("p".into()),
            ..route("secure.test", "127.0.0.1:1")
        }]);
        assert!(router.lookup("secure.test").unwrap().auth.is_some());
    }
}
