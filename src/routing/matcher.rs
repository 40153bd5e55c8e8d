//! Host patterns and route credentials.

use axum::http::HeaderValue;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// A configured route host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    /// `app.example.com`
    Exact(String),
    /// `*.example.com`, stored as the suffix `.example.com`.
    Wildcard(String),
}

impl HostPattern {
    pub fn parse(host: &str) -> Self {
        let host = normalize_host(host);
        match host.strip_prefix('*') {
            Some(suffix) if suffix.starts_with('.') => HostPattern::Wildcard(suffix.to_string()),
            _ => HostPattern::Exact(host),
        }
    }

    /// Match an already normalized host.
    pub fn matches(&self, host: &str) -> bool {
        match self {
            HostPattern::Exact(exact) => exact == host,
            HostPattern::Wildcard(suffix) => host.len() > suffix.len() && host.ends_with(suffix.as_str()),
        }
    }
}

/// Lowercase a host, dropping any port and trailing dot.
pub fn normalize_host(raw: &str) -> String {
    let raw = raw.trim();
    let host = if let Some(rest) = raw.strip_prefix('[') {
        // [v6]:port
        rest.split(']').next().unwrap_or(rest)
    } else {
        raw.rsplit_once(':').map_or(raw, |(host, _port)| host)
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// HTTP basic credentials required by a route.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    expected: Vec<u8>,
}

impl BasicAuth {
    pub fn new(user: &str, password: &str) -> Self {
        Self {
            expected: format!("{}:{}", user, password).into_bytes(),
        }
    }

    /// Check an `Authorization` header value.
    pub fn verify(&self, header: Option<&HeaderValue>) -> bool {
        let Some(value) = header.and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let Some((scheme, encoded)) = value.trim().split_once(' ') else {
            return false;
        };
        if !scheme.eq_ignore_ascii_case("basic") {
            return false;
        }
        STANDARD
            .decode(encoded.trim())
            .is_ok_and(|decoded| decoded == self.expected)
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BasicAuth(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_hosts() {
        assert_eq!(normalize_host("App.Example.COM:8080"), "app.example.com");
        assert_eq!(normalize_host("example.com."), "example.com");
        assert_eq!(normalize_host("[::1]:80"), "::1");
    }

    #[test]
    fn wildcard_needs_a_label() {
        let pattern = HostPattern::parse("*.apps.test");
        assert_eq!(pattern, HostPattern::Wildcard(".apps.test".into()));
        assert!(pattern.matches("one.apps.test"));
        assert!(pattern.matches("a.b.apps.test"));
        assert!(!pattern.matches("apps.test"));
        assert!(!pattern.matches(".apps.test"));
    }

    #[test]
    fn basic_auth_checks_credentials() {
        let auth = BasicAuth::new("ops", "s3cret");
        let good = HeaderValue::from_str(&format!("Basic {}", STANDARD.encode("ops:s3cret"))).unwrap();
        let lower = HeaderValue::from_str(&format!("basic {}", STANDARD.encode("ops:s3cret"))).unwrap();
        let wrong = HeaderValue::from_str(&format!("Basic {}", STANDARD.encode("ops:nope"))).unwrap();
        let bearer = HeaderValue::from_static("Bearer abc");

        assert!(auth.verify(Some(&good)));
        assert!(auth.verify(Some(&lower)));
        assert!(!auth.verify(Some(&wrong)));
        assert!(!auth.verify(Some(&bearer)));
        assert!(!auth.verify(None));
    }
}
