//! Byte-level detectors run against a probe buffer.
//!
//! Each detector belongs to one [`Category`] and only runs when the rule set
//! snapshot enables it. Detectors are OR-combined; the first hit wins.

use std::fmt;

use crate::sniff::rules::{Category, RuleSet};

/// Request methods recognised at the start of the first line.
pub const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];

/// Header names searched for anywhere in the probe (matched case-insensitively).
pub const HEADER_TOKENS: [&str; 4] = ["host:", "user-agent:", "content-type:", "accept:"];

/// TLS record content type for handshake messages.
pub const TLS_HANDSHAKE: u8 = 0x16;
/// TLS/SSL major version byte.
pub const TLS_MAJOR: u8 = 0x03;
/// Highest accepted minor version byte (0x00 = SSL 3.0 ... 0x03 = TLS 1.2/1.3 records).
pub const TLS_MAX_MINOR: u8 = 0x03;

/// Which detector fired, and on what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    MethodLine(&'static str),
    Handshake { minor: u8 },
    Header(&'static str),
}

impl Detection {
    /// Stable detector name for logs and metric labels.
    pub fn detector(&self) -> &'static str {
        match self {
            Detection::MethodLine(_) => "method_line",
            Detection::Handshake { .. } => "tls_handshake",
            Detection::Header(_) => "header",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Detection::MethodLine(_) | Detection::Header(_) => Category::Http,
            Detection::Handshake { .. } => Category::Https,
        }
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detection::MethodLine(method) => write!(f, "method {}", method),
            Detection::Handshake { minor } => write!(f, "tls record 3.{}", minor),
            Detection::Header(token) => write!(f, "header {}", token),
        }
    }
}

/// Run every enabled detector in order and return the first hit.
pub fn detect(data: &[u8], rules: &RuleSet) -> Option<Detection> {
    let http = rules.is_enabled(Category::Http);

    if http {
        if let Some(method) = method_line(data) {
            return Some(Detection::MethodLine(method));
        }
    }
    if rules.is_enabled(Category::Https) {
        if let Some(minor) = tls_handshake(data) {
            return Some(Detection::Handshake { minor });
        }
    }
    if http {
        if let Some(token) = header_token(data) {
            return Some(Detection::Header(token));
        }
    }
    None
}

/// Match `<METHOD> ` at the start of the segment before the first CRLF.
pub fn method_line(data: &[u8]) -> Option<&'static str> {
    let first_line = match find(data, b"\r\n") {
        Some(end) => &data[..end],
        None => data,
    };

    HTTP_METHODS.iter().copied().find(|method| {
        first_line
            .strip_prefix(method.as_bytes())
            .is_some_and(|rest| rest.first() == Some(&b' '))
    })
}

/// Match a TLS handshake record header, returning the minor version byte.
pub fn tls_handshake(data: &[u8]) -> Option<u8> {
    match data {
        [TLS_HANDSHAKE, TLS_MAJOR, minor, ..] if *minor <= TLS_MAX_MINOR => Some(*minor),
        _ => None,
    }
}

/// Case-insensitive search for a well-known header name anywhere in the probe.
pub fn header_token(data: &[u8]) -> Option<&'static str> {
    let lowered = data.to_ascii_lowercase();
    HEADER_TOKENS
        .iter()
        .copied()
        .find(|token| find(&lowered, token.as_bytes()).is_some())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(http: bool, https: bool) -> RuleSet {
        [("http".to_string(), http), ("https".to_string(), https)]
            .into_iter()
            .collect()
    }

    #[test]
    fn every_method_is_recognised() {
        for method in HTTP_METHODS {
            let probe = format!("{} /index.html HTTP/1.1\r\n\r\n", method);
            assert_eq!(method_line(probe.as_bytes()), Some(method), "{}", method);
        }
    }

    #[test]
    fn method_requires_trailing_space() {
        assert_eq!(method_line(b"GETX / HTTP/1.1\r\n"), None);
        assert_eq!(method_line(b"GET"), None);
        assert_eq!(method_line(b"get / HTTP/1.1\r\n"), None);
    }

    #[test]
    fn method_only_checked_on_first_line() {
        assert_eq!(method_line(b"HELLO\r\nGET / HTTP/1.1\r\n"), None);
        assert_eq!(method_line(b"POST /submit"), Some("POST"));
    }

    #[test]
    fn handshake_minor_range_is_zero_to_three() {
        for minor in 0..=3u8 {
            assert_eq!(tls_handshake(&[0x16, 0x03, minor, 0x00]), Some(minor));
        }
        assert_eq!(tls_handshake(&[0x16, 0x03, 0x04]), None);
        assert_eq!(tls_handshake(&[0x17, 0x03, 0x01]), None);
        assert_eq!(tls_handshake(&[0x16, 0x02, 0x01]), None);
    }

    #[test]
    fn short_probes_never_match_handshake() {
        assert_eq!(tls_handshake(&[]), None);
        assert_eq!(tls_handshake(&[0x16]), None);
        assert_eq!(tls_handshake(&[0x16, 0x03]), None);
    }

    #[test]
    fn header_tokens_match_anywhere_in_any_case() {
        assert_eq!(header_token(b"garbage HOST: example.com"), Some("host:"));
        assert_eq!(header_token(b"\x00\x01user-Agent: curl"), Some("user-agent:"));
        assert_eq!(header_token(b"xxContent-TYPE:"), Some("content-type:"));
        assert_eq!(header_token(b"accept:*/*"), Some("accept:"));
        assert_eq!(header_token(b"Host without colon"), None);
    }

    #[test]
    fn zero_bytes_are_not_http_like() {
        assert_eq!(detect(&[0u8; 512], &RuleSet::default()), None);
        assert_eq!(detect(&[], &RuleSet::default()), None);
        assert_eq!(detect(&[0x16, 0x03], &RuleSet::default()), None);
    }

    #[test]
    fn disabled_categories_do_not_contribute() {
        let tls = [0x16, 0x03, 0x01, 0x00, 0x05];
        assert_eq!(detect(&tls, &rules(true, false)), None);
        assert_eq!(detect(&tls, &rules(true, true)), Some(Detection::Handshake { minor: 1 }));

        let get = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";
        assert_eq!(detect(get, &rules(false, true)), None);
        assert_eq!(detect(get, &rules(true, false)), Some(Detection::MethodLine("GET")));
    }

    #[test]
    fn method_line_wins_over_header() {
        let probe = b"PATCH /x HTTP/1.1\r\nAccept: */*\r\n";
        assert_eq!(detect(probe, &RuleSet::default()), Some(Detection::MethodLine("PATCH")));
    }

    #[test]
    fn detection_reports_its_category() {
        assert_eq!(Detection::Header("host:").category(), Category::Http);
        assert_eq!(Detection::Handshake { minor: 3 }.category(), Category::Https);
        assert_eq!(Detection::MethodLine("GET").detector(), "method_line");
    }
}
