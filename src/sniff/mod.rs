//! Protocol sniffing subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection
//!     → probe.rs (bounded read of up to 512 bytes, 500 ms budget)
//!     → rules.rs (load one RuleSet snapshot)
//!     → detect.rs (method line | TLS handshake | header names, gated by snapshot)
//!     → (SniffVerdict, ReplayableConnection)
//! ```
//!
//! # Design Decisions
//! - Rules live behind an `ArcSwap`: readers never lock, updates replace the whole set
//! - A classification loads its snapshot once, so it never sees a mix of old and new rules
//! - Captured bytes are always handed back, whatever the verdict

pub mod detect;
pub mod probe;
pub mod rules;

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::io::AsyncRead;

use crate::config::SnifferConfig;
use crate::net::replay::{ReplayableConnection, MAX_PROBE_LEN};
use crate::observability::metrics;

pub use detect::Detection;
pub use rules::{Category, RuleSet};

/// Default time budget for capturing the probe.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Outcome of classifying one probe buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffVerdict {
    pub is_http_like: bool,
    /// The detector that fired, if any.
    pub detection: Option<Detection>,
}

impl SniffVerdict {
    fn from_detection(detection: Option<Detection>) -> Self {
        Self {
            is_http_like: detection.is_some(),
            detection,
        }
    }

    /// True when the verdict came from a TLS handshake record.
    pub fn is_tls(&self) -> bool {
        matches!(self.detection, Some(Detection::Handshake { .. }))
    }
}

/// Classifies fresh connections as HTTP-like or not.
#[derive(Debug)]
pub struct Sniffer {
    rules: ArcSwap<RuleSet>,
    read_timeout: Duration,
    probe_len: usize,
}

impl Sniffer {
    pub fn new(config: &SnifferConfig) -> Self {
        Self {
            rules: ArcSwap::from_pointee(config.rules.clone()),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            probe_len: config.probe_bytes.min(MAX_PROBE_LEN),
        }
    }

    /// Sniffer with default timings and the given rules.
    pub fn with_rules(rules: RuleSet) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            read_timeout: DEFAULT_READ_TIMEOUT,
            probe_len: MAX_PROBE_LEN,
        }
    }

    /// Capture the head of `conn`, classify it, and hand the bytes back
    /// wrapped so the next reader sees the unbroken stream.
    pub async fn classify<S>(&self, mut conn: S) -> (SniffVerdict, ReplayableConnection<S>)
    where
        S: AsyncRead + Unpin,
    {
        let probe = probe::capture(&mut conn, self.probe_len, self.read_timeout).await;
        let verdict = self.inspect(probe.as_bytes());
        (verdict, ReplayableConnection::new(conn, probe))
    }

    /// Classify already captured bytes against the current rule snapshot.
    pub fn inspect(&self, data: &[u8]) -> SniffVerdict {
        let rules = self.rules.load();
        let verdict = SniffVerdict::from_detection(detect::detect(data, &rules));

        if let Some(detection) = verdict.detection {
            tracing::warn!(
                detector = detection.detector(),
                signature = %detection,
                "HTTP-like traffic detected"
            );
        }
        metrics::record_sniff(&verdict);
        verdict
    }

    /// Atomically replace the active rule set.
    ///
    /// Classifications that already loaded a snapshot finish with it.
    pub fn update_rules(&self, rules: RuleSet) {
        tracing::info!(rules = ?rules.categories(), "Protocol filter rules updated");
        self.rules.store(Arc::new(rules));
    }

    /// The rule set new classifications will use.
    pub fn rules(&self) -> Arc<RuleSet> {
        self.rules.load_full()
    }
}

impl Default for Sniffer {
    fn default() -> Self {
        Self::with_rules(RuleSet::default())
    }
}
