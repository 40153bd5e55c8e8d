//! Per-connection identity and live connection accounting.
//!
//! # Responsibilities
//! - Generate connection IDs for tracing
//! - Count live connections for the admin status endpoint
//! - Release the count automatically when a connection task ends

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier of one accepted connection, unique per tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Counters {
    next_id: AtomicU64,
    active: AtomicU64,
    total: AtomicU64,
}

/// Shared accounting of connections handled by the edge.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    counters: Arc<Counters>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. The count drops again when the guard does.
    pub fn track(&self) -> ConnectionGuard {
        // Relaxed is enough for ids: only uniqueness matters.
        let id = ConnectionId(self.counters.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.counters.active.fetch_add(1, Ordering::SeqCst);
        self.counters.total.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            counters: Arc::clone(&self.counters),
            id,
        }
    }

    pub fn active_count(&self) -> u64 {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Connections accepted since startup.
    pub fn total_count(&self) -> u64 {
        self.counters.total.load(Ordering::Relaxed)
    }
}

/// Held by a connection task for its whole lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    counters: Arc<Counters>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_per_tracker() {
        let tracker = ConnectionTracker::new();
        let a = tracker.track();
        let b = tracker.track();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().to_string(), "conn-1");
    }

    #[test]
    fn counts_follow_guards() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let first = tracker.track();
        let second = tracker.track();
        assert_eq!(tracker.active_count(), 2);

        drop(first);
        assert_eq!(tracker.active_count(), 1);
        drop(second);
        assert_eq!(tracker.active_count(), 0);
        assert_eq!(tracker.total_count(), 2);
    }
}
