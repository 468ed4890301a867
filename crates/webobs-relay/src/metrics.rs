//! Relay metrics counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level counters, updated with relaxed atomics.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    sessions_opened: AtomicU64,
    sessions_closed: AtomicU64,
    messages_received: AtomicU64,
    messages_fanned_out: AtomicU64,
    messages_dropped: AtomicU64,
    listener_invocations: AtomicU64,
}

impl RelayMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an admitted session.
    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dismissed session.
    pub fn session_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame read from a session.
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a payload queued on a session's outbound channel.
    pub fn message_fanned_out(&self) {
        self.messages_fanned_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a payload dropped because a queue was full.
    pub fn message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one listener call.
    pub fn listener_invoked(&self) {
        self.listener_invocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let opened = self.sessions_opened.load(Ordering::Relaxed);
        let closed = self.sessions_closed.load(Ordering::Relaxed);
        MetricsSnapshot {
            sessions_opened: opened,
            sessions_closed: closed,
            sessions_active: opened.saturating_sub(closed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_fanned_out: self.messages_fanned_out.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            listener_invocations: self.listener_invocations.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Sessions ever admitted
    pub sessions_opened: u64,
    /// Sessions dismissed
    pub sessions_closed: u64,
    /// Sessions currently registered
    pub sessions_active: u64,
    /// Frames read from sessions
    pub messages_received: u64,
    /// Payloads queued to sessions by fan-out
    pub messages_fanned_out: u64,
    /// Payloads dropped on full queues
    pub messages_dropped: u64,
    /// Listener calls made by dispatch
    pub listener_invocations: u64,
}
