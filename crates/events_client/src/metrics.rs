//! Per-sink delivery counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single sink adapter
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Batches accepted by the collaborator
    delivered_count: AtomicU64,
    /// Events contained in delivered batches
    event_count: AtomicU64,
    /// Batches lost to a collaborator failure
    failure_count: AtomicU64,
    /// Batches refused before delivery (schema mismatch)
    rejected_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    /// Record a delivered batch of `events` events
    pub fn record_delivered(&self, events: usize) {
        self.delivered_count.fetch_add(1, Ordering::Relaxed);
        self.event_count.fetch_add(events as u64, Ordering::Relaxed);
    }

    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    pub fn inc_rejected_count(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delivered_count: self.delivered_count(),
            event_count: self.event_count(),
            failure_count: self.failure_count(),
            rejected_count: self.rejected_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub delivered_count: u64,
    pub event_count: u64,
    pub failure_count: u64,
    pub rejected_count: u64,
}
