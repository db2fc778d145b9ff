//! Delivery metrics
//!
//! Counters emitted through the `metrics` facade after every sink attempt.
//! Whatever recorder the application installed (Prometheus via `init`, or
//! none at all) receives them.

use metrics::counter;

/// Outcome of one sink delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Collaborator accepted the batch
    Delivered,
    /// Batch rejected before reaching the collaborator
    Rejected,
    /// Collaborator call failed
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Record one delivery attempt for `sink` carrying `events` events
///
/// # Example
///
/// ```ignore
/// use observability::metrics::{record_delivery, DeliveryOutcome};
///
/// record_delivery("timeseries", DeliveryOutcome::Delivered, batch.len());
/// ```
pub fn record_delivery(sink: &'static str, outcome: DeliveryOutcome, events: usize) {
    counter!(
        "wildcard_events_deliveries_total",
        "sink" => sink,
        "outcome" => outcome.as_str()
    )
    .increment(1);

    if outcome == DeliveryOutcome::Delivered {
        counter!("wildcard_events_events_total", "sink" => sink).increment(events as u64);
    }
}

/// Record a batch dropped by the time-series schema check
pub fn record_schema_mismatch(series: &str) {
    counter!(
        "wildcard_events_schema_mismatch_total",
        "series" => series.to_string()
    )
    .increment(1);
}
