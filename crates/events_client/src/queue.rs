//! Queue sink adapter
//!
//! Every event is serialized on its own and the records are appended to the
//! queue in one call, batch order preserved.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use contracts::{ClientConfig, ContractError, EventBatch, QueueWriter};

use crate::normalize::normalize;

/// Field carrying the record timestamp
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Field carrying the (formatted) event name
pub const EVENT_NAME_FIELD: &str = "eventName";

/// Normalize, serialize and append `batch` to the configured queue key
///
/// Returns the number of records appended. An empty batch appends nothing.
///
/// # Errors
/// Any serialization or writer error
#[instrument(
    name = "queue_send",
    skip(writer, batch, config),
    fields(sink = writer.name(), events = batch.len(), key = %config.queue.key)
)]
pub async fn send_to_queue<W: QueueWriter>(
    writer: &W,
    event_name: &str,
    batch: &EventBatch,
    config: &ClientConfig,
) -> Result<usize, ContractError> {
    if batch.is_empty() {
        return Ok(0);
    }

    let timestamp = format_timestamp(Utc::now());
    let records = build_records(event_name, batch, config, &timestamp)?;

    writer.append_many(&config.queue.key, &records).await?;
    debug!(records = records.len(), "Records appended");
    Ok(records.len())
}

/// Serialize each normalized event into one JSON record
///
/// `timestamp` fills `@timestamp` where absent; `eventName` is always set.
pub fn build_records(
    event_name: &str,
    batch: &EventBatch,
    config: &ClientConfig,
    timestamp: &str,
) -> Result<Vec<String>, ContractError> {
    let event_name = config.format_event_name(event_name);

    normalize(batch, config)
        .into_iter()
        .map(|mut event| {
            event.insert_if_absent(TIMESTAMP_FIELD, timestamp);
            event.insert(EVENT_NAME_FIELD, event_name.as_str());
            serde_json::to_string(&event).map_err(ContractError::from)
        })
        .collect()
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`, milliseconds truncated
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
