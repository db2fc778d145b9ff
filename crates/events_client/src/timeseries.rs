//! Time-series sink adapter
//!
//! Turns a batch into one columnar series write. All events of the batch
//! must share the same key set; the batch is refused otherwise.

use chrono::Utc;
use tracing::{debug, instrument};

use contracts::{ClientConfig, ContractError, Event, EventBatch, SeriesBatch, TimeSeriesWriter};

use crate::normalize::normalize;

/// Field carrying the point timestamp (ms since epoch, UTC)
pub const TIME_FIELD: &str = "time";

/// Normalize, validate and write `batch` as one series
///
/// Returns the number of rows written. An empty batch writes nothing.
///
/// # Errors
/// - `SchemaMismatch` if the events do not share one key set (nothing written)
/// - any error returned by the writer
#[instrument(
    name = "timeseries_send",
    skip(writer, batch, config),
    fields(sink = writer.name(), events = batch.len())
)]
pub async fn send_to_timeseries<W: TimeSeriesWriter>(
    writer: &W,
    event_name: &str,
    batch: &EventBatch,
    config: &ClientConfig,
) -> Result<usize, ContractError> {
    if batch.is_empty() {
        return Ok(0);
    }

    let timestamp_ms = Utc::now().timestamp_millis();
    let series = build_series(event_name, batch, config, timestamp_ms)?;

    writer.write_batch(&series).await?;
    debug!(series = %series.name, rows = series.len(), "Series written");
    Ok(series.len())
}

/// Build the columnar write request for `batch`
///
/// `timestamp_ms` is shared by every event that carries no `time` field.
pub fn build_series(
    event_name: &str,
    batch: &EventBatch,
    config: &ClientConfig,
    timestamp_ms: i64,
) -> Result<SeriesBatch, ContractError> {
    let normalized = normalize(batch, config);
    check_schema(&normalized)?;

    let events: Vec<Event> = normalized
        .into_iter()
        .map(|mut event| {
            event.insert_if_absent(TIME_FIELD, timestamp_ms);
            event
        })
        .collect();

    let columns: Vec<String> = events
        .first()
        .map(|event| event.keys().map(str::to_string).collect())
        .unwrap_or_default();

    let points = events
        .iter()
        .enumerate()
        .map(|(index, event)| row(event, &columns).ok_or_else(|| mismatch(index, &columns, event)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SeriesBatch {
        name: config.format_event_name(event_name),
        columns,
        points,
    })
}

/// Every event must carry exactly the key set of the first one
fn check_schema(batch: &EventBatch) -> Result<(), ContractError> {
    let Some(first) = batch.events().first() else {
        return Ok(());
    };

    for (index, event) in batch.iter().enumerate().skip(1) {
        if !event.same_keys(first) {
            let expected: Vec<String> = first.keys().map(str::to_string).collect();
            return Err(mismatch(index, &expected, event));
        }
    }
    Ok(())
}

fn row(event: &Event, columns: &[String]) -> Option<Vec<contracts::FieldValue>> {
    columns.iter().map(|c| event.get(c).cloned()).collect()
}

fn mismatch(index: usize, expected: &[String], event: &Event) -> ContractError {
    ContractError::SchemaMismatch {
        index,
        expected: expected.to_vec(),
        found: event.keys().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingTimeSeries;
    use contracts::FieldValue;

    fn config() -> ClientConfig {
        ClientConfig::new("h1", "prod")
    }

    #[test]
    fn test_single_event_series() {
        let batch = EventBatch::from(Event::new().with("user", "a"));
        let series = build_series("login", &batch, &config(), 1_700_000_000_123).unwrap();

        assert_eq!(series.name, "login");
        assert_eq!(series.columns, vec!["user", "environment", "host", "time"]);
        assert_eq!(
            series.points,
            vec![vec![
                FieldValue::from("a"),
                FieldValue::from("prod"),
                FieldValue::from("h1"),
                FieldValue::Integer(1_700_000_000_123),
            ]]
        );
    }

    #[test]
    fn test_rows_follow_column_order() {
        let batch = EventBatch::from(vec![
            Event::new().with("a", 1).with("b", 2),
            Event::new().with("b", 20).with("a", 10),
        ]);
        let series = build_series("s", &batch, &config(), 5).unwrap();

        assert_eq!(series.columns[..2], ["a".to_string(), "b".to_string()]);
        assert_eq!(series.points[1][0], FieldValue::Integer(10));
        assert_eq!(series.points[1][1], FieldValue::Integer(20));
    }

    #[test]
    fn test_one_shared_timestamp_per_batch() {
        let batch = EventBatch::from(vec![
            Event::new().with("user", "a"),
            Event::new().with("user", "b"),
            Event::new().with("user", "c"),
        ]);
        let series = build_series("login", &batch, &config(), 42).unwrap();

        let times = series.column(TIME_FIELD).unwrap();
        assert_eq!(times.len(), 3);
        assert!(times.iter().all(|t| **t == FieldValue::Integer(42)));
    }

    #[test]
    fn test_caller_time_is_kept() {
        let batch = EventBatch::from(Event::new().with("user", "a").with("time", 7));
        let series = build_series("login", &batch, &config(), 42).unwrap();
        assert_eq!(
            series.column(TIME_FIELD).unwrap(),
            vec![&FieldValue::Integer(7)]
        );
        assert_eq!(series.columns, vec!["user", "time", "environment", "host"]);
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let batch = EventBatch::from(vec![
            Event::new().with("user", "a"),
            Event::new().with("user", "b").with("extra", 1),
        ]);
        let err = build_series("login", &batch, &config(), 42).unwrap_err();

        assert!(matches!(err, ContractError::SchemaMismatch { index: 1, .. }));
        assert!(err.to_string().contains("Events have to have the same structure"));
    }

    #[test]
    fn test_event_name_template_applied() {
        let config = config().with_event_name_format("app.{}");
        let batch = EventBatch::from(Event::new().with("user", "a"));
        let series = build_series("login", &batch, &config, 1).unwrap();
        assert_eq!(series.name, "app.login");
    }

    #[tokio::test]
    async fn test_send_writes_one_batch() {
        let writer = RecordingTimeSeries::new();
        let batch = EventBatch::from(vec![
            Event::new().with("user", "a"),
            Event::new().with("user", "b"),
        ]);

        let rows = send_to_timeseries(&writer, "login", &batch, &config())
            .await
            .unwrap();

        assert_eq!(rows, 2);
        let writes = writer.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].len(), 2);
    }

    #[tokio::test]
    async fn test_send_mismatch_writes_nothing() {
        let writer = RecordingTimeSeries::new();
        let batch = EventBatch::from(vec![
            Event::new().with("user", "a"),
            Event::new().with("other", "b"),
        ]);

        let result = send_to_timeseries(&writer, "login", &batch, &config()).await;

        assert!(matches!(result, Err(ContractError::SchemaMismatch { .. })));
        assert!(writer.writes().is_empty());
    }

    #[tokio::test]
    async fn test_send_empty_batch_is_noop() {
        let writer = RecordingTimeSeries::new();
        let rows = send_to_timeseries(&writer, "login", &EventBatch::default(), &config())
            .await
            .unwrap();
        assert_eq!(rows, 0);
        assert!(writer.writes().is_empty());
    }

    #[tokio::test]
    async fn test_send_propagates_writer_failure() {
        let writer = RecordingTimeSeries::failing();
        let batch = EventBatch::from(Event::new().with("user", "a"));
        let result = send_to_timeseries(&writer, "login", &batch, &config()).await;
        assert!(matches!(result, Err(ContractError::SinkWrite { .. })));
    }
}
