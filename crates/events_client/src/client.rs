//! EventsClient - dual-sink delivery with per-sink failure isolation

use tracing::{info, instrument, warn};

use contracts::{ClientConfig, ContractError, EventBatch, QueueWriter, TimeSeriesWriter};
use observability::{record_delivery, record_schema_mismatch, DeliveryOutcome};

use crate::error::ClientError;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::queue::send_to_queue;
use crate::sinks::{InfluxWriter, RedisQueueWriter};
use crate::timeseries::send_to_timeseries;

const TIMESERIES_SINK: &str = "timeseries";
const QUEUE_SINK: &str = "queue";

/// Client wired to the InfluxDB and Redis collaborators
pub type DefaultEventsClient = EventsClient<InfluxWriter, RedisQueueWriter>;

/// Forwards events to a time-series store and a queue
///
/// `send` never fails: each sink runs inside its own failure boundary and a
/// failure is demoted to a warning log line.
pub struct EventsClient<T, Q> {
    config: ClientConfig,
    time_series: T,
    queue: Q,
    time_series_metrics: SinkMetrics,
    queue_metrics: SinkMetrics,
}

impl DefaultEventsClient {
    /// Validate `config` and create both collaborators from it
    ///
    /// # Errors
    /// - `Configuration` for missing or invalid parameters
    /// - `SinkCreation` if a collaborator cannot be set up
    #[instrument(name = "events_client_connect", skip(config), fields(host = %config.host_name, environment = %config.environment))]
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        config.check()?;

        let time_series = InfluxWriter::from_config(&config.time_series)
            .await
            .map_err(|e| ClientError::sink_creation(TIMESERIES_SINK, e.to_string()))?;
        let queue = RedisQueueWriter::new(&config.queue);

        Self::new(config, time_series, queue)
    }
}

impl<T, Q> EventsClient<T, Q>
where
    T: TimeSeriesWriter,
    Q: QueueWriter,
{
    /// Create a client around existing collaborators
    ///
    /// # Errors
    /// Returns `Configuration` if `config` is invalid
    pub fn new(config: ClientConfig, time_series: T, queue: Q) -> Result<Self, ClientError> {
        config.check()?;

        info!(
            host = %config.host_name,
            environment = %config.environment,
            time_series = time_series.name(),
            queue = queue.name(),
            "EventsClient ready"
        );

        Ok(Self {
            config,
            time_series,
            queue,
            time_series_metrics: SinkMetrics::new(),
            queue_metrics: SinkMetrics::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn time_series(&self) -> &T {
        &self.time_series
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Delivery counters per sink
    pub fn metrics(&self) -> Vec<(&'static str, MetricsSnapshot)> {
        vec![
            (TIMESERIES_SINK, self.time_series_metrics.snapshot()),
            (QUEUE_SINK, self.queue_metrics.snapshot()),
        ]
    }

    /// Deliver `payload` to both sinks, best effort
    ///
    /// Accepts a single `Event` or a batch. The time-series sink is tried
    /// first, then the queue; neither outcome affects the other.
    #[instrument(name = "events_client_send", skip(self, payload))]
    pub async fn send(&self, event_name: &str, payload: impl Into<EventBatch>) {
        let batch = payload.into();
        self.deliver_to_timeseries(event_name, &batch).await;
        self.deliver_to_queue(event_name, &batch).await;
    }

    async fn deliver_to_timeseries(&self, event_name: &str, batch: &EventBatch) {
        match send_to_timeseries(&self.time_series, event_name, batch, &self.config).await {
            Ok(rows) => {
                self.time_series_metrics.record_delivered(rows);
                record_delivery(TIMESERIES_SINK, DeliveryOutcome::Delivered, rows);
            }
            Err(e @ ContractError::SchemaMismatch { .. }) => {
                self.time_series_metrics.inc_rejected_count();
                record_delivery(TIMESERIES_SINK, DeliveryOutcome::Rejected, batch.len());
                record_schema_mismatch(&self.config.format_event_name(event_name));
                warn!(
                    sink = TIMESERIES_SINK,
                    event_name,
                    events = %batch,
                    error = %e,
                    "Could not send events to time-series store"
                );
            }
            Err(e) => {
                self.time_series_metrics.inc_failure_count();
                record_delivery(TIMESERIES_SINK, DeliveryOutcome::Failed, batch.len());
                warn!(
                    sink = TIMESERIES_SINK,
                    event_name,
                    events = %batch,
                    error = %e,
                    "Could not send events to time-series store"
                );
            }
        }
    }

    async fn deliver_to_queue(&self, event_name: &str, batch: &EventBatch) {
        match send_to_queue(&self.queue, event_name, batch, &self.config).await {
            Ok(records) => {
                self.queue_metrics.record_delivered(records);
                record_delivery(QUEUE_SINK, DeliveryOutcome::Delivered, records);
            }
            Err(e) => {
                self.queue_metrics.inc_failure_count();
                record_delivery(QUEUE_SINK, DeliveryOutcome::Failed, batch.len());
                warn!(
                    sink = QUEUE_SINK,
                    event_name,
                    events = %batch,
                    error = %e,
                    "Could not send events to queue"
                );
            }
        }
    }
}
