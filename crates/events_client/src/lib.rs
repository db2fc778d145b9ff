//! # Events Client
//!
//! Forwards application events to two independent telemetry sinks.
//!
//! Responsibilities:
//! - Normalize payloads (namespace, static fields, environment / host)
//! - Columnar series write to the time-series store
//! - Per-event JSON records appended to the queue
//! - Isolate sink failures from each other and from the caller
//!
//! # Example
//!
//! ```no_run
//! use events_client::{ClientConfig, DefaultEventsClient, Event};
//!
//! # async fn run() -> Result<(), events_client::ClientError> {
//! let config = ClientConfig::new("web-1", "prod").with_namespace("app_");
//! let client = DefaultEventsClient::connect(config).await?;
//!
//! client.send("login", Event::new().with("user", "alice")).await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod metrics;
pub mod mock;
pub mod normalize;
pub mod queue;
pub mod sinks;
pub mod timeseries;

pub use client::{DefaultEventsClient, EventsClient};
pub use contracts::{
    ClientConfig, ContractError, Event, EventBatch, FieldValue, QueueWriter, SeriesBatch,
    TimeSeriesWriter,
};
pub use error::ClientError;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use normalize::{normalize, normalize_event};
pub use queue::send_to_queue;
pub use sinks::{InfluxHttpWriter, InfluxUdpWriter, InfluxWriter, LogSink, RedisQueueWriter};
pub use timeseries::send_to_timeseries;
