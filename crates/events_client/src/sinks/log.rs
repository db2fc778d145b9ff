//! LogSink - logs what would have been delivered

use contracts::{ContractError, QueueWriter, SeriesBatch, TimeSeriesWriter};
use tracing::{info, instrument};

/// Collaborator for environments without backends
///
/// Implements both delivery traits by logging a summary via tracing.
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TimeSeriesWriter for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_write_batch", skip(self, batch), fields(sink = %self.name))]
    async fn write_batch(&self, batch: &SeriesBatch) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            series = %batch.name,
            columns = ?batch.columns,
            rows = batch.len(),
            "Series batch"
        );
        Ok(())
    }
}

impl QueueWriter for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_append_many", skip(self, records), fields(sink = %self.name))]
    async fn append_many(&self, key: &str, records: &[String]) -> Result<(), ContractError> {
        for record in records {
            info!(sink = %self.name, key, %record, "Queue record");
        }
        Ok(())
    }
}
