//! Collaborator traits - the two delivery targets of the events client
//!
//! The client only ever asks a time-series store to "write one batch" and a
//! queue to "append one or more serialized records".

use serde::{Deserialize, Serialize};

use crate::{ContractError, FieldValue};

/// Columnar write request for the time-series store
///
/// Serializes to the series document accepted by the store:
/// `{"name": .., "columns": [..], "points": [[..], ..]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesBatch {
    /// Series / measurement name
    pub name: String,
    /// Shared column names, in row order
    pub columns: Vec<String>,
    /// One value tuple per event, aligned with `columns`
    pub points: Vec<Vec<FieldValue>>,
}

impl SeriesBatch {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Values of one column across all rows
    pub fn column(&self, name: &str) -> Option<Vec<&FieldValue>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.points.iter().filter_map(|row| row.get(idx)).collect())
    }
}

/// Time-series store capability
#[trait_variant::make(TimeSeriesWriter: Send)]
pub trait LocalTimeSeriesWriter {
    /// Writer name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one series batch in a single call
    ///
    /// # Errors
    /// Returns a sink error carrying the downstream cause
    async fn write_batch(&self, batch: &SeriesBatch) -> Result<(), ContractError>;
}

/// Queue capability
#[trait_variant::make(QueueWriter: Send)]
pub trait LocalQueueWriter {
    /// Writer name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Append serialized records to `key`, preserving order, in a single call
    ///
    /// # Errors
    /// Returns a sink error carrying the downstream cause
    async fn append_many(&self, key: &str, records: &[String]) -> Result<(), ContractError>;
}
