//! In-memory collaborators
//!
//! Record every call instead of reaching a backend. Used by the test suites
//! and handy for applications that want to assert on emitted events.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use contracts::{ContractError, QueueWriter, SeriesBatch, TimeSeriesWriter};

/// Time-series writer that remembers every batch, or fails on demand
#[derive(Default)]
pub struct RecordingTimeSeries {
    writes: Mutex<Vec<SeriesBatch>>,
    calls: AtomicUsize,
    should_fail: bool,
}

impl RecordingTimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<SeriesBatch> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl TimeSeriesWriter for RecordingTimeSeries {
    fn name(&self) -> &str {
        "recording_timeseries"
    }

    async fn write_batch(&self, batch: &SeriesBatch) -> Result<(), ContractError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.should_fail {
            return Err(ContractError::sink_write(self.name(), "mock failure"));
        }
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).push(batch.clone());
        Ok(())
    }
}

/// Queue writer that remembers every append, or fails on demand
#[derive(Default)]
pub struct RecordingQueue {
    appends: Mutex<Vec<(String, Vec<String>)>>,
    calls: AtomicUsize,
    should_fail: bool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn appends(&self) -> Vec<(String, Vec<String>)> {
        self.appends.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl QueueWriter for RecordingQueue {
    fn name(&self) -> &str {
        "recording_queue"
    }

    async fn append_many(&self, key: &str, records: &[String]) -> Result<(), ContractError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.should_fail {
            return Err(ContractError::sink_connection(self.name(), "connection refused"));
        }
        self.appends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), records.to_vec()));
        Ok(())
    }
}
