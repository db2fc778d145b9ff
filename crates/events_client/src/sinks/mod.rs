//! Collaborator implementations
//!
//! InfluxDB (HTTP / UDP) for series, Redis for the queue, LogSink for both.

mod influx;
mod log;
mod redis;

pub use self::influx::{InfluxHttpWriter, InfluxUdpWriter, InfluxWriter};
pub use self::log::LogSink;
pub use self::redis::{encode_command, read_reply, RedisQueueWriter, Reply};
