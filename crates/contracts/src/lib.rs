//! # Contracts
//!
//! Shared interface contracts of the events client.
//! Every other crate in the workspace depends on this one, never the reverse.
//!
//! ## Data Model
//! - `Event`: flat, insertion-ordered field map
//! - `EventBatch`: events of one `send` call
//! - `ClientConfig`: immutable construction parameters
//! - `TimeSeriesWriter` / `QueueWriter`: the two delivery collaborators

mod config;
mod error;
mod event;
mod sink;

pub use config::*;
pub use error::*;
pub use event::*;
pub use sink::*;
