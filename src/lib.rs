//! Error aggregation and run reporting for lab-to-center record migrations.
//!
//! A migration creates one [`handler::ErrorHandler`] per run, feeds it every
//! validation, consistency and database error it observes along with per-stage
//! record counts, and prints the rendered report when the run ends.

pub mod collection;
pub mod config;
pub mod counters;
pub mod events;
pub mod handler;
pub mod log_sink;
pub mod records;

pub use collection::ErrorCollection;
pub use counters::{DatabaseErrors, StageCount, StageCounters};
pub use handler::{ErrorHandler, RecordData};
pub use log_sink::{FileLogSink, LogLevel, LogSink};
pub use records::{ConsistencyError, ErrorRecord, ValidationError};
