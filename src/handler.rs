use anyhow::Result;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt::Write;
use std::path::Path;

use crate::collection::ErrorCollection;
use crate::counters::{DatabaseErrors, StageCounters};
use crate::log_sink::{FileLogSink, LogLevel, LogSink};
use crate::records::{ConsistencyError, ValidationError};

/// Target recorded for validation errors raised by the protocol stage
pub const PROTOCOL_TARGET: &str = "Protocol";

/// The record a validation error was raised on.
///
/// Only the target is a known column; everything else stays available for the
/// `<stage>_id` and parameter lookups. A JSON `null` is treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordData {
    #[serde(default, deserialize_with = "scalar_text")]
    pub protein_target_id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RecordData {
    /// Empty record: every lookup is absent
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the protein target the record belongs to
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.protein_target_id = Some(target.into());
        self
    }

    /// Add one column of the source row
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Text of a field, or `None` when missing or null
    pub fn field(&self, name: &str) -> Option<String> {
        if name == "protein_target_id" {
            return self.protein_target_id.clone();
        }
        self.fields.get(name).and_then(text_of)
    }

    /// Natural key of the record within `stage`
    pub fn suffix(&self, stage: &str) -> Option<String> {
        self.field(&format!("{}_id", stage))
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn scalar_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_of(&value))
}

/// Collects every error of a migration run and renders the final report.
///
/// One handler is created at the start of a run and handed by reference to
/// whatever needs to report. Ingestion never fails: incomplete input is
/// recorded with absent fields and a failing log write is only traced.
/// Concurrent use wraps the whole handler in a single `Mutex`; the handler is
/// `Send` because every [`LogSink`] is.
pub struct ErrorHandler {
    validation_errors: ErrorCollection<ValidationError>,
    consistency_errors: ErrorCollection<ConsistencyError>,
    database_errors: DatabaseErrors,
    counters: StageCounters,
    log: Box<dyn LogSink>,
}

impl ErrorHandler {
    /// Open today's log file for `center_name` under `log_folder`
    pub fn open(log_folder: &Path, center_name: &str) -> Result<Self> {
        let sink = FileLogSink::open(log_folder, center_name)?;
        Ok(Self::with_sink(Box::new(sink)))
    }

    /// Build a handler around an already opened log and write the init marker
    pub fn with_sink(log: Box<dyn LogSink>) -> Self {
        let mut handler = Self {
            validation_errors: ErrorCollection::new(),
            consistency_errors: ErrorCollection::new(),
            database_errors: DatabaseErrors::new(),
            counters: StageCounters::new(),
            log,
        };
        handler.write_log(LogLevel::Info, "Logger initiated.");
        handler
    }

    fn write_log(&mut self, level: LogLevel, text: &str) {
        if let Err(e) = self.log.write(level, text) {
            tracing::warn!(error = %e, "failed to write run log");
        }
    }

    /// Append a line to the run log without recording an error
    pub fn info(&mut self, text: &str) {
        self.write_log(LogLevel::Info, text);
    }

    /// Log a problem that is not part of any error collection
    pub fn error(&mut self, text: &str) {
        self.write_log(LogLevel::Error, text);
    }

    /// Log a database failure and count it by its text
    pub fn attach_db_error(&mut self, text: &str) {
        self.write_log(LogLevel::Info, text);
        self.database_errors.record(text);
    }

    /// Record a row expected in the center database that was not found
    pub fn attach_consistency_error(
        &mut self,
        target: Option<&str>,
        stage: Option<&str>,
        suffix: Option<&str>,
    ) {
        self.consistency_errors.append(ConsistencyError::new(
            target.map(String::from),
            stage.map(String::from),
            suffix.map(String::from),
        ));
    }

    /// Record an invalid field of `record`; missing lookups stay absent
    pub fn attach_validation_error(
        &mut self,
        stage: &str,
        parameter: &str,
        record: &RecordData,
        notice: Option<&str>,
    ) {
        let target = record
            .protein_target_id
            .clone()
            .or_else(|| (stage == "protocol").then(|| PROTOCOL_TARGET.to_string()));

        tracing::trace!(stage, parameter, ?target, "validation error");

        self.validation_errors.append(ValidationError::new(
            target,
            stage,
            record.suffix(stage),
            parameter,
            record.field(parameter),
            notice.map(String::from),
        ));
    }

    /// Count one row inserted into the center database
    pub fn record_inserted(&mut self, stage: &str) {
        self.counters.record_inserted(stage);
    }

    /// Count one row updated in the center database
    pub fn record_updated(&mut self, stage: &str) {
        self.counters.record_updated(stage);
    }

    /// Set how many rows the stage holds in the lab database
    pub fn set_source_count(&mut self, stage: &str, value: u64) {
        self.counters.set_source_count(stage, value);
    }

    /// Set how many rows the stage holds in the center database
    pub fn set_destination_count(&mut self, stage: &str, value: u64) {
        self.counters.set_destination_count(stage, value);
    }

    /// Validation errors collected so far
    pub fn validation_errors(&self) -> &ErrorCollection<ValidationError> {
        &self.validation_errors
    }

    /// Consistency errors collected so far
    pub fn consistency_errors(&self) -> &ErrorCollection<ConsistencyError> {
        &self.consistency_errors
    }

    /// Database errors counted by their text
    pub fn database_errors(&self) -> &DatabaseErrors {
        &self.database_errors
    }

    /// Per-stage record counts
    pub fn counters(&self) -> &StageCounters {
        &self.counters
    }

    /// Validation errors plus distinct database errors plus consistency errors
    pub fn error_count(&self) -> usize {
        self.validation_errors.error_count()
            + self.consistency_errors.error_count()
            + self.database_errors.error_count()
    }

    /// Check if any error of any kind was collected
    pub fn has_errors(&self) -> bool {
        self.validation_errors.has_errors()
            || self.consistency_errors.has_errors()
            || self.database_errors.has_errors()
    }

    /// Every validation error grouped by target and stage
    pub fn validation_report(&self) -> String {
        self.validation_errors.render_full_report()
    }

    /// Every consistency error grouped by target and stage
    pub fn consistency_report(&self) -> String {
        self.consistency_errors.render_full_report()
    }

    /// Each database error with the number of records it hit
    pub fn database_report(&self) -> String {
        self.database_errors.render_report()
    }

    /// Validation error counts per target and stage
    pub fn validation_count_by_target(&self) -> String {
        self.validation_errors.render_count_by_target()
    }

    /// Validation error counts per stage
    pub fn validation_count_summary(&self) -> String {
        self.validation_errors.render_count_summary()
    }

    /// Consistency error counts per target and stage
    pub fn consistency_count_by_target(&self) -> String {
        self.consistency_errors.render_count_by_target()
    }

    /// Consistency error counts per stage
    pub fn consistency_count_summary(&self) -> String {
        self.consistency_errors.render_count_summary()
    }

    /// Number of distinct database errors
    pub fn database_count_summary(&self) -> String {
        self.database_errors.render_count_summary()
    }

    /// Record counts of every stage seen during the run
    pub fn counters_report(&self) -> String {
        self.counters.render_report()
    }

    /// Counts only: one section per error kind and the stage counters
    pub fn render_summary(&self) -> String {
        let mut report = String::new();
        section(&mut report, "Validation errors", &self.validation_count_summary());
        section(&mut report, "Consistency errors", &self.consistency_count_summary());
        section(&mut report, "Database errors", &self.database_count_summary());
        section(&mut report, "Record counts", &self.counters_report());
        report
    }

    /// Everything collected during the run, the way it is printed at the end
    pub fn render_run_report(&self) -> String {
        let mut report = String::new();
        section(&mut report, "Validation errors", &self.validation_count_by_target());
        section(&mut report, "Validation error details", &self.validation_report());
        section(&mut report, "Consistency errors", &self.consistency_count_by_target());
        section(&mut report, "Consistency error details", &self.consistency_report());
        section(&mut report, "Database errors", &self.database_count_summary());
        section(&mut report, "Database error details", &self.database_report());
        section(&mut report, "Record counts", &self.counters_report());
        report
    }
}

fn section(report: &mut String, title: &str, body: &str) {
    if !report.is_empty() {
        report.push('\n');
    }
    let _ = writeln!(report, "{}\n{}", title, "=".repeat(title.len()));
    report.push_str(body);
}
