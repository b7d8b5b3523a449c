use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::io::BufRead;

use crate::handler::{ErrorHandler, RecordData};

/// One line of a replayed run, tagged by `kind`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Validation {
        stage: String,
        parameter: String,
        #[serde(default, deserialize_with = "record_or_empty")]
        record: RecordData,
        #[serde(default)]
        notice: Option<String>,
    },
    Consistency {
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        stage: Option<String>,
        #[serde(default)]
        suffix: Option<String>,
    },
    Database {
        text: String,
    },
    Info {
        text: String,
    },
    Inserted {
        stage: String,
    },
    Updated {
        stage: String,
    },
    LabDb {
        stage: String,
        count: u64,
    },
    CenterDb {
        stage: String,
        count: u64,
    },
}

/// A `null` record is kept as an empty one so the error is still recorded
fn record_or_empty<'de, D>(deserializer: D) -> std::result::Result<RecordData, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RecordData>::deserialize(deserializer)?.unwrap_or_default())
}

impl Event {
    /// Feed this event to the matching ingestion method
    pub fn apply(&self, handler: &mut ErrorHandler) {
        match self {
            Event::Validation {
                stage,
                parameter,
                record,
                notice,
            } => handler.attach_validation_error(stage, parameter, record, notice.as_deref()),
            Event::Consistency {
                target,
                stage,
                suffix,
            } => handler.attach_consistency_error(
                target.as_deref(),
                stage.as_deref(),
                suffix.as_deref(),
            ),
            Event::Database { text } => handler.attach_db_error(text),
            Event::Info { text } => handler.info(text),
            Event::Inserted { stage } => handler.record_inserted(stage),
            Event::Updated { stage } => handler.record_updated(stage),
            Event::LabDb { stage, count } => handler.set_source_count(stage, *count),
            Event::CenterDb { stage, count } => handler.set_destination_count(stage, *count),
        }
    }
}

/// Outcome of replaying one input
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Apply every event in `reader` to `handler`.
///
/// Blank lines are ignored. A line that does not parse is skipped and noted in
/// the run log; only a failure to read the input is returned as an error.
pub fn replay<R: BufRead>(
    reader: R,
    source: &str,
    handler: &mut ErrorHandler,
) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", source))?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Event>(&line) {
            Ok(event) => {
                event.apply(handler);
                stats.applied += 1;
            }
            Err(e) => {
                tracing::warn!(source, line = index + 1, error = %e, "skipping malformed event");
                handler.error(&format!(
                    "Skipped malformed event at {}:{}: {}",
                    source,
                    index + 1,
                    e
                ));
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}
