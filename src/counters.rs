use std::collections::BTreeMap;
use std::fmt::Write;

/// Counts database errors by their raw text.
///
/// The text is not normalized, so two messages for the same failure that differ
/// in a query parameter are counted separately.
#[derive(Debug, Clone, Default)]
pub struct DatabaseErrors {
    counts: BTreeMap<String, u64>,
}

impl DatabaseErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `signature`
    pub fn record(&mut self, signature: &str) {
        *self.counts.entry(signature.to_string()).or_insert(0) += 1;
    }

    /// Occurrences of `signature`, zero when never seen
    pub fn count(&self, signature: &str) -> u64 {
        self.counts.get(signature).copied().unwrap_or(0)
    }

    /// Number of distinct signatures
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct database errors, matching the count summary
    pub fn error_count(&self) -> usize {
        self.counts.len()
    }

    /// Check if any database error was recorded
    pub fn has_errors(&self) -> bool {
        !self.counts.is_empty()
    }

    /// Each signature with the number of records it occurred in
    pub fn render_report(&self) -> String {
        if self.counts.is_empty() {
            return "There were no database errors during this run.\n".to_string();
        }

        let mut message = String::from("Following database errors occurred during the run:\n");
        for (signature, count) in &self.counts {
            let _ = writeln!(message, "In {} record(s):\n{}", count, signature);
        }
        message
    }

    /// Counts distinct signatures, not occurrences
    pub fn render_count_summary(&self) -> String {
        format!("{} error(s) occurred during run.\n", self.counts.len())
    }
}

/// Record counts observed for one stage. `None` means never observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCount {
    pub lab_db: Option<u64>,
    pub center_db: Option<u64>,
    pub inserted: Option<u64>,
    pub updated: Option<u64>,
}

impl StageCount {
    fn entries(&self) -> impl Iterator<Item = (&'static str, u64)> {
        [
            ("lab_db", self.lab_db),
            ("center_db", self.center_db),
            ("inserted", self.inserted),
            ("updated", self.updated),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

/// Per-stage record tallies. A stage bucket is created on first use.
#[derive(Debug, Clone, Default)]
pub struct StageCounters {
    stages: BTreeMap<String, StageCount>,
}

impl StageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket for `stage`, created on first use
    fn stage_mut(&mut self, stage: &str) -> &mut StageCount {
        self.stages.entry(stage.to_string()).or_default()
    }

    /// Count one inserted row
    pub fn record_inserted(&mut self, stage: &str) {
        *self.stage_mut(stage).inserted.get_or_insert(0) += 1;
    }

    /// Count one updated row
    pub fn record_updated(&mut self, stage: &str) {
        *self.stage_mut(stage).updated.get_or_insert(0) += 1;
    }

    /// Number of records the stage holds in the lab database
    pub fn set_source_count(&mut self, stage: &str, value: u64) {
        self.stage_mut(stage).lab_db = Some(value);
    }

    /// Number of records the stage holds in the center database
    pub fn set_destination_count(&mut self, stage: &str, value: u64) {
        self.stage_mut(stage).center_db = Some(value);
    }

    /// Counts of one stage, `None` when the stage was never seen
    pub fn get(&self, stage: &str) -> Option<&StageCount> {
        self.stages.get(stage)
    }

    /// Every stage followed by the counts observed for it
    pub fn render_report(&self) -> String {
        if self.stages.is_empty() {
            return "No records were counted during this run.\n".to_string();
        }

        let mut message = String::new();
        for (stage, count) in &self.stages {
            let _ = writeln!(message, "{}:", stage);
            for (name, value) in count.entries() {
                let _ = writeln!(message, "\t{} records: {}", name, value);
            }
        }
        message
    }
}
