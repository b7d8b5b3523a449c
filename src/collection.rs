use std::collections::BTreeMap;
use std::fmt::Write;

use crate::records::{ErrorRecord, ABSENT};

/// Records of one bucket, keyed by stage
pub type StageGroups<'a, R> = BTreeMap<Option<&'a str>, Vec<&'a R>>;

/// Stage buckets keyed by target
pub type TargetGroups<'a, R> = BTreeMap<Option<&'a str>, StageGroups<'a, R>>;

/// Collects errors of one kind during a run and renders the end-of-run reports.
///
/// Absent targets and stages are grouped under `None`, which sorts before any
/// concrete name and renders as `None`. Within a bucket records keep the order
/// they were appended in.
#[derive(Debug, Clone)]
pub struct ErrorCollection<R> {
    errors: Vec<R>,
}

impl<R: ErrorRecord> ErrorCollection<R> {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error; nothing is ever removed
    pub fn append(&mut self, error: R) {
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of errors collected so far
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Check if any errors were collected
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Errors in the order they were appended
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.errors.iter()
    }

    /// Group by target, then by stage inside each target
    pub fn group_by_target_then_stage(&self) -> TargetGroups<'_, R> {
        let mut groups: TargetGroups<'_, R> = BTreeMap::new();
        for error in &self.errors {
            groups
                .entry(error.target())
                .or_default()
                .entry(error.stage())
                .or_default()
                .push(error);
        }
        groups
    }

    /// Group by stage only
    pub fn group_by_stage(&self) -> StageGroups<'_, R> {
        let mut groups: StageGroups<'_, R> = BTreeMap::new();
        for error in &self.errors {
            groups.entry(error.stage()).or_default().push(error);
        }
        groups
    }

    /// Every error, under a header per target and a count per stage
    pub fn render_full_report(&self) -> String {
        if self.errors.is_empty() {
            return "There were no errors during this run.\n".to_string();
        }

        let mut message = String::new();
        for (target, stages) in self.group_by_target_then_stage() {
            let _ = writeln!(message, "Target: {}", label(target));
            for (stage, items) in stages {
                let _ = writeln!(
                    message,
                    "\tStage: {}\t({} error(s)).",
                    label(stage),
                    items.len()
                );
                for item in items {
                    let _ = writeln!(message, "\t\t{}", item);
                }
            }
        }
        message
    }

    /// Grand total followed by one count per stage
    pub fn render_count_summary(&self) -> String {
        let mut details = String::new();
        let mut grand_total = 0;
        for (stage, items) in self.group_by_stage() {
            let _ = writeln!(details, "\t{} in {}", items.len(), label(stage));
            grand_total += items.len();
        }
        format!(
            "{} error(s) occurred during this run.\n{}",
            grand_total, details
        )
    }

    /// Per-target totals with a per-stage breakdown, closed by the grand total
    pub fn render_count_by_target(&self) -> String {
        let mut message = String::new();
        let mut grand_total = 0;
        for (target, stages) in self.group_by_target_then_stage() {
            let total: usize = stages.values().map(Vec::len).sum();
            let _ = writeln!(message, "Target: {}\t({} error(s))", label(target), total);
            for (stage, items) in stages {
                let _ = writeln!(message, "\t{} in {}", items.len(), label(stage));
            }
            grand_total += total;
        }
        let _ = writeln!(message, "{} error(s) occurred during this run.", grand_total);
        message
    }
}

impl<R: ErrorRecord> Default for ErrorCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn label(key: Option<&str>) -> &str {
    key.unwrap_or(ABSENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ConsistencyError, ValidationError};

    fn verror(target: Option<&str>, stage: &str, suffix: &str) -> ValidationError {
        ValidationError::new(
            target.map(String::from),
            stage,
            Some(suffix.to_string()),
            "protocol_id",
            Some("uva_cloning_1".to_string()),
            Some("Protocol is gone".to_string()),
        )
    }

    fn sample() -> ErrorCollection<ValidationError> {
        let mut errors = ErrorCollection::new();
        errors.append(verror(Some("490007"), "expression", "E1"));
        errors.append(verror(Some("490006"), "clone", "C1"));
        errors.append(verror(None, "clone", "C2"));
        errors.append(verror(Some("490007"), "clone", "C3"));
        errors.append(verror(Some("490007"), "expression", "E2"));
        errors
    }

    #[test]
    fn groups_sort_absent_target_first() {
        let errors = sample();
        let groups = errors.group_by_target_then_stage();
        let targets: Vec<_> = groups.keys().copied().collect();
        assert_eq!(targets, vec![None, Some("490006"), Some("490007")]);

        let stages: Vec<_> = groups[&Some("490007")].keys().copied().collect();
        assert_eq!(stages, vec![Some("clone"), Some("expression")]);
    }

    #[test]
    fn grouping_keeps_every_record_once() {
        let errors = sample();
        let grouped: usize = errors
            .group_by_target_then_stage()
            .values()
            .flat_map(|stages| stages.values())
            .map(Vec::len)
            .sum();
        assert_eq!(grouped, errors.len());
        assert_eq!(errors.error_count(), 5);
        assert!(errors.has_errors());

        let by_stage = errors.group_by_stage();
        assert_eq!(by_stage[&Some("clone")].len(), 3);
        assert_eq!(by_stage[&Some("expression")].len(), 2);
    }

    #[test]
    fn bucket_keeps_insertion_order() {
        let errors = sample();
        let groups = errors.group_by_target_then_stage();
        let suffixes: Vec<_> = groups[&Some("490007")][&Some("expression")]
            .iter()
            .map(|e| e.suffix.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(suffixes, vec!["E1", "E2"]);
    }

    #[test]
    fn grouping_ignores_ingestion_order() {
        let forward = sample();
        let mut reversed = ErrorCollection::new();
        for error in forward.iter().rev() {
            reversed.append(error.clone());
        }

        let a = forward.group_by_target_then_stage();
        let b = reversed.group_by_target_then_stage();
        assert_eq!(
            a.keys().collect::<Vec<_>>(),
            b.keys().collect::<Vec<_>>()
        );
        for (target, stages) in &a {
            for (stage, items) in stages {
                let mut left: Vec<_> = items.iter().map(|e| e.to_string()).collect();
                let mut right: Vec<_> = b[target][stage].iter().map(|e| e.to_string()).collect();
                left.sort();
                right.sort();
                assert_eq!(left, right);
            }
        }
    }

    #[test]
    fn full_report_lists_every_error() {
        let errors = sample();
        let report = errors.render_full_report();

        assert!(report.starts_with("Target: None\n\tStage: clone\t(1 error(s)).\n"));
        assert!(report.contains("Target: 490007\n\tStage: clone\t(1 error(s)).\n"));
        assert!(report.contains("\tStage: expression\t(2 error(s)).\n"));
        for error in errors.iter() {
            assert_eq!(report.matches(&format!("\t\t{}\n", error)).count(), 1);
        }
        assert!(report.find("490006").unwrap() < report.find("490007").unwrap());
    }

    #[test]
    fn count_summary_totals_per_stage() {
        let report = sample().render_count_summary();
        assert_eq!(
            report,
            "5 error(s) occurred during this run.\n\t3 in clone\n\t2 in expression\n"
        );
    }

    #[test]
    fn count_by_target_ends_with_grand_total() {
        let report = sample().render_count_by_target();
        assert_eq!(
            report,
            "Target: None\t(1 error(s))\n\
             \t1 in clone\n\
             Target: 490006\t(1 error(s))\n\
             \t1 in clone\n\
             Target: 490007\t(3 error(s))\n\
             \t1 in clone\n\
             \t2 in expression\n\
             5 error(s) occurred during this run.\n"
        );
    }

    #[test]
    fn empty_collection_reports_no_errors() {
        let errors: ErrorCollection<ConsistencyError> = ErrorCollection::new();
        assert!(!errors.has_errors());
        assert_eq!(errors.error_count(), 0);
        assert_eq!(
            errors.render_count_summary(),
            "0 error(s) occurred during this run.\n"
        );
        assert_eq!(
            errors.render_count_by_target(),
            "0 error(s) occurred during this run.\n"
        );
        assert_eq!(
            errors.render_full_report(),
            "There were no errors during this run.\n"
        );
    }

    #[test]
    fn absent_stage_groups_under_none() {
        let mut errors = ErrorCollection::new();
        errors.append(ConsistencyError::new(None, Some("clone".into()), Some("V1".into())));
        errors.append(ConsistencyError::new(None, None, Some("V2".into())));

        let stages: Vec<_> = errors.group_by_stage().keys().copied().collect();
        assert_eq!(stages, vec![None, Some("clone")]);
        assert_eq!(
            errors.render_count_summary(),
            "2 error(s) occurred during this run.\n\t1 in None\n\t1 in clone\n"
        );
    }
}
