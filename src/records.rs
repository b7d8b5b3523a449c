use std::fmt;

/// Placeholder printed wherever an optional field was never observed
pub const ABSENT: &str = "None";

/// Anything that can be grouped by target and stage in a report
pub trait ErrorRecord: fmt::Display {
    fn target(&self) -> Option<&str>;
    fn stage(&self) -> Option<&str>;
}

/// A field that failed validation on one record of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub target: Option<String>,
    pub stage: String,
    /// Natural key of the record, taken from its `<stage>_id` field
    pub suffix: Option<String>,
    pub parameter: String,
    pub value: Option<String>,
    pub notice: Option<String>,
}

impl ValidationError {
    pub fn new(
        target: Option<String>,
        stage: impl Into<String>,
        suffix: Option<String>,
        parameter: impl Into<String>,
        value: Option<String>,
        notice: Option<String>,
    ) -> Self {
        Self {
            target,
            stage: stage.into(),
            suffix,
            parameter: parameter.into(),
            value,
            notice,
        }
    }
}

impl ErrorRecord for ValidationError {
    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn stage(&self) -> Option<&str> {
        Some(&self.stage)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error: {}, Value of {} = '{}' for {}_id = '{}'",
            self.notice.as_deref().unwrap_or(ABSENT),
            self.parameter,
            self.value.as_deref().unwrap_or(ABSENT),
            self.stage,
            self.suffix.as_deref().unwrap_or(ABSENT),
        )
    }
}

/// A record that was expected in the center database but never arrived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyError {
    pub target: Option<String>,
    pub stage: Option<String>,
    pub suffix: Option<String>,
}

impl ConsistencyError {
    pub fn new(target: Option<String>, stage: Option<String>, suffix: Option<String>) -> Self {
        Self {
            target,
            stage,
            suffix,
        }
    }
}

impl ErrorRecord for ConsistencyError {
    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Missing suffix: {}",
            self.suffix.as_deref().unwrap_or(ABSENT)
        )
    }
}
