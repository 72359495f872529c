//! Core logging types: stage entries, status, and the [`Log`] trait.
use std::path::Path;

/// Stage execution result for summary reporting.
#[derive(Debug, Clone)]
pub struct StageEntry {
    /// Human-readable stage name.
    pub name: String,
    /// Final status of the stage.
    pub status: StageStatus,
    /// Optional detail message (e.g. decline reason or error description).
    pub message: Option<String>,
}

/// Status of a completed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Stage completed successfully.
    Ok,
    /// Stage had nothing to do (e.g. no templates, no parameters).
    NotApplicable,
    /// The user (or the preset answer) declined the stage.
    Declined,
    /// Stage ran but recorded at least one failure.
    Failed,
}

/// Abstraction over logging backends.
///
/// Stage code logs through `&dyn Log` so tests can capture output without
/// touching the console.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (suppressed on console unless verbose).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record a stage result for the summary.
    fn record_stage(&self, name: &str, status: StageStatus, message: Option<&str>);
    /// Print the end-of-run summary.
    fn print_summary(&self, failures: &[String], backup_dir: Option<&Path>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_status_equality() {
        assert_eq!(StageStatus::Ok, StageStatus::Ok);
        assert_ne!(StageStatus::Ok, StageStatus::Failed);
        assert_ne!(StageStatus::Declined, StageStatus::NotApplicable);
    }
}
