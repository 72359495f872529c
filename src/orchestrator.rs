//! Ordered stage execution with failure folding and cancellation.
use crate::resources::backup::latest_session;
use crate::tasks::{self, Context, Stage, StageOutcome};

/// Failures collected over a run.
///
/// Each stage outcome produces a new log; nothing is shared or mutated
/// between stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureLog {
    entries: Vec<String>,
}

impl FailureLog {
    /// Fold `outcome` into the log.
    #[must_use]
    pub fn with_outcome(self, outcome: &StageOutcome) -> Self {
        match outcome {
            StageOutcome::Failed(failures) => {
                let mut entries = self.entries;
                entries.extend(failures.iter().cloned());
                Self { entries }
            }
            _ => self,
        }
    }

    /// Recorded failures, in stage order.
    #[must_use]
    pub const fn entries(&self) -> &[String] {
        self.entries.as_slice()
    }

    /// Whether nothing failed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every stage was visited.
    Completed {
        /// Failures recorded along the way.
        failures: FailureLog,
    },
    /// The user interrupted the run; later stages were bypassed.
    Cancelled,
}

impl RunOutcome {
    /// Process exit code: 0 clean, 1 with failures, 130 when cancelled.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Completed { failures } if failures.is_empty() => 0,
            Self::Completed { .. } => 1,
            Self::Cancelled => 130,
        }
    }
}

/// Runs stages in order and prints the summary.
pub struct Orchestrator {
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator over `stages`.
    #[must_use]
    pub const fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// The full install sequence.
    #[must_use]
    pub fn install() -> Self {
        Self::new(tasks::install_stages())
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Execute every stage.
    ///
    /// The cancel flag is checked before each stage. A cancelled run returns
    /// immediately without a summary; otherwise the summary is printed with
    /// the failures and the latest backup directory.
    pub fn run(&self, ctx: &Context) -> RunOutcome {
        let mut failures = FailureLog::default();

        for stage in &self.stages {
            if ctx.cancel.is_cancelled() {
                ctx.log.warn(&format!("cancelled; skipping {} and later stages", stage.name()));
                return RunOutcome::Cancelled;
            }
            let outcome = tasks::execute(stage.as_ref(), ctx);
            if outcome == StageOutcome::Cancelled {
                return RunOutcome::Cancelled;
            }
            failures = failures.with_outcome(&outcome);
        }
        if ctx.cancel.is_cancelled() {
            return RunOutcome::Cancelled;
        }

        let backup_dir = ctx
            .backup
            .dir()
            .or_else(|| latest_session(ctx.backup.root()));
        ctx.log
            .print_summary(failures.entries(), backup_dir.as_deref());

        RunOutcome::Completed { failures }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::DotstrapError;
    use crate::logging::{Log, StageStatus};
    use crate::tasks::test_helpers::Sandbox;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Log that remembers summaries instead of printing them.
    #[derive(Debug, Default)]
    struct RecordingLog {
        summaries: Mutex<Vec<(Vec<String>, Option<PathBuf>)>>,
    }

    impl RecordingLog {
        fn summaries(&self) -> Vec<(Vec<String>, Option<PathBuf>)> {
            self.summaries.lock().unwrap().clone()
        }
    }

    impl Log for RecordingLog {
        fn stage(&self, _: &str) {}
        fn info(&self, _: &str) {}
        fn debug(&self, _: &str) {}
        fn warn(&self, _: &str) {}
        fn error(&self, _: &str) {}
        fn record_stage(&self, _: &str, _: StageStatus, _: Option<&str>) {}
        fn print_summary(&self, failures: &[String], backup_dir: Option<&Path>) {
            self.summaries
                .lock()
                .unwrap()
                .push((failures.to_vec(), backup_dir.map(Path::to_path_buf)));
        }
    }

    /// Stage that counts its runs and returns a fixed outcome.
    struct Counting {
        runs: Arc<AtomicUsize>,
        outcome: StageOutcome,
        cancel_after: bool,
    }

    impl Stage for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn should_run(&self, _: &Context) -> bool {
            true
        }

        fn run(&self, ctx: &Context) -> anyhow::Result<StageOutcome> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.cancel_after {
                ctx.cancel.cancel();
            }
            Ok(self.outcome.clone())
        }
    }

    fn counting(runs: &Arc<AtomicUsize>, outcome: StageOutcome) -> Box<dyn Stage> {
        Box::new(Counting {
            runs: Arc::clone(runs),
            outcome,
            cancel_after: false,
        })
    }

    /// Stage interrupted part way through: raises the flag, then fails
    /// with the cancellation error as an interrupted download would.
    struct Interrupted {
        runs: Arc<AtomicUsize>,
    }

    impl Stage for Interrupted {
        fn name(&self) -> &str {
            "interrupted"
        }

        fn should_run(&self, _: &Context) -> bool {
            true
        }

        fn run(&self, ctx: &Context) -> anyhow::Result<StageOutcome> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            ctx.cancel.cancel();
            Err(DotstrapError::Cancelled.into())
        }
    }

    fn context(sandbox: &Sandbox) -> (Context, Arc<RecordingLog>) {
        let log = Arc::new(RecordingLog::default());
        let (mut ctx, _logger) = sandbox.quiet_context(sandbox.config(&[]));
        ctx.log = Arc::clone(&log) as Arc<dyn Log>;
        (ctx, log)
    }

    #[test]
    fn failure_log_folds_only_failures() {
        let log = FailureLog::default()
            .with_outcome(&StageOutcome::Done)
            .with_outcome(&StageOutcome::Failed(vec!["a".to_string()]))
            .with_outcome(&StageOutcome::Declined)
            .with_outcome(&StageOutcome::Failed(vec!["b".to_string(), "c".to_string()]));
        assert_eq!(log.entries(), ["a", "b", "c"]);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(
            RunOutcome::Completed {
                failures: FailureLog::default()
            }
            .exit_code(),
            0
        );
        assert_eq!(
            RunOutcome::Completed {
                failures: FailureLog::default()
                    .with_outcome(&StageOutcome::Failed(vec!["x".to_string()]))
            }
            .exit_code(),
            1
        );
        assert_eq!(RunOutcome::Cancelled.exit_code(), 130);
    }

    #[test]
    fn failures_do_not_stop_later_stages() {
        let sandbox = Sandbox::new();
        let (ctx, log) = context(&sandbox);
        let runs = Arc::new(AtomicUsize::new(0));
        let orchestrator = Orchestrator::new(vec![
            counting(&runs, StageOutcome::Failed(vec!["first".to_string()])),
            counting(&runs, StageOutcome::Done),
            counting(&runs, StageOutcome::Failed(vec!["third".to_string()])),
        ]);

        let outcome = orchestrator.run(&ctx);

        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.exit_code(), 1);
        let summaries = log.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].0, vec!["first", "third"]);
    }

    #[test]
    fn cancellation_bypasses_remaining_stages_and_summary() {
        let sandbox = Sandbox::new();
        let (ctx, log) = context(&sandbox);
        let runs = Arc::new(AtomicUsize::new(0));
        let orchestrator = Orchestrator::new(vec![
            Box::new(Counting {
                runs: Arc::clone(&runs),
                outcome: StageOutcome::Done,
                cancel_after: true,
            }),
            counting(&runs, StageOutcome::Done),
            counting(&runs, StageOutcome::Done),
        ]);

        let outcome = orchestrator.run(&ctx);

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(log.summaries().is_empty());
    }

    #[test]
    fn interrupt_in_second_of_five_stages_skips_the_rest() {
        let sandbox = Sandbox::new();
        let (ctx, log) = context(&sandbox);
        let runs: Vec<Arc<AtomicUsize>> = (0..5).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let orchestrator = Orchestrator::new(vec![
            counting(&runs[0], StageOutcome::Done),
            Box::new(Interrupted {
                runs: Arc::clone(&runs[1]),
            }),
            counting(&runs[2], StageOutcome::Done),
            counting(&runs[3], StageOutcome::Failed(vec!["unreached".to_string()])),
            counting(&runs[4], StageOutcome::Done),
        ]);

        let outcome = orchestrator.run(&ctx);

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(outcome.exit_code(), 130);
        let counts: Vec<usize> = runs.iter().map(|r| r.load(Ordering::SeqCst)).collect();
        assert_eq!(counts, vec![1, 1, 0, 0, 0]);
        assert!(log.summaries().is_empty(), "summary must not be printed");
    }

    #[test]
    fn clean_run_reports_no_backup_when_nothing_moved() {
        let sandbox = Sandbox::new();
        let (ctx, log) = context(&sandbox);
        let orchestrator = Orchestrator::new(vec![]);

        assert_eq!(orchestrator.run(&ctx).exit_code(), 0);
        assert_eq!(log.summaries(), vec![(Vec::new(), None)]);
    }

    #[cfg(unix)]
    #[test]
    fn install_sequence_links_core_files() {
        let sandbox = Sandbox::new();
        sandbox.repo_file(".zshrc", "zsh");
        let log = Arc::new(RecordingLog::default());
        let (mut ctx, _logger) = sandbox.quiet_context(sandbox.config(&[".zshrc"]));
        ctx.log = Arc::clone(&log) as Arc<dyn Log>;

        let outcome = Orchestrator::install().run(&ctx);

        assert_eq!(outcome.exit_code(), 0);
        assert!(sandbox.home.join(".zshrc").symlink_metadata().is_ok());
        assert_eq!(log.summaries().len(), 1);
    }
}
