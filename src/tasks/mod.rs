//! Named provisioning stages that drive resource changes.
pub mod apps;
pub mod context;
pub mod links;
pub mod packages;
pub mod templates;

pub use context::Context;

use anyhow::Result;

use crate::error::DotstrapError;
use crate::logging::StageStatus;

/// What a stage did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage ran without failures.
    Done,
    /// The confirmation was answered no.
    Declined,
    /// There was nothing to do.
    NotApplicable,
    /// The stage ran and these items failed.
    Failed(Vec<String>),
    /// The user interrupted the run.
    Cancelled,
}

/// A named, confirmable provisioning step.
pub trait Stage: Send + Sync {
    /// Human-readable stage name.
    fn name(&self) -> &str;

    /// Whether this stage has anything to work on.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the stage.
    ///
    /// Item-level failures are returned as [`StageOutcome::Failed`]; an
    /// `Err` means the stage as a whole could not run.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot proceed at all, or
    /// [`DotstrapError::Cancelled`] when the user interrupts a prompt.
    fn run(&self, ctx: &Context) -> Result<StageOutcome>;
}

/// The stages of a full install, in execution order.
///
/// Templates are rendered first so the linker links the rendered files.
#[must_use]
pub fn install_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(templates::RenderTemplates),
        Box::new(links::LinkCore),
        Box::new(links::LinkDiscovered),
        Box::new(packages::InstallPackages),
        Box::new(apps::InstallApps),
    ]
}

/// Execute a stage, recording the result in the logger.
pub fn execute(stage: &dyn Stage, ctx: &Context) -> StageOutcome {
    if !stage.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping stage: {} (nothing to do)", stage.name()));
        ctx.log
            .record_stage(stage.name(), StageStatus::NotApplicable, None);
        return StageOutcome::NotApplicable;
    }

    ctx.log.stage(stage.name());

    let outcome = match stage.run(ctx) {
        Ok(outcome) => outcome,
        Err(e) if DotstrapError::is_cancellation(&e) => StageOutcome::Cancelled,
        Err(e) => {
            ctx.log.error(&format!("{}: {e:#}", stage.name()));
            StageOutcome::Failed(vec![format!("{}: {e:#}", stage.name())])
        }
    };

    match &outcome {
        StageOutcome::Done => ctx.log.record_stage(stage.name(), StageStatus::Ok, None),
        StageOutcome::Declined => {
            ctx.log.info("declined");
            ctx.log
                .record_stage(stage.name(), StageStatus::Declined, None);
        }
        StageOutcome::NotApplicable => {
            ctx.log
                .record_stage(stage.name(), StageStatus::NotApplicable, None);
        }
        StageOutcome::Failed(failures) => {
            ctx.log.record_stage(
                stage.name(),
                StageStatus::Failed,
                Some(&format!("{} failed", failures.len())),
            );
        }
        StageOutcome::Cancelled => {
            ctx.cancel.cancel();
            ctx.log.warn("cancelled by user");
        }
    }
    outcome
}

/// Shared helpers for stage unit tests.
#[cfg(test)]
pub mod test_helpers {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use crate::config::Config;
    use crate::config::links::LinksConfig;
    use crate::exec::Executor;
    use crate::logging::{Log, Logger};
    use crate::resources::backup::{BACKUP_DIR_NAME, BackupSession};
    use crate::resources::test_helpers::MockExecutor;

    use super::Context;

    /// A scratch repository and home directory.
    #[derive(Debug)]
    pub struct Sandbox {
        _dir: tempfile::TempDir,
        pub root: PathBuf,
        pub home: PathBuf,
    }

    impl Sandbox {
        /// Create empty `repo/` and `home/` directories.
        #[must_use]
        #[allow(clippy::unwrap_used)]
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("repo");
            let home = dir.path().join("home");
            std::fs::create_dir_all(&root).unwrap();
            std::fs::create_dir_all(&home).unwrap();
            Self {
                _dir: dir,
                root,
                home,
            }
        }

        /// Write `contents` to `name` inside the repository.
        #[allow(clippy::unwrap_used)]
        pub fn repo_file(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.root.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, contents).unwrap();
            path
        }

        /// Config rooted at the sandbox repository with `core` as core set.
        #[must_use]
        pub fn config(&self, core: &[&str]) -> Config {
            Config {
                root: self.root.clone(),
                links: LinksConfig::with_core(core.iter().copied()),
                packages: crate::config::packages::PackagesConfig::default(),
                apps: Vec::new(),
            }
        }

        /// Context over `config` with a fixed backup stamp.
        #[must_use]
        pub fn context(
            &self,
            config: Config,
            executor: Arc<dyn Executor>,
        ) -> (Context, Arc<Logger>) {
            let log = Arc::new(Logger::with_log_file(None));
            let ctx = Context::new(
                config,
                Arc::clone(&log) as Arc<dyn Log>,
                self.home.clone(),
                executor,
            )
            .with_backup(session(&self.home))
            .with_applications_dir(self.home.join("Applications"));
            (ctx, log)
        }

        /// Context over `config` with an executor that expects no calls.
        #[must_use]
        pub fn quiet_context(&self, config: Config) -> (Context, Arc<Logger>) {
            self.context(config, Arc::new(MockExecutor::with_responses(vec![])))
        }
    }

    fn session(home: &Path) -> BackupSession {
        BackupSession::with_stamp(
            home.join(BACKUP_DIR_NAME),
            home.to_path_buf(),
            "20240101-000000".to_string(),
        )
    }
}
