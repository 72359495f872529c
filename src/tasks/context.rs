use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cancel::CancelFlag;
use crate::config::{Config, ParameterDocument, StageFlag};
use crate::error::DotstrapError;
use crate::exec::Executor;
use crate::logging::Log;
use crate::prompt::{Confirm, Preset};
use crate::resources::app::APPLICATIONS_DIR;
use crate::resources::backup::{BACKUP_DIR_NAME, BackupSession};

/// Shared context for stage execution.
///
/// Everything a stage needs is passed in here explicitly; stages never read
/// the process environment or change the working directory.
pub struct Context {
    /// Repository configuration.
    pub config: Config,
    /// Parameter document; empty when none was supplied.
    pub params: ParameterDocument,
    /// Whether a parameter document was supplied.
    pub parameters_supplied: bool,
    /// Logger for output and stage recording.
    pub log: Arc<dyn Log>,
    /// User's home directory.
    pub home: PathBuf,
    /// This run's backup session.
    pub backup: BackupSession,
    /// Where application bundles are installed.
    pub applications_dir: PathBuf,
    /// Command executor.
    pub executor: Arc<dyn Executor>,
    /// Confirmation strategy.
    pub confirm: Arc<dyn Confirm>,
    /// Whether confirmations are asked on the terminal.
    pub interactive: bool,
    /// Raised when the user interrupts the run.
    pub cancel: CancelFlag,
    /// `--strict` was passed.
    pub strict: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("params", &self.params)
            .field("parameters_supplied", &self.parameters_supplied)
            .field("log", &"<dyn Log>")
            .field("home", &self.home)
            .field("backup", &self.backup)
            .field("applications_dir", &self.applications_dir)
            .field("executor", &self.executor)
            .field("confirm", &self.confirm)
            .field("interactive", &self.interactive)
            .field("cancel", &self.cancel)
            .field("strict", &self.strict)
            .finish()
    }
}

impl Context {
    /// Create a non-interactive context with no parameter document.
    ///
    /// Backups go to `$HOME/.dotstrap-backups` and applications to
    /// `/Applications` unless overridden.
    #[must_use]
    pub fn new(
        config: Config,
        log: Arc<dyn Log>,
        home: PathBuf,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let backup = BackupSession::new(home.join(BACKUP_DIR_NAME), home.clone());
        Self {
            config,
            params: ParameterDocument::empty(),
            parameters_supplied: false,
            log,
            home,
            backup,
            applications_dir: PathBuf::from(APPLICATIONS_DIR),
            executor,
            confirm: Arc::new(Preset),
            interactive: false,
            cancel: CancelFlag::new(),
            strict: false,
        }
    }

    /// Use a supplied parameter document.
    #[must_use]
    pub fn with_parameters(mut self, params: ParameterDocument) -> Self {
        self.params = params;
        self.parameters_supplied = true;
        self
    }

    /// Use `confirm` for stage confirmations.
    #[must_use]
    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>, interactive: bool) -> Self {
        self.confirm = confirm;
        self.interactive = interactive;
        self
    }

    /// Share `cancel` with the interrupt handler.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fail template rendering on unresolved placeholders.
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Install applications into `dir`.
    #[must_use]
    pub fn with_applications_dir(mut self, dir: PathBuf) -> Self {
        self.applications_dir = dir;
        self
    }

    /// Use `session` for backups.
    #[must_use]
    pub fn with_backup(mut self, session: BackupSession) -> Self {
        self.backup = session;
        self
    }

    /// Root directory of the repository.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Whether templates are rendered in strict mode.
    #[must_use]
    pub fn strict_templates(&self) -> bool {
        self.strict || self.params.flag(StageFlag::StrictTemplates) == Some(true)
    }

    /// Default answer for a stage gated by `flag`. Absent means no.
    #[must_use]
    pub fn flag_default(&self, flag: StageFlag) -> bool {
        self.params.flag(flag).unwrap_or(false)
    }

    /// Ask whether to proceed.
    ///
    /// # Errors
    ///
    /// Returns [`DotstrapError::Cancelled`] when the user interrupts.
    pub fn confirm(&self, question: &str, default: bool) -> Result<bool, DotstrapError> {
        self.cancel.ensure_running()?;
        self.confirm.confirm(question, default)
    }
}
