//! Structured logger with stage summary collection.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::subscriber::STAGE_TARGET;
use super::types::{Log, StageEntry, StageStatus};

/// `<cache>/dotstrap/<command>.log`, where `<cache>` is `$XDG_CACHE_HOME`
/// or `~/.cache`. Creates the directory; `None` when that fails.
pub(super) fn run_log_path(command: &str) -> Option<PathBuf> {
    let cache = std::env::var_os("XDG_CACHE_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    let dir = cache.join("dotstrap");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with summary collection.
///
/// Messages go through [`tracing`]; the subscriber installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) writes them to the
/// console and to `$XDG_CACHE_HOME/dotstrap/<command>.log`.
#[derive(Debug)]
pub struct Logger {
    stages: Mutex<Vec<StageEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a logger for `command`, remembering its log file path for the
    /// summary.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(run_log_path(command))
    }

    /// Create a logger that reports `log_file` in the summary.
    #[must_use]
    pub const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            stages: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Return a clone of all recorded stage entries.
    #[must_use]
    pub fn stage_entries(&self) -> Vec<StageEntry> {
        self.stages.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Record a stage result for the summary.
    pub fn record_stage(&self, name: &str, status: StageStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.stages.lock() {
            guard.push(StageEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Print the run summary: one line per stage, then either a success
    /// message or the itemised failures, then the backup location.
    pub fn print_summary(&self, failures: &[String], backup_dir: Option<&Path>) {
        let stages = self.stage_entries();

        self.stage("Summary");

        for entry in &stages {
            let (icon, color) = match entry.status {
                StageStatus::Ok => ("✓", "\x1b[32m"),
                StageStatus::NotApplicable => ("·", "\x1b[2m"),
                StageStatus::Declined => ("○", "\x1b[33m"),
                StageStatus::Failed => ("✗", "\x1b[31m"),
            };
            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.name));
        }

        if failures.is_empty() {
            self.info("\x1b[32mprovisioning completed without failures\x1b[0m");
        } else {
            self.error(&format!("{} failure(s):", failures.len()));
            for failure in failures {
                self.error(&format!("  - {failure}"));
            }
        }

        if let Some(dir) = backup_dir {
            self.info(&format!("displaced files were backed up to {}", dir.display()));
        }
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error);

    fn record_stage(&self, name: &str, status: StageStatus, message: Option<&str>) {
        self.record_stage(name, status, message);
    }

    fn print_summary(&self, failures: &[String], backup_dir: Option<&Path>) {
        self.print_summary(failures, backup_dir);
    }
}
