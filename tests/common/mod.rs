// Shared helpers for integration tests.
//
// Provides a temporary repository and home directory plus a fluent builder
// so each integration test can set up an isolated environment without
// repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use dotstrap::config::{Config, ParameterDocument};
use dotstrap::exec::{ExecResult, Executor};
use dotstrap::logging::{Log, Logger};
use dotstrap::resources::backup::{BACKUP_DIR_NAME, BackupSession};
use dotstrap::tasks::Context;

/// Stamp used for every backup session created by these tests.
pub const STAMP: &str = "20240101-120000";

/// Executor that refuses every command and remembers what was asked.
#[derive(Debug, Default)]
pub struct RefusingExecutor {
    pub calls: Mutex<Vec<String>>,
}

impl RefusingExecutor {
    fn refuse(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(format!("{program} {}", args.join(" ")));
        anyhow::bail!("{program} is not available in tests")
    }
}

impl Executor for RefusingExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.refuse(program, args)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.refuse(program, args)
    }

    fn which(&self, _: &str) -> bool {
        false
    }
}

/// An isolated repository and home directory backed by a
/// [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    dir: tempfile::TempDir,
    /// Repository root.
    pub root: PathBuf,
    /// Home directory links are created in.
    pub home: PathBuf,
}

impl IntegrationTestContext {
    /// Create empty `repo/` and `home/` directories.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path().join("repo");
        let home = dir.path().join("home");
        std::fs::create_dir_all(root.join("conf")).expect("create conf dir");
        std::fs::create_dir_all(&home).expect("create home dir");
        Self { dir, root, home }
    }

    /// Load configuration from the repository.
    pub fn load_config(&self) -> Config {
        Config::load(&self.root).expect("load config")
    }

    /// Backup session with the fixed [`STAMP`].
    pub fn session(&self) -> BackupSession {
        BackupSession::with_stamp(
            self.home.join(BACKUP_DIR_NAME),
            self.home.clone(),
            STAMP.to_string(),
        )
    }

    /// Path of this session's backup directory.
    pub fn backup_dir(&self) -> PathBuf {
        self.home.join(BACKUP_DIR_NAME).join(STAMP)
    }

    /// Non-interactive stage context over the loaded configuration.
    pub fn context(&self, params: Option<ParameterDocument>) -> (Context, Arc<Logger>) {
        let log = Arc::new(Logger::with_log_file(None));
        let mut ctx = Context::new(
            self.load_config(),
            Arc::clone(&log) as Arc<dyn Log>,
            self.home.clone(),
            Arc::new(RefusingExecutor::default()),
        )
        .with_backup(self.session())
        .with_applications_dir(self.home.join("Applications"));
        if let Some(params) = params {
            ctx = ctx.with_parameters(params);
        }
        (ctx, log)
    }

    /// Read a file in the home directory, following links.
    pub fn read_home(&self, name: &str) -> String {
        std::fs::read_to_string(self.home.join(name)).expect("read home file")
    }
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a new context with an empty repository.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext::new(),
        }
    }

    /// Write `content` to `conf/<filename>`.
    pub fn with_config_file(self, filename: &str, content: &str) -> Self {
        std::fs::write(self.ctx.root.join("conf").join(filename), content)
            .expect("write config file");
        self
    }

    /// Use `names` as the core link set.
    pub fn with_core(self, names: &[&str]) -> Self {
        let list: Vec<String> = names.iter().map(|n| format!("{n:?}")).collect();
        self.with_config_file("links.toml", &format!("core = [{}]\n", list.join(", ")))
    }

    /// Write `content` to `name` in the repository root.
    pub fn with_repo_file(self, name: &str, content: &str) -> Self {
        let path = self.ctx.root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, content).expect("write repo file");
        self
    }

    /// Write `templates/template.<scope>`.
    pub fn with_template(self, scope: &str, body: &str) -> Self {
        self.with_repo_file(&format!("templates/template.{scope}"), body)
    }

    /// Write `content` to `name` in the home directory.
    pub fn with_home_file(self, name: &str, content: &str) -> Self {
        let path = self.ctx.home.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, content).expect("write home file");
        self
    }

    /// Finalise the context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}

/// Parse a parameter document from JSON text.
pub fn params(json: &str) -> ParameterDocument {
    ParameterDocument::from_json("test", json).expect("parse parameters")
}
