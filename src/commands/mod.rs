pub mod check;
pub mod completions;
pub mod install;
pub mod version;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cancel::CancelFlag;
use crate::cli::GlobalOpts;
use crate::config::{Config, ParameterDocument};
use crate::error::EnvironmentError;
use crate::exec::Executor;
use crate::logging::{Log, Logger};
use crate::platform::{MINIMUM_MACOS_MAJOR, Platform};
use crate::prompt;
use crate::tasks::Context;
use crate::validation::{self, CheckKind, Readiness};

/// Shared state produced by the common command setup sequence.
///
/// Environment checks, parameter loading and configuration loading run
/// here, before any stage can touch the file system.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected platform.
    pub platform: Platform,
    /// Repository configuration.
    pub config: Config,
    /// User's home directory.
    pub home: PathBuf,
    /// Parameter document, when `--parameters` was given.
    pub params: Option<ParameterDocument>,
}

impl CommandSetup {
    /// Check the environment, then load parameters and configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when running as root, on an unsupported OS or
    /// release, when `HOME` is unset, when the parameter document is
    /// missing or invalid, or when the configuration cannot be loaded.
    pub fn init(global: &GlobalOpts, log: &Logger, executor: &dyn Executor) -> Result<Self> {
        let platform = Platform::detect(executor);

        log.stage("Checking environment");
        let readiness = validation::environment_readiness(
            &platform,
            executor,
            !validation::not_privileged(),
            true,
        );
        require_ready(&readiness, log)?;

        let home = home_dir(std::env::var_os("HOME"))?;
        let params = global
            .parameters
            .as_deref()
            .map(ParameterDocument::load)
            .transpose()?;

        let root = resolve_root(global)?;
        log.info(&format!("repository: {}", root.display()));

        log.stage("Loading configuration");
        let config = Config::load(&root)?;
        log.debug(&format!("{} core links", config.links.core().len()));
        log.debug(&format!("{} discovery exclusions", config.links.exclude.len()));
        log.info(&format!(
            "loaded {} formulae, {} casks, {} apps",
            config.packages.formulae.len(),
            config.packages.casks.len(),
            config.apps.len()
        ));
        if let Some(params) = &params {
            log.debug(&format!("{} parameter scopes", params.scope_count()));
        }

        Ok(Self {
            platform,
            config,
            home,
            params,
        })
    }

    /// Build the stage context for this run.
    #[must_use]
    pub fn into_context(
        self,
        global: &GlobalOpts,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        cancel: CancelFlag,
    ) -> Context {
        let mut ctx = Context::new(self.config, log, self.home, executor)
            .with_confirm(
                Arc::from(prompt::for_mode(global.interactive)),
                global.interactive,
            )
            .with_cancel(cancel)
            .with_strict(global.strict);
        if let Some(params) = self.params {
            ctx = ctx.with_parameters(params);
        }
        ctx
    }
}

/// Fail on the readiness checks that make provisioning unsafe and warn about
/// the rest.
///
/// # Errors
///
/// Returns the [`EnvironmentError`] of the first fatal check that failed.
pub fn require_ready(readiness: &Readiness, log: &dyn Log) -> Result<(), EnvironmentError> {
    for check in readiness.failures() {
        match check.kind {
            CheckKind::Privilege => return Err(EnvironmentError::Privileged),
            CheckKind::Os => {
                return Err(EnvironmentError::UnsupportedOs {
                    os: check.detail.clone(),
                });
            }
            CheckKind::Version => {
                return Err(EnvironmentError::UnsupportedVersion {
                    found: check.detail.clone(),
                    minimum: MINIMUM_MACOS_MAJOR,
                });
            }
            CheckKind::Architecture => {
                log.warn(&format!("untested architecture: {}", check.detail));
            }
            CheckKind::Shell => {
                log.warn(&format!("login shell is {}, not zsh", check.detail));
            }
            CheckKind::Connectivity => {
                log.warn("no network connectivity; downloads will fail");
            }
        }
    }
    Ok(())
}

/// Home directory from the value of `HOME`.
///
/// # Errors
///
/// Returns [`EnvironmentError::NoHome`] when `HOME` is unset or empty.
pub fn home_dir(home: Option<OsString>) -> Result<PathBuf, EnvironmentError> {
    home.filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or(EnvironmentError::NoHome)
}

/// Resolve the repository root from `--root`, `DOTSTRAP_ROOT`, the binary's
/// location, or the current directory, in that order.
///
/// # Errors
///
/// Returns an error if no candidate looks like a repository.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    resolve_root_from(
        global.root.as_deref(),
        std::env::var_os("DOTSTRAP_ROOT"),
        std::env::current_exe().ok().as_deref(),
        &cwd,
    )
}

/// [`resolve_root`] with every input passed explicitly.
///
/// # Errors
///
/// Returns an error if an explicit root does not exist or no candidate
/// looks like a repository.
pub fn resolve_root_from(
    explicit: Option<&Path>,
    env_root: Option<OsString>,
    exe: Option<&Path>,
    cwd: &Path,
) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return dunce::canonicalize(root)
            .with_context(|| format!("repository root {} does not exist", root.display()));
    }

    if let Some(root) = env_root.filter(|r| !r.is_empty()) {
        let root = PathBuf::from(root);
        return dunce::canonicalize(&root)
            .with_context(|| format!("DOTSTRAP_ROOT {} does not exist", root.display()));
    }

    if let Some(parent) = exe.and_then(Path::parent) {
        // target/<profile>/ when run from a checkout, bin/ when installed
        let candidates = [parent.join("../.."), parent.join("..")];
        for candidate in &candidates {
            if is_repository(candidate) {
                return Ok(dunce::canonicalize(candidate)?);
            }
        }
    }

    if is_repository(cwd) {
        return Ok(dunce::canonicalize(cwd)?);
    }

    anyhow::bail!("cannot determine repository root; use --root or set DOTSTRAP_ROOT")
}

/// A repository has a `conf/` or `templates/` directory.
fn is_repository(dir: &Path) -> bool {
    dir.join("conf").is_dir() || dir.join("templates").is_dir()
}
