//! External process execution behind an injectable [`Executor`] trait.
use anyhow::{Context, Result, bail};
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over running external programs.
///
/// Package and app resources take an `&dyn Executor` so unit tests can
/// substitute a scripted mock for Homebrew, `curl` and `hdiutil`.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command and fail if it exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command, returning its result even when it exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be started.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Check whether `program` is available on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// Production [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        checked(program, ExecResult::from(output))
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Turn a non-zero exit into an error carrying the exit code and stderr.
fn checked(program: &str, result: ExecResult) -> Result<ExecResult> {
    if !result.success {
        bail!(
            "{program} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}
