//! Side-effect-free predicates and the environment readiness report.
//!
//! Every check returns a plain boolean (or a [`Readiness`] report made of
//! them); callers decide which failures are fatal.
use std::path::Path;

use crate::exec::Executor;
use crate::platform::{MINIMUM_MACOS_MAJOR, Platform};

/// URL fetched by the connectivity check.
const CONNECTIVITY_URL: &str = "https://github.com";

/// Seconds before the connectivity check gives up.
const CONNECTIVITY_TIMEOUT_SECS: &str = "5";

/// `true` when `value` contains something other than whitespace.
#[must_use]
pub fn not_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

/// `true` when anything (including a broken symlink) exists at `path`.
#[must_use]
pub fn path_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// `true` when `path` is a regular file, following symlinks.
#[must_use]
pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

/// `true` when `path` is a directory, following symlinks.
#[must_use]
pub fn dir_exists(path: &Path) -> bool {
    path.is_dir()
}

/// `true` when the current user may write to `path`.
#[cfg(unix)]
#[must_use]
pub fn is_writable(path: &Path) -> bool {
    rustix::fs::access(path, rustix::fs::Access::WRITE_OK).is_ok()
}

/// `true` when the current user may write to `path`.
#[cfg(not(unix))]
#[must_use]
pub fn is_writable(path: &Path) -> bool {
    path.metadata().is_ok_and(|m| !m.permissions().readonly())
}

/// `true` when the process runs without root privileges.
#[cfg(unix)]
#[must_use]
pub fn not_privileged() -> bool {
    !rustix::process::geteuid().is_root()
}

/// `true` when the process runs without root privileges.
#[cfg(not(unix))]
#[must_use]
pub const fn not_privileged() -> bool {
    true
}

/// `true` when an HTTPS request to a well-known host succeeds.
#[must_use]
pub fn has_connectivity(executor: &dyn Executor) -> bool {
    executor
        .run_unchecked(
            "curl",
            &[
                "-fsS",
                "--head",
                "--max-time",
                CONNECTIVITY_TIMEOUT_SECS,
                CONNECTIVITY_URL,
            ],
        )
        .is_ok_and(|r| r.success)
}

/// What a readiness check looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Not running as root.
    Privilege,
    /// Supported operating system family.
    Os,
    /// Supported OS release.
    Version,
    /// Supported CPU architecture.
    Architecture,
    /// zsh login shell.
    Shell,
    /// Network reachable.
    Connectivity,
}

/// Outcome of one readiness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// Which property was checked.
    pub kind: CheckKind,
    /// Whether the check passed.
    pub passed: bool,
    /// Human-readable observation, e.g. `"macos 14.4"`.
    pub detail: String,
}

/// Result of [`environment_readiness`].
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    /// Individual checks in evaluation order.
    pub checks: Vec<Check>,
}

impl Readiness {
    /// Checks that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Evaluate the composite environment readiness check.
///
/// `privileged` is passed in rather than queried so the report can be
/// exercised for both cases; production callers pass `!not_privileged()`.
/// Connectivity is only checked when `check_network` is set.
#[must_use]
pub fn environment_readiness(
    platform: &Platform,
    executor: &dyn Executor,
    privileged: bool,
    check_network: bool,
) -> Readiness {
    let mut checks = vec![
        Check {
            kind: CheckKind::Privilege,
            passed: !privileged,
            detail: if privileged { "root" } else { "regular user" }.to_string(),
        },
        Check {
            kind: CheckKind::Os,
            passed: platform.is_macos(),
            detail: platform.os.to_string(),
        },
    ];

    if platform.is_macos() {
        let major = platform.major_version();
        checks.push(Check {
            kind: CheckKind::Version,
            passed: major.is_some_and(|m| m >= MINIMUM_MACOS_MAJOR),
            detail: platform
                .version
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        });
    }

    checks.push(Check {
        kind: CheckKind::Architecture,
        passed: platform.arch.is_supported(),
        detail: platform.arch.to_string(),
    });
    checks.push(Check {
        kind: CheckKind::Shell,
        passed: platform.uses_zsh(),
        detail: platform
            .shell
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
    });

    if check_network {
        let online = has_connectivity(executor);
        checks.push(Check {
            kind: CheckKind::Connectivity,
            passed: online,
            detail: if online { "online" } else { "offline" }.to_string(),
        });
    }

    Readiness { checks }
}
