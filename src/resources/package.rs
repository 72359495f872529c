//! Homebrew formulae and casks.
//!
//! State comes from one `brew list` per kind and installs are batched into
//! one `brew install` per kind, so packages are handled a kind at a time
//! rather than one [`super::Resource`] each.
use std::collections::HashSet;

use anyhow::Result;

use super::ResourceState;
use crate::exec::Executor;

/// Kinds of Homebrew packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// Command-line formula.
    Formula,
    /// GUI cask.
    Cask,
}

impl PackageKind {
    const fn list_args(self) -> [&'static str; 3] {
        match self {
            Self::Formula => ["list", "--formula", "-1"],
            Self::Cask => ["list", "--cask", "-1"],
        }
    }

    const fn install_args(self) -> &'static [&'static str] {
        match self {
            Self::Formula => &["install"],
            Self::Cask => &["install", "--cask"],
        }
    }
}

impl std::fmt::Display for PackageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Formula => "formula",
            Self::Cask => "cask",
        })
    }
}

/// Names of installed packages of one kind.
///
/// A failing `brew list` yields an empty set: every package is then
/// handed to `brew install`, which passes over installed ones.
///
/// # Errors
///
/// Returns an error if `brew` cannot be started.
pub fn installed(kind: PackageKind, executor: &dyn Executor) -> Result<HashSet<String>> {
    let result = executor.run_unchecked("brew", &kind.list_args())?;
    if !result.success {
        return Ok(HashSet::new());
    }
    Ok(result
        .stdout
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect())
}

/// State of `name` given the installed set.
#[must_use]
pub fn state(name: &str, installed: &HashSet<String>) -> ResourceState {
    if installed.contains(name) {
        ResourceState::Present
    } else {
        ResourceState::Missing
    }
}

/// Configured names that are not installed yet, in configured order.
#[must_use]
pub fn missing<'n>(names: &'n [String], installed: &HashSet<String>) -> Vec<&'n str> {
    names
        .iter()
        .map(String::as_str)
        .filter(|name| state(name, installed) == ResourceState::Missing)
        .collect()
}

/// Install `names` with a single `brew install` call. Does nothing for an
/// empty list.
///
/// # Errors
///
/// Returns an error if `brew install` fails.
pub fn install(kind: PackageKind, names: &[&str], executor: &dyn Executor) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    let mut args = kind.install_args().to_vec();
    args.extend_from_slice(names);
    executor.run("brew", &args)?;
    Ok(())
}
