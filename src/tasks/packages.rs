use anyhow::Result;

use super::{Context, Stage, StageOutcome};
use crate::config::StageFlag;
use crate::resources::package::{self, PackageKind};

/// Install Homebrew formulae and casks.
#[derive(Debug)]
pub struct InstallPackages;

impl InstallPackages {
    /// Install the missing packages of one kind with a single batch call.
    fn install_kind(ctx: &Context, kind: PackageKind, names: &[String]) -> Result<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        ctx.log.debug(&format!("checking {} {kind} package(s)", names.len()));
        let installed = package::installed(kind, ctx.executor.as_ref())?;
        let missing = package::missing(names, &installed);

        for name in names.iter().filter(|n| installed.contains(n.as_str())) {
            ctx.log.debug(&format!("ok: {name} (already installed)"));
        }
        if missing.is_empty() {
            ctx.log.info(&format!("all {kind} packages already installed"));
            return Ok(Vec::new());
        }

        ctx.cancel.ensure_running()?;
        let list = missing.join(", ");
        ctx.log.info(&format!("installing {kind}: {list}"));
        match package::install(kind, &missing, ctx.executor.as_ref()) {
            Ok(()) => Ok(Vec::new()),
            Err(e) => {
                ctx.log.error(&format!("brew install ({kind}) failed: {e:#}"));
                Ok(vec![format!("{kind} install ({list}): {e:#}")])
            }
        }
    }
}

impl Stage for InstallPackages {
    fn name(&self) -> &str {
        "Install packages"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.packages.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<StageOutcome> {
        if !ctx.confirm(
            "Install Homebrew packages?",
            ctx.flag_default(StageFlag::InstallPackages),
        )? {
            return Ok(StageOutcome::Declined);
        }

        if !ctx.executor.which("brew") {
            ctx.log.error("Homebrew is not installed; see https://brew.sh");
            return Ok(StageOutcome::Failed(vec![
                "packages: brew not found on PATH".to_string(),
            ]));
        }

        let mut failures = Vec::new();
        for (kind, names) in [
            (PackageKind::Formula, &ctx.config.packages.formulae),
            (PackageKind::Cask, &ctx.config.packages.casks),
        ] {
            failures.extend(Self::install_kind(ctx, kind, names)?);
        }

        if failures.is_empty() {
            Ok(StageOutcome::Done)
        } else {
            Ok(StageOutcome::Failed(failures))
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::ParameterDocument;
    use crate::config::packages::PackagesConfig;
    use crate::resources::test_helpers::MockExecutor;
    use crate::tasks::test_helpers::Sandbox;
    use std::sync::Arc;

    fn packages(formulae: &[&str], casks: &[&str]) -> PackagesConfig {
        PackagesConfig {
            formulae: formulae.iter().map(ToString::to_string).collect(),
            casks: casks.iter().map(ToString::to_string).collect(),
        }
    }

    fn opted_in() -> ParameterDocument {
        ParameterDocument::from_json("t", r#"{"installPackages": true}"#).unwrap()
    }

    #[test]
    fn skipped_when_nothing_configured() {
        let sandbox = Sandbox::new();
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));
        assert!(!InstallPackages.should_run(&ctx));
    }

    #[test]
    fn declined_by_default() {
        let sandbox = Sandbox::new();
        let mut config = sandbox.config(&[]);
        config.packages = packages(&["git"], &[]);
        let executor = Arc::new(MockExecutor::with_responses(vec![]).with_which(true));
        let (ctx, _log) = sandbox.context(config, executor.clone());

        assert_eq!(InstallPackages.run(&ctx).unwrap(), StageOutcome::Declined);
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn missing_brew_fails_the_stage() {
        let sandbox = Sandbox::new();
        let mut config = sandbox.config(&[]);
        config.packages = packages(&["git"], &[]);
        let executor = Arc::new(MockExecutor::with_responses(vec![]).with_which(false));
        let (ctx, _log) = sandbox.context(config, executor.clone());
        let ctx = ctx.with_parameters(opted_in());

        assert!(matches!(
            InstallPackages.run(&ctx).unwrap(),
            StageOutcome::Failed(_)
        ));
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn installs_only_missing_packages_in_batches() {
        let sandbox = Sandbox::new();
        let mut config = sandbox.config(&[]);
        config.packages = packages(&["git", "jq", "ripgrep"], &["firefox"]);
        let executor = Arc::new(
            MockExecutor::with_responses(vec![
                (true, "git\nwget\n".to_string()),
                (true, String::new()),
                (true, String::new()),
                (true, String::new()),
            ])
            .with_which(true),
        );
        let (ctx, _log) = sandbox.context(config, executor.clone());
        let ctx = ctx.with_parameters(opted_in());

        assert_eq!(InstallPackages.run(&ctx).unwrap(), StageOutcome::Done);
        assert_eq!(
            executor.calls(),
            vec![
                "brew list --formula -1",
                "brew install jq ripgrep",
                "brew list --cask -1",
                "brew install --cask firefox",
            ]
        );
    }

    #[test]
    fn formula_failure_does_not_stop_casks() {
        let sandbox = Sandbox::new();
        let mut config = sandbox.config(&[]);
        config.packages = packages(&["jq"], &["firefox"]);
        let executor = Arc::new(
            MockExecutor::with_responses(vec![
                (true, String::new()),
                (false, String::new()),
                (true, String::new()),
                (true, String::new()),
            ])
            .with_which(true),
        );
        let (ctx, _log) = sandbox.context(config, executor.clone());
        let ctx = ctx.with_parameters(opted_in());

        let outcome = InstallPackages.run(&ctx).unwrap();
        let StageOutcome::Failed(failures) = outcome else {
            panic!("formula install should fail");
        };
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("formula install (jq)"));
        assert_eq!(executor.calls()[3], "brew install --cask firefox");
    }
}
