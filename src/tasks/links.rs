use anyhow::{Context as _, Result};

use super::{Context, Stage, StageOutcome};
use crate::config::StageFlag;
use crate::resources::symlink::{LinkCategory, LinkOutcome, LinkSpec, Linker, discover};

/// Link the fixed core set into `$HOME`.
#[derive(Debug)]
pub struct LinkCore;

impl Stage for LinkCore {
    fn name(&self) -> &str {
        "Link core files"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.links.core().is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<StageOutcome> {
        if !ctx.confirm("Link core configuration files?", true)? {
            return Ok(StageOutcome::Declined);
        }
        let specs: Vec<LinkSpec> = ctx
            .config
            .links
            .core()
            .iter()
            .map(|name| LinkSpec::new(name, LinkCategory::Core, ctx.root(), &ctx.home))
            .collect();
        Ok(link_specs(ctx, &specs))
    }
}

/// Offer and link hidden files found in the repository root.
#[derive(Debug)]
pub struct LinkDiscovered;

impl LinkDiscovered {
    fn candidates(ctx: &Context) -> Result<Vec<String>> {
        discover(ctx.root(), &ctx.config.links.core(), &ctx.config.links.exclude)
            .with_context(|| format!("scanning {}", ctx.root().display()))
    }
}

impl Stage for LinkDiscovered {
    fn name(&self) -> &str {
        "Link discovered files"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        Self::candidates(ctx).map_or(true, |c| !c.is_empty())
    }

    fn run(&self, ctx: &Context) -> Result<StageOutcome> {
        let candidates = Self::candidates(ctx)?;
        if candidates.is_empty() {
            return Ok(StageOutcome::NotApplicable);
        }
        let default = ctx.flag_default(StageFlag::LinkDiscovered);

        let chosen = if ctx.interactive {
            ctx.log
                .info(&format!("found {} additional file(s)", candidates.len()));
            let mut chosen = Vec::new();
            for name in candidates {
                if ctx.confirm(&format!("Link {name}?"), default)? {
                    chosen.push(name);
                }
            }
            chosen
        } else if ctx.confirm(
            &format!("Link additional files ({})?", candidates.join(", ")),
            default,
        )? {
            candidates
        } else {
            Vec::new()
        };

        if chosen.is_empty() {
            return Ok(StageOutcome::Declined);
        }

        let specs: Vec<LinkSpec> = chosen
            .iter()
            .map(|name| LinkSpec::new(name, LinkCategory::Discovered, ctx.root(), &ctx.home))
            .collect();
        Ok(link_specs(ctx, &specs))
    }
}

/// Link `specs`, logging each entry, and turn failures into an outcome.
fn link_specs(ctx: &Context, specs: &[LinkSpec]) -> StageOutcome {
    let report = Linker::new(&ctx.backup).link_many(specs);

    for (name, result) in &report.entries {
        match result {
            Ok(LinkOutcome::Linked {
                backup: Some(backup),
            }) => ctx.log.info(&format!(
                "linked {name} (previous version moved to {})",
                backup.display()
            )),
            Ok(LinkOutcome::Linked { backup: None }) => ctx.log.debug(&format!("linked {name}")),
            Ok(LinkOutcome::Skipped(_)) => ctx.log.debug(&format!("ok: {name} (already linked)")),
            Err(e) => ctx.log.error(&format!("{name}: {e}")),
        }
    }

    let failed = report.failed();
    ctx.log.info(&format!(
        "{} linked, {} already ok, {} failed",
        report.linked(),
        report.skipped(),
        failed.len()
    ));

    if failed.is_empty() {
        StageOutcome::Done
    } else {
        StageOutcome::Failed(
            failed
                .iter()
                .map(|(name, e)| format!("link {name}: {e}"))
                .collect(),
        )
    }
}

#[cfg(all(test, unix))]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::ParameterDocument;
    use crate::prompt::MockConfirm;
    use crate::tasks::test_helpers::Sandbox;
    use std::sync::Arc;

    #[test]
    fn core_links_are_created() {
        let sandbox = Sandbox::new();
        let source = sandbox.repo_file(".zshrc", "zsh");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[".zshrc"]));

        assert_eq!(LinkCore.run(&ctx).unwrap(), StageOutcome::Done);
        assert_eq!(std::fs::read_link(sandbox.home.join(".zshrc")).unwrap(), source);
    }

    #[test]
    fn missing_core_source_is_reported_but_others_link() {
        let sandbox = Sandbox::new();
        sandbox.repo_file(".vimrc", "vim");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[".zshrc", ".vimrc"]));

        let StageOutcome::Failed(failures) = LinkCore.run(&ctx).unwrap() else {
            panic!("expected a failure");
        };
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("link .zshrc:"));
        assert!(sandbox.home.join(".vimrc").symlink_metadata().is_ok());
    }

    #[test]
    fn discovered_declined_by_default() {
        let sandbox = Sandbox::new();
        sandbox.repo_file(".zshrc", "");
        sandbox.repo_file(".aliases", "");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[".zshrc"]));

        assert!(LinkDiscovered.should_run(&ctx));
        assert_eq!(LinkDiscovered.run(&ctx).unwrap(), StageOutcome::Declined);
        assert!(sandbox.home.join(".aliases").symlink_metadata().is_err());
    }

    #[test]
    fn discovered_linked_when_flag_set() {
        let sandbox = Sandbox::new();
        sandbox.repo_file(".aliases", "");
        sandbox.repo_file(".gitignore", "");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));
        let ctx = ctx.with_parameters(
            ParameterDocument::from_json("t", r#"{"linkDiscovered": true}"#).unwrap(),
        );

        assert_eq!(LinkDiscovered.run(&ctx).unwrap(), StageOutcome::Done);
        assert!(sandbox.home.join(".aliases").symlink_metadata().is_ok());
        assert!(sandbox.home.join(".gitignore").symlink_metadata().is_err());
    }

    #[test]
    fn interactive_mode_confirms_each_candidate() {
        let sandbox = Sandbox::new();
        sandbox.repo_file(".aliases", "");
        sandbox.repo_file(".inputrc", "");
        let mut confirm = MockConfirm::new();
        confirm
            .expect_confirm()
            .withf(|q, _| q == "Link .aliases?")
            .times(1)
            .returning(|_, _| Ok(true));
        confirm
            .expect_confirm()
            .withf(|q, _| q == "Link .inputrc?")
            .times(1)
            .returning(|_, _| Ok(false));
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));
        let ctx = ctx.with_confirm(Arc::new(confirm), true);

        assert_eq!(LinkDiscovered.run(&ctx).unwrap(), StageOutcome::Done);
        assert!(sandbox.home.join(".aliases").symlink_metadata().is_ok());
        assert!(sandbox.home.join(".inputrc").symlink_metadata().is_err());
    }

    #[test]
    fn nothing_discovered_is_not_applicable() {
        let sandbox = Sandbox::new();
        sandbox.repo_file(".zshrc", "");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[".zshrc"]));
        assert!(!LinkDiscovered.should_run(&ctx));
    }
}
