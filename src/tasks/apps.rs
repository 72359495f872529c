use anyhow::Result;

use super::{Context, Stage, StageOutcome};
use crate::config::StageFlag;
use crate::error::DotstrapError;
use crate::resources::app::AppResource;
use crate::resources::{Resource as _, ResourceChange};

/// Download and install configured application bundles.
///
/// Each application is handled on its own: a failed download or a bad
/// checksum is recorded and the next one is tried. An interrupt ends the
/// stage at once, even part way through one application.
#[derive(Debug)]
pub struct InstallApps;

impl Stage for InstallApps {
    fn name(&self) -> &str {
        "Install applications"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.apps.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<StageOutcome> {
        if !ctx.confirm(
            "Install applications?",
            ctx.flag_default(StageFlag::InstallApps),
        )? {
            return Ok(StageOutcome::Declined);
        }

        let mut failures = Vec::new();
        let mut installed = 0usize;
        let mut present = 0usize;
        for entry in &ctx.config.apps {
            ctx.cancel.ensure_running()?;
            let resource = AppResource::new(
                entry,
                &ctx.applications_dir,
                ctx.executor.as_ref(),
                &ctx.cancel,
            );
            ctx.log.debug(&format!("checking {}", resource.description()));
            match resource.apply() {
                Ok(ResourceChange::Installed) => {
                    installed += 1;
                    ctx.log.info(&format!(
                        "installed {} to {}",
                        entry.name,
                        resource.target().display()
                    ));
                }
                Ok(ResourceChange::AlreadyPresent) => {
                    present += 1;
                    ctx.log.debug(&format!("ok: {} (already installed)", entry.name));
                }
                Err(e) if DotstrapError::is_cancellation(&e) => return Err(e),
                Err(e) => {
                    ctx.log.error(&format!("{}: {e:#}", entry.name));
                    failures.push(format!("app {}: {e:#}", entry.name));
                }
            }
        }

        ctx.log.info(&format!(
            "{installed} installed, {present} already present, {} failed",
            failures.len()
        ));
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
    use crate::cancel::CancelFlag;
    use crate::config::ParameterDocument;
    use crate::config::apps::{AppEntry, AppFormat};
    use crate::exec::{ExecResult, Executor};
    use crate::prompt::MockConfirm;
    use crate::resources::test_helpers::MockExecutor;
    use crate::tasks::test_helpers::Sandbox;
    use std::sync::{Arc, Mutex};

    fn app(name: &str) -> AppEntry {
        AppEntry {
            name: name.to_string(),
            bundle: format!("{name}.app"),
            url: format!("https://example.com/{name}.dmg"),
            format: AppFormat::Dmg,
            sha256: None,
        }
    }

    fn opted_in() -> ParameterDocument {
        ParameterDocument::from_json("t", r#"{"installApps": true}"#).unwrap()
    }

    #[test]
    fn skipped_when_nothing_configured() {
        let sandbox = Sandbox::new();
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));
        assert!(!InstallApps.should_run(&ctx));
    }

    #[test]
    fn declined_by_default() {
        let sandbox = Sandbox::new();
        let mut config = sandbox.config(&[]);
        config.apps = vec![app("Rectangle")];
        let (ctx, _log) = sandbox.quiet_context(config);

        assert_eq!(InstallApps.run(&ctx).unwrap(), StageOutcome::Declined);
    }

    #[test]
    fn present_apps_need_no_commands() {
        let sandbox = Sandbox::new();
        let mut config = sandbox.config(&[]);
        config.apps = vec![app("Rectangle")];
        std::fs::create_dir_all(sandbox.home.join("Applications/Rectangle.app")).unwrap();
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (ctx, _log) = sandbox.context(config, executor.clone());
        let ctx = ctx.with_parameters(opted_in());

        assert_eq!(InstallApps.run(&ctx).unwrap(), StageOutcome::Done);
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn failed_download_does_not_stop_other_apps() {
        let sandbox = Sandbox::new();
        let mut config = sandbox.config(&[]);
        config.apps = vec![app("Broken"), app("Rectangle")];
        std::fs::create_dir_all(sandbox.home.join("Applications/Rectangle.app")).unwrap();
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (false, String::new()),
            (false, String::new()),
            (false, String::new()),
        ]));
        let (ctx, _log) = sandbox.context(config, executor.clone());
        let ctx = ctx.with_parameters(opted_in());

        let StageOutcome::Failed(failures) = InstallApps.run(&ctx).unwrap() else {
            panic!("download should fail");
        };
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("app Broken:"));
        assert!(failures[0].contains("failed after 3 attempts"));
        assert_eq!(executor.call_count(), 3);
    }

    /// Fails the first `curl` after raising the cancel flag, as an
    /// interrupt delivered to the whole process group would.
    #[derive(Debug)]
    struct InterruptedCurl {
        cancel: CancelFlag,
        calls: Mutex<Vec<String>>,
    }

    impl Executor for InterruptedCurl {
        fn run(&self, program: &str, _: &[&str]) -> Result<ExecResult> {
            self.calls.lock().unwrap().push(program.to_string());
            if program == "curl" {
                self.cancel.cancel();
            }
            anyhow::bail!("{program} killed by signal")
        }

        fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
            self.run(program, args)
        }

        fn which(&self, _: &str) -> bool {
            true
        }
    }

    #[test]
    fn interrupt_during_download_cancels_the_stage() {
        let sandbox = Sandbox::new();
        let mut config = sandbox.config(&[]);
        config.apps = vec![app("Rectangle"), app("Alfred")];
        let cancel = CancelFlag::new();
        let executor = Arc::new(InterruptedCurl {
            cancel: cancel.clone(),
            calls: Mutex::new(Vec::new()),
        });
        let (ctx, log) = sandbox.context(config, executor.clone());
        let ctx = ctx.with_cancel(cancel).with_parameters(opted_in());

        let outcome = crate::tasks::execute(&InstallApps, &ctx);

        assert_eq!(outcome, StageOutcome::Cancelled);
        assert_eq!(*executor.calls.lock().unwrap(), vec!["curl"]);
        assert!(!sandbox.home.join("Applications/Rectangle.app").exists());
        assert!(log.stage_entries().is_empty());
    }

    #[test]
    fn cancellation_stops_before_next_app() {
        let sandbox = Sandbox::new();
        let mut config = sandbox.config(&[]);
        config.apps = vec![app("Rectangle")];
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (ctx, _log) = sandbox.context(config, executor.clone());

        let flag = ctx.cancel.clone();
        let mut confirm = MockConfirm::new();
        confirm.expect_confirm().returning(move |_, _| {
            flag.cancel();
            Ok(true)
        });
        let ctx = ctx.with_confirm(Arc::new(confirm), false);

        let err = InstallApps.run(&ctx).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DotstrapError>(),
            Some(DotstrapError::Cancelled)
        ));
        assert_eq!(executor.call_count(), 0);
    }
}
