use std::sync::Arc;

use anyhow::Result;

use crate::cancel::CancelFlag;
use crate::cli::{Command, GlobalOpts};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::orchestrator::{Orchestrator, RunOutcome};
use crate::tasks::{self, Stage, apps, links, packages, templates};

/// Stages run by a provisioning subcommand, in order.
///
/// `install` runs the full sequence; the other subcommands run the matching
/// subset. Non-provisioning subcommands get an empty list.
#[must_use]
pub fn stages_for(command: &Command) -> Vec<Box<dyn Stage>> {
    match command {
        Command::Install => tasks::install_stages(),
        Command::Link => vec![Box::new(links::LinkCore), Box::new(links::LinkDiscovered)],
        Command::Render => vec![Box::new(templates::RenderTemplates)],
        Command::Packages => vec![Box::new(packages::InstallPackages)],
        Command::Apps => vec![Box::new(apps::InstallApps)],
        Command::Check(_) | Command::Completions { .. } | Command::Version => Vec::new(),
    }
}

/// Run a provisioning subcommand.
///
/// # Errors
///
/// Returns an error if the environment is not fit for provisioning or the
/// parameters or configuration cannot be loaded. Stage failures are part of
/// the returned [`RunOutcome`].
pub fn run(
    global: &GlobalOpts,
    command: &Command,
    log: &Arc<Logger>,
    cancel: CancelFlag,
) -> Result<RunOutcome> {
    let version = option_env!("DOTSTRAP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("dotstrap {version}"));

    let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
    let setup = super::CommandSetup::init(global, log, executor.as_ref())?;
    let ctx = setup.into_context(global, Arc::clone(log) as Arc<dyn Log>, executor, cancel);
    ctx.log.debug(&format!("backups go to {}", ctx.backup.root().display()));

    Ok(Orchestrator::new(stages_for(command)).run(&ctx))
}
