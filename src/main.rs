use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use dotstrap::cancel::CancelFlag;
use dotstrap::cli::{Cli, Command};
use dotstrap::commands;
use dotstrap::logging::{self, Logger};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.subcommand();

    match &command {
        Command::Completions { shell } => {
            commands::completions::run(*shell);
            return ExitCode::SUCCESS;
        }
        Command::Version => {
            return match commands::version::run() {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        _ => {}
    }

    let verbose = cli.verbose_enabled(std::env::var("DEBUG").ok().as_deref());
    logging::init_subscriber(verbose, command.name());
    let log = Arc::new(Logger::new(command.name()));

    let cancel = CancelFlag::new();
    if let Err(e) = cancel.install_handler() {
        log.warn(&format!("{e:#}"));
    }

    let result = match &command {
        Command::Check(opts) => commands::check::run(&cli.global, opts, &log),
        _ => commands::install::run(&cli.global, &command, &log, cancel),
    };

    match result {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
