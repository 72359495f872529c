use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the provisioning toolkit.
#[derive(Parser, Debug)]
#[command(
    name = "dotstrap",
    about = "Link dotfiles with backups, render templates, install packages and apps",
    version = option_env!("DOTSTRAP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
)]
pub struct Cli {
    /// Subcommand to run; `install` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output (also enabled by DEBUG=1)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// The subcommand to run.
    #[must_use]
    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Install)
    }

    /// Whether debug output is enabled by `--verbose` or by `debug_env`
    /// (the value of `DEBUG`) being `1`.
    #[must_use]
    pub fn verbose_enabled(&self, debug_env: Option<&str>) -> bool {
        self.verbose || debug_env.is_some_and(|v| v.trim() == "1")
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Ask before each stage instead of using preset answers
    #[arg(short, long, global = true)]
    pub interactive: bool,

    /// JSON parameter document for templates and stage defaults
    #[arg(short, long, global = true, value_name = "FILE")]
    pub parameters: Option<PathBuf>,

    /// Fail template rendering on any unresolved placeholder
    #[arg(long, global = true)]
    pub strict: bool,

    /// Override the repository root directory
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run every stage: templates, links, packages, applications
    Install,
    /// Link core and discovered files into the home directory
    Link,
    /// Render configuration templates
    Render,
    /// Install Homebrew formulae and casks
    Packages,
    /// Install application bundles
    Apps,
    /// Report environment readiness and configuration problems
    Check(CheckOpts),
    /// Print shell completions to stdout
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Print version information
    Version,
}

impl Command {
    /// Short name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Link => "link",
            Self::Render => "render",
            Self::Packages => "packages",
            Self::Apps => "apps",
            Self::Check(_) => "check",
            Self::Completions { .. } => "completions",
            Self::Version => "version",
        }
    }
}

/// Options for the `check` subcommand.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOpts {
    /// Skip the network connectivity check
    #[arg(long)]
    pub offline: bool,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn command_factory_is_not_shadowed() {
        let command = Cli::command();
        assert_eq!(command.get_name(), "dotstrap");
        assert!(command.get_subcommands().any(|c| c.get_name() == "completions"));
    }

    #[test]
    fn no_subcommand_means_install() {
        let cli = Cli::parse_from(["dotstrap"]);
        assert_eq!(cli.subcommand(), Command::Install);
        assert!(!cli.global.interactive);
        assert!(cli.global.parameters.is_none());
    }

    #[test]
    fn parse_global_options_before_subcommand() {
        let cli = Cli::parse_from(["dotstrap", "-i", "-p", "params.json", "--strict", "render"]);
        assert!(cli.global.interactive);
        assert_eq!(cli.global.parameters, Some(PathBuf::from("params.json")));
        assert!(cli.global.strict);
        assert_eq!(cli.subcommand(), Command::Render);
    }

    #[test]
    fn parse_global_options_after_subcommand() {
        let cli = Cli::parse_from(["dotstrap", "link", "--root", "/repo", "--interactive"]);
        assert_eq!(cli.global.root, Some(PathBuf::from("/repo")));
        assert!(cli.global.interactive);
        assert_eq!(cli.subcommand(), Command::Link);
    }

    #[test]
    fn parse_check_offline() {
        let cli = Cli::parse_from(["dotstrap", "check", "--offline"]);
        assert_eq!(cli.subcommand(), Command::Check(CheckOpts { offline: true }));
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::parse_from(["dotstrap", "completions", "zsh"]);
        assert_eq!(
            cli.subcommand(),
            Command::Completions {
                shell: clap_complete::Shell::Zsh
            }
        );
    }

    #[test]
    fn debug_env_enables_verbose() {
        let cli = Cli::parse_from(["dotstrap"]);
        assert!(!cli.verbose_enabled(None));
        assert!(!cli.verbose_enabled(Some("0")));
        assert!(cli.verbose_enabled(Some("1")));

        let cli = Cli::parse_from(["dotstrap", "-v"]);
        assert!(cli.verbose_enabled(None));
    }

    #[test]
    fn command_names() {
        assert_eq!(Command::Install.name(), "install");
        assert_eq!(Command::Check(CheckOpts::default()).name(), "check");
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["dotstrap", "uninstall"]).is_err());
    }
}
