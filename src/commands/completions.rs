//! Command: print shell completions.
use std::io;

use clap::CommandFactory as _;
use clap_complete::Shell;

use crate::cli::Cli;

/// Write completions for `shell` to `out`.
pub fn generate(shell: Shell, out: &mut dyn io::Write) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, out);
}

/// Print completions for `shell` to stdout.
pub fn run(shell: Shell) {
    generate(shell, &mut io::stdout().lock());
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zsh_completions_name_the_binary() {
        let mut out = Vec::new();
        generate(Shell::Zsh, &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("#compdef dotstrap"));
        assert!(script.contains("completions"));
    }
}
