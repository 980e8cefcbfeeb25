//! Shell completion generation for the laprun CLI.
//!
//! Provides the `laprun completions` subcommand to generate shell completion
//! scripts for bash, zsh, fish, and PowerShell.

use std::io::{self, Write};

use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::{Shell, generate};

/// Arguments for the completions subcommand.
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellArg,

    /// Override the binary name used in the completion script
    #[arg(long, default_value = "laprun")]
    pub name: String,
}

/// Shell options for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShellArg {
    /// Bash shell completions
    Bash,
    /// Zsh shell completions
    Zsh,
    /// Fish shell completions
    Fish,
    /// PowerShell completions
    PowerShell,
}

impl From<ShellArg> for Shell {
    fn from(arg: ShellArg) -> Self {
        match arg {
            ShellArg::Bash => Shell::Bash,
            ShellArg::Zsh => Shell::Zsh,
            ShellArg::Fish => Shell::Fish,
            ShellArg::PowerShell => Shell::PowerShell,
        }
    }
}

/// Writes the completion script for `args.shell` to `out`.
pub fn write_completions(args: &CompletionsArgs, out: &mut dyn Write) {
    let shell: Shell = args.shell.into();
    let mut cmd = crate::Cli::command();
    generate(shell, &mut cmd, args.name.clone(), out);
}

/// Generates shell completions on stdout.
pub fn generate_completions(args: &CompletionsArgs) {
    write_completions(args, &mut io::stdout());
}
