//! cli::commands::completion
//!
//! Shell completion generation.

use clap::CommandFactory;
use clap_complete::{generate, shells};

use crate::cli::args::{Cli, Shell};

use super::EXIT_OK;

/// Generate a completion script on stdout.
pub fn completion(shell: Shell) -> anyhow::Result<i32> {
    let mut command = Cli::command();
    let mut out = std::io::stdout();
    match shell {
        Shell::Bash => generate(shells::Bash, &mut command, "av", &mut out),
        Shell::Zsh => generate(shells::Zsh, &mut command, "av", &mut out),
        Shell::Fish => generate(shells::Fish, &mut command, "av", &mut out),
        Shell::Elvish => generate(shells::Elvish, &mut command, "av", &mut out),
        Shell::Powershell => generate(shells::PowerShell, &mut command, "av", &mut out),
    }
    Ok(EXIT_OK)
}
