//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! Global flags available on every command:
//! - `--cwd <path>`: run as if started in that directory
//! - `--debug`: enable diagnostic logging
//! - `--quiet` / `-q`: minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// av - stacked branches and pull requests on top of Git
#[derive(Parser, Debug)]
#[command(name = "av")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if av was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Shells supported for completion generation.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Elvish,
    Powershell,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize av in this repository
    #[command(name = "init")]
    Init {
        /// Additional trunk branch to recognize
        #[arg(long)]
        trunk: Option<String>,

        /// Reinitialize even if already initialized
        #[arg(long)]
        force: bool,
    },

    /// Start tracking an existing branch
    #[command(name = "adopt")]
    Adopt {
        /// Branch to adopt (defaults to current)
        branch: Option<String>,

        /// Parent branch (inferred from history when omitted)
        #[arg(long, short)]
        parent: Option<String>,
    },

    /// Stop tracking a branch
    #[command(name = "untrack")]
    Untrack {
        /// Branch to untrack (defaults to current)
        branch: Option<String>,
    },

    /// Sync the stack with trunk and the forge
    #[command(name = "sync")]
    Sync {
        /// Sync only the current branch and its descendants
        #[arg(long)]
        current: bool,

        /// Rebase children of merged parents onto the trunk head instead
        /// of the merge commit
        #[arg(long)]
        trunk: bool,

        /// Do not push or update requests
        #[arg(long)]
        no_push: bool,

        /// Do not fetch or refresh requests
        #[arg(long)]
        no_fetch: bool,

        /// Reparent the current branch onto this branch first
        #[arg(long)]
        parent: Option<String>,

        /// Delete merged, fully-integrated leaf branches
        #[arg(long)]
        prune: bool,

        /// Continue after resolving conflicts
        #[arg(long = "continue", conflicts_with_all = ["abort", "skip"])]
        cont: bool,

        /// Abort the suspended sync
        #[arg(long, conflicts_with = "skip")]
        abort: bool,

        /// Skip the conflicting commit and continue
        #[arg(long)]
        skip: bool,
    },

    /// Rebase tracked branches onto their recorded parents
    #[command(name = "restack")]
    Restack {
        /// Restack every tracked branch
        #[arg(long, conflicts_with = "current")]
        all: bool,

        /// Restack the current branch and its ancestors only
        #[arg(long)]
        current: bool,

        /// Continue after resolving conflicts
        #[arg(long = "continue", conflicts_with_all = ["abort", "skip"])]
        cont: bool,

        /// Abort the suspended restack
        #[arg(long, conflicts_with = "skip")]
        abort: bool,

        /// Skip the conflicting commit and continue
        #[arg(long)]
        skip: bool,
    },

    /// Move the current branch (and its subtree) onto a new parent
    #[command(name = "reparent")]
    Reparent {
        /// The new parent branch
        new_parent: String,
    },

    /// Create or surface the pull request for the current branch
    #[command(name = "pr")]
    Pr {
        /// Create as draft
        #[arg(long)]
        draft: bool,
    },

    /// Generate shell completion scripts
    #[command(name = "completion")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
