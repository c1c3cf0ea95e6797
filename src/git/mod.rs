//! git
//!
//! The single doorway to Git.
//!
//! All repository access flows through [`interface::Git`]. Object and ref
//! operations use git2; rebase and remote transport shell out to the git
//! CLI, which owns the worktree machinery and the credential helpers that
//! libgit2 does not model well. No other module imports `git2` or spawns
//! a `git` process.

pub mod interface;
pub mod rebase;
pub mod remote;

pub use interface::{CommitInfo, Git, GitError, RepoInfo};
pub use rebase::RebaseOutcome;
pub use remote::{ForceMode, PushOutcome};

use std::path::Path;
use std::process::{Command, Output};

/// Run a git subcommand in `workdir`, capturing output.
///
/// Non-zero exit is not an error here; callers classify the output
/// themselves (a failing rebase may be a conflict, not a failure).
pub(crate) fn run_git(workdir: &Path, args: &[&str]) -> Result<Output, GitError> {
    tracing::debug!(?args, "git");
    Command::new("git")
        .args(args)
        .current_dir(workdir)
        .env("GIT_EDITOR", "true")
        .output()
        .map_err(|e| GitError::Internal {
            message: format!("failed to spawn git {}: {}", args.join(" "), e),
        })
}

/// Combined stdout+stderr of a git invocation, trimmed, for hint text.
pub(crate) fn combined_output(output: &Output) -> String {
    let mut text = String::new();
    text.push_str(String::from_utf8_lossy(&output.stdout).trim());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr);
    }
    text
}
