//! git::rebase
//!
//! Rebase operations, driven through the git CLI.
//!
//! libgit2 does not drive worktree rebases, so these shell out. A failing
//! `git rebase` is classified by inspecting repository state, not output
//! text: if a rebase is now in progress the outcome is a conflict; the
//! one piece of output we do match is "no rebase in progress" on
//! continue/skip/abort.

use crate::core::types::{BranchName, Oid};

use super::interface::{Git, GitError};
use super::{combined_output, run_git};

/// Outcome of a rebase invocation.
///
/// Conflicts are a normal, resumable outcome, not an error: the caller
/// persists its state and returns control to the human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// Commits were replayed; the branch moved.
    Updated,
    /// Nothing to replay; the branch already sat on the target.
    AlreadyUpToDate,
    /// The rebase stopped on conflicts and awaits resolution.
    Conflict {
        /// One-line description for the user.
        headline: String,
        /// Captured git output, surfaced verbatim.
        hint: String,
    },
    /// Continue/skip/abort was called with no rebase in progress.
    NotInProgress,
}

impl RebaseOutcome {
    /// Whether this outcome suspended the operation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RebaseOutcome::Conflict { .. })
    }
}

impl Git {
    /// Start `git rebase --onto <onto> <upstream> <branch>`.
    ///
    /// Replays the commits of `branch` that are not reachable from
    /// `upstream` onto `onto`. Using the previously-synced parent head as
    /// `upstream` is what keeps orphaned parent commits from being
    /// dragged along after the parent itself was rebased.
    pub fn rebase_onto(
        &self,
        branch: &BranchName,
        upstream: &Oid,
        onto: &Oid,
    ) -> Result<RebaseOutcome, GitError> {
        let output = run_git(
            self.work_dir(),
            &[
                "rebase",
                "--onto",
                onto.as_str(),
                upstream.as_str(),
                branch.as_str(),
            ],
        )?;

        if output.status.success() {
            let text = combined_output(&output);
            if text.contains("is up to date") {
                return Ok(RebaseOutcome::AlreadyUpToDate);
            }
            return Ok(RebaseOutcome::Updated);
        }

        if self.rebase_in_progress() {
            return Ok(RebaseOutcome::Conflict {
                headline: format!("conflict while rebasing '{branch}'"),
                hint: combined_output(&output),
            });
        }

        Err(GitError::Subprocess {
            command: format!("rebase --onto {} {} {}", onto.short(12), upstream.short(12), branch),
            stderr: combined_output(&output),
        })
    }

    /// Continue the in-progress rebase after conflict resolution.
    pub fn rebase_continue(&self) -> Result<RebaseOutcome, GitError> {
        self.rebase_step("--continue")
    }

    /// Skip the current commit of the in-progress rebase.
    pub fn rebase_skip(&self) -> Result<RebaseOutcome, GitError> {
        self.rebase_step("--skip")
    }

    /// Abort the in-progress rebase. Aborting with none in progress is
    /// not an error.
    pub fn rebase_abort(&self) -> Result<(), GitError> {
        if !self.rebase_in_progress() {
            return Ok(());
        }
        let output = run_git(self.work_dir(), &["rebase", "--abort"])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(GitError::Subprocess {
                command: "rebase --abort".into(),
                stderr: combined_output(&output),
            })
        }
    }

    /// Whether git has a rebase in progress in this worktree.
    pub fn rebase_in_progress(&self) -> bool {
        let git_dir = self.git_dir();
        git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists()
    }

    fn rebase_step(&self, mode: &str) -> Result<RebaseOutcome, GitError> {
        let output = run_git(self.work_dir(), &["rebase", mode])?;

        if output.status.success() {
            return Ok(RebaseOutcome::Updated);
        }

        let text = combined_output(&output);
        // Documented exception: this message is the one we key off.
        if text.contains("No rebase in progress") || text.contains("no rebase in progress") {
            return Ok(RebaseOutcome::NotInProgress);
        }

        if self.rebase_in_progress() {
            return Ok(RebaseOutcome::Conflict {
                headline: format!("rebase {mode} stopped on conflicts"),
                hint: text,
            });
        }

        Err(GitError::Subprocess {
            command: format!("rebase {mode}"),
            stderr: text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    /// Build a repo with a real worktree file history:
    /// main: A-B, feat: A-Q (so rebasing feat onto B replays Q).
    fn fixture() -> (TempDir, Git) {
        let dir = TempDir::new().unwrap();
        let run = |args: &[&str]| {
            let status = Command::new("git")
                .args(args)
                .current_dir(dir.path())
                .env("GIT_AUTHOR_NAME", "Test")
                .env("GIT_AUTHOR_EMAIL", "test@example.com")
                .env("GIT_COMMITTER_NAME", "Test")
                .env("GIT_COMMITTER_EMAIL", "test@example.com")
                .status()
                .unwrap();
            assert!(status.success(), "git {args:?} failed");
        };
        run(&["init", "--quiet", "-b", "main"]);
        std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "--quiet", "-m", "A"]);
        run(&["checkout", "--quiet", "-b", "feat"]);
        std::fs::write(dir.path().join("q.txt"), "q\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "--quiet", "-m", "Q"]);
        run(&["checkout", "--quiet", "main"]);
        std::fs::write(dir.path().join("b.txt"), "b\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "--quiet", "-m", "B"]);

        let git = Git::open(dir.path()).unwrap();
        (dir, git)
    }

    #[test]
    fn rebase_replays_onto_new_base() {
        let (_dir, git) = fixture();
        let feat = BranchName::new("feat").unwrap();
        let main_head = git.resolve("main").unwrap().unwrap();
        let old_base = git.resolve("main~1").unwrap().unwrap();

        let outcome = git.rebase_onto(&feat, &old_base, &main_head).unwrap();
        assert_eq!(outcome, RebaseOutcome::Updated);

        // feat now sits on main's head.
        let feat_head = git.resolve("feat").unwrap().unwrap();
        assert_eq!(git.merge_base(&feat_head, &main_head).unwrap(), Some(main_head));
    }

    #[test]
    fn rebase_onto_same_base_is_up_to_date() {
        let (_dir, git) = fixture();
        let feat = BranchName::new("feat").unwrap();
        let old_base = git.resolve("main~1").unwrap().unwrap();
        let head_before = git.resolve("feat").unwrap().unwrap();

        // upstream == onto: nothing to move.
        let outcome = git.rebase_onto(&feat, &old_base, &old_base).unwrap();
        assert!(matches!(
            outcome,
            RebaseOutcome::AlreadyUpToDate | RebaseOutcome::Updated
        ));
        assert_eq!(git.resolve("feat").unwrap().unwrap(), head_before);
    }

    #[test]
    fn no_rebase_in_progress_detected() {
        let (_dir, git) = fixture();
        assert!(!git.rebase_in_progress());
        assert_eq!(git.rebase_continue().unwrap(), RebaseOutcome::NotInProgress);
        assert_eq!(git.rebase_skip().unwrap(), RebaseOutcome::NotInProgress);
        git.rebase_abort().unwrap();
    }

    #[test]
    fn conflicting_rebase_pauses_then_aborts() {
        let dir = TempDir::new().unwrap();
        let run = |args: &[&str]| {
            let status = Command::new("git")
                .args(args)
                .current_dir(dir.path())
                .env("GIT_AUTHOR_NAME", "Test")
                .env("GIT_AUTHOR_EMAIL", "test@example.com")
                .env("GIT_COMMITTER_NAME", "Test")
                .env("GIT_COMMITTER_EMAIL", "test@example.com")
                .status()
                .unwrap();
            assert!(status.success(), "git {args:?} failed");
        };
        run(&["init", "--quiet", "-b", "main"]);
        std::fs::write(dir.path().join("f.txt"), "base\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "--quiet", "-m", "A"]);
        run(&["checkout", "--quiet", "-b", "feat"]);
        std::fs::write(dir.path().join("f.txt"), "feat\n").unwrap();
        run(&["commit", "--quiet", "-am", "Q"]);
        run(&["checkout", "--quiet", "main"]);
        std::fs::write(dir.path().join("f.txt"), "trunk\n").unwrap();
        run(&["commit", "--quiet", "-am", "B"]);

        let git = Git::open(dir.path()).unwrap();
        let feat = BranchName::new("feat").unwrap();
        let main_head = git.resolve("main").unwrap().unwrap();
        let old_base = git.resolve("main~1").unwrap().unwrap();

        let outcome = git.rebase_onto(&feat, &old_base, &main_head).unwrap();
        assert!(outcome.is_conflict());
        assert!(git.rebase_in_progress());

        git.rebase_abort().unwrap();
        assert!(!git.rebase_in_progress());
    }
}
