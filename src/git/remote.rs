//! git::remote
//!
//! Fetch, ls-remote, and push, driven through the git CLI so credential
//! helpers and transport configuration behave exactly as they do for the
//! user's own git invocations.

use crate::core::types::{BranchName, Oid, RefName};

use super::interface::{Git, GitError};
use super::{combined_output, run_git};

/// How hard to push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Plain push; rejected on any non-fast-forward.
    None,
    /// `--force`: overwrite unconditionally.
    Force,
    /// `--force-with-lease`: overwrite only if the remote still points
    /// where our remote-tracking ref says it does.
    ForceWithLease,
}

/// Result of a push that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote ref moved.
    Pushed,
    /// The remote was already at the local head; nothing sent.
    UpToDate,
}

impl Git {
    /// Fetch refspecs from a remote, updating remote-tracking refs.
    pub fn fetch(&self, remote: &str, refspecs: &[&str]) -> Result<(), GitError> {
        let mut args = vec!["fetch", "--quiet", remote];
        args.extend_from_slice(refspecs);
        let output = run_git(self.work_dir(), &args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(GitError::Subprocess {
                command: format!("fetch {remote}"),
                stderr: combined_output(&output),
            })
        }
    }

    /// List refs advertised by a remote as (oid, refname) pairs.
    pub fn ls_remote(&self, remote: &str) -> Result<Vec<(Oid, String)>, GitError> {
        let output = run_git(self.work_dir(), &["ls-remote", "--quiet", remote])?;
        if !output.status.success() {
            return Err(GitError::Subprocess {
                command: format!("ls-remote {remote}"),
                stderr: combined_output(&output),
            });
        }

        let mut entries = Vec::new();
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            let mut parts = line.split_whitespace();
            let (Some(hash), Some(name)) = (parts.next(), parts.next()) else {
                continue;
            };
            if let Ok(oid) = Oid::new(hash) {
                entries.push((oid, name.to_string()));
            }
        }
        Ok(entries)
    }

    /// Push a branch.
    ///
    /// `skip_policies` passes `--no-verify`, suppressing pre-push hooks.
    ///
    /// # Errors
    ///
    /// - [`GitError::NonFastForward`] when the remote rejected the update
    /// - [`GitError::RemoteMissing`] when the remote is not configured
    pub fn push(
        &self,
        remote: &str,
        branch: &BranchName,
        force: ForceMode,
        skip_policies: bool,
    ) -> Result<PushOutcome, GitError> {
        // Skip the network round-trip when the remote-tracking ref is
        // already at the local head.
        if force != ForceMode::Force {
            let local = self.branch_head(branch)?;
            let remote_tracking = self.remote_head(remote, branch)?;
            if local.is_some() && local == remote_tracking {
                return Ok(PushOutcome::UpToDate);
            }
        }

        let mut args = vec!["push", "--quiet"];
        match force {
            ForceMode::None => {}
            ForceMode::Force => args.push("--force"),
            ForceMode::ForceWithLease => args.push("--force-with-lease"),
        }
        if skip_policies {
            args.push("--no-verify");
        }
        args.push(remote);
        args.push(branch.as_str());

        let output = run_git(self.work_dir(), &args)?;
        if output.status.success() {
            return Ok(PushOutcome::Pushed);
        }

        let stderr = combined_output(&output);
        if stderr.contains("does not appear to be a git repository")
            || stderr.contains("No such remote")
            || stderr.contains("Could not read from remote repository")
        {
            return Err(GitError::RemoteMissing {
                remote: remote.to_string(),
            });
        }
        if stderr.contains("non-fast-forward")
            || stderr.contains("stale info")
            || stderr.contains("[rejected]")
            || stderr.contains("fetch first")
        {
            return Err(GitError::NonFastForward {
                branch: branch.to_string(),
            });
        }
        Err(GitError::Subprocess {
            command: format!("push {remote} {branch}"),
            stderr,
        })
    }

    /// Fast-forward a local branch to `to` when it is strictly behind.
    ///
    /// Returns whether the ref moved. Diverged branches are left alone:
    /// trunks are never force-reset by the engine.
    pub fn fast_forward_branch(&self, branch: &BranchName, to: &Oid) -> Result<bool, GitError> {
        let Some(head) = self.branch_head(branch)? else {
            return Ok(false);
        };
        if &head == to || !self.is_ancestor(&head, to)? {
            return Ok(false);
        }

        if self.current_branch()? == Some(branch.clone()) {
            // Checked out: the worktree must advance too.
            let output = run_git(self.work_dir(), &["merge", "--ff-only", "--quiet", to.as_str()])?;
            if !output.status.success() {
                return Err(GitError::Subprocess {
                    command: format!("merge --ff-only {}", to.short(12)),
                    stderr: combined_output(&output),
                });
            }
        } else {
            self.update_ref(&RefName::for_branch(branch), Some(to))?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn sh(dir: &std::path::Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "Test")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "Test")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    /// A local clone with a bare "origin" so fetch/push hit a real remote.
    fn clone_with_origin() -> (TempDir, TempDir, Git) {
        let origin = TempDir::new().unwrap();
        sh(origin.path(), &["init", "--quiet", "--bare", "-b", "main"]);

        let seed = TempDir::new().unwrap();
        sh(seed.path(), &["init", "--quiet", "-b", "main"]);
        std::fs::write(seed.path().join("a.txt"), "a\n").unwrap();
        sh(seed.path(), &["add", "."]);
        sh(seed.path(), &["commit", "--quiet", "-m", "A"]);
        sh(
            seed.path(),
            &["remote", "add", "origin", origin.path().to_str().unwrap()],
        );
        sh(seed.path(), &["push", "--quiet", "origin", "main"]);

        let git = Git::open(seed.path()).unwrap();
        (origin, seed, git)
    }

    #[test]
    fn fetch_updates_remote_tracking_ref() {
        let (_origin, seed, git) = clone_with_origin();
        sh(seed.path(), &["fetch", "--quiet", "origin"]);
        git.fetch("origin", &["main"]).unwrap();
        let main = BranchName::new("main").unwrap();
        assert!(git.remote_head("origin", &main).unwrap().is_some());
    }

    #[test]
    fn push_new_branch_then_up_to_date() {
        let (_origin, seed, git) = clone_with_origin();
        sh(seed.path(), &["checkout", "--quiet", "-b", "feat"]);
        std::fs::write(seed.path().join("f.txt"), "f\n").unwrap();
        sh(seed.path(), &["add", "."]);
        sh(seed.path(), &["commit", "--quiet", "-m", "F"]);

        let feat = BranchName::new("feat").unwrap();
        let outcome = git
            .push("origin", &feat, ForceMode::ForceWithLease, false)
            .unwrap();
        assert_eq!(outcome, PushOutcome::Pushed);

        // Remote-tracking ref is current after push; second push is a no-op.
        git.fetch("origin", &["feat"]).unwrap();
        let outcome = git
            .push("origin", &feat, ForceMode::ForceWithLease, false)
            .unwrap();
        assert_eq!(outcome, PushOutcome::UpToDate);
    }

    #[test]
    fn push_to_missing_remote_is_typed() {
        let (_origin, _seed, git) = clone_with_origin();
        let main = BranchName::new("main").unwrap();
        let err = git.push("nowhere", &main, ForceMode::None, false);
        assert!(matches!(
            err,
            Err(GitError::RemoteMissing { .. }) | Err(GitError::Subprocess { .. })
        ));
    }

    #[test]
    fn ls_remote_lists_heads() {
        let (_origin, _seed, git) = clone_with_origin();
        let refs = git.ls_remote("origin").unwrap();
        assert!(refs.iter().any(|(_, name)| name == "refs/heads/main"));
    }

    #[test]
    fn fast_forward_unchecked_out_branch() {
        let (_origin, seed, git) = clone_with_origin();
        // Create a stale branch pointing at main's parentless commit, then
        // advance main.
        sh(seed.path(), &["branch", "stale", "main"]);
        std::fs::write(seed.path().join("b.txt"), "b\n").unwrap();
        sh(seed.path(), &["add", "."]);
        sh(seed.path(), &["commit", "--quiet", "-m", "B"]);

        let stale = BranchName::new("stale").unwrap();
        let target = git.resolve("main").unwrap().unwrap();
        assert!(git.fast_forward_branch(&stale, &target).unwrap());
        assert_eq!(git.branch_head(&stale).unwrap(), Some(target.clone()));

        // Already there: no movement.
        assert!(!git.fast_forward_branch(&stale, &target).unwrap());
    }
}
