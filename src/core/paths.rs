//! core::paths
//!
//! Centralized path routing for everything stored under `.git/av/`.
//!
//! All persistent engine state lives in the repository's private state
//! directory:
//!
//! - `repository.json` — forge repository record
//! - `config.toml` — repository configuration
//! - `lock` — exclusive operation lock
//! - `stack-sync.state.json` — in-progress sync state
//! - `sequencer.<kind>.state.json` — in-progress rebase sequence
//!
//! Paths are computed from the repository's *common* git dir so linked
//! worktrees share one set of state files. No code outside this module
//! joins `"av"` onto a git dir by hand.

use std::path::{Path, PathBuf};

/// Path routing for the `.git/av/` state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvPaths {
    /// The shared git directory (refs, objects, config). For a linked
    /// worktree this is the parent repository's git dir.
    common_dir: PathBuf,
}

impl AvPaths {
    /// Create path routing rooted at the given common git dir.
    pub fn new(common_dir: impl Into<PathBuf>) -> Self {
        Self {
            common_dir: common_dir.into(),
        }
    }

    /// The state directory: `<common_dir>/av`.
    pub fn state_dir(&self) -> PathBuf {
        self.common_dir.join("av")
    }

    /// The repository record: `<common_dir>/av/repository.json`.
    pub fn repository_record(&self) -> PathBuf {
        self.state_dir().join("repository.json")
    }

    /// Repository configuration: `<common_dir>/av/config.toml`.
    pub fn repo_config(&self) -> PathBuf {
        self.state_dir().join("config.toml")
    }

    /// The exclusive operation lock: `<common_dir>/av/lock`.
    pub fn lock_file(&self) -> PathBuf {
        self.state_dir().join("lock")
    }

    /// Orchestrator sync state: `<common_dir>/av/stack-sync.state.json`.
    pub fn sync_state(&self) -> PathBuf {
        self.state_dir().join("stack-sync.state.json")
    }

    /// Sequencer state for a given kind:
    /// `<common_dir>/av/sequencer.<kind>.state.json`.
    pub fn sequencer_state(&self, kind: &str) -> PathBuf {
        self.state_dir().join(format!("sequencer.{kind}.state.json"))
    }

    /// The common git dir this routing is rooted at.
    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }

    /// Ensure the state directory exists.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.state_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> AvPaths {
        AvPaths::new("/repo/.git")
    }

    #[test]
    fn state_dir_under_common_dir() {
        assert_eq!(paths().state_dir(), PathBuf::from("/repo/.git/av"));
    }

    #[test]
    fn file_locations() {
        let p = paths();
        assert_eq!(
            p.repository_record(),
            PathBuf::from("/repo/.git/av/repository.json")
        );
        assert_eq!(p.repo_config(), PathBuf::from("/repo/.git/av/config.toml"));
        assert_eq!(p.lock_file(), PathBuf::from("/repo/.git/av/lock"));
        assert_eq!(
            p.sync_state(),
            PathBuf::from("/repo/.git/av/stack-sync.state.json")
        );
    }

    #[test]
    fn sequencer_state_keyed_by_kind() {
        let p = paths();
        assert_eq!(
            p.sequencer_state("sync"),
            PathBuf::from("/repo/.git/av/sequencer.sync.state.json")
        );
        assert_eq!(
            p.sequencer_state("reparent"),
            PathBuf::from("/repo/.git/av/sequencer.reparent.state.json")
        );
    }

    #[test]
    fn worktree_paths_use_common_dir() {
        // A linked worktree routes through the parent repo's git dir.
        let p = AvPaths::new("/repo/.git");
        assert_eq!(p.common_dir(), Path::new("/repo/.git"));
    }
}
