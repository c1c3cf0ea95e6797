//! git::interface
//!
//! Typed wrapper around a local Git repository, built on git2.
//!
//! Errors are normalized into [`GitError`] variants so callers can react
//! to categories (ref missing, object missing, dirty worktree) instead of
//! parsing messages. Shell-level text from subprocess operations is
//! surfaced verbatim to the user but never drives control flow, with the
//! single documented exception of rebase's "no rebase in progress".

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{BranchName, Oid, RefName, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// Bare repositories have no worktree to rebase in.
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    /// Object not found in the object database.
    #[error("object not found: {oid}")]
    ObjectNotFound { oid: String },

    /// Invalid object id.
    #[error("invalid object id: {oid}")]
    InvalidOid { oid: String },

    /// Blob content is not valid UTF-8.
    #[error("blob is not valid UTF-8: {oid}")]
    InvalidUtf8 { oid: String },

    /// The working tree has staged or unstaged changes.
    #[error("working tree has uncommitted changes")]
    DirtyWorktree,

    /// A git subprocess failed for a reason other than a rebase conflict.
    #[error("git {command} failed: {stderr}")]
    Subprocess { command: String, stderr: String },

    /// Push rejected: the remote moved past our last fetch.
    #[error("push of '{branch}' rejected: remote has newer commits (non-fast-forward)")]
    NonFastForward { branch: String },

    /// Push target remote does not exist.
    #[error("remote '{remote}' does not exist")]
    RemoteMissing { remote: String },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal { message: String },
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        GitError::Internal {
            message: err.to_string(),
        }
    }
}

impl GitError {
    fn internal(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

/// Repository layout information.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    /// Per-worktree git directory.
    pub git_dir: PathBuf,
    /// Shared git directory (equals `git_dir` outside linked worktrees).
    pub common_dir: PathBuf,
    /// Working directory.
    pub work_dir: PathBuf,
}

/// One commit from a log traversal.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit id.
    pub oid: Oid,
    /// First line of the message.
    pub subject: String,
    /// Message body after the first line (may be empty).
    pub body: String,
    /// Author timestamp.
    pub author_time: chrono::DateTime<chrono::Utc>,
}

/// The Git interface.
///
/// One instance wraps one repository. Ref updates used by the metadata
/// store are individually atomic at the ref-database level.
pub struct Git {
    repo: git2::Repository,
    work_dir: PathBuf,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git").field("path", &self.repo.path()).finish()
    }
}

impl Git {
    // =========================================================================
    // Opening and layout
    // =========================================================================

    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] when no repository is found
    /// - [`GitError::BareRepo`] when it has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        let work_dir = repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();
        Ok(Self { repo, work_dir })
    }

    /// Repository layout paths.
    ///
    /// Linked worktrees keep a `commondir` file pointing at the shared
    /// git directory; outside a worktree the two are the same.
    pub fn info(&self) -> RepoInfo {
        let git_dir = self.repo.path().to_path_buf();
        let common_dir = match std::fs::read_to_string(git_dir.join("commondir")) {
            Ok(contents) => {
                let target = PathBuf::from(contents.trim());
                if target.is_absolute() {
                    target
                } else {
                    git_dir.join(target)
                }
            }
            Err(_) => git_dir.clone(),
        };
        RepoInfo {
            git_dir,
            common_dir,
            work_dir: self.work_dir.clone(),
        }
    }

    /// The working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The per-worktree git directory.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    // =========================================================================
    // Revisions and ancestry
    // =========================================================================

    /// Resolve a revision expression to a commit id.
    ///
    /// Returns `None` when the revision does not resolve.
    pub fn resolve(&self, rev: &str) -> Result<Option<Oid>, GitError> {
        match self.repo.revparse_single(rev) {
            Ok(object) => {
                let commit = object.peel_to_commit().map_err(GitError::internal)?;
                Ok(Some(Oid::new(commit.id().to_string())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::InvalidSpec => Ok(None),
            Err(e) => Err(GitError::internal(e)),
        }
    }

    /// The merge base of two commits, or `None` without common ancestry.
    pub fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        match self.repo.merge_base(self.to_git2(a)?, self.to_git2(b)?) {
            Ok(oid) => Ok(Some(Oid::new(oid.to_string())?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::internal(e)),
        }
    }

    /// Whether `ancestor` is reachable from `descendant` (a commit counts
    /// as its own ancestor).
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }
        self.repo
            .graph_descendant_of(self.to_git2(descendant)?, self.to_git2(ancestor)?)
            .map_err(GitError::internal)
    }

    /// Ordered commits reachable from `tip` but not `hide`, newest first,
    /// capped at `limit`.
    pub fn log(
        &self,
        tip: &Oid,
        hide: Option<&Oid>,
        limit: usize,
    ) -> Result<Vec<CommitInfo>, GitError> {
        let mut walk = self.repo.revwalk().map_err(GitError::internal)?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL)
            .map_err(GitError::internal)?;
        walk.push(self.to_git2(tip)?).map_err(GitError::internal)?;
        if let Some(hide_oid) = hide {
            walk.hide(self.to_git2(hide_oid)?).map_err(GitError::internal)?;
        }

        let mut commits = Vec::new();
        for oid in walk.take(limit) {
            let oid = oid.map_err(GitError::internal)?;
            let commit = self.repo.find_commit(oid).map_err(GitError::internal)?;
            let author_time = chrono::DateTime::from_timestamp(commit.time().seconds(), 0)
                .unwrap_or(chrono::DateTime::UNIX_EPOCH);
            commits.push(CommitInfo {
                oid: Oid::new(oid.to_string())?,
                subject: commit.summary().unwrap_or("").to_string(),
                body: commit.body().unwrap_or("").to_string(),
                author_time,
            });
        }
        Ok(commits)
    }

    // =========================================================================
    // Refs
    // =========================================================================

    /// Read a ref's direct target (works for refs pointing at blobs).
    pub fn read_ref(&self, name: &RefName) -> Result<Option<Oid>, GitError> {
        match self.repo.find_reference(name.as_str()) {
            Ok(reference) => {
                let resolved = reference.resolve().unwrap_or(reference);
                let target = resolved.target().ok_or_else(|| GitError::Internal {
                    message: format!("ref {name} has no target"),
                })?;
                Ok(Some(Oid::new(target.to_string())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::internal(e)),
        }
    }

    /// Create, update, or delete a ref. `None` deletes.
    pub fn update_ref(&self, name: &RefName, target: Option<&Oid>) -> Result<(), GitError> {
        match target {
            Some(oid) => {
                self.repo
                    .reference(name.as_str(), self.to_git2(oid)?, true, "av: update")
                    .map_err(GitError::internal)?;
                Ok(())
            }
            None => match self.repo.find_reference(name.as_str()) {
                Ok(mut reference) => reference.delete().map_err(GitError::internal),
                Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
                Err(e) => Err(GitError::internal(e)),
            },
        }
    }

    /// All refs under a prefix with their direct targets.
    pub fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, Oid)>, GitError> {
        let pattern = format!("{prefix}*");
        let refs = self
            .repo
            .references_glob(&pattern)
            .map_err(GitError::internal)?;

        let mut entries = Vec::new();
        for reference in refs {
            let reference = reference.map_err(GitError::internal)?;
            let Some(name) = reference.name() else {
                continue;
            };
            let Ok(refname) = RefName::new(name) else {
                continue;
            };
            let resolved = reference.resolve().unwrap_or(reference);
            let Some(target) = resolved.target() else {
                continue;
            };
            let Ok(oid) = Oid::new(target.to_string()) else {
                continue;
            };
            entries.push((refname, oid));
        }
        Ok(entries)
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// Head of a local branch, or `None` when it does not exist.
    pub fn branch_head(&self, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        self.read_ref(&RefName::for_branch(branch))
    }

    /// Head of a remote-tracking branch.
    pub fn remote_head(&self, remote: &str, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        self.read_ref(&RefName::for_remote_branch(remote, branch))
    }

    /// Whether a local branch exists.
    pub fn branch_exists(&self, branch: &BranchName) -> Result<bool, GitError> {
        Ok(self.branch_head(branch)?.is_some())
    }

    /// All local branch names.
    pub fn list_branches(&self) -> Result<Vec<BranchName>, GitError> {
        let branches = self
            .repo
            .branches(Some(git2::BranchType::Local))
            .map_err(GitError::internal)?;
        let mut names = Vec::new();
        for branch in branches {
            let (branch, _) = branch.map_err(GitError::internal)?;
            if let Some(name) = branch.name().ok().flatten() {
                if let Ok(name) = BranchName::new(name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// The currently checked-out branch; `None` when HEAD is detached or
    /// unborn.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(GitError::internal(e)),
        };
        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Some(BranchName::new(name)?));
            }
        }
        Ok(None)
    }

    /// Check out a local branch, updating the worktree.
    pub fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let output = super::run_git(&self.work_dir, &["checkout", "--quiet", branch.as_str()])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(GitError::Subprocess {
                command: format!("checkout {branch}"),
                stderr: super::combined_output(&output),
            })
        }
    }

    /// Delete a local branch (used by prune; callers verify safety).
    pub fn delete_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let mut found = self
            .repo
            .find_branch(branch.as_str(), git2::BranchType::Local)
            .map_err(|_| GitError::RefNotFound {
                refname: RefName::for_branch(branch).to_string(),
            })?;
        found.delete().map_err(GitError::internal)
    }

    /// The repository default branch.
    ///
    /// Resolution order: the remote's HEAD symref, `init.defaultBranch`,
    /// then whichever of `main`/`master` exists locally, then `main`.
    pub fn default_branch(&self, remote: &str) -> Result<BranchName, GitError> {
        let remote_head = format!("refs/remotes/{remote}/HEAD");
        if let Ok(reference) = self.repo.find_reference(&remote_head) {
            if let Some(target) = reference.symbolic_target() {
                let prefix = format!("refs/remotes/{remote}/");
                if let Some(short) = target.strip_prefix(&prefix) {
                    return Ok(BranchName::new(short)?);
                }
            }
        }

        if let Ok(config) = self.repo.config() {
            if let Ok(name) = config.get_string("init.defaultBranch") {
                if let Ok(branch) = BranchName::new(name) {
                    if self.branch_exists(&branch)? {
                        return Ok(branch);
                    }
                }
            }
        }

        for candidate in ["main", "master"] {
            let branch = BranchName::new(candidate)?;
            if self.branch_exists(&branch)? {
                return Ok(branch);
            }
        }
        Ok(BranchName::new("main")?)
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// Store bytes as a blob; returns its id.
    pub fn hash_object(&self, bytes: &[u8]) -> Result<Oid, GitError> {
        let oid = self.repo.blob(bytes).map_err(GitError::internal)?;
        Ok(Oid::new(oid.to_string())?)
    }

    /// Read a blob's content.
    pub fn cat_blob(&self, oid: &Oid) -> Result<Vec<u8>, GitError> {
        let blob = self
            .repo
            .find_blob(self.to_git2(oid)?)
            .map_err(|_| GitError::ObjectNotFound {
                oid: oid.to_string(),
            })?;
        Ok(blob.content().to_vec())
    }

    /// Read a blob as UTF-8.
    pub fn cat_blob_as_string(&self, oid: &Oid) -> Result<String, GitError> {
        String::from_utf8(self.cat_blob(oid)?).map_err(|_| GitError::InvalidUtf8 {
            oid: oid.to_string(),
        })
    }

    // =========================================================================
    // Worktree and config
    // =========================================================================

    /// Whether the worktree has staged or unstaged changes to tracked
    /// files. Untracked files do not count.
    pub fn is_worktree_clean(&self) -> Result<bool, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);
        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(GitError::internal)?;

        for entry in statuses.iter() {
            let status = entry.status();
            if status.is_conflicted()
                || status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
                || status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Fail unless the worktree is clean.
    pub fn require_clean_worktree(&self) -> Result<(), GitError> {
        if self.is_worktree_clean()? {
            Ok(())
        } else {
            Err(GitError::DirtyWorktree)
        }
    }

    /// Read per-branch local config (`branch.<name>.<key>`).
    pub fn branch_config_get(
        &self,
        branch: &BranchName,
        key: &str,
    ) -> Result<Option<String>, GitError> {
        let config = self.repo.config().map_err(GitError::internal)?;
        match config.get_string(&format!("branch.{branch}.{key}")) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::internal(e)),
        }
    }

    /// Write per-branch local config (`branch.<name>.<key>`).
    pub fn branch_config_set(
        &self,
        branch: &BranchName,
        key: &str,
        value: &str,
    ) -> Result<(), GitError> {
        let mut config = self.repo.config().map_err(GitError::internal)?;
        config
            .set_str(&format!("branch.{branch}.{key}"), value)
            .map_err(GitError::internal)
    }

    /// URL of a configured remote, when present.
    pub fn remote_url(&self, remote: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(remote) {
            Ok(found) => Ok(found.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::internal(e)),
        }
    }

    /// Whether the repository root carries an owners file (used by the
    /// draft-cycling push policy).
    pub fn has_owners_file(&self) -> bool {
        const CANDIDATES: [&str; 3] = ["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];
        CANDIDATES
            .iter()
            .any(|candidate| self.work_dir.join(candidate).exists())
    }

    fn to_git2(&self, oid: &Oid) -> Result<git2::Oid, GitError> {
        git2::Oid::from_str(oid.as_str()).map_err(|_| GitError::InvalidOid {
            oid: oid.to_string(),
        })
    }
}

/// Parse a GitHub-style remote URL into (owner, repo).
///
/// Handles HTTPS and SSH forms for any host:
/// `https://<host>/owner/repo.git` and `git@<host>:owner/repo.git`.
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let rest = if let Some(rest) = url.strip_prefix("https://") {
        rest.split_once('/')?.1
    } else if let Some(rest) = url.strip_prefix("ssh://") {
        rest.split_once('/')?.1
    } else if url.contains('@') && url.contains(':') {
        url.split_once(':')?.1
    } else {
        return None;
    };

    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let (owner, repo) = rest.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, git2::Repository) {
        let dir = TempDir::new().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        {
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
                .unwrap();
        }
        (dir, repo)
    }

    fn commit_on_head(repo: &git2::Repository, message: &str) -> git2::Oid {
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().unwrap().peel_to_commit().unwrap();
        let tree = repo.find_tree(repo.index().unwrap().write_tree().unwrap()).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
            .unwrap()
    }

    #[test]
    fn open_and_layout() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let info = git.info();
        assert!(info.git_dir.ends_with(".git"));
        assert_eq!(info.git_dir, info.common_dir);
    }

    #[test]
    fn open_outside_repo_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Git::open(dir.path()),
            Err(GitError::NotARepo { .. })
        ));
    }

    #[test]
    fn resolve_head_and_missing() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        assert!(git.resolve("HEAD").unwrap().is_some());
        assert!(git.resolve("no-such-branch").unwrap().is_none());
    }

    #[test]
    fn blob_roundtrip() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let oid = git.hash_object(b"{\"parent\":\"main\"}").unwrap();
        assert_eq!(git.cat_blob(&oid).unwrap(), b"{\"parent\":\"main\"}");
        assert_eq!(git.cat_blob_as_string(&oid).unwrap(), "{\"parent\":\"main\"}");
    }

    #[test]
    fn ref_update_read_delete() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let branch = BranchName::new("feat").unwrap();
        let blob = git.hash_object(b"content").unwrap();
        let refname = RefName::for_metadata(&branch);

        git.update_ref(&refname, Some(&blob)).unwrap();
        assert_eq!(git.read_ref(&refname).unwrap(), Some(blob));

        git.update_ref(&refname, None).unwrap();
        assert_eq!(git.read_ref(&refname).unwrap(), None);
        // Deleting a missing ref is idempotent.
        git.update_ref(&refname, None).unwrap();
    }

    #[test]
    fn list_refs_in_namespace() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        for name in ["a", "b"] {
            let branch = BranchName::new(name).unwrap();
            let blob = git.hash_object(name.as_bytes()).unwrap();
            git.update_ref(&RefName::for_metadata(&branch), Some(&blob))
                .unwrap();
        }
        let refs = git.list_refs("refs/av/branch-metadata/").unwrap();
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn merge_base_and_ancestry() {
        let (dir, repo) = fixture();
        let git = Git::open(dir.path()).unwrap();

        let base = git.resolve("HEAD").unwrap().unwrap();
        commit_on_head(&repo, "second");
        let tip = git.resolve("HEAD").unwrap().unwrap();

        assert_eq!(git.merge_base(&base, &tip).unwrap(), Some(base.clone()));
        assert!(git.is_ancestor(&base, &tip).unwrap());
        assert!(!git.is_ancestor(&tip, &base).unwrap());
        assert!(git.is_ancestor(&tip, &tip).unwrap());
    }

    #[test]
    fn log_orders_and_caps() {
        let (dir, repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let base = git.resolve("HEAD").unwrap().unwrap();
        commit_on_head(&repo, "one\n\ncloses #7");
        commit_on_head(&repo, "two");
        let tip = git.resolve("HEAD").unwrap().unwrap();

        let commits = git.log(&tip, Some(&base), 100).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].subject, "two");
        assert_eq!(commits[1].subject, "one");
        assert_eq!(commits[1].body, "closes #7");

        let capped = git.log(&tip, None, 1).unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn worktree_cleanliness() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        assert!(git.is_worktree_clean().unwrap());

        // Untracked files do not make the worktree dirty.
        std::fs::write(dir.path().join("untracked.txt"), "x").unwrap();
        assert!(git.is_worktree_clean().unwrap());
        git.require_clean_worktree().unwrap();
    }

    #[test]
    fn branch_config_roundtrip() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let branch = BranchName::new("feat").unwrap();

        assert!(git.branch_config_get(&branch, "av-parent").unwrap().is_none());
        git.branch_config_set(&branch, "av-parent", "main").unwrap();
        assert_eq!(
            git.branch_config_get(&branch, "av-parent").unwrap().as_deref(),
            Some("main")
        );
    }

    #[test]
    fn default_branch_prefers_existing_main() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let default = git.default_branch("origin").unwrap();
        // Fixture initializes whatever init.defaultBranch says; the answer
        // must at least be a valid branch name.
        assert!(!default.as_str().is_empty());
    }

    #[test]
    fn current_branch_reported() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        assert!(git.current_branch().unwrap().is_some());
    }

    mod parse_owner_repo {
        use super::super::parse_owner_repo;

        #[test]
        fn https_form() {
            assert_eq!(
                parse_owner_repo("https://github.com/octo/widgets.git"),
                Some(("octo".into(), "widgets".into()))
            );
            assert_eq!(
                parse_owner_repo("https://github.example.com/octo/widgets"),
                Some(("octo".into(), "widgets".into()))
            );
        }

        #[test]
        fn ssh_form() {
            assert_eq!(
                parse_owner_repo("git@github.com:octo/widgets.git"),
                Some(("octo".into(), "widgets".into()))
            );
        }

        #[test]
        fn malformed() {
            assert_eq!(parse_owner_repo("not-a-url"), None);
            assert_eq!(parse_owner_repo("https://github.com/"), None);
            assert_eq!(parse_owner_repo("https://github.com/only-owner"), None);
        }
    }
}
