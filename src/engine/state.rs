//! engine::state
//!
//! Persisted operation state in `.git/av/`.
//!
//! Two files survive process exit:
//!
//! - `stack-sync.state.json` — the orchestrator's view of an in-progress
//!   sync (original branch, branch list, the options it was started
//!   with).
//! - `sequencer.<kind>.state.json` — the sequencer's position inside its
//!   operation list, pre-sequence parent snapshots, and the recorded
//!   conflict target while suspended.
//!
//! Both are schema-versioned JSON. Readers tolerate unknown fields so an
//! older binary can load a newer file. A corrupt or missing sequencer
//! file simply means "idle"; nothing downstream trusts a half-written
//! state more than the repository itself.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::paths::AvPaths;
use crate::core::types::{BranchName, Oid};

use super::EngineError;

/// Current schema version for both state files.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// One per-branch rebase operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebaseOp {
    /// The branch to rebase.
    pub target: BranchName,
    /// The parent to rebase onto.
    pub new_parent: BranchName,
    /// Whether the new parent is a trunk.
    pub new_parent_is_trunk: bool,
    /// Explicit commit to rebase onto. The zero id (or absence) means
    /// "resolve at execution time": the remote-tracking head for trunks,
    /// the local head otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_parent_hash: Option<Oid>,
}

impl RebaseOp {
    /// An operation that reaffirms an existing parent.
    pub fn reaffirm(target: BranchName, parent: BranchName, parent_is_trunk: bool) -> Self {
        Self {
            target,
            new_parent: parent,
            new_parent_is_trunk: parent_is_trunk,
            new_parent_hash: None,
        }
    }

    /// The explicit hash, with the zero sentinel normalized away.
    pub fn explicit_hash(&self) -> Option<&Oid> {
        self.new_parent_hash.as_ref().filter(|oid| !oid.is_zero())
    }
}

/// A branch's parent state captured before the sequence started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentSnapshot {
    /// Parent branch at sequence start.
    pub parent: BranchName,
    /// Whether that parent was a trunk.
    pub is_trunk: bool,
    /// The recorded branching point (unset for trunk parents and legacy
    /// records).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branching_point: Option<Oid>,
}

/// Which flow a sequencer file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequencerKind {
    Sync,
    Restack,
    Reparent,
}

impl SequencerKind {
    /// File-name key for this kind.
    pub fn key(&self) -> &'static str {
        match self {
            SequencerKind::Sync => "sync",
            SequencerKind::Restack => "restack",
            SequencerKind::Reparent => "reparent",
        }
    }

    /// All kinds, for "is anything suspended" checks.
    pub fn all() -> [SequencerKind; 3] {
        [
            SequencerKind::Sync,
            SequencerKind::Restack,
            SequencerKind::Reparent,
        ]
    }
}

impl std::fmt::Display for SequencerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Persisted sequencer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencerState {
    /// Schema version of this file.
    pub schema_version: u32,
    /// Which flow this sequence belongs to.
    pub kind: SequencerKind,
    /// Remote used for trunk head resolution.
    pub remote: String,
    /// The full ordered operation list.
    pub operations: Vec<RebaseOp>,
    /// Index of the operation to execute next (or currently suspended).
    pub current: usize,
    /// Pre-sequence parent snapshots, keyed by branch.
    pub snapshots: BTreeMap<BranchName, ParentSnapshot>,
    /// Set while suspended on a conflict: the resolved onto-hash of the
    /// interrupted operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt_new_parent_hash: Option<Oid>,
}

impl SequencerState {
    /// Fresh running state at the start of a sequence.
    pub fn new(
        kind: SequencerKind,
        remote: String,
        operations: Vec<RebaseOp>,
        snapshots: BTreeMap<BranchName, ParentSnapshot>,
    ) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            kind,
            remote,
            operations,
            current: 0,
            snapshots,
            interrupt_new_parent_hash: None,
        }
    }

    /// The operation at the cursor, when any remain.
    pub fn current_op(&self) -> Option<&RebaseOp> {
        self.operations.get(self.current)
    }

    /// Whether the sequence is suspended on a conflict.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt_new_parent_hash.is_some()
    }

    /// Persist to the kind's state file. Written before any Git
    /// mutation, so a crash can at worst lose an already-completed step.
    pub fn save(&self, paths: &AvPaths) -> Result<(), EngineError> {
        paths
            .ensure_dir()
            .map_err(|e| EngineError::State(e.to_string()))?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::State(e.to_string()))?;
        write_atomic(&paths.sequencer_state(self.kind.key()), &json)
    }

    /// Load the state for a kind. Missing or corrupt files mean idle.
    pub fn load(paths: &AvPaths, kind: SequencerKind) -> Option<Self> {
        load_tolerant(&paths.sequencer_state(kind.key()))
    }

    /// Load whichever kind has persisted state, if any.
    pub fn load_any(paths: &AvPaths) -> Option<Self> {
        SequencerKind::all()
            .into_iter()
            .find_map(|kind| Self::load(paths, kind))
    }

    /// Remove the state file for a kind.
    pub fn clear(paths: &AvPaths, kind: SequencerKind) {
        let _ = fs::remove_file(paths.sequencer_state(kind.key()));
    }
}

/// The user-supplied options of an in-progress sync, persisted so
/// `--continue` finishes the run with the same behavior it started with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
    /// Sync only the current branch and its descendants.
    #[serde(default)]
    pub current_only: bool,
    /// Rebase children of merged parents onto the trunk head instead of
    /// the parent's merge commit.
    #[serde(default)]
    pub to_trunk: bool,
    /// Push updated branches and refresh their requests.
    #[serde(default = "default_true")]
    pub push: bool,
    /// Fetch trunks and refresh requests before planning.
    #[serde(default = "default_true")]
    pub fetch: bool,
    /// Delete merged, fully-integrated leaf branches afterwards.
    #[serde(default)]
    pub prune: bool,
    /// Reparent the current branch onto this branch before syncing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_override: Option<BranchName>,
}

fn default_true() -> bool {
    true
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            current_only: false,
            to_trunk: false,
            push: true,
            fetch: true,
            prune: false,
            parent_override: None,
        }
    }
}

/// Persisted orchestrator state for an in-progress sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Schema version of this file.
    pub schema_version: u32,
    /// Branch to check out when the sync completes.
    pub original_branch: BranchName,
    /// Branch being processed when last persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_branch: Option<BranchName>,
    /// The ordered branch list of this sync.
    pub branches: Vec<BranchName>,
    /// The options the sync was started with.
    pub config: SyncOptions,
}

impl SyncState {
    /// Fresh state at sync start.
    pub fn new(original_branch: BranchName, branches: Vec<BranchName>, config: SyncOptions) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            original_branch,
            current_branch: None,
            branches,
            config,
        }
    }

    /// Persist to `stack-sync.state.json`.
    pub fn save(&self, paths: &AvPaths) -> Result<(), EngineError> {
        paths
            .ensure_dir()
            .map_err(|e| EngineError::State(e.to_string()))?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::State(e.to_string()))?;
        write_atomic(&paths.sync_state(), &json)
    }

    /// Load persisted sync state; missing or corrupt means none.
    pub fn load(paths: &AvPaths) -> Option<Self> {
        load_tolerant(&paths.sync_state())
    }

    /// Remove the sync state file.
    pub fn clear(paths: &AvPaths) {
        let _ = fs::remove_file(paths.sync_state());
    }
}

/// Write via a temp file + rename so a crash never leaves a torn file.
fn write_atomic(path: &Path, contents: &str) -> Result<(), EngineError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).map_err(|e| EngineError::State(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| EngineError::State(e.to_string()))
}

/// Load JSON state, treating missing or unparseable files as absent.
fn load_tolerant<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt state file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    fn sample_sequencer() -> SequencerState {
        let mut snapshots = BTreeMap::new();
        snapshots.insert(
            branch("feat-2"),
            ParentSnapshot {
                parent: branch("feat-1"),
                is_trunk: false,
                branching_point: Some(oid('a')),
            },
        );
        SequencerState::new(
            SequencerKind::Sync,
            "origin".into(),
            vec![RebaseOp {
                target: branch("feat-2"),
                new_parent: branch("feat-1"),
                new_parent_is_trunk: false,
                new_parent_hash: None,
            }],
            snapshots,
        )
    }

    #[test]
    fn sequencer_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = AvPaths::new(dir.path().join(".git"));

        let mut state = sample_sequencer();
        state.current = 0;
        state.interrupt_new_parent_hash = Some(oid('b'));
        state.save(&paths).unwrap();

        let loaded = SequencerState::load(&paths, SequencerKind::Sync).unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.is_interrupted());
    }

    #[test]
    fn missing_or_corrupt_sequencer_means_idle() {
        let dir = tempdir().unwrap();
        let paths = AvPaths::new(dir.path().join(".git"));
        assert!(SequencerState::load(&paths, SequencerKind::Sync).is_none());

        paths.ensure_dir().unwrap();
        fs::write(paths.sequencer_state("sync"), "{ torn").unwrap();
        assert!(SequencerState::load(&paths, SequencerKind::Sync).is_none());
    }

    #[test]
    fn load_any_finds_the_suspended_kind() {
        let dir = tempdir().unwrap();
        let paths = AvPaths::new(dir.path().join(".git"));

        let mut state = sample_sequencer();
        state.kind = SequencerKind::Reparent;
        state.save(&paths).unwrap();

        let found = SequencerState::load_any(&paths).unwrap();
        assert_eq!(found.kind, SequencerKind::Reparent);
    }

    #[test]
    fn clear_removes_only_its_kind() {
        let dir = tempdir().unwrap();
        let paths = AvPaths::new(dir.path().join(".git"));

        sample_sequencer().save(&paths).unwrap();
        let mut other = sample_sequencer();
        other.kind = SequencerKind::Restack;
        other.save(&paths).unwrap();

        SequencerState::clear(&paths, SequencerKind::Sync);
        assert!(SequencerState::load(&paths, SequencerKind::Sync).is_none());
        assert!(SequencerState::load(&paths, SequencerKind::Restack).is_some());
    }

    #[test]
    fn sync_state_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = AvPaths::new(dir.path().join(".git"));

        let state = SyncState::new(
            branch("feat-2"),
            vec![branch("feat-1"), branch("feat-2")],
            SyncOptions {
                prune: true,
                ..Default::default()
            },
        );
        state.save(&paths).unwrap();

        let loaded = SyncState::load(&paths).unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.config.push);
        assert!(loaded.config.prune);

        SyncState::clear(&paths);
        assert!(SyncState::load(&paths).is_none());
    }

    #[test]
    fn readers_tolerate_unknown_fields() {
        let dir = tempdir().unwrap();
        let paths = AvPaths::new(dir.path().join(".git"));
        paths.ensure_dir().unwrap();

        let json = r#"{
            "schemaVersion": 1,
            "originalBranch": "feat-1",
            "branches": ["feat-1"],
            "config": {"futureKnob": true},
            "futureField": 42
        }"#;
        fs::write(paths.sync_state(), json).unwrap();

        let loaded = SyncState::load(&paths).unwrap();
        assert_eq!(loaded.original_branch, branch("feat-1"));
        // Defaults fill in for fields the file predates.
        assert!(loaded.config.push);
    }

    #[test]
    fn zero_hash_normalized_by_explicit_hash() {
        let op = RebaseOp {
            target: branch("feat-1"),
            new_parent: branch("main"),
            new_parent_is_trunk: true,
            new_parent_hash: Some(Oid::zero()),
        };
        assert!(op.explicit_hash().is_none());

        let op = RebaseOp {
            new_parent_hash: Some(oid('c')),
            ..op
        };
        assert_eq!(op.explicit_hash(), Some(&oid('c')));
    }
}
