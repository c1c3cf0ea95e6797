//! core::metadata::store
//!
//! Transactional storage of branch records in the Git object database.
//!
//! Each record is a blob; a ref under `refs/av/branch-metadata/<branch>`
//! points at it. Storing metadata as Git objects means it is versioned by
//! the object DB, survives branch deletion, and travels with a push/fetch
//! of the metadata refs.
//!
//! # Transactions
//!
//! - [`ReadTx`] snapshots the metadata ref namespace (branch → blob id) at
//!   open. Every read inside one transaction sees that single view, even
//!   while refs move underneath.
//! - [`WriteTx`] buffers upserts and deletions in memory. `commit`
//!   validates the structural invariants (no cycles, no self-parenting,
//!   well-formed parent states, no dangling parents) over the combined
//!   view and only then updates refs, one per record. Each ref update is
//!   individually atomic; cross-record atomicity is provided by the
//!   repository lock that mutating commands hold.
//!
//! Dropping a `WriteTx` without committing discards the buffer.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::schema::{encode_record, parse_record, BranchRecord, MetadataError, ParentState};
use super::Trunks;
use crate::core::types::{BranchName, Oid, RefName, METADATA_REF_PREFIX};
use crate::git::{Git, GitError};

/// Errors from metadata storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A buffered write violated a structural invariant. Nothing was
    /// written.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Record encoding or decoding failed.
    #[error(transparent)]
    Schema(#[from] MetadataError),

    /// Underlying Git operation failed.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// Metadata store over a Git repository.
pub struct MetadataStore<'a> {
    git: &'a Git,
    trunks: Trunks,
}

impl<'a> MetadataStore<'a> {
    /// Create a store. `trunks` supplies the repository default branch
    /// (used to resolve legacy records) and any configured extra trunks.
    pub fn new(git: &'a Git, trunks: Trunks) -> Self {
        Self { git, trunks }
    }

    /// The trunk set this store resolves against.
    pub fn trunks(&self) -> &Trunks {
        &self.trunks
    }

    /// Open a read transaction over the current metadata refs.
    pub fn read_tx(&self) -> Result<ReadTx<'_>, StoreError> {
        Ok(ReadTx {
            git: self.git,
            trunks: &self.trunks,
            snapshot: self.snapshot()?,
        })
    }

    /// Open a write transaction over the current metadata refs.
    pub fn write_tx(&self) -> Result<WriteTx<'_>, StoreError> {
        Ok(WriteTx {
            git: self.git,
            trunks: &self.trunks,
            base: self.snapshot()?,
            puts: BTreeMap::new(),
            deletes: BTreeSet::new(),
        })
    }

    fn snapshot(&self) -> Result<BTreeMap<BranchName, Oid>, StoreError> {
        let mut snapshot = BTreeMap::new();
        for (refname, oid) in self.git.list_refs(METADATA_REF_PREFIX)? {
            let Some(short) = refname.strip_prefix(METADATA_REF_PREFIX) else {
                continue;
            };
            // Refs with names we cannot validate are skipped, not fatal.
            if let Ok(branch) = BranchName::new(short) {
                snapshot.insert(branch, oid);
            }
        }
        Ok(snapshot)
    }
}

/// A consistent read view of the metadata namespace.
pub struct ReadTx<'a> {
    git: &'a Git,
    trunks: &'a Trunks,
    snapshot: BTreeMap<BranchName, Oid>,
}

impl ReadTx<'_> {
    /// Branch names tracked at snapshot time, in name order.
    pub fn branches(&self) -> impl Iterator<Item = &BranchName> {
        self.snapshot.keys()
    }

    /// Whether a branch was tracked at snapshot time.
    pub fn contains(&self, branch: &BranchName) -> bool {
        self.snapshot.contains_key(branch)
    }

    /// Number of tracked branches.
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    /// Whether no branches are tracked.
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Read one branch record.
    pub fn get(&self, branch: &BranchName) -> Result<Option<BranchRecord>, StoreError> {
        let Some(blob) = self.snapshot.get(branch) else {
            return Ok(None);
        };
        let json = self.git.cat_blob_as_string(blob)?;
        Ok(Some(parse_record(&json, self.trunks.default_branch())?))
    }

    /// Read every record in the snapshot.
    pub fn load_all(&self) -> Result<BTreeMap<BranchName, BranchRecord>, StoreError> {
        let mut records = BTreeMap::new();
        for branch in self.snapshot.keys() {
            if let Some(record) = self.get(branch)? {
                records.insert(branch.clone(), record);
            }
        }
        Ok(records)
    }

    /// The trunk set in effect for this view.
    pub fn trunks(&self) -> &Trunks {
        self.trunks
    }
}

/// A buffered set of metadata mutations.
pub struct WriteTx<'a> {
    git: &'a Git,
    trunks: &'a Trunks,
    base: BTreeMap<BranchName, Oid>,
    puts: BTreeMap<BranchName, BranchRecord>,
    deletes: BTreeSet<BranchName>,
}

impl WriteTx<'_> {
    /// Buffer an upsert for a branch record.
    pub fn put(&mut self, branch: BranchName, record: BranchRecord) {
        self.deletes.remove(&branch);
        self.puts.insert(branch, record);
    }

    /// Buffer the removal of a branch record.
    pub fn delete(&mut self, branch: BranchName) {
        self.puts.remove(&branch);
        self.deletes.insert(branch);
    }

    /// Read a record as the transaction would leave it: buffered state
    /// first, then the underlying snapshot.
    pub fn get(&self, branch: &BranchName) -> Result<Option<BranchRecord>, StoreError> {
        if self.deletes.contains(branch) {
            return Ok(None);
        }
        if let Some(record) = self.puts.get(branch) {
            return Ok(Some(record.clone()));
        }
        let Some(blob) = self.base.get(branch) else {
            return Ok(None);
        };
        let json = self.git.cat_blob_as_string(blob)?;
        Ok(Some(parse_record(&json, self.trunks.default_branch())?))
    }

    /// Whether anything is buffered.
    pub fn is_dirty(&self) -> bool {
        !self.puts.is_empty() || !self.deletes.is_empty()
    }

    /// Validate and apply all buffered mutations.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidMetadata`] if the combined view would violate
    /// a structural invariant; nothing is written in that case.
    pub fn commit(self) -> Result<(), StoreError> {
        let effective = self.effective_view()?;
        self.validate(&effective)?;

        for (branch, record) in &self.puts {
            let blob = self.git.hash_object(encode_record(record).as_bytes())?;
            self.git
                .update_ref(&RefName::for_metadata(branch), Some(&blob))?;
        }
        for branch in &self.deletes {
            self.git.update_ref(&RefName::for_metadata(branch), None)?;
        }
        Ok(())
    }

    /// Discard all buffered mutations.
    pub fn abort(self) {
        // Buffers drop here; nothing was written.
    }

    /// The record set as it would exist after commit.
    fn effective_view(&self) -> Result<BTreeMap<BranchName, BranchRecord>, StoreError> {
        let mut view = BTreeMap::new();
        for (branch, blob) in &self.base {
            if self.deletes.contains(branch) || self.puts.contains_key(branch) {
                continue;
            }
            let json = self.git.cat_blob_as_string(blob)?;
            view.insert(
                branch.clone(),
                parse_record(&json, self.trunks.default_branch())?,
            );
        }
        for (branch, record) in &self.puts {
            view.insert(branch.clone(), record.clone());
        }
        Ok(view)
    }

    fn validate(&self, view: &BTreeMap<BranchName, BranchRecord>) -> Result<(), StoreError> {
        // Well-formed parent states: only checked for buffered writes;
        // existing legacy records stay readable until rewritten.
        for (branch, record) in &self.puts {
            match &record.parent {
                ParentState::Trunk { .. } => {}
                ParentState::Stacked {
                    branching_point: None,
                    ..
                } => {
                    return Err(StoreError::InvalidMetadata(format!(
                        "branch '{branch}' has a stacked parent without a branching point"
                    )));
                }
                ParentState::Stacked { .. } => {}
            }
        }

        for (branch, record) in view {
            let parent = record.parent.name();

            if parent == branch {
                return Err(StoreError::InvalidMetadata(format!(
                    "branch '{branch}' cannot be its own parent"
                )));
            }

            if !record.parent.is_trunk()
                && !view.contains_key(parent)
                && !self.trunks.is_trunk(parent)
            {
                return Err(StoreError::InvalidMetadata(format!(
                    "branch '{branch}' has parent '{parent}' which is missing from metadata"
                )));
            }
        }

        // Cycle walk over the parent relation.
        for start in view.keys() {
            let mut seen = BTreeSet::new();
            let mut current = start;
            while let Some(record) = view.get(current) {
                if record.parent.is_trunk() {
                    break;
                }
                let parent = record.parent.name();
                if !seen.insert(parent.clone()) || parent == start {
                    return Err(StoreError::InvalidMetadata(format!(
                        "cycle in branch parents involving '{start}'"
                    )));
                }
                current = parent;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BranchName;
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

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    fn trunks() -> Trunks {
        Trunks::new(branch("main"), vec![])
    }

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn write_then_read_roundtrip() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let store = MetadataStore::new(&git, trunks());

        let mut tx = store.write_tx().unwrap();
        tx.put(branch("feat-1"), BranchRecord::on_trunk(branch("main")));
        tx.put(branch("feat-2"), BranchRecord::stacked(branch("feat-1"), oid('a')));
        tx.commit().unwrap();

        let read = store.read_tx().unwrap();
        assert_eq!(read.len(), 2);
        let record = read.get(&branch("feat-2")).unwrap().unwrap();
        assert_eq!(record.parent.name().as_str(), "feat-1");
        assert_eq!(record.parent.branching_point(), Some(&oid('a')));
    }

    #[test]
    fn read_tx_is_a_snapshot() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let store = MetadataStore::new(&git, trunks());

        let mut tx = store.write_tx().unwrap();
        tx.put(branch("feat-1"), BranchRecord::on_trunk(branch("main")));
        tx.commit().unwrap();

        let read = store.read_tx().unwrap();

        // A later write is invisible to the open read transaction.
        let mut tx = store.write_tx().unwrap();
        tx.put(branch("feat-9"), BranchRecord::on_trunk(branch("main")));
        tx.commit().unwrap();

        assert!(read.contains(&branch("feat-1")));
        assert!(!read.contains(&branch("feat-9")));
        assert!(store.read_tx().unwrap().contains(&branch("feat-9")));
    }

    #[test]
    fn delete_removes_the_ref() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let store = MetadataStore::new(&git, trunks());

        let mut tx = store.write_tx().unwrap();
        tx.put(branch("feat-1"), BranchRecord::on_trunk(branch("main")));
        tx.commit().unwrap();

        let mut tx = store.write_tx().unwrap();
        tx.delete(branch("feat-1"));
        tx.commit().unwrap();

        assert!(store.read_tx().unwrap().is_empty());
    }

    #[test]
    fn abort_discards_buffer() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let store = MetadataStore::new(&git, trunks());

        let mut tx = store.write_tx().unwrap();
        tx.put(branch("feat-1"), BranchRecord::on_trunk(branch("main")));
        tx.abort();

        assert!(store.read_tx().unwrap().is_empty());
    }

    #[test]
    fn self_parent_rejected() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let store = MetadataStore::new(&git, trunks());

        let mut tx = store.write_tx().unwrap();
        tx.put(branch("feat-1"), BranchRecord::stacked(branch("feat-1"), oid('a')));
        assert!(matches!(
            tx.commit(),
            Err(StoreError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn cycle_rejected_and_nothing_written() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let store = MetadataStore::new(&git, trunks());

        let mut tx = store.write_tx().unwrap();
        tx.put(branch("a"), BranchRecord::stacked(branch("b"), oid('1')));
        tx.put(branch("b"), BranchRecord::stacked(branch("a"), oid('2')));
        assert!(matches!(tx.commit(), Err(StoreError::InvalidMetadata(_))));

        assert!(store.read_tx().unwrap().is_empty());
    }

    #[test]
    fn dangling_parent_rejected() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let store = MetadataStore::new(&git, trunks());

        let mut tx = store.write_tx().unwrap();
        tx.put(branch("feat-1"), BranchRecord::stacked(branch("missing"), oid('a')));
        assert!(matches!(tx.commit(), Err(StoreError::InvalidMetadata(_))));
    }

    #[test]
    fn stacked_parent_without_branching_point_rejected_on_write() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let store = MetadataStore::new(&git, trunks());

        let mut tx = store.write_tx().unwrap();
        tx.put(
            branch("feat-2"),
            BranchRecord {
                parent: ParentState::Stacked {
                    name: branch("main"),
                    branching_point: None,
                },
                children: vec![],
                request: None,
                merge_commit: None,
            },
        );
        assert!(matches!(tx.commit(), Err(StoreError::InvalidMetadata(_))));
    }

    #[test]
    fn additional_trunk_is_a_valid_parent() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let store = MetadataStore::new(
            &git,
            Trunks::new(branch("main"), vec![branch("release-1.x")]),
        );

        let mut tx = store.write_tx().unwrap();
        tx.put(branch("hotfix"), BranchRecord::on_trunk(branch("release-1.x")));
        tx.commit().unwrap();
    }

    #[test]
    fn write_tx_get_sees_buffered_state() {
        let (dir, _repo) = fixture();
        let git = Git::open(dir.path()).unwrap();
        let store = MetadataStore::new(&git, trunks());

        let mut tx = store.write_tx().unwrap();
        tx.put(branch("feat-1"), BranchRecord::on_trunk(branch("main")));
        assert!(tx.get(&branch("feat-1")).unwrap().is_some());
        tx.delete(branch("feat-1"));
        assert!(tx.get(&branch("feat-1")).unwrap().is_none());
    }
}
