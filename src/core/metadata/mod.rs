//! core::metadata
//!
//! Branch metadata: schema, transactional store, repository record.
//!
//! The metadata layer owns what the engine knows about each tracked
//! branch (parent pointer, forge request, merge attribution) and how that
//! knowledge is persisted inside the Git object database. All writes flow
//! through [`store::WriteTx`], which enforces the structural invariants
//! before anything touches a ref.

pub mod repository;
pub mod schema;
pub mod store;

pub use repository::{RepositoryError, RepositoryRecord};
pub use schema::{
    encode_record, parse_record, BranchRecord, MetadataError, ParentState, RequestRecord,
    RequestState,
};
pub use store::{MetadataStore, ReadTx, StoreError, WriteTx};

use crate::core::types::BranchName;
use std::collections::BTreeSet;

/// The set of long-lived branches treated as trunks.
///
/// Every repository has a default branch; configuration may add more
/// (release lines, say). A branch whose parent is any of these is a stack
/// root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trunks {
    default: BranchName,
    additional: BTreeSet<BranchName>,
}

impl Trunks {
    /// Build the trunk set from the default branch and configured extras.
    pub fn new(default: BranchName, additional: Vec<BranchName>) -> Self {
        Self {
            default,
            additional: additional.into_iter().collect(),
        }
    }

    /// The repository default branch.
    pub fn default_branch(&self) -> &BranchName {
        &self.default
    }

    /// Whether a branch name is a trunk.
    pub fn is_trunk(&self, name: &BranchName) -> bool {
        *name == self.default || self.additional.contains(name)
    }

    /// All trunk names, default first.
    pub fn iter(&self) -> impl Iterator<Item = &BranchName> {
        std::iter::once(&self.default).chain(self.additional.iter())
    }
}
