//! core::graph
//!
//! The in-memory stack model, layered over a metadata read transaction.
//!
//! Branch records form a forest whose roots sit on trunks. Records store
//! only the parent pointer; children are derived here by scanning, so a
//! record can never hold a dangling child reference.
//!
//! All queries are pure functions over the records captured at
//! construction time.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use thiserror::Error;

use super::metadata::{BranchRecord, ReadTx, StoreError, Trunks};
use super::types::BranchName;

/// Errors from stack-model queries and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// The branch has no metadata record.
    #[error("branch '{0}' is not tracked")]
    Unknown(BranchName),

    /// A branch cannot be its own parent.
    #[error("branch '{0}' cannot be its own parent")]
    SelfParent(BranchName),

    /// The proposed parent is a descendant of the branch.
    #[error("'{parent}' is a descendant of '{branch}'; reparenting would create a cycle")]
    WouldCycle {
        branch: BranchName,
        parent: BranchName,
    },

    /// The proposed parent is neither a trunk nor a tracked branch.
    #[error("parent '{0}' is missing from metadata")]
    MissingFromMetadata(BranchName),

    /// The parent chain never reached a trunk (corrupt metadata).
    #[error("parent chain of '{0}' does not reach a trunk")]
    NoTrunk(BranchName),
}

/// A node in the rendered stack forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// The branch at this node.
    pub branch: BranchName,
    /// Child nodes, current-path-first then alphabetical.
    pub children: Vec<TreeNode>,
}

/// Which part of the forest a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeScope {
    /// Every tracked branch.
    All,
    /// Only the stack containing the current branch.
    CurrentStack,
}

/// The stack model: records plus derived parent/child indexes.
#[derive(Debug)]
pub struct StackGraph {
    records: BTreeMap<BranchName, BranchRecord>,
    children: BTreeMap<BranchName, BTreeSet<BranchName>>,
    trunks: Trunks,
}

impl StackGraph {
    /// Build the model from a metadata read transaction.
    pub fn load(tx: &ReadTx<'_>) -> Result<Self, StoreError> {
        Ok(Self::from_records(tx.load_all()?, tx.trunks().clone()))
    }

    /// Build the model from already-loaded records.
    pub fn from_records(records: BTreeMap<BranchName, BranchRecord>, trunks: Trunks) -> Self {
        let mut children: BTreeMap<BranchName, BTreeSet<BranchName>> = BTreeMap::new();
        for (branch, record) in &records {
            children
                .entry(record.parent.name().clone())
                .or_default()
                .insert(branch.clone());
        }
        Self {
            records,
            children,
            trunks,
        }
    }

    /// The record for a branch, if tracked.
    pub fn record(&self, branch: &BranchName) -> Option<&BranchRecord> {
        self.records.get(branch)
    }

    /// Whether a branch is tracked.
    pub fn contains(&self, branch: &BranchName) -> bool {
        self.records.contains_key(branch)
    }

    /// All tracked branches in name order.
    pub fn branches(&self) -> impl Iterator<Item = &BranchName> {
        self.records.keys()
    }

    /// The trunk set this model resolves against.
    pub fn trunks(&self) -> &Trunks {
        &self.trunks
    }

    /// Direct children of a branch (or trunk), in name order.
    pub fn children(&self, branch: &BranchName) -> Vec<BranchName> {
        self.children
            .get(branch)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The trunk a branch's stack ultimately targets.
    pub fn trunk_of(&self, branch: &BranchName) -> Result<BranchName, GraphError> {
        let mut seen = BTreeSet::new();
        let mut current = branch;
        loop {
            let record = self
                .records
                .get(current)
                .ok_or_else(|| GraphError::Unknown(current.clone()))?;
            let parent = record.parent.name();
            if record.parent.is_trunk() || self.trunks.is_trunk(parent) {
                return Ok(parent.clone());
            }
            if !seen.insert(parent.clone()) {
                return Err(GraphError::NoTrunk(branch.clone()));
            }
            current = parent;
        }
    }

    /// Ancestors of a branch, nearest first, exclusive of trunk.
    pub fn ancestors(&self, branch: &BranchName) -> Result<Vec<BranchName>, GraphError> {
        if !self.contains(branch) {
            return Err(GraphError::Unknown(branch.clone()));
        }
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current = branch;
        while let Some(record) = self.records.get(current) {
            if record.parent.is_trunk() || self.trunks.is_trunk(record.parent.name()) {
                break;
            }
            let parent = record.parent.name();
            if !seen.insert(parent.clone()) {
                return Err(GraphError::NoTrunk(branch.clone()));
            }
            out.push(parent.clone());
            current = parent;
        }
        Ok(out)
    }

    /// All transitive children of a branch, topologically ordered
    /// (parents before children, siblings alphabetical).
    pub fn descendants(&self, branch: &BranchName) -> Vec<BranchName> {
        let mut out = Vec::new();
        let mut queue: VecDeque<BranchName> = self.children(branch).into();
        let mut seen = BTreeSet::new();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            queue.extend(self.children(&current));
            out.push(current);
        }
        out
    }

    /// The root of the stack containing `branch` (the ancestor sitting on
    /// a trunk; the branch itself when it is a root).
    pub fn stack_root(&self, branch: &BranchName) -> Result<BranchName, GraphError> {
        let ancestors = self.ancestors(branch)?;
        Ok(ancestors.last().cloned().unwrap_or_else(|| branch.clone()))
    }

    /// Every branch in the stack containing `branch`: root first, then
    /// the root's descendants in topological order.
    pub fn stack_branches(&self, branch: &BranchName) -> Result<Vec<BranchName>, GraphError> {
        let root = self.stack_root(branch)?;
        let mut out = vec![root.clone()];
        out.extend(self.descendants(&root));
        Ok(out)
    }

    /// Build the display forest.
    ///
    /// Roots (and children at every level) are ordered so the path that
    /// contains `current` comes first; remaining siblings are
    /// alphabetical. With [`TreeScope::CurrentStack`], only the stack
    /// containing `current` is built.
    pub fn build_tree(
        &self,
        current: Option<&BranchName>,
        scope: TreeScope,
    ) -> Result<Vec<TreeNode>, GraphError> {
        let on_current_path: BTreeSet<BranchName> = match current {
            Some(current) if self.contains(current) => {
                let mut path: BTreeSet<BranchName> =
                    self.ancestors(current)?.into_iter().collect();
                path.insert(current.clone());
                path
            }
            _ => BTreeSet::new(),
        };

        let roots: Vec<BranchName> = match (scope, current) {
            (TreeScope::CurrentStack, Some(current)) if self.contains(current) => {
                vec![self.stack_root(current)?]
            }
            _ => {
                let mut roots: Vec<BranchName> = self
                    .records
                    .iter()
                    .filter(|(_, record)| {
                        record.parent.is_trunk() || self.trunks.is_trunk(record.parent.name())
                    })
                    .map(|(branch, _)| branch.clone())
                    .collect();
                Self::order_siblings(&mut roots, &on_current_path);
                roots
            }
        };

        Ok(roots
            .into_iter()
            .map(|root| self.build_node(root, &on_current_path))
            .collect())
    }

    fn build_node(&self, branch: BranchName, on_current_path: &BTreeSet<BranchName>) -> TreeNode {
        let mut children = self.children(&branch);
        Self::order_siblings(&mut children, on_current_path);
        TreeNode {
            children: children
                .into_iter()
                .map(|child| self.build_node(child, on_current_path))
                .collect(),
            branch,
        }
    }

    /// Sort so members of the current path come first, then alphabetical.
    fn order_siblings(siblings: &mut [BranchName], on_current_path: &BTreeSet<BranchName>) {
        siblings.sort_by(|a, b| {
            let a_on = on_current_path.contains(a);
            let b_on = on_current_path.contains(b);
            b_on.cmp(&a_on).then_with(|| a.cmp(b))
        });
    }

    /// Validate a proposed reparenting of `branch` onto `parent`.
    ///
    /// Rejects self-parenting, parents that are descendants of the branch
    /// (which would cycle), and parents that are neither trunks nor
    /// tracked branches.
    pub fn validate_new_parent(
        &self,
        branch: &BranchName,
        parent: &BranchName,
    ) -> Result<(), GraphError> {
        if branch == parent {
            return Err(GraphError::SelfParent(branch.clone()));
        }
        if self.trunks.is_trunk(parent) {
            return Ok(());
        }
        if !self.contains(parent) {
            return Err(GraphError::MissingFromMetadata(parent.clone()));
        }
        if self.descendants(branch).contains(parent) {
            return Err(GraphError::WouldCycle {
                branch: branch.clone(),
                parent: parent.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::BranchRecord;
    use crate::core::types::Oid;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    /// main -> a -> b -> c, main -> d
    fn linear_plus_sibling() -> StackGraph {
        let mut records = BTreeMap::new();
        records.insert(branch("a"), BranchRecord::on_trunk(branch("main")));
        records.insert(branch("b"), BranchRecord::stacked(branch("a"), oid('1')));
        records.insert(branch("c"), BranchRecord::stacked(branch("b"), oid('2')));
        records.insert(branch("d"), BranchRecord::on_trunk(branch("main")));
        StackGraph::from_records(records, Trunks::new(branch("main"), vec![]))
    }

    #[test]
    fn trunk_of_walks_to_trunk() {
        let graph = linear_plus_sibling();
        assert_eq!(graph.trunk_of(&branch("c")).unwrap(), branch("main"));
        assert_eq!(graph.trunk_of(&branch("a")).unwrap(), branch("main"));
    }

    #[test]
    fn ancestors_nearest_first_excluding_trunk() {
        let graph = linear_plus_sibling();
        assert_eq!(
            graph.ancestors(&branch("c")).unwrap(),
            vec![branch("b"), branch("a")]
        );
        assert!(graph.ancestors(&branch("a")).unwrap().is_empty());
    }

    #[test]
    fn ancestors_of_unknown_branch_fails() {
        let graph = linear_plus_sibling();
        assert_eq!(
            graph.ancestors(&branch("nope")),
            Err(GraphError::Unknown(branch("nope")))
        );
    }

    #[test]
    fn descendants_topological() {
        let graph = linear_plus_sibling();
        assert_eq!(
            graph.descendants(&branch("a")),
            vec![branch("b"), branch("c")]
        );
        assert!(graph.descendants(&branch("c")).is_empty());
    }

    #[test]
    fn stack_membership() {
        let graph = linear_plus_sibling();
        assert_eq!(graph.stack_root(&branch("c")).unwrap(), branch("a"));
        assert_eq!(
            graph.stack_branches(&branch("b")).unwrap(),
            vec![branch("a"), branch("b"), branch("c")]
        );
        // Sibling stack is separate.
        assert_eq!(
            graph.stack_branches(&branch("d")).unwrap(),
            vec![branch("d")]
        );
    }

    #[test]
    fn build_tree_current_path_first() {
        // main -> a, main -> z-later; current is on z-later's path, so the
        // z root sorts before the alphabetically-earlier a.
        let mut records = BTreeMap::new();
        records.insert(branch("a"), BranchRecord::on_trunk(branch("main")));
        records.insert(branch("z-later"), BranchRecord::on_trunk(branch("main")));
        records.insert(
            branch("child"),
            BranchRecord::stacked(branch("z-later"), oid('1')),
        );
        let graph = StackGraph::from_records(records, Trunks::new(branch("main"), vec![]));

        let forest = graph
            .build_tree(Some(&branch("child")), TreeScope::All)
            .unwrap();
        assert_eq!(forest[0].branch, branch("z-later"));
        assert_eq!(forest[0].children[0].branch, branch("child"));
        assert_eq!(forest[1].branch, branch("a"));
    }

    #[test]
    fn build_tree_siblings_alphabetical_without_current() {
        let graph = linear_plus_sibling();
        let forest = graph.build_tree(None, TreeScope::All).unwrap();
        let roots: Vec<_> = forest.iter().map(|n| n.branch.as_str()).collect();
        assert_eq!(roots, ["a", "d"]);
    }

    #[test]
    fn build_tree_current_stack_scope() {
        let graph = linear_plus_sibling();
        let forest = graph
            .build_tree(Some(&branch("b")), TreeScope::CurrentStack)
            .unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].branch, branch("a"));
    }

    #[test]
    fn validate_new_parent_rejects_self() {
        let graph = linear_plus_sibling();
        assert_eq!(
            graph.validate_new_parent(&branch("a"), &branch("a")),
            Err(GraphError::SelfParent(branch("a")))
        );
    }

    #[test]
    fn validate_new_parent_rejects_descendant() {
        let graph = linear_plus_sibling();
        assert_eq!(
            graph.validate_new_parent(&branch("a"), &branch("c")),
            Err(GraphError::WouldCycle {
                branch: branch("a"),
                parent: branch("c"),
            })
        );
    }

    #[test]
    fn validate_new_parent_rejects_missing() {
        let graph = linear_plus_sibling();
        assert_eq!(
            graph.validate_new_parent(&branch("a"), &branch("missing")),
            Err(GraphError::MissingFromMetadata(branch("missing")))
        );
    }

    #[test]
    fn validate_new_parent_accepts_trunk_and_sibling() {
        let graph = linear_plus_sibling();
        assert!(graph
            .validate_new_parent(&branch("b"), &branch("main"))
            .is_ok());
        assert!(graph
            .validate_new_parent(&branch("b"), &branch("d"))
            .is_ok());
    }
}
