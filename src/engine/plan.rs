//! engine::plan
//!
//! Planners: translate high-level intents into ordered rebase
//! operations.
//!
//! Planners only read the stack model; they never touch Git. Every plan
//! is topologically ordered (parents before children) because the
//! sequencer executes strictly in list order.

use crate::core::graph::StackGraph;
use crate::core::metadata::ParentState;
use crate::core::types::{BranchName, Oid};

use super::state::RebaseOp;
use super::EngineError;

/// Scope of a restack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestackScope {
    /// Every tracked branch.
    All,
    /// The current branch and its ancestors.
    CurrentAndAncestors,
    /// The whole stack containing the current branch.
    CurrentStack,
}

/// Plan a restack: reaffirm every branch's recorded parent.
///
/// Branches already attributed to a merge are left alone; their commits
/// live on trunk and replaying them would duplicate history.
pub fn plan_restack(
    graph: &StackGraph,
    scope: RestackScope,
    current: Option<&BranchName>,
) -> Result<Vec<RebaseOp>, EngineError> {
    let branches = match scope {
        RestackScope::All => all_in_topological_order(graph),
        RestackScope::CurrentStack => {
            let current = require_current(graph, current)?;
            graph.stack_branches(&current)?
        }
        RestackScope::CurrentAndAncestors => {
            let current = require_current(graph, current)?;
            let mut chain = graph.ancestors(&current)?;
            chain.reverse();
            chain.push(current);
            chain
        }
    };

    Ok(reaffirm_ops(graph, &branches))
}

/// Plan a sync over an ordered branch list.
///
/// Per branch:
/// - already merged: skip (nothing left to replay);
/// - parent merged: move onto the trunk — at the parent's merge commit
///   by default (the child's diff base is exactly that squash), or at
///   the remote trunk head with `to_trunk`;
/// - otherwise: reaffirm the recorded parent.
pub fn plan_sync(
    graph: &StackGraph,
    branches: &[BranchName],
    to_trunk: bool,
) -> Result<Vec<RebaseOp>, EngineError> {
    let mut ops = Vec::new();
    for branch in branches {
        let Some(record) = graph.record(branch) else {
            continue;
        };
        if record.is_merged() {
            continue;
        }

        let parent_name = record.parent.name().clone();
        let parent_merge = graph
            .record(&parent_name)
            .and_then(|parent| parent.merge_commit.clone());

        match parent_merge {
            Some(merge_commit) => {
                let trunk = graph.trunk_of(branch)?;
                let hash = if to_trunk {
                    // Zero sentinel: the sequencer resolves the remote
                    // trunk head at execution time.
                    Some(Oid::zero())
                } else {
                    Some(merge_commit)
                };
                ops.push(RebaseOp {
                    target: branch.clone(),
                    new_parent: trunk,
                    new_parent_is_trunk: true,
                    new_parent_hash: hash,
                });
            }
            None => ops.extend(reaffirm_ops(graph, std::slice::from_ref(branch))),
        }
    }
    Ok(ops)
}

/// Plan a reparent: move `target` onto `new_parent`, then reaffirm every
/// descendant.
///
/// Descendants move implicitly with the rebase of their ancestor, but
/// their recorded branching points are stale afterwards; the reaffirming
/// operations re-record them.
pub fn plan_reparent(
    graph: &StackGraph,
    target: &BranchName,
    new_parent: &BranchName,
) -> Result<Vec<RebaseOp>, EngineError> {
    if !graph.contains(target) {
        return Err(EngineError::UserInput(format!(
            "branch '{target}' is not tracked"
        )));
    }
    graph.validate_new_parent(target, new_parent)?;

    let mut ops = vec![RebaseOp {
        target: target.clone(),
        new_parent: new_parent.clone(),
        new_parent_is_trunk: graph.trunks().is_trunk(new_parent),
        new_parent_hash: None,
    }];
    ops.extend(reaffirm_ops(graph, &graph.descendants(target)));
    Ok(ops)
}

/// Reaffirming operations for the given branches, skipping merged ones.
fn reaffirm_ops(graph: &StackGraph, branches: &[BranchName]) -> Vec<RebaseOp> {
    let mut ops = Vec::new();
    for branch in branches {
        let Some(record) = graph.record(branch) else {
            continue;
        };
        if record.is_merged() {
            continue;
        }
        let parent = record.parent.name().clone();
        let is_trunk = matches!(record.parent, ParentState::Trunk { .. })
            || graph.trunks().is_trunk(&parent);
        ops.push(RebaseOp::reaffirm(branch.clone(), parent, is_trunk));
    }
    ops
}

/// Every tracked branch, parents before children.
fn all_in_topological_order(graph: &StackGraph) -> Vec<BranchName> {
    let mut by_depth: Vec<(usize, BranchName)> = graph
        .branches()
        .map(|branch| {
            let depth = graph.ancestors(branch).map(|a| a.len()).unwrap_or(0);
            (depth, branch.clone())
        })
        .collect();
    by_depth.sort();
    by_depth.into_iter().map(|(_, branch)| branch).collect()
}

fn require_current(
    graph: &StackGraph,
    current: Option<&BranchName>,
) -> Result<BranchName, EngineError> {
    let current = current.ok_or_else(|| {
        EngineError::Precondition("not on a branch; check out a tracked branch first".into())
    })?;
    if !graph.contains(current) {
        return Err(EngineError::UserInput(format!(
            "branch '{current}' is not tracked"
        )));
    }
    Ok(current.clone())
}
