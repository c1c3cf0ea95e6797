//! cli::commands::adopt
//!
//! Start tracking an existing branch.
//!
//! The parent is explicit (`--parent`) or inferred: the nearest trunk or
//! tracked branch whose head is an ancestor of the adopted branch. The
//! recorded branching point is the merge base with the chosen parent.
//!
//! Adopting an already-tracked branch changes nothing.

use crate::core::graph::StackGraph;
use crate::core::metadata::{BranchRecord, MetadataStore, ParentState};
use crate::core::types::{BranchName, Oid};
use crate::engine::{Context, EngineError};
use crate::git::Git;
use crate::ui::{Progress, Verbosity};

use super::{Workspace, EXIT_OK};

/// Run the adopt command.
pub fn adopt(
    ctx: &Context,
    branch: Option<&str>,
    parent: Option<&str>,
) -> anyhow::Result<i32> {
    let ws = Workspace::open(ctx)?;
    let _lock = ws.lock()?;

    let branch = match branch {
        Some(name) => BranchName::new(name).map_err(|e| EngineError::UserInput(e.to_string()))?,
        None => ws.git.current_branch()?.ok_or_else(|| {
            EngineError::Precondition("HEAD is detached; name a branch to adopt".into())
        })?,
    };

    if ws.trunks.is_trunk(&branch) {
        return Err(EngineError::UserInput(format!(
            "'{branch}' is a trunk; trunks are not tracked"
        ))
        .into());
    }
    let Some(head) = ws.git.branch_head(&branch)? else {
        return Err(EngineError::UserInput(format!(
            "branch '{branch}' does not exist"
        ))
        .into());
    };

    let store = MetadataStore::new(&ws.git, ws.trunks.clone());
    let graph = StackGraph::load(&store.read_tx()?)?;
    let progress = ws.progress(ctx);

    if graph.contains(&branch) {
        progress.info(&format!("'{branch}' is already tracked."));
        return Ok(EXIT_OK);
    }

    let parent = match parent {
        Some(name) => {
            let parent =
                BranchName::new(name).map_err(|e| EngineError::UserInput(e.to_string()))?;
            graph.validate_new_parent(&branch, &parent)?;
            parent
        }
        None => infer_parent(&ws.git, &graph, &branch, &head)?,
    };

    let record = if ws.trunks.is_trunk(&parent) {
        BranchRecord::on_trunk(parent.clone())
    } else {
        let branching_point = branching_point(&ws.git, &head, &parent)?;
        BranchRecord {
            parent: ParentState::Stacked {
                name: parent.clone(),
                branching_point: Some(branching_point),
            },
            children: Vec::new(),
            request: None,
            merge_commit: None,
        }
    };

    let mut tx = store.write_tx()?;
    tx.put(branch.clone(), record);
    tx.commit()?;

    crate::ui::output::print(
        format!("Tracking '{branch}' with parent '{parent}'."),
        Verbosity::from_flags(ctx.quiet, ctx.debug),
    );
    Ok(EXIT_OK)
}

/// Find the nearest trunk or tracked branch whose head is an ancestor of
/// the adopted branch. Tracked branches win ties against trunks at the
/// same commit.
fn infer_parent(
    git: &Git,
    graph: &StackGraph,
    branch: &BranchName,
    head: &Oid,
) -> Result<BranchName, EngineError> {
    let mut candidates: Vec<BranchName> = graph.trunks().iter().cloned().collect();
    candidates.extend(graph.branches().cloned());

    let mut best: Option<(BranchName, Oid)> = None;
    for candidate in candidates {
        if candidate == *branch {
            continue;
        }
        let Some(candidate_head) = git.branch_head(&candidate)? else {
            continue;
        };
        if !git.is_ancestor(&candidate_head, head)? {
            continue;
        }
        let replace = match &best {
            None => true,
            Some((_, best_head)) => git.is_ancestor(best_head, &candidate_head)?,
        };
        if replace {
            best = Some((candidate, candidate_head));
        }
    }

    best.map(|(name, _)| name).ok_or_else(|| {
        EngineError::UserInput(format!(
            "cannot infer a parent for '{branch}'; pass --parent"
        ))
    })
}

/// The branching point to record for a stacked adoption.
fn branching_point(git: &Git, head: &Oid, parent: &BranchName) -> Result<Oid, EngineError> {
    let parent_head = git.branch_head(parent)?.ok_or_else(|| {
        EngineError::UserInput(format!("parent branch '{parent}' does not exist"))
    })?;
    git.merge_base(head, &parent_head)?.ok_or_else(|| {
        EngineError::UserInput(format!(
            "'{parent}' shares no history with the adopted branch"
        ))
    })
}
