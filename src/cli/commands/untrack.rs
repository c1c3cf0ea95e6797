//! cli::commands::untrack
//!
//! Stop tracking a branch (the tidy operation). The branch itself is
//! left alone; only its metadata goes away.

use crate::core::graph::StackGraph;
use crate::core::metadata::MetadataStore;
use crate::core::types::BranchName;
use crate::engine::{Context, EngineError};
use crate::ui::Verbosity;

use super::{Workspace, EXIT_OK};

/// Run the untrack command.
pub fn untrack(ctx: &Context, branch: Option<&str>) -> anyhow::Result<i32> {
    let ws = Workspace::open(ctx)?;
    let _lock = ws.lock()?;

    let branch = match branch {
        Some(name) => BranchName::new(name).map_err(|e| EngineError::UserInput(e.to_string()))?,
        None => ws.git.current_branch()?.ok_or_else(|| {
            EngineError::Precondition("HEAD is detached; name a branch to untrack".into())
        })?,
    };

    let store = MetadataStore::new(&ws.git, ws.trunks.clone());
    let graph = StackGraph::load(&store.read_tx()?)?;

    if !graph.contains(&branch) {
        return Err(EngineError::UserInput(format!(
            "branch '{branch}' is not tracked"
        ))
        .into());
    }
    let children = graph.children(&branch);
    if !children.is_empty() {
        return Err(EngineError::UserInput(format!(
            "branch '{branch}' has stacked children ({}); reparent them first",
            children
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .into());
    }

    let mut tx = store.write_tx()?;
    tx.delete(branch.clone());
    tx.commit()?;

    crate::ui::output::print(
        format!("Stopped tracking '{branch}'."),
        Verbosity::from_flags(ctx.quiet, ctx.debug),
    );
    Ok(EXIT_OK)
}
