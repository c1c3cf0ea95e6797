//! cli::commands::reparent
//!
//! Move the current branch (and its subtree) onto a new parent.

use crate::core::metadata::MetadataStore;
use crate::core::types::BranchName;
use crate::engine::sync::SyncOrchestrator;
use crate::engine::{Context, EngineError};

use super::{report_outcome, Workspace};

/// Run the reparent command.
pub fn reparent(ctx: &Context, new_parent: &str) -> anyhow::Result<i32> {
    let ws = Workspace::open(ctx)?;
    let _lock = ws.lock()?;

    let new_parent =
        BranchName::new(new_parent).map_err(|e| EngineError::UserInput(e.to_string()))?;

    let store = MetadataStore::new(&ws.git, ws.trunks.clone());
    let progress = ws.progress(ctx);
    let orchestrator = SyncOrchestrator::new(
        &ws.git,
        &store,
        &ws.config,
        ws.paths.clone(),
        None,
        &progress,
    );

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| EngineError::State(e.to_string()))?;
    let outcome = runtime.block_on(orchestrator.reparent(&new_parent))?;

    Ok(report_outcome(&outcome, ctx, "reparent"))
}
