//! cli::commands::sync
//!
//! Sync the current stack: fetch trunks, detect merges, restack over
//! upstream movement, push, update requests, optionally prune.

use crate::core::metadata::MetadataStore;
use crate::core::types::BranchName;
use crate::engine::sequencer::ResumeAction;
use crate::engine::state::SyncOptions;
use crate::engine::sync::SyncOrchestrator;
use crate::engine::{Context, EngineError};
use crate::forge::Forge;

use super::{report_outcome, Workspace};

/// Run the sync command.
#[allow(clippy::too_many_arguments)]
pub fn sync(
    ctx: &Context,
    current: bool,
    to_trunk: bool,
    no_push: bool,
    no_fetch: bool,
    parent: Option<&str>,
    prune: bool,
    resume: Option<ResumeAction>,
) -> anyhow::Result<i32> {
    let ws = Workspace::open(ctx)?;
    let _lock = ws.lock()?;

    let parent_override = parent
        .map(BranchName::new)
        .transpose()
        .map_err(|e| EngineError::UserInput(e.to_string()))?;

    let options = SyncOptions {
        current_only: current,
        to_trunk,
        push: !no_push,
        fetch: !no_fetch,
        prune,
        parent_override,
    };

    let store = MetadataStore::new(&ws.git, ws.trunks.clone());
    let forge = ws.forge();
    let progress = ws.progress(ctx);
    let orchestrator = SyncOrchestrator::new(
        &ws.git,
        &store,
        &ws.config,
        ws.paths.clone(),
        forge.as_ref().map(|f| f as &dyn Forge),
        &progress,
    );

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| EngineError::State(e.to_string()))?;
    let outcome = runtime.block_on(async {
        match resume {
            Some(action) => orchestrator.resume(action).await,
            None => orchestrator.sync(options).await,
        }
    })?;

    Ok(report_outcome(&outcome, ctx, "sync"))
}
