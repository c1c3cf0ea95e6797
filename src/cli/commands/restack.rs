//! cli::commands::restack
//!
//! Rebase tracked branches onto their recorded parents. Purely local:
//! no fetch, no forge.

use crate::core::metadata::MetadataStore;
use crate::engine::plan::RestackScope;
use crate::engine::sequencer::ResumeAction;
use crate::engine::sync::SyncOrchestrator;
use crate::engine::{Context, EngineError};

use super::{report_outcome, Workspace};

/// Run the restack command.
pub fn restack(
    ctx: &Context,
    all: bool,
    current: bool,
    resume: Option<ResumeAction>,
) -> anyhow::Result<i32> {
    let ws = Workspace::open(ctx)?;
    let _lock = ws.lock()?;

    let scope = if all {
        RestackScope::All
    } else if current {
        RestackScope::CurrentAndAncestors
    } else {
        RestackScope::CurrentStack
    };

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
    let outcome = runtime.block_on(async {
        match resume {
            Some(action) => orchestrator.resume(action).await,
            None => orchestrator.restack(scope).await,
        }
    })?;

    Ok(report_outcome(&outcome, ctx, "restack"))
}
