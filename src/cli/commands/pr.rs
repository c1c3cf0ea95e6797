//! cli::commands::pr
//!
//! Create (or surface) the pull request for the current branch.

use crate::core::metadata::MetadataStore;
use crate::engine::sync::SyncOrchestrator;
use crate::engine::{Context, EngineError};
use crate::forge::{Forge, ForgeError};
use crate::ui::Verbosity;

use super::{Workspace, EXIT_OK};

/// Run the pr command.
pub fn pr(ctx: &Context, draft: bool) -> anyhow::Result<i32> {
    let ws = Workspace::open(ctx)?;
    let _lock = ws.lock()?;

    let forge = ws
        .forge()
        .ok_or(EngineError::Forge(ForgeError::Unauthenticated))?;

    let store = MetadataStore::new(&ws.git, ws.trunks.clone());
    let progress = ws.progress(ctx);
    let orchestrator = SyncOrchestrator::new(
        &ws.git,
        &store,
        &ws.config,
        ws.paths.clone(),
        Some(&forge as &dyn Forge),
        &progress,
    );

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| EngineError::State(e.to_string()))?;
    let request = runtime.block_on(orchestrator.submit_current(draft))?;

    crate::ui::output::print(
        format!("#{} {}", request.number, request.permalink),
        Verbosity::from_flags(ctx.quiet, ctx.debug),
    );
    Ok(EXIT_OK)
}
