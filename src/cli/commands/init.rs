//! cli::commands::init
//!
//! Initialize av in a repository: write the repository record and the
//! repo-level config skeleton.

use crate::core::config::{Config, RepoConfig};
use crate::core::metadata::{RepositoryError, RepositoryRecord};
use crate::engine::{Context, EngineError};
use crate::git::interface::parse_owner_repo;
use crate::ui::Verbosity;

use super::{Workspace, EXIT_OK};

/// Run the init command.
pub fn init(ctx: &Context, trunk: Option<&str>, force: bool) -> anyhow::Result<i32> {
    let ws = Workspace::open(ctx)?;
    let _lock = ws.lock()?;

    match RepositoryRecord::try_load(&ws.paths) {
        Ok(Some(_)) if !force => {
            return Err(EngineError::Precondition(
                "already initialized; rerun with --force to reinitialize".into(),
            )
            .into());
        }
        Ok(_) => {}
        Err(RepositoryError::Corrupted { .. }) if force => {}
        Err(e) => return Err(EngineError::from(e).into()),
    }

    let remote = ws.config.remote();
    let url = ws.git.remote_url(remote)?.ok_or_else(|| {
        EngineError::Precondition(format!(
            "remote '{remote}' is not configured; add it before initializing"
        ))
    })?;
    let (owner, name) = parse_owner_repo(&url).ok_or_else(|| {
        EngineError::Precondition(format!("cannot parse owner/repo from remote url '{url}'"))
    })?;

    let record = RepositoryRecord {
        id: format!("{owner}/{name}"),
        owner,
        name,
    };
    record.save(&ws.paths)?;

    let mut repo_config = ws.config.repo.clone().unwrap_or_default();
    if let Some(trunk) = trunk {
        let trunk = trunk.to_string();
        if !repo_config.additional_trunks.contains(&trunk) {
            repo_config.additional_trunks.push(trunk);
        }
    }
    Config::write_repo(&ws.paths, &repo_config)
        .map_err(|e| EngineError::Precondition(e.to_string()))?;

    crate::ui::output::print(
        format!(
            "Initialized av for {}/{} (trunk: {}).",
            record.owner,
            record.name,
            ws.trunks.default_branch()
        ),
        Verbosity::from_flags(ctx.quiet, ctx.debug),
    );
    Ok(EXIT_OK)
}
