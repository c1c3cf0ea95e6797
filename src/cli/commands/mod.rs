//! cli::commands
//!
//! Command handlers.
//!
//! Handlers are thin: open the repository, build the engine pieces,
//! delegate, and map the outcome to an exit code. No handler mutates
//! repository state directly.

mod adopt;
mod completion;
mod init;
mod pr;
mod reparent;
mod restack;
mod sync;
mod untrack;

pub use adopt::adopt;
pub use completion::completion;
pub use init::init;
pub use pr::pr;
pub use reparent::reparent;
pub use restack::restack;
pub use sync::sync;
pub use untrack::untrack;

use std::path::PathBuf;

use crate::core::config::Config;
use crate::core::lock::RepoLock;
use crate::core::metadata::Trunks;
use crate::core::paths::AvPaths;
use crate::core::types::BranchName;
use crate::engine::sequencer::ResumeAction;
use crate::engine::sync::SyncOutcome;
use crate::engine::{Context, EngineError};
use crate::git::Git;
use crate::ui::{ConsoleProgress, Verbosity};

use super::args::Command;

/// Exit code for success.
pub const EXIT_OK: i32 = 0;
/// Exit code for a resumable interruption (conflict, state persisted).
pub const EXIT_INTERRUPTED: i32 = 1;

/// Everything a command needs about the repository it runs in.
pub struct Workspace {
    pub git: Git,
    pub paths: AvPaths,
    pub config: Config,
    pub trunks: Trunks,
}

impl Workspace {
    /// Open the repository containing the working directory (honoring
    /// `--cwd`) and load its configuration.
    pub fn open(ctx: &Context) -> Result<Self, EngineError> {
        let cwd = ctx
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let git = Git::open(&cwd).map_err(|e| EngineError::Precondition(e.to_string()))?;
        let paths = AvPaths::new(git.info().common_dir);
        let config = Config::load(Some(&paths))
            .map_err(|e| EngineError::Precondition(e.to_string()))?;

        let default = git.default_branch(config.remote())?;
        let additional = config
            .additional_trunks()
            .iter()
            .filter_map(|name| BranchName::new(name.clone()).ok())
            .collect();
        let trunks = Trunks::new(default, additional);

        Ok(Self {
            git,
            paths,
            config,
            trunks,
        })
    }

    /// Acquire the exclusive operation lock for a mutating command.
    pub fn lock(&self) -> Result<RepoLock, EngineError> {
        RepoLock::acquire(&self.paths).map_err(|e| EngineError::Precondition(e.to_string()))
    }

    /// Progress sink honoring the global flags.
    pub fn progress(&self, ctx: &Context) -> ConsoleProgress {
        ConsoleProgress::new(Verbosity::from_flags(ctx.quiet, ctx.debug))
    }

    /// Build the forge client, when a token and a parseable remote URL
    /// are available. Commands that merely tolerate a missing forge use
    /// the `None` they get back; commands that require one surface
    /// an authentication error themselves.
    pub fn forge(&self) -> Option<crate::forge::GitHubForge> {
        let url = self.git.remote_url(self.config.remote()).ok().flatten()?;
        crate::forge::create_forge(&self.config, &url).ok()
    }
}

/// Map resume flags to an action, when any is set.
pub(crate) fn resume_action(cont: bool, abort: bool, skip: bool) -> Option<ResumeAction> {
    if cont {
        Some(ResumeAction::Continue)
    } else if abort {
        Some(ResumeAction::Abort)
    } else if skip {
        Some(ResumeAction::Skip)
    } else {
        None
    }
}

/// Render an outcome to the user and pick the exit code.
pub(crate) fn report_outcome(outcome: &SyncOutcome, ctx: &Context, flow: &str) -> i32 {
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    match outcome {
        SyncOutcome::Completed { synced, pruned } => {
            if *synced == 0 && pruned.is_empty() {
                crate::ui::output::print("Already up to date.", verbosity);
            } else {
                crate::ui::output::print(format!("{flow} complete."), verbosity);
                for branch in pruned {
                    crate::ui::output::print(format!("Pruned '{branch}'."), verbosity);
                }
            }
            EXIT_OK
        }
        SyncOutcome::Interrupted {
            branch,
            headline,
            hint,
        } => {
            eprintln!("{headline}");
            if !hint.is_empty() {
                eprintln!("{hint}");
            }
            eprintln!();
            eprintln!(
                "Resolve the conflicts in '{branch}', stage the results, then run \
                 'av {flow} --continue' (or --skip / --abort)."
            );
            EXIT_INTERRUPTED
        }
        SyncOutcome::Aborted => {
            crate::ui::output::print(format!("{flow} aborted."), verbosity);
            EXIT_OK
        }
    }
}

/// Dispatch a parsed command. Returns the process exit code.
pub fn dispatch(command: Command, ctx: &Context) -> anyhow::Result<i32> {
    match command {
        Command::Init { trunk, force } => init(ctx, trunk.as_deref(), force),
        Command::Adopt { branch, parent } => adopt(ctx, branch.as_deref(), parent.as_deref()),
        Command::Untrack { branch } => untrack(ctx, branch.as_deref()),
        Command::Sync {
            current,
            trunk,
            no_push,
            no_fetch,
            parent,
            prune,
            cont,
            abort,
            skip,
        } => sync(
            ctx,
            current,
            trunk,
            no_push,
            no_fetch,
            parent.as_deref(),
            prune,
            resume_action(cont, abort, skip),
        ),
        Command::Restack {
            all,
            current,
            cont,
            abort,
            skip,
        } => restack(ctx, all, current, resume_action(cont, abort, skip)),
        Command::Reparent { new_parent } => reparent(ctx, &new_parent),
        Command::Pr { draft } => pr(ctx, draft),
        Command::Completion { shell } => completion(shell),
    }
}
