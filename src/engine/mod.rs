//! engine
//!
//! The stack engine: rebase sequencer, planners, and the sync
//! orchestrator.
//!
//! # Lifecycle
//!
//! Mutating commands follow one shape: check preconditions (clean
//! worktree, no suspended operation), plan (a list of per-branch rebase
//! operations, parents before children), execute through the sequencer,
//! then integrate with the forge. The sequencer persists its position
//! before every Git mutation, so a conflict suspends the whole flow and
//! `--continue` / `--skip` / `--abort` resume it in a later process.
//!
//! # Errors vs interruptions
//!
//! A rebase conflict is not an error. It is the one designated
//! human-interaction suspension point and is modelled as an explicit
//! outcome ([`sequencer::SequencerStatus::Interrupted`]), mapped to exit
//! code 1 by the CLI. [`EngineError`] covers the actual failure
//! taxonomy.

pub mod plan;
pub mod sequencer;
pub mod state;
pub mod sync;

pub use plan::{plan_reparent, plan_restack, plan_sync, RestackScope};
pub use sequencer::{ResumeAction, Sequencer, SequencerStatus};
pub use state::{ParentSnapshot, RebaseOp, SequencerKind, SequencerState, SyncOptions, SyncState};
pub use sync::{SyncOrchestrator, SyncOutcome};

use thiserror::Error;

use crate::core::graph::GraphError;
use crate::core::metadata::{RepositoryError, StoreError};
use crate::forge::ForgeError;
use crate::git::GitError;

/// Execution context derived from global CLI flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Working directory override (`--cwd`).
    pub cwd: Option<std::path::PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode.
    pub quiet: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            cwd: None,
            debug: false,
            quiet: false,
        }
    }
}

/// The engine failure taxonomy.
///
/// Conflicts are deliberately absent: they are outcomes, not errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A Git operation failed (other than a rebase conflict).
    #[error(transparent)]
    Git(#[from] GitError),

    /// A metadata transaction was rejected or failed.
    #[error(transparent)]
    Metadata(#[from] StoreError),

    /// The forge reported a failure.
    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// Persisted engine state could not be written.
    #[error("failed to persist engine state: {0}")]
    State(String),

    /// The repository is not in a state the operation can start from.
    #[error("{0}")]
    Precondition(String),

    /// The user asked for something invalid.
    #[error("{0}")]
    UserInput(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<GraphError> for EngineError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::SelfParent(_) | GraphError::WouldCycle { .. } => {
                EngineError::UserInput(err.to_string())
            }
            GraphError::Unknown(_) | GraphError::MissingFromMetadata(_) => {
                EngineError::UserInput(err.to_string())
            }
            GraphError::NoTrunk(_) => EngineError::Metadata(StoreError::InvalidMetadata(
                err.to_string(),
            )),
        }
    }
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotInitialized => EngineError::Precondition(err.to_string()),
            other => EngineError::Precondition(other.to_string()),
        }
    }
}

impl EngineError {
    /// Exit code for this failure: 2 for user/precondition errors, 3 for
    /// everything unexpected. (Exit 1 is reserved for resumable
    /// interruptions, which are not errors.)
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Precondition(_) | EngineError::UserInput(_) => 2,
            _ => 3,
        }
    }

    /// One-line classification for the user.
    pub fn classification(&self) -> &'static str {
        match self {
            EngineError::Git(_) => "git failure",
            EngineError::Metadata(_) => "metadata failure",
            EngineError::Forge(ForgeError::Unauthenticated) => "forge authentication",
            EngineError::Forge(_) => "forge failure",
            EngineError::State(_) => "state persistence failure",
            EngineError::Precondition(_) => "precondition failed",
            EngineError::UserInput(_) => "invalid request",
            EngineError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BranchName;

    #[test]
    fn exit_codes_by_category() {
        assert_eq!(
            EngineError::UserInput("nope".into()).exit_code(),
            2
        );
        assert_eq!(
            EngineError::Precondition("dirty".into()).exit_code(),
            2
        );
        assert_eq!(EngineError::Forge(ForgeError::RateLimited).exit_code(), 3);
    }

    #[test]
    fn graph_errors_map_to_user_input() {
        let branch = BranchName::new("a").unwrap();
        let err: EngineError = GraphError::SelfParent(branch).into();
        assert!(matches!(err, EngineError::UserInput(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unauthenticated_is_distinct() {
        let err = EngineError::Forge(ForgeError::Unauthenticated);
        assert_eq!(err.classification(), "forge authentication");
    }
}
