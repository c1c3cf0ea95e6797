//! cli
//!
//! Command-line interface layer.
//!
//! The CLI is thin: parse arguments, build the execution context,
//! dispatch to a command handler, and turn the result into an exit code.
//! Repository mutations all happen behind the engine.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::engine::Context;
use crate::ui;

/// Run the CLI. Returns the process exit code:
/// 0 success, 1 resumable interruption, 2 user error, 3 unexpected
/// failure.
pub fn run() -> i32 {
    let cli = Cli::parse_args();

    if cli.debug {
        init_tracing();
    }

    let ctx = Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };

    match commands::dispatch(cli.command, &ctx) {
        Ok(code) => code,
        Err(error) => match normalize(error) {
            Ok(engine) => {
                ui::output::error(format!("{}: {}", engine.classification(), engine));
                engine.exit_code()
            }
            Err(other) => {
                ui::output::error(format!("unexpected failure: {other:#}"));
                3
            }
        },
    }
}

/// Recover the engine's failure taxonomy from an anyhow error so the
/// documented exit codes and one-line classifications survive the CLI
/// boundary.
fn normalize(error: anyhow::Error) -> Result<crate::engine::EngineError, anyhow::Error> {
    use crate::core::graph::GraphError;
    use crate::core::metadata::{RepositoryError, StoreError};
    use crate::engine::EngineError;
    use crate::forge::ForgeError;
    use crate::git::GitError;

    error
        .downcast::<EngineError>()
        .or_else(|e| e.downcast::<GraphError>().map(EngineError::from))
        .or_else(|e| e.downcast::<GitError>().map(EngineError::from))
        .or_else(|e| e.downcast::<StoreError>().map(EngineError::from))
        .or_else(|e| e.downcast::<ForgeError>().map(EngineError::from))
        .or_else(|e| e.downcast::<RepositoryError>().map(EngineError::from))
}

/// Install the diagnostic tracing subscriber for `--debug` runs.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("avstack=debug"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
