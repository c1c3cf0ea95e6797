//! ui
//!
//! User-facing output utilities.

pub mod output;

pub use output::{ConsoleProgress, Progress, RecordingProgress, SilentProgress, Verbosity};
