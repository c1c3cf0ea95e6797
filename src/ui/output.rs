//! ui::output
//!
//! Output formatting, verbosity, and the progress channel the engine
//! reports through.
//!
//! The engine itself never prints; it calls a [`Progress`] sink.
//! Commands hand it a console-backed sink, tests hand it a recorder.

use std::fmt::Display;
use std::sync::Mutex;

/// Output verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Minimal output.
    Quiet,
    /// Standard output.
    Normal,
    /// Verbose diagnostics.
    Debug,
}

impl Verbosity {
    /// Derive verbosity from global flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{message}");
    }
}

/// Print an error (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {message}");
}

/// Print a warning (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {message}");
    }
}

/// Progress sink for long-running engine operations.
pub trait Progress {
    /// Report a step the user should see.
    fn info(&self, message: &str);
}

/// Console-backed progress sink.
pub struct ConsoleProgress {
    verbosity: Verbosity,
}

impl ConsoleProgress {
    /// Create a sink honoring the given verbosity.
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

impl Progress for ConsoleProgress {
    fn info(&self, message: &str) {
        print(message, self.verbosity);
    }
}

/// Discards all progress (library use, tests that don't care).
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn info(&self, _message: &str) {}
}

/// Records progress lines for assertions.
#[derive(Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<String>>,
}

impl RecordingProgress {
    /// A fresh recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything reported so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Progress for RecordingProgress {
    fn info(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn recorder_captures_in_order() {
        let progress = RecordingProgress::new();
        progress.info("one");
        progress.info("two");
        assert_eq!(progress.lines(), ["one", "two"]);
    }
}
