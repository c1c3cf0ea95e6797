//! avstack - the engine behind a CLI for stacked branches and pull
//! requests.
//!
//! A stack is a chain (or tree) of short branches where each branch
//! targets its parent as merge base and only the lowest targets trunk.
//! This crate automates what makes that painful by hand: replaying a
//! stack over trunk and ancestor movement without duplicating history,
//! rewriting parent pointers and restacking in dependency order, and
//! keeping a recoverable model of the stack and its pull requests inside
//! the repository itself.
//!
//! # Architecture
//!
//! - [`cli`] - argument parsing and thin command handlers
//! - [`engine`] - rebase sequencer, planners, sync orchestrator
//! - [`core`] - domain types, configuration, metadata store, stack model
//! - [`git`] - the single doorway to Git
//! - [`forge`] - code-review host abstraction and the request body codec
//! - [`ui`] - output and progress reporting
//!
//! # Invariants
//!
//! - Branch metadata forms an acyclic forest rooted at trunks; every
//!   write passes through a validating transaction.
//! - The sequencer persists its position before every Git mutation;
//!   conflicts suspend rather than fail, and resume across processes.
//! - Request bodies round-trip: machine-maintained regions are stripped
//!   on read and re-emitted on write, preserving the user's prose.

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod git;
pub mod ui;
