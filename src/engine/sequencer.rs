//! engine::sequencer
//!
//! The interruptible rebase sequencer.
//!
//! A sequence is an ordered list of per-branch rebase operations
//! (parents before children; planners own the ordering, the sequencer
//! never reorders). Three macro-states:
//!
//! - **idle** — no persisted state file.
//! - **running** — state persisted, cursor on the next operation.
//! - **interrupted** — a rebase stopped on conflicts; the resolved
//!   onto-hash is recorded so `--continue` / `--skip` can finish the
//!   operation in a later process.
//!
//! Per operation the sequencer computes
//! `git rebase --onto <new-parent-head> <previously-synced-parent-head>`:
//! the upstream bounds the replay range to exactly the commits that
//! belong to the target, which is what keeps a child from dragging
//! along orphaned copies of its parent's commits after the parent was
//! itself rebased or squash-merged.
//!
//! After each successful operation the target's metadata is updated in
//! its own write transaction, so a crash loses at most the step in
//! flight; the next run repairs the branching point from `merge-base`.

use std::collections::BTreeMap;

use crate::core::metadata::{BranchRecord, MetadataStore, ParentState};
use crate::core::paths::AvPaths;
use crate::core::types::{BranchName, Oid};
use crate::git::{Git, RebaseOutcome};

use super::state::{ParentSnapshot, RebaseOp, SequencerKind, SequencerState};
use super::EngineError;

/// How to resume a suspended sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    /// Conflicts resolved; continue the in-flight rebase.
    Continue,
    /// Drop the conflicting commit and continue.
    Skip,
    /// Abort the in-flight rebase and forget the sequence.
    Abort,
}

/// Outcome of driving a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerStatus {
    /// Every operation completed; state cleared.
    Completed,
    /// A rebase stopped on conflicts; state persisted for resume.
    Interrupted {
        /// The branch whose rebase conflicted.
        branch: BranchName,
        /// One-line description.
        headline: String,
        /// Captured git output, shown verbatim.
        hint: String,
    },
    /// The sequence was aborted on request.
    Aborted,
    /// Resume was requested but nothing is suspended.
    Idle,
}

/// The sequencer, bound to one repository and one flow kind.
pub struct Sequencer<'a> {
    git: &'a Git,
    store: &'a MetadataStore<'a>,
    paths: AvPaths,
    kind: SequencerKind,
    remote: String,
}

impl<'a> Sequencer<'a> {
    /// Create a sequencer for one flow.
    pub fn new(
        git: &'a Git,
        store: &'a MetadataStore<'a>,
        paths: AvPaths,
        kind: SequencerKind,
        remote: impl Into<String>,
    ) -> Self {
        Self {
            git,
            store,
            paths,
            kind,
            remote: remote.into(),
        }
    }

    /// The persisted state for this kind, if any.
    pub fn persisted(&self) -> Option<SequencerState> {
        SequencerState::load(&self.paths, self.kind)
    }

    /// Start a fresh sequence.
    ///
    /// Pre-sequence parent snapshots are captured from metadata before
    /// the first mutation; they are what later operations compute their
    /// replay ranges against, even after earlier operations have moved
    /// those same parents.
    pub fn start(&self, operations: Vec<RebaseOp>) -> Result<SequencerStatus, EngineError> {
        if operations.is_empty() {
            return Ok(SequencerStatus::Completed);
        }
        if self.persisted().is_some() {
            return Err(EngineError::Precondition(format!(
                "a {} sequence is already in progress; resolve it with --continue, --skip, or --abort",
                self.kind
            )));
        }

        let snapshots = self.capture_snapshots(&operations)?;
        let state = SequencerState::new(self.kind, self.remote.clone(), operations, snapshots);
        state.save(&self.paths)?;
        self.run(state)
    }

    /// Resume a suspended sequence.
    pub fn resume(&self, action: ResumeAction) -> Result<SequencerStatus, EngineError> {
        let Some(mut state) = self.persisted() else {
            return Ok(SequencerStatus::Idle);
        };

        match action {
            ResumeAction::Abort => {
                self.git.rebase_abort()?;
                SequencerState::clear(&self.paths, self.kind);
                Ok(SequencerStatus::Aborted)
            }
            ResumeAction::Continue | ResumeAction::Skip => {
                let Some(op) = state.current_op().cloned() else {
                    SequencerState::clear(&self.paths, self.kind);
                    return Ok(SequencerStatus::Completed);
                };
                let onto = match state.interrupt_new_parent_hash.clone() {
                    Some(oid) => oid,
                    // Suspended without a recorded hash should not
                    // happen; recompute from the operation.
                    None => self.resolve_onto(&op)?,
                };

                let outcome = match action {
                    ResumeAction::Continue => self.git.rebase_continue()?,
                    _ => self.git.rebase_skip()?,
                };

                match outcome {
                    RebaseOutcome::Updated | RebaseOutcome::AlreadyUpToDate => {
                        self.finish_op(&mut state, &op, &onto)?;
                        self.run(state)
                    }
                    RebaseOutcome::Conflict { headline, hint } => {
                        state.interrupt_new_parent_hash = Some(onto);
                        state.save(&self.paths)?;
                        Ok(SequencerStatus::Interrupted {
                            branch: op.target.clone(),
                            headline,
                            hint,
                        })
                    }
                    RebaseOutcome::NotInProgress => {
                        // The git rebase ended outside our control. If the
                        // branch already sits on the target, count the
                        // operation as done; otherwise stop and make the
                        // user rerun the flow from a consistent state.
                        let head = self.git.branch_head(&op.target)?;
                        let landed = match &head {
                            Some(head) => self.git.is_ancestor(&onto, head)?,
                            None => false,
                        };
                        if landed {
                            self.finish_op(&mut state, &op, &onto)?;
                            self.run(state)
                        } else {
                            SequencerState::clear(&self.paths, self.kind);
                            Err(EngineError::Precondition(format!(
                                "no rebase in progress and '{}' is not on its target; \
                                 rerun the {} from scratch",
                                op.target, self.kind
                            )))
                        }
                    }
                }
            }
        }
    }

    /// Execute operations from the cursor until done or interrupted.
    fn run(&self, mut state: SequencerState) -> Result<SequencerStatus, EngineError> {
        while let Some(op) = state.current_op().cloned() {
            let onto = self.resolve_onto(&op)?;
            let upstream = self.resolve_upstream(&state, &op, &onto)?;
            tracing::debug!(
                target = %op.target,
                upstream = %upstream.short(12),
                onto = %onto.short(12),
                "rebase step"
            );

            match self.git.rebase_onto(&op.target, &upstream, &onto)? {
                RebaseOutcome::Updated | RebaseOutcome::AlreadyUpToDate => {
                    self.finish_op(&mut state, &op, &onto)?;
                }
                RebaseOutcome::Conflict { headline, hint } => {
                    state.interrupt_new_parent_hash = Some(onto);
                    state.save(&self.paths)?;
                    return Ok(SequencerStatus::Interrupted {
                        branch: op.target.clone(),
                        headline,
                        hint,
                    });
                }
                RebaseOutcome::NotInProgress => {
                    // start-mode rebases never report this.
                    return Err(EngineError::Precondition(
                        "git reported no rebase in progress while starting one".into(),
                    ));
                }
            }
        }

        SequencerState::clear(&self.paths, self.kind);
        Ok(SequencerStatus::Completed)
    }

    /// Record a completed operation: update the target's parent pointer
    /// in its own write transaction, then advance and persist.
    fn finish_op(
        &self,
        state: &mut SequencerState,
        op: &RebaseOp,
        onto: &Oid,
    ) -> Result<(), EngineError> {
        let mut tx = self.store.write_tx()?;
        let mut record = tx
            .get(&op.target)?
            .unwrap_or_else(|| BranchRecord::on_trunk(op.new_parent.clone()));
        record.parent = if op.new_parent_is_trunk {
            ParentState::Trunk {
                name: op.new_parent.clone(),
            }
        } else {
            ParentState::Stacked {
                name: op.new_parent.clone(),
                branching_point: Some(onto.clone()),
            }
        };
        tx.put(op.target.clone(), record);
        tx.commit()?;

        state.current += 1;
        state.interrupt_new_parent_hash = None;
        state.save(&self.paths)
    }

    /// Capture each target's pre-sequence parent state.
    fn capture_snapshots(
        &self,
        operations: &[RebaseOp],
    ) -> Result<BTreeMap<BranchName, ParentSnapshot>, EngineError> {
        let tx = self.store.read_tx()?;
        let trunks = self.store.trunks().clone();
        let mut snapshots = BTreeMap::new();
        for op in operations {
            let Some(record) = tx.get(&op.target)? else {
                continue;
            };
            let parent = record.parent.name().clone();
            snapshots.insert(
                op.target.clone(),
                ParentSnapshot {
                    is_trunk: record.parent.is_trunk() || trunks.is_trunk(&parent),
                    branching_point: record.parent.branching_point().cloned(),
                    parent,
                },
            );
        }
        Ok(snapshots)
    }

    /// Resolve the commit to rebase onto.
    ///
    /// Explicit hash first; the zero sentinel (and absence) resolve at
    /// execution time to the remote-tracking head for trunks or the
    /// local head otherwise, so the freshest parent tip always wins.
    fn resolve_onto(&self, op: &RebaseOp) -> Result<Oid, EngineError> {
        if let Some(oid) = op.explicit_hash() {
            return Ok(oid.clone());
        }
        if op.new_parent_is_trunk {
            if let Some(oid) = self.git.remote_head(&self.remote, &op.new_parent)? {
                return Ok(oid);
            }
            // No remote-tracking ref (offline or unfetched): local trunk.
        }
        self.git
            .branch_head(&op.new_parent)?
            .ok_or_else(|| {
                EngineError::Precondition(format!(
                    "parent branch '{}' does not exist",
                    op.new_parent
                ))
            })
    }

    /// Resolve the upstream bounding the replay range.
    fn resolve_upstream(
        &self,
        state: &SequencerState,
        op: &RebaseOp,
        onto: &Oid,
    ) -> Result<Oid, EngineError> {
        let snapshot = state.snapshots.get(&op.target);

        match snapshot {
            // Trunk parents never have a stored commit id; the current
            // remote-tracking head of that trunk bounds the range.
            Some(snap) if snap.is_trunk => {
                if let Some(oid) = self.git.remote_head(&state.remote, &snap.parent)? {
                    return Ok(oid);
                }
                if let Some(oid) = self.git.branch_head(&snap.parent)? {
                    return Ok(oid);
                }
                self.merge_base_fallback(&op.target, None, onto)
            }
            Some(snap) => match &snap.branching_point {
                Some(point) if !self.branching_point_ambiguous(state, &op.target, snap) => {
                    Ok(point.clone())
                }
                // Ambiguous or missing branching point: recompute
                // conservatively from history.
                _ => self.merge_base_fallback(&op.target, Some(&snap.parent), onto),
            },
            None => self.merge_base_fallback(&op.target, None, onto),
        }
    }

    /// Two snapshots recording the same branching point for different
    /// parents means an external rebase made history lie; the stored
    /// hash can no longer be trusted.
    fn branching_point_ambiguous(
        &self,
        state: &SequencerState,
        target: &BranchName,
        snap: &ParentSnapshot,
    ) -> bool {
        let Some(point) = &snap.branching_point else {
            return false;
        };
        state.snapshots.iter().any(|(other, other_snap)| {
            other != target
                && other_snap.parent != snap.parent
                && other_snap.branching_point.as_ref() == Some(point)
        })
    }

    /// Conservative replay bound: the merge base of the target and its
    /// previous parent (or the onto commit when that parent is gone).
    fn merge_base_fallback(
        &self,
        target: &BranchName,
        previous_parent: Option<&BranchName>,
        onto: &Oid,
    ) -> Result<Oid, EngineError> {
        let head = self.git.branch_head(target)?.ok_or_else(|| {
            EngineError::Precondition(format!("branch '{target}' does not exist"))
        })?;
        let reference = match previous_parent {
            Some(parent) => self.git.branch_head(parent)?.unwrap_or_else(|| onto.clone()),
            None => onto.clone(),
        };
        Ok(self
            .git
            .merge_base(&head, &reference)?
            .unwrap_or_else(|| onto.clone()))
    }
}
