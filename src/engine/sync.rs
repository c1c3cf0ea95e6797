//! engine::sync
//!
//! The sync orchestrator: integrates planners, the sequencer, the forge
//! client, pushes, and pruning into the user-visible flows.
//!
//! One sync run walks these phases:
//!
//! 1. fetch trunks, fast-forward local trunks, refresh request records;
//! 2. attribute squash-merges (forge data first, then a capped trunk
//!    scan for request references) and propagate attribution upward;
//! 3. plan;
//! 4. execute through the sequencer — a conflict persists sync state and
//!    surfaces as [`SyncOutcome::Interrupted`] (exit code 1);
//! 5. push open requests and refresh their base and body;
//! 6. optionally prune merged, fully-integrated leaves;
//! 7. return to the original branch and clear persisted state.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::Config;
use crate::core::graph::StackGraph;
use crate::core::metadata::{
    MetadataStore, ParentState, RequestRecord, RequestState as MetaRequestState,
};
use crate::core::paths::AvPaths;
use crate::core::types::{BranchName, Oid};
use crate::forge::{
    serialize_body, BodyMetadata, CreateRequest, Forge, ForgeError, Request,
    RequestState as ForgeRequestState, StackEntry, UpdateRequest,
};
use crate::git::{ForceMode, Git};
use crate::ui::Progress;

use super::plan::{plan_reparent, plan_restack, plan_sync, RestackScope};
use super::sequencer::{ResumeAction, Sequencer, SequencerStatus};
use super::state::{SequencerKind, SequencerState, SyncOptions, SyncState};
use super::EngineError;

/// Cap on the trunk history scanned for request references. Merges older
/// than this are attributed on a later run, once the forge reports them
/// directly.
const MERGE_SCAN_LIMIT: usize = 10_000;

/// Outcome of a sync / restack / reparent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The run finished; persisted state is gone.
    Completed {
        /// Number of rebase operations executed.
        synced: usize,
        /// Branches deleted by the prune step.
        pruned: Vec<BranchName>,
    },
    /// A rebase conflicted; state is persisted for `--continue` /
    /// `--skip` / `--abort`.
    Interrupted {
        /// The conflicted branch.
        branch: BranchName,
        /// One-line description.
        headline: String,
        /// Captured git output.
        hint: String,
    },
    /// The suspended run was aborted on request.
    Aborted,
}

/// The orchestrator.
pub struct SyncOrchestrator<'a> {
    git: &'a Git,
    store: &'a MetadataStore<'a>,
    config: &'a Config,
    paths: AvPaths,
    forge: Option<&'a dyn Forge>,
    progress: &'a dyn Progress,
}

impl<'a> SyncOrchestrator<'a> {
    /// Build an orchestrator. `forge` is optional: without it, request
    /// refresh, body updates, and pruning are skipped.
    pub fn new(
        git: &'a Git,
        store: &'a MetadataStore<'a>,
        config: &'a Config,
        paths: AvPaths,
        forge: Option<&'a dyn Forge>,
        progress: &'a dyn Progress,
    ) -> Self {
        Self {
            git,
            store,
            config,
            paths,
            forge,
            progress,
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Run a sync.
    pub async fn sync(&self, options: SyncOptions) -> Result<SyncOutcome, EngineError> {
        self.check_ready_to_start()?;
        let original = self.current_branch_required()?;

        let graph = self.load_graph()?;
        if !graph.contains(&original) {
            return Err(EngineError::Precondition(format!(
                "branch '{original}' is not tracked; run 'av adopt' first"
            )));
        }

        let branches = if options.current_only {
            let mut list = vec![original.clone()];
            list.extend(graph.descendants(&original));
            list
        } else {
            graph.stack_branches(&original)?
        };

        let state = SyncState::new(original.clone(), branches.clone(), options.clone());
        state.save(&self.paths)?;

        if options.fetch {
            self.fetch_phase(&graph, &branches).await?;
            self.attribute_merges(&branches).await?;
        }

        // Plan against post-refresh metadata.
        let graph = self.load_graph()?;
        let ops = match &options.parent_override {
            Some(new_parent) => plan_reparent(&graph, &original, new_parent)?,
            None => plan_sync(&graph, &branches, options.to_trunk)?,
        };
        let op_count = ops.len();

        let sequencer = self.sequencer(SequencerKind::Sync);
        match sequencer.start(ops)? {
            SequencerStatus::Interrupted {
                branch,
                headline,
                hint,
            } => {
                let mut state = state;
                state.current_branch = Some(branch.clone());
                state.save(&self.paths)?;
                Ok(SyncOutcome::Interrupted {
                    branch,
                    headline,
                    hint,
                })
            }
            _ => self.finish(state, op_count).await,
        }
    }

    /// Run a restack: reaffirm recorded parents without consulting the
    /// forge or the network.
    pub async fn restack(&self, scope: RestackScope) -> Result<SyncOutcome, EngineError> {
        self.check_ready_to_start()?;
        let original = self.current_branch_required()?;

        let graph = self.load_graph()?;
        let current = graph.contains(&original).then(|| original.clone());
        let ops = plan_restack(&graph, scope, current.as_ref())?;
        let op_count = ops.len();

        let branches: Vec<BranchName> = ops.iter().map(|op| op.target.clone()).collect();
        let state = SyncState::new(
            original,
            branches,
            SyncOptions {
                push: false,
                fetch: false,
                ..Default::default()
            },
        );
        state.save(&self.paths)?;

        let sequencer = self.sequencer(SequencerKind::Restack);
        match sequencer.start(ops)? {
            SequencerStatus::Interrupted {
                branch,
                headline,
                hint,
            } => Ok(SyncOutcome::Interrupted {
                branch,
                headline,
                hint,
            }),
            _ => self.finish(state, op_count).await,
        }
    }

    /// Reparent the current branch onto `new_parent` and replay its
    /// subtree.
    pub async fn reparent(&self, new_parent: &BranchName) -> Result<SyncOutcome, EngineError> {
        self.check_ready_to_start()?;
        let original = self.current_branch_required()?;

        let graph = self.load_graph()?;
        let ops = plan_reparent(&graph, &original, new_parent)?;
        let op_count = ops.len();

        let branches: Vec<BranchName> = ops.iter().map(|op| op.target.clone()).collect();
        let state = SyncState::new(
            original,
            branches,
            SyncOptions {
                push: false,
                fetch: false,
                ..Default::default()
            },
        );
        state.save(&self.paths)?;

        let sequencer = self.sequencer(SequencerKind::Reparent);
        match sequencer.start(ops)? {
            SequencerStatus::Interrupted {
                branch,
                headline,
                hint,
            } => Ok(SyncOutcome::Interrupted {
                branch,
                headline,
                hint,
            }),
            _ => self.finish(state, op_count).await,
        }
    }

    /// Resume a suspended run with continue/skip/abort.
    pub async fn resume(&self, action: ResumeAction) -> Result<SyncOutcome, EngineError> {
        let Some(sequencer_state) = SequencerState::load_any(&self.paths) else {
            return Err(EngineError::Precondition(
                "no av operation is in progress".into(),
            ));
        };
        let kind = sequencer_state.kind;
        let sequencer = self.sequencer(kind);

        match sequencer.resume(action)? {
            SequencerStatus::Interrupted {
                branch,
                headline,
                hint,
            } => Ok(SyncOutcome::Interrupted {
                branch,
                headline,
                hint,
            }),
            SequencerStatus::Aborted => {
                if let Some(state) = SyncState::load(&self.paths) {
                    self.restore_original(&state.original_branch)?;
                }
                SyncState::clear(&self.paths);
                Ok(SyncOutcome::Aborted)
            }
            SequencerStatus::Idle | SequencerStatus::Completed => {
                let state = SyncState::load(&self.paths).unwrap_or_else(|| {
                    SyncState::new(
                        self.store.trunks().default_branch().clone(),
                        Vec::new(),
                        SyncOptions::default(),
                    )
                });
                self.finish(state, 0).await
            }
        }
    }

    /// Create (or surface) the request for the current branch.
    ///
    /// The title comes from the head commit subject, the body from its
    /// message body. "WIP" titles become drafts unless disabled.
    pub async fn submit_current(&self, draft: bool) -> Result<Request, EngineError> {
        let forge = self.forge.ok_or(ForgeError::Unauthenticated)?;
        let branch = self.current_branch_required()?;

        let graph = self.load_graph()?;
        let Some(record) = graph.record(&branch).cloned() else {
            return Err(EngineError::Precondition(format!(
                "branch '{branch}' is not tracked; run 'av adopt' first"
            )));
        };

        if let Some(existing) = forge
            .get_request_for_branch(branch.as_str(), &[ForgeRequestState::Open])
            .await?
        {
            self.record_request(&branch, &existing)?;
            return Ok(existing);
        }

        let head = self.git.branch_head(&branch)?.ok_or_else(|| {
            EngineError::Precondition(format!("branch '{branch}' does not exist"))
        })?;
        let tip = self
            .git
            .log(&head, None, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Precondition("branch has no commits".into()))?;
        if tip.subject.trim().is_empty() {
            return Err(EngineError::UserInput(
                "head commit has an empty message; cannot title the request".into(),
            ));
        }

        let wip = !self.config.no_wip_detection()
            && tip.subject.trim_start().to_lowercase().starts_with("wip");

        self.git.push(
            self.config.remote(),
            &branch,
            ForceMode::ForceWithLease,
            false,
        )?;

        let meta = self.body_metadata(&graph, &branch)?;
        let body = serialize_body(&tip.body, &meta, None);
        let created = forge
            .create_request(CreateRequest {
                base: record.parent.name().to_string(),
                head: branch.to_string(),
                title: tip.subject.clone(),
                body,
                draft: draft || wip,
            })
            .await?;

        self.record_request(&branch, &created)?;

        if self.config.open_browser() {
            let _ = open::that(&created.permalink);
        }
        Ok(created)
    }

    // =========================================================================
    // Phase 1: fetch and refresh
    // =========================================================================

    async fn fetch_phase(
        &self,
        graph: &StackGraph,
        branches: &[BranchName],
    ) -> Result<(), EngineError> {
        let remote = self.config.remote();

        let mut trunks = BTreeSet::new();
        for branch in branches {
            if let Ok(trunk) = graph.trunk_of(branch) {
                trunks.insert(trunk);
            }
        }

        for trunk in &trunks {
            self.progress.info(&format!("Fetching {remote}/{trunk}"));
            self.git.fetch(remote, &[trunk.as_str()])?;
            if let Some(remote_head) = self.git.remote_head(remote, trunk)? {
                if self.git.fast_forward_branch(trunk, &remote_head)? {
                    self.progress
                        .info(&format!("Fast-forwarded {trunk} to {}", remote_head.short(12)));
                }
            }
        }

        if self.forge.is_some() {
            for branch in branches {
                self.refresh_request(branch).await?;
            }
        }
        Ok(())
    }

    /// Refresh one branch's request record from the forge.
    async fn refresh_request(&self, branch: &BranchName) -> Result<(), EngineError> {
        let Some(forge) = self.forge else {
            return Ok(());
        };

        let mut tx = self.store.write_tx()?;
        let Some(mut record) = tx.get(branch)? else {
            return Ok(());
        };

        let observed = match &record.request {
            Some(request) => match forge.get_request(request.number).await {
                Ok(observed) => Some(observed),
                Err(ForgeError::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            },
            None => {
                forge
                    .get_request_for_branch(branch.as_str(), &[ForgeRequestState::Open])
                    .await?
            }
        };

        let Some(observed) = observed else {
            return Ok(());
        };

        record.request = Some(to_request_record(&observed));
        if record.merge_commit.is_none() {
            if let Some(merge_commit) = &observed.merge_commit {
                if let Ok(oid) = Oid::new(merge_commit.clone()) {
                    record.merge_commit = Some(oid);
                }
            }
        }
        tx.put(branch.clone(), record);
        tx.commit()?;
        Ok(())
    }

    // =========================================================================
    // Phase 2: merge attribution
    // =========================================================================

    /// Attribute merges the forge did not link directly, then propagate
    /// attribution to ancestors (a squash-merge of a descendant lands
    /// the ancestor's commits too).
    async fn attribute_merges(&self, branches: &[BranchName]) -> Result<(), EngineError> {
        let graph = self.load_graph()?;

        // Requests the forge closed without telling us the merge commit.
        let mut candidates: BTreeMap<u64, BranchName> = BTreeMap::new();
        for branch in branches {
            let Some(record) = graph.record(branch) else {
                continue;
            };
            if record.merge_commit.is_some() {
                continue;
            }
            if let Some(request) = &record.request {
                if matches!(
                    request.state,
                    MetaRequestState::Closed | MetaRequestState::Merged
                ) {
                    candidates.insert(request.number, branch.clone());
                }
            }
        }

        let mut attributed: BTreeMap<BranchName, Oid> = BTreeMap::new();
        if !candidates.is_empty() {
            let mut trunks = BTreeSet::new();
            for branch in candidates.values() {
                if let Ok(trunk) = graph.trunk_of(branch) {
                    trunks.insert(trunk);
                }
            }
            for trunk in trunks {
                self.scan_trunk_for_merges(&trunk, &candidates, &mut attributed)?;
            }
        }

        // Upward propagation, from everything now known to be merged.
        let mut merged: BTreeMap<BranchName, Oid> = attributed.clone();
        for branch in graph.branches() {
            if let Some(record) = graph.record(branch) {
                if let Some(commit) = &record.merge_commit {
                    merged.entry(branch.clone()).or_insert_with(|| commit.clone());
                }
            }
        }
        for (branch, commit) in merged.clone() {
            if let Ok(ancestors) = graph.ancestors(&branch) {
                for ancestor in ancestors {
                    let already = graph
                        .record(&ancestor)
                        .map(|r| r.merge_commit.is_some())
                        .unwrap_or(true);
                    if !already {
                        merged.entry(ancestor).or_insert_with(|| commit.clone());
                    }
                }
            }
        }

        // Single transaction for all newly-attributed branches.
        let new_attributions: Vec<(BranchName, Oid)> = merged
            .into_iter()
            .filter(|(branch, _)| {
                graph
                    .record(branch)
                    .map(|record| record.merge_commit.is_none())
                    .unwrap_or(false)
            })
            .collect();
        if new_attributions.is_empty() {
            return Ok(());
        }

        let mut tx = self.store.write_tx()?;
        for (branch, commit) in new_attributions {
            if let Some(mut record) = tx.get(&branch)? {
                self.progress.info(&format!(
                    "Detected merge of '{branch}' as {}",
                    commit.short(12)
                ));
                record.merge_commit = Some(commit);
                if let Some(request) = record.request.as_mut() {
                    request.state = MetaRequestState::Merged;
                }
                tx.put(branch, record);
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Scan a trunk's history for commits that reference candidate
    /// request numbers ("closes #N", or the squash-title "(#N)" form).
    fn scan_trunk_for_merges(
        &self,
        trunk: &BranchName,
        candidates: &BTreeMap<u64, BranchName>,
        attributed: &mut BTreeMap<BranchName, Oid>,
    ) -> Result<(), EngineError> {
        let remote = self.config.remote();
        let tip = match self.git.remote_head(remote, trunk)? {
            Some(tip) => tip,
            None => match self.git.branch_head(trunk)? {
                Some(tip) => tip,
                None => return Ok(()),
            },
        };

        let closes = regex::Regex::new(r"(?i)closes\s+#(\d+)").expect("closes pattern");
        let squash_title = regex::Regex::new(r"\(#(\d+)\)\s*$").expect("squash title pattern");

        let commits = self.git.log(&tip, None, MERGE_SCAN_LIMIT)?;
        if commits.len() == MERGE_SCAN_LIMIT {
            tracing::debug!(%trunk, limit = MERGE_SCAN_LIMIT, "merge scan stopped at cap");
        }
        for commit in commits {
            let mut numbers = Vec::new();
            for capture in closes.captures_iter(&commit.body) {
                numbers.push(capture[1].to_string());
            }
            if let Some(capture) = squash_title.captures(&commit.subject) {
                numbers.push(capture[1].to_string());
            }
            for number in numbers {
                let Ok(number) = number.parse::<u64>() else {
                    continue;
                };
                if let Some(branch) = candidates.get(&number) {
                    attributed
                        .entry(branch.clone())
                        .or_insert_with(|| commit.oid.clone());
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Phase 5: push and request updates
    // =========================================================================

    async fn push_and_update(&self, branches: &[BranchName]) -> Result<(), EngineError> {
        let Some(forge) = self.forge else {
            return Ok(());
        };
        let graph = self.load_graph()?;
        let remote = self.config.remote();

        // Null policy: decide from the owners file (codeowners
        // re-assignment fires on base changes).
        let cycle_draft = self
            .config
            .rebase_with_draft()
            .unwrap_or_else(|| self.git.has_owners_file());

        for branch in branches {
            let Some(record) = graph.record(branch) else {
                continue;
            };
            if record.is_merged() {
                continue;
            }
            let Some(request) = &record.request else {
                continue;
            };
            if !request.is_open() {
                continue;
            }

            let fresh = forge.get_request(request.number).await?;
            if fresh.state != ForgeRequestState::Open {
                self.record_request(branch, &fresh)?;
                continue;
            }

            let cycling = cycle_draft && !fresh.is_draft;
            if cycling {
                forge.convert_to_draft(&fresh.id).await?;
            }

            self.progress.info(&format!("Pushing {branch}"));
            self.git
                .push(remote, branch, ForceMode::ForceWithLease, false)?;

            let meta = self.body_metadata(&graph, branch)?;
            let entries = self.stack_entries(&graph, branch)?;
            let body = serialize_body(&fresh.body, &meta, Some(&entries));
            let update = UpdateRequest {
                base: Some(record.parent.name().to_string()),
                title: None,
                body: Some(body),
            };

            // Body updates are idempotent; one retry on transient noise.
            let updated = match forge.update_request(fresh.number, update.clone()).await {
                Err(e) if e.is_transient() => forge.update_request(fresh.number, update).await?,
                other => other?,
            };
            self.record_request(branch, &updated)?;

            if cycling {
                forge.mark_ready(&fresh.id).await?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Phase 6: prune
    // =========================================================================

    async fn prune(&self, branches: &[BranchName]) -> Result<Vec<BranchName>, EngineError> {
        let Some(forge) = self.forge else {
            return Ok(Vec::new());
        };
        let graph = self.load_graph()?;
        let mut pruned = Vec::new();

        for branch in branches {
            let Some(record) = graph.record(branch) else {
                continue;
            };
            if record.merge_commit.is_none() || !graph.children(branch).is_empty() {
                continue;
            }
            let Some(request) = &record.request else {
                continue;
            };
            let Some(local_head) = self.git.branch_head(branch)? else {
                continue;
            };

            let observed = forge.get_request(request.number).await?;
            let forge_head = observed.head_oid.as_deref().unwrap_or_default();
            if forge_head != local_head.as_str() {
                // Local work the forge never saw; leave the branch alone.
                continue;
            }

            if self.git.current_branch()? == Some(branch.clone()) {
                let trunk = graph.trunk_of(branch)?;
                self.git.checkout_branch(&trunk)?;
            }

            self.progress.info(&format!("Pruning merged branch '{branch}'"));
            self.git.delete_branch(branch)?;
            let mut tx = self.store.write_tx()?;
            tx.delete(branch.clone());
            tx.commit()?;
            pruned.push(branch.clone());
        }
        Ok(pruned)
    }

    // =========================================================================
    // Completion
    // =========================================================================

    async fn finish(&self, state: SyncState, synced: usize) -> Result<SyncOutcome, EngineError> {
        if state.config.push {
            self.push_and_update(&state.branches).await?;
        }
        let pruned = if state.config.prune {
            self.prune(&state.branches).await?
        } else {
            Vec::new()
        };

        self.restore_original(&state.original_branch)?;
        SyncState::clear(&self.paths);
        Ok(SyncOutcome::Completed { synced, pruned })
    }

    fn restore_original(&self, original: &BranchName) -> Result<(), EngineError> {
        if self.git.branch_exists(original)? {
            if self.git.current_branch()? != Some(original.clone()) {
                self.git.checkout_branch(original)?;
            }
        } else {
            // Original branch was pruned; land on its trunk.
            let trunk = self.store.trunks().default_branch().clone();
            if self.git.branch_exists(&trunk)? {
                self.git.checkout_branch(&trunk)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn check_ready_to_start(&self) -> Result<(), EngineError> {
        if !self.git.is_worktree_clean()? {
            return Err(EngineError::Precondition(
                "working tree has uncommitted changes; commit or stash them first".into(),
            ));
        }
        if let Some(state) = SequencerState::load_any(&self.paths) {
            return Err(EngineError::Precondition(format!(
                "a {} operation is suspended; resolve it with --continue, --skip, or --abort",
                state.kind
            )));
        }
        Ok(())
    }

    fn current_branch_required(&self) -> Result<BranchName, EngineError> {
        self.git.current_branch()?.ok_or_else(|| {
            EngineError::Precondition("HEAD is detached; check out a branch first".into())
        })
    }

    fn load_graph(&self) -> Result<StackGraph, EngineError> {
        Ok(StackGraph::load(&self.store.read_tx()?)?)
    }

    fn sequencer(&self, kind: SequencerKind) -> Sequencer<'_> {
        Sequencer::new(
            self.git,
            self.store,
            self.paths.clone(),
            kind,
            self.config.remote(),
        )
    }

    /// Write an observed request back into a branch's record.
    fn record_request(&self, branch: &BranchName, observed: &Request) -> Result<(), EngineError> {
        let mut tx = self.store.write_tx()?;
        let Some(mut record) = tx.get(branch)? else {
            return Ok(());
        };
        record.request = Some(to_request_record(observed));
        if record.merge_commit.is_none() {
            if let Some(merge_commit) = &observed.merge_commit {
                if let Ok(oid) = Oid::new(merge_commit.clone()) {
                    record.merge_commit = Some(oid);
                }
            }
        }
        tx.put(branch.clone(), record);
        tx.commit()?;
        Ok(())
    }

    /// The metadata block for a branch's request body.
    fn body_metadata(
        &self,
        graph: &StackGraph,
        branch: &BranchName,
    ) -> Result<BodyMetadata, EngineError> {
        let record = graph.record(branch).ok_or_else(|| {
            EngineError::Precondition(format!("branch '{branch}' is not tracked"))
        })?;
        let trunk = graph.trunk_of(branch)?;

        let (parent, parent_head, parent_pull) = match &record.parent {
            ParentState::Trunk { .. } => (None, None, None),
            ParentState::Stacked {
                name,
                branching_point,
            } => {
                let parent_pull = graph
                    .record(name)
                    .and_then(|parent| parent.request.as_ref())
                    .map(|request| request.number);
                (
                    Some(name.to_string()),
                    branching_point.as_ref().map(|oid| oid.to_string()),
                    parent_pull,
                )
            }
        };

        Ok(BodyMetadata {
            parent,
            parent_head,
            parent_pull,
            trunk: trunk.to_string(),
        })
    }

    /// The stack summary entries for a branch's request body.
    fn stack_entries(
        &self,
        graph: &StackGraph,
        branch: &BranchName,
    ) -> Result<Vec<StackEntry>, EngineError> {
        let mut entries = Vec::new();
        for member in graph.stack_branches(branch)? {
            let record = graph.record(&member);
            let request = record.and_then(|r| r.request.as_ref());
            entries.push(StackEntry {
                branch: member.to_string(),
                number: request.map(|r| r.number),
                permalink: request.map(|r| r.permalink.clone()),
                is_current: member == *branch,
            });
        }
        Ok(entries)
    }
}

/// Convert a forge request into its metadata record form.
fn to_request_record(request: &Request) -> RequestRecord {
    RequestRecord {
        id: request.id.clone(),
        number: request.number,
        permalink: request.permalink.clone(),
        state: match request.state {
            ForgeRequestState::Open => MetaRequestState::Open,
            ForgeRequestState::Closed => MetaRequestState::Closed,
            ForgeRequestState::Merged => MetaRequestState::Merged,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::parse_body;

    #[test]
    fn request_record_conversion() {
        let request = Request {
            id: "PR_x".into(),
            number: 9,
            permalink: "https://forge.example/pull/9".into(),
            state: ForgeRequestState::Merged,
            is_draft: false,
            head: "feat".into(),
            base: "main".into(),
            title: "t".into(),
            body: String::new(),
            head_oid: None,
            merge_commit: Some("a".repeat(40)),
        };
        let record = to_request_record(&request);
        assert_eq!(record.number, 9);
        assert_eq!(record.state, MetaRequestState::Merged);
    }

    #[test]
    fn body_updates_are_idempotent_over_reserialization() {
        let meta = BodyMetadata {
            parent: Some("feat-1".into()),
            parent_head: None,
            parent_pull: Some(3),
            trunk: "main".into(),
        };
        let entries = vec![StackEntry {
            branch: "feat-2".into(),
            number: Some(4),
            permalink: None,
            is_current: true,
        }];

        let once = serialize_body("User prose.", &meta, Some(&entries));
        let twice = serialize_body(&once, &meta, Some(&entries));
        assert_eq!(once, twice);
        assert!(once.contains("User prose."));
        let (text, parsed) = parse_body(&twice);
        assert_eq!(text, "User prose.");
        assert_eq!(parsed, Some(meta));
    }
}
