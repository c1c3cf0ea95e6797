//! Metadata persistence against a real repository: legacy formats,
//! snapshot isolation, and invariant enforcement at the store boundary.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use avstack::core::graph::StackGraph;
use avstack::core::metadata::{BranchRecord, MetadataStore, Trunks};
use avstack::core::types::{BranchName, Oid, RefName};
use avstack::git::Git;

fn sh(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn branch(name: &str) -> BranchName {
    BranchName::new(name).unwrap()
}

fn fixture() -> (TempDir, Git) {
    let dir = TempDir::new().unwrap();
    sh(dir.path(), &["init", "--quiet", "-b", "main"]);
    std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
    sh(dir.path(), &["add", "."]);
    sh(dir.path(), &["commit", "--quiet", "-m", "A"]);
    let git = Git::open(dir.path()).unwrap();
    (dir, git)
}

fn store(git: &Git) -> MetadataStore<'_> {
    MetadataStore::new(git, Trunks::new(branch("main"), vec![]))
}

/// Write a raw blob under the metadata namespace, as an older client
/// would have.
fn write_raw(git: &Git, name: &str, json: &str) {
    let blob = git.hash_object(json.as_bytes()).unwrap();
    git.update_ref(&RefName::for_metadata(&branch(name)), Some(&blob))
        .unwrap();
}

#[test]
fn legacy_bare_string_parent_reads_as_stacked() {
    let (_dir, git) = fixture();
    write_raw(&git, "feat-2", r#"{"parent": "feat-1"}"#);
    write_raw(&git, "feat-1", r#"{"parent": {"name": "main", "trunk": true}}"#);

    let metadata_store = store(&git);
    let read = metadata_store.read_tx().unwrap();
    let record = read.get(&branch("feat-2")).unwrap().unwrap();
    assert_eq!(record.parent.name(), &branch("feat-1"));
    assert!(!record.parent.is_trunk());
    assert!(record.parent.branching_point().is_none());
}

#[test]
fn legacy_empty_parent_reads_as_root_on_default_branch() {
    let (_dir, git) = fixture();
    write_raw(&git, "feat-1", r#"{"parent": ""}"#);

    let metadata_store = store(&git);
    let read = metadata_store.read_tx().unwrap();
    let record = read.get(&branch("feat-1")).unwrap().unwrap();
    assert!(record.parent.is_trunk());
    assert_eq!(record.parent.name(), &branch("main"));
}

#[test]
fn newer_writer_fields_are_tolerated() {
    let (_dir, git) = fixture();
    write_raw(
        &git,
        "feat-1",
        r#"{"parent": {"name": "main", "trunk": true},
            "pullRequest": {"id": "X", "number": 5, "permalink": "p",
                            "state": "OPEN", "futureFlag": true},
            "futureTopLevel": [1, 2, 3]}"#,
    );

    let metadata_store = store(&git);
    let read = metadata_store.read_tx().unwrap();
    let record = read.get(&branch("feat-1")).unwrap().unwrap();
    assert_eq!(record.request.unwrap().number, 5);
}

#[test]
fn graph_builds_from_mixed_format_records() {
    let (_dir, git) = fixture();
    write_raw(&git, "feat-1", r#"{"parent": {"name": "main", "trunk": true}}"#);
    write_raw(&git, "feat-2", r#"{"parent": "feat-1"}"#);
    write_raw(
        &git,
        "feat-3",
        &format!(
            r#"{{"parent": {{"name": "feat-2", "head": "{}"}}}}"#,
            "b".repeat(40)
        ),
    );

    let metadata_store = store(&git);
    let graph = StackGraph::load(&metadata_store.read_tx().unwrap()).unwrap();

    assert_eq!(graph.trunk_of(&branch("feat-3")).unwrap(), branch("main"));
    assert_eq!(
        graph.ancestors(&branch("feat-3")).unwrap(),
        vec![branch("feat-2"), branch("feat-1")]
    );
    assert_eq!(
        graph.stack_branches(&branch("feat-2")).unwrap(),
        vec![branch("feat-1"), branch("feat-2"), branch("feat-3")]
    );
}

#[test]
fn rewrite_normalizes_legacy_records() {
    let (_dir, git) = fixture();
    write_raw(&git, "feat-1", r#"{"parent": ""}"#);

    let metadata_store = store(&git);
    let mut tx = metadata_store.write_tx().unwrap();
    let record = tx.get(&branch("feat-1")).unwrap().unwrap();
    tx.put(branch("feat-1"), record);
    tx.commit().unwrap();

    // The rewritten blob is the canonical full form.
    let raw = git
        .read_ref(&RefName::for_metadata(&branch("feat-1")))
        .unwrap()
        .unwrap();
    let json = git.cat_blob_as_string(&raw).unwrap();
    assert!(json.contains("\"trunk\":true"));
    assert!(json.contains("\"name\":\"main\""));
}

#[test]
fn metadata_survives_branch_deletion() {
    let (dir, git) = fixture();
    sh(dir.path(), &["branch", "feat-1"]);

    let metadata_store = store(&git);
    let mut tx = metadata_store.write_tx().unwrap();
    tx.put(branch("feat-1"), BranchRecord::on_trunk(branch("main")));
    tx.commit().unwrap();

    sh(dir.path(), &["branch", "-D", "feat-1"]);

    // The record outlives the branch; tidy-up is explicit, not implicit.
    let read = metadata_store.read_tx().unwrap();
    assert!(read.get(&branch("feat-1")).unwrap().is_some());
}

#[test]
fn unknown_parent_is_rejected_as_invalid_metadata() {
    let (_dir, git) = fixture();
    let metadata_store = store(&git);

    let mut tx = metadata_store.write_tx().unwrap();
    tx.put(
        branch("feat-1"),
        BranchRecord::stacked(branch("missing"), Oid::new("c".repeat(40)).unwrap()),
    );
    let err = tx.commit().unwrap_err();
    assert!(err.to_string().contains("missing"));
}
