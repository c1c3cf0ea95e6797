//! CLI smoke tests: argument surface, exit codes, and the init/adopt
//! flow against a real repository.

use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn av() -> Command {
    Command::cargo_bin("av").unwrap()
}

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

fn repo_with_commit() -> TempDir {
    let dir = TempDir::new().unwrap();
    sh(dir.path(), &["init", "--quiet", "-b", "main"]);
    std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
    sh(dir.path(), &["add", "."]);
    sh(dir.path(), &["commit", "--quiet", "-m", "A"]);
    dir
}

#[test]
fn help_lists_subcommands() {
    av().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("restack"))
        .stdout(predicate::str::contains("reparent"))
        .stdout(predicate::str::contains("adopt"));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    av().arg("frobnicate").assert().failure().code(2);
}

#[test]
fn sync_outside_a_repository_is_a_precondition_error() {
    let dir = TempDir::new().unwrap();
    av().args(["--cwd", dir.path().to_str().unwrap(), "sync", "--no-fetch"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn adopt_tracks_and_is_idempotent() {
    let dir = repo_with_commit();
    sh(dir.path(), &["checkout", "--quiet", "-b", "feat"]);
    std::fs::write(dir.path().join("f.txt"), "f\n").unwrap();
    sh(dir.path(), &["add", "."]);
    sh(dir.path(), &["commit", "--quiet", "-m", "F"]);

    let cwd = dir.path().to_str().unwrap();
    av().args(["--cwd", cwd, "adopt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tracking 'feat'"));

    // Adopting an already-tracked branch changes nothing and succeeds.
    av().args(["--cwd", cwd, "adopt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already tracked"));
}

#[test]
fn adopt_of_trunk_is_rejected() {
    let dir = repo_with_commit();
    let cwd = dir.path().to_str().unwrap();
    av().args(["--cwd", cwd, "adopt", "main"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn reparent_onto_unknown_branch_is_a_user_error() {
    let dir = repo_with_commit();
    sh(dir.path(), &["checkout", "--quiet", "-b", "feat"]);
    std::fs::write(dir.path().join("f.txt"), "f\n").unwrap();
    sh(dir.path(), &["add", "."]);
    sh(dir.path(), &["commit", "--quiet", "-m", "F"]);

    let cwd = dir.path().to_str().unwrap();
    av().args(["--cwd", cwd, "adopt"]).assert().success();
    av().args(["--cwd", cwd, "reparent", "ghost"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn untrack_refuses_branches_with_children() {
    let dir = repo_with_commit();
    sh(dir.path(), &["checkout", "--quiet", "-b", "feat-1"]);
    std::fs::write(dir.path().join("f1.txt"), "1\n").unwrap();
    sh(dir.path(), &["add", "."]);
    sh(dir.path(), &["commit", "--quiet", "-m", "F1"]);
    sh(dir.path(), &["checkout", "--quiet", "-b", "feat-2"]);
    std::fs::write(dir.path().join("f2.txt"), "2\n").unwrap();
    sh(dir.path(), &["add", "."]);
    sh(dir.path(), &["commit", "--quiet", "-m", "F2"]);

    let cwd = dir.path().to_str().unwrap();
    av().args(["--cwd", cwd, "adopt", "feat-1"]).assert().success();
    av().args(["--cwd", cwd, "adopt", "feat-2"]).assert().success();

    av().args(["--cwd", cwd, "untrack", "feat-1"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("children"));

    av().args(["--cwd", cwd, "untrack", "feat-2"])
        .assert()
        .success();
    av().args(["--cwd", cwd, "untrack", "feat-1"])
        .assert()
        .success();
}

#[test]
fn restack_without_tracked_current_branch_fails_cleanly() {
    let dir = repo_with_commit();
    let cwd = dir.path().to_str().unwrap();
    // main is a trunk, not a tracked branch.
    av().args(["--cwd", cwd, "restack"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn completion_generates_a_script() {
    av().args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("av"));
}
