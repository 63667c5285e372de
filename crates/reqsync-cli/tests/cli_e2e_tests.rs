//! Integration tests for the reqsync binary.
//!
//! These tests exercise the compiled binary using assert_cmd. Every run
//! passes `--no-upgrade` so no pip process is started.

use assert_cmd::Command;
use predicates::prelude::*;
use reqsync_test_utils::RequirementsTree;
use reqsync_test_utils::git::{committed_git_repo, fake_git_dir, real_git_repo};

/// Get a Command for the reqsync binary
fn reqsync_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("reqsync"));
    cmd.env_remove("VIRTUAL_ENV")
        .env_remove("CONDA_PREFIX")
        .env_remove("RUST_LOG");
    cmd
}

/// `reqsync run --no-upgrade` inside `tree`.
fn run_in(tree: &RequirementsTree) -> Command {
    let mut cmd = reqsync_cmd();
    cmd.current_dir(tree.root()).args(["run", "--no-upgrade"]);
    cmd
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_output() {
    reqsync_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_run_help_lists_paired_flags() {
    reqsync_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--follow-includes"))
        .stdout(predicate::str::contains("--policy"))
        .stdout(predicate::str::contains("--json-report"));
}

#[test]
fn test_version_command() {
    reqsync_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("reqsync "));
}

#[test]
fn test_completions_bash() {
    reqsync_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reqsync"));
}

#[test]
fn test_no_command_is_usage_error() {
    reqsync_cmd().assert().failure().code(2);
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_missing_root_exits_2() {
    let tree = RequirementsTree::new();

    run_in(&tree)
        .arg("--system-ok")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Requirements file not found"));
}

#[test]
fn test_system_python_blocked_exits_7() {
    let tree = RequirementsTree::new().with_file("requirements.txt", "flask\n");

    run_in(&tree)
        .assert()
        .code(7)
        .stderr(predicate::str::contains("--system-ok"));
}

#[test]
fn test_virtualenv_variable_passes_gate() {
    let tree = RequirementsTree::new().with_file("requirements.txt", "# nothing\n");

    // The gate passes; the interpreter under the missing venv cannot start.
    run_in(&tree)
        .env("VIRTUAL_ENV", tree.path("no-such-venv"))
        .assert()
        .code(1);
}

#[test]
fn test_hash_pins_exit_3() {
    let tree = RequirementsTree::new().with_file(
        "requirements.txt",
        "flask==3.0.3 --hash=sha256:0123456789abcdef\n",
    );

    run_in(&tree).arg("--system-ok").assert().code(3);
    tree.assert_content(
        "requirements.txt",
        "flask==3.0.3 --hash=sha256:0123456789abcdef\n",
    );
}

#[test]
fn test_dirty_repo_blocked_exits_8() {
    let tree = RequirementsTree::new().with_file("requirements.txt", "flask\n");
    real_git_repo(tree.root());

    run_in(&tree)
        .args(["--system-ok", "--no-allow-dirty"])
        .assert()
        .code(8);
}

#[test]
fn test_unreadable_git_dir_is_not_a_repository() {
    let tree = RequirementsTree::new().with_file(
        "requirements.txt",
        "flask==3.0.3 --hash=sha256:0123456789abcdef\n",
    );
    fake_git_dir(tree.root());

    // Past the dirty-repo gate, the hash guard is the next thing to fail.
    run_in(&tree)
        .args(["--system-ok", "--no-allow-dirty"])
        .assert()
        .code(3);
}

#[test]
fn test_non_utf8_exits_5() {
    let tree = RequirementsTree::new().with_bytes("requirements.txt", b"flask\xff\n");

    run_in(&tree).arg("--system-ok").assert().code(5);
}

#[test]
fn test_invalid_policy_is_usage_error() {
    let tree = RequirementsTree::new().with_file("requirements.txt", "flask\n");

    run_in(&tree)
        .args(["--system-ok", "--policy", "strict"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("lower-bound"));
}

#[test]
fn test_clean_repo_with_config_file_is_not_blocked() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "# empty\n")
        .with_file("reqsync.toml", "system_ok = true\nallow_dirty = false\n");
    committed_git_repo(tree.root());

    // Installed versions still come from pip; an interpreter that does not
    // exist turns into a generic failure after both gates passed.
    run_in(&tree)
        .env("VIRTUAL_ENV", tree.path("missing-venv"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error"));
}
