//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get the binary to test.
fn agentflow() -> Command {
    Command::cargo_bin("agentflow").unwrap()
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    agentflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Local AI workflow engine"));
}

#[test]
fn test_short_help_flag() {
    agentflow().arg("-h").assert().success().stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    agentflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// Run Command Tests
// ============================================================================

#[test]
fn test_run_command_help() {
    agentflow()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Run a workflow YAML file"));
}

#[test]
fn test_run_successful_workflow() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("wf.yaml")
        .write_str(
            "name: shell-success\nworkflow:\n  - name: one\n    run: printf 'alpha'\n  - name: two\n    run: printf 'beta'\n",
        )
        .unwrap();

    agentflow()
        .arg("run")
        .arg(temp.child("wf.yaml").path())
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha"))
        .stdout(predicate::str::contains("Workflow completed: shell-success"));
}

#[test]
fn test_run_failing_workflow_exits_nonzero() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("wf.yaml")
        .write_str(
            "name: stop-on-fail\nworkflow:\n  - name: ok\n    run: printf 'ok'\n  - name: boom\n    run: exit 2\n  - name: never\n    run: printf 'should-not-run'\n",
        )
        .unwrap();

    agentflow()
        .arg("run")
        .arg(temp.child("wf.yaml").path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Step failed: boom"))
        .stdout(predicate::str::contains("should-not-run").not());
}

#[test]
fn test_run_missing_file_fails() {
    agentflow().args(["run", "/nonexistent/workflow.yaml"]).assert().failure();
}

#[test]
fn test_run_with_env_overlay() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("wf.yaml")
        .write_str("name: env-test\nworkflow:\n  - name: show\n    run: printf \"$GREETING\"\n")
        .unwrap();

    agentflow()
        .arg("run")
        .arg(temp.child("wf.yaml").path())
        .args(["--env", "GREETING=hello-overlay"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello-overlay"));
}

#[test]
fn test_run_rejects_malformed_env_pair() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("wf.yaml")
        .write_str("name: env-test\nworkflow:\n  - name: one\n    run: true\n")
        .unwrap();

    agentflow()
        .arg("run")
        .arg(temp.child("wf.yaml").path())
        .args(["--env", "NOT_A_PAIR"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}

// ============================================================================
// Check Command Tests
// ============================================================================

#[test]
fn test_check_clean_workflow() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("wf.yaml")
        .write_str(
            "name: clean\nworkflow:\n  - name: one\n    run: echo ok\n  - name: two\n    agent: claude\n    prompt: do something\n",
        )
        .unwrap();

    agentflow()
        .arg("check")
        .arg(temp.child("wf.yaml").path())
        .assert()
        .success()
        .stdout(predicate::str::contains("OK (2 steps)"));
}

#[test]
fn test_check_reports_step_issues() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("wf.yaml")
        .write_str("name: shaky\nworkflow:\n  - name: mystery\n    uses: plugin\n")
        .unwrap();

    agentflow()
        .arg("check")
        .arg(temp.child("wf.yaml").path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("neither a shell step"));
}

#[test]
fn test_check_invalid_yaml_fails() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("wf.yaml").write_str("workflow: [").unwrap();

    agentflow().arg("check").arg(temp.child("wf.yaml").path()).assert().failure();
}

// ============================================================================
// List Command Tests
// ============================================================================

#[test]
fn test_list_workflows_in_directory() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("a.yaml")
        .write_str("name: alpha\nworkflow:\n  - name: one\n    run: true\n")
        .unwrap();
    temp.child("nested/b.yml")
        .write_str("name: beta\nclaude_session: shared\nworkflow:\n  - name: one\n    run: true\n")
        .unwrap();
    temp.child("notes.txt").write_str("not a workflow").unwrap();

    agentflow()
        .arg("list")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha (1 steps, isolated session)"))
        .stdout(predicate::str::contains("beta (1 steps, shared session)"));
}

#[test]
fn test_list_empty_directory() {
    let temp = assert_fs::TempDir::new().unwrap();

    agentflow()
        .arg("list")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No workflows found"));
}

// ============================================================================
// Completions Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    agentflow()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("agentflow"));
}
