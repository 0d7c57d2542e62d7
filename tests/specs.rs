// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level CLI specs: exercise the built binaries end to end for
//! flows that need no tmux server or daemon.

use assert_cmd::Command;
use serial_test::serial;

fn muster(state_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("muster").expect("muster binary");
    cmd.env("MUSTER_STATE_DIR", state_dir);
    cmd
}

#[test]
fn help_lists_every_tool_group() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = muster(dir.path()).arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();

    for group in [
        "agent",
        "monitor",
        "team",
        "spawn",
        "pm",
        "orchestrator",
        "context",
        "setup",
        "recovery",
        "session",
        "pubsub",
        "daemon",
        "tasks",
        "errors",
        "server",
        "status",
    ] {
        assert!(stdout.contains(group), "help missing group {group}");
    }
}

#[test]
fn version_prints() {
    let dir = tempfile::tempdir().expect("tempdir");
    muster(dir.path()).arg("--version").assert().success();
}

#[test]
fn musterd_help_prints() {
    let mut cmd = Command::cargo_bin("musterd").expect("musterd binary");
    let output = cmd.arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    assert!(stdout.contains("monitor daemon"));
}

#[test]
fn invalid_target_is_rejected_with_shaped_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = muster(dir.path())
        .args(["-o", "json", "agent", "info", "not-a-target"])
        .assert()
        .failure();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    let envelope: serde_json::Value = serde_json::from_str(&stdout).expect("json envelope");

    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error_type"], "invalid_target_format");
    assert_eq!(envelope["command"], "agent.info");
    assert!(envelope["timestamp"].as_f64().is_some());
}

#[test]
#[serial]
fn pubsub_publish_read_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");

    muster(dir.path())
        .args(["pubsub", "publish", "standup", "auth work done"])
        .assert()
        .success();

    let output = muster(dir.path())
        .args(["-o", "json", "pubsub", "read", "standup"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    let envelope: serde_json::Value = serde_json::from_str(&stdout).expect("json envelope");

    assert_eq!(envelope["success"], true);
    assert_eq!(envelope["data"][0]["body"], "auth work done");
}

#[test]
#[serial]
fn tasks_create_and_list() {
    let dir = tempfile::tempdir().expect("tempdir");

    muster(dir.path())
        .args(["tasks", "create", "fix login", "--description", "cookie expiry"])
        .assert()
        .success();

    let output = muster(dir.path())
        .args(["-o", "json", "tasks", "list"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    let envelope: serde_json::Value = serde_json::from_str(&stdout).expect("json envelope");
    assert_eq!(envelope["data"][0]["title"], "fix login");
    assert_eq!(envelope["data"][0]["status"], "open");
}

#[test]
fn context_show_prints_briefing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = muster(dir.path())
        .args(["context", "show", "pm"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    assert!(stdout.contains("Project Manager"));
}

#[test]
fn server_tools_lists_the_generated_surface() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = muster(dir.path())
        .args(["-o", "json", "server", "tools"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    let envelope: serde_json::Value = serde_json::from_str(&stdout).expect("json envelope");

    let tools = envelope["data"].as_array().expect("tools array");
    assert_eq!(tools.len(), 15);
    let agent = tools.iter().find(|t| t["name"] == "agent").expect("agent tool");
    let actions: Vec<&str> = agent["actions"]
        .as_array()
        .expect("actions")
        .iter()
        .filter_map(|a| a["name"].as_str())
        .collect();
    assert!(actions.contains(&"send"));
    assert!(actions.contains(&"kill-all"));
}

#[test]
fn errors_commands_require_the_daemon() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = muster(dir.path())
        .args(["-o", "json", "errors", "list"])
        .assert()
        .failure();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    let envelope: serde_json::Value = serde_json::from_str(&stdout).expect("json envelope");
    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error_type"], "backend_error");
}
