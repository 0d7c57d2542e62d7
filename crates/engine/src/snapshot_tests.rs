// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use muster_core::{AgentRole, Clock, FakeClock};

fn agents(clock: &FakeClock) -> Vec<AgentRecord> {
    vec![
        AgentRecord::new("proj:0".parse().unwrap(), AgentRole::ProjectManager, clock.now()),
        AgentRecord::new("proj:1".parse().unwrap(), AgentRole::Worker, clock.now()),
    ]
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("monitor_state.json");
    let clock = FakeClock::default();

    let snapshot = RegistrySnapshot::new(agents(&clock), clock.now());
    snapshot.save(&path).unwrap();

    let loaded = RegistrySnapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.version, SNAPSHOT_VERSION);
    assert_eq!(loaded.agents.len(), 2);
    assert_eq!(loaded.agents[0].target.to_string(), "proj:0");
}

#[test]
fn missing_file_loads_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monitor_state.json");
    assert!(RegistrySnapshot::load(&path).unwrap().is_none());
}

#[test]
fn corrupt_file_moves_to_bak() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monitor_state.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(RegistrySnapshot::load(&path).unwrap().is_none());
    assert!(!path.exists());
    assert!(path.with_extension("bak").exists());
}

#[test]
fn old_version_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monitor_state.json");
    std::fs::write(
        &path,
        serde_json::json!({
            "version": 1,
            "saved_at": "2025-06-15T00:00:00Z",
            "agents": [],
        })
        .to_string(),
    )
    .unwrap();

    assert!(RegistrySnapshot::load(&path).unwrap().is_none());
}

#[test]
fn reader_ignores_unknown_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monitor_state.json");
    std::fs::write(
        &path,
        serde_json::json!({
            "version": 3,
            "saved_at": "2025-06-15T00:00:00Z",
            "agents": [],
            "a_field_from_the_future": {"x": 1},
        })
        .to_string(),
    )
    .unwrap();

    let loaded = RegistrySnapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.version, 3);
}
