// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn envelope_ok_shape() {
    let envelope = Envelope::ok("agent.status", json!({"agents": 2}));
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["agents"], 2);
    assert_eq!(value["error"], Value::Null);
    assert_eq!(value["error_type"], Value::Null);
    assert_eq!(value["command"], "agent.status");
    assert!(value["timestamp"].as_f64().unwrap() > 1.7e9);
}

#[test]
fn envelope_err_shape() {
    let envelope = Envelope::err(
        "agent.stauts",
        "unknown action 'stauts'",
        "invalid_action",
        Some(json!({"did_you_mean": "status"})),
    );
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["success"], false);
    assert_eq!(value["error_type"], "invalid_action");
    assert_eq!(value["data"]["did_you_mean"], "status");
    assert_eq!(value["command"], "agent.stauts");
}

#[test]
fn arrays_of_objects_render_as_tables() {
    let value = json!([
        {"target": "proj:1", "state": "active"},
        {"target": "proj:2", "state": "idle"},
    ]);
    let text = render_text(&value);
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].contains("TARGET"));
    assert!(lines[0].contains("STATE"));
    assert!(lines[1].starts_with("proj:1"));
    assert!(lines[2].contains("idle"));
}

#[test]
fn objects_render_as_key_value_lines() {
    let value = json!({"running": true, "cycles": 5});
    let text = render_text(&value);
    assert!(text.contains("running: true"));
    assert!(text.contains("cycles: 5"));
}

#[test]
fn strings_render_verbatim() {
    assert_eq!(render_text(&json!("hello")), "hello");
}
