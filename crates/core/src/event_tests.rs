// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_750_000_000, 0).unwrap()
}

#[test]
fn crash_event_wire_format() {
    let event = Event::AgentCrashed {
        target: "proj:2".parse().unwrap(),
        reason: "shell prompt at end of buffer".into(),
        observed_at: at(),
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "agent:crashed");
    assert_eq!(value["target"], "proj:2");
}

#[test]
fn events_round_trip() {
    let events = vec![
        Event::AgentIdle {
            target: "proj:1".parse().unwrap(),
            reason: "unchanged for 3 cycles".into(),
            observed_at: at(),
        },
        Event::RateLimitWindowBegan {
            target: Some("proj:1".parse().unwrap()),
            reset_at: at(),
            reason: "usage limit reached".into(),
            observed_at: at(),
        },
        Event::RateLimitWindowEnded {
            reason: "window elapsed".into(),
            observed_at: at(),
        },
        Event::RecoveryCompleted {
            target: "proj:1".parse().unwrap(),
            failed: true,
            reason: "init timeout".into(),
            observed_at: at(),
        },
    ];
    for event in events {
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}

#[test]
fn recovery_completed_failed_defaults_false() {
    let json = serde_json::json!({
        "type": "recovery:completed",
        "target": "proj:1",
        "reason": "classified active",
        "observed_at": "2025-06-15T00:00:00Z",
    });
    let event: Event = serde_json::from_value(json).unwrap();
    match event {
        Event::RecoveryCompleted { failed, .. } => assert!(!failed),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn target_accessor() {
    let ended = Event::RateLimitWindowEnded {
        reason: "done".into(),
        observed_at: at(),
    };
    assert!(ended.target().is_none());
}
