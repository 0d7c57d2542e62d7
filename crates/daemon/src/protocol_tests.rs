// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn request_round_trips() {
    let requests = vec![
        Request::Ping,
        Request::Hello {
            version: "0.1.0".into(),
        },
        Request::AgentSend {
            target: "proj:1".into(),
            message: "hello".into(),
            delay_hint_ms: Some(500),
        },
        Request::Recover {
            target: "proj:1".into(),
        },
        Request::ErrorsList { limit: 20 },
        Request::Shutdown,
    ];
    for request in requests {
        let json = serde_json::to_string(&request).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}

#[test]
fn agent_send_delay_hint_defaults_to_none() {
    let json = serde_json::json!({
        "type": "agent_send",
        "target": "proj:1",
        "message": "hi",
    });
    let request: Request = serde_json::from_value(json).unwrap();
    assert_eq!(
        request,
        Request::AgentSend {
            target: "proj:1".into(),
            message: "hi".into(),
            delay_hint_ms: None,
        }
    );
}

#[test]
fn error_response_carries_taxonomy_type() {
    let response = Response::error("no such agent", "not_found");
    match response {
        Response::Error {
            message,
            error_type,
        } => {
            assert_eq!(message, "no such agent");
            assert_eq!(error_type, "not_found");
        }
        other => panic!("unexpected {other:?}"),
    }
}
