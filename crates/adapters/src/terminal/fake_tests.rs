// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn target(s: &str) -> AgentTarget {
    s.parse().unwrap()
}

#[tokio::test]
async fn discovery_reflects_scripted_panes() {
    let driver = FakeDriver::new();
    driver.add_pane(&target("proj:0"), "pm", "ready");
    driver.add_pane(&target("proj:1"), "worker", "ready");
    driver.add_pane(&target("other:0"), "pm", "ready");

    let sessions = driver.list_sessions().await.unwrap();
    assert_eq!(sessions, vec!["other".to_string(), "proj".to_string()]);

    let windows = driver.list_windows("proj").await.unwrap();
    assert_eq!(windows.len(), 2);
    assert_eq!(windows[0].index, 0);
    assert_eq!(windows[1].name, "worker");
}

#[tokio::test]
async fn capture_returns_last_lines() {
    let driver = FakeDriver::new();
    let t = target("proj:0");
    driver.add_pane(&t, "pm", "one\ntwo\nthree\nfour");

    let text = driver.capture_pane(&t, 2).await.unwrap();
    assert_eq!(text, "three\nfour");
}

#[tokio::test]
async fn typed_input_shows_as_draft_until_enter() {
    let driver = FakeDriver::new();
    let t = target("proj:0");
    driver.add_pane(&t, "pm", "╭───╮");

    driver.send_keys_literal(&t, "status please").await.unwrap();
    let text = driver.capture_pane(&t, 10).await.unwrap();
    assert!(text.contains("│ > status please"));

    driver.send_key(&t, Key::Enter).await.unwrap();
    let text = driver.capture_pane(&t, 10).await.unwrap();
    assert!(text.contains("> status please"));
    assert!(!text.contains("│ > status please"));
}

#[tokio::test]
async fn ctrl_keys_clear_pending_input() {
    let driver = FakeDriver::new();
    let t = target("proj:0");
    driver.add_pane(&t, "pm", "");

    driver.send_keys_literal(&t, "half-typed").await.unwrap();
    driver.send_key(&t, Key::CtrlU).await.unwrap();
    assert_eq!(driver.pane(&t).unwrap().pending_input, "");
}

#[tokio::test]
async fn create_window_allocates_next_index() {
    let driver = FakeDriver::new();
    driver.add_pane(&target("proj:0"), "pm", "");

    let t = driver
        .create_window("proj", "worker", Path::new("/tmp"), "claude")
        .await
        .unwrap();
    assert_eq!(t, target("proj:1"));

    // Index is not reused even after the window dies.
    driver.kill_window(&t).await.unwrap();
    let t2 = driver
        .create_window("proj", "worker", Path::new("/tmp"), "claude")
        .await
        .unwrap();
    assert_eq!(t2, target("proj:2"));
}

#[tokio::test]
async fn injected_failures_surface_as_backend_errors() {
    let driver = FakeDriver::new();
    let t = target("proj:0");
    driver.add_pane(&t, "pm", "text");

    driver.fail_captures(true);
    assert!(matches!(
        driver.capture_pane(&t, 10).await,
        Err(TerminalError::Backend(_))
    ));

    driver.fail_sends(true);
    assert!(driver.send_key(&t, Key::Enter).await.is_err());
}

#[tokio::test]
async fn records_calls_in_order() {
    let driver = FakeDriver::new();
    let t = target("proj:0");
    driver.add_pane(&t, "pm", "");

    driver.capture_pane(&t, 5).await.unwrap();
    driver.send_key(&t, Key::CtrlC).await.unwrap();

    let calls = driver.calls_for(&t);
    assert_eq!(
        calls,
        vec![
            DriverCall::CapturePane {
                target: t.clone(),
                max_lines: 5
            },
            DriverCall::SendKey {
                target: t,
                key: Key::CtrlC
            },
        ]
    );
}
