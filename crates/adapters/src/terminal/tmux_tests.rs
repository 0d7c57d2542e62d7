// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn key_names_match_tmux_send_keys() {
    assert_eq!(Key::Enter.name(), "Enter");
    assert_eq!(Key::CtrlC.name(), "C-c");
    assert_eq!(Key::CtrlU.name(), "C-u");
}

#[tokio::test(start_paused = true)]
async fn pacing_spaces_consecutive_calls() {
    let driver = TmuxDriver::new();

    let start = tokio::time::Instant::now();
    driver.pace().await;
    driver.pace().await;
    driver.pace().await;

    // Two gaps of at least the minimum interval between three calls.
    assert!(start.elapsed() >= MIN_CALL_INTERVAL * 2);
}
