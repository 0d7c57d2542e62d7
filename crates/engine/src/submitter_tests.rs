// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::registry::AgentRegistry;
use muster_adapters::{DriverCall, FakeDriver};
use muster_core::FakeClock;

fn target(s: &str) -> AgentTarget {
    s.parse().unwrap()
}

fn fixture() -> (FakeDriver, MessageSubmitter<FakeDriver, FakeClock>, Arc<AgentRegistry>) {
    let driver = FakeDriver::new();
    let factory = driver.clone();
    let config = Arc::new(MonitorConfig::default());
    let pool = DriverPool::new(config.pool.clone(), move || factory.clone());
    let registry = Arc::new(AgentRegistry::new(3, 2));
    let clock = FakeClock::default();
    let submitter = MessageSubmitter::new(pool, Arc::clone(&registry), config, clock.clone());
    registry.upsert_from_discovery(vec![(target("proj:1"), "worker".to_string())], clock.now());
    (driver, submitter, registry)
}

#[tokio::test(start_paused = true)]
async fn submit_follows_the_protocol_sequence() {
    let (driver, submitter, registry) = fixture();
    let t = target("proj:1");
    driver.add_pane(&t, "worker", "╭──╮\n│ > │");

    let outcome = submitter
        .submit(&t, "status please", Some(Duration::from_millis(500)))
        .await;
    assert_eq!(outcome, SubmitOutcome::Delivered);

    let calls = driver.calls_for(&t);
    assert_eq!(
        calls[0],
        DriverCall::SendKey {
            target: t.clone(),
            key: Key::CtrlC
        }
    );
    assert_eq!(
        calls[1],
        DriverCall::SendKey {
            target: t.clone(),
            key: Key::CtrlU
        }
    );
    assert_eq!(
        calls[2],
        DriverCall::SendKeysLiteral {
            target: t.clone(),
            text: "status please".to_string()
        }
    );
    assert_eq!(
        calls[3],
        DriverCall::SendKey {
            target: t.clone(),
            key: Key::Enter
        }
    );
    assert!(matches!(calls[4], DriverCall::CapturePane { .. }));

    // Submission bookkeeping updated.
    assert_eq!(registry.get(&t).unwrap().submission_attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn stage_delay_respects_floor_and_hint() {
    let (driver, submitter, _registry) = fixture();
    let t = target("proj:1");
    driver.add_pane(&t, "worker", "");

    // Small hint: the 3s floor wins.
    let start = tokio::time::Instant::now();
    submitter
        .submit(&t, "hi", Some(Duration::from_millis(100)))
        .await;
    assert!(start.elapsed() >= Duration::from_secs(3));

    // Large hint: hint x multiplier wins.
    let start = tokio::time::Instant::now();
    submitter
        .submit(&t, "hi again", Some(Duration::from_secs(1)))
        .await;
    assert!(start.elapsed() >= Duration::from_secs(6));
}

#[tokio::test]
async fn empty_text_is_a_noop_delivered() {
    let (driver, submitter, _registry) = fixture();
    let t = target("proj:1");
    driver.add_pane(&t, "worker", "");

    let outcome = submitter.submit(&t, "", None).await;
    assert_eq!(outcome, SubmitOutcome::Delivered);
    assert!(driver.calls_for(&t).is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropped_submit_retries_with_doubled_delay() {
    let (driver, submitter, _registry) = fixture();
    let t = target("proj:1");
    driver.add_pane(&t, "worker", "╭──╮");
    // Enter does not commit: the draft stays in the frame.
    driver.set_echo_on_enter(false);

    let start = tokio::time::Instant::now();
    let outcome = submitter.submit(&t, "stuck message", None).await;
    assert_eq!(
        outcome,
        SubmitOutcome::Failed {
            reason: "payload never left the input frame".to_string()
        }
    );

    // Three attempts: 3s + 6s + 12s of staging delay.
    assert!(start.elapsed() >= Duration::from_secs(21));

    let enters = driver
        .calls_for(&t)
        .into_iter()
        .filter(|c| matches!(c, DriverCall::SendKey { key: Key::Enter, .. }))
        .count();
    assert_eq!(enters, 3);
}

#[tokio::test(start_paused = true)]
async fn driver_failure_is_failed_outcome() {
    let (driver, submitter, _registry) = fixture();
    let t = target("proj:1");
    driver.add_pane(&t, "worker", "");
    driver.fail_sends(true);

    let outcome = submitter.submit(&t, "hello", None).await;
    assert!(matches!(outcome, SubmitOutcome::Failed { .. }));
    assert_eq!(submitter.stats().failed, 1);
}

#[tokio::test(start_paused = true)]
async fn verification_capture_failure_is_delivered_unverified() {
    let (driver, submitter, _registry) = fixture();
    let t = target("proj:1");
    driver.add_pane(&t, "worker", "");

    // Fail captures only after the sends have gone through.
    let driver2 = driver.clone();
    let submitter2 = submitter.clone();
    let handle = tokio::spawn(async move { submitter2.submit(&t, "hello", None).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    driver2.fail_captures(true);
    let outcome = handle.await.unwrap();

    assert_eq!(outcome, SubmitOutcome::DeliveredUnverified);
    assert_eq!(submitter.stats().unverified, 1);
}

#[tokio::test(start_paused = true)]
async fn jittered_echo_still_delivers() {
    // The fake commits the draft on Enter after the staging wait, which
    // mirrors a REPL that echoes late but within the window.
    let (driver, submitter, registry) = fixture();
    let t = target("proj:1");
    driver.add_pane(&t, "worker", "╭──╮\n│ > │");

    let outcome = submitter
        .submit(&t, "status please", Some(Duration::from_millis(500)))
        .await;
    assert_eq!(outcome, SubmitOutcome::Delivered);

    // The submitted text now shows as committed, not draft.
    let pane = driver.pane(&t).unwrap();
    assert!(pane.text.contains("> status please"));
    assert!(pane.pending_input.is_empty());
    assert_eq!(registry.get(&t).unwrap().submission_attempts, 1);
}
