// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use muster_adapters::{DriverCall, FakeDriver};
use muster_core::FakeClock;

struct Fixture {
    driver: FakeDriver,
    recovery: RecoveryManager<FakeDriver, FakeClock>,
    registry: Arc<AgentRegistry>,
    clock: FakeClock,
}

fn target(s: &str) -> AgentTarget {
    s.parse().unwrap()
}

fn fixture() -> Fixture {
    let driver = FakeDriver::new();
    let factory = driver.clone();
    let mut config = MonitorConfig::default();
    config.submit.min_stage_delay_ms = 1;
    let config = Arc::new(config);
    let pool = DriverPool::new(config.pool.clone(), move || factory.clone());
    let registry = Arc::new(AgentRegistry::new(3, 2));
    let clock = FakeClock::default();
    let submitter = MessageSubmitter::new(
        pool.clone(),
        Arc::clone(&registry),
        Arc::clone(&config),
        clock.clone(),
    );
    let recovery = RecoveryManager::new(pool, submitter, Arc::clone(&registry), config, clock.clone());
    Fixture {
        driver,
        recovery,
        registry,
        clock,
    }
}

#[tokio::test]
async fn recover_kills_respawns_briefs_and_starts_grace() {
    let f = fixture();
    let t = target("proj:1");
    f.registry
        .upsert_from_discovery(vec![(t.clone(), "worker".to_string())], f.clock.now());
    f.driver.add_pane(&t, "worker", "bash-5.1$ ");

    let events = f.recovery.recover(&t).await.unwrap();
    assert!(matches!(events.as_slice(), [Event::RecoveryStarted { .. }]));

    // Kill then respawn at the same address.
    let calls = f.driver.calls();
    let kill_pos = calls
        .iter()
        .position(|c| matches!(c, DriverCall::KillWindow { target } if *target == t))
        .unwrap();
    let respawn_pos = calls
        .iter()
        .position(|c| matches!(c, DriverCall::RespawnWindow { target, .. } if *target == t))
        .unwrap();
    assert!(kill_pos < respawn_pos);

    // Briefing was typed into the replacement pane.
    let pane = f.driver.pane(&t).unwrap();
    assert!(pane.text.contains("Worker agent"));

    // Grace window opened; record reset to fresh.
    let record = f.registry.get(&t).unwrap();
    assert!(record.in_grace(f.clock.now()));
    assert_eq!(record.state, AgentState::Fresh);
    assert_eq!(f.recovery.pending_count(), 1);
}

#[tokio::test]
async fn recovery_completes_on_next_responsive_classification() {
    let f = fixture();
    let t = target("proj:1");
    f.registry
        .upsert_from_discovery(vec![(t.clone(), "worker".to_string())], f.clock.now());
    f.driver.add_pane(&t, "worker", "dead");

    f.recovery.recover(&t).await.unwrap();

    // A non-responsive verdict does not complete the recovery.
    assert!(f
        .recovery
        .note_classification(&t, AgentState::Crashed)
        .is_none());

    let event = f
        .recovery
        .note_classification(&t, AgentState::Active)
        .unwrap();
    match event {
        Event::RecoveryCompleted { failed, .. } => assert!(!failed),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(f.recovery.pending_count(), 0);

    // Completion fires once.
    assert!(f
        .recovery
        .note_classification(&t, AgentState::Active)
        .is_none());
}

#[tokio::test(start_paused = true)]
async fn init_timeout_emits_failed_completion() {
    let f = fixture();
    let t = target("proj:1");
    f.registry
        .upsert_from_discovery(vec![(t.clone(), "worker".to_string())], f.clock.now());
    f.driver.add_pane(&t, "worker", "dead");
    // The respawned pane never renders anything.
    f.driver.set_respawn_blank(true);

    let events = f.recovery.recover(&t).await.unwrap();
    assert_eq!(events.len(), 2);
    match &events[1] {
        Event::RecoveryCompleted { failed, reason, .. } => {
            assert!(failed);
            assert!(reason.contains("no REPL output"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    // No grace, no pending completion for a failed recovery.
    assert_eq!(f.recovery.pending_count(), 0);
}

#[tokio::test]
async fn recover_unknown_target_defaults_to_worker_role() {
    let f = fixture();
    let t = target("proj:9");
    f.driver.add_pane(&t, "mystery", "dead");

    let events = f.recovery.recover(&t).await.unwrap();
    match &events[0] {
        Event::RecoveryStarted { reason, .. } => assert!(reason.contains("worker")),
        other => panic!("unexpected event {other:?}"),
    }
}
