// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use muster_core::FakeClock;
use muster_core::Clock;

fn target(s: &str) -> AgentTarget {
    s.parse().unwrap()
}

fn registry() -> AgentRegistry {
    AgentRegistry::new(3, 2)
}

fn discover(registry: &AgentRegistry, targets: &[&str], now: DateTime<Utc>) -> DiscoveryDelta {
    registry.upsert_from_discovery(
        targets
            .iter()
            .map(|t| (target(t), "worker".to_string()))
            .collect::<Vec<_>>(),
        now,
    )
}

#[test]
fn discovery_creates_and_removes_records() {
    let registry = registry();
    let clock = FakeClock::default();

    let delta = discover(&registry, &["proj:1", "proj:2"], clock.now());
    assert_eq!(delta.added.len(), 2);
    assert_eq!(registry.len(), 2);

    // Window absent once: tolerated.
    let delta = discover(&registry, &["proj:1"], clock.now());
    assert!(delta.removed.is_empty());
    assert_eq!(registry.len(), 2);

    // Absent twice: dropped.
    let delta = discover(&registry, &["proj:1"], clock.now());
    assert_eq!(delta.removed, vec![target("proj:2")]);
    assert_eq!(registry.len(), 1);
}

#[test]
fn reappearing_window_resets_miss_counter() {
    let registry = registry();
    let clock = FakeClock::default();

    discover(&registry, &["proj:1", "proj:2"], clock.now());
    discover(&registry, &["proj:1"], clock.now());
    discover(&registry, &["proj:1", "proj:2"], clock.now());
    discover(&registry, &["proj:1"], clock.now());
    // proj:2 missed only one consecutive cycle each time.
    assert_eq!(registry.len(), 2);
}

#[test]
fn roles_inferred_from_window_names() {
    let registry = registry();
    let clock = FakeClock::default();
    registry.upsert_from_discovery(
        vec![
            (target("proj:0"), "pm".to_string()),
            (target("proj:1"), "worker-auth".to_string()),
            (target("proj:2"), "qa".to_string()),
            (target("hub:0"), "orchestrator".to_string()),
        ],
        clock.now(),
    );

    assert_eq!(
        registry.get(&target("proj:0")).unwrap().role,
        AgentRole::ProjectManager
    );
    assert_eq!(registry.get(&target("proj:1")).unwrap().role, AgentRole::Worker);
    assert_eq!(registry.get(&target("proj:2")).unwrap().role, AgentRole::Qa);
    assert_eq!(
        registry.get(&target("hub:0")).unwrap().role,
        AgentRole::Orchestrator
    );
}

#[test]
fn idle_promotion_after_threshold_unchanged_cycles() {
    let registry = registry();
    let clock = FakeClock::default();
    discover(&registry, &["proj:1"], clock.now());

    let t = target("proj:1");
    // First capture sets the fingerprint (content "changed" from none).
    let r = registry
        .apply_classification(&t, AgentState::Active, "abc", clock.now())
        .unwrap();
    assert_eq!(r.state, AgentState::Active);

    // Two unchanged cycles: still active.
    let r = registry
        .apply_classification(&t, AgentState::Active, "abc", clock.now())
        .unwrap();
    assert_eq!(r.state, AgentState::Active);
    assert_eq!(r.consecutive_idle_cycles, 1);

    registry.apply_classification(&t, AgentState::Active, "abc", clock.now());
    // Third unchanged cycle reaches the threshold of 3.
    let r = registry
        .apply_classification(&t, AgentState::Active, "abc", clock.now())
        .unwrap();
    assert_eq!(r.state, AgentState::Idle);

    // New content resets the counter and the verdict.
    let r = registry
        .apply_classification(&t, AgentState::Active, "def", clock.now())
        .unwrap();
    assert_eq!(r.state, AgentState::Active);
    assert_eq!(r.consecutive_idle_cycles, 0);
}

#[test]
fn grace_forces_active_for_unresponsive_verdicts() {
    let registry = registry();
    let clock = FakeClock::default();
    discover(&registry, &["proj:1"], clock.now());

    let t = target("proj:1");
    registry.begin_grace(&t, Duration::minutes(3), clock.now());

    let r = registry
        .apply_classification(&t, AgentState::Crashed, "abc", clock.now())
        .unwrap();
    assert_eq!(r.state, AgentState::Active);

    // After grace expires the verdict stands.
    clock.advance(Duration::minutes(4));
    let r = registry
        .apply_classification(&t, AgentState::Crashed, "abc", clock.now())
        .unwrap();
    assert_eq!(r.state, AgentState::Crashed);
}

#[test]
fn unknown_keeps_previous_state_and_counts_error() {
    let registry = registry();
    let clock = FakeClock::default();
    discover(&registry, &["proj:1"], clock.now());
    let t = target("proj:1");

    registry.apply_classification(&t, AgentState::Active, "abc", clock.now());
    let r = registry
        .apply_classification(&t, AgentState::Unknown, "abc", clock.now())
        .unwrap();
    assert_eq!(r.state, AgentState::Active);
    assert_eq!(r.error_count, 1);
}

#[test]
fn unsubmitted_cycles_accumulate_and_reset() {
    let registry = registry();
    let clock = FakeClock::default();
    discover(&registry, &["proj:1"], clock.now());
    let t = target("proj:1");

    let r = registry
        .apply_classification(&t, AgentState::UnsubmittedInput, "a", clock.now())
        .unwrap();
    assert_eq!(r.unsubmitted_cycles, 1);
    let r = registry
        .apply_classification(&t, AgentState::UnsubmittedInput, "a", clock.now())
        .unwrap();
    assert_eq!(r.unsubmitted_cycles, 2);

    let r = registry
        .apply_classification(&t, AgentState::Active, "b", clock.now())
        .unwrap();
    assert_eq!(r.unsubmitted_cycles, 0);
}

#[test]
fn begin_grace_resets_history() {
    let registry = registry();
    let clock = FakeClock::default();
    discover(&registry, &["proj:1"], clock.now());
    let t = target("proj:1");

    registry.apply_classification(&t, AgentState::Active, "abc", clock.now());
    registry.begin_grace(&t, Duration::minutes(3), clock.now());

    let r = registry.get(&t).unwrap();
    assert_eq!(r.state, AgentState::Fresh);
    assert_eq!(r.last_content_fingerprint, None);
    assert!(r.in_grace(clock.now()));
}

#[test]
fn clear_rate_limited_resets_for_reclassification() {
    let registry = registry();
    let clock = FakeClock::default();
    discover(&registry, &["proj:1", "proj:2"], clock.now());

    registry.apply_classification(&target("proj:1"), AgentState::RateLimited, "a", clock.now());
    registry.apply_classification(&target("proj:2"), AgentState::Active, "b", clock.now());

    registry.clear_rate_limited();
    assert_eq!(registry.get(&target("proj:1")).unwrap().state, AgentState::Unknown);
    assert_eq!(registry.get(&target("proj:2")).unwrap().state, AgentState::Active);
}

#[test]
fn record_submission_bumps_counters() {
    let registry = registry();
    let clock = FakeClock::default();
    discover(&registry, &["proj:1"], clock.now());
    let t = target("proj:1");

    registry.record_submission(&t, clock.now());
    registry.record_submission(&t, clock.now());
    let r = registry.get(&t).unwrap();
    assert_eq!(r.submission_attempts, 2);
    assert_eq!(r.last_submission_at, Some(clock.now()));
}

#[test]
fn snapshot_all_is_sorted_by_target() {
    let registry = registry();
    let clock = FakeClock::default();
    discover(&registry, &["b:2", "a:1", "b:1"], clock.now());

    let all = registry.snapshot_all();
    let targets: Vec<String> = all.iter().map(|r| r.target.to_string()).collect();
    assert_eq!(targets, vec!["a:1", "b:1", "b:2"]);
}
