// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use muster_core::{AgentState, FakeClock};

fn fixture() -> (RateLimitCoordinator<FakeClock>, Arc<AgentRegistry>, FakeClock) {
    let clock = FakeClock::default();
    let registry = Arc::new(AgentRegistry::new(3, 2));
    let coordinator = RateLimitCoordinator::new(clock.clone(), Arc::clone(&registry));
    (coordinator, registry, clock)
}

#[test]
fn window_opens_once_until_resumed() {
    let (coordinator, _registry, clock) = fixture();
    let reset = clock.now() + chrono::Duration::hours(2);

    assert!(coordinator.observe_began(reset));
    assert!(coordinator.is_active());
    // Repeat observations while open are absorbed.
    assert!(!coordinator.observe_began(reset));
}

#[test]
fn remaining_includes_two_minute_buffer() {
    let (coordinator, _registry, clock) = fixture();
    let reset = clock.now() + chrono::Duration::minutes(30);
    coordinator.observe_began(reset);

    let remaining = coordinator.remaining().unwrap();
    assert_eq!(remaining, Duration::from_secs(32 * 60));
}

#[test]
fn pause_is_clamped_to_a_day() {
    let (coordinator, _registry, clock) = fixture();
    let reset = clock.now() + chrono::Duration::days(7);
    coordinator.observe_began(reset);

    assert!(coordinator.remaining().unwrap() <= Duration::from_secs(24 * 60 * 60));
}

#[test]
fn try_resume_fires_only_after_expiry() {
    let (coordinator, registry, clock) = fixture();
    registry.upsert_from_discovery(
        vec![("proj:1".parse().unwrap(), "worker".to_string())],
        clock.now(),
    );
    registry.apply_classification(
        &"proj:1".parse().unwrap(),
        AgentState::RateLimited,
        "fp",
        clock.now(),
    );

    let reset = clock.now() + chrono::Duration::minutes(10);
    coordinator.observe_began(reset);
    assert!(coordinator.try_resume().is_none());

    clock.advance(chrono::Duration::minutes(13));
    let event = coordinator.try_resume().unwrap();
    assert!(matches!(event, Event::RateLimitWindowEnded { .. }));
    assert!(!coordinator.is_active());

    // RateLimited verdicts were cleared for re-classification.
    assert_eq!(
        registry.get(&"proj:1".parse().unwrap()).unwrap().state,
        AgentState::Unknown
    );

    // A later window can open again.
    assert!(coordinator.observe_began(clock.now() + chrono::Duration::hours(1)));
}

#[test]
fn scenario_reset_at_1630_pauses_until_1632() {
    use chrono::TimeZone;
    let clock = FakeClock::at(chrono::Utc.with_ymd_and_hms(2025, 6, 15, 14, 0, 0).unwrap());
    let registry = Arc::new(AgentRegistry::new(3, 2));
    let coordinator = RateLimitCoordinator::new(clock.clone(), registry);

    let reset = chrono::Utc.with_ymd_and_hms(2025, 6, 15, 16, 30, 0).unwrap();
    coordinator.observe_began(reset);

    // Pause runs to 16:32, i.e. 2h32m from 14:00.
    assert_eq!(
        coordinator.remaining().unwrap(),
        Duration::from_secs((2 * 60 + 32) * 60)
    );

    clock.set(chrono::Utc.with_ymd_and_hms(2025, 6, 15, 16, 31, 59).unwrap());
    assert!(coordinator.try_resume().is_none());
    clock.set(chrono::Utc.with_ymd_and_hms(2025, 6, 15, 16, 32, 0).unwrap());
    assert!(coordinator.try_resume().is_some());
}
