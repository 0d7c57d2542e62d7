// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::registry::AgentRegistry;
use muster_adapters::{DriverCall, FakeDriver};
use muster_core::FakeClock;

struct Fixture {
    driver: FakeDriver,
    checker: HealthChecker<FakeDriver, FakeClock>,
    registry: Arc<AgentRegistry>,
    clock: FakeClock,
}

fn fixture() -> Fixture {
    fixture_with(MonitorConfig::default())
}

fn fixture_with(config: MonitorConfig) -> Fixture {
    let driver = FakeDriver::new();
    let factory = driver.clone();
    let config = Arc::new(config);
    let pool = DriverPool::new(config.pool.clone(), move || factory.clone());
    let cache = Arc::new(LayeredCache::new(&config.cache));
    let registry = Arc::new(AgentRegistry::new(
        config.idle_threshold_cycles,
        config.stale_tolerance_cycles,
    ));
    let clock = FakeClock::default();
    let checker = HealthChecker::new(
        pool,
        cache,
        Arc::clone(&registry),
        clock.clone(),
        config,
    );
    Fixture {
        driver,
        checker,
        registry,
        clock,
    }
}

fn target(s: &str) -> AgentTarget {
    s.parse().unwrap()
}

fn discover(fixture: &Fixture, targets: &[&str]) {
    fixture.registry.upsert_from_discovery(
        targets
            .iter()
            .map(|t| (target(t), "worker".to_string()))
            .collect::<Vec<_>>(),
        fixture.clock.now(),
    );
}

#[tokio::test]
async fn check_captures_and_classifies() {
    let f = fixture();
    discover(&f, &["proj:1"]);
    f.driver.add_pane(&target("proj:1"), "worker", "Reading src/lib.rs");

    let status = f.checker.check(&target("proj:1")).await.unwrap();
    assert_eq!(status.state, AgentState::Active);
    assert!(status.is_responsive);
    assert!(status.cached_from.is_none());

    let record = f.registry.get(&target("proj:1")).unwrap();
    assert_eq!(record.state, AgentState::Active);
    assert!(record.last_content_fingerprint.is_some());
}

#[tokio::test]
async fn second_check_is_served_from_cache() {
    let f = fixture();
    discover(&f, &["proj:1"]);
    f.driver.add_pane(&target("proj:1"), "worker", "output");

    let first = f.checker.check(&target("proj:1")).await.unwrap();
    let second = f.checker.check(&target("proj:1")).await.unwrap();
    assert_eq!(second.cached_from, Some(first.detected_at));

    // Only one real capture happened.
    let captures = f
        .driver
        .calls()
        .into_iter()
        .filter(|c| matches!(c, DriverCall::CapturePane { .. }))
        .count();
    assert_eq!(captures, 1);
}

#[tokio::test]
async fn concurrent_checks_coalesce_into_one_capture() {
    let f = fixture();
    discover(&f, &["proj:1"]);
    f.driver.add_pane(&target("proj:1"), "worker", "output");
    f.driver.set_capture_delay(std::time::Duration::from_millis(20));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let checker = f.checker.clone();
        handles.push(tokio::spawn(
            async move { checker.check(&target("proj:1")).await },
        ));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    let captures = f
        .driver
        .calls()
        .into_iter()
        .filter(|c| matches!(c, DriverCall::CapturePane { .. }))
        .count();
    assert_eq!(captures, 1);
}

#[tokio::test]
async fn capture_failure_is_isolated_and_counted() {
    let f = fixture();
    discover(&f, &["proj:1"]);
    f.driver.add_pane(&target("proj:1"), "worker", "output");
    f.driver.fail_captures(true);

    let result = f.checker.check(&target("proj:1")).await;
    assert!(result.is_err());

    // The record keeps its previous (unknown) state; nothing crashed.
    let record = f.registry.get(&target("proj:1")).unwrap();
    assert_eq!(record.state, AgentState::Unknown);
}

#[tokio::test]
async fn check_many_returns_results_in_input_order() {
    let f = fixture();
    discover(&f, &["proj:1", "proj:2", "proj:3"]);
    f.driver.add_pane(&target("proj:1"), "a", "working on a");
    f.driver.add_pane(&target("proj:2"), "b", "working on b");
    f.driver.add_pane(&target("proj:3"), "c", "working on c");

    let results = f
        .checker
        .check_many(vec![target("proj:3"), target("proj:1"), target("proj:2")])
        .await;

    let order: Vec<String> = results.iter().map(|(t, _)| t.to_string()).collect();
    assert_eq!(order, vec!["proj:3", "proj:1", "proj:2"]);
    assert!(results.iter().all(|(_, r)| r.is_ok()));
}

#[tokio::test]
async fn check_many_isolates_failing_targets() {
    let f = fixture();
    discover(&f, &["proj:1", "proj:2"]);
    f.driver.add_pane(&target("proj:1"), "a", "fine");
    // proj:2 has no pane: capture errors.

    let results = f
        .checker
        .check_many(vec![target("proj:1"), target("proj:2")])
        .await;
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
}

#[tokio::test]
async fn grace_suppresses_crash_verdict() {
    let f = fixture();
    discover(&f, &["proj:1"]);
    f.driver.add_pane(&target("proj:1"), "worker", "bash-5.1$ ");
    f.registry.begin_grace(
        &target("proj:1"),
        chrono::Duration::minutes(3),
        f.clock.now(),
    );

    let status = f.checker.check(&target("proj:1")).await.unwrap();
    assert_eq!(status.state, AgentState::Active);
}

#[tokio::test]
async fn idle_promotion_through_repeated_checks() {
    let mut config = MonitorConfig::default();
    config.cache.agent_status.ttl_seconds = 0; // always re-check
    config.cache.pane_content.ttl_seconds = 0;
    let f = fixture_with(config);
    discover(&f, &["proj:1"]);
    f.driver.add_pane(&target("proj:1"), "worker", "same output forever");

    let mut last = None;
    for _ in 0..4 {
        last = Some(f.checker.check(&target("proj:1")).await.unwrap());
    }
    assert_eq!(last.unwrap().state, AgentState::Idle);
}

#[test]
fn fingerprint_is_stable_hex() {
    let a = fingerprint("hello");
    let b = fingerprint("hello");
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert_ne!(a, fingerprint("other"));
}
