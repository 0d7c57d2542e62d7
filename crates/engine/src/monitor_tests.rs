// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use muster_adapters::{FakeDriver, FakeNotifyAdapter};
use muster_core::{AgentTarget, FakeClock};
use std::sync::Arc as StdArc;

fn target(s: &str) -> AgentTarget {
    s.parse().unwrap()
}

fn service(
    driver: &FakeDriver,
    snapshot_path: Option<PathBuf>,
) -> MonitorService<FakeDriver, FakeNotifyAdapter, FakeClock> {
    let factory = driver.clone();
    let mut config = MonitorConfig::default();
    config.submit.min_stage_delay_ms = 1;
    MonitorService::new(
        move || factory.clone(),
        FakeNotifyAdapter::new(),
        config,
        FakeClock::default(),
        snapshot_path,
    )
}

#[test]
fn warmup_cycles_are_stretched() {
    let driver = FakeDriver::new();
    let service = service(&driver, None);

    // base 15s -> warmup max(45s, 30s) = 45s for the first three cycles.
    assert_eq!(service.cycle_interval(1), Duration::from_secs(45));
    assert_eq!(service.cycle_interval(3), Duration::from_secs(45));
    assert_eq!(service.cycle_interval(4), Duration::from_secs(15));
}

#[test]
fn warmup_floor_applies_for_short_base_intervals() {
    let driver = FakeDriver::new();
    let factory = driver.clone();
    let mut config = MonitorConfig::default();
    config.base_interval_seconds = 5;
    let service = MonitorService::new(
        move || factory.clone(),
        FakeNotifyAdapter::new(),
        config,
        FakeClock::default(),
        None,
    );

    assert_eq!(service.cycle_interval(1), Duration::from_secs(30));
    assert_eq!(service.cycle_interval(4), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn run_executes_cycles_until_stopped() {
    let driver = FakeDriver::new();
    driver.add_pane(&target("proj:1"), "worker", "busy");
    let service = StdArc::new(service(&driver, None));

    let runner = {
        let service = StdArc::clone(&service);
        tokio::spawn(async move { service.run().await })
    };

    // Let a few cycles elapse in paused time.
    tokio::time::sleep(Duration::from_secs(120)).await;
    service.stop();
    runner.await.unwrap();

    let status = service.status();
    assert!(!status.running);
    assert!(status.cycle_count >= 2);
    assert!(status.last_report.is_some());
    assert_eq!(status.agents, 1);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_window_pauses_health_checks() {
    let driver = FakeDriver::new();
    driver.add_pane(
        &target("proj:1"),
        "worker",
        "Claude usage limit reached. resets at 4:30pm",
    );
    let service = StdArc::new(service(&driver, None));

    let runner = {
        let service = StdArc::clone(&service);
        tokio::spawn(async move { service.run().await })
    };

    // First cycle classifies the pane and opens the window.
    tokio::time::sleep(Duration::from_secs(50)).await;
    assert!(service.status().rate_limited);
    let captures_when_paused = driver
        .calls()
        .iter()
        .filter(|c| matches!(c, muster_adapters::DriverCall::CapturePane { .. }))
        .count();

    // While the window is open, no further captures happen.
    tokio::time::sleep(Duration::from_secs(300)).await;
    let captures_later = driver
        .calls()
        .iter()
        .filter(|c| matches!(c, muster_adapters::DriverCall::CapturePane { .. }))
        .count();
    assert_eq!(captures_when_paused, captures_later);

    service.stop();
    runner.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn snapshot_written_and_restored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("monitor_state.json");

    let driver = FakeDriver::new();
    driver.add_pane(&target("proj:1"), "worker", "busy");
    let service = StdArc::new(service(&driver, Some(path.clone())));

    let runner = {
        let service = StdArc::clone(&service);
        tokio::spawn(async move { service.run().await })
    };
    tokio::time::sleep(Duration::from_secs(50)).await;
    service.stop();
    runner.await.unwrap();

    assert!(path.exists());

    // A new service restores the registry from the snapshot.
    let restored = service_from(&driver, Some(path));
    assert_eq!(restored.registry().len(), 1);
    assert!(restored.registry().get(&target("proj:1")).is_some());
}

fn service_from(
    driver: &FakeDriver,
    snapshot_path: Option<PathBuf>,
) -> MonitorService<FakeDriver, FakeNotifyAdapter, FakeClock> {
    let factory = driver.clone();
    let mut config = MonitorConfig::default();
    config.submit.min_stage_delay_ms = 1;
    MonitorService::new(
        move || factory.clone(),
        FakeNotifyAdapter::new(),
        config,
        FakeClock::default(),
        snapshot_path,
    )
}

#[test]
fn status_surfaces_component_stats() {
    let driver = FakeDriver::new();
    let service = service(&driver, None);
    let status = service.status();

    assert!(!status.running);
    assert_eq!(status.cycle_count, 0);
    assert_eq!(status.strategy, "concurrent");
    assert!(status.recovery_enabled);
    assert_eq!(status.pool.in_use, 0);
    assert_eq!(status.submitter.delivered, 0);
}
