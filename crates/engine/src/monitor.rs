// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor service: owns every subsystem and runs the cycle loop.
//!
//! Lifecycle: `initialize → start → (run_cycle)* → stop → cleanup`. The
//! first cycles run at a stretched interval so a freshly deployed fleet is
//! not hammered with captures while its REPLs initialize. A rate-limit
//! window preempts the whole loop: no checks, recoveries, or notifications
//! until it expires, except the single resume notice.

use crate::cache::{CacheStats, LayeredCache};
use crate::detector::Detector;
use crate::errors_log::ErrorsLog;
use crate::health::HealthChecker;
use crate::pool::{DriverPool, PoolStats};
use crate::rate_limit::RateLimitCoordinator;
use crate::recovery::RecoveryManager;
use crate::registry::AgentRegistry;
use crate::router::NotificationRouter;
use crate::snapshot::RegistrySnapshot;
use crate::strategy::{self, CycleContext, CycleReport, CycleStrategy};
use crate::submitter::{MessageSubmitter, SubmitterStats};
use muster_adapters::{NotifyAdapter, TerminalDriver};
use muster_core::{Clock, MonitorConfig};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Cycles that run at the stretched startup interval.
const WARMUP_CYCLES: u64 = 3;

/// Floor for the stretched startup interval.
const WARMUP_INTERVAL_FLOOR: Duration = Duration::from_secs(30);

/// Snapshot of the monitor for `status()` callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub cycle_count: u64,
    pub strategy: String,
    pub rate_limited: bool,
    pub recovery_enabled: bool,
    pub agents: usize,
    pub pending_recoveries: usize,
    pub queued_notifications: usize,
    pub last_report: Option<CycleReport>,
    pub pool: PoolStats,
    pub cache: CacheStats,
    pub submitter: SubmitterStats,
}

struct LoopState {
    running: bool,
    cycle_count: u64,
    last_report: Option<CycleReport>,
}

pub struct MonitorService<D: TerminalDriver, N: NotifyAdapter, C: Clock> {
    ctx: CycleContext<D, N, C>,
    strategy: Box<dyn CycleStrategy<D, N, C>>,
    config: Arc<MonitorConfig>,
    clock: C,
    state: Mutex<LoopState>,
    shutdown: Notify,
    recovery_enabled: Arc<AtomicBool>,
    snapshot_path: Option<PathBuf>,
}

impl<D: TerminalDriver, N: NotifyAdapter, C: Clock> MonitorService<D, N, C> {
    /// Wire up every subsystem. Restores the registry from the snapshot
    /// when one exists.
    pub fn new(
        factory: impl Fn() -> D + Send + Sync + 'static,
        notify: N,
        config: MonitorConfig,
        clock: C,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        let config = Arc::new(config);
        let pool = DriverPool::new(config.pool.clone(), factory);
        let cache = Arc::new(LayeredCache::new(&config.cache));
        let registry = Arc::new(AgentRegistry::new(
            config.idle_threshold_cycles,
            config.stale_tolerance_cycles,
        ));

        if let Some(path) = snapshot_path.as_deref() {
            match RegistrySnapshot::load(path) {
                Ok(Some(snapshot)) => {
                    tracing::info!(
                        agents = snapshot.agents.len(),
                        saved_at = %snapshot.saved_at,
                        "restored registry snapshot"
                    );
                    registry.restore(snapshot.agents);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "snapshot load failed, starting fresh"),
            }
        }

        let checker = HealthChecker::new(
            pool.clone(),
            Arc::clone(&cache),
            Arc::clone(&registry),
            clock.clone(),
            Arc::clone(&config),
        );
        let submitter = MessageSubmitter::new(
            pool.clone(),
            Arc::clone(&registry),
            Arc::clone(&config),
            clock.clone(),
        );
        let router = Arc::new(NotificationRouter::new(
            submitter.clone(),
            Arc::clone(&registry),
            notify,
            Arc::clone(&config),
            clock.clone(),
        ));
        let recovery = RecoveryManager::new(
            pool.clone(),
            submitter.clone(),
            Arc::clone(&registry),
            Arc::clone(&config),
            clock.clone(),
        );
        let detector = Arc::new(Detector::new(clock.clone(), Arc::clone(&config)));
        let rate_limit = Arc::new(RateLimitCoordinator::new(
            clock.clone(),
            Arc::clone(&registry),
        ));

        let recovery_enabled = Arc::new(AtomicBool::new(true));
        let ctx = CycleContext {
            pool,
            cache,
            registry,
            checker,
            detector,
            router,
            submitter,
            recovery,
            rate_limit,
            recovery_enabled: Arc::clone(&recovery_enabled),
            errors: ErrorsLog::new(),
            clock: clock.clone(),
            config: Arc::clone(&config),
        };

        let strategy = strategy::select(&config);
        tracing::info!(strategy = strategy.name(), "monitor initialized");

        Self {
            ctx,
            strategy,
            config,
            clock,
            state: Mutex::new(LoopState {
                running: false,
                cycle_count: 0,
                last_report: None,
            }),
            shutdown: Notify::new(),
            recovery_enabled,
            snapshot_path,
        }
    }

    /// Run the cycle loop until [`stop`] is called.
    pub async fn run(&self) {
        self.state.lock().running = true;
        tracing::info!(
            interval_secs = self.config.base_interval_seconds,
            "monitor started"
        );

        loop {
            // A rate-limit window preempts everything.
            if let Some(remaining) = self.ctx.rate_limit.remaining() {
                if remaining > Duration::ZERO {
                    tracing::info!(
                        remaining_secs = remaining.as_secs(),
                        "paused for rate-limit window"
                    );
                    tokio::select! {
                        _ = self.shutdown.notified() => break,
                        _ = tokio::time::sleep(remaining) => {}
                    }
                }
                if let Some(event) = self.ctx.rate_limit.try_resume() {
                    self.ctx.router.route_event(&event);
                    self.ctx.router.drain().await;
                }
                continue;
            }

            let cycle_started = tokio::time::Instant::now();
            let report = self.strategy.execute(&self.ctx).await;
            let cycle_count = {
                let mut state = self.state.lock();
                state.cycle_count += 1;
                state.last_report = Some(report.clone());
                state.cycle_count
            };
            tracing::debug!(
                cycle = cycle_count,
                checked = report.agents_checked,
                events = report.events_emitted,
                errors = report.errors,
                "cycle complete"
            );

            self.save_snapshot();
            self.ctx.pool.sweep_once().await;

            let interval = self.cycle_interval(cycle_count);
            let elapsed = cycle_started.elapsed();
            let sleep = interval
                .saturating_sub(elapsed)
                .max(Duration::from_secs(1));

            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = tokio::time::sleep(sleep) => {}
            }
        }

        self.save_snapshot();
        self.state.lock().running = false;
        tracing::info!("monitor stopped");
    }

    /// Request the loop to stop after the current await point.
    pub fn stop(&self) {
        self.shutdown.notify_waiters();
    }

    /// Startup uses stretched intervals so a fresh fleet can initialize
    /// without a command storm.
    fn cycle_interval(&self, cycle_count: u64) -> Duration {
        let base = self.config.base_interval();
        if cycle_count <= WARMUP_CYCLES {
            (base * 3).max(WARMUP_INTERVAL_FLOOR)
        } else {
            base
        }
    }

    fn save_snapshot(&self) {
        let Some(path) = self.snapshot_path.as_deref() else {
            return;
        };
        let snapshot = RegistrySnapshot::new(self.ctx.registry.snapshot_all(), self.clock.now());
        if let Err(e) = snapshot.save(path) {
            tracing::warn!(error = %e, path = %path.display(), "snapshot save failed");
        }
    }

    pub fn status(&self) -> MonitorStatus {
        let state = self.state.lock();
        MonitorStatus {
            running: state.running,
            cycle_count: state.cycle_count,
            strategy: self.strategy.name().to_string(),
            rate_limited: self.ctx.rate_limit.is_active(),
            recovery_enabled: self.recovery_enabled.load(Ordering::Relaxed),
            agents: self.ctx.registry.len(),
            pending_recoveries: self.ctx.recovery.pending_count(),
            queued_notifications: self.ctx.router.queued(),
            last_report: state.last_report.clone(),
            pool: self.ctx.pool.stats(),
            cache: self.ctx.cache.stats(),
            submitter: self.ctx.submitter.stats(),
        }
    }

    pub fn set_recovery_enabled(&self, enabled: bool) {
        self.recovery_enabled.store(enabled, Ordering::Relaxed);
        tracing::info!(enabled, "recovery toggled");
    }

    pub fn recovery_enabled(&self) -> bool {
        self.recovery_enabled.load(Ordering::Relaxed)
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.ctx.registry
    }

    pub fn errors(&self) -> &ErrorsLog {
        &self.ctx.errors
    }

    pub fn checker(&self) -> &HealthChecker<D, C> {
        &self.ctx.checker
    }

    pub fn submitter(&self) -> &MessageSubmitter<D, C> {
        &self.ctx.submitter
    }

    pub fn recovery(&self) -> &RecoveryManager<D, C> {
        &self.ctx.recovery
    }

    pub fn context(&self) -> &CycleContext<D, N, C> {
        &self.ctx
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
