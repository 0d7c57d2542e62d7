// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable cycle strategies.
//!
//! A strategy decides how one monitoring cycle fans out health checks;
//! everything else (discovery, event handling, notification drain) is
//! shared [`CycleContext`] plumbing so the concurrent and polling
//! executors differ only in their fan-out.

use crate::cache::LayeredCache;
use crate::detector::Detector;
use crate::errors_log::ErrorsLog;
use crate::health::HealthChecker;
use crate::pool::DriverPool;
use crate::rate_limit::RateLimitCoordinator;
use crate::recovery::RecoveryManager;
use crate::registry::AgentRegistry;
use crate::router::NotificationRouter;
use crate::submitter::MessageSubmitter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use muster_adapters::{NotifyAdapter, TerminalDriver};
use muster_core::{AgentState, AgentTarget, Clock, Event, MonitorConfig};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of one monitoring cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: String,
    pub strategy: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub agents_checked: usize,
    pub events_emitted: usize,
    pub errors: usize,
}

/// Everything a strategy needs to run one cycle.
pub struct CycleContext<D: TerminalDriver, N: NotifyAdapter, C: Clock> {
    pub pool: DriverPool<D>,
    pub cache: Arc<LayeredCache>,
    pub registry: Arc<AgentRegistry>,
    pub checker: HealthChecker<D, C>,
    pub detector: Arc<Detector<C>>,
    pub router: Arc<NotificationRouter<D, N, C>>,
    pub submitter: MessageSubmitter<D, C>,
    pub recovery: RecoveryManager<D, C>,
    pub rate_limit: Arc<RateLimitCoordinator<C>>,
    pub recovery_enabled: Arc<AtomicBool>,
    pub errors: ErrorsLog,
    pub clock: C,
    pub config: Arc<MonitorConfig>,
}

impl<D: TerminalDriver, N: NotifyAdapter, C: Clock> CycleContext<D, N, C> {
    /// List sessions and windows, reconcile the registry, and return the
    /// targets to check this cycle.
    pub async fn discover(&self) -> Result<Vec<AgentTarget>, crate::error::EngineError> {
        let lease = self.pool.acquire().await?;
        let sessions = lease.list_sessions().await?;

        let mut windows = Vec::new();
        for session in sessions {
            let listing = self
                .cache
                .session_info
                .get_or_compute(&session, || async {
                    lease.list_windows(&session).await
                })
                .await;
            match listing {
                Ok(listing) => {
                    for window in listing {
                        if let Ok(target) = AgentTarget::new(&session, window.index) {
                            windows.push((target, window.name));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(session, error = %e, "window listing failed");
                    self.errors
                        .record(None, "discovery", &e.to_string(), self.clock.now());
                }
            }
        }
        drop(lease);

        let delta = self.registry.upsert_from_discovery(windows, self.clock.now());
        for target in &delta.added {
            tracing::info!(target = %target, "discovered new agent window");
        }
        for target in &delta.removed {
            tracing::info!(target = %target, "agent window disappeared, record dropped");
        }

        Ok(self
            .registry
            .snapshot_all()
            .into_iter()
            .map(|r| r.target)
            .collect())
    }

    /// Derive events from one check result, including pending-recovery
    /// completion.
    pub fn events_for(&self, target: &AgentTarget, state: AgentState) -> Vec<Event> {
        let mut events = Vec::new();
        if let Some(completed) = self.recovery.note_classification(target, state) {
            events.push(completed);
        }
        if let Some(record) = self.registry.get(target) {
            events.extend(self.detector.detect(&record));
        }
        events
    }

    /// Drain events in emission order: route notifications, open rate-limit
    /// windows, kick off recoveries.
    pub async fn handle_events(&self, events: Vec<Event>) -> usize {
        let mut handled = 0;
        for event in events {
            handled += 1;
            match &event {
                Event::RateLimitWindowBegan { reset_at, .. } => {
                    // Only the observation that opens the window notifies.
                    if self.rate_limit.observe_began(*reset_at) {
                        self.router.route_event(&event);
                    }
                }
                Event::AgentCrashed { target, .. } => {
                    self.router.route_event(&event);
                    if !self.recovery_enabled.load(Ordering::Relaxed) {
                        tracing::info!(target = %target, "recovery disabled, crash not repaired");
                        continue;
                    }
                    match self.recovery.recover(target).await {
                        Ok(recovery_events) => {
                            for recovery_event in recovery_events {
                                self.router.route_event(&recovery_event);
                            }
                        }
                        Err(e) => {
                            tracing::error!(target = %target, error = %e, "recovery failed");
                            self.errors.record(
                                Some(target.clone()),
                                "recovery",
                                &e.to_string(),
                                self.clock.now(),
                            );
                        }
                    }
                }
                _ => {
                    self.router.route_event(&event);
                }
            }
        }
        handled
    }

    fn new_report(&self, strategy: &str, started_at: DateTime<Utc>) -> CycleReport {
        CycleReport {
            cycle_id: uuid::Uuid::new_v4().to_string(),
            strategy: strategy.to_string(),
            started_at,
            finished_at: started_at,
            agents_checked: 0,
            events_emitted: 0,
            errors: 0,
        }
    }
}

/// One monitoring-cycle executor.
#[async_trait]
pub trait CycleStrategy<D: TerminalDriver, N: NotifyAdapter, C: Clock>: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, ctx: &CycleContext<D, N, C>) -> CycleReport;
}

/// Fan-out executor: bounded-concurrency `check_many`, then a sequential
/// event drain.
pub struct ConcurrentStrategy;

#[async_trait]
impl<D: TerminalDriver, N: NotifyAdapter, C: Clock> CycleStrategy<D, N, C> for ConcurrentStrategy {
    fn name(&self) -> &'static str {
        "concurrent"
    }

    async fn execute(&self, ctx: &CycleContext<D, N, C>) -> CycleReport {
        let started_at = ctx.clock.now();
        let mut report = ctx.new_report(<Self as CycleStrategy<D, N, C>>::name(self), started_at);

        let targets = match ctx.discover().await {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(error = %e, "discovery failed, skipping cycle");
                ctx.errors.record(None, "discovery", &e.to_string(), started_at);
                report.errors = 1;
                report.finished_at = ctx.clock.now();
                return report;
            }
        };

        let mut events = Vec::new();
        for (target, result) in ctx.checker.check_many(targets).await {
            report.agents_checked += 1;
            match result {
                Ok(status) => events.extend(ctx.events_for(&target, status.state)),
                Err(e) => {
                    report.errors += 1;
                    ctx.errors
                        .record(Some(target), "health", &e.to_string(), ctx.clock.now());
                }
            }
        }

        report.events_emitted = ctx.handle_events(events).await;
        ctx.router.drain().await;
        report.finished_at = ctx.clock.now();
        report
    }
}

/// Serial executor for debugging and constrained environments.
pub struct PollingStrategy;

#[async_trait]
impl<D: TerminalDriver, N: NotifyAdapter, C: Clock> CycleStrategy<D, N, C> for PollingStrategy {
    fn name(&self) -> &'static str {
        "polling"
    }

    async fn execute(&self, ctx: &CycleContext<D, N, C>) -> CycleReport {
        let started_at = ctx.clock.now();
        let mut report = ctx.new_report(<Self as CycleStrategy<D, N, C>>::name(self), started_at);

        let targets = match ctx.discover().await {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(error = %e, "discovery failed, skipping cycle");
                ctx.errors.record(None, "discovery", &e.to_string(), started_at);
                report.errors = 1;
                report.finished_at = ctx.clock.now();
                return report;
            }
        };

        let mut events = Vec::new();
        for target in targets {
            report.agents_checked += 1;
            match ctx.checker.check(&target).await {
                Ok(status) => events.extend(ctx.events_for(&target, status.state)),
                Err(e) => {
                    report.errors += 1;
                    ctx.errors
                        .record(Some(target), "health", &e.to_string(), ctx.clock.now());
                }
            }
        }

        report.events_emitted = ctx.handle_events(events).await;
        ctx.router.drain().await;
        report.finished_at = ctx.clock.now();
        report
    }
}

/// The strategy selected by configuration. Strategies are fixed at startup;
/// `async_enabled` flips between the two built-ins.
pub fn select<D: TerminalDriver, N: NotifyAdapter, C: Clock>(
    config: &MonitorConfig,
) -> Box<dyn CycleStrategy<D, N, C>> {
    if config.async_enabled {
        Box::new(ConcurrentStrategy)
    } else {
        Box::new(PollingStrategy)
    }
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;
