// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health checker: pane capture, classification, record update.
//!
//! Per target, at most one check is in flight at a time (single-flight);
//! concurrent callers wait and then read the agent-status cache. Across
//! targets, `check_many` fans out under a bounded semaphore and returns
//! results in input order.

use crate::cache::LayeredCache;
use crate::classifier;
use crate::error::EngineError;
use crate::pool::DriverPool;
use crate::registry::AgentRegistry;
use chrono::{DateTime, Utc};
use muster_adapters::TerminalDriver;
use muster_core::{AgentRole, AgentState, AgentTarget, Clock, HealthStatus, MonitorConfig};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Immutable capture of one pane at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneSnapshot {
    pub target: AgentTarget,
    pub captured_at: DateTime<Utc>,
    pub text: String,
    /// Hex sha256 of `text`.
    pub fingerprint: String,
}

/// Content fingerprint used for idle detection.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

pub struct HealthChecker<D: TerminalDriver, C: Clock> {
    pool: DriverPool<D>,
    cache: Arc<LayeredCache>,
    registry: Arc<AgentRegistry>,
    clock: C,
    config: Arc<MonitorConfig>,
    flights: Arc<Mutex<HashMap<AgentTarget, Arc<tokio::sync::Mutex<()>>>>>,
    in_flight: Arc<Semaphore>,
}

impl<D: TerminalDriver, C: Clock> Clone for HealthChecker<D, C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            cache: Arc::clone(&self.cache),
            registry: Arc::clone(&self.registry),
            clock: self.clock.clone(),
            config: Arc::clone(&self.config),
            flights: Arc::clone(&self.flights),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<D: TerminalDriver, C: Clock> HealthChecker<D, C> {
    pub fn new(
        pool: DriverPool<D>,
        cache: Arc<LayeredCache>,
        registry: Arc<AgentRegistry>,
        clock: C,
        config: Arc<MonitorConfig>,
    ) -> Self {
        let max_in_flight = config.max_in_flight.max(1);
        Self {
            pool,
            cache,
            registry,
            clock,
            config,
            flights: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
        }
    }

    /// Check one target, preferring the agent-status cache.
    pub async fn check(&self, target: &AgentTarget) -> Result<HealthStatus, EngineError> {
        let key = target.to_string();

        if let Some(cached) = self.cache.agent_status.get(&key) {
            return Ok(HealthStatus {
                cached_from: Some(cached.detected_at),
                ..cached
            });
        }

        // Single-flight: one live check per target; later callers queue
        // here and then hit the cache the first one filled.
        let flight = {
            let mut flights = self.flights.lock();
            Arc::clone(flights.entry(target.clone()).or_default())
        };
        let _guard = flight.lock().await;

        if let Some(cached) = self.cache.agent_status.get(&key) {
            return Ok(HealthStatus {
                cached_from: Some(cached.detected_at),
                ..cached
            });
        }

        let result = self.check_uncached(target).await;

        {
            let mut flights = self.flights.lock();
            if Arc::strong_count(&flight) <= 2 {
                flights.remove(target);
            }
        }

        result
    }

    async fn check_uncached(&self, target: &AgentTarget) -> Result<HealthStatus, EngineError> {
        let key = target.to_string();
        let now = self.clock.now();

        let snapshot = {
            let pool = self.pool.clone();
            let capture_lines = self.config.capture_lines;
            let target = target.clone();
            self.cache
                .pane_content
                .get_or_compute(&key, || async move {
                    let lease = pool.acquire().await.map_err(EngineError::Pool)?;
                    let text = lease
                        .capture_pane(&target, capture_lines)
                        .await
                        .map_err(EngineError::Terminal)?;
                    Ok::<_, EngineError>(PaneSnapshot {
                        fingerprint: fingerprint(&text),
                        target,
                        captured_at: now,
                        text,
                    })
                })
                .await
        };

        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(target = %target, error = %e, "pane capture failed");
                return Err(e);
            }
        };

        let classification =
            classifier::classify_with(&snapshot.text, &self.config.agent_command);

        // Direct checks can race discovery; make sure a record exists for
        // the window we just captured.
        if self.registry.get(target).is_none() {
            self.registry
                .insert_spawned(target.clone(), AgentRole::Worker, now);
        }

        let reset_at = classification.reset_at.map(|spec| spec.resolve(now));
        let record = self
            .registry
            .apply_classification_with_reset(
                target,
                classification.state,
                &snapshot.fingerprint,
                reset_at,
                now,
            )
            .ok_or_else(|| EngineError::NotFound(key.clone()))?;

        let status = HealthStatus::fresh(target.clone(), record.state, now);
        self.cache.agent_status.set(&key, status.clone());
        Ok(status)
    }

    /// Check many targets under the in-flight bound, results in input order.
    ///
    /// Per-target failures are isolated: the failed slot carries the error,
    /// the cycle continues.
    pub async fn check_many(
        &self,
        targets: impl IntoIterator<Item = AgentTarget>,
    ) -> Vec<(AgentTarget, Result<HealthStatus, EngineError>)> {
        let mut handles = Vec::new();
        for target in targets {
            let checker = self.clone();
            handles.push((
                target.clone(),
                tokio::spawn(async move {
                    let _permit = checker.in_flight.acquire().await.ok();
                    checker.check(&target).await
                }),
            ));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (target, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(EngineError::InvalidRequest(format!(
                    "health check task failed: {e}"
                ))),
            };
            results.push((target, result));
        }
        results
    }

    /// Classify a target as Unknown without touching its record. Used when
    /// capture fails but the caller still needs a status row.
    pub fn unknown_status(&self, target: &AgentTarget) -> HealthStatus {
        HealthStatus::fresh(target.clone(), AgentState::Unknown, self.clock.now())
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
