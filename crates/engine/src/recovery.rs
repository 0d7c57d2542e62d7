// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery manager: kill, respawn, re-brief, grace.
//!
//! A recovered window keeps the dead agent's address so the rest of the
//! fleet can keep talking to the same target. `RecoveryCompleted` with
//! `failed: false` is emitted later, when the health checker first sees
//! the replacement responsive within its grace window.

use crate::briefing::{self, BriefingContext};
use crate::error::EngineError;
use crate::pool::DriverPool;
use crate::registry::AgentRegistry;
use crate::submitter::MessageSubmitter;
use chrono::Duration as ChronoDuration;
use muster_adapters::TerminalDriver;
use muster_core::{AgentRole, AgentState, AgentTarget, Clock, Event, MonitorConfig, SubmitOutcome};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Poll interval while waiting for a respawned REPL's first output.
const INIT_POLL: Duration = Duration::from_secs(1);

pub struct RecoveryManager<D: TerminalDriver, C: Clock> {
    pool: DriverPool<D>,
    submitter: MessageSubmitter<D, C>,
    registry: Arc<AgentRegistry>,
    config: Arc<MonitorConfig>,
    clock: C,
    /// Targets respawned and waiting for their first responsive check.
    pending: Arc<Mutex<HashSet<AgentTarget>>>,
}

impl<D: TerminalDriver, C: Clock> Clone for RecoveryManager<D, C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            submitter: self.submitter.clone(),
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
            clock: self.clock.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<D: TerminalDriver, C: Clock> RecoveryManager<D, C> {
    pub fn new(
        pool: DriverPool<D>,
        submitter: MessageSubmitter<D, C>,
        registry: Arc<AgentRegistry>,
        config: Arc<MonitorConfig>,
        clock: C,
    ) -> Self {
        Self {
            pool,
            submitter,
            registry,
            config,
            clock,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Kill and respawn the agent at `target`, re-brief it, and open a
    /// grace window. Returns the events the attempt produced.
    pub async fn recover(&self, target: &AgentTarget) -> Result<Vec<Event>, EngineError> {
        let role = self
            .registry
            .get(target)
            .map(|r| r.role)
            .unwrap_or(AgentRole::Worker);
        let mut events = vec![Event::RecoveryStarted {
            target: target.clone(),
            reason: format!("respawning {role} agent"),
            observed_at: self.clock.now(),
        }];

        tracing::info!(target = %target, role = %role, "recovering agent");

        let window_name = role.to_string();
        {
            let lease = self.pool.acquire().await?;
            lease.kill_window(target).await?;
            lease
                .respawn_window(
                    target,
                    &window_name,
                    &self.config.workdir,
                    &self.config.agent_command,
                )
                .await?;
        }

        if !self.wait_for_init(target).await {
            tracing::warn!(target = %target, "recovered window produced no output in time");
            events.push(Event::RecoveryCompleted {
                target: target.clone(),
                failed: true,
                reason: format!(
                    "no REPL output within {}s",
                    self.config.init_timeout_seconds
                ),
                observed_at: self.clock.now(),
            });
            return Ok(events);
        }

        // Re-seed the agent with its role briefing.
        let briefing = briefing::render_briefing(
            briefing::for_role(&role),
            &BriefingContext {
                project_name: self.config.project_name.clone(),
                target: target.clone(),
            },
        );
        match self.submitter.submit(target, &briefing, None).await {
            SubmitOutcome::Failed { reason } => {
                events.push(Event::RecoveryCompleted {
                    target: target.clone(),
                    failed: true,
                    reason: format!("briefing submission failed: {reason}"),
                    observed_at: self.clock.now(),
                });
                return Ok(events);
            }
            SubmitOutcome::Delivered | SubmitOutcome::DeliveredUnverified => {}
        }

        let now = self.clock.now();
        self.registry.set_role(target, role);
        self.registry.begin_grace(
            target,
            ChronoDuration::seconds(self.config.grace_period_seconds as i64),
            now,
        );
        self.pending.lock().insert(target.clone());

        Ok(events)
    }

    /// Poll until the respawned REPL renders something, within init_timeout.
    async fn wait_for_init(&self, target: &AgentTarget) -> bool {
        let deadline = tokio::time::Instant::now() + self.config.init_timeout();
        loop {
            let captured = {
                match self.pool.acquire().await {
                    Ok(lease) => lease
                        .capture_pane(target, self.config.capture_lines)
                        .await
                        .ok(),
                    Err(_) => None,
                }
            };
            if let Some(text) = captured {
                if !text.trim().is_empty() {
                    return true;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(INIT_POLL).await;
        }
    }

    /// Called with every fresh classification; completes a pending
    /// recovery when the replacement first looks responsive.
    pub fn note_classification(&self, target: &AgentTarget, state: AgentState) -> Option<Event> {
        match state {
            AgentState::Active | AgentState::Fresh | AgentState::Idle => {
                if self.pending.lock().remove(target) {
                    return Some(Event::RecoveryCompleted {
                        target: target.clone(),
                        failed: false,
                        reason: format!("classified {state} after recovery"),
                        observed_at: self.clock.now(),
                    });
                }
                None
            }
            _ => None,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
