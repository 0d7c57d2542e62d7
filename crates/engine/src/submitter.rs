// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reliable message submission into a terminal-hosted REPL.
//!
//! The REPL stages typed text before committing it; sending Enter too early
//! drops the submit, and some key sequences (notably End) emit escape
//! garbage. The sequence here is deliberate: abort prior input, clear the
//! line, type the payload literally, wait for the REPL to stage it, then
//! plain Enter, then verify from a fresh capture and retry with a doubled
//! delay if the payload is still sitting in the input frame.

use crate::classifier;
use crate::pool::DriverPool;
use crate::registry::AgentRegistry;
use muster_adapters::{Key, TerminalDriver};
use muster_core::{AgentTarget, Clock, MonitorConfig, SubmitOutcome};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Delivery counters exposed via monitor status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitterStats {
    pub delivered: u64,
    pub unverified: u64,
    pub failed: u64,
}

pub struct MessageSubmitter<D: TerminalDriver, C: Clock> {
    pool: DriverPool<D>,
    registry: Arc<AgentRegistry>,
    config: Arc<MonitorConfig>,
    clock: C,
    delivered: Arc<AtomicU64>,
    unverified: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl<D: TerminalDriver, C: Clock> Clone for MessageSubmitter<D, C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
            clock: self.clock.clone(),
            delivered: Arc::clone(&self.delivered),
            unverified: Arc::clone(&self.unverified),
            failed: Arc::clone(&self.failed),
        }
    }
}

impl<D: TerminalDriver, C: Clock> MessageSubmitter<D, C> {
    pub fn new(
        pool: DriverPool<D>,
        registry: Arc<AgentRegistry>,
        config: Arc<MonitorConfig>,
        clock: C,
    ) -> Self {
        Self {
            pool,
            registry,
            config,
            clock,
            delivered: Arc::new(AtomicU64::new(0)),
            unverified: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Submit `text` to the target's REPL. `delay_hint` lets callers scale
    /// the staging wait for slow panes; the floor always applies.
    pub async fn submit(
        &self,
        target: &AgentTarget,
        text: &str,
        delay_hint: Option<Duration>,
    ) -> SubmitOutcome {
        if text.is_empty() {
            return SubmitOutcome::Delivered;
        }

        let outcome = self.submit_inner(target, text, delay_hint).await;

        self.registry.record_submission(target, self.clock.now());
        match &outcome {
            SubmitOutcome::Delivered => self.delivered.fetch_add(1, Ordering::Relaxed),
            SubmitOutcome::DeliveredUnverified => self.unverified.fetch_add(1, Ordering::Relaxed),
            SubmitOutcome::Failed { .. } => self.failed.fetch_add(1, Ordering::Relaxed),
        };
        outcome
    }

    async fn submit_inner(
        &self,
        target: &AgentTarget,
        text: &str,
        delay_hint: Option<Duration>,
    ) -> SubmitOutcome {
        let lease = match self.pool.acquire().await {
            Ok(lease) => lease,
            Err(e) => return failed(format!("pool: {e}")),
        };

        // Abort any prior input, then clear the line.
        if let Err(e) = lease.send_key(target, Key::CtrlC).await {
            return failed(format!("ctrl-c: {e}"));
        }
        if let Err(e) = lease.send_key(target, Key::CtrlU).await {
            return failed(format!("ctrl-u: {e}"));
        }
        if let Err(e) = lease.send_keys_literal(target, text).await {
            return failed(format!("literal send: {e}"));
        }

        let mut stage_delay = self.stage_delay(delay_hint);
        let max_retries = self.config.submit.max_retries;

        for attempt in 0..=max_retries {
            // Let the REPL stage the typed text before committing. The
            // floor is load-bearing; shortening it reintroduces dropped
            // submits.
            tokio::time::sleep(stage_delay).await;

            // Plain Enter. Never a modified Enter, never the End key.
            if let Err(e) = lease.send_key(target, Key::Enter).await {
                return failed(format!("enter: {e}"));
            }

            match lease
                .capture_pane(target, self.config.capture_lines)
                .await
            {
                Ok(pane) => {
                    if payload_still_drafted(&pane, text) {
                        tracing::debug!(
                            target = %target,
                            attempt,
                            delay_ms = stage_delay.as_millis() as u64,
                            "payload still in input frame, retrying submit"
                        );
                        stage_delay *= 2;
                        continue;
                    }
                    return SubmitOutcome::Delivered;
                }
                Err(e) => {
                    // Enter went out; only the confirmation is missing.
                    tracing::warn!(target = %target, error = %e, "verification capture failed");
                    return SubmitOutcome::DeliveredUnverified;
                }
            }
        }

        failed("payload never left the input frame".to_string())
    }

    fn stage_delay(&self, delay_hint: Option<Duration>) -> Duration {
        let floor = Duration::from_millis(self.config.submit.min_stage_delay_ms);
        match delay_hint {
            Some(hint) => floor.max(hint * self.config.submit.hint_multiplier),
            None => floor,
        }
    }

    pub fn stats(&self) -> SubmitterStats {
        SubmitterStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            unverified: self.unverified.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

fn failed(reason: String) -> SubmitOutcome {
    SubmitOutcome::Failed { reason }
}

/// Whether the submitted payload still shows as typed-but-uncommitted
/// draft input in the captured pane.
fn payload_still_drafted(pane: &str, text: &str) -> bool {
    let probe: String = text.chars().take(32).collect();
    classifier::draft_input(pane).is_some_and(|draft| draft.contains(probe.trim()))
}

#[cfg(test)]
#[path = "submitter_tests.rs"]
mod tests;
