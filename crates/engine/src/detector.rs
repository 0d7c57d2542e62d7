// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash/idle detector: turns updated records into events.
//!
//! The detector applies the grace and sustained-observation policies;
//! cooldown dedup is the router's job, so detectors may emit the same
//! finding on consecutive cycles.

use chrono::Utc;
use muster_core::{AgentRecord, AgentState, Clock, Event, MonitorConfig};
use std::sync::Arc;

pub struct Detector<C: Clock> {
    clock: C,
    config: Arc<MonitorConfig>,
}

impl<C: Clock> Detector<C> {
    pub fn new(clock: C, config: Arc<MonitorConfig>) -> Self {
        Self { clock, config }
    }

    /// Derive events from one freshly-updated record.
    pub fn detect(&self, record: &AgentRecord) -> Vec<Event> {
        let now = self.clock.now();
        let mut events = Vec::new();

        match record.state {
            AgentState::Crashed => {
                if record.in_grace(now) {
                    tracing::debug!(target = %record.target, "crash within grace, suppressed");
                } else {
                    events.push(Event::AgentCrashed {
                        target: record.target.clone(),
                        reason: "pane classified as crashed".to_string(),
                        observed_at: now,
                    });
                }
            }
            AgentState::Idle => {
                if record.consecutive_idle_cycles >= self.config.idle_notify_threshold_cycles {
                    events.push(Event::AgentIdle {
                        target: record.target.clone(),
                        reason: format!(
                            "pane unchanged for {} cycles",
                            record.consecutive_idle_cycles
                        ),
                        observed_at: now,
                    });
                }
            }
            AgentState::UnsubmittedInput => {
                if record.unsubmitted_cycles >= self.config.unsubmitted_threshold_cycles {
                    events.push(Event::UnsubmittedInputDetected {
                        target: record.target.clone(),
                        reason: format!(
                            "typed input uncommitted for {} cycles",
                            record.unsubmitted_cycles
                        ),
                        observed_at: now,
                    });
                }
            }
            AgentState::RateLimited => {
                events.push(Event::AgentRateLimited {
                    target: record.target.clone(),
                    reason: "usage limit reached".to_string(),
                    observed_at: now,
                });
                let reset_at = record
                    .rate_limit_reset_at
                    .unwrap_or_else(|| now + chrono::Duration::hours(1));
                events.push(Event::RateLimitWindowBegan {
                    target: Some(record.target.clone()),
                    reset_at,
                    reason: "usage limit reached".to_string(),
                    observed_at: now,
                });
            }
            AgentState::Fresh | AgentState::Active | AgentState::Unknown => {}
        }

        events
    }

    /// Derive events for a full cycle of records, preserving record order.
    pub fn detect_all<'a>(
        &self,
        records: impl IntoIterator<Item = &'a AgentRecord>,
    ) -> Vec<Event> {
        records
            .into_iter()
            .flat_map(|record| self.detect(record))
            .collect()
    }

    pub fn now(&self) -> chrono::DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
