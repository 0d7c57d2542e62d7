// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limit coordinator.
//!
//! One window at a time: the first `RateLimitWindowBegan` pauses the whole
//! monitoring loop until `reset_at` plus a safety buffer; repeats while the
//! window is open are absorbed. On expiry the coordinator emits the single
//! resume event and clears RateLimited verdicts so the next cycle
//! re-classifies them.

use crate::registry::AgentRegistry;
use chrono::{DateTime, Utc};
use muster_core::{Clock, Event};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Added to the parsed reset time before resuming.
const RESUME_BUFFER: Duration = Duration::from_secs(120);

/// Upper bound on any computed pause.
const MAX_PAUSE: Duration = Duration::from_secs(24 * 60 * 60);

pub struct RateLimitCoordinator<C: Clock> {
    clock: C,
    registry: Arc<AgentRegistry>,
    window_until: Mutex<Option<DateTime<Utc>>>,
}

impl<C: Clock> RateLimitCoordinator<C> {
    pub fn new(clock: C, registry: Arc<AgentRegistry>) -> Self {
        Self {
            clock,
            registry,
            window_until: Mutex::new(None),
        }
    }

    /// Note a `RateLimitWindowBegan`. Returns true when this opened the
    /// window (first observation); false when one is already active.
    pub fn observe_began(&self, reset_at: DateTime<Utc>) -> bool {
        let mut until = self.window_until.lock();
        if until.is_some() {
            return false;
        }
        let now = self.clock.now();
        let buffered = reset_at
            + chrono::Duration::from_std(RESUME_BUFFER).unwrap_or_else(|_| chrono::Duration::zero());
        let capped = now
            + chrono::Duration::from_std(MAX_PAUSE).unwrap_or_else(|_| chrono::Duration::zero());
        *until = Some(buffered.min(capped));
        tracing::warn!(
            reset_at = %reset_at,
            resume_at = %buffered.min(capped),
            "rate-limit window began, pausing monitoring"
        );
        true
    }

    /// Whether the monitoring loop is currently paused.
    pub fn is_active(&self) -> bool {
        let until = self.window_until.lock();
        match *until {
            Some(at) => self.clock.now() < at,
            None => false,
        }
    }

    /// When the window is open, how long the loop should sleep from now.
    pub fn remaining(&self) -> Option<Duration> {
        let until = (*self.window_until.lock())?;
        let now = self.clock.now();
        if now >= until {
            return Some(Duration::ZERO);
        }
        (until - now).to_std().ok().map(|d| d.min(MAX_PAUSE))
    }

    /// Close the window if its time has passed: emits the resume event and
    /// resets RateLimited records for re-classification.
    pub fn try_resume(&self) -> Option<Event> {
        {
            let mut until = self.window_until.lock();
            match *until {
                Some(at) if self.clock.now() >= at => {
                    *until = None;
                }
                _ => return None,
            }
        }
        self.registry.clear_rate_limited();
        tracing::info!("rate-limit window ended, monitoring resumed");
        Some(Event::RateLimitWindowEnded {
            reason: "reset time passed".to_string(),
            observed_at: self.clock.now(),
        })
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
