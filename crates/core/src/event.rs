// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events emitted by the detector and recovery manager.
//!
//! Serializes with `{"type": "agent:crashed", ...fields}` format, matching
//! the daemon IPC protocol and the registry snapshot.

use crate::target::AgentTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State-change events flowing from detection to notification and recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "agent:crashed")]
    AgentCrashed {
        target: AgentTarget,
        reason: String,
        observed_at: DateTime<Utc>,
    },

    #[serde(rename = "agent:idle")]
    AgentIdle {
        target: AgentTarget,
        reason: String,
        observed_at: DateTime<Utc>,
    },

    #[serde(rename = "agent:rate_limited")]
    AgentRateLimited {
        target: AgentTarget,
        reason: String,
        observed_at: DateTime<Utc>,
    },

    #[serde(rename = "agent:unsubmitted_input")]
    UnsubmittedInputDetected {
        target: AgentTarget,
        reason: String,
        observed_at: DateTime<Utc>,
    },

    #[serde(rename = "recovery:started")]
    RecoveryStarted {
        target: AgentTarget,
        reason: String,
        observed_at: DateTime<Utc>,
    },

    #[serde(rename = "recovery:completed")]
    RecoveryCompleted {
        target: AgentTarget,
        #[serde(default)]
        failed: bool,
        reason: String,
        observed_at: DateTime<Utc>,
    },

    /// Monitoring is paused fleet-wide until `reset_at` (+ buffer).
    #[serde(rename = "rate_limit:window_began")]
    RateLimitWindowBegan {
        #[serde(default)]
        target: Option<AgentTarget>,
        reset_at: DateTime<Utc>,
        reason: String,
        observed_at: DateTime<Utc>,
    },

    #[serde(rename = "rate_limit:window_ended")]
    RateLimitWindowEnded {
        reason: String,
        observed_at: DateTime<Utc>,
    },
}

impl Event {
    /// The target the event is about, if any.
    pub fn target(&self) -> Option<&AgentTarget> {
        match self {
            Event::AgentCrashed { target, .. }
            | Event::AgentIdle { target, .. }
            | Event::AgentRateLimited { target, .. }
            | Event::UnsubmittedInputDetected { target, .. }
            | Event::RecoveryStarted { target, .. }
            | Event::RecoveryCompleted { target, .. } => Some(target),
            Event::RateLimitWindowBegan { target, .. } => target.as_ref(),
            Event::RateLimitWindowEnded { .. } => None,
        }
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        match self {
            Event::AgentCrashed { observed_at, .. }
            | Event::AgentIdle { observed_at, .. }
            | Event::AgentRateLimited { observed_at, .. }
            | Event::UnsubmittedInputDetected { observed_at, .. }
            | Event::RecoveryStarted { observed_at, .. }
            | Event::RecoveryCompleted { observed_at, .. }
            | Event::RateLimitWindowBegan { observed_at, .. }
            | Event::RateLimitWindowEnded { observed_at, .. } => *observed_at,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
