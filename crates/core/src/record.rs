// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent bookkeeping record.
//!
//! One record per discovered window, owned by the registry. All mutation
//! goes through the registry; everything else works on value snapshots.

use crate::agent::{AgentRole, AgentState};
use crate::target::AgentTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the monitor tracks about one agent.
///
/// Serialized into the registry snapshot; unknown fields from newer
/// versions are ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub target: AgentTarget,
    pub role: AgentRole,
    pub state: AgentState,
    pub spawned_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Hex sha256 of the last captured pane text.
    #[serde(default)]
    pub last_content_fingerprint: Option<String>,
    #[serde(default)]
    pub consecutive_idle_cycles: u32,
    #[serde(default)]
    pub submission_attempts: u32,
    #[serde(default)]
    pub last_submission_at: Option<DateTime<Utc>>,
    /// Crash detection is suppressed until this instant (spawn warm-up).
    #[serde(default)]
    pub grace_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub last_error_at: Option<DateTime<Utc>>,
    /// Consecutive discovery cycles in which the window was absent.
    /// Records are dropped once this reaches the staleness tolerance.
    #[serde(default)]
    pub missed_discoveries: u32,
    /// Cycles for which unsubmitted input has been continuously visible.
    #[serde(default)]
    pub unsubmitted_cycles: u32,
    /// Parsed reset time while the agent is rate limited.
    #[serde(default)]
    pub rate_limit_reset_at: Option<DateTime<Utc>>,
}

impl AgentRecord {
    pub fn new(target: AgentTarget, role: AgentRole, now: DateTime<Utc>) -> Self {
        Self {
            target,
            role,
            state: AgentState::Unknown,
            spawned_at: now,
            last_seen_at: now,
            last_activity_at: now,
            last_content_fingerprint: None,
            consecutive_idle_cycles: 0,
            submission_attempts: 0,
            last_submission_at: None,
            grace_until: None,
            error_count: 0,
            last_error_at: None,
            missed_discoveries: 0,
            unsubmitted_cycles: 0,
            rate_limit_reset_at: None,
        }
    }

    /// Whether the post-spawn grace window is still open.
    pub fn in_grace(&self, now: DateTime<Utc>) -> bool {
        self.grace_until.is_some_and(|until| now < until)
    }

    pub fn note_error(&mut self, now: DateTime<Utc>) {
        self.error_count += 1;
        self.last_error_at = Some(now);
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
