// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health-check and message-submission result types.

use crate::agent::AgentState;
use crate::target::AgentTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one health check against one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub target: AgentTarget,
    pub state: AgentState,
    pub is_responsive: bool,
    pub detected_at: DateTime<Utc>,
    /// Set when the status was served from the agent-status cache rather
    /// than a fresh capture; holds the original detection time.
    #[serde(default)]
    pub cached_from: Option<DateTime<Utc>>,
}

impl HealthStatus {
    pub fn fresh(target: AgentTarget, state: AgentState, detected_at: DateTime<Utc>) -> Self {
        Self {
            target,
            is_responsive: state.is_responsive(),
            state,
            detected_at,
            cached_from: None,
        }
    }
}

/// Outcome of one reliable-submission attempt.
///
/// `DeliveredUnverified` means the Enter was sent but the verification
/// capture could not confirm the payload left the input line; callers treat
/// it as success and the submitter counts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Delivered,
    DeliveredUnverified,
    Failed { reason: String },
}

impl SubmitOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(
            self,
            SubmitOutcome::Delivered | SubmitOutcome::DeliveredUnverified
        )
    }
}
