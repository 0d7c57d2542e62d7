// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent state and role types.
//!
//! `AgentState` is the classifier's verdict about one pane. Exactly one
//! variant holds at a time; transitions are driven only by the health
//! checker and detector, never by external callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Liveness state of an agent as detected from its pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Freshly spawned: welcome banner visible, no work yet
    Fresh,
    /// Agent is actively working (pane content changing)
    Active,
    /// Pane content unchanged for several consecutive cycles
    Idle,
    /// Typed input sitting in the REPL frame, never committed
    UnsubmittedInput,
    /// The REPL process is gone; a shell prompt owns the pane
    Crashed,
    /// Upstream rate limit reached; waiting for the reset window
    RateLimited,
    /// Classification could not run (empty capture or error)
    Unknown,
}

impl AgentState {
    /// States in which the agent is considered able to accept input.
    pub fn is_responsive(&self) -> bool {
        matches!(
            self,
            AgentState::Fresh | AgentState::Active | AgentState::Idle
        )
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentState::Fresh => write!(f, "fresh"),
            AgentState::Active => write!(f, "active"),
            AgentState::Idle => write!(f, "idle"),
            AgentState::UnsubmittedInput => write!(f, "unsubmitted input"),
            AgentState::Crashed => write!(f, "crashed"),
            AgentState::RateLimited => write!(f, "rate limited"),
            AgentState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Role an agent plays in the fleet hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Top-level planner; spawns project managers, never implements
    Orchestrator,
    /// Supervises workers within one project session
    ProjectManager,
    /// Implements tasks
    Worker,
    /// Reviews and verifies worker output
    Qa,
    /// Site-specific role with a caller-provided briefing name
    Custom(String),
}

impl AgentRole {
    /// The role notified when an agent of this role fails.
    ///
    /// Workers and QA report to the project manager; PMs report to the
    /// orchestrator. The orchestrator has no parent.
    pub fn parent(&self) -> Option<AgentRole> {
        match self {
            AgentRole::Orchestrator => None,
            AgentRole::ProjectManager => Some(AgentRole::Orchestrator),
            AgentRole::Worker | AgentRole::Qa | AgentRole::Custom(_) => {
                Some(AgentRole::ProjectManager)
            }
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::Orchestrator => write!(f, "orchestrator"),
            AgentRole::ProjectManager => write!(f, "pm"),
            AgentRole::Worker => write!(f, "worker"),
            AgentRole::Qa => write!(f, "qa"),
            AgentRole::Custom(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
