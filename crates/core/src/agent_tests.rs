// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    fresh = { AgentState::Fresh, true },
    active = { AgentState::Active, true },
    idle = { AgentState::Idle, true },
    unsubmitted = { AgentState::UnsubmittedInput, false },
    crashed = { AgentState::Crashed, false },
    rate_limited = { AgentState::RateLimited, false },
    unknown = { AgentState::Unknown, false },
)]
fn responsiveness(state: AgentState, expected: bool) {
    assert_eq!(state.is_responsive(), expected);
}

#[test]
fn state_serializes_snake_case() {
    let json = serde_json::to_string(&AgentState::UnsubmittedInput).unwrap();
    assert_eq!(json, "\"unsubmitted_input\"");
}

#[test]
fn role_parent_chain() {
    assert_eq!(AgentRole::Worker.parent(), Some(AgentRole::ProjectManager));
    assert_eq!(AgentRole::Qa.parent(), Some(AgentRole::ProjectManager));
    assert_eq!(
        AgentRole::ProjectManager.parent(),
        Some(AgentRole::Orchestrator)
    );
    assert_eq!(AgentRole::Orchestrator.parent(), None);
}

#[test]
fn custom_role_displays_its_name() {
    assert_eq!(AgentRole::Custom("reviewer".into()).to_string(), "reviewer");
}
