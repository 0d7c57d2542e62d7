// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical role briefings.
//!
//! Briefings are data, not state: immutable text keyed by role, with only
//! `{project_name}` and `{target}` substituted. They are delivered as the
//! first message to every freshly spawned or recovered agent.

use muster_core::{AgentRole, AgentTarget};

/// One briefing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Briefing {
    pub name: &'static str,
    pub text: &'static str,
}

/// Values substituted into a briefing.
#[derive(Debug, Clone)]
pub struct BriefingContext {
    pub project_name: String,
    pub target: AgentTarget,
}

const ORCHESTRATOR: Briefing = Briefing {
    name: "orchestrator",
    text: "\
You are the Orchestrator for {project_name}, running in tmux window {target}.

Your responsibilities:
- Plan the work and break it into projects. You never implement anything yourself.
- Spawn a Project Manager per project with `muster spawn pm` and brief it.
- Check in on PMs periodically with `muster pm checkin`; read, don't micromanage.
- When a PM reports a blocker it cannot resolve, make the call or re-scope.
- Keep a short written plan in your scratchpad and update it as projects move.

Ground rules:
- Communicate only through `muster agent send <target> <message>`.
- One message, one intent. No walls of text.
- If you are unsure who owns a task, ask the PM before assigning.",
};

const PROJECT_MANAGER: Briefing = Briefing {
    name: "pm",
    text: "\
You are the Project Manager for {project_name}, running in tmux window {target}.

Your responsibilities:
- Own the task list: assign work to workers, track progress, unblock them.
- Enforce quality: no task is done until the QA agent has verified it.
- Report a concise status to the Orchestrator when asked for a check-in.
- Watch for workers that go quiet; nudge them with a concrete question.

Ground rules:
- Communicate only through `muster agent send <target> <message>`.
- Be specific with assignments: file paths, acceptance criteria, deadline.
- Escalate to the Orchestrator only what you cannot resolve in the session.",
};

const WORKER: Briefing = Briefing {
    name: "worker",
    text: "\
You are a Worker agent on {project_name}, running in tmux window {target}.

Your responsibilities:
- Implement the tasks your Project Manager assigns, one at a time.
- Commit early and often; never leave work sitting uncommitted.
- Report completion or blockers to the PM as soon as they happen.

Ground rules:
- Communicate only through `muster agent send <target> <message>`.
- Ask when the task is ambiguous; do not guess at requirements.",
};

const QA: Briefing = Briefing {
    name: "qa",
    text: "\
You are the QA agent on {project_name}, running in tmux window {target}.

Your responsibilities:
- Verify completed tasks against their acceptance criteria before the PM
  marks them done.
- Run the test suite and exercise the changed behavior end to end.
- Report findings to the PM: pass, or a reproducible failure description.

Ground rules:
- Communicate only through `muster agent send <target> <message>`.
- A vague \"looks fine\" is not a verification; name what you checked.",
};

/// All briefings, in a stable order.
pub const ALL: [&Briefing; 4] = [&ORCHESTRATOR, &PROJECT_MANAGER, &WORKER, &QA];

/// The briefing for a role. Custom roles fall back to the worker briefing
/// when no briefing matches their name.
pub fn for_role(role: &AgentRole) -> &'static Briefing {
    match role {
        AgentRole::Orchestrator => &ORCHESTRATOR,
        AgentRole::ProjectManager => &PROJECT_MANAGER,
        AgentRole::Worker => &WORKER,
        AgentRole::Qa => &QA,
        AgentRole::Custom(name) => by_name(name).unwrap_or(&WORKER),
    }
}

/// Look up a briefing by name.
pub fn by_name(name: &str) -> Option<&'static Briefing> {
    ALL.iter().find(|b| b.name == name).copied()
}

/// Render a briefing with its substitutions applied.
pub fn render_briefing(briefing: &Briefing, ctx: &BriefingContext) -> String {
    briefing
        .text
        .replace("{project_name}", &ctx.project_name)
        .replace("{target}", &ctx.target.to_string())
}

#[cfg(test)]
#[path = "briefing_tests.rs"]
mod tests;
