// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct tmux-side operations for commands that work without the daemon:
//! spawning, briefing, fleet listing, and one-off submissions.

use super::{CmdResult, CommandError};
use muster_adapters::{TerminalDriver, TmuxDriver};
use muster_core::{
    AgentRole, AgentTarget, MonitorConfig, SubmitOutcome, SystemClock,
};
use muster_engine::briefing::{self, BriefingContext};
use muster_engine::{classifier, AgentRegistry, DriverPool, MessageSubmitter};
use serde_json::{json, Value};
use std::sync::Arc;

/// Ad-hoc engine components over a fresh tmux driver pool.
pub struct DirectOps {
    pub config: Arc<MonitorConfig>,
    pub pool: DriverPool<TmuxDriver>,
    pub registry: Arc<AgentRegistry>,
    pub submitter: MessageSubmitter<TmuxDriver, SystemClock>,
}

impl Default for DirectOps {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectOps {
    pub fn new() -> Self {
        let config = Arc::new(MonitorConfig::default());
        let pool = DriverPool::new(config.pool.clone(), TmuxDriver::new);
        let registry = Arc::new(AgentRegistry::new(
            config.idle_threshold_cycles,
            config.stale_tolerance_cycles,
        ));
        let submitter = MessageSubmitter::new(
            pool.clone(),
            Arc::clone(&registry),
            Arc::clone(&config),
            SystemClock,
        );
        Self {
            config,
            pool,
            registry,
            submitter,
        }
    }

    /// All windows across sessions as `(target, window_name)`.
    pub async fn list_fleet(&self) -> Result<Vec<(AgentTarget, String)>, CommandError> {
        let lease = self.pool.acquire().await.map_err(map_engine)?;
        let mut fleet = Vec::new();
        for session in lease.list_sessions().await? {
            for window in lease.list_windows(&session).await? {
                if let Ok(target) = AgentTarget::new(&session, window.index) {
                    fleet.push((target, window.name));
                }
            }
        }
        Ok(fleet)
    }

    /// Capture and classify one pane.
    pub async fn classify_target(&self, target: &AgentTarget) -> Result<String, CommandError> {
        let lease = self.pool.acquire().await.map_err(map_engine)?;
        let text = lease
            .capture_pane(target, self.config.capture_lines)
            .await?;
        Ok(classifier::classify_with(&text, &self.config.agent_command)
            .state
            .to_string())
    }

    /// Spawn an agent window in `session` (creating the session if needed),
    /// launch the REPL, and deliver the role briefing.
    pub async fn spawn_agent(
        &self,
        session: &str,
        role: AgentRole,
        window_name: Option<&str>,
        project_name: Option<&str>,
        briefing_name: Option<&str>,
    ) -> CmdResult {
        let window_name = window_name.map(str::to_string).unwrap_or_else(|| role.to_string());

        let target = {
            let lease = self.pool.acquire().await.map_err(map_engine)?;
            lease
                .create_session(session, &self.config.workdir, "sh")
                .await?;
            lease
                .create_window(
                    session,
                    &window_name,
                    &self.config.workdir,
                    &self.config.agent_command,
                )
                .await?
        };

        let briefing = match briefing_name {
            Some(name) => briefing::by_name(name)
                .ok_or_else(|| CommandError::not_found(format!("no briefing named '{name}'")))?,
            None => briefing::for_role(&role),
        };
        let text = briefing::render_briefing(
            briefing,
            &BriefingContext {
                project_name: project_name.unwrap_or(session).to_string(),
                target: target.clone(),
            },
        );

        // Give the REPL a moment to draw its prompt before typing.
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        let outcome = self.submitter.submit(&target, &text, None).await;
        if let SubmitOutcome::Failed { reason } = &outcome {
            return Err(CommandError::backend(format!(
                "agent spawned at {target} but briefing failed: {reason}"
            )));
        }

        Ok(json!({
            "target": target.to_string(),
            "role": role.to_string(),
            "window": window_name,
            "briefing_delivered": true,
        }))
    }

    /// Submit a message directly, bypassing the daemon.
    pub async fn send(
        &self,
        target: &AgentTarget,
        message: &str,
        delay_hint: Option<std::time::Duration>,
    ) -> CmdResult {
        let outcome = self.submitter.submit(target, message, delay_hint).await;
        match outcome {
            SubmitOutcome::Failed { reason } => Err(CommandError::backend(format!(
                "submission to {target} failed: {reason}"
            ))),
            outcome => Ok(json!({
                "target": target.to_string(),
                "outcome": outcome_label(&outcome),
            })),
        }
    }

    pub async fn kill_window(&self, target: &AgentTarget) -> Result<(), CommandError> {
        let lease = self.pool.acquire().await.map_err(map_engine)?;
        lease.kill_window(target).await?;
        Ok(())
    }
}

pub fn outcome_label(outcome: &SubmitOutcome) -> &'static str {
    match outcome {
        SubmitOutcome::Delivered => "delivered",
        SubmitOutcome::DeliveredUnverified => "delivered_unverified",
        SubmitOutcome::Failed { .. } => "failed",
    }
}

fn map_engine(e: muster_engine::PoolError) -> CommandError {
    CommandError::backend(e.to_string())
}

/// Render a fleet listing with states as table rows.
pub fn fleet_rows(rows: Vec<(AgentTarget, String, Option<String>)>) -> Value {
    Value::Array(
        rows.into_iter()
            .map(|(target, name, state)| {
                json!({
                    "target": target.to_string(),
                    "window": name,
                    "state": state.unwrap_or_else(|| "unknown".to_string()),
                })
            })
            .collect(),
    )
}
