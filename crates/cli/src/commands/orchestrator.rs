// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator operations

use super::direct::DirectOps;
use super::{parse_target, CliCtx, CmdResult, CommandError};
use clap::{Args, Subcommand};
use muster_adapters::TerminalDriver;
use muster_core::{AgentRole, AgentTarget};
use serde_json::json;

#[derive(Args)]
pub struct OrchestratorArgs {
    #[command(subcommand)]
    pub command: OrchestratorCommand,
}

#[derive(Subcommand)]
pub enum OrchestratorCommand {
    /// Start the orchestrator in its hub session
    Start {
        /// Hub session name
        #[arg(default_value = "hub")]
        session: String,
    },
    /// Classified state of orchestrator windows
    Status,
    /// Schedule a reminder message to a target after a delay
    Schedule {
        /// Minutes from now
        minutes: u32,
        /// Reminder text
        note: String,
        /// Recipient (defaults to the orchestrator window)
        #[arg(long)]
        target: Option<String>,
    },
    /// Send a message to every agent window in every session
    Broadcast {
        /// Message text
        message: String,
    },
    /// List orchestrator windows
    List,
    /// Kill one orchestrator window
    Kill {
        /// Orchestrator address (session:window)
        target: String,
    },
    /// Kill every orchestrator window
    KillAll,
}

pub async fn handle(command: OrchestratorCommand, _ctx: &CliCtx) -> CmdResult {
    let ops = DirectOps::new();
    match command {
        OrchestratorCommand::Start { session } => {
            ops.spawn_agent(
                &session,
                AgentRole::Orchestrator,
                Some("orchestrator"),
                Some(&session),
                None,
            )
            .await
        }

        OrchestratorCommand::Status => {
            let mut rows = Vec::new();
            for target in find_orchestrators(&ops).await? {
                let state = ops.classify_target(&target).await.unwrap_or_else(|e| e.to_string());
                rows.push(json!({ "target": target.to_string(), "state": state }));
            }
            Ok(json!(rows))
        }

        OrchestratorCommand::Schedule {
            minutes,
            note,
            target,
        } => {
            let recipient = match target {
                Some(raw) => parse_target(&raw)?,
                None => find_orchestrators(&ops)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| CommandError::not_found("no orchestrator window found"))?,
            };

            // A detached window sleeps, fires the send, then exits. The
            // schedule survives this CLI process but not a tmux restart.
            let seconds = u64::from(minutes) * 60;
            let muster = std::env::current_exe()
                .ok()
                .and_then(|p| p.to_str().map(str::to_string))
                .unwrap_or_else(|| "muster".to_string());
            let command = format!(
                "sh -c 'sleep {seconds}; {muster} agent send {recipient} \"SCHEDULED: {}\"'",
                note.replace('"', "'")
            );

            let lease = ops
                .pool
                .acquire()
                .await
                .map_err(|e| CommandError::backend(e.to_string()))?;
            lease
                .create_window(
                    recipient.session(),
                    "scheduled",
                    &ops.config.workdir,
                    &command,
                )
                .await?;

            Ok(json!({
                "recipient": recipient.to_string(),
                "fires_in_minutes": minutes,
                "note": note,
            }))
        }

        OrchestratorCommand::Broadcast { message } => {
            let fleet = ops.list_fleet().await?;
            let mut delivered = Vec::new();
            for (target, _name) in fleet {
                ops.send(&target, &message, None).await?;
                delivered.push(target.to_string());
            }
            Ok(json!({ "delivered": delivered }))
        }

        OrchestratorCommand::List => {
            let orchestrators = find_orchestrators(&ops).await?;
            Ok(json!(orchestrators
                .into_iter()
                .map(|t| json!({ "target": t.to_string() }))
                .collect::<Vec<_>>()))
        }

        OrchestratorCommand::Kill { target } => {
            let target = parse_target(&target)?;
            ops.kill_window(&target).await?;
            Ok(json!({ "killed": target.to_string() }))
        }

        OrchestratorCommand::KillAll => {
            let mut killed = Vec::new();
            for target in find_orchestrators(&ops).await? {
                ops.kill_window(&target).await?;
                killed.push(target.to_string());
            }
            Ok(json!({ "killed": killed }))
        }
    }
}

async fn find_orchestrators(ops: &DirectOps) -> Result<Vec<AgentTarget>, CommandError> {
    Ok(ops
        .list_fleet()
        .await?
        .into_iter()
        .filter(|(_, name)| name.to_ascii_lowercase().contains("orchestrator"))
        .map(|(target, _)| target)
        .collect())
}
