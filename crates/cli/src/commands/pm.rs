// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project-manager operations

use super::direct::DirectOps;
use super::{parse_target, CliCtx, CmdResult, CommandError};
use clap::{Args, Subcommand};
use muster_core::{AgentRole, AgentTarget};
use serde_json::json;

/// The standard check-in prompt a PM answers for the orchestrator.
const CHECKIN_PROMPT: &str = "STATUS CHECK: reply with (1) what each worker is doing, \
(2) blockers, (3) what ships next. Three lines, no fluff.";

#[derive(Args)]
pub struct PmArgs {
    #[command(subcommand)]
    pub command: PmCommand,
}

#[derive(Subcommand)]
pub enum PmCommand {
    /// Classified state of every PM window
    Status,
    /// Send a message to one PM
    Message {
        /// PM address (session:window)
        target: String,
        /// Message text
        message: String,
    },
    /// Send the standard status check-in to every PM
    Checkin,
    /// Send a message to every PM
    Broadcast {
        /// Message text
        message: String,
    },
    /// Send a custom check-in prompt to every PM
    CustomCheckin {
        /// Check-in prompt text
        prompt: String,
    },
    /// Spawn a PM into a session
    Create {
        /// Session to spawn into
        session: String,
    },
}

pub async fn handle(command: PmCommand, _ctx: &CliCtx) -> CmdResult {
    let ops = DirectOps::new();
    match command {
        PmCommand::Status => {
            let pms = find_pms(&ops).await?;
            let mut rows = Vec::new();
            for target in pms {
                let state = ops.classify_target(&target).await.unwrap_or_else(|e| e.to_string());
                rows.push(json!({ "target": target.to_string(), "state": state }));
            }
            Ok(json!(rows))
        }

        PmCommand::Message { target, message } => {
            let target = parse_target(&target)?;
            ops.send(&target, &message, None).await
        }

        PmCommand::Checkin => broadcast_to_pms(&ops, CHECKIN_PROMPT).await,

        PmCommand::Broadcast { message } => broadcast_to_pms(&ops, &message).await,

        PmCommand::CustomCheckin { prompt } => broadcast_to_pms(&ops, &prompt).await,

        PmCommand::Create { session } => {
            ops.spawn_agent(
                &session,
                AgentRole::ProjectManager,
                Some("pm"),
                Some(&session),
                None,
            )
            .await
        }
    }
}

/// PM windows are found by name convention (the same convention discovery
/// uses for role inference).
async fn find_pms(ops: &DirectOps) -> Result<Vec<AgentTarget>, CommandError> {
    Ok(ops
        .list_fleet()
        .await?
        .into_iter()
        .filter(|(_, name)| {
            let lower = name.to_ascii_lowercase();
            lower == "pm" || lower.contains("manager")
        })
        .map(|(target, _)| target)
        .collect())
}

async fn broadcast_to_pms(ops: &DirectOps, message: &str) -> CmdResult {
    let pms = find_pms(ops).await?;
    if pms.is_empty() {
        return Err(CommandError::not_found("no PM windows found"));
    }
    let mut delivered = Vec::new();
    for target in pms {
        ops.send(&target, message, None).await?;
        delivered.push(target.to_string());
    }
    Ok(json!({ "delivered": delivered }))
}
