// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automatic-recovery control

use super::direct::DirectOps;
use super::{check_response, parse_target, CliCtx, CmdResult, CommandError};
use crate::client::DaemonClient;
use clap::{Args, Subcommand};
use muster_daemon::{Request, Response};
use serde_json::json;

#[derive(Args)]
pub struct RecoveryArgs {
    #[command(subcommand)]
    pub command: RecoveryCommand,
}

#[derive(Subcommand)]
pub enum RecoveryCommand {
    /// Enable automatic crash recovery
    Start,
    /// Disable automatic crash recovery
    Stop,
    /// Automatic recovery status
    Status,
    /// Dry-run: classify a target and report what recovery would do
    Test {
        /// Agent address (session:window)
        target: String,
    },
}

pub async fn handle(command: RecoveryCommand, _ctx: &CliCtx) -> CmdResult {
    match command {
        RecoveryCommand::Start => toggle(true).await,
        RecoveryCommand::Stop => toggle(false).await,

        RecoveryCommand::Status => {
            let client = DaemonClient::for_query().await?;
            let status = super::monitor::status(&client).await?;
            Ok(json!({
                "recovery_enabled": status.monitor.recovery_enabled,
                "pending_recoveries": status.monitor.pending_recoveries,
            }))
        }

        RecoveryCommand::Test { target } => {
            let target = parse_target(&target)?;
            let ops = DirectOps::new();
            let state = ops.classify_target(&target).await?;
            let would_recover = state == "crashed";
            Ok(json!({
                "target": target.to_string(),
                "state": state,
                "would_recover": would_recover,
                "note": if would_recover {
                    "recovery would kill, respawn, and re-brief this window"
                } else {
                    "no action: recovery only fires on crashed agents"
                },
            }))
        }
    }
}

async fn toggle(enabled: bool) -> CmdResult {
    let client = DaemonClient::for_action().await?;
    match check_response(client.request(Request::RecoveryEnable { enabled }).await?)? {
        Response::Ok => Ok(json!({ "recovery_enabled": enabled })),
        other => Err(CommandError::backend(format!(
            "unexpected daemon response: {other:?}"
        ))),
    }
}
