// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitoring loop control and introspection

use super::{check_response, CliCtx, CmdResult, CommandError};
use crate::client::DaemonClient;
use clap::{Args, Subcommand};
use muster_daemon::{Request, Response};
use serde_json::json;

#[derive(Args)]
pub struct MonitorArgs {
    #[command(subcommand)]
    pub command: MonitorCommand,
}

#[derive(Subcommand)]
pub enum MonitorCommand {
    /// Start the monitoring loop (starts the daemon if needed)
    Start,
    /// Stop the monitoring loop; the daemon stays up for queries
    Stop,
    /// Monitoring loop status
    Status,
    /// One-screen fleet dashboard
    Dashboard,
    /// Tail the daemon log
    Logs {
        /// Number of trailing lines
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
    /// Pool, cache, and submitter counters
    Metrics,
    /// Enable automatic crash recovery
    RecoveryStart,
    /// Disable automatic crash recovery
    RecoveryStop,
    /// Automatic recovery status
    RecoveryStatus,
    /// Last cycle timing and counts
    Performance,
}

pub async fn handle(command: MonitorCommand, ctx: &CliCtx) -> CmdResult {
    match command {
        MonitorCommand::Start => {
            let client = DaemonClient::for_action().await?;
            // Already-running is success for an idempotent start.
            match client.request(Request::MonitorStart).await? {
                Response::Ok => Ok(json!({ "monitor": "started" })),
                Response::Error { message, .. } if message.contains("already running") => {
                    Ok(json!({ "monitor": "already running" }))
                }
                other => check_response(other).map(|_| json!({ "monitor": "started" })),
            }
        }

        MonitorCommand::Stop => {
            let client = DaemonClient::for_query().await?;
            check_response(client.request(Request::MonitorStop).await?)?;
            Ok(json!({ "monitor": "stopped" }))
        }

        MonitorCommand::Status => {
            let status = status(&DaemonClient::for_query().await?).await?;
            Ok(json!({
                "running": status.monitor.running,
                "strategy": status.monitor.strategy,
                "cycles": status.monitor.cycle_count,
                "agents": status.monitor.agents,
                "rate_limited": status.monitor.rate_limited,
                "recovery_enabled": status.monitor.recovery_enabled,
                "uptime_secs": status.uptime_secs,
            }))
        }

        MonitorCommand::Dashboard => {
            let client = DaemonClient::for_query().await?;
            let status = status(&client).await?;
            let agents = match check_response(client.request(Request::AgentList).await?)? {
                Response::Agents { agents } => agents,
                other => return Err(unexpected(other)),
            };
            Ok(json!({
                "monitor": {
                    "running": status.monitor.running,
                    "cycles": status.monitor.cycle_count,
                    "rate_limited": status.monitor.rate_limited,
                    "pending_recoveries": status.monitor.pending_recoveries,
                },
                "agents": agents.iter().map(|a| json!({
                    "target": a.target.to_string(),
                    "role": a.role.to_string(),
                    "state": a.state.to_string(),
                    "idle_cycles": a.consecutive_idle_cycles,
                })).collect::<Vec<_>>(),
            }))
        }

        MonitorCommand::Logs { lines } => {
            let log_path = ctx.state_dir.join("daemon.log");
            if !log_path.exists() {
                return Err(CommandError::not_found(format!(
                    "no daemon log at {}",
                    log_path.display()
                )));
            }
            let content = std::fs::read_to_string(&log_path)?;
            let tail: Vec<&str> = content.lines().rev().take(lines).collect();
            Ok(json!(tail
                .into_iter()
                .rev()
                .map(str::to_string)
                .collect::<Vec<_>>()
                .join("\n")))
        }

        MonitorCommand::Metrics => {
            let status = status(&DaemonClient::for_query().await?).await?;
            Ok(json!({
                "pool": status.monitor.pool,
                "cache": status.monitor.cache,
                "submitter": status.monitor.submitter,
                "queued_notifications": status.monitor.queued_notifications,
            }))
        }

        MonitorCommand::RecoveryStart => toggle_recovery(true).await,
        MonitorCommand::RecoveryStop => toggle_recovery(false).await,

        MonitorCommand::RecoveryStatus => {
            let status = status(&DaemonClient::for_query().await?).await?;
            Ok(json!({
                "recovery_enabled": status.monitor.recovery_enabled,
                "pending_recoveries": status.monitor.pending_recoveries,
            }))
        }

        MonitorCommand::Performance => {
            let status = status(&DaemonClient::for_query().await?).await?;
            match status.monitor.last_report {
                Some(report) => Ok(serde_json::to_value(report)
                    .map_err(|e| CommandError::backend(e.to_string()))?),
                None => Ok(json!({ "last_report": null, "note": "no cycle has completed yet" })),
            }
        }
    }
}

pub async fn status(client: &DaemonClient) -> Result<muster_daemon::StatusData, CommandError> {
    match check_response(client.request(Request::Status).await?)? {
        Response::Status(status) => Ok(*status),
        other => Err(unexpected(other)),
    }
}

async fn toggle_recovery(enabled: bool) -> CmdResult {
    let client = DaemonClient::for_query().await?;
    check_response(client.request(Request::RecoveryEnable { enabled }).await?)?;
    Ok(json!({ "recovery_enabled": enabled }))
}

fn unexpected(response: Response) -> CommandError {
    CommandError::backend(format!("unexpected daemon response: {response:?}"))
}
