// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management commands

use super::{check_response, CliCtx, CmdResult, CommandError};
use crate::client::{ClientError, DaemonClient};
use crate::daemon_process;
use clap::{Args, Subcommand};
use muster_daemon::Request;
use serde_json::json;
use std::time::Duration;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start musterd in the background
    Start,
    /// Stop the running daemon
    Stop,
    /// Daemon liveness and status
    Status,
    /// Stop then start the daemon
    Restart,
    /// Tail the daemon log
    Logs {
        /// Number of trailing lines
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

pub async fn handle(command: DaemonCommand, ctx: &CliCtx) -> CmdResult {
    match command {
        DaemonCommand::Start => start().await,
        DaemonCommand::Stop => stop().await,

        DaemonCommand::Status => match DaemonClient::for_query().await {
            Ok(client) => {
                let status = super::monitor::status(&client).await?;
                Ok(json!({
                    "running": true,
                    "pid": status.pid,
                    "version": status.version,
                    "uptime_secs": status.uptime_secs,
                    "monitor_running": status.monitor.running,
                }))
            }
            Err(ClientError::DaemonNotRunning) => Ok(json!({ "running": false })),
            Err(e) => Err(e.into()),
        },

        DaemonCommand::Restart => {
            let _ = stop().await;
            start().await
        }

        DaemonCommand::Logs { lines } => {
            let log_path = ctx.state_dir.join("daemon.log");
            if !log_path.exists() {
                return Err(CommandError::not_found(format!(
                    "no daemon log at {}",
                    log_path.display()
                )));
            }
            let content = std::fs::read_to_string(&log_path)?;
            let tail: Vec<String> = content
                .lines()
                .rev()
                .take(lines)
                .map(str::to_string)
                .collect();
            Ok(json!(tail
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n")))
        }
    }
}

async fn start() -> CmdResult {
    match DaemonClient::for_action().await {
        Ok(client) => {
            let status = super::monitor::status(&client).await?;
            Ok(json!({ "running": true, "pid": status.pid }))
        }
        Err(e) => Err(e.into()),
    }
}

async fn stop() -> CmdResult {
    // Prefer a graceful shutdown over the socket; fall back to signals.
    match DaemonClient::for_query().await {
        Ok(client) => {
            check_response(client.request(Request::Shutdown).await?)?;
            if let Ok(Some(pid)) = daemon_process::read_daemon_pid() {
                daemon_process::stop_daemon_by_pid(pid, Duration::from_secs(2));
            }
            Ok(json!({ "stopped": true }))
        }
        Err(ClientError::DaemonNotRunning) => match daemon_process::read_daemon_pid()? {
            Some(pid) if daemon_process::process_exists(pid) => {
                let stopped = daemon_process::stop_daemon_by_pid(pid, Duration::from_secs(2));
                Ok(json!({ "stopped": stopped, "pid": pid }))
            }
            _ => Ok(json!({ "stopped": false, "note": "daemon was not running" })),
        },
        Err(e) => Err(e.into()),
    }
}
