// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session listing and attach

use super::direct::DirectOps;
use super::{CliCtx, CmdResult, CommandError};
use clap::{Args, Subcommand};
use muster_adapters::TerminalDriver;
use serde_json::json;

#[derive(Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List tmux sessions and their windows
    List,
    /// Attach the terminal to a session
    Attach {
        /// Session name
        session: String,
    },
}

pub async fn handle(command: SessionCommand, _ctx: &CliCtx) -> CmdResult {
    match command {
        SessionCommand::List => {
            let ops = DirectOps::new();
            let lease = ops
                .pool
                .acquire()
                .await
                .map_err(|e| CommandError::backend(e.to_string()))?;
            let mut rows = Vec::new();
            for session in lease.list_sessions().await? {
                let windows = lease.list_windows(&session).await?;
                rows.push(json!({
                    "session": session,
                    "windows": windows.len(),
                    "names": windows
                        .iter()
                        .map(|w| w.name.clone())
                        .collect::<Vec<_>>()
                        .join(","),
                }));
            }
            Ok(json!(rows))
        }

        SessionCommand::Attach { session } => {
            let status = std::process::Command::new("tmux")
                .args(["attach-session", "-t", &session])
                .status()?;
            if !status.success() {
                return Err(CommandError::not_found(format!(
                    "no such session: {session}"
                )));
            }
            Ok(json!({ "attached": session }))
        }
    }
}
