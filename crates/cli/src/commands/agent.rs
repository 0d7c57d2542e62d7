// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent management commands

use super::direct::{self, DirectOps};
use super::{check_response, parse_target, CliCtx, CmdResult, CommandError};
use crate::client::{ClientError, DaemonClient};
use clap::{Args, Subcommand};
use muster_core::AgentRole;
use muster_daemon::{Request, Response};
use serde_json::json;
use std::time::Duration;

#[derive(Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommand,
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// List agent windows across all sessions
    List,
    /// Show the classified state of every agent
    Status,
    /// Show the full record of one agent
    Info {
        /// Agent address (session:window)
        target: String,
    },
    /// Submit a message into an agent's REPL
    Send {
        /// Agent address (session:window)
        target: String,
        /// Message text
        message: String,
        /// Staging-delay hint in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Alias of `send` kept for muscle memory
    Message {
        /// Agent address (session:window)
        target: String,
        /// Message text
        message: String,
    },
    /// Kill an agent window (no respawn)
    Kill {
        /// Agent address (session:window)
        target: String,
    },
    /// Kill and respawn an agent, re-briefing it
    Restart {
        /// Agent address (session:window)
        target: String,
    },
    /// Attach the terminal to an agent's window
    Attach {
        /// Agent address (session:window)
        target: String,
    },
    /// Spawn a new worker agent into a session
    Deploy {
        /// Session to deploy into
        #[arg(long, default_value = "muster")]
        session: String,
        /// Window name
        #[arg(long)]
        name: Option<String>,
        /// Role: worker, qa, pm, orchestrator
        #[arg(long, default_value = "worker")]
        role: String,
    },
    /// Kill every discovered agent window
    KillAll {
        /// Skip the safety check
        #[arg(long)]
        force: bool,
    },
}

pub fn parse_role(raw: &str) -> Result<AgentRole, CommandError> {
    Ok(match raw {
        "worker" => AgentRole::Worker,
        "qa" => AgentRole::Qa,
        "pm" => AgentRole::ProjectManager,
        "orchestrator" => AgentRole::Orchestrator,
        other => AgentRole::Custom(other.to_string()),
    })
}

pub async fn handle(command: AgentCommand, ctx: &CliCtx) -> CmdResult {
    match command {
        AgentCommand::List => list(false).await,
        AgentCommand::Status => list(true).await,

        AgentCommand::Info { target } => {
            let target = parse_target(&target)?;
            let client = DaemonClient::for_query().await?;
            match check_response(client.request(Request::AgentInfo {
                target: target.to_string(),
            })
            .await?)? {
                Response::Agent { agent } => Ok(serde_json::to_value(*agent)
                    .map_err(|e| CommandError::backend(e.to_string()))?),
                other => Err(unexpected(other)),
            }
        }

        AgentCommand::Send {
            target,
            message,
            delay_ms,
        } => send(&target, &message, delay_ms).await,

        AgentCommand::Message { target, message } => send(&target, &message, None).await,

        AgentCommand::Kill { target } => {
            let target = parse_target(&target)?;
            match DaemonClient::for_query().await {
                Ok(client) => {
                    check_response(client.request(Request::AgentKill {
                        target: target.to_string(),
                    })
                    .await?)?;
                }
                Err(ClientError::DaemonNotRunning) => {
                    DirectOps::new().kill_window(&target).await?;
                }
                Err(e) => return Err(e.into()),
            }
            Ok(json!({ "killed": target.to_string() }))
        }

        AgentCommand::Restart { target } => {
            let target = parse_target(&target)?;
            let client = DaemonClient::for_action().await?;
            match check_response(client.request(Request::Recover {
                target: target.to_string(),
            })
            .await?)? {
                Response::Events { events } => Ok(json!({
                    "target": target.to_string(),
                    "events": events,
                })),
                other => Err(unexpected(other)),
            }
        }

        AgentCommand::Attach { target } => {
            let target = parse_target(&target)?;
            attach(&target)
        }

        AgentCommand::Deploy {
            session,
            name,
            role,
        } => {
            let role = parse_role(&role)?;
            DirectOps::new()
                .spawn_agent(&session, role, name.as_deref(), None, None)
                .await
        }

        AgentCommand::KillAll { force } => {
            if !force {
                return Err(CommandError::validation(
                    "kill-all terminates every agent window; pass --force to confirm",
                ));
            }
            let ops = DirectOps::new();
            let fleet = ops.list_fleet().await?;
            let mut killed = Vec::new();
            for (target, _name) in fleet {
                ops.kill_window(&target).await?;
                killed.push(target.to_string());
            }
            let _ = ctx; // state dir not needed here
            Ok(json!({ "killed": killed }))
        }
    }
}

async fn list(with_state: bool) -> CmdResult {
    // Prefer the daemon's records; fall back to direct discovery.
    match DaemonClient::for_query().await {
        Ok(client) => match check_response(client.request(Request::AgentList).await?)? {
            Response::Agents { agents } => Ok(serde_json::Value::Array(
                agents
                    .into_iter()
                    .map(|a| {
                        json!({
                            "target": a.target.to_string(),
                            "role": a.role.to_string(),
                            "state": a.state.to_string(),
                            "idle_cycles": a.consecutive_idle_cycles,
                            "submissions": a.submission_attempts,
                        })
                    })
                    .collect(),
            )),
            other => Err(unexpected(other)),
        },
        Err(ClientError::DaemonNotRunning) => {
            let ops = DirectOps::new();
            let fleet = ops.list_fleet().await?;
            let mut rows = Vec::new();
            for (target, name) in fleet {
                let state = if with_state {
                    Some(ops.classify_target(&target).await.unwrap_or_else(|e| {
                        format!("unknown ({e})")
                    }))
                } else {
                    None
                };
                rows.push((target, name, state));
            }
            Ok(direct::fleet_rows(rows))
        }
        Err(e) => Err(e.into()),
    }
}

async fn send(target: &str, message: &str, delay_ms: Option<u64>) -> CmdResult {
    let target = parse_target(target)?;
    match DaemonClient::for_query().await {
        Ok(client) => match check_response(client.request(Request::AgentSend {
            target: target.to_string(),
            message: message.to_string(),
            delay_hint_ms: delay_ms,
        })
        .await?)? {
            Response::Submitted { outcome } => Ok(json!({
                "target": target.to_string(),
                "outcome": direct::outcome_label(&outcome),
            })),
            other => Err(unexpected(other)),
        },
        Err(ClientError::DaemonNotRunning) => {
            DirectOps::new()
                .send(&target, message, delay_ms.map(Duration::from_millis))
                .await
        }
        Err(e) => Err(e.into()),
    }
}

fn attach(target: &muster_core::AgentTarget) -> CmdResult {
    // Select the window, then swap this process for tmux attach.
    let select = std::process::Command::new("tmux")
        .args(["select-window", "-t", &target.to_string()])
        .status()?;
    if !select.success() {
        return Err(CommandError::not_found(format!("no such window: {target}")));
    }
    let status = std::process::Command::new("tmux")
        .args(["attach-session", "-t", target.session()])
        .status()?;
    Ok(json!({
        "attached": target.to_string(),
        "exit_code": status.code(),
    }))
}

fn unexpected(response: Response) -> CommandError {
    CommandError::backend(format!("unexpected daemon response: {response:?}"))
}
