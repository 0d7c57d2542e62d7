// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team operations: whole-session deploys, broadcasts, recovery sweeps.

use super::direct::DirectOps;
use super::{check_response, parse_target, CliCtx, CmdResult, CommandError};
use crate::client::{ClientError, DaemonClient};
use clap::{Args, Subcommand};
use muster_core::{AgentRole, AgentState};
use muster_daemon::{Request, Response};
use serde_json::json;

#[derive(Args)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommand,
}

#[derive(Subcommand)]
pub enum TeamCommand {
    /// Deploy a full team: one PM, N workers, optionally QA
    Deploy {
        /// Session (and project) name
        session: String,
        /// Number of worker agents
        #[arg(long, default_value = "2")]
        workers: u32,
        /// Also spawn a QA agent
        #[arg(long)]
        qa: bool,
    },
    /// List sessions that contain agent windows
    List,
    /// Status of one team, addressed by its PM's window
    Status {
        /// PM address (session:window)
        target: String,
    },
    /// Send a message to every agent in a session
    Broadcast {
        /// Session name
        session: String,
        /// Message text
        message: String,
    },
    /// Recover every crashed agent in a session
    Recover {
        /// Session name
        session: String,
    },
}

pub async fn handle(command: TeamCommand, _ctx: &CliCtx) -> CmdResult {
    match command {
        TeamCommand::Deploy {
            session,
            workers,
            qa,
        } => {
            let ops = DirectOps::new();
            let mut spawned = Vec::new();

            let pm = ops
                .spawn_agent(&session, AgentRole::ProjectManager, Some("pm"), Some(&session), None)
                .await?;
            spawned.push(pm);

            for i in 1..=workers {
                let name = format!("worker-{i}");
                let worker = ops
                    .spawn_agent(&session, AgentRole::Worker, Some(&name), Some(&session), None)
                    .await?;
                spawned.push(worker);
            }

            if qa {
                let qa_agent = ops
                    .spawn_agent(&session, AgentRole::Qa, Some("qa"), Some(&session), None)
                    .await?;
                spawned.push(qa_agent);
            }

            Ok(json!({ "session": session, "spawned": spawned }))
        }

        TeamCommand::List => {
            let ops = DirectOps::new();
            let fleet = ops.list_fleet().await?;
            let mut sessions: Vec<(String, usize)> = Vec::new();
            for (target, _name) in fleet {
                match sessions.iter_mut().find(|(s, _)| s == target.session()) {
                    Some((_, count)) => *count += 1,
                    None => sessions.push((target.session().to_string(), 1)),
                }
            }
            Ok(json!(sessions
                .into_iter()
                .map(|(session, windows)| json!({ "session": session, "windows": windows }))
                .collect::<Vec<_>>()))
        }

        TeamCommand::Status { target } => {
            let pm = parse_target(&target)?;
            let session = pm.session().to_string();
            team_rows(&session).await
        }

        TeamCommand::Broadcast { session, message } => {
            let ops = DirectOps::new();
            let fleet = ops.list_fleet().await?;
            let mut delivered = Vec::new();
            for (target, _name) in fleet {
                if target.session() != session {
                    continue;
                }
                ops.send(&target, &message, None).await?;
                delivered.push(target.to_string());
            }
            if delivered.is_empty() {
                return Err(CommandError::not_found(format!(
                    "no agent windows in session '{session}'"
                )));
            }
            Ok(json!({ "session": session, "delivered": delivered }))
        }

        TeamCommand::Recover { session } => {
            let client = DaemonClient::for_action().await?;
            let agents = match check_response(client.request(Request::AgentList).await?)? {
                Response::Agents { agents } => agents,
                other => {
                    return Err(CommandError::backend(format!(
                        "unexpected daemon response: {other:?}"
                    )))
                }
            };

            let mut recovered = Vec::new();
            for agent in agents {
                if agent.target.session() != session || agent.state != AgentState::Crashed {
                    continue;
                }
                check_response(client.request(Request::Recover {
                    target: agent.target.to_string(),
                })
                .await?)?;
                recovered.push(agent.target.to_string());
            }
            Ok(json!({ "session": session, "recovered": recovered }))
        }
    }
}

async fn team_rows(session: &str) -> CmdResult {
    // Per-agent states from the daemon when available, direct otherwise.
    match DaemonClient::for_query().await {
        Ok(client) => {
            let agents = match check_response(client.request(Request::AgentList).await?)? {
                Response::Agents { agents } => agents,
                other => {
                    return Err(CommandError::backend(format!(
                        "unexpected daemon response: {other:?}"
                    )))
                }
            };
            Ok(json!(agents
                .into_iter()
                .filter(|a| a.target.session() == session)
                .map(|a| json!({
                    "target": a.target.to_string(),
                    "role": a.role.to_string(),
                    "state": a.state.to_string(),
                }))
                .collect::<Vec<_>>()))
        }
        Err(ClientError::DaemonNotRunning) => {
            let ops = DirectOps::new();
            let mut rows = Vec::new();
            for (target, name) in ops.list_fleet().await? {
                if target.session() != session {
                    continue;
                }
                let state = ops.classify_target(&target).await.unwrap_or_else(|e| e.to_string());
                rows.push(json!({
                    "target": target.to_string(),
                    "window": name,
                    "state": state,
                }));
            }
            Ok(json!(rows))
        }
        Err(e) => Err(e.into()),
    }
}
