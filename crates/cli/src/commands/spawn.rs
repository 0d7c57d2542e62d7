// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent spawning

use super::direct::DirectOps;
use super::{CliCtx, CmdResult};
use clap::{Args, Subcommand};
use muster_core::AgentRole;

#[derive(Args)]
pub struct SpawnArgs {
    #[command(subcommand)]
    pub command: SpawnCommand,
}

#[derive(Subcommand)]
pub enum SpawnCommand {
    /// Spawn a worker (or custom-role) agent
    Agent {
        /// Session to spawn into
        session: String,
        /// Window name (defaults to the role)
        #[arg(long)]
        name: Option<String>,
        /// Role: worker, qa, or a custom briefing name
        #[arg(long, default_value = "worker")]
        role: String,
        /// Briefing to deliver instead of the role default
        #[arg(long)]
        briefing: Option<String>,
    },
    /// Spawn a project manager
    Pm {
        /// Session to spawn into
        session: String,
        /// Project name substituted into the briefing
        #[arg(long)]
        project: Option<String>,
    },
    /// Spawn the orchestrator in its hub session
    Orchestrator {
        /// Hub session name
        #[arg(default_value = "hub")]
        session: String,
    },
}

pub async fn handle(command: SpawnCommand, _ctx: &CliCtx) -> CmdResult {
    let ops = DirectOps::new();
    match command {
        SpawnCommand::Agent {
            session,
            name,
            role,
            briefing,
        } => {
            let role = super::agent::parse_role(&role)?;
            ops.spawn_agent(&session, role, name.as_deref(), None, briefing.as_deref())
                .await
        }

        SpawnCommand::Pm { session, project } => {
            ops.spawn_agent(
                &session,
                AgentRole::ProjectManager,
                Some("pm"),
                project.as_deref(),
                None,
            )
            .await
        }

        SpawnCommand::Orchestrator { session } => {
            ops.spawn_agent(
                &session,
                AgentRole::Orchestrator,
                Some("orchestrator"),
                Some(&session),
                None,
            )
            .await
        }
    }
}
