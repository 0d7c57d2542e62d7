// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Role-briefing commands

use super::direct::DirectOps;
use super::{CliCtx, CmdResult, CommandError};
use clap::{Args, Subcommand};
use muster_core::AgentRole;
use muster_engine::briefing;
use serde_json::json;

#[derive(Args)]
pub struct ContextArgs {
    #[command(subcommand)]
    pub command: ContextCommand,
}

#[derive(Subcommand)]
pub enum ContextCommand {
    /// List available role briefings
    List,
    /// Print one briefing
    Show {
        /// Briefing name (orchestrator, pm, worker, qa)
        name: String,
    },
    /// Spawn an agent seeded with a specific briefing
    Spawn {
        /// Briefing name
        name: String,
        /// Session to spawn into
        session: String,
    },
    /// Write a briefing to a file
    Export {
        /// Briefing name
        name: String,
        /// Output path (defaults to ./<name>.md)
        #[arg(long)]
        path: Option<std::path::PathBuf>,
    },
}

pub async fn handle(command: ContextCommand, _ctx: &CliCtx) -> CmdResult {
    match command {
        ContextCommand::List => Ok(json!(briefing::ALL
            .iter()
            .map(|b| json!({
                "name": b.name,
                "lines": b.text.lines().count(),
            }))
            .collect::<Vec<_>>())),

        ContextCommand::Show { name } => {
            let briefing = find(&name)?;
            Ok(json!(briefing.text))
        }

        ContextCommand::Spawn { name, session } => {
            find(&name)?;
            DirectOps::new()
                .spawn_agent(
                    &session,
                    AgentRole::Custom(name.clone()),
                    Some(&name),
                    None,
                    Some(&name),
                )
                .await
        }

        ContextCommand::Export { name, path } => {
            let briefing = find(&name)?;
            let path = path.unwrap_or_else(|| std::path::PathBuf::from(format!("{name}.md")));
            std::fs::write(&path, briefing.text)?;
            Ok(json!({ "name": name, "path": path.display().to_string() }))
        }
    }
}

fn find(name: &str) -> Result<&'static briefing::Briefing, CommandError> {
    briefing::by_name(name).ok_or_else(|| {
        let known: Vec<&str> = briefing::ALL.iter().map(|b| b.name).collect();
        CommandError::not_found(format!(
            "no briefing named '{name}' (known: {})",
            known.join(", ")
        ))
    })
}
