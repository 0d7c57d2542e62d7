// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-server commands: expose the bridge over stdin/stdout JSONL.

use super::{CliCtx, CmdResult, CommandError};
use crate::bridge::{self, ToolInvocation};
use crate::output::Envelope;
use clap::{Args, CommandFactory, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Args)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub command: ServerCommand,
}

#[derive(Subcommand)]
pub enum ServerCommand {
    /// Serve tool invocations over stdin/stdout (one JSON object per line)
    Start,
    /// Tool-server configuration status
    Status,
    /// Print the generated tool definitions
    Tools,
    /// Write the client configuration snippet
    Setup,
    /// Enable or disable a tool group
    Toggle {
        /// Group name
        group: String,
    },
}

/// Groups disabled via `server toggle`, stored next to the state.
#[derive(Debug, Default, Serialize, Deserialize)]
struct GroupToggles {
    #[serde(default)]
    disabled: Vec<String>,
}

impl GroupToggles {
    fn path(ctx: &CliCtx) -> std::path::PathBuf {
        ctx.state_dir.join("tool-groups.json")
    }

    fn load(ctx: &CliCtx) -> Self {
        std::fs::read_to_string(Self::path(ctx))
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    fn save(&self, ctx: &CliCtx) -> Result<(), CommandError> {
        std::fs::create_dir_all(&ctx.state_dir)?;
        std::fs::write(
            Self::path(ctx),
            serde_json::to_string_pretty(self)
                .map_err(|e| CommandError::backend(e.to_string()))?,
        )?;
        Ok(())
    }
}

pub async fn handle(command: ServerCommand, ctx: &CliCtx) -> CmdResult {
    match command {
        ServerCommand::Start => serve(ctx).await,

        ServerCommand::Status => {
            let toggles = GroupToggles::load(ctx);
            let tools = bridge::tool_defs(&crate::Cli::command());
            Ok(json!({
                "tools": tools.len(),
                "disabled_groups": toggles.disabled,
            }))
        }

        ServerCommand::Tools => {
            let tools = bridge::tool_defs(&crate::Cli::command());
            Ok(serde_json::to_value(tools).map_err(|e| CommandError::backend(e.to_string()))?)
        }

        ServerCommand::Setup => {
            let path = ctx.state_dir.join("tool-server.json");
            std::fs::create_dir_all(&ctx.state_dir)?;
            let snippet = json!({
                "muster": { "command": "muster", "args": ["server", "start"] }
            });
            std::fs::write(
                &path,
                serde_json::to_string_pretty(&snippet)
                    .map_err(|e| CommandError::backend(e.to_string()))?,
            )?;
            Ok(json!({ "written": path.display().to_string() }))
        }

        ServerCommand::Toggle { group } => {
            let known: Vec<String> = bridge::tool_defs(&crate::Cli::command())
                .into_iter()
                .map(|t| t.name)
                .collect();
            if !known.contains(&group) {
                return Err(CommandError::not_found(format!(
                    "no tool group '{group}' (known: {})",
                    known.join(", ")
                )));
            }

            let mut toggles = GroupToggles::load(ctx);
            let enabled = if let Some(pos) = toggles.disabled.iter().position(|g| *g == group) {
                toggles.disabled.remove(pos);
                true
            } else {
                toggles.disabled.push(group.clone());
                false
            };
            toggles.save(ctx)?;
            Ok(json!({ "group": group, "enabled": enabled }))
        }
    }
}

/// The serve loop: one JSON invocation per input line, one envelope per
/// output line. `{"list_tools": true}` returns the tool definitions.
async fn serve(ctx: &CliCtx) -> CmdResult {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CommandError::backend(e.to_string()))?
    {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let reply = handle_line(&line, ctx).await;
        let serialized = serde_json::to_string(&reply)
            .unwrap_or_else(|_| "{\"success\":false}".to_string());
        stdout
            .write_all(format!("{serialized}\n").as_bytes())
            .await
            .map_err(|e| CommandError::backend(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| CommandError::backend(e.to_string()))?;
    }

    Ok(json!({ "server": "stopped" }))
}

async fn handle_line(line: &str, ctx: &CliCtx) -> serde_json::Value {
    // Tool listing request.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
        if value.get("list_tools").and_then(|v| v.as_bool()) == Some(true) {
            let tools = bridge::tool_defs(&crate::Cli::command());
            return json!({ "tools": tools });
        }
    }

    let invocation: ToolInvocation = match serde_json::from_str(line) {
        Ok(invocation) => invocation,
        Err(e) => {
            let envelope = Envelope::err(
                "server.invoke",
                format!("unparseable invocation: {e}"),
                "validation_error",
                None,
            );
            return serde_json::to_value(envelope).unwrap_or_default();
        }
    };

    let envelope = invoke(invocation, ctx).await;
    serde_json::to_value(envelope).unwrap_or_default()
}

/// Run one bridge invocation end to end.
pub async fn invoke(invocation: ToolInvocation, ctx: &CliCtx) -> Envelope {
    let command = format!("{}.{}", invocation.group, invocation.action);

    let toggles = GroupToggles::load(ctx);
    if toggles.disabled.contains(&invocation.group) {
        return Envelope::err(
            command,
            format!("tool group '{}' is disabled", invocation.group),
            "validation_error",
            None,
        );
    }

    let root = crate::Cli::command();
    let argv = match bridge::prepare(&root, &invocation) {
        Ok(argv) => argv,
        Err(envelope) => return envelope,
    };

    let cli = match <crate::Cli as clap::Parser>::try_parse_from(&argv) {
        Ok(cli) => cli,
        Err(e) => return bridge::parse_error_envelope(command, &e),
    };

    let Some(parsed) = cli.command else {
        return Envelope::err(command, "nothing to execute", "validation_error", None);
    };
    match Box::pin(crate::dispatch(parsed, ctx)).await {
        Ok(data) => Envelope::ok(command, data),
        Err(e) => {
            let error_type = e.error_type().to_string();
            Envelope::err(command, e.to_string(), error_type, None)
        }
    }
}
