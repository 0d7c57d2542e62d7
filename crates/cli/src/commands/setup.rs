// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment checks and config scaffolding

use super::{CliCtx, CmdResult, CommandError};
use clap::{Args, Subcommand};
use serde_json::json;

#[derive(Args)]
pub struct SetupArgs {
    #[command(subcommand)]
    pub command: SetupCommand,
}

#[derive(Subcommand)]
pub enum SetupCommand {
    /// Run every setup step
    All,
    /// Check the agent REPL command is runnable
    ClaudeCode,
    /// Write the tool-server client snippet
    Mcp,
    /// Write VS Code task definitions for attaching to agents
    Vscode,
    /// Check tmux and write a minimal tmux config note
    Tmux,
    /// Quick environment check
    Check,
    /// Full requirements report
    CheckRequirements,
}

pub async fn handle(command: SetupCommand, ctx: &CliCtx) -> CmdResult {
    match command {
        SetupCommand::All => {
            let requirements = requirements(ctx)?;
            let mcp = write_mcp_snippet(ctx)?;
            let vscode = write_vscode_tasks(ctx)?;
            Ok(json!({
                "requirements": requirements,
                "mcp": mcp,
                "vscode": vscode,
            }))
        }

        SetupCommand::ClaudeCode => {
            let command = muster_core::MonitorConfig::default().agent_command;
            let binary = command
                .split_whitespace()
                .next()
                .unwrap_or(command.as_str())
                .to_string();
            Ok(json!({
                "agent_command": command,
                "on_path": binary_on_path(&binary),
            }))
        }

        SetupCommand::Mcp => write_mcp_snippet(ctx),

        SetupCommand::Vscode => write_vscode_tasks(ctx),

        SetupCommand::Tmux => Ok(json!({
            "tmux_on_path": binary_on_path("tmux"),
            "note": "muster drives a plain tmux server; no special tmux.conf is required",
        })),

        SetupCommand::Check => {
            let tmux = binary_on_path("tmux");
            if !tmux {
                return Err(CommandError::backend("tmux not found on PATH"));
            }
            Ok(json!({ "ok": true }))
        }

        SetupCommand::CheckRequirements => requirements(ctx),
    }
}

fn requirements(ctx: &CliCtx) -> CmdResult {
    let state_writable = std::fs::create_dir_all(&ctx.state_dir).is_ok();
    Ok(json!({
        "tmux_on_path": binary_on_path("tmux"),
        "musterd_on_path": binary_on_path("musterd"),
        "state_dir": ctx.state_dir.display().to_string(),
        "state_dir_writable": state_writable,
        "agent_command": muster_core::MonitorConfig::default().agent_command,
    }))
}

fn write_mcp_snippet(ctx: &CliCtx) -> CmdResult {
    let path = ctx.state_dir.join("tool-server.json");
    std::fs::create_dir_all(&ctx.state_dir)?;
    let snippet = json!({
        "muster": {
            "command": "muster",
            "args": ["server", "start"],
        }
    });
    std::fs::write(&path, serde_json::to_string_pretty(&snippet).map_err(to_backend)?)?;
    Ok(json!({ "written": path.display().to_string() }))
}

fn write_vscode_tasks(ctx: &CliCtx) -> CmdResult {
    let path = ctx.state_dir.join("vscode-tasks.json");
    std::fs::create_dir_all(&ctx.state_dir)?;
    let tasks = json!({
        "version": "2.0.0",
        "tasks": [{
            "label": "muster: attach to agent",
            "type": "shell",
            "command": "muster agent attach ${input:target}",
        }],
        "inputs": [{
            "id": "target",
            "type": "promptString",
            "description": "Agent target (session:window)",
        }],
    });
    std::fs::write(&path, serde_json::to_string_pretty(&tasks).map_err(to_backend)?)?;
    Ok(json!({ "written": path.display().to_string() }))
}

fn binary_on_path(name: &str) -> bool {
    std::process::Command::new(name)
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn to_backend(e: serde_json::Error) -> CommandError {
    CommandError::backend(e.to_string())
}
