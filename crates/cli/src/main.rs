// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! muster - fleet orchestrator for terminal-hosted AI coding agents

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod bridge;
mod client;
mod commands;
mod daemon_process;
mod output;
mod reflect;
mod store;

use clap::{Parser, Subcommand};
use commands::{
    agent, context, daemon, errors, monitor, orchestrator, pm, pubsub, recovery, server, session,
    setup, spawn, tasks, team, CliCtx, CmdResult, CommandError,
};
use output::{Envelope, OutputFormat};
use serde_json::json;

#[derive(Parser)]
#[command(
    name = "muster",
    version,
    about = "Muster - orchestrate a fleet of terminal-hosted AI coding agents"
)]
pub struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Agent management
    Agent(agent::AgentArgs),
    /// Monitoring loop control
    Monitor(monitor::MonitorArgs),
    /// Whole-team operations
    Team(team::TeamArgs),
    /// Spawn agents
    Spawn(spawn::SpawnArgs),
    /// Project-manager operations
    Pm(pm::PmArgs),
    /// Orchestrator operations
    Orchestrator(orchestrator::OrchestratorArgs),
    /// Role briefings
    Context(context::ContextArgs),
    /// Environment checks and scaffolding
    Setup(setup::SetupArgs),
    /// Automatic-recovery control
    Recovery(recovery::RecoveryArgs),
    /// Session listing and attach
    Session(session::SessionArgs),
    /// Channel message logs
    Pubsub(pubsub::PubsubArgs),
    /// Daemon process management
    Daemon(daemon::DaemonArgs),
    /// Task records
    Tasks(tasks::TasksArgs),
    /// Recent monitor errors
    Errors(errors::ErrorsArgs),
    /// Tool-invocation server
    Server(server::ServerArgs),
    /// One-screen overview of the daemon and fleet
    Status,
}

impl Commands {
    /// Dotted command path for the response envelope, e.g. `agent.send`.
    fn dotted_path(&self) -> String {
        use commands::*;
        match self {
            Commands::Agent(a) => format!(
                "agent.{}",
                match &a.command {
                    agent::AgentCommand::List => "list",
                    agent::AgentCommand::Status => "status",
                    agent::AgentCommand::Info { .. } => "info",
                    agent::AgentCommand::Send { .. } => "send",
                    agent::AgentCommand::Message { .. } => "message",
                    agent::AgentCommand::Kill { .. } => "kill",
                    agent::AgentCommand::Restart { .. } => "restart",
                    agent::AgentCommand::Attach { .. } => "attach",
                    agent::AgentCommand::Deploy { .. } => "deploy",
                    agent::AgentCommand::KillAll { .. } => "kill-all",
                }
            ),
            Commands::Monitor(a) => format!(
                "monitor.{}",
                match &a.command {
                    monitor::MonitorCommand::Start => "start",
                    monitor::MonitorCommand::Stop => "stop",
                    monitor::MonitorCommand::Status => "status",
                    monitor::MonitorCommand::Dashboard => "dashboard",
                    monitor::MonitorCommand::Logs { .. } => "logs",
                    monitor::MonitorCommand::Metrics => "metrics",
                    monitor::MonitorCommand::RecoveryStart => "recovery-start",
                    monitor::MonitorCommand::RecoveryStop => "recovery-stop",
                    monitor::MonitorCommand::RecoveryStatus => "recovery-status",
                    monitor::MonitorCommand::Performance => "performance",
                }
            ),
            Commands::Team(a) => format!(
                "team.{}",
                match &a.command {
                    team::TeamCommand::Deploy { .. } => "deploy",
                    team::TeamCommand::List => "list",
                    team::TeamCommand::Status { .. } => "status",
                    team::TeamCommand::Broadcast { .. } => "broadcast",
                    team::TeamCommand::Recover { .. } => "recover",
                }
            ),
            Commands::Spawn(a) => format!(
                "spawn.{}",
                match &a.command {
                    spawn::SpawnCommand::Agent { .. } => "agent",
                    spawn::SpawnCommand::Pm { .. } => "pm",
                    spawn::SpawnCommand::Orchestrator { .. } => "orchestrator",
                }
            ),
            Commands::Pm(a) => format!(
                "pm.{}",
                match &a.command {
                    pm::PmCommand::Status => "status",
                    pm::PmCommand::Message { .. } => "message",
                    pm::PmCommand::Checkin => "checkin",
                    pm::PmCommand::Broadcast { .. } => "broadcast",
                    pm::PmCommand::CustomCheckin { .. } => "custom-checkin",
                    pm::PmCommand::Create { .. } => "create",
                }
            ),
            Commands::Orchestrator(a) => format!(
                "orchestrator.{}",
                match &a.command {
                    orchestrator::OrchestratorCommand::Start { .. } => "start",
                    orchestrator::OrchestratorCommand::Status => "status",
                    orchestrator::OrchestratorCommand::Schedule { .. } => "schedule",
                    orchestrator::OrchestratorCommand::Broadcast { .. } => "broadcast",
                    orchestrator::OrchestratorCommand::List => "list",
                    orchestrator::OrchestratorCommand::Kill { .. } => "kill",
                    orchestrator::OrchestratorCommand::KillAll => "kill-all",
                }
            ),
            Commands::Context(a) => format!(
                "context.{}",
                match &a.command {
                    context::ContextCommand::List => "list",
                    context::ContextCommand::Show { .. } => "show",
                    context::ContextCommand::Spawn { .. } => "spawn",
                    context::ContextCommand::Export { .. } => "export",
                }
            ),
            Commands::Setup(a) => format!(
                "setup.{}",
                match &a.command {
                    setup::SetupCommand::All => "all",
                    setup::SetupCommand::ClaudeCode => "claude-code",
                    setup::SetupCommand::Mcp => "mcp",
                    setup::SetupCommand::Vscode => "vscode",
                    setup::SetupCommand::Tmux => "tmux",
                    setup::SetupCommand::Check => "check",
                    setup::SetupCommand::CheckRequirements => "check-requirements",
                }
            ),
            Commands::Recovery(a) => format!(
                "recovery.{}",
                match &a.command {
                    recovery::RecoveryCommand::Start => "start",
                    recovery::RecoveryCommand::Stop => "stop",
                    recovery::RecoveryCommand::Status => "status",
                    recovery::RecoveryCommand::Test { .. } => "test",
                }
            ),
            Commands::Session(a) => format!(
                "session.{}",
                match &a.command {
                    session::SessionCommand::List => "list",
                    session::SessionCommand::Attach { .. } => "attach",
                }
            ),
            Commands::Pubsub(a) => format!(
                "pubsub.{}",
                match &a.command {
                    pubsub::PubsubCommand::Publish { .. } => "publish",
                    pubsub::PubsubCommand::Read { .. } => "read",
                    pubsub::PubsubCommand::Subscribe { .. } => "subscribe",
                    pubsub::PubsubCommand::Status => "status",
                    pubsub::PubsubCommand::Clear { .. } => "clear",
                    pubsub::PubsubCommand::Stats => "stats",
                    pubsub::PubsubCommand::Query { .. } => "query",
                    pubsub::PubsubCommand::Search { .. } => "search",
                }
            ),
            Commands::Daemon(a) => format!(
                "daemon.{}",
                match &a.command {
                    daemon::DaemonCommand::Start => "start",
                    daemon::DaemonCommand::Stop => "stop",
                    daemon::DaemonCommand::Status => "status",
                    daemon::DaemonCommand::Restart => "restart",
                    daemon::DaemonCommand::Logs { .. } => "logs",
                }
            ),
            Commands::Tasks(a) => format!(
                "tasks.{}",
                match &a.command {
                    tasks::TasksCommand::Create { .. } => "create",
                    tasks::TasksCommand::Status { .. } => "status",
                    tasks::TasksCommand::List { .. } => "list",
                    tasks::TasksCommand::Distribute { .. } => "distribute",
                    tasks::TasksCommand::Export { .. } => "export",
                    tasks::TasksCommand::Archive { .. } => "archive",
                    tasks::TasksCommand::Generate { .. } => "generate",
                }
            ),
            Commands::Errors(a) => format!(
                "errors.{}",
                match &a.command {
                    errors::ErrorsCommand::List { .. } => "list",
                    errors::ErrorsCommand::Show { .. } => "show",
                    errors::ErrorsCommand::Clear => "clear",
                    errors::ErrorsCommand::Summary => "summary",
                }
            ),
            Commands::Server(a) => format!(
                "server.{}",
                match &a.command {
                    server::ServerCommand::Start => "start",
                    server::ServerCommand::Status => "status",
                    server::ServerCommand::Tools => "tools",
                    server::ServerCommand::Setup => "setup",
                    server::ServerCommand::Toggle { .. } => "toggle",
                }
            ),
            Commands::Status => "status".to_string(),
        }
    }
}

/// Dispatch a parsed command. Shared by the CLI entry point and the tool
/// bridge so both surfaces execute identically.
pub async fn dispatch(command: Commands, ctx: &CliCtx) -> CmdResult {
    match command {
        Commands::Agent(args) => agent::handle(args.command, ctx).await,
        Commands::Monitor(args) => monitor::handle(args.command, ctx).await,
        Commands::Team(args) => team::handle(args.command, ctx).await,
        Commands::Spawn(args) => spawn::handle(args.command, ctx).await,
        Commands::Pm(args) => pm::handle(args.command, ctx).await,
        Commands::Orchestrator(args) => orchestrator::handle(args.command, ctx).await,
        Commands::Context(args) => context::handle(args.command, ctx).await,
        Commands::Setup(args) => setup::handle(args.command, ctx).await,
        Commands::Recovery(args) => recovery::handle(args.command, ctx).await,
        Commands::Session(args) => session::handle(args.command, ctx).await,
        Commands::Pubsub(args) => pubsub::handle(args.command, ctx).await,
        Commands::Daemon(args) => daemon::handle(args.command, ctx).await,
        Commands::Tasks(args) => tasks::handle(args.command, ctx).await,
        Commands::Errors(args) => errors::handle(args.command, ctx).await,
        Commands::Server(args) => server::handle(args.command, ctx).await,
        Commands::Status => status_overview().await,
    }
}

/// Top-level `muster status`: daemon liveness plus the agent table.
async fn status_overview() -> CmdResult {
    use crate::client::{ClientError, DaemonClient};
    use muster_daemon::{Request, Response};

    match DaemonClient::for_query().await {
        Ok(client) => {
            let status = monitor::status(&client).await?;
            let agents = match commands::check_response(client.request(Request::AgentList).await?)?
            {
                Response::Agents { agents } => agents,
                other => {
                    return Err(CommandError::backend(format!(
                        "unexpected daemon response: {other:?}"
                    )))
                }
            };
            Ok(json!({
                "daemon": { "running": true, "pid": status.pid, "uptime_secs": status.uptime_secs },
                "monitor": {
                    "running": status.monitor.running,
                    "cycles": status.monitor.cycle_count,
                    "rate_limited": status.monitor.rate_limited,
                },
                "agents": agents.iter().map(|a| json!({
                    "target": a.target.to_string(),
                    "role": a.role.to_string(),
                    "state": a.state.to_string(),
                })).collect::<Vec<_>>(),
            }))
        }
        Err(ClientError::DaemonNotRunning) => Ok(json!({
            "daemon": { "running": false },
            "note": "start monitoring with `muster monitor start`",
        })),
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        // No subcommand: print help like clap would.
        use clap::CommandFactory;
        let _ = Cli::command().print_help();
        println!();
        return Ok(());
    };

    let ctx = match CliCtx::load() {
        Ok(ctx) => ctx,
        Err(e) => return fail(format, "muster", e),
    };

    let path = command.dotted_path();
    match dispatch(command, &ctx).await {
        Ok(data) => {
            match format {
                OutputFormat::Json => {
                    let envelope = Envelope::ok(path, data);
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&envelope)
                            .unwrap_or_else(|_| "{\"success\":true}".to_string())
                    );
                }
                OutputFormat::Text => {
                    let text = output::render_text(&data);
                    if !text.is_empty() {
                        println!("{text}");
                    }
                }
            }
            Ok(())
        }
        Err(e) => fail(format, &path, e),
    }
}

/// Report a command failure in the selected format. JSON mode prints the
/// envelope itself and exits non-zero; text mode hands the error to
/// main's chain formatting.
fn fail(format: OutputFormat, command: &str, error: CommandError) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let envelope = Envelope::err(
                command,
                error.to_string(),
                error.error_type().to_string(),
                None,
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&envelope)
                    .unwrap_or_else(|_| "{\"success\":false}".to_string())
            );
            std::process::exit(1);
        }
        OutputFormat::Text => Err(error.into()),
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, we skip
/// the "Caused by" chain to avoid noisy duplicate output (common when
/// thiserror variants use `#[error(transparent)]`). Otherwise we render the
/// full chain so context isn't lost.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
