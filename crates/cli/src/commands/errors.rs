// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error-log commands (reads the daemon's in-memory log)

use super::{check_response, CliCtx, CmdResult, CommandError};
use crate::client::DaemonClient;
use clap::{Args, Subcommand};
use muster_daemon::{Request, Response};
use serde_json::json;

#[derive(Args)]
pub struct ErrorsArgs {
    #[command(subcommand)]
    pub command: ErrorsCommand,
}

#[derive(Subcommand)]
pub enum ErrorsCommand {
    /// Recent errors, newest first
    List {
        /// Maximum entries
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// One error entry
    Show {
        /// Entry id
        id: u64,
    },
    /// Clear the error log
    Clear,
    /// Error counts by component
    Summary,
}

pub async fn handle(command: ErrorsCommand, _ctx: &CliCtx) -> CmdResult {
    let client = DaemonClient::for_query().await?;
    match command {
        ErrorsCommand::List { limit } => {
            match check_response(client.request(Request::ErrorsList { limit }).await?)? {
                Response::Errors { entries } => Ok(json!(entries
                    .into_iter()
                    .map(entry_json)
                    .collect::<Vec<_>>())),
                other => Err(unexpected(other)),
            }
        }

        ErrorsCommand::Show { id } => {
            match check_response(client.request(Request::ErrorsShow { id }).await?)? {
                Response::Errors { entries } => match entries.into_iter().next() {
                    Some(entry) => Ok(entry_json(entry)),
                    None => Err(CommandError::not_found(format!("no error entry {id}"))),
                },
                other => Err(unexpected(other)),
            }
        }

        ErrorsCommand::Clear => {
            match check_response(client.request(Request::ErrorsClear).await?)? {
                Response::Cleared { count } => Ok(json!({ "cleared": count })),
                other => Err(unexpected(other)),
            }
        }

        ErrorsCommand::Summary => {
            match check_response(client.request(Request::ErrorsSummary).await?)? {
                Response::ErrorsSummary { summary } => Ok(json!(summary
                    .into_iter()
                    .map(|(component, count)| json!({
                        "component": component,
                        "errors": count,
                    }))
                    .collect::<Vec<_>>())),
                other => Err(unexpected(other)),
            }
        }
    }
}

fn entry_json(entry: muster_engine::ErrorEntry) -> serde_json::Value {
    json!({
        "id": entry.id,
        "target": entry.target.map(|t| t.to_string()),
        "component": entry.component,
        "message": entry.message,
        "occurred_at": entry.occurred_at,
    })
}

fn unexpected(response: Response) -> CommandError {
    CommandError::backend(format!("unexpected daemon response: {response:?}"))
}
