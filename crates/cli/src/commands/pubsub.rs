// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pubsub message-log commands

use super::{CliCtx, CmdResult, CommandError};
use crate::store::PubsubStore;
use clap::{Args, Subcommand};
use serde_json::json;

#[derive(Args)]
pub struct PubsubArgs {
    #[command(subcommand)]
    pub command: PubsubCommand,
}

#[derive(Subcommand)]
pub enum PubsubCommand {
    /// Publish a message to a channel
    Publish {
        /// Channel name
        channel: String,
        /// Message body
        message: String,
        /// Sender label recorded with the message
        #[arg(long, default_value = "cli")]
        sender: String,
    },
    /// Read recent messages from a channel
    Read {
        /// Channel name
        channel: String,
        /// Maximum messages to return
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Poll a channel for messages newer than the last seen id
    Subscribe {
        /// Channel name
        channel: String,
        /// Only messages with id greater than this
        #[arg(long, default_value = "0")]
        after: u64,
    },
    /// Channels and message counts
    Status,
    /// Delete a channel's log
    Clear {
        /// Channel name
        channel: String,
    },
    /// Aggregate statistics
    Stats,
    /// Messages since a timestamp (RFC 3339)
    Query {
        /// Channel name
        channel: String,
        /// Lower bound, e.g. 2026-01-01T00:00:00Z
        #[arg(long)]
        since: String,
    },
    /// Substring search across all channels
    Search {
        /// Search pattern (case-insensitive)
        pattern: String,
    },
}

pub async fn handle(command: PubsubCommand, ctx: &CliCtx) -> CmdResult {
    let store = PubsubStore::new(&ctx.state_dir);
    match command {
        PubsubCommand::Publish {
            channel,
            message,
            sender,
        } => {
            let published = store.publish(&channel, &sender, &message)?;
            Ok(json!({
                "channel": channel,
                "id": published.id,
                "published_at": published.published_at,
            }))
        }

        PubsubCommand::Read { channel, limit } => {
            let messages = store.read(&channel, limit)?;
            Ok(messages_json(messages))
        }

        PubsubCommand::Subscribe { channel, after } => {
            let fresh: Vec<_> = store
                .read(&channel, usize::MAX)?
                .into_iter()
                .filter(|m| m.id > after)
                .collect();
            let last_id = fresh.last().map(|m| m.id).unwrap_or(after);
            Ok(json!({
                "messages": messages_json(fresh),
                "last_id": last_id,
            }))
        }

        PubsubCommand::Status => {
            let channels = store.channels()?;
            Ok(json!(channels
                .into_iter()
                .map(|(channel, count)| json!({ "channel": channel, "messages": count }))
                .collect::<Vec<_>>()))
        }

        PubsubCommand::Clear { channel } => {
            let cleared = store.clear(&channel)?;
            Ok(json!({ "channel": channel, "cleared": cleared }))
        }

        PubsubCommand::Stats => {
            let channels = store.channels()?;
            let total: usize = channels.iter().map(|(_, n)| n).sum();
            Ok(json!({
                "channels": channels.len(),
                "messages": total,
            }))
        }

        PubsubCommand::Query { channel, since } => {
            let since = since
                .parse::<chrono::DateTime<chrono::Utc>>()
                .map_err(|e| CommandError::validation(format!("bad --since timestamp: {e}")))?;
            Ok(messages_json(store.query(&channel, since)?))
        }

        PubsubCommand::Search { pattern } => Ok(messages_json(store.search(&pattern)?)),
    }
}

fn messages_json(messages: Vec<crate::store::PubsubMessage>) -> serde_json::Value {
    json!(messages
        .into_iter()
        .map(|m| json!({
            "id": m.id,
            "channel": m.channel,
            "sender": m.sender,
            "body": m.body,
            "published_at": m.published_at,
        }))
        .collect::<Vec<_>>())
}
