// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations, one module per tool group.

pub mod agent;
pub mod context;
pub mod daemon;
pub mod direct;
pub mod errors;
pub mod monitor;
pub mod orchestrator;
pub mod pm;
pub mod pubsub;
pub mod recovery;
pub mod server;
pub mod session;
pub mod setup;
pub mod spawn;
pub mod tasks;
pub mod team;

use crate::client::ClientError;
use muster_core::{AgentTarget, TargetParseError};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Command failures, keyed to the response envelope's error taxonomy.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidTarget(#[from] TargetParseError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Backend(String),

    /// An error response relayed from the daemon, taxonomy type intact.
    #[error("{message}")]
    Daemon { error_type: String, message: String },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Terminal(#[from] muster_adapters::TerminalError),

    #[error(transparent)]
    Engine(#[from] muster_engine::EngineError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CommandError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Envelope `error_type` string for this failure.
    pub fn error_type(&self) -> &str {
        match self {
            CommandError::InvalidTarget(_) => "invalid_target_format",
            CommandError::NotFound(_) => "not_found",
            CommandError::Validation(_) => "validation_error",
            CommandError::Backend(_)
            | CommandError::Client(_)
            | CommandError::Terminal(_)
            | CommandError::Io(_) => "backend_error",
            CommandError::Daemon { error_type, .. } => error_type,
            CommandError::Engine(e) => e.error_type(),
        }
    }
}

/// Every handler returns envelope-ready data.
pub type CmdResult = Result<Value, CommandError>;

/// Shared command context.
pub struct CliCtx {
    pub state_dir: PathBuf,
}

impl CliCtx {
    pub fn load() -> Result<Self, CommandError> {
        let state_dir = crate::daemon_process::state_dir()?;
        Ok(Self { state_dir })
    }
}

pub fn parse_target(raw: &str) -> Result<AgentTarget, CommandError> {
    Ok(raw.parse::<AgentTarget>()?)
}

/// Map a daemon error response into a command error; pass others through.
pub fn check_response(
    response: muster_daemon::Response,
) -> Result<muster_daemon::Response, CommandError> {
    match response {
        muster_daemon::Response::Error {
            message,
            error_type,
        } => Err(CommandError::Daemon {
            error_type,
            message,
        }),
        other => Ok(other),
    }
}
