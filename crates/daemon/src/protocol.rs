// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between the `muster` CLI and `musterd`.

use muster_core::{AgentRecord, Event, SubmitOutcome};
use muster_engine::{ErrorEntry, MonitorStatus};
use serde::{Deserialize, Serialize};

/// Request from CLI to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Daemon + monitor status
    Status,

    /// Resume the monitoring loop if it is stopped
    MonitorStart,

    /// Stop the monitoring loop (daemon stays up for queries)
    MonitorStop,

    /// All known agent records
    AgentList,

    /// One agent record
    AgentInfo { target: String },

    /// Submit a message into an agent's REPL
    AgentSend {
        target: String,
        message: String,
        /// Optional staging-delay hint in milliseconds
        #[serde(default)]
        delay_hint_ms: Option<u64>,
    },

    /// Kill an agent window (no respawn)
    AgentKill { target: String },

    /// Kill and respawn an agent, re-briefing it
    Recover { target: String },

    /// Toggle automatic crash recovery
    RecoveryEnable { enabled: bool },

    /// Recent error-log entries
    ErrorsList { limit: usize },

    /// One error-log entry
    ErrorsShow { id: u64 },

    /// Clear the error log
    ErrorsClear,

    /// Error counts by component
    ErrorsSummary,

    /// Request daemon shutdown
    Shutdown,
}

/// Response from daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Pong,
    Hello { version: String },
    Status(Box<StatusData>),
    Agents { agents: Vec<AgentRecord> },
    Agent { agent: Box<AgentRecord> },
    Submitted { outcome: SubmitOutcome },
    Events { events: Vec<Event> },
    Errors { entries: Vec<ErrorEntry> },
    ErrorsSummary { summary: Vec<(String, usize)> },
    Cleared { count: usize },
    Error { message: String, error_type: String },
}

/// Daemon status payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusData {
    pub version: String,
    pub pid: u32,
    pub uptime_secs: u64,
    pub monitor: MonitorStatus,
}

impl Response {
    pub fn error(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
            error_type: error_type.into(),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
