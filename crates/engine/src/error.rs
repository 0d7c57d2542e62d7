// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine.

use muster_adapters::TerminalError;
use thiserror::Error;

/// Errors that can occur inside the monitoring and control plane.
///
/// Per-target errors are isolated by the cycle executor and never abort a
/// cycle; initialization errors are fatal to the daemon.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("terminal error: {0}")]
    Terminal(#[from] TerminalError),

    #[error("pool error: {0}")]
    Pool(#[from] crate::pool::PoolError),

    #[error("agent not found: {0}")]
    NotFound(String),

    #[error("submission failed for {target}: {reason}")]
    SubmissionFailed { target: String, reason: String },

    #[error("agent at {target} did not initialize within {timeout_secs}s")]
    InitTimeout { target: String, timeout_secs: u64 },

    #[error("recovery failed for {target}: {reason}")]
    RecoveryFailure { target: String, reason: String },

    #[error("snapshot error: {0}")]
    Snapshot(#[from] crate::snapshot::SnapshotError),

    #[error("monitor is paused for a rate-limit window")]
    RateLimited,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EngineError {
    /// Envelope `error_type` string for the uniform response shape.
    pub fn error_type(&self) -> &'static str {
        match self {
            EngineError::Terminal(_) | EngineError::Pool(_) => "backend_error",
            EngineError::NotFound(_) => "not_found",
            EngineError::SubmissionFailed { .. }
            | EngineError::InitTimeout { .. }
            | EngineError::RecoveryFailure { .. }
            | EngineError::Snapshot(_) => "backend_error",
            EngineError::RateLimited => "rate_limited",
            EngineError::InvalidRequest(_) => "validation_error",
        }
    }
}
