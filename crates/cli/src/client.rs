// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands.

use crate::daemon_process;
use muster_daemon::wire::{self, DEFAULT_TIMEOUT};
use muster_daemon::{ProtocolError, Request, Response};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixStream;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running (start it with `muster daemon start`)")]
    DaemonNotRunning,

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine state directory")]
    NoStateDir,
}

/// Polling interval while waiting for the daemon socket to appear.
fn poll_interval() -> Duration {
    Duration::from_millis(50)
}

/// How long to wait for a started daemon to accept connections.
fn connect_timeout() -> Duration {
    Duration::from_secs(5)
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For action commands: auto-start the daemon when it is not running.
    pub async fn for_action() -> Result<Self, ClientError> {
        let client = Self::at_default_socket()?;
        if client.probe().await {
            return Ok(client);
        }

        daemon_process::start_daemon_background()?;
        let deadline = tokio::time::Instant::now() + connect_timeout();
        loop {
            if client.probe().await {
                return Ok(client);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ClientError::DaemonStartTimeout);
            }
            tokio::time::sleep(poll_interval()).await;
        }
    }

    /// For query commands: connect only, never start anything.
    pub async fn for_query() -> Result<Self, ClientError> {
        let client = Self::at_default_socket()?;
        if !client.probe().await {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(client)
    }

    fn at_default_socket() -> Result<Self, ClientError> {
        Ok(Self {
            socket_path: daemon_process::daemon_socket()?,
        })
    }

    /// One request, one response.
    pub async fn request(&self, request: Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|_| ClientError::DaemonNotRunning)?;
        wire::write_with_timeout(&mut stream, &request, DEFAULT_TIMEOUT).await?;
        // Submissions hold the connection through staging delays and
        // retries; allow for the worst case before giving up.
        let read_timeout = match &request {
            Request::AgentSend { .. } | Request::Recover { .. } => Duration::from_secs(60),
            _ => DEFAULT_TIMEOUT,
        };
        let response = wire::read_with_timeout(&mut stream, read_timeout).await?;
        Ok(response)
    }

    async fn probe(&self) -> bool {
        matches!(self.request(Request::Ping).await, Ok(Response::Pong))
    }
}
