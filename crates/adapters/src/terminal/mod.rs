// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal multiplexer driver.
//!
//! The multiplexer is opaque: the rest of the system sees only this trait.
//! Drivers are pooled; callers hold leases, never raw handles.

mod tmux;

pub use tmux::TmuxDriver;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DriverCall, FakeDriver, FakePane};

use async_trait::async_trait;
use muster_core::AgentTarget;
use std::path::Path;
use thiserror::Error;

/// Errors from terminal driver operations.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// The call exceeded the driver's hard timeout.
    #[error("terminal call timed out: {0}")]
    Timeout(String),
    /// The multiplexer rejected or failed the call.
    #[error("terminal backend error: {0}")]
    Backend(String),
}

/// Named keys the submission protocol is allowed to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    CtrlC,
    CtrlU,
}

impl Key {
    /// tmux `send-keys` name for the key.
    pub fn name(&self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::CtrlC => "C-c",
            Key::CtrlU => "C-u",
        }
    }
}

/// One window as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub index: u32,
    pub name: String,
}

/// Adapter over the terminal multiplexer.
///
/// Every call has a hard timeout; a minimum interval between outbound calls
/// is enforced per handle so a hot monitoring loop cannot overload the
/// multiplexer.
#[async_trait]
pub trait TerminalDriver: Send + Sync + 'static {
    /// Session names, in the multiplexer's listing order.
    async fn list_sessions(&self) -> Result<Vec<String>, TerminalError>;

    /// Windows of a session, in index order.
    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, TerminalError>;

    /// Most recent `max_lines` rendered lines of the target's pane.
    async fn capture_pane(
        &self,
        target: &AgentTarget,
        max_lines: u32,
    ) -> Result<String, TerminalError>;

    /// Create a detached session whose first window runs `command`.
    /// Succeeds silently when the session already exists.
    async fn create_session(
        &self,
        session: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<(), TerminalError>;

    /// Create a window running `command`, returning its target.
    async fn create_window(
        &self,
        session: &str,
        name: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<AgentTarget, TerminalError>;

    async fn kill_window(&self, target: &AgentTarget) -> Result<(), TerminalError>;

    /// Recreate a window at an exact index (used by recovery so the
    /// replacement keeps the dead agent's address).
    async fn respawn_window(
        &self,
        target: &AgentTarget,
        name: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<(), TerminalError>;

    /// Deliver `text` as a single literal payload (no key interpretation).
    async fn send_keys_literal(
        &self,
        target: &AgentTarget,
        text: &str,
    ) -> Result<(), TerminalError>;

    async fn send_key(&self, target: &AgentTarget, key: Key) -> Result<(), TerminalError>;

    /// Whether the multiplexer is reachable.
    async fn health(&self) -> bool;
}
