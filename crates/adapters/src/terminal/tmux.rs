// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux terminal driver.

use super::{Key, TerminalDriver, TerminalError, WindowInfo};
use async_trait::async_trait;
use muster_core::AgentTarget;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;

/// Hard timeout for any single tmux invocation.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum interval between outbound tmux calls per handle.
const MIN_CALL_INTERVAL: Duration = Duration::from_millis(50);

/// Tmux-backed driver. One handle paces its own outbound calls; pooled
/// handles therefore pace independently.
pub struct TmuxDriver {
    last_call: Arc<tokio::sync::Mutex<Instant>>,
}

impl TmuxDriver {
    pub fn new() -> Self {
        Self {
            last_call: Arc::new(tokio::sync::Mutex::new(
                Instant::now() - MIN_CALL_INTERVAL,
            )),
        }
    }

    /// Run one tmux command with pacing and the hard timeout applied.
    async fn run(&self, args: &[&str]) -> Result<std::process::Output, TerminalError> {
        self.pace().await;

        let label = args.first().copied().unwrap_or("tmux");
        let output = tokio::time::timeout(CALL_TIMEOUT, Command::new("tmux").args(args).output())
            .await
            .map_err(|_| TerminalError::Timeout(label.to_string()))?
            .map_err(|e| TerminalError::Backend(e.to_string()))?;

        Ok(output)
    }

    /// Like [`run`], but failure exit status is a backend error carrying stderr.
    async fn run_checked(&self, args: &[&str]) -> Result<String, TerminalError> {
        let output = self.run(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let label = args.first().copied().unwrap_or("tmux");
            return Err(TerminalError::Backend(format!("{label}: {stderr}")));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        let elapsed = last.elapsed();
        if elapsed < MIN_CALL_INTERVAL {
            tokio::time::sleep(MIN_CALL_INTERVAL - elapsed).await;
        }
        *last = Instant::now();
    }
}

impl Default for TmuxDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TerminalDriver for TmuxDriver {
    async fn list_sessions(&self) -> Result<Vec<String>, TerminalError> {
        let output = self.run(&["list-sessions", "-F", "#{session_name}"]).await?;
        // `tmux list-sessions` exits non-zero when no server is running;
        // that is an empty fleet, not an error.
        if !output.status.success() {
            return Ok(Vec::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, TerminalError> {
        let stdout = self
            .run_checked(&[
                "list-windows",
                "-t",
                session,
                "-F",
                "#{window_index}\t#{window_name}",
            ])
            .await?;

        let mut windows = Vec::new();
        for line in stdout.lines() {
            let Some((index, name)) = line.split_once('\t') else {
                continue;
            };
            let Ok(index) = index.parse::<u32>() else {
                tracing::warn!(session, line, "unparseable window index from tmux");
                continue;
            };
            windows.push(WindowInfo {
                index,
                name: name.to_string(),
            });
        }
        Ok(windows)
    }

    async fn capture_pane(
        &self,
        target: &AgentTarget,
        max_lines: u32,
    ) -> Result<String, TerminalError> {
        let addr = target.to_string();
        let start = format!("-{}", max_lines);
        self.run_checked(&["capture-pane", "-t", &addr, "-p", "-S", &start])
            .await
    }

    async fn create_session(
        &self,
        session: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<(), TerminalError> {
        let exists = self.run(&["has-session", "-t", session]).await?;
        if exists.status.success() {
            return Ok(());
        }
        let cwd = cwd.display().to_string();
        self.run_checked(&["new-session", "-d", "-s", session, "-c", &cwd, command])
            .await?;
        Ok(())
    }

    async fn create_window(
        &self,
        session: &str,
        name: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<AgentTarget, TerminalError> {
        let cwd = cwd.display().to_string();
        let stdout = self
            .run_checked(&[
                "new-window",
                "-t",
                session,
                "-n",
                name,
                "-c",
                &cwd,
                "-P",
                "-F",
                "#{session_name}:#{window_index}",
                command,
            ])
            .await?;

        let printed = stdout.trim();
        printed
            .parse()
            .map_err(|_| TerminalError::Backend(format!("unparseable new-window target: {printed}")))
    }

    async fn kill_window(&self, target: &AgentTarget) -> Result<(), TerminalError> {
        let addr = target.to_string();
        let output = self.run(&["kill-window", "-t", &addr]).await?;
        if !output.status.success() {
            // Window may already be gone; log and carry on.
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(target = %addr, stderr = %stderr, "kill-window failed (window gone?)");
        }
        Ok(())
    }

    async fn respawn_window(
        &self,
        target: &AgentTarget,
        name: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<(), TerminalError> {
        let addr = target.to_string();
        let cwd = cwd.display().to_string();
        // -k replaces any window still occupying the index.
        self.run_checked(&[
            "new-window", "-k", "-t", &addr, "-n", name, "-c", &cwd, command,
        ])
        .await?;
        Ok(())
    }

    async fn send_keys_literal(
        &self,
        target: &AgentTarget,
        text: &str,
    ) -> Result<(), TerminalError> {
        if text.is_empty() {
            return Ok(());
        }
        let addr = target.to_string();
        // -l = literal mode (no key name interpretation)
        // -- = end of options (handles text starting with -)
        self.run_checked(&["send-keys", "-t", &addr, "-l", "--", text])
            .await?;
        Ok(())
    }

    async fn send_key(&self, target: &AgentTarget, key: Key) -> Result<(), TerminalError> {
        let addr = target.to_string();
        self.run_checked(&["send-keys", "-t", &addr, key.name()])
            .await?;
        Ok(())
    }

    async fn health(&self) -> bool {
        matches!(self.run(&["list-sessions"]).await, Ok(output) if output.status.success())
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
