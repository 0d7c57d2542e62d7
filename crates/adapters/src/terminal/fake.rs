// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake terminal driver for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Key, TerminalDriver, TerminalError, WindowInfo};
use async_trait::async_trait;
use muster_core::AgentTarget;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Recorded driver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    ListSessions,
    ListWindows { session: String },
    CapturePane { target: AgentTarget, max_lines: u32 },
    CreateSession {
        session: String,
        cwd: PathBuf,
        command: String,
    },
    CreateWindow {
        session: String,
        name: String,
        cwd: PathBuf,
        command: String,
    },
    KillWindow { target: AgentTarget },
    RespawnWindow {
        target: AgentTarget,
        name: String,
        cwd: PathBuf,
        command: String,
    },
    SendKeysLiteral { target: AgentTarget, text: String },
    SendKey { target: AgentTarget, key: Key },
    Health,
}

/// Scripted pane state for one window
#[derive(Debug, Clone, Default)]
pub struct FakePane {
    pub name: String,
    pub text: String,
    /// Draft text shown in the input frame until Enter arrives.
    pub pending_input: String,
}

#[derive(Default)]
struct FakeDriverState {
    // BTreeMap keeps discovery order deterministic across runs.
    panes: BTreeMap<AgentTarget, FakePane>,
    calls: Vec<DriverCall>,
    healthy: bool,
    fail_captures: bool,
    fail_sends: bool,
    capture_delay: Option<Duration>,
    next_window: BTreeMap<String, u32>,
    /// When set, Enter moves pending input into the pane text (REPL echo).
    echo_on_enter: bool,
    /// When set, respawned windows render nothing (simulates a REPL that
    /// never starts).
    respawn_blank: bool,
}

/// Fake terminal driver: scripted panes, recorded calls, failure injection.
#[derive(Clone)]
pub struct FakeDriver {
    inner: Arc<Mutex<FakeDriverState>>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeDriverState {
                healthy: true,
                echo_on_enter: true,
                ..FakeDriverState::default()
            })),
        }
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<DriverCall> {
        self.inner.lock().calls.clone()
    }

    /// Calls touching one target, in order.
    pub fn calls_for(&self, target: &AgentTarget) -> Vec<DriverCall> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                DriverCall::CapturePane { target: t, .. }
                | DriverCall::KillWindow { target: t }
                | DriverCall::SendKeysLiteral { target: t, .. }
                | DriverCall::SendKey { target: t, .. } => t == target,
                _ => false,
            })
            .collect()
    }

    /// Add a window with scripted pane text.
    pub fn add_pane(&self, target: &AgentTarget, name: &str, text: &str) {
        self.inner.lock().panes.insert(
            target.clone(),
            FakePane {
                name: name.to_string(),
                text: text.to_string(),
                pending_input: String::new(),
            },
        );
    }

    pub fn set_pane_text(&self, target: &AgentTarget, text: &str) {
        if let Some(pane) = self.inner.lock().panes.get_mut(target) {
            pane.text = text.to_string();
        }
    }

    pub fn pane(&self, target: &AgentTarget) -> Option<FakePane> {
        self.inner.lock().panes.get(target).cloned()
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.inner.lock().healthy = healthy;
    }

    pub fn fail_captures(&self, fail: bool) {
        self.inner.lock().fail_captures = fail;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.inner.lock().fail_sends = fail;
    }

    /// Delay every capture to simulate a slow multiplexer.
    pub fn set_capture_delay(&self, delay: Duration) {
        self.inner.lock().capture_delay = Some(delay);
    }

    /// When disabled, Enter leaves pending input in the frame (a dropped
    /// submit), which the submitter's verification step must catch.
    pub fn set_echo_on_enter(&self, echo: bool) {
        self.inner.lock().echo_on_enter = echo;
    }

    pub fn set_respawn_blank(&self, blank: bool) {
        self.inner.lock().respawn_blank = blank;
    }
}

#[async_trait]
impl TerminalDriver for FakeDriver {
    async fn list_sessions(&self) -> Result<Vec<String>, TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::ListSessions);
        let mut sessions: Vec<String> = inner
            .panes
            .keys()
            .map(|t| t.session().to_string())
            .collect();
        sessions.dedup();
        Ok(sessions)
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::ListWindows {
            session: session.to_string(),
        });
        Ok(inner
            .panes
            .iter()
            .filter(|(t, _)| t.session() == session)
            .map(|(t, pane)| WindowInfo {
                index: t.window(),
                name: pane.name.clone(),
            })
            .collect())
    }

    async fn capture_pane(
        &self,
        target: &AgentTarget,
        max_lines: u32,
    ) -> Result<String, TerminalError> {
        let delay = {
            let mut inner = self.inner.lock();
            inner.calls.push(DriverCall::CapturePane {
                target: target.clone(),
                max_lines,
            });
            if inner.fail_captures {
                return Err(TerminalError::Backend("capture failed".into()));
            }
            inner.capture_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner.lock();
        let pane = inner
            .panes
            .get(target)
            .ok_or_else(|| TerminalError::Backend(format!("no such window: {target}")))?;
        let mut text = pane.text.clone();
        if !pane.pending_input.is_empty() {
            text.push_str(&format!("\n│ > {}", pane.pending_input));
        }
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(max_lines as usize);
        Ok(lines[start..].join("\n"))
    }

    async fn create_session(
        &self,
        session: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<(), TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::CreateSession {
            session: session.to_string(),
            cwd: cwd.to_path_buf(),
            command: command.to_string(),
        });
        let exists = inner.panes.keys().any(|t| t.session() == session);
        if !exists {
            let target = AgentTarget::new(session, 0)
                .map_err(|e| TerminalError::Backend(e.to_string()))?;
            inner.panes.insert(
                target,
                FakePane {
                    name: session.to_string(),
                    text: format!("$ {command}\n"),
                    pending_input: String::new(),
                },
            );
            inner.next_window.insert(session.to_string(), 1);
        }
        Ok(())
    }

    async fn create_window(
        &self,
        session: &str,
        name: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<AgentTarget, TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::CreateWindow {
            session: session.to_string(),
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            command: command.to_string(),
        });

        let index = {
            let highest = inner
                .panes
                .keys()
                .filter(|t| t.session() == session)
                .map(|t| t.window() + 1)
                .max()
                .unwrap_or(0);
            let reserved = inner.next_window.entry(session.to_string()).or_insert(0);
            let index = (*reserved).max(highest);
            *reserved = index + 1;
            index
        };

        let target = AgentTarget::new(session, index)
            .map_err(|e| TerminalError::Backend(e.to_string()))?;
        inner.panes.insert(
            target.clone(),
            FakePane {
                name: name.to_string(),
                text: String::new(),
                pending_input: String::new(),
            },
        );
        Ok(target)
    }

    async fn kill_window(&self, target: &AgentTarget) -> Result<(), TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::KillWindow {
            target: target.clone(),
        });
        inner.panes.remove(target);
        Ok(())
    }

    async fn respawn_window(
        &self,
        target: &AgentTarget,
        name: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<(), TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::RespawnWindow {
            target: target.clone(),
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            command: command.to_string(),
        });
        let text = if inner.respawn_blank {
            String::new()
        } else {
            format!("$ {command}\n")
        };
        inner.panes.insert(
            target.clone(),
            FakePane {
                name: name.to_string(),
                text,
                pending_input: String::new(),
            },
        );
        Ok(())
    }

    async fn send_keys_literal(
        &self,
        target: &AgentTarget,
        text: &str,
    ) -> Result<(), TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::SendKeysLiteral {
            target: target.clone(),
            text: text.to_string(),
        });
        if inner.fail_sends {
            return Err(TerminalError::Backend("send failed".into()));
        }
        match inner.panes.get_mut(target) {
            Some(pane) => {
                pane.pending_input.push_str(text);
                Ok(())
            }
            None => Err(TerminalError::Backend(format!("no such window: {target}"))),
        }
    }

    async fn send_key(&self, target: &AgentTarget, key: Key) -> Result<(), TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::SendKey {
            target: target.clone(),
            key,
        });
        if inner.fail_sends {
            return Err(TerminalError::Backend("send failed".into()));
        }
        let echo = inner.echo_on_enter;
        match inner.panes.get_mut(target) {
            Some(pane) => {
                match key {
                    Key::CtrlC | Key::CtrlU => pane.pending_input.clear(),
                    Key::Enter => {
                        if echo && !pane.pending_input.is_empty() {
                            let submitted = std::mem::take(&mut pane.pending_input);
                            pane.text.push_str(&format!("\n> {}", submitted));
                        }
                    }
                }
                Ok(())
            }
            None => Err(TerminalError::Backend(format!("no such window: {target}"))),
        }
    }

    async fn health(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Health);
        inner.healthy
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
