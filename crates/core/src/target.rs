// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent addressing.
//!
//! An [`AgentTarget`] names one terminal-multiplexer window in the form
//! `session:window`. The session name is restricted to `[A-Za-z0-9_-]` and
//! the window index is a decimal integer; anything else is rejected at the
//! boundary so downstream code never sees a malformed address.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error produced when parsing an agent target address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetParseError {
    #[error("target must be of the form session:window, got '{0}'")]
    MissingSeparator(String),
    #[error("invalid session name '{0}': only [A-Za-z0-9_-] allowed")]
    InvalidSession(String),
    #[error("invalid window index '{0}': must be a decimal integer")]
    InvalidWindow(String),
}

/// Address of one agent: a `(session, window)` pair.
///
/// Equality and hashing are by pair; the wire form is `"session:window"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentTarget {
    session: String,
    window: u32,
}

impl AgentTarget {
    /// Build a target from already-validated parts.
    ///
    /// Returns an error when the session name contains characters outside
    /// the allowed set.
    pub fn new(session: impl Into<String>, window: u32) -> Result<Self, TargetParseError> {
        let session = session.into();
        if !valid_session_name(&session) {
            return Err(TargetParseError::InvalidSession(session));
        }
        Ok(Self { session, window })
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn window(&self) -> u32 {
        self.window
    }
}

fn valid_session_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl FromStr for AgentTarget {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (session, window) = s
            .split_once(':')
            .ok_or_else(|| TargetParseError::MissingSeparator(s.to_string()))?;
        if !valid_session_name(session) {
            return Err(TargetParseError::InvalidSession(session.to_string()));
        }
        if window.is_empty() || !window.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TargetParseError::InvalidWindow(window.to_string()));
        }
        let window: u32 = window
            .parse()
            .map_err(|_| TargetParseError::InvalidWindow(window.to_string()))?;
        Ok(Self {
            session: session.to_string(),
            window,
        })
    }
}

impl fmt::Display for AgentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.session, self.window)
    }
}

impl TryFrom<String> for AgentTarget {
    type Error = TargetParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AgentTarget> for String {
    fn from(t: AgentTarget) -> Self {
        t.to_string()
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
