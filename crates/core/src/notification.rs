// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification records and cooldown classes.
//!
//! For any `(kind, target)` pair at most one notification is emitted per
//! cooldown window; the router owns enforcement, this module owns the data.

use crate::target::AgentTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a notification is about. Doubles as the cooldown class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Crash,
    Idle,
    UnsubmittedInput,
    RateLimit,
    RateLimitResume,
    RecoveryFailed,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Crash => write!(f, "crash"),
            NotificationKind::Idle => write!(f, "idle"),
            NotificationKind::UnsubmittedInput => write!(f, "unsubmitted_input"),
            NotificationKind::RateLimit => write!(f, "rate_limit"),
            NotificationKind::RateLimitResume => write!(f, "rate_limit_resume"),
            NotificationKind::RecoveryFailed => write!(f, "recovery_failed"),
        }
    }
}

/// One queued or delivered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub kind: NotificationKind,
    /// Subject agent; `None` for fleet-wide notices (rate-limit window).
    #[serde(default)]
    pub target: Option<AgentTarget>,
    /// Agent that receives the message (typically the PM or orchestrator).
    pub recipient: AgentTarget,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_failures: u32,
}

impl NotificationRecord {
    pub fn new(
        kind: NotificationKind,
        target: Option<AgentTarget>,
        recipient: AgentTarget,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            target,
            recipient,
            message: message.into(),
            created_at,
            sent_at: None,
            delivery_failures: 0,
        }
    }

    /// Dedup key: one notification per `(kind, target)` per cooldown.
    pub fn dedup_key(&self) -> (NotificationKind, Option<AgentTarget>) {
        (self.kind, self.target.clone())
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
