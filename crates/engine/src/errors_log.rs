// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded in-memory log of recent per-target errors.
//!
//! Feeds the `errors` command group. Entries are dropped oldest-first once
//! the cap is reached; this is operational visibility, not an audit trail.

use chrono::{DateTime, Utc};
use muster_core::AgentTarget;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

const MAX_ENTRIES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub id: u64,
    #[serde(default)]
    pub target: Option<AgentTarget>,
    pub component: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Default)]
struct LogState {
    entries: VecDeque<ErrorEntry>,
    next_id: u64,
}

/// Shared error log handle.
#[derive(Clone, Default)]
pub struct ErrorsLog {
    state: Arc<Mutex<LogState>>,
}

impl ErrorsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        target: Option<AgentTarget>,
        component: &str,
        message: &str,
        occurred_at: DateTime<Utc>,
    ) -> u64 {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push_back(ErrorEntry {
            id,
            target,
            component: component.to_string(),
            message: message.to_string(),
            occurred_at,
        });
        while state.entries.len() > MAX_ENTRIES {
            state.entries.pop_front();
        }
        id
    }

    /// Most recent entries first, up to `limit`.
    pub fn list(&self, limit: usize) -> Vec<ErrorEntry> {
        let state = self.state.lock();
        state.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn get(&self, id: u64) -> Option<ErrorEntry> {
        let state = self.state.lock();
        state.entries.iter().find(|e| e.id == id).cloned()
    }

    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let cleared = state.entries.len();
        state.entries.clear();
        cleared
    }

    /// Count of entries per component, sorted descending.
    pub fn summary(&self) -> Vec<(String, usize)> {
        let state = self.state.lock();
        let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for entry in &state.entries {
            *counts.entry(entry.component.clone()).or_default() += 1;
        }
        let mut summary: Vec<(String, usize)> = counts.into_iter().collect();
        summary.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        summary
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }
}

#[cfg(test)]
#[path = "errors_log_tests.rs"]
mod tests;
