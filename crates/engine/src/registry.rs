// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent registry: the single-writer store of [`AgentRecord`]s.
//!
//! A record exists iff its window was present at the last discovery pass
//! (with a small tolerance for transient listing gaps). All mutation goes
//! through this type under one lock per operation; readers get value
//! snapshots and never observe partial updates.

use muster_core::{AgentRecord, AgentRole, AgentState, AgentTarget};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Outcome of one discovery reconciliation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveryDelta {
    pub added: Vec<AgentTarget>,
    pub removed: Vec<AgentTarget>,
}

pub struct AgentRegistry {
    records: Mutex<HashMap<AgentTarget, AgentRecord>>,
    idle_threshold_cycles: u32,
    stale_tolerance_cycles: u32,
}

impl AgentRegistry {
    pub fn new(idle_threshold_cycles: u32, stale_tolerance_cycles: u32) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            idle_threshold_cycles,
            stale_tolerance_cycles,
        }
    }

    /// Reconcile against the windows discovery just listed.
    ///
    /// New windows get a record with a role inferred from the window name;
    /// windows absent for more than the staleness tolerance lose theirs.
    pub fn upsert_from_discovery(
        &self,
        windows: impl IntoIterator<Item = (AgentTarget, String)>,
        now: DateTime<Utc>,
    ) -> DiscoveryDelta {
        let mut records = self.records.lock();
        let mut delta = DiscoveryDelta::default();
        let mut seen: HashSet<AgentTarget> = HashSet::new();

        for (target, window_name) in windows {
            seen.insert(target.clone());
            match records.entry(target.clone()) {
                Entry::Occupied(mut occupied) => {
                    let record = occupied.get_mut();
                    record.last_seen_at = now;
                    record.missed_discoveries = 0;
                }
                Entry::Vacant(vacant) => {
                    let role = role_from_window_name(&window_name);
                    vacant.insert(AgentRecord::new(target.clone(), role, now));
                    delta.added.push(target);
                }
            }
        }

        let tolerance = self.stale_tolerance_cycles;
        records.retain(|target, record| {
            if seen.contains(target) {
                return true;
            }
            record.missed_discoveries += 1;
            if record.missed_discoveries >= tolerance {
                delta.removed.push(target.clone());
                false
            } else {
                true
            }
        });

        delta
    }

    /// Register a window this process just spawned, with a known role.
    pub fn insert_spawned(&self, target: AgentTarget, role: AgentRole, now: DateTime<Utc>) {
        let mut records = self.records.lock();
        records.insert(target.clone(), AgentRecord::new(target, role, now));
    }

    pub fn get(&self, target: &AgentTarget) -> Option<AgentRecord> {
        self.records.lock().get(target).cloned()
    }

    pub fn snapshot_all(&self) -> Vec<AgentRecord> {
        let mut all: Vec<AgentRecord> = self.records.lock().values().cloned().collect();
        all.sort_by(|a, b| a.target.cmp(&b.target));
        all
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Apply a classification to a record, returning the updated snapshot.
    ///
    /// Owns the idle-promotion rule: a tentative Active whose fingerprint
    /// matches the previous capture bumps `consecutive_idle_cycles` and
    /// becomes Idle at the threshold. A grace window in effect forces
    /// Active so warm-up never reads as a crash. Unknown never overwrites
    /// an existing verdict.
    pub fn apply_classification(
        &self,
        target: &AgentTarget,
        state: AgentState,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Option<AgentRecord> {
        self.apply_classification_with_reset(target, state, fingerprint, None, now)
    }

    /// [`apply_classification`] carrying the parsed rate-limit reset time.
    pub fn apply_classification_with_reset(
        &self,
        target: &AgentTarget,
        state: AgentState,
        fingerprint: &str,
        reset_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<AgentRecord> {
        let mut records = self.records.lock();
        let record = records.get_mut(target)?;

        let changed = record.last_content_fingerprint.as_deref() != Some(fingerprint);
        if changed {
            record.last_activity_at = now;
            record.consecutive_idle_cycles = 0;
        }
        record.last_content_fingerprint = Some(fingerprint.to_string());
        record.last_seen_at = now;

        let mut state = state;
        match state {
            AgentState::Active if !changed => {
                record.consecutive_idle_cycles += 1;
                if record.consecutive_idle_cycles >= self.idle_threshold_cycles {
                    state = AgentState::Idle;
                }
            }
            AgentState::Unknown => {
                // No verdict: keep the previous state, count the error.
                record.note_error(now);
                return Some(record.clone());
            }
            _ => {}
        }

        // Warm-up suppression: inside the grace window every verdict other
        // than the welcome banner reads as Active, so a booting REPL is
        // never mistaken for a crashed or stalled one.
        if record.in_grace(now) && !matches!(state, AgentState::Fresh | AgentState::Active) {
            state = AgentState::Active;
        }

        record.unsubmitted_cycles = if state == AgentState::UnsubmittedInput {
            record.unsubmitted_cycles + 1
        } else {
            0
        };

        record.rate_limit_reset_at = if state == AgentState::RateLimited {
            reset_at.or(record.rate_limit_reset_at)
        } else {
            None
        };

        record.state = state;
        Some(record.clone())
    }

    pub fn record_submission(&self, target: &AgentTarget, now: DateTime<Utc>) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(target) {
            record.submission_attempts += 1;
            record.last_submission_at = Some(now);
        }
    }

    pub fn begin_grace(&self, target: &AgentTarget, duration: Duration, now: DateTime<Utc>) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(target) {
            record.grace_until = Some(now + duration);
            record.spawned_at = now;
            record.state = AgentState::Fresh;
            record.consecutive_idle_cycles = 0;
            record.unsubmitted_cycles = 0;
            record.last_content_fingerprint = None;
        }
    }

    pub fn set_role(&self, target: &AgentTarget, role: AgentRole) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(target) {
            record.role = role;
        }
    }

    /// Reset RateLimited verdicts so the next cycle re-classifies them.
    /// Called when a rate-limit window ends.
    pub fn clear_rate_limited(&self) {
        let mut records = self.records.lock();
        for record in records.values_mut() {
            if record.state == AgentState::RateLimited {
                record.state = AgentState::Unknown;
            }
        }
    }

    /// Replace the full record set (snapshot restore at startup).
    pub fn restore(&self, agents: Vec<AgentRecord>) {
        let mut records = self.records.lock();
        records.clear();
        for record in agents {
            records.insert(record.target.clone(), record);
        }
    }
}

/// Infer a role from the window name used at spawn time.
fn role_from_window_name(name: &str) -> AgentRole {
    let lower = name.to_ascii_lowercase();
    if lower.contains("orchestrator") {
        AgentRole::Orchestrator
    } else if lower == "pm" || lower.contains("project-manager") || lower.contains("manager") {
        AgentRole::ProjectManager
    } else if lower.contains("qa") {
        AgentRole::Qa
    } else {
        AgentRole::Worker
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
