// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification router: events → queued messages → recipient agents.
//!
//! Dedup is keyed on `(kind, target)` with per-kind cooldowns; within a
//! cooldown window later findings of the same pair are dropped, so a
//! flapping agent produces one notice, not a storm. Delivery goes through
//! the message submitter; a notification is retried across drains up to the
//! configured failure budget and then dropped with a log line.

use crate::registry::AgentRegistry;
use crate::submitter::MessageSubmitter;
use chrono::{DateTime, Utc};
use muster_adapters::{NotifyAdapter, TerminalDriver};
use muster_core::{
    AgentRole, AgentTarget, Clock, Event, MonitorConfig, NotificationKind, NotificationRecord,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Result of one queue drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub sent: u64,
    pub requeued: u64,
    pub dropped: u64,
}

pub struct NotificationRouter<D: TerminalDriver, N: NotifyAdapter, C: Clock> {
    submitter: MessageSubmitter<D, C>,
    registry: Arc<AgentRegistry>,
    /// Desktop notifier for findings that need a human (recovery failures).
    notify: N,
    config: Arc<MonitorConfig>,
    clock: C,
    queue: Mutex<VecDeque<NotificationRecord>>,
    last_emitted: Mutex<HashMap<(NotificationKind, Option<AgentTarget>), DateTime<Utc>>>,
}

impl<D: TerminalDriver, N: NotifyAdapter, C: Clock> NotificationRouter<D, N, C> {
    pub fn new(
        submitter: MessageSubmitter<D, C>,
        registry: Arc<AgentRegistry>,
        notify: N,
        config: Arc<MonitorConfig>,
        clock: C,
    ) -> Self {
        Self {
            submitter,
            registry,
            notify,
            config,
            clock,
            queue: Mutex::new(VecDeque::new()),
            last_emitted: Mutex::new(HashMap::new()),
        }
    }

    /// Queue the notification an event calls for, if any recipient is
    /// configured and the cooldown allows it. Returns whether it queued.
    pub fn route_event(&self, event: &Event) -> bool {
        let Some((kind, message)) = describe(event) else {
            return false;
        };
        let target = event.target().cloned();
        let Some(recipient) = self.recipient_for(target.as_ref()) else {
            tracing::debug!(kind = %kind, "no recipient configured, notification dropped");
            return false;
        };

        // Never notify an agent about itself.
        if target.as_ref() == Some(&recipient) {
            return false;
        }

        self.enqueue(NotificationRecord::new(
            kind,
            target,
            recipient,
            message,
            self.clock.now(),
        ))
    }

    /// Queue an already-built notification, subject to cooldown dedup.
    pub fn enqueue(&self, record: NotificationRecord) -> bool {
        let now = self.clock.now();
        let key = record.dedup_key();

        if let Some(cooldown) = self.config.cooldown(record.kind) {
            let mut last = self.last_emitted.lock();

            // Opportunistic GC of expired dedup entries.
            last.retain(|(kind, _), at| match self.config.cooldown(*kind) {
                Some(cd) => (now - *at).to_std().map_or(true, |age| age < cd),
                None => true,
            });

            if let Some(at) = last.get(&key) {
                let age = (now - *at).to_std().unwrap_or_default();
                if age < cooldown {
                    tracing::debug!(
                        kind = %record.kind,
                        target = ?record.target.as_ref().map(ToString::to_string),
                        "within cooldown, notification dropped"
                    );
                    return false;
                }
            }
            last.insert(key, now);
        }

        self.queue.lock().push_back(record);
        true
    }

    /// Deliver queued notifications. Failures are retried on later drains
    /// up to the failure budget, then dropped.
    pub async fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        let batch: Vec<NotificationRecord> = {
            let mut queue = self.queue.lock();
            queue.drain(..).collect()
        };

        for mut record in batch {
            // Recovery failures also reach the human operator's desktop;
            // the fleet may be in no state to relay them itself.
            if record.kind == NotificationKind::RecoveryFailed {
                if let Err(e) = self.notify.notify("Muster", &record.message).await {
                    tracing::debug!(error = %e, "desktop escalation failed");
                }
            }

            let outcome = self
                .submitter
                .submit(&record.recipient, &record.message, None)
                .await;

            if outcome.is_delivered() {
                record.sent_at = Some(self.clock.now());
                report.sent += 1;
                continue;
            }

            record.delivery_failures += 1;
            if record.delivery_failures >= self.config.notification_max_failures {
                tracing::warn!(
                    kind = %record.kind,
                    recipient = %record.recipient,
                    failures = record.delivery_failures,
                    "notification dropped after repeated delivery failures"
                );
                report.dropped += 1;
            } else {
                self.queue.lock().push_back(record);
                report.requeued += 1;
            }
        }

        report
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Resolve the recipient for a notification about `target`: the subject
    /// agent's parent role, falling back from PM to orchestrator.
    fn recipient_for(&self, target: Option<&AgentTarget>) -> Option<AgentTarget> {
        let recipients = &self.config.recipients;
        let role = target
            .and_then(|t| self.registry.get(t))
            .map(|r| r.role)
            .unwrap_or(AgentRole::Worker);

        match role.parent() {
            Some(AgentRole::ProjectManager) => recipients
                .pm
                .clone()
                .or_else(|| recipients.orchestrator.clone()),
            Some(AgentRole::Orchestrator) | None => recipients.orchestrator.clone(),
            Some(_) => recipients.pm.clone(),
        }
    }
}

/// Notification kind and message for an event, or `None` when the event
/// does not notify (recovery start, window end handled elsewhere).
fn describe(event: &Event) -> Option<(NotificationKind, String)> {
    match event {
        Event::AgentCrashed { target, reason, .. } => Some((
            NotificationKind::Crash,
            format!("MONITOR: agent {target} crashed ({reason}). Recovery has been queued."),
        )),
        Event::AgentIdle { target, reason, .. } => Some((
            NotificationKind::Idle,
            format!("MONITOR: agent {target} looks idle ({reason}). Check on it."),
        )),
        Event::UnsubmittedInputDetected { target, .. } => Some((
            NotificationKind::UnsubmittedInput,
            format!(
                "MONITOR: agent {target} has typed input that was never submitted. \
                 It may be stuck mid-compose."
            ),
        )),
        Event::AgentRateLimited { target, reason, .. } => Some((
            NotificationKind::RateLimit,
            format!("MONITOR: agent {target} hit the upstream rate limit ({reason})."),
        )),
        Event::RateLimitWindowBegan { reset_at, .. } => Some((
            NotificationKind::RateLimit,
            format!(
                "MONITOR: usage limit reached. Monitoring pauses until {} UTC.",
                reset_at.format("%H:%M")
            ),
        )),
        Event::RateLimitWindowEnded { .. } => Some((
            NotificationKind::RateLimitResume,
            "MONITOR: rate-limit window ended, monitoring resumed.".to_string(),
        )),
        Event::RecoveryCompleted {
            target,
            failed: true,
            reason,
            ..
        } => Some((
            NotificationKind::RecoveryFailed,
            format!("MONITOR: recovery of agent {target} failed ({reason}). Manual attention needed."),
        )),
        Event::RecoveryStarted { .. } | Event::RecoveryCompleted { failed: false, .. } => None,
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
