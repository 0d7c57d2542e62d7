// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor configuration.
//!
//! Single source of truth for every tunable: intervals, pool bounds, cache
//! TTLs, grace and cooldown durations. Loaded from an optional TOML file
//! with `MUSTER_*` environment overrides for the common knobs. No other
//! module carries duration literals.

use crate::target::AgentTarget;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between monitoring cycles once warmed up.
    pub base_interval_seconds: u64,
    /// Post-spawn window during which crash detection is suppressed.
    pub grace_period_seconds: u64,
    /// Unchanged-fingerprint cycles before a tentative Active becomes Idle.
    pub idle_threshold_cycles: u32,
    /// Idle cycles before an AgentIdle notification fires.
    pub idle_notify_threshold_cycles: u32,
    pub crash_cooldown_seconds: u64,
    pub idle_cooldown_seconds: u64,
    /// Consecutive cycles of visible unsubmitted input before notifying.
    pub unsubmitted_threshold_cycles: u32,
    /// Discovery cycles a window may be absent before its record is dropped.
    pub stale_tolerance_cycles: u32,
    /// Concurrent health checks per cycle.
    pub max_in_flight: usize,
    /// Lines captured from the bottom of each pane.
    pub capture_lines: u32,
    /// Command used to launch the agent REPL in new and recovered windows.
    pub agent_command: String,
    /// Working directory for spawned and recovered agent windows.
    pub workdir: std::path::PathBuf,
    /// Project name substituted into role briefings.
    pub project_name: String,
    /// Selects the concurrent strategy; polling when false.
    pub async_enabled: bool,
    /// Seconds allowed for a respawned REPL to show its first output.
    pub init_timeout_seconds: u64,
    /// Seconds stop() waits for in-flight work before aborting.
    pub shutdown_grace_seconds: u64,
    /// Delivery attempts before the router drops a notification.
    pub notification_max_failures: u32,
    pub recipients: RecipientsConfig,
    pub pool: PoolConfig,
    pub cache: CacheConfig,
    pub submit: SubmitConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_interval_seconds: 15,
            grace_period_seconds: 180,
            idle_threshold_cycles: 3,
            idle_notify_threshold_cycles: 3,
            crash_cooldown_seconds: 300,
            idle_cooldown_seconds: 600,
            unsubmitted_threshold_cycles: 2,
            stale_tolerance_cycles: 2,
            max_in_flight: 20,
            capture_lines: 50,
            agent_command: "claude".to_string(),
            workdir: std::path::PathBuf::from("."),
            project_name: "project".to_string(),
            async_enabled: true,
            init_timeout_seconds: 15,
            shutdown_grace_seconds: 10,
            notification_max_failures: 3,
            recipients: RecipientsConfig::default(),
            pool: PoolConfig::default(),
            cache: CacheConfig::default(),
            submit: SubmitConfig::default(),
        }
    }
}

/// Where routed notifications go.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipientsConfig {
    /// Project manager target; receives worker/QA notices.
    pub pm: Option<AgentTarget>,
    /// Orchestrator target; receives PM notices and fleet-wide notices.
    pub orchestrator: Option<AgentTarget>,
}

/// Connection-pool bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub min_size: usize,
    pub max_size: usize,
    pub max_age_seconds: u64,
    pub acquisition_timeout_ms: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: 2,
            max_size: 10,
            max_age_seconds: 300,
            acquisition_timeout_ms: 5_000,
            sweep_interval_seconds: 30,
        }
    }
}

/// One cache namespace: TTL plus entry cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheNamespaceConfig {
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

impl Default for CacheNamespaceConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 30,
            max_entries: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub pane_content: CacheNamespaceConfig,
    pub agent_status: CacheNamespaceConfig,
    pub session_info: CacheNamespaceConfig,
    pub config: CacheNamespaceConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            pane_content: CacheNamespaceConfig {
                ttl_seconds: 10,
                max_entries: 512,
            },
            agent_status: CacheNamespaceConfig {
                ttl_seconds: 30,
                max_entries: 512,
            },
            session_info: CacheNamespaceConfig {
                ttl_seconds: 60,
                max_entries: 128,
            },
            config: CacheNamespaceConfig {
                ttl_seconds: 300,
                max_entries: 64,
            },
        }
    }
}

/// Submission-protocol timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    /// Floor for the stage delay between typing and Enter.
    pub min_stage_delay_ms: u64,
    /// Multiplier applied to the caller's delay hint.
    pub hint_multiplier: u32,
    /// Verification retries (each doubles the stage delay).
    pub max_retries: u32,
    /// Seconds the verification capture may lag the Enter.
    pub verify_window_seconds: u64,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            min_stage_delay_ms: 3_000,
            hint_multiplier: 6,
            max_retries: 2,
            verify_window_seconds: 5,
        }
    }
}

impl MonitorConfig {
    /// Load from a TOML file if present, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `MUSTER_*` environment overrides for the common knobs.
    fn apply_env(&mut self) {
        if let Some(v) = env_u64("MUSTER_BASE_INTERVAL_SECONDS") {
            self.base_interval_seconds = v;
        }
        if let Some(v) = env_u64("MUSTER_GRACE_PERIOD_SECONDS") {
            self.grace_period_seconds = v;
        }
        if let Some(v) = env_u64("MUSTER_CRASH_COOLDOWN_SECONDS") {
            self.crash_cooldown_seconds = v;
        }
        if let Some(v) = env_u64("MUSTER_IDLE_COOLDOWN_SECONDS") {
            self.idle_cooldown_seconds = v;
        }
        if let Some(v) = env_u64("MUSTER_IDLE_THRESHOLD_CYCLES") {
            self.idle_threshold_cycles = v as u32;
        }
        if let Ok(v) = std::env::var("MUSTER_ASYNC_ENABLED") {
            self.async_enabled = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = std::env::var("MUSTER_AGENT_COMMAND") {
            if !v.is_empty() {
                self.agent_command = v;
            }
        }
    }

    pub fn base_interval(&self) -> Duration {
        Duration::from_secs(self.base_interval_seconds)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_seconds)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }

    /// Cooldown for a notification kind. Rate-limit kinds have no timed
    /// cooldown here — they are bounded to once per window by the
    /// coordinator.
    pub fn cooldown(&self, kind: crate::notification::NotificationKind) -> Option<Duration> {
        use crate::notification::NotificationKind::*;
        match kind {
            Crash | RecoveryFailed => Some(Duration::from_secs(self.crash_cooldown_seconds)),
            Idle | UnsubmittedInput => Some(Duration::from_secs(self.idle_cooldown_seconds)),
            RateLimit | RateLimitResume => None,
        }
    }
}

fn env_u64(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
