// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::notification::NotificationKind;
use std::io::Write;

#[test]
fn defaults_match_documented_values() {
    let config = MonitorConfig::default();
    assert_eq!(config.base_interval_seconds, 15);
    assert_eq!(config.grace_period_seconds, 180);
    assert_eq!(config.idle_threshold_cycles, 3);
    assert_eq!(config.crash_cooldown_seconds, 300);
    assert_eq!(config.idle_cooldown_seconds, 600);
    assert_eq!(config.cache.pane_content.ttl_seconds, 10);
    assert_eq!(config.cache.agent_status.ttl_seconds, 30);
    assert_eq!(config.cache.session_info.ttl_seconds, 60);
    assert_eq!(config.cache.config.ttl_seconds, 300);
    assert_eq!(config.max_in_flight, 20);
    assert_eq!(config.init_timeout_seconds, 15);
    assert_eq!(config.shutdown_grace_seconds, 10);
}

#[test]
fn cooldowns_keyed_by_kind() {
    let config = MonitorConfig::default();
    assert_eq!(
        config.cooldown(NotificationKind::Crash),
        Some(Duration::from_secs(300))
    );
    assert_eq!(
        config.cooldown(NotificationKind::Idle),
        Some(Duration::from_secs(600))
    );
    // Rate-limit notices are once-per-window, not timed.
    assert_eq!(config.cooldown(NotificationKind::RateLimit), None);
}

#[test]
fn loads_partial_toml_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("muster.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
base_interval_seconds = 5
agent_command = "claude --dangerously-skip-permissions"

[pool]
max_size = 3

[recipients]
pm = "proj:0"
"#
    )
    .unwrap();

    let config = MonitorConfig::load(Some(&path)).unwrap();
    assert_eq!(config.base_interval_seconds, 5);
    assert_eq!(config.pool.max_size, 3);
    // Untouched sections keep defaults.
    assert_eq!(config.pool.min_size, 2);
    assert_eq!(config.grace_period_seconds, 180);
    assert_eq!(config.recipients.pm, Some("proj:0".parse().unwrap()));
}

#[test]
fn missing_file_yields_defaults() {
    let config = MonitorConfig::load(Some(std::path::Path::new("/nonexistent/muster.toml")))
        .unwrap();
    assert_eq!(config, MonitorConfig::default());
}

#[test]
fn bad_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("muster.toml");
    std::fs::write(&path, "base_interval_seconds = \"not a number\"").unwrap();
    assert!(matches!(
        MonitorConfig::load(Some(&path)),
        Err(ConfigError::Parse { .. })
    ));
}
