// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pane classifier.
//!
//! Pure function from captured pane text to an [`AgentState`]. Rule order
//! matters and the first match wins: rate limit, unsubmitted input, fresh
//! banner, crash, active. Idle is never produced here — the health checker
//! promotes a tentative Active to Idle from fingerprint history.
//!
//! Crash detection is the dangerous rule: an agent *talking about* a failed
//! deployment must not be mistaken for a dead REPL. Any visible REPL frame
//! or conversational marker suppresses the crash verdict.

use chrono::{DateTime, Duration, TimeZone, Utc};
use muster_core::AgentState;
use regex::Regex;
use std::sync::OnceLock;

/// Classifier verdict plus the parsed rate-limit reset time when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub state: AgentState,
    pub reset_at: Option<ResetSpec>,
}

impl Classification {
    fn state(state: AgentState) -> Self {
        Self {
            state,
            reset_at: None,
        }
    }
}

/// A wall-clock reset time as it appeared in the pane, not yet anchored to
/// a date. [`ResetSpec::resolve`] anchors it against the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSpec {
    hour24: u32,
    minute: u32,
}

impl ResetSpec {
    /// Anchor to a concrete UTC instant: today at `hour:minute`, or
    /// tomorrow when that has already passed.
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        // Always valid: hour and minute were range-checked at parse time.
        let Some(naive) = today.and_hms_opt(self.hour24, self.minute, 0) else {
            return now;
        };
        let candidate = Utc.from_utc_datetime(&naive);
        if candidate <= now {
            candidate + Duration::days(1)
        } else {
            candidate
        }
    }
}

/// Rate-limit sentinel. Both halves must be present: the limit phrase and a
/// parseable reset time.
const RATE_LIMIT_SENTINEL: &str = "usage limit reached";

fn reset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // literal pattern, compiles by construction
        Regex::new(r"(?i)reset(?:s)? at (\d{1,2})(?::(\d{2}))?\s*(am|pm)?").unwrap()
    })
}

/// Parse a reset-time phrase like `reset at 4:30pm`.
///
/// Accepts `4am`, `4:30am`, `11:59pm`, `4:30 PM` (case-insensitive).
/// Rejects out-of-range values (`25:00`, `4:60pm`). Times are UTC.
pub fn parse_reset_time(text: &str) -> Option<ResetSpec> {
    let caps = reset_regex().captures(text)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if minute > 59 {
        return None;
    }

    let meridiem = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
    let hour24 = match meridiem.as_deref() {
        Some("am") => match hour {
            12 => 0,
            1..=11 => hour,
            _ => return None,
        },
        Some("pm") => match hour {
            12 => 12,
            1..=11 => hour + 12,
            _ => return None,
        },
        _ => {
            if hour > 23 {
                return None;
            }
            hour
        }
    };

    Some(ResetSpec { hour24, minute })
}

/// Glyphs an active REPL frame is drawn with.
const FRAME_GLYPHS: [char; 4] = ['╭', '╰', '│', '─'];

/// Tool-output gutter markers.
const TOOL_MARKERS: [char; 4] = ['⎿', '│', '└', '├'];

/// Conversational phrases that mean a failure is being *discussed*, not
/// experienced.
const SAFE_PHRASES: [&str; 6] = [
    "previously failed",
    "test failed",
    "deployment failed",
    "build failed",
    "error occurred while",
    "had failed",
];

/// Welcome-banner whitelist. Each banner lists its signal phrases; a match
/// requires [`FRESH_SIGNAL_THRESHOLD`] of them on screen.
const FRESH_BANNERS: &[(&str, &[&str])] = &[
    (
        "claude_code",
        &[
            "Welcome to Claude Code",
            "/help for help",
            "Bypassing Permissions",
        ],
    ),
    (
        "claude_plain",
        &["✻ Welcome to", "What's new:", "Tips for getting started"],
    ),
];

/// Minimum number of banner signals that must match.
const FRESH_SIGNAL_THRESHOLD: usize = 2;

/// Classify pane text with the default REPL launch command.
pub fn classify(text: &str) -> Classification {
    classify_with(text, "claude")
}

/// Classify pane text. `launch_command` is used only to tell a
/// `command not found` for the REPL itself apart from one an agent merely
/// printed.
pub fn classify_with(text: &str, launch_command: &str) -> Classification {
    if text.trim().is_empty() {
        return Classification::state(AgentState::Unknown);
    }

    // 1. Rate limited: sentinel phrase plus a parseable reset time.
    if text.to_ascii_lowercase().contains(RATE_LIMIT_SENTINEL) {
        if let Some(reset) = parse_reset_time(text) {
            return Classification {
                state: AgentState::RateLimited,
                reset_at: Some(reset),
            };
        }
    }

    // 2. Typed-but-uncommitted input in the REPL frame.
    if draft_input(text).is_some() {
        return Classification::state(AgentState::UnsubmittedInput);
    }

    // 3. Fresh welcome banner.
    if matches_fresh_banner(text) {
        return Classification::state(AgentState::Fresh);
    }

    // 4. Crash, unless shadowed by safe context.
    if let Some(indicator) = crash_indicator(text, launch_command) {
        if in_safe_context(text) {
            tracing::debug!(indicator, "crash indicator suppressed by safe context");
            return Classification::state(AgentState::Active);
        }
        return Classification::state(AgentState::Crashed);
    }

    // 5/6. Tentatively active; idle promotion happens upstream.
    Classification::state(AgentState::Active)
}

/// Extract draft input: text typed into the REPL frame (`│ > …`) that has
/// not been committed. Also used by the submitter's verification capture.
pub fn draft_input(text: &str) -> Option<String> {
    for line in text.lines().rev() {
        if let Some(rest) = line.trim_start().strip_prefix("│ >") {
            let draft = rest.trim_end_matches('│').trim();
            if !draft.is_empty() {
                return Some(draft.to_string());
            }
        }
    }
    None
}

fn matches_fresh_banner(text: &str) -> bool {
    for (name, signals) in FRESH_BANNERS {
        let hits = signals
            .iter()
            .filter(|phrase| text.contains(**phrase))
            .count();
        if hits >= FRESH_SIGNAL_THRESHOLD {
            return true;
        }
        if hits == 1 {
            // Near-miss: one signal alone must not match, but is worth a
            // look when banners change upstream.
            tracing::debug!(banner = name, "single fresh-banner signal (near-miss)");
        }
    }
    false
}

/// Find a crash indicator, returning a short description of what matched.
fn crash_indicator(text: &str, launch_command: &str) -> Option<&'static str> {
    if text.contains("Segmentation fault") {
        return Some("segmentation fault");
    }
    if text.contains("core dumped") {
        return Some("core dumped");
    }

    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

    // `command not found` counts only when the failing command is the REPL
    // launch command itself (first token; the command line may carry flags).
    let launch = launch_command
        .split_whitespace()
        .next()
        .unwrap_or(launch_command);
    for line in &lines {
        if line.contains("command not found") && line.contains(launch) {
            return Some("launch command not found");
        }
    }

    let Some(last) = lines.last() else {
        return None;
    };

    // `Killed` printed just above a shell prompt.
    if lines.len() >= 2
        && lines[lines.len() - 2].trim().ends_with("Killed")
        && is_shell_prompt(last)
    {
        return Some("killed at shell prompt");
    }

    if is_shell_prompt(last) {
        return Some("shell prompt at end of buffer");
    }

    None
}

fn is_shell_prompt(line: &str) -> bool {
    let trimmed = line.trim_end();
    if trimmed.is_empty() {
        return false;
    }
    if bash_prompt_regex().is_match(trimmed) || trimmed.starts_with("zsh:") {
        return true;
    }
    trimmed.ends_with('$') || trimmed.ends_with('#') || trimmed.ends_with('%')
}

fn bash_prompt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // literal pattern, compiles by construction
        Regex::new(r"bash-\d").unwrap()
    })
}

fn in_safe_context(text: &str) -> bool {
    if text.contains("Human:") || text.contains("Assistant:") {
        return true;
    }
    if FRAME_GLYPHS.iter().any(|g| text.contains(*g)) {
        return true;
    }
    if TOOL_MARKERS.iter().any(|g| text.contains(*g)) {
        return true;
    }
    let lower = text.to_ascii_lowercase();
    SAFE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
