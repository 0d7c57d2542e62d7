// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{NaiveDate, Timelike};
use yare::parameterized;

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap(),
    )
}

#[test]
fn empty_text_is_unknown() {
    assert_eq!(classify("").state, AgentState::Unknown);
    assert_eq!(classify("   \n  ").state, AgentState::Unknown);
}

#[test]
fn rate_limit_sentinel_with_reset_time() {
    let pane = "Claude usage limit reached. Your limit will reset at 4:30pm (UTC).";
    let classification = classify(pane);
    assert_eq!(classification.state, AgentState::RateLimited);
    let reset = classification.reset_at.unwrap();
    assert_eq!(reset.resolve(utc(2025, 6, 15, 14, 0)), utc(2025, 6, 15, 16, 30));
}

#[test]
fn rate_limit_sentinel_without_reset_phrase_is_not_rate_limited() {
    let pane = "╭──╮\n│ usage limit reached earlier today, all good now │";
    assert_eq!(classify(pane).state, AgentState::Active);
}

#[parameterized(
    four_am = { "reset at 4am", 4, 0 },
    four_thirty_am = { "resets at 4:30am", 4, 30 },
    before_midnight = { "reset at 11:59pm", 23, 59 },
    spaced_upper = { "reset at 4:30 PM", 16, 30 },
    noon = { "reset at 12pm", 12, 0 },
    midnight = { "reset at 12am", 0, 0 },
    twenty_four_hour = { "reset at 16:45", 16, 45 },
)]
fn reset_time_accepts(text: &str, hour: u32, minute: u32) {
    let spec = parse_reset_time(text).unwrap();
    let resolved = spec.resolve(utc(2025, 6, 15, 0, 0));
    assert_eq!(resolved.hour(), hour);
    assert_eq!(resolved.minute(), minute);
}

#[parameterized(
    hour_out_of_range = { "reset at 25:00" },
    minute_out_of_range = { "reset at 4:60pm" },
    thirteen_pm = { "reset at 13pm" },
    no_time = { "reset at soon" },
)]
fn reset_time_rejects(text: &str) {
    assert!(parse_reset_time(text).is_none(), "accepted {text:?}");
}

#[test]
fn reset_in_the_past_rolls_to_tomorrow() {
    let spec = parse_reset_time("reset at 4am").unwrap();
    let now = utc(2025, 6, 15, 14, 0);
    assert_eq!(spec.resolve(now), utc(2025, 6, 16, 4, 0));
}

#[test]
fn unsubmitted_input_in_frame() {
    let pane = "╭────────────╮\n│ > fix the login bug   │\n╰────────────╯";
    assert_eq!(classify(pane).state, AgentState::UnsubmittedInput);
    assert_eq!(draft_input(pane).unwrap(), "fix the login bug");
}

#[test]
fn empty_frame_is_not_unsubmitted() {
    let pane = "╭────────────╮\n│ >    │\n╰────────────╯";
    assert_ne!(classify(pane).state, AgentState::UnsubmittedInput);
}

#[test]
fn fresh_banner_needs_two_signals() {
    let two = "✻ Welcome to Claude Code\n\n /help for help\n\n╭──╮\n│ > │";
    assert_eq!(classify(two).state, AgentState::Fresh);

    // One generic phrase alone must not match.
    let one = "someone typed /help for help somewhere";
    assert_ne!(classify(one).state, AgentState::Fresh);
}

#[test]
fn scenario_false_positive_crash_suppressed() {
    // An agent discussing a failed deployment inside an active frame.
    let pane = "PM: the last deployment failed, I'll retry\n│ > ";
    let classification = classify(pane);
    assert_eq!(classification.state, AgentState::Active);
}

#[test]
fn scenario_real_crash_detected() {
    let pane = "some scrollback\nprocess exited\nbash-5.1$ ";
    assert_eq!(classify(pane).state, AgentState::Crashed);
}

#[parameterized(
    dollar = { "$ " },
    hash = { "# " },
    percent = { "% " },
    zsh = { "zsh: command terminated" },
)]
fn bare_shell_prompts_classify_as_crash(prompt: &str) {
    let pane = format!("old output\n{prompt}");
    assert_eq!(classify(&pane).state, AgentState::Crashed, "prompt {prompt:?}");
}

#[parameterized(
    frame_glyph = { "╭ tool running ─╮\nbash-5.1$ echo hi" },
    human_marker = { "Human: the build failed again\nbash-5.1$" },
    tool_marker = { "⎿ ran tests\nbash-5.1$" },
    discussed_failure = { "the tests previously failed\n$ " },
    build_failure_text = { "build failed with 3 errors\n$ " },
)]
fn safe_context_suppresses_crash(pane: &str) {
    assert_eq!(classify(pane).state, AgentState::Active, "pane {pane:?}");
}

#[test]
fn command_not_found_only_for_launch_command() {
    let crashed = "zsh: command not found: claude";
    assert_eq!(classify(crashed).state, AgentState::Crashed);

    // Some other tool missing, REPL frame alive: the agent is fine.
    let fine = "│ rg: command not found │";
    assert_eq!(classify(fine).state, AgentState::Active);
}

#[test]
fn killed_above_shell_prompt() {
    let pane = "running tests\nKilled\n$ ";
    assert_eq!(classify(pane).state, AgentState::Crashed);
}

#[test]
fn segfault_without_frame_is_crash() {
    let pane = "Segmentation fault (core dumped)\n";
    assert_eq!(classify(pane).state, AgentState::Crashed);
}

#[test]
fn plain_activity_is_active() {
    let pane = "Reading src/main.rs\nRunning tests: 42 passed";
    assert_eq!(classify(pane).state, AgentState::Active);
}

#[test]
fn classification_is_referentially_transparent() {
    let pane = "Claude usage limit reached. resets at 9:15am";
    let a = classify(pane);
    let b = classify(pane);
    assert_eq!(a, b);
}
