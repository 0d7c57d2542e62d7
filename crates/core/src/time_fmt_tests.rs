// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    seconds = { 5, "5s" },
    minute_floor = { 61, "1m" },
    minutes = { 1800, "30m" },
    exact_hour = { 3600, "1h" },
    hour_and_minutes = { 5400, "1h30m" },
    days = { 260_000, "3d" },
)]
fn formats(secs: u64, expected: &str) {
    assert_eq!(format_elapsed(secs), expected);
}
