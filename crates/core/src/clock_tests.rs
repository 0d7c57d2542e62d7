// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Duration;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::default();
    let start = clock.now();
    clock.advance(Duration::seconds(90));
    assert_eq!(clock.now() - start, Duration::seconds(90));
}

#[test]
fn fake_clock_set_overrides() {
    let clock = FakeClock::default();
    let later = clock.now() + Duration::hours(1);
    clock.set(later);
    assert_eq!(clock.now(), later);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::default();
    let other = clock.clone();
    clock.advance(Duration::seconds(5));
    assert_eq!(clock.now(), other.now());
}
