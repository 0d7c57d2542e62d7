// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn dedup_key_pairs_kind_with_target() {
    let now = DateTime::from_timestamp(1_750_000_000, 0).unwrap();
    let a = NotificationRecord::new(
        NotificationKind::Crash,
        Some("proj:1".parse().unwrap()),
        "proj:0".parse().unwrap(),
        "agent crashed",
        now,
    );
    let b = NotificationRecord::new(
        NotificationKind::Crash,
        Some("proj:2".parse().unwrap()),
        "proj:0".parse().unwrap(),
        "agent crashed",
        now,
    );
    assert_ne!(a.dedup_key(), b.dedup_key());

    let fleet = NotificationRecord::new(
        NotificationKind::RateLimit,
        None,
        "proj:0".parse().unwrap(),
        "rate limited",
        now,
    );
    assert_eq!(fleet.dedup_key(), (NotificationKind::RateLimit, None));
}

#[test]
fn kind_display_is_snake_case() {
    assert_eq!(NotificationKind::UnsubmittedInput.to_string(), "unsubmitted_input");
    assert_eq!(NotificationKind::RateLimitResume.to_string(), "rate_limit_resume");
}
