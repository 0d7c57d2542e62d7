// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn publish_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = PubsubStore::new(dir.path());

    store.publish("status", "proj:0", "standup at 10").unwrap();
    store.publish("status", "proj:1", "done with auth").unwrap();

    let messages = store.read("status", 10).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, 1);
    assert_eq!(messages[1].body, "done with auth");
}

#[test]
fn read_limit_returns_newest() {
    let dir = tempfile::tempdir().unwrap();
    let store = PubsubStore::new(dir.path());
    for i in 0..5 {
        store.publish("c", "s", &format!("m{i}")).unwrap();
    }
    let messages = store.read("c", 2).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].body, "m3");
    assert_eq!(messages[1].body, "m4");
}

#[test]
fn channels_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let store = PubsubStore::new(dir.path());
    store.publish("alpha", "s", "x").unwrap();
    store.publish("beta", "s", "y").unwrap();
    store.publish("beta", "s", "z").unwrap();

    let channels = store.channels().unwrap();
    assert_eq!(
        channels,
        vec![("alpha".to_string(), 1), ("beta".to_string(), 2)]
    );

    assert_eq!(store.clear("beta").unwrap(), 2);
    assert!(store.read("beta", 10).unwrap().is_empty());
}

#[test]
fn search_is_case_insensitive_across_channels() {
    let dir = tempfile::tempdir().unwrap();
    let store = PubsubStore::new(dir.path());
    store.publish("a", "s", "Deploy finished").unwrap();
    store.publish("b", "s", "deploy started").unwrap();
    store.publish("b", "s", "unrelated").unwrap();

    let hits = store.search("DEPLOY").unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn empty_channel_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = PubsubStore::new(dir.path());
    assert!(store.read("ghost", 10).unwrap().is_empty());
}

#[test]
fn task_lifecycle_create_assign_archive() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::new(dir.path());

    let a = store.create("fix login", "the session cookie expires").unwrap();
    let b = store.create("add tests", "").unwrap();
    assert_eq!(a.id, 1);
    assert_eq!(b.id, 2);

    let assigned = store
        .distribute(&["proj:1".to_string(), "proj:2".to_string()])
        .unwrap();
    assert_eq!(assigned.len(), 2);
    assert_eq!(assigned[0].assignee.as_deref(), Some("proj:1"));
    assert_eq!(assigned[1].assignee.as_deref(), Some("proj:2"));

    store
        .update(1, |t| t.status = TaskStatus::Done)
        .unwrap()
        .unwrap();
    assert_eq!(store.archive(None).unwrap(), 1);

    let open = store.list(false).unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, 2);

    let all = store.list(true).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn update_missing_task_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::new(dir.path());
    assert!(store.update(99, |_| {}).unwrap().is_none());
}
