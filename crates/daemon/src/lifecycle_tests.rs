// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pid_lock_writes_pid_and_blocks_second_holder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pid").join("monitor.pid");

    let lock = PidLock::acquire(&path).unwrap();
    let written: u32 = std::fs::read_to_string(&path)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(written, std::process::id());

    // A second acquisition in the same process fails while the lock is held.
    assert!(matches!(
        PidLock::acquire(&path),
        Err(LifecycleError::LockFailed(_))
    ));

    lock.release();
    assert!(!path.exists());
}

#[test]
fn released_lock_can_be_reacquired() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monitor.pid");

    let lock = PidLock::acquire(&path).unwrap();
    lock.release();
    let lock = PidLock::acquire(&path).unwrap();
    lock.release();
}

#[tokio::test]
async fn bind_socket_clears_stale_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.sock");
    std::fs::write(&path, "stale").unwrap();

    let listener = bind_socket(&path).unwrap();
    drop(listener);
    assert!(path.exists());
}

#[test]
fn config_paths_hang_off_the_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("MUSTER_STATE_DIR", dir.path());
    let config = Config::load().unwrap();
    std::env::remove_var("MUSTER_STATE_DIR");

    assert_eq!(config.state_dir, dir.path());
    assert_eq!(config.pid_path, dir.path().join("pid/monitor.pid"));
    assert_eq!(
        config.snapshot_path,
        dir.path().join("state/monitor_state.json")
    );
    assert_eq!(config.socket_path, dir.path().join("daemon.sock"));
}
