// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management: starting, stopping, and locating `musterd`.

use crate::client::ClientError;
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

/// Start the daemon in the background, detached from this process.
pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let musterd = find_musterd_binary();
    Command::new(&musterd)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {e}", musterd.display())))
}

/// Find the musterd binary: `MUSTER_DAEMON_BIN` override, a sibling of the
/// current executable, else PATH lookup.
fn find_musterd_binary() -> PathBuf {
    if let Ok(path) = std::env::var("MUSTER_DAEMON_BIN") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("musterd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("musterd")
}

/// Socket path for the user-level daemon.
pub fn daemon_socket() -> Result<PathBuf, ClientError> {
    Ok(state_dir()?.join("daemon.sock"))
}

/// State directory shared with the daemon.
pub fn state_dir() -> Result<PathBuf, ClientError> {
    muster_daemon::lifecycle::state_dir().map_err(|_| ClientError::NoStateDir)
}

/// PID from the daemon PID file, if present.
pub fn read_daemon_pid() -> Result<Option<u32>, ClientError> {
    let pid_path = state_dir()?.join("pid").join("monitor.pid");
    if !pid_path.exists() {
        return Ok(None);
    }
    match std::fs::read_to_string(&pid_path) {
        Ok(content) => Ok(content.trim().parse::<u32>().ok()),
        Err(_) => Ok(None),
    }
}

/// Whether a process with this PID exists.
pub fn process_exists(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// SIGTERM the daemon and wait for it to exit, escalating to SIGKILL.
pub fn stop_daemon_by_pid(pid: u32, timeout: Duration) -> bool {
    kill_signal("-15", pid);

    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    kill_signal("-9", pid);
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
