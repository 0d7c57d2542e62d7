// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: paths, PID-file lock, startup and shutdown.

use fs2::FileExt;
use muster_adapters::{DesktopNotifyAdapter, TmuxDriver};
use muster_core::{MonitorConfig, SystemClock};
use muster_engine::MonitorService;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::UnixListener;

/// Monitor service with the production adapter types.
pub type DaemonRuntime = MonitorService<TmuxDriver, DesktopNotifyAdapter, SystemClock>;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] muster_core::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon configuration: fixed paths under the state directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/muster)
    pub state_dir: PathBuf,
    /// Path to the Unix socket
    pub socket_path: PathBuf,
    /// Path to the PID file
    pub pid_path: PathBuf,
    /// Path to the daemon log file
    pub log_path: PathBuf,
    /// Path to the registry snapshot
    pub snapshot_path: PathBuf,
    /// Path to the optional TOML config
    pub config_path: PathBuf,
}

impl Config {
    /// Resolve paths under `$MUSTER_STATE_DIR`, falling back to the
    /// platform state directory. One daemon serves the user's whole fleet.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            pid_path: state_dir.join("pid").join("monitor.pid"),
            log_path: state_dir.join("daemon.log"),
            snapshot_path: state_dir.join("state").join("monitor_state.json"),
            config_path: state_dir.join("muster.toml"),
            state_dir,
        })
    }

    /// Load the monitor configuration the daemon should run with.
    pub fn monitor_config(&self) -> Result<MonitorConfig, LifecycleError> {
        Ok(MonitorConfig::load(Some(&self.config_path))?)
    }
}

/// State directory: `$MUSTER_STATE_DIR` override, else
/// `$XDG_STATE_HOME/muster`, else `~/.local/state/muster`.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("MUSTER_STATE_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|d| d.join("muster"))
        .ok_or(LifecycleError::NoStateDir)
}

/// Held for the daemon's lifetime; releases the lock on drop.
pub struct PidLock {
    // NOTE(lifetime): held to maintain the exclusive file lock
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl PidLock {
    /// Take the exclusive PID lock, refusing when a live daemon holds it.
    pub fn acquire(path: &std::path::Path) -> Result<Self, LifecycleError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(LifecycleError::LockFailed)?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Remove the PID file (lock releases when self drops).
    pub fn release(self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Bind the Unix socket, clearing any stale socket file first.
pub fn bind_socket(path: &std::path::Path) -> Result<UnixListener, LifecycleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    UnixListener::bind(path).map_err(|e| LifecycleError::BindFailed(path.to_path_buf(), e))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
