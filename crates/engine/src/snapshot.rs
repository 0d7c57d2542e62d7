// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry snapshot persistence.
//!
//! A small versioned JSON file (`state/monitor_state.json`) written
//! periodically and at shutdown so a restarted monitor resumes with the
//! fleet's grace timers and histories intact. Writers never remove known
//! fields without bumping `version`; readers ignore unknown fields.

use chrono::{DateTime, Utc};
use muster_core::AgentRecord;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Point-in-time registry state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub agents: Vec<AgentRecord>,
}

impl RegistrySnapshot {
    pub fn new(agents: Vec<AgentRecord>, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at,
            agents,
        }
    }

    /// Save atomically (write to .tmp, fsync, then rename).
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load a snapshot if one exists and is usable.
    ///
    /// Returns `Ok(None)` when the file is missing, predates the supported
    /// format, or does not parse. Unusable files are moved to a `.bak` so
    /// the monitor starts fresh instead of crash-looping.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        match serde_json::from_reader::<_, RegistrySnapshot>(reader) {
            Ok(snapshot) if snapshot.version >= SNAPSHOT_VERSION => Ok(Some(snapshot)),
            Ok(snapshot) => {
                warn!(
                    version = snapshot.version,
                    "snapshot format too old, starting fresh"
                );
                Ok(None)
            }
            Err(e) => {
                let bak_path = rotate_bak_path(path);
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "corrupt snapshot, moving to .bak and starting fresh",
                );
                fs::rename(path, &bak_path)?;
                Ok(None)
            }
        }
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
