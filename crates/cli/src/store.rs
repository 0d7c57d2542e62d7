// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed stores under the state directory: pubsub channel logs and
//! task records. Append-only JSONL for messages, a single JSON document
//! for tasks, both human-inspectable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubsubMessage {
    pub id: u64,
    pub channel: String,
    pub sender: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
}

/// Per-channel JSONL logs under `pubsub/`.
pub struct PubsubStore {
    dir: PathBuf,
}

impl PubsubStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            dir: state_dir.join("pubsub"),
        }
    }

    fn channel_path(&self, channel: &str) -> PathBuf {
        self.dir.join(format!("{channel}.jsonl"))
    }

    pub fn publish(
        &self,
        channel: &str,
        sender: &str,
        body: &str,
    ) -> std::io::Result<PubsubMessage> {
        fs::create_dir_all(&self.dir)?;
        let existing = self.read(channel, usize::MAX)?;
        let message = PubsubMessage {
            id: existing.last().map(|m| m.id + 1).unwrap_or(1),
            channel: channel.to_string(),
            sender: sender.to_string(),
            body: body.to_string(),
            published_at: Utc::now(),
        };

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.channel_path(channel))?;
        let line = serde_json::to_string(&message)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(file, "{line}")?;
        Ok(message)
    }

    /// Last `limit` messages, oldest first. Unparseable lines are skipped.
    pub fn read(&self, channel: &str, limit: usize) -> std::io::Result<Vec<PubsubMessage>> {
        let path = self.channel_path(channel);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        let mut messages: Vec<PubsubMessage> = content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        if messages.len() > limit {
            messages = messages.split_off(messages.len() - limit);
        }
        Ok(messages)
    }

    pub fn channels(&self) -> std::io::Result<Vec<(String, usize)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut channels = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let count = self.read(name, usize::MAX)?.len();
            channels.push((name.to_string(), count));
        }
        channels.sort();
        Ok(channels)
    }

    pub fn clear(&self, channel: &str) -> std::io::Result<usize> {
        let count = self.read(channel, usize::MAX)?.len();
        let path = self.channel_path(channel);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(count)
    }

    /// Messages published at or after `since`.
    pub fn query(
        &self,
        channel: &str,
        since: DateTime<Utc>,
    ) -> std::io::Result<Vec<PubsubMessage>> {
        Ok(self
            .read(channel, usize::MAX)?
            .into_iter()
            .filter(|m| m.published_at >= since)
            .collect())
    }

    /// Case-insensitive substring search across all channels.
    pub fn search(&self, pattern: &str) -> std::io::Result<Vec<PubsubMessage>> {
        let needle = pattern.to_lowercase();
        let mut hits = Vec::new();
        for (channel, _) in self.channels()? {
            for message in self.read(&channel, usize::MAX)? {
                if message.body.to_lowercase().contains(&needle) {
                    hits.push(message);
                }
            }
        }
        Ok(hits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Assigned,
    Done,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TaskFile {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    tasks: Vec<TaskRecord>,
}

/// Single-document task store at `tasks.json`.
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join("tasks.json"),
        }
    }

    fn load(&self) -> std::io::Result<TaskFile> {
        if !self.path.exists() {
            return Ok(TaskFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    fn save(&self, file: &TaskFile) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(
            &tmp,
            serde_json::to_string_pretty(file)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
        )?;
        fs::rename(&tmp, &self.path)
    }

    pub fn create(&self, title: &str, description: &str) -> std::io::Result<TaskRecord> {
        let mut file = self.load()?;
        file.next_id += 1;
        let task = TaskRecord {
            id: file.next_id,
            title: title.to_string(),
            description: description.to_string(),
            status: TaskStatus::Open,
            assignee: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        file.tasks.push(task.clone());
        self.save(&file)?;
        Ok(task)
    }

    pub fn list(&self, include_archived: bool) -> std::io::Result<Vec<TaskRecord>> {
        Ok(self
            .load()?
            .tasks
            .into_iter()
            .filter(|t| include_archived || t.status != TaskStatus::Archived)
            .collect())
    }

    pub fn get(&self, id: u64) -> std::io::Result<Option<TaskRecord>> {
        Ok(self.load()?.tasks.into_iter().find(|t| t.id == id))
    }

    pub fn update<F>(&self, id: u64, mutate: F) -> std::io::Result<Option<TaskRecord>>
    where
        F: FnOnce(&mut TaskRecord),
    {
        let mut file = self.load()?;
        let Some(task) = file.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        mutate(task);
        task.updated_at = Some(Utc::now());
        let updated = task.clone();
        self.save(&file)?;
        Ok(Some(updated))
    }

    /// Assign every open task round-robin over `assignees`. Returns the
    /// assignments made.
    pub fn distribute(&self, assignees: &[String]) -> std::io::Result<Vec<TaskRecord>> {
        if assignees.is_empty() {
            return Ok(Vec::new());
        }
        let mut file = self.load()?;
        let mut assigned = Vec::new();
        let mut next = 0usize;
        for task in file.tasks.iter_mut() {
            if task.status == TaskStatus::Open {
                task.assignee = Some(assignees[next % assignees.len()].clone());
                task.status = TaskStatus::Assigned;
                task.updated_at = Some(Utc::now());
                assigned.push(task.clone());
                next += 1;
            }
        }
        self.save(&file)?;
        Ok(assigned)
    }

    /// Archive a specific task, or every done task when `id` is None.
    pub fn archive(&self, id: Option<u64>) -> std::io::Result<usize> {
        let mut file = self.load()?;
        let mut archived = 0;
        for task in file.tasks.iter_mut() {
            let matches = match id {
                Some(id) => task.id == id,
                None => task.status == TaskStatus::Done,
            };
            if matches && task.status != TaskStatus::Archived {
                task.status = TaskStatus::Archived;
                task.updated_at = Some(Utc::now());
                archived += 1;
            }
        }
        self.save(&file)?;
        Ok(archived)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
