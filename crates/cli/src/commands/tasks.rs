// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-record commands

use super::direct::DirectOps;
use super::{CliCtx, CmdResult, CommandError};
use crate::store::{TaskRecord, TaskStatus, TaskStore};
use clap::{Args, Subcommand};
use serde_json::json;

#[derive(Args)]
pub struct TasksArgs {
    #[command(subcommand)]
    pub command: TasksCommand,
}

#[derive(Subcommand)]
pub enum TasksCommand {
    /// Create a task
    Create {
        /// One-line task title
        title: String,
        /// Longer description / acceptance criteria
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Show one task, or counts by status with no id
    Status {
        /// Task id
        id: Option<u64>,
    },
    /// List tasks
    List {
        /// Include archived tasks
        #[arg(long)]
        all: bool,
    },
    /// Assign open tasks round-robin to worker agents and notify them
    Distribute {
        /// Session whose workers receive the tasks
        session: String,
    },
    /// Write tasks to a JSON file
    Export {
        /// Output path
        #[arg(long, default_value = "tasks-export.json")]
        path: std::path::PathBuf,
    },
    /// Archive one task, or every done task
    Archive {
        /// Task id (omit to archive all done tasks)
        id: Option<u64>,
    },
    /// Render a markdown task report
    Generate {
        /// Output path
        #[arg(long, default_value = "TASKS.md")]
        path: std::path::PathBuf,
    },
}

pub async fn handle(command: TasksCommand, ctx: &CliCtx) -> CmdResult {
    let store = TaskStore::new(&ctx.state_dir);
    match command {
        TasksCommand::Create { title, description } => {
            let task = store.create(&title, &description)?;
            Ok(task_json(&task))
        }

        TasksCommand::Status { id } => match id {
            Some(id) => match store.get(id)? {
                Some(task) => Ok(task_json(&task)),
                None => Err(CommandError::not_found(format!("no task {id}"))),
            },
            None => {
                let tasks = store.list(true)?;
                let count = |status: TaskStatus| {
                    tasks.iter().filter(|t| t.status == status).count()
                };
                Ok(json!({
                    "open": count(TaskStatus::Open),
                    "assigned": count(TaskStatus::Assigned),
                    "done": count(TaskStatus::Done),
                    "archived": count(TaskStatus::Archived),
                }))
            }
        },

        TasksCommand::List { all } => {
            let tasks = store.list(all)?;
            Ok(json!(tasks.iter().map(task_json).collect::<Vec<_>>()))
        }

        TasksCommand::Distribute { session } => {
            let ops = DirectOps::new();
            let workers: Vec<String> = ops
                .list_fleet()
                .await?
                .into_iter()
                .filter(|(target, name)| {
                    target.session() == session
                        && name.to_ascii_lowercase().contains("worker")
                })
                .map(|(target, _)| target.to_string())
                .collect();
            if workers.is_empty() {
                return Err(CommandError::not_found(format!(
                    "no worker windows in session '{session}'"
                )));
            }

            let assigned = store.distribute(&workers)?;
            for task in &assigned {
                if let Some(assignee) = &task.assignee {
                    let target = assignee.parse().map_err(CommandError::from)?;
                    let brief = format!(
                        "TASK #{}: {}\n{}\nReport to the PM when done.",
                        task.id, task.title, task.description
                    );
                    ops.send(&target, &brief, None).await?;
                }
            }
            Ok(json!({
                "assigned": assigned.iter().map(task_json).collect::<Vec<_>>(),
            }))
        }

        TasksCommand::Export { path } => {
            let tasks = store.list(true)?;
            std::fs::write(
                &path,
                serde_json::to_string_pretty(&tasks)
                    .map_err(|e| CommandError::backend(e.to_string()))?,
            )?;
            Ok(json!({ "exported": tasks.len(), "path": path.display().to_string() }))
        }

        TasksCommand::Archive { id } => {
            let archived = store.archive(id)?;
            Ok(json!({ "archived": archived }))
        }

        TasksCommand::Generate { path } => {
            let tasks = store.list(false)?;
            let mut report = String::from("# Task Board\n\n");
            for status in [TaskStatus::Open, TaskStatus::Assigned, TaskStatus::Done] {
                let section: Vec<&TaskRecord> =
                    tasks.iter().filter(|t| t.status == status).collect();
                if section.is_empty() {
                    continue;
                }
                report.push_str(&format!("## {:?}\n\n", status));
                for task in section {
                    let assignee = task
                        .assignee
                        .as_deref()
                        .map(|a| format!(" ({a})"))
                        .unwrap_or_default();
                    report.push_str(&format!("- [{}] {}{}\n", task.id, task.title, assignee));
                }
                report.push('\n');
            }
            std::fs::write(&path, report)?;
            Ok(json!({ "tasks": tasks.len(), "path": path.display().to_string() }))
        }
    }
}

fn task_json(task: &TaskRecord) -> serde_json::Value {
    json!({
        "id": task.id,
        "title": task.title,
        "status": format!("{:?}", task.status).to_lowercase(),
        "assignee": task.assignee,
        "created_at": task.created_at,
    })
}
