// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting: the uniform response envelope and a generic text
//! renderer so every command prints consistently in both modes.

use chrono::Utc;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// The uniform response envelope every programmatic caller sees.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub error_type: Option<String>,
    /// Unix seconds, fractional.
    pub timestamp: f64,
    /// Dotted command path, e.g. `agent.status`.
    pub command: String,
}

impl Envelope {
    pub fn ok(command: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_type: None,
            timestamp: now_timestamp(),
            command: command.into(),
        }
    }

    pub fn err(
        command: impl Into<String>,
        error: impl Into<String>,
        error_type: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
            error_type: Some(error_type.into()),
            timestamp: now_timestamp(),
            command: command.into(),
        }
    }
}

fn now_timestamp() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Render a JSON value for humans: arrays of objects as aligned tables,
/// objects as `key: value` lines, scalars as themselves.
pub fn render_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(rows) if rows.iter().all(|r| r.is_object()) && !rows.is_empty() => {
            render_table(rows)
        }
        Value::Array(items) => items
            .iter()
            .map(|item| render_text(item))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                Value::Object(_) | Value::Array(_) => {
                    format!("{k}:\n{}", indent(&render_text(v)))
                }
                _ => format!("{k}: {}", scalar(v)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => scalar(other),
    }
}

fn render_table(rows: &[Value]) -> String {
    // Column set: union of keys, in first-row order then discovery order.
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut widths: Vec<usize> = columns.iter().map(String::len).collect();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(rows.len());
    for row in rows {
        let mut line = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let text = row.get(column).map(scalar).unwrap_or_default();
            widths[i] = widths[i].max(text.len());
            line.push(text);
        }
        cells.push(line);
    }

    let mut out = String::new();
    for (i, column) in columns.iter().enumerate() {
        out.push_str(&format!("{:w$}  ", column.to_uppercase(), w = widths[i]));
    }
    out.push('\n');
    for line in cells {
        for (i, cell) in line.iter().enumerate() {
            out.push_str(&format!("{:w$}  ", cell, w = widths[i]));
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
