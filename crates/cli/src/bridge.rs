// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool bridge: the hierarchical `tool(group).invoke({action, …})` surface
//! generated from the command tree.
//!
//! One tool per command group; the `action` enum is the group's subcommand
//! set. Invocations are translated into the exact argv the CLI would parse,
//! then dispatched through the same handlers, so the two surfaces cannot
//! drift apart.

use crate::output::Envelope;
use crate::reflect::{self, CommandDescriptor, ParameterKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One call into the tool surface.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolInvocation {
    #[serde(alias = "tool")]
    pub group: String,
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    /// Positional overflow beyond the target.
    #[serde(default)]
    pub args: Vec<String>,
    /// Translated to `--flag=value` pairs (`true` becomes a bare flag).
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Published metadata for one action value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDef {
    pub name: String,
    /// Imperative phrasing plus `Requires: target` when applicable.
    #[serde(rename = "enumDescription")]
    pub enum_description: String,
    pub requires_target: bool,
}

/// Published metadata for one tool (one command group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub actions: Vec<ActionDef>,
}

/// Generate the tool set from the command tree. Deterministic: the same
/// tree yields the same definitions.
pub fn tool_defs(root: &clap::Command) -> Vec<ToolDef> {
    let descriptors = reflect::reflect(root);
    let mut tools = Vec::new();

    for group in descriptors.iter().filter(|d| d.path.len() == 1) {
        let actions: Vec<ActionDef> = descriptors
            .iter()
            .filter(|d| d.path.len() == 2 && d.path[0] == group.path[0])
            .map(|action| {
                let requires_target = action.requires_target();
                let mut description = action.help.clone();
                if requires_target {
                    description.push_str(". Requires: target");
                }
                ActionDef {
                    name: action.path[1].clone(),
                    enum_description: description,
                    requires_target,
                }
            })
            .collect();

        // Leaf top-level verbs (status, version) are commands, not tools.
        if actions.is_empty() {
            continue;
        }

        tools.push(ToolDef {
            name: group.path[0].clone(),
            description: group.help.clone(),
            actions,
        });
    }

    tools
}

/// Validate an invocation and translate it to argv, without executing.
///
/// Returns the argv on success, or the ready-made error envelope.
pub fn prepare(root: &clap::Command, invocation: &ToolInvocation) -> Result<Vec<String>, Envelope> {
    let command = format!("{}.{}", invocation.group, invocation.action);
    let descriptors = reflect::reflect(root);

    let groups: Vec<&CommandDescriptor> =
        descriptors.iter().filter(|d| d.path.len() == 1).collect();
    let Some(_group) = groups.iter().find(|d| d.path[0] == invocation.group) else {
        let known: Vec<&str> = groups.iter().map(|d| d.path[0].as_str()).collect();
        let similar = find_similar(&invocation.group, &known);
        let mut data = Map::new();
        if let Some(best) = similar.first() {
            data.insert("did_you_mean".to_string(), json!(best));
        }
        return Err(Envelope::err(
            command,
            format!(
                "unknown tool group '{}'; valid groups: {}",
                invocation.group,
                known.join(", ")
            ),
            "invalid_action",
            Some(Value::Object(data)),
        ));
    };

    let actions: Vec<&CommandDescriptor> = descriptors
        .iter()
        .filter(|d| d.path.len() == 2 && d.path[0] == invocation.group)
        .collect();
    let Some(action) = actions.iter().find(|d| d.path[1] == invocation.action) else {
        let known: Vec<&str> = actions.iter().map(|d| d.path[1].as_str()).collect();
        let similar = find_similar(&invocation.action, &known);
        let mut data = Map::new();
        if let Some(best) = similar.first() {
            data.insert("did_you_mean".to_string(), json!(best));
        }
        return Err(Envelope::err(
            command,
            format!(
                "unknown action '{}'; valid actions: {}",
                invocation.action,
                known.join(", ")
            ),
            "invalid_action",
            Some(Value::Object(data)),
        ));
    };

    // Target checks ahead of parsing so the taxonomy stays precise.
    if action.requires_target() {
        match invocation.target.as_deref() {
            None => {
                return Err(Envelope::err(
                    command,
                    format!("action '{}' requires a target", invocation.action),
                    "missing_target",
                    None,
                ));
            }
            Some(raw) => {
                if raw.parse::<muster_core::AgentTarget>().is_err() {
                    return Err(Envelope::err(
                        command,
                        format!("invalid target '{raw}': expected session:window"),
                        "invalid_target_format",
                        None,
                    ));
                }
            }
        }
    }

    // Arity: every required positional beyond the target must be covered.
    let required_positionals = action
        .parameters
        .iter()
        .filter(|p| {
            p.kind == ParameterKind::Positional
                && p.required
                && p.param_type != crate::reflect::ParameterType::Target
        })
        .count();
    if invocation.args.len() < required_positionals {
        return Err(Envelope::err(
            command,
            format!(
                "action '{}' needs {} positional argument(s), got {}",
                invocation.action,
                required_positionals,
                invocation.args.len()
            ),
            "missing_argument",
            None,
        ));
    }

    let mut argv = vec![
        "muster".to_string(),
        invocation.group.clone(),
        invocation.action.clone(),
    ];
    if let Some(target) = &invocation.target {
        argv.push(target.clone());
    }
    argv.extend(invocation.args.iter().cloned());
    for (key, value) in &invocation.options {
        let flag = format!("--{}", key.replace('_', "-"));
        match value {
            Value::Bool(true) => argv.push(flag),
            Value::Bool(false) => {}
            Value::String(s) => argv.push(format!("{flag}={s}")),
            other => argv.push(format!("{flag}={other}")),
        }
    }

    Ok(argv)
}

/// Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}

/// Candidates within edit distance `max(2, len/3)`, closest first; prefix
/// matches are always included.
fn find_similar(input: &str, candidates: &[&str]) -> Vec<String> {
    let threshold = (input.len() / 3).max(2);
    let mut matches: Vec<(usize, String)> = candidates
        .iter()
        .filter(|c| **c != input)
        .filter_map(|c| {
            let dist = edit_distance(input, c);
            if dist <= threshold || c.starts_with(input) || input.starts_with(c) {
                Some((dist, c.to_string()))
            } else {
                None
            }
        })
        .collect();
    matches.sort_by(|(da, na), (db, nb)| da.cmp(db).then(na.cmp(nb)));
    matches.into_iter().map(|(_, name)| name).collect()
}

/// Map a clap parse failure to the bridge error taxonomy.
pub fn parse_error_envelope(command: String, error: &clap::Error) -> Envelope {
    use clap::error::ErrorKind;
    let error_type = match error.kind() {
        ErrorKind::MissingRequiredArgument => "missing_argument",
        ErrorKind::InvalidValue
        | ErrorKind::UnknownArgument
        | ErrorKind::ValueValidation
        | ErrorKind::TooManyValues
        | ErrorKind::WrongNumberOfValues => "validation_error",
        _ => "validation_error",
    };
    Envelope::err(command, error.to_string(), error_type, None)
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
