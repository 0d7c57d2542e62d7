// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI reflection: walk the clap command tree into a stable list of
//! [`CommandDescriptor`]s.
//!
//! The command tree is the single source of truth for the tool surface;
//! regeneration is a pure function of the tree, so an identical tree always
//! yields a byte-identical descriptor list.

use clap::{Arg, ArgAction, Command};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Positional,
    Option,
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Str,
    Int,
    Bool,
    Path,
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub kind: ParameterKind,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    /// Command path from the root, e.g. `["agent", "send"]`.
    pub path: Vec<String>,
    pub help: String,
    pub parameters: Vec<ParameterDescriptor>,
}

impl CommandDescriptor {
    /// Whether this command takes a required `target` positional.
    pub fn requires_target(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| p.param_type == ParameterType::Target && p.required)
    }

    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// Reflect the full command tree, depth-first in declaration order.
pub fn reflect(root: &Command) -> Vec<CommandDescriptor> {
    let mut descriptors = Vec::new();
    walk(root, &mut Vec::new(), &mut descriptors);
    descriptors
}

fn walk(command: &Command, path: &mut Vec<String>, out: &mut Vec<CommandDescriptor>) {
    // The root itself is not a descriptor; every named node below it is.
    if !path.is_empty() {
        out.push(CommandDescriptor {
            path: path.clone(),
            help: command
                .get_about()
                .map(|s| s.to_string())
                .unwrap_or_default(),
            parameters: parameters_of(command),
        });
    }

    for subcommand in command.get_subcommands() {
        path.push(subcommand.get_name().to_string());
        walk(subcommand, path, out);
        path.pop();
    }
}

fn parameters_of(command: &Command) -> Vec<ParameterDescriptor> {
    let mut parameters = Vec::new();
    for arg in command.get_arguments() {
        // Global plumbing (help, output format) is not part of the surface.
        if arg.is_global_set() || arg.get_id() == "help" || arg.get_id() == "version" {
            continue;
        }
        parameters.push(describe_arg(arg));
    }
    // Positionals first, in index order; then options by name.
    parameters.sort_by_key(|p| match p.kind {
        ParameterKind::Positional => 0,
        ParameterKind::Option => 1,
        ParameterKind::Flag => 2,
    });
    parameters
}

fn describe_arg(arg: &Arg) -> ParameterDescriptor {
    let name = arg.get_id().to_string();
    let is_flag = matches!(
        arg.get_action(),
        ArgAction::SetTrue | ArgAction::SetFalse | ArgAction::Count
    );
    let kind = if is_flag {
        ParameterKind::Flag
    } else if arg.is_positional() {
        ParameterKind::Positional
    } else {
        ParameterKind::Option
    };

    let default = arg
        .get_default_values()
        .first()
        .and_then(|v| v.to_str())
        .map(str::to_string);

    let enum_values = {
        let values: Vec<String> = arg
            .get_possible_values()
            .iter()
            .map(|v| v.get_name().to_string())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    };

    ParameterDescriptor {
        param_type: infer_type(&name, is_flag, default.as_deref()),
        required: arg.is_required_set(),
        kind,
        enum_values,
        default,
        description: arg.get_help().map(|s| s.to_string()).unwrap_or_default(),
        name,
    }
}

/// Parameter type inferred from the declared argument. The convention is
/// carried by naming: the required positional named `target` is always an
/// agent address.
fn infer_type(name: &str, is_flag: bool, default: Option<&str>) -> ParameterType {
    if is_flag {
        return ParameterType::Bool;
    }
    if name == "target" {
        return ParameterType::Target;
    }
    if name == "path" || name.ends_with("_path") || name.ends_with("_dir") {
        return ParameterType::Path;
    }
    const INT_NAMES: [&str; 8] = [
        "limit", "lines", "minutes", "workers", "id", "after", "delay_ms", "window",
    ];
    if INT_NAMES.contains(&name) || default.is_some_and(|d| d.parse::<i64>().is_ok()) {
        return ParameterType::Int;
    }
    ParameterType::Str
}

#[cfg(test)]
#[path = "reflect_tests.rs"]
mod tests;
