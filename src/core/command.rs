//! Command construction from configuration records

use crate::core::record::{ConfigRecord, OptionValue};
use crate::core::tool::{FlagTable, StructuralKey, Tool, SELECTOR_KEY};
use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::fmt;

/// A program and its argument tokens, ready to execute
///
/// Built once by [`CommandBuilder`] and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    program: String,
    args: Vec<String>,
}

impl Command {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Program followed by every argument
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }

    /// Whether `token` appears among the arguments
    pub fn has_arg(&self, token: &str) -> bool {
        self.args.iter().any(|a| a == token)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line: Vec<&str> = self.tokens().collect();
        f.write_str(&line.join(" "))
    }
}

/// Translates a [`ConfigRecord`] into a [`Command`] for one tool
///
/// Emission order:
/// 1. the launcher (default executable or configured override)
/// 2. the tool's fixed leading arguments
/// 3. structural keys through their dedicated flags, in the tool's order
/// 4. every other key, sorted, through the flag table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuilder {
    tool: Tool,
    launcher: Vec<String>,
    flags: FlagTable,
}

impl CommandBuilder {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            launcher: vec![tool.default_program().to_string()],
            flags: tool.flag_table(),
        }
    }

    /// Replace the executable, e.g. `["python", "/opt/SPAdes/bin/metaspades.py"]`
    pub fn with_launcher(mut self, launcher: Vec<String>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Replace the flag table entirely
    pub fn with_flags(mut self, flags: FlagTable) -> Self {
        self.flags = flags;
        self
    }

    /// Add entries on top of the current flag table
    pub fn with_extra_flags(mut self, flags: &FlagTable) -> Self {
        self.flags.extend(flags);
        self
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn flags(&self) -> &FlagTable {
        &self.flags
    }

    /// Build the command line; the record is only read
    pub fn build(&self, record: &ConfigRecord) -> Result<Command> {
        let (program, launcher_args) = self
            .launcher
            .split_first()
            .ok_or_else(|| PipelineError::invalid(self.tool.name(), "empty launcher"))?;

        let mut args: Vec<String> = launcher_args.to_vec();
        args.extend(self.tool.leading_args().iter().map(|a| a.to_string()));

        for structural in self.tool.structural_keys() {
            if let Some(value) = record.get(structural.key) {
                push_structural(&mut args, structural, value)?;
            }
        }

        for (key, value) in record.iter() {
            if key == SELECTOR_KEY || self.tool.is_structural(key) {
                continue;
            }
            let flag = self.flags.flag_for(key);
            match value {
                OptionValue::Text(text) => {
                    args.push(flag);
                    args.push(text.clone());
                }
                OptionValue::List(items) if items.is_empty() => {
                    return Err(PipelineError::invalid(key, "empty list"));
                }
                OptionValue::List(items) => {
                    args.push(flag);
                    args.push(items.join(","));
                }
                OptionValue::Flag(true) => args.push(flag),
                OptionValue::Flag(false) => {
                    return Err(PipelineError::invalid(key, "false is not a flag value"));
                }
                OptionValue::Unsupported { kind, raw } => {
                    return Err(PipelineError::invalid(key, unsupported_reason(kind, raw)));
                }
            }
        }

        Ok(Command::new(program.clone(), args))
    }
}

fn unsupported_reason(kind: &str, raw: &str) -> String {
    if kind == "number" {
        format!("unsupported number value '{}' (quote it to pass it as text)", raw)
    } else {
        format!("unsupported {} value '{}'", kind, raw)
    }
}

fn push_structural(args: &mut Vec<String>, structural: &StructuralKey, value: &OptionValue) -> Result<()> {
    let rendered = match value {
        OptionValue::Text(text) => text.clone(),
        OptionValue::List(items) if !items.is_empty() => items.join(structural.separator),
        OptionValue::List(_) => return Err(PipelineError::invalid(structural.key, "empty list")),
        OptionValue::Flag(_) => {
            return Err(PipelineError::invalid(structural.key, "expects a path, not a flag"));
        }
        OptionValue::Unsupported { kind, .. } => {
            return Err(PipelineError::invalid(
                structural.key,
                format!("unsupported {} value", kind),
            ));
        }
    };

    if let Some(flag) = structural.flag {
        args.push(flag.to_string());
    }
    args.push(rendered);
    Ok(())
}

/// Build a command for `tool` with an explicit flag table
pub fn build_command(tool: Tool, record: &ConfigRecord, flags: &FlagTable) -> Result<Command> {
    CommandBuilder::new(tool).with_flags(flags.clone()).build(record)
}
