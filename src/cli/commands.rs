//! CLI command definitions

use clap::{Args, ValueEnum};

/// Run a pipeline of stages
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Kill any stage running longer than this (overrides the file)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Run the assembly workflow
#[derive(Debug, Args, Clone)]
pub struct AssembleCommand {
    /// Path to assembly job YAML file
    #[arg(short, long)]
    pub file: String,

    /// Extra assembler option overrides (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub option: Vec<(String, String)>,

    /// Kill any stage running longer than this (overrides the file)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Run the rRNA filtering workflow
#[derive(Debug, Args, Clone)]
pub struct FilterRrnaCommand {
    /// Path to rRNA filtering job YAML file
    #[arg(short, long)]
    pub file: String,

    /// Extra SortMeRNA option overrides (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub option: Vec<(String, String)>,

    /// Kill any stage running longer than this (overrides the file)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Validate a configuration or print its commands
#[derive(Debug, Args, Clone)]
pub struct InspectCommand {
    /// Path to the YAML file
    #[arg(short, long)]
    pub file: String,

    /// What the file describes
    #[arg(long, value_enum, default_value_t = ConfigKind::Pipeline)]
    pub kind: ConfigKind,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Kinds of configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKind {
    /// A list of stages
    Pipeline,
    /// An assembly job
    Assembly,
    /// An rRNA filtering job
    Rrna,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
