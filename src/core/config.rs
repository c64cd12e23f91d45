//! Pipeline configuration from YAML

use crate::core::{command::CommandBuilder, record::ConfigRecord, tool::{FlagTable, Tool}, Pipeline};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// How to launch a tool: a single executable, or an interpreter plus script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Launcher {
    Program(String),
    Command(Vec<String>),
}

impl Launcher {
    /// Launcher tokens with a leading `~/` expanded to the home directory
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Launcher::Program(program) => vec![expand_home(program)],
            Launcher::Command(tokens) => tokens.iter().map(|t| expand_home(t)).collect(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Launcher::Program(program) => program.trim().is_empty(),
            Launcher::Command(tokens) => tokens.first().map_or(true, |t| t.trim().is_empty()),
        }
    }
}

/// Expand a leading `~/` using the current user's home directory
pub fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => path.to_string(),
    }
}

/// Per-tool executable overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolPaths(BTreeMap<Tool, Launcher>);

impl ToolPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, tool: Tool, launcher: Launcher) {
        self.0.insert(tool, launcher);
    }

    pub fn get(&self, tool: Tool) -> Option<&Launcher> {
        self.0.get(&tool)
    }

    /// A command builder for `tool`, honouring any override
    pub fn builder_for(&self, tool: Tool) -> CommandBuilder {
        let builder = CommandBuilder::new(tool);
        match self.get(tool) {
            Some(launcher) => builder.with_launcher(launcher.tokens()),
            None => builder,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (tool, launcher) in &self.0 {
            if launcher.is_empty() {
                anyhow::bail!("Tool '{}' has an empty executable override", tool);
            }
        }
        Ok(())
    }
}

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Executable overrides shared by every stage
    #[serde(default)]
    pub tools: ToolPaths,

    /// Kill a stage that runs longer than this (in seconds)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Stages, run in order
    pub stages: Vec<StageConfig>,
}

/// Stage configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Unique stage name
    pub name: String,

    /// Which external tool to run
    pub tool: Tool,

    /// Options turned into command-line flags
    #[serde(default)]
    pub options: ConfigRecord,

    /// Extra flag table entries for this stage
    #[serde(default)]
    pub flags: FlagTable,

    /// Files that must exist before the stage starts
    #[serde(default)]
    pub inputs: Vec<PathBuf>,

    /// Files the stage produces
    #[serde(default)]
    pub outputs: Vec<PathBuf>,

    /// Write the tool's stdout here
    #[serde(default)]
    pub stdout: Option<PathBuf>,

    /// Write the tool's stderr here
    #[serde(default)]
    pub stderr: Option<PathBuf>,

    /// Directories to create before running
    #[serde(default)]
    pub create_dirs: Vec<PathBuf>,
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            anyhow::bail!("Pipeline '{}' has no stages", self.name);
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.name.trim().is_empty() {
                anyhow::bail!("Stage names must not be empty");
            }
            if !seen.insert(&stage.name) {
                anyhow::bail!("Duplicate stage name: {}", stage.name);
            }
        }

        if self.timeout_secs == Some(0) {
            anyhow::bail!("timeout_secs must be greater than zero");
        }

        self.tools.validate()
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}
