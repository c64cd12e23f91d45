//! Stage domain model

use crate::core::{
    command::{Command, CommandBuilder},
    config::{StageConfig, ToolPaths},
    record::{ConfigRecord, OptionValue},
    state::StageState,
    tool::Tool,
};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// One external-tool invocation in a pipeline
#[derive(Debug, Clone)]
pub struct Stage {
    /// Unique stage name
    pub name: String,

    /// Builds the command line for this stage's tool
    pub builder: CommandBuilder,

    /// Options for this invocation
    pub record: ConfigRecord,

    /// Files that must exist before the stage starts
    pub inputs: Vec<PathBuf>,

    /// Files the stage is expected to produce
    pub outputs: Vec<PathBuf>,

    /// Receives the captured stdout of the child
    pub stdout_path: Option<PathBuf>,

    /// Receives the captured stderr of the child
    pub stderr_path: Option<PathBuf>,

    /// Directories created before the stage runs
    pub create_dirs: Vec<PathBuf>,

    /// Runtime state
    pub state: StageState,
}

impl Stage {
    pub fn new(name: impl Into<String>, tool: Tool) -> Self {
        Self {
            name: name.into(),
            builder: CommandBuilder::new(tool),
            record: ConfigRecord::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            stdout_path: None,
            stderr_path: None,
            create_dirs: Vec::new(),
            state: StageState::Pending,
        }
    }

    /// Create a stage from a stage config
    pub fn from_config(config: &StageConfig, tools: &ToolPaths) -> Self {
        let builder = tools.builder_for(config.tool).with_extra_flags(&config.flags);

        Stage {
            name: config.name.clone(),
            builder,
            record: config.options.clone(),
            inputs: config.inputs.clone(),
            outputs: config.outputs.clone(),
            stdout_path: config.stdout.clone(),
            stderr_path: config.stderr.clone(),
            create_dirs: config.create_dirs.clone(),
            state: StageState::Pending,
        }
    }

    pub fn with_builder(mut self, builder: CommandBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.record.set(key, value);
        self
    }

    pub fn with_options(mut self, options: &ConfigRecord) -> Self {
        self.record.merge(options);
        self
    }

    pub fn with_input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_output(mut self, path: impl AsRef<Path>) -> Self {
        self.outputs.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_stdout(mut self, path: impl AsRef<Path>) -> Self {
        self.stdout_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_stderr(mut self, path: impl AsRef<Path>) -> Self {
        self.stderr_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.create_dirs.push(path.as_ref().to_path_buf());
        self
    }

    pub fn tool(&self) -> Tool {
        self.builder.tool()
    }

    /// Build the command line for this stage
    pub fn command(&self) -> Result<Command> {
        self.builder.build(&self.record)
    }

    /// First declared input that does not exist on disk
    pub fn missing_input(&self) -> Option<&Path> {
        first_missing(&self.inputs)
    }

    /// First declared output the tool did not produce
    pub fn missing_output(&self) -> Option<&Path> {
        first_missing(&self.outputs)
    }
}

fn first_missing(paths: &[PathBuf]) -> Option<&Path> {
    paths.iter().map(PathBuf::as_path).find(|path| !path.exists())
}
