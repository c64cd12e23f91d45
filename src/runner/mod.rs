//! Running commands as child processes

pub mod process;

use crate::core::Command;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::PathBuf;

pub use process::ProcessRunner;

/// Everything a finished child process produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code (`-1` when the child was killed by a signal)
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Trait for command execution - allows the sequencer to run against
/// real processes or a test double
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion
    ///
    /// A non-zero exit status is an error carrying the captured stderr.
    async fn run(&self, command: &Command) -> Result<ProcessOutput, PipelineError>;
}

/// Configuration for the process runner
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Kill the child after this many seconds; `None` waits forever
    pub timeout_secs: Option<u64>,

    /// Working directory for the child
    pub working_dir: Option<PathBuf>,
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}
