//! Child-process runner backed by tokio

use crate::core::Command;
use crate::error::PipelineError;
use crate::runner::{CommandRunner, ProcessOutput, RunnerConfig};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs commands as real child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    config: RunnerConfig,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    /// Spawn the command, wait for it, and capture stdout and stderr
    ///
    /// # Errors
    /// - `Spawn` if the executable cannot be started
    /// - `Timeout` if a timeout is configured and expires (the child is killed)
    /// - `Execution` if the child exits with a non-zero status
    async fn run(&self, command: &Command) -> Result<ProcessOutput, PipelineError> {
        debug!("Spawning: {}", command);

        let mut child = tokio::process::Command::new(command.program());
        child
            .args(command.args())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            child.current_dir(dir);
        }

        let result = match self.config.timeout_secs {
            Some(secs) => timeout(Duration::from_secs(secs), child.output())
                .await
                .map_err(|_| PipelineError::Timeout {
                    program: command.program().to_string(),
                    secs,
                })?,
            None => child.output().await,
        };

        let output = result.map_err(|source| PipelineError::Spawn {
            program: command.program().to_string(),
            source,
        })?;

        let code = output.status.code().unwrap_or(-1);
        let captured = ProcessOutput {
            code,
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if !output.status.success() {
            let stderr = captured.stderr_lossy();
            warn!("{} exited with code {}: {}", command.program(), code, stderr.trim());
            return Err(PipelineError::Execution {
                program: command.program().to_string(),
                code,
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(
            "{} finished: {} bytes stdout, {} bytes stderr",
            command.program(),
            captured.stdout.len(),
            captured.stderr.len()
        );

        Ok(captured)
    }
}
