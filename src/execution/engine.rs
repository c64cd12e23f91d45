//! Main execution engine - runs a pipeline's stages in order

use crate::{
    core::{ExecutionStatus, Pipeline, Stage, StageState},
    error::{PipelineError, Result},
    runner::{CommandRunner, ProcessOutput},
};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_stages: usize,
    },
    StageStarted {
        index: usize,
        stage: String,
        command: String,
    },
    StageCompleted {
        index: usize,
        stage: String,
    },
    StageFailed {
        index: usize,
        stage: String,
        error: String,
    },
    StageSkipped {
        index: usize,
        stage: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Pipeline sequencer
///
/// Each stage runs to completion before the next one starts. The first
/// failure stops the pipeline; later stages are marked skipped and never run.
pub struct ExecutionEngine<R> {
    runner: R,
    event_handlers: Vec<EventHandler>,
}

impl<R: CommandRunner> ExecutionEngine<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline
    ///
    /// On failure the returned error is a `PipelineError::Stage` carrying the
    /// 1-based index and name of the stage that failed.
    pub async fn execute(&self, pipeline: &mut Pipeline) -> Result<()> {
        let execution_id = pipeline.state.execution_id;
        let total = pipeline.stages.len();

        info!("Starting pipeline execution: {} ({})", pipeline.name, execution_id);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
            total_stages: total,
        });

        pipeline.state.start(total);

        for position in 0..total {
            let index = position + 1;
            let started_at = Utc::now();
            pipeline.stages[position].state = StageState::Running { started_at };

            let outcome = self.execute_stage(index, &pipeline.stages[position]).await;
            let name = pipeline.stages[position].name.clone();

            match outcome {
                Ok(_) => {
                    info!("Stage {}/{} ({}) completed", index, total, name);
                    pipeline.stages[position].state = StageState::Completed {
                        started_at,
                        completed_at: Utc::now(),
                    };
                    pipeline.state.completed_stages += 1;
                    self.emit_event(ExecutionEvent::StageCompleted { index, stage: name });
                }
                Err(err) => {
                    error!("Stage {}/{} ({}) failed: {}", index, total, name, err);
                    pipeline.stages[position].state = StageState::Failed {
                        error: err.to_string(),
                        started_at,
                        failed_at: Utc::now(),
                    };
                    pipeline.state.failed_stages += 1;
                    self.emit_event(ExecutionEvent::StageFailed {
                        index,
                        stage: name.clone(),
                        error: err.to_string(),
                    });

                    self.skip_remaining(pipeline, position + 1, &name);
                    pipeline.state.fail();
                    self.emit_event(ExecutionEvent::PipelineCompleted {
                        execution_id,
                        status: ExecutionStatus::Failed,
                    });
                    return Err(err.in_stage(index, name));
                }
            }
        }

        pipeline.state.complete();
        info!("Pipeline {} completed", pipeline.name);
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            status: ExecutionStatus::Completed,
        });
        Ok(())
    }

    fn skip_remaining(&self, pipeline: &mut Pipeline, from: usize, failed: &str) {
        for position in from..pipeline.stages.len() {
            let stage = &mut pipeline.stages[position];
            stage.state = StageState::Skipped {
                reason: format!("stage '{}' failed", failed),
            };
            self.emit_event(ExecutionEvent::StageSkipped {
                index: position + 1,
                stage: stage.name.clone(),
            });
        }
    }

    /// Check inputs, build the command, run it and store redirected output
    async fn execute_stage(&self, index: usize, stage: &Stage) -> Result<ProcessOutput> {
        if let Some(missing) = stage.missing_input() {
            return Err(PipelineError::MissingFile {
                path: missing.to_path_buf(),
            });
        }

        for dir in &stage.create_dirs {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PipelineError::io(dir, e))?;
        }

        let command = stage.command()?;
        info!("Running stage {} ({}): {}", index, stage.name, command);
        self.emit_event(ExecutionEvent::StageStarted {
            index,
            stage: stage.name.clone(),
            command: command.to_string(),
        });

        let output = self.runner.run(&command).await?;

        if let Some(path) = &stage.stdout_path {
            write_capture(path, &output.stdout).await?;
        }
        if let Some(path) = &stage.stderr_path {
            write_capture(path, &output.stderr).await?;
        }

        if let Some(missing) = stage.missing_output() {
            warn!("{} exited cleanly but did not write {}", command.program(), missing.display());
            return Err(PipelineError::MissingFile {
                path: missing.to_path_buf(),
            });
        }

        Ok(output)
    }
}

async fn write_capture(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::io(parent, e))?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
