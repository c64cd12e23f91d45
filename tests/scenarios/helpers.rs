//! Test utilities: a scripted command runner and pipeline assertions

use async_trait::async_trait;
use metassembly::core::{Command, ExecutionStatus, Pipeline, StageState};
use metassembly::execution::{ExecutionEngine, ExecutionEvent};
use metassembly::runner::{CommandRunner, ProcessOutput};
use metassembly::PipelineError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// What the mock does when a given program is invoked
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub creates: Vec<(PathBuf, String)>,
}

impl Script {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing(code: i32, stderr: &str) -> Self {
        Self {
            exit_code: Some(code),
            stderr: stderr.to_string(),
            ..Self::default()
        }
    }

    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.stdout = stdout.to_string();
        self
    }

    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = stderr.to_string();
        self
    }

    /// Write `content` to `path` when the program runs, as the real tool would
    pub fn creating(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.creates.push((path.into(), content.to_string()));
        self
    }
}

/// Runner that records every command and replays scripted results per program
#[derive(Clone, Default)]
pub struct MockRunner {
    scripts: HashMap<String, Script>,
    executed: Arc<Mutex<Vec<Command>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, program: &str, script: Script) -> Self {
        self.scripts.insert(program.to_string(), script);
        self
    }

    /// Handle onto the commands run so far; stays valid after the runner is moved
    pub fn executed(&self) -> Arc<Mutex<Vec<Command>>> {
        Arc::clone(&self.executed)
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, command: &Command) -> Result<ProcessOutput, PipelineError> {
        self.executed.lock().unwrap().push(command.clone());

        let script = self.scripts.get(command.program()).cloned().unwrap_or_default();
        for (path, content) in &script.creates {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }

        match script.exit_code {
            Some(code) if code != 0 => Err(PipelineError::Execution {
                program: command.program().to_string(),
                code,
                stderr: script.stderr.trim().to_string(),
            }),
            _ => Ok(ProcessOutput {
                code: 0,
                stdout: script.stdout.into_bytes(),
                stderr: script.stderr.into_bytes(),
            }),
        }
    }
}

/// Engine over a mock runner plus a log of emitted events
pub fn engine_with_events(
    runner: MockRunner,
) -> (ExecutionEngine<MockRunner>, Arc<Mutex<Vec<ExecutionEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut engine = ExecutionEngine::new(runner);
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));
    (engine, events)
}

/// Programs in the order they were invoked
pub fn programs(executed: &Arc<Mutex<Vec<Command>>>) -> Vec<String> {
    executed
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.program().to_string())
        .collect()
}

pub fn assert_pipeline_completed(pipeline: &Pipeline) {
    assert!(
        matches!(pipeline.state.status, ExecutionStatus::Completed),
        "Pipeline should be completed, but was {:?}",
        pipeline.state.status
    );
}

pub fn assert_pipeline_failed(pipeline: &Pipeline) {
    assert!(
        matches!(pipeline.state.status, ExecutionStatus::Failed),
        "Pipeline should be failed, but was {:?}",
        pipeline.state.status
    );
}

pub fn assert_stage_completed(pipeline: &Pipeline, name: &str) {
    let stage = pipeline
        .stage(name)
        .unwrap_or_else(|| panic!("Stage '{}' not found", name));
    assert!(
        matches!(stage.state, StageState::Completed { .. }),
        "Stage '{}' should be completed, but was in state: {:?}",
        name,
        stage.state
    );
}

pub fn assert_stage_failed(pipeline: &Pipeline, name: &str, expected_error: &str) {
    let stage = pipeline
        .stage(name)
        .unwrap_or_else(|| panic!("Stage '{}' not found", name));
    match &stage.state {
        StageState::Failed { error, .. } => assert!(
            error.contains(expected_error),
            "Stage '{}' error:\n{}\n\ndoes not contain:\n{}",
            name,
            error,
            expected_error
        ),
        other => panic!("Stage '{}' should have failed, but was in state: {:?}", name, other),
    }
}

pub fn assert_stage_skipped(pipeline: &Pipeline, name: &str) {
    let stage = pipeline
        .stage(name)
        .unwrap_or_else(|| panic!("Stage '{}' not found", name));
    assert!(
        matches!(stage.state, StageState::Skipped { .. }),
        "Stage '{}' should be skipped, but was in state: {:?}",
        name,
        stage.state
    );
}
