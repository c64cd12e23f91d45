//! Pipeline domain model

use crate::core::{
    config::PipelineConfig,
    stage::Stage,
    state::{PipelineState, StageState},
};

/// A strictly linear chain of stages
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Stages, run in order
    pub stages: Vec<Stage>,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            state: PipelineState::new(),
        }
    }

    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        let stages = config
            .stages
            .iter()
            .map(|stage_config| Stage::from_config(stage_config, &config.tools))
            .collect();

        Pipeline {
            name: config.name.clone(),
            stages,
            state: PipelineState::new(),
        }
    }

    /// Append a stage to the end of the chain
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Names of the stages that completed
    pub fn completed_stages(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| matches!(s.state, StageState::Completed { .. }))
            .map(|s| s.name.as_str())
            .collect()
    }
}
