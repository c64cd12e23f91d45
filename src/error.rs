//! Error types for building and running tool invocations

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building commands, running stages or reading their reports
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A configuration record entry cannot be turned into command-line tokens
    #[error("invalid argument '{key}': {reason}")]
    InvalidArgument { key: String, reason: String },

    /// The child process exited with a non-zero status
    #[error("{program} exited with code {code}: {stderr}")]
    Execution {
        program: String,
        code: i32,
        stderr: String,
    },

    /// The child process could not be started at all
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {secs} seconds")]
    Timeout { program: String, secs: u64 },

    /// A declared stage input does not exist
    #[error("missing file: {}", path.display())]
    MissingFile { path: PathBuf },

    /// A log or report file does not have the expected shape
    #[error("cannot read report from {}: {reason}", path.display())]
    Report { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Wraps the error of the stage that stopped the pipeline
    #[error("stage {index} ({name}) failed: {source}")]
    Stage {
        index: usize,
        name: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidArgument {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the 1-based index and name of the failing stage
    pub fn in_stage(self, index: usize, name: impl Into<String>) -> Self {
        PipelineError::Stage {
            index,
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// Index and name of the failing stage, if this error came out of the sequencer
    pub fn failed_stage(&self) -> Option<(usize, &str)> {
        match self {
            PipelineError::Stage { index, name, .. } => Some((*index, name.as_str())),
            _ => None,
        }
    }

    /// The error underneath any stage wrapper
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
