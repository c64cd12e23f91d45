//! metassembly - metagenomics assembly pipeline driver
//!
//! Builds command lines for MetaSPAdes, MEGAHIT, Bowtie2, MetaQUAST and
//! SortMeRNA from configuration records, runs them one after another and
//! post-processes their small text reports.

pub mod cli;
pub mod core;
pub mod error;
pub mod execution;
pub mod report;
pub mod runner;
pub mod workflow;

// Re-export commonly used types
pub use crate::core::{build_command, Command, CommandBuilder, ConfigRecord, FlagTable, OptionValue, Tool};
pub use crate::core::{ExecutionStatus, Pipeline, Stage, StageState};
pub use error::PipelineError;
pub use execution::{ExecutionEngine, ExecutionEvent};
pub use runner::{CommandRunner, ProcessOutput, ProcessRunner, RunnerConfig};
