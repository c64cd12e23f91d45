//! CLI output formatting

use crate::{
    core::{ExecutionStatus, Pipeline, StageState},
    execution::ExecutionEvent,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Spinner shown while a long-running stage is busy
pub fn create_stage_spinner(stage: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(stage.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a stage state for display
pub fn format_stage_state(state: &StageState) -> String {
    match state {
        StageState::Pending => style("PENDING").dim().to_string(),
        StageState::Running { .. } => style("RUNNING").yellow().to_string(),
        StageState::Completed { .. } => style("COMPLETED").green().to_string(),
        StageState::Failed { .. } => style("FAILED").red().to_string(),
        StageState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// One line per stage with its final state
pub fn format_pipeline_summary(pipeline: &Pipeline) -> String {
    pipeline
        .stages
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            format!(
                "  {}. {} [{}] {}",
                i + 1,
                style(&stage.name).bold(),
                style(stage.tool()).dim(),
                format_stage_state(&stage.state)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_stages,
        } => format!(
            "{} Starting pipeline {} ({} stages, {})",
            ROCKET,
            style(pipeline_name).bold(),
            total_stages,
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StageStarted { index, stage, command } => format!(
            "{} {}. {}\n   {}",
            SPINNER,
            index,
            style(stage).cyan(),
            style(command).dim()
        ),
        ExecutionEvent::StageCompleted { index, stage } => {
            format!("{} {}. {}", CHECK, index, style(stage).green())
        }
        ExecutionEvent::StageFailed { index, stage, error } => format!(
            "{} {}. {}: {}",
            CROSS,
            index,
            style(stage).red(),
            format_output(error, 10)
        ),
        ExecutionEvent::StageSkipped { index, stage } => {
            format!("{} {}. {}", SKIP, index, style(stage).dim())
        }
        ExecutionEvent::PipelineCompleted { execution_id, status } => {
            let status_str = match status {
                ExecutionStatus::Completed => format!("{} completed", style("successfully").green()),
                ExecutionStatus::Failed => style("failed").red().to_string(),
                other => format!("{:?}", other),
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(&execution_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Keep the last `max_lines` lines of tool output
///
/// Tool diagnostics usually end with the actual error, so the tail is kept.
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let tail = lines[lines.len() - max_lines..].join("\n");
        format!(
            "{}... ({} earlier lines)\n{}",
            style("[truncated]").dim(),
            lines.len() - max_lines,
            tail
        )
    }
}
