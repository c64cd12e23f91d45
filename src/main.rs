use anyhow::{Context, Result};
use indicatif::ProgressBar;
use metassembly::cli::commands::{
    AssembleCommand, ConfigKind, FilterRrnaCommand, InspectCommand, RunCommand,
};
use metassembly::cli::output::*;
use metassembly::cli::{Cli, Command};
use metassembly::core::config::PipelineConfig;
use metassembly::core::Pipeline;
use metassembly::execution::{ExecutionEngine, ExecutionEvent};
use metassembly::runner::{ProcessRunner, RunnerConfig};
use metassembly::workflow::{AssemblyConfig, AssemblyWorkflow, RrnaFilterConfig};
use metassembly::PipelineError;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Assemble(cmd) => run_assembly(cmd).await?,
        Command::FilterRrna(cmd) => run_rrna_filter(cmd).await?,
        Command::Validate(cmd) => validate_config(cmd)?,
        Command::Commands(cmd) => print_commands(cmd)?,
    }

    Ok(())
}

/// Engine backed by real processes, printing events with a spinner per stage
fn create_engine(timeout_secs: Option<u64>) -> ExecutionEngine<ProcessRunner> {
    let mut runner_config = RunnerConfig::new();
    if let Some(secs) = timeout_secs {
        runner_config = runner_config.with_timeout(secs);
    }

    let mut engine = ExecutionEngine::new(ProcessRunner::new(runner_config));
    let spinner: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
    engine.add_event_handler(move |event| {
        let mut current = match spinner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(bar) = current.take() {
            bar.finish_and_clear();
        }
        println!("{}", format_execution_event(&event));
        if let ExecutionEvent::StageStarted { stage, .. } = &event {
            *current = Some(create_stage_spinner(stage));
        }
    });
    engine
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    println!("{} Loaded pipeline: {}", INFO, style(&config.name).bold());

    let mut pipeline = config.to_pipeline();
    let engine = create_engine(cmd.timeout_secs.or(config.timeout_secs));

    println!();
    let result = engine.execute(&mut pipeline).await;
    println!("\n{}", format_pipeline_summary(&pipeline));

    match result {
        Ok(()) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&pipeline.name).bold(),
                style("successfully").green()
            );
            Ok(())
        }
        Err(err) => {
            print_completed(&pipeline);
            exit_with_failure(&pipeline.name, &err)
        }
    }
}

async fn run_assembly(cmd: &AssembleCommand) -> Result<()> {
    let mut config = AssemblyConfig::from_file(&cmd.file).context("Failed to load assembly job")?;
    for (key, value) in &cmd.option {
        config.options.set(key.clone(), value.clone());
        println!("{} Option override: {} = {}", INFO, style(key).cyan(), style(value).dim());
    }
    config.validate().context("Invalid option override")?;

    println!(
        "{} Assembling {} with {:?}",
        INFO,
        style(&config.name).bold(),
        config.assembler
    );

    let engine = create_engine(cmd.timeout_secs.or(config.timeout_secs));
    let workflow = AssemblyWorkflow::new(config);
    let name = workflow.config().name.clone();

    println!();
    match workflow.run(&engine).await {
        Ok(outcome) => {
            println!("\n{}", format_pipeline_summary(&outcome.pipeline));
            println!(
                "\n{} {} completed {}: contigs at {}",
                CHECK,
                style(&name).bold(),
                style("successfully").green(),
                style(outcome.layout.contigs.display()).dim()
            );
            println!(
                "  Reads aligned: {}%  (report: {})",
                style(&outcome.report.reads_aligned).cyan(),
                style(outcome.report.path.display()).dim()
            );
            Ok(())
        }
        Err(err) => exit_with_failure(&name, &err),
    }
}

async fn run_rrna_filter(cmd: &FilterRrnaCommand) -> Result<()> {
    let mut config = RrnaFilterConfig::from_file(&cmd.file).context("Failed to load rRNA filter job")?;
    for (key, value) in &cmd.option {
        config.options.set(key.clone(), value.clone());
        println!("{} Option override: {} = {}", INFO, style(key).cyan(), style(value).dim());
    }
    config.validate().context("Invalid option override")?;

    let mut pipeline = config.to_pipeline();
    let engine = create_engine(cmd.timeout_secs.or(config.timeout_secs));

    println!();
    let result = engine.execute(&mut pipeline).await;
    println!("\n{}", format_pipeline_summary(&pipeline));

    match result {
        Ok(()) => {
            println!(
                "\n{} {} completed {}: rRNA reads in {}",
                CHECK,
                style(&config.name).bold(),
                style("successfully").green(),
                style(config.aligned.display()).dim()
            );
            Ok(())
        }
        Err(err) => {
            print_completed(&pipeline);
            exit_with_failure(&config.name, &err)
        }
    }
}

fn print_completed(pipeline: &Pipeline) {
    let completed = pipeline.completed_stages();
    if !completed.is_empty() {
        println!("{} Completed before the failure: {}", INFO, completed.join(", "));
    }
}

/// Name the failing stage and print the tool's own diagnostics, then exit 1
fn exit_with_failure(name: &str, err: &PipelineError) -> ! {
    println!("\n{} {} {}", CROSS, style(name).bold(), style("failed").red());
    if let Some((index, stage)) = err.failed_stage() {
        println!("  Stage {} ({})", index, style(stage).red());
    }
    match err.root() {
        PipelineError::Execution { program, code, stderr } => {
            println!("  {} exited with code {}", style(program).bold(), code);
            if !stderr.is_empty() {
                println!("{}", format_output(stderr, 20));
            }
        }
        other => println!("  {}", other),
    }
    error!("{}", err);
    std::process::exit(1);
}

/// A loaded configuration of any kind
enum LoadedConfig {
    Pipeline(PipelineConfig),
    Assembly(AssemblyConfig),
    Rrna(RrnaFilterConfig),
}

impl LoadedConfig {
    fn load(cmd: &InspectCommand) -> Result<Self> {
        Ok(match cmd.kind {
            ConfigKind::Pipeline => LoadedConfig::Pipeline(PipelineConfig::from_file(&cmd.file)?),
            ConfigKind::Assembly => LoadedConfig::Assembly(AssemblyConfig::from_file(&cmd.file)?),
            ConfigKind::Rrna => LoadedConfig::Rrna(RrnaFilterConfig::from_file(&cmd.file)?),
        })
    }

    fn name(&self) -> &str {
        match self {
            LoadedConfig::Pipeline(c) => &c.name,
            LoadedConfig::Assembly(c) => &c.name,
            LoadedConfig::Rrna(c) => &c.name,
        }
    }

    fn to_pipeline(&self) -> Pipeline {
        match self {
            LoadedConfig::Pipeline(c) => c.to_pipeline(),
            LoadedConfig::Assembly(c) => c.to_pipeline(),
            LoadedConfig::Rrna(c) => c.to_pipeline(),
        }
    }

    fn to_json(&self) -> Result<String> {
        Ok(match self {
            LoadedConfig::Pipeline(c) => serde_json::to_string_pretty(c)?,
            LoadedConfig::Assembly(c) => serde_json::to_string_pretty(c)?,
            LoadedConfig::Rrna(c) => serde_json::to_string_pretty(c)?,
        })
    }
}

fn validate_config(cmd: &InspectCommand) -> Result<()> {
    println!("{} Validating {:?} configuration...", INFO, cmd.kind);

    let config = match LoadedConfig::load(cmd) {
        Ok(config) => config,
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    };

    // Building every command surfaces invalid option values up front
    let pipeline = config.to_pipeline();
    let mut invalid = Vec::new();
    for stage in &pipeline.stages {
        if let Err(e) = stage.command() {
            invalid.push(format!("{}: {}", stage.name, e));
        }
    }
    if !invalid.is_empty() {
        println!("{} Validation failed:", CROSS);
        for problem in &invalid {
            println!("  {}", style(problem).red());
        }
        std::process::exit(1);
    }

    println!("{} Configuration is valid!", CHECK);
    println!("  Name: {}", style(config.name()).bold());
    println!(
        "  Stages ({}): {}",
        style(pipeline.stages.len()).cyan(),
        pipeline.stage_names().join(" -> ")
    );

    if cmd.json {
        println!("\n{}", config.to_json()?);
    }
    Ok(())
}

#[derive(Serialize)]
struct PlannedStage<'a> {
    index: usize,
    stage: &'a str,
    tool: metassembly::Tool,
    command: Vec<&'a str>,
}

fn print_commands(cmd: &InspectCommand) -> Result<()> {
    let config = LoadedConfig::load(cmd).context("Failed to load configuration")?;
    let pipeline = config.to_pipeline();

    let commands = pipeline
        .stages
        .iter()
        .map(|stage| {
            stage
                .command()
                .with_context(|| format!("Cannot build command for stage '{}'", stage.name))
        })
        .collect::<Result<Vec<_>>>()?;

    if cmd.json {
        let planned: Vec<PlannedStage> = pipeline
            .stages
            .iter()
            .zip(&commands)
            .enumerate()
            .map(|(i, (stage, command))| PlannedStage {
                index: i + 1,
                stage: &stage.name,
                tool: stage.tool(),
                command: command.tokens().collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    for (i, (stage, command)) in pipeline.stages.iter().zip(&commands).enumerate() {
        println!("{}. {}", i + 1, style(&stage.name).bold());
        println!("   {}", command);
        if let Some(path) = &stage.stdout_path {
            println!("   {} stdout > {}", style("#").dim(), path.display());
        }
        if let Some(path) = &stage.stderr_path {
            println!("   {} stderr > {}", style("#").dim(), path.display());
        }
    }
    if let LoadedConfig::Assembly(assembly) = &config {
        println!(
            "{} then append the alignment rate to {}",
            INFO,
            assembly.layout().qc_dir.join(metassembly::report::REPORT_FILE).display()
        );
    }
    Ok(())
}
