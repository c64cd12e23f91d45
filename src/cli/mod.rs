//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{AssembleCommand, FilterRrnaCommand, InspectCommand, RunCommand};
use std::ffi::OsString;

/// Metagenomics assembly pipeline driver
#[derive(Debug, Parser, Clone)]
#[command(name = "metassembly")]
#[command(version)]
#[command(
    about = "Runs MetaSPAdes/MEGAHIT assemblies, Bowtie2 and MetaQUAST quality control, and SortMeRNA filtering",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline of stages described in YAML
    Run(RunCommand),

    /// Assemble a sample and run quality control on the contigs
    Assemble(AssembleCommand),

    /// Filter rRNA reads with SortMeRNA
    FilterRrna(FilterRrnaCommand),

    /// Validate a configuration file
    Validate(InspectCommand),

    /// Print the command lines a configuration would run, without running them
    Commands(InspectCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
