//! Assembly workflow: assemble, index, align, MetaQUAST, then the report row

use crate::core::{
    config::ToolPaths,
    record::{ConfigRecord, OptionValue},
    tool::{Tool, SELECTOR_KEY},
    Pipeline, Stage,
};
use crate::error::Result;
use crate::execution::ExecutionEngine;
use crate::report::{self, QualityReport};
use crate::runner::CommandRunner;
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Keys filled in from the top-level job fields; not allowed in `options`
const RESERVED_OPTIONS: &[&str] = &[
    SELECTOR_KEY,
    "out_dir",
    "forward",
    "reverse",
    "interleaved",
    "unpaired",
    "threads",
];

/// MetaSPAdes accepts `--pe1` through `--pe9` and `--s1` through `--s9`
const MAX_LIBRARIES: usize = 9;

/// Which assembler to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assembler {
    Metaspades,
    Megahit,
}

impl Assembler {
    pub fn tool(&self) -> Tool {
        match self {
            Assembler::Metaspades => Tool::MetaSpades,
            Assembler::Megahit => Tool::Megahit,
        }
    }

    /// Name of the contigs file the assembler writes into its output directory
    pub fn contigs_file(&self) -> &'static str {
        match self {
            Assembler::Metaspades => "contigs.fasta",
            Assembler::Megahit => "final.contigs.fa",
        }
    }
}

/// Read orientation of a paired-end library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Fr,
    Rf,
    Ff,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Fr => "fr",
            Orientation::Rf => "rf",
            Orientation::Ff => "ff",
        }
    }
}

/// An extra paired-end library, numbered by its position in `pe_libraries`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedLibrary {
    #[serde(default)]
    pub forward: Option<PathBuf>,

    #[serde(default)]
    pub reverse: Option<PathBuf>,

    #[serde(default)]
    pub interleaved: Option<PathBuf>,

    #[serde(default)]
    pub unpaired: Option<PathBuf>,

    #[serde(default)]
    pub orientation: Option<Orientation>,
}

impl PairedLibrary {
    /// Files paired with the suffix MetaSPAdes expects after `--pe<N>-`
    fn files(&self) -> Vec<(&'static str, &Path)> {
        [
            ("1", &self.forward),
            ("2", &self.reverse),
            ("12", &self.interleaved),
            ("s", &self.unpaired),
        ]
        .into_iter()
        .filter_map(|(suffix, path)| path.as_deref().map(|p| (suffix, p)))
        .collect()
    }

    /// Record entries for library `number`; `pe1_12` is emitted as `--pe1-12`
    fn entries(&self, number: usize) -> Vec<(String, OptionValue)> {
        let mut entries: Vec<(String, OptionValue)> = self
            .files()
            .into_iter()
            .map(|(suffix, path)| (format!("pe{}_{}", number, suffix), OptionValue::from(path)))
            .collect();
        if let Some(orientation) = self.orientation {
            entries.push((
                format!("pe{}_{}", number, orientation.as_str()),
                OptionValue::Flag(true),
            ));
        }
        entries
    }
}

/// Assembly job loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Sample name; output goes to `<out_dir>/Assembly/<name>`
    pub name: String,

    pub assembler: Assembler,

    pub out_dir: PathBuf,

    pub forward: PathBuf,

    pub reverse: PathBuf,

    #[serde(default)]
    pub interleaved: Option<PathBuf>,

    #[serde(default)]
    pub unpaired: Option<PathBuf>,

    /// Additional paired-end libraries (MetaSPAdes only)
    #[serde(default)]
    pub pe_libraries: Vec<PairedLibrary>,

    /// Additional single-end libraries (MetaSPAdes only)
    #[serde(default)]
    pub se_libraries: Vec<PathBuf>,

    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Extra assembler options
    #[serde(default)]
    pub options: ConfigRecord,

    #[serde(default)]
    pub tools: ToolPaths,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_threads() -> usize {
    6
}

/// Paths derived from an assembly job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyLayout {
    pub assembly_dir: PathBuf,
    pub contigs: PathBuf,
    pub qc_dir: PathBuf,
    pub index_prefix: PathBuf,
    pub alignment: PathBuf,
    pub alignment_log: PathBuf,
}

impl AssemblyConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: AssemblyConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            bail!("Assembly name must not be empty");
        }
        if self.name.contains(std::path::MAIN_SEPARATOR) {
            bail!("Assembly name '{}' must not contain a path separator", self.name);
        }
        if self.threads == 0 {
            bail!("threads must be at least 1");
        }
        for key in self.options.keys() {
            if RESERVED_OPTIONS.contains(&key) {
                bail!(
                    "Option '{}' is set from the top-level field and cannot appear in options",
                    key
                );
            }
        }
        self.validate_libraries()?;
        if self.timeout_secs == Some(0) {
            bail!("timeout_secs must be greater than zero");
        }
        self.tools.validate()
    }

    fn validate_libraries(&self) -> anyhow::Result<()> {
        if self.pe_libraries.is_empty() && self.se_libraries.is_empty() {
            return Ok(());
        }
        if self.assembler != Assembler::Metaspades {
            bail!("pe_libraries and se_libraries are only supported by metaspades");
        }
        if self.pe_libraries.len() > MAX_LIBRARIES || self.se_libraries.len() > MAX_LIBRARIES {
            bail!("At most {} libraries of each kind are supported", MAX_LIBRARIES);
        }
        for (i, library) in self.pe_libraries.iter().enumerate() {
            if library.files().is_empty() {
                bail!("Paired-end library {} has no read files", i + 1);
            }
            if library.forward.is_some() != library.reverse.is_some() {
                bail!("Paired-end library {} needs both forward and reverse reads", i + 1);
            }
        }
        for (key, _) in self.library_entries() {
            if self.options.contains(&key) {
                bail!("Option '{}' is set from the job's libraries and cannot appear in options", key);
            }
        }
        Ok(())
    }

    /// Record entries for every extra library, e.g. `pe1_1`, `pe1_fr`, `s1`
    pub fn library_entries(&self) -> Vec<(String, OptionValue)> {
        let mut entries: Vec<(String, OptionValue)> = self
            .pe_libraries
            .iter()
            .enumerate()
            .flat_map(|(i, library)| library.entries(i + 1))
            .collect();
        entries.extend(
            self.se_libraries
                .iter()
                .enumerate()
                .map(|(i, path)| (format!("s{}", i + 1), OptionValue::from(path))),
        );
        entries
    }

    pub fn layout(&self) -> AssemblyLayout {
        let assembly_dir = self.out_dir.join("Assembly").join(&self.name);
        let qc_dir = assembly_dir.join("quality_control");
        AssemblyLayout {
            contigs: assembly_dir.join(self.assembler.contigs_file()),
            index_prefix: qc_dir.join("index"),
            alignment: qc_dir.join("library.sam"),
            alignment_log: qc_dir.join("bowtie.log"),
            qc_dir,
            assembly_dir,
        }
    }

    fn reads(&self) -> Vec<&Path> {
        let mut reads = vec![self.forward.as_path(), self.reverse.as_path()];
        reads.extend(self.interleaved.as_deref());
        reads.extend(self.unpaired.as_deref());
        for library in &self.pe_libraries {
            reads.extend(library.files().into_iter().map(|(_, path)| path));
        }
        reads.extend(self.se_libraries.iter().map(PathBuf::as_path));
        reads
    }

    /// Expand the job into its stage chain
    pub fn to_pipeline(&self) -> Pipeline {
        let layout = self.layout();
        let threads = self.threads.to_string();

        let mut assemble = Stage::new("assemble", self.assembler.tool())
            .with_builder(self.tools.builder_for(self.assembler.tool()))
            .with_options(&self.options)
            .with_option("out_dir", &layout.assembly_dir)
            .with_option("forward", &self.forward)
            .with_option("reverse", &self.reverse)
            .with_option("threads", threads.clone())
            .with_output(&layout.contigs);
        if let Some(interleaved) = &self.interleaved {
            assemble = assemble.with_option("interleaved", interleaved);
        }
        if let Some(unpaired) = &self.unpaired {
            assemble = assemble.with_option("unpaired", unpaired);
        }
        for (key, value) in self.library_entries() {
            assemble = assemble.with_option(key, value);
        }
        for read in self.reads() {
            assemble = assemble.with_input(read);
        }

        let index = Stage::new("index", Tool::Bowtie2Build)
            .with_builder(self.tools.builder_for(Tool::Bowtie2Build))
            .with_option("contigs", &layout.contigs)
            .with_option("index", &layout.index_prefix)
            .with_option("threads", threads.clone())
            .with_input(&layout.contigs)
            .with_dir(&layout.qc_dir);

        let align = Stage::new("align", Tool::Bowtie2)
            .with_builder(self.tools.builder_for(Tool::Bowtie2))
            .with_option("index", &layout.index_prefix)
            .with_option("forward", &self.forward)
            .with_option("reverse", &self.reverse)
            .with_option("sam", &layout.alignment)
            .with_option("all_alignments", true)
            .with_option("fastq", true)
            .with_option("threads", threads.clone())
            .with_input(&self.forward)
            .with_input(&self.reverse)
            .with_output(&layout.alignment)
            .with_stderr(&layout.alignment_log);

        let metaquast = Stage::new("metaquast", Tool::MetaQuast)
            .with_builder(self.tools.builder_for(Tool::MetaQuast))
            .with_option("contigs", &layout.contigs)
            .with_option("out_dir", &layout.qc_dir)
            .with_option("threads", threads)
            .with_input(&layout.contigs);

        Pipeline::new(format!("assembly:{}", self.name))
            .with_stage(assemble)
            .with_stage(index)
            .with_stage(align)
            .with_stage(metaquast)
    }
}

/// What a finished assembly run produced
#[derive(Debug, Clone)]
pub struct AssemblyOutcome {
    pub pipeline: Pipeline,
    pub layout: AssemblyLayout,
    pub report: QualityReport,
}

/// Runs an assembly job end to end
pub struct AssemblyWorkflow {
    config: AssemblyConfig,
}

impl AssemblyWorkflow {
    pub fn new(config: AssemblyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Run every stage, then append the alignment rate to the quality report
    ///
    /// A report failure is reported as an extra stage named `report`.
    pub async fn run<R: CommandRunner>(&self, engine: &ExecutionEngine<R>) -> Result<AssemblyOutcome> {
        let mut pipeline = self.config.to_pipeline();
        let layout = self.config.layout();

        engine.execute(&mut pipeline).await?;

        let report = report::finalize_quality_report(&layout.qc_dir, &layout.alignment_log)
            .map_err(|e| e.in_stage(pipeline.stages.len() + 1, "report"))?;
        info!(
            "Assembly {} finished, report at {}",
            self.config.name,
            report.path.display()
        );

        Ok(AssemblyOutcome {
            pipeline,
            layout,
            report,
        })
    }
}
