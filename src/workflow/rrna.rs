//! rRNA filtering with SortMeRNA, building missing database indexes first

use crate::core::{config::ToolPaths, record::ConfigRecord, tool::Tool, Pipeline, Stage};
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files `indexdb_rna` writes next to a database; all must exist for the
/// index to count as built
pub const INDEX_SUFFIXES: [&str; 4] = [
    ".idx.pos_0.dat",
    ".idx.stats",
    ".idx.kmer_0.dat",
    ".idx.bursttrie_0.dat",
];

const RESERVED_OPTIONS: &[&str] = &["ref", "reads", "aligned", "other", "paired_in", "paired_out"];

/// rRNA filtering job loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RrnaFilterConfig {
    pub name: String,

    /// Reads to filter
    pub reads: PathBuf,

    /// Output base for reads that matched a database
    pub aligned: PathBuf,

    /// Output base for reads that did not match
    #[serde(default)]
    pub other: Option<PathBuf>,

    /// Database base paths without extension (`<base>.fasta` must exist)
    pub references: Vec<PathBuf>,

    /// Output formats, each emitted as a bare flag (`fastx`, `sam`, `blast`, ...)
    #[serde(default = "default_output_format")]
    pub output_format: Vec<String>,

    #[serde(default)]
    pub paired_in: bool,

    #[serde(default)]
    pub paired_out: bool,

    #[serde(default)]
    pub options: ConfigRecord,

    #[serde(default)]
    pub tools: ToolPaths,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_output_format() -> Vec<String> {
    vec!["fastx".to_string()]
}

/// `<base><suffix>`, keeping any dots already in the base name
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

fn database_stem(base: &Path) -> String {
    base.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The database's FASTA file
pub fn database_fasta(base: &Path) -> PathBuf {
    with_suffix(base, ".fasta")
}

/// Whether every index file for the database exists
pub fn index_present(base: &Path) -> bool {
    INDEX_SUFFIXES
        .iter()
        .all(|suffix| with_suffix(base, suffix).is_file())
}

/// `<base>.fasta,<base>.idx` as SortMeRNA expects it
pub fn reference_pair(base: &Path) -> String {
    format!(
        "{},{}",
        database_fasta(base).display(),
        with_suffix(base, ".idx").display()
    )
}

impl RrnaFilterConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: RrnaFilterConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            bail!("Filter name must not be empty");
        }
        if self.references.is_empty() {
            bail!("At least one reference database is required");
        }
        for format in &self.output_format {
            if format.trim().is_empty() || format.starts_with('-') {
                bail!("Invalid output format '{}': give the bare name, e.g. fastx", format);
            }
        }
        for key in self.options.keys() {
            if RESERVED_OPTIONS.contains(&key) || self.output_format.iter().any(|f| f == key) {
                bail!(
                    "Option '{}' is set from the top-level field and cannot appear in options",
                    key
                );
            }
        }
        if self.timeout_secs == Some(0) {
            bail!("timeout_secs must be greater than zero");
        }
        self.tools.validate()
    }

    /// Reads as SortMeRNA sees them: a `.gz` file is read after decompression
    pub fn filter_reads(&self) -> PathBuf {
        if is_gzipped(&self.reads) {
            self.reads.with_extension("")
        } else {
            self.reads.clone()
        }
    }

    /// `index-<stem>`, with the reference's 1-based position appended when
    /// another reference shares the stem
    fn index_stage_name(&self, position: usize, base: &Path) -> String {
        let stem = database_stem(base);
        let shared = self
            .references
            .iter()
            .filter(|other| database_stem(other) == stem)
            .count()
            > 1;
        if shared {
            format!("index-{}-{}", stem, position + 1)
        } else {
            format!("index-{}", stem)
        }
    }

    /// Expand the job into a decompress stage (for gzipped reads), index
    /// stages (only for missing indexes) and the filter stage
    pub fn to_pipeline(&self) -> Pipeline {
        let mut pipeline = Pipeline::new(format!("rrna:{}", self.name));
        let reads = self.filter_reads();

        if is_gzipped(&self.reads) {
            debug!("{} is compressed and will be decompressed first", self.reads.display());
            let stage = Stage::new("decompress", Tool::Gunzip)
                .with_builder(self.tools.builder_for(Tool::Gunzip))
                .with_option("file", &self.reads)
                .with_input(&self.reads)
                .with_output(&reads);
            pipeline = pipeline.with_stage(stage);
        }

        for (position, base) in self.references.iter().enumerate() {
            if index_present(base) {
                continue;
            }
            debug!("Index missing for database at {}", base.display());
            let stage = Stage::new(self.index_stage_name(position, base), Tool::IndexDbRna)
                .with_builder(self.tools.builder_for(Tool::IndexDbRna))
                .with_option("ref", reference_pair(base))
                .with_input(database_fasta(base));
            pipeline = pipeline.with_stage(stage);
        }

        let references: Vec<String> = self.references.iter().map(|b| reference_pair(b)).collect();
        let mut filter = Stage::new("filter", Tool::SortMeRna)
            .with_builder(self.tools.builder_for(Tool::SortMeRna))
            .with_options(&self.options)
            .with_option("ref", references)
            .with_option("reads", &reads)
            .with_option("aligned", &self.aligned)
            .with_option("paired_in", self.paired_in)
            .with_option("paired_out", self.paired_out)
            .with_input(&reads);
        if let Some(other) = &self.other {
            filter = filter.with_option("other", other);
        }
        for format in &self.output_format {
            filter = filter.with_option(format.clone(), true);
        }
        for base in &self.references {
            filter = filter.with_input(database_fasta(base));
        }

        pipeline.with_stage(filter)
    }
}
