//! Catalogue of the external tools the pipeline knows how to invoke

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Record key that selects the assembler; never emitted as a flag
pub const SELECTOR_KEY: &str = "assembler";

/// Supported external tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tool {
    #[serde(rename = "metaspades")]
    MetaSpades,
    #[serde(rename = "megahit")]
    Megahit,
    #[serde(rename = "bowtie2-build")]
    Bowtie2Build,
    #[serde(rename = "bowtie2")]
    Bowtie2,
    #[serde(rename = "metaquast")]
    MetaQuast,
    #[serde(rename = "sortmerna")]
    SortMeRna,
    #[serde(rename = "indexdb-rna")]
    IndexDbRna,
    #[serde(rename = "gunzip")]
    Gunzip,
}

/// A record key that is consumed through a dedicated flag or position
/// before the generic per-key loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralKey {
    pub key: &'static str,
    /// `None` means the value is emitted as a bare positional token
    pub flag: Option<&'static str>,
    /// Joins list values
    pub separator: &'static str,
}

impl StructuralKey {
    const fn named(key: &'static str, flag: &'static str) -> Self {
        Self {
            key,
            flag: Some(flag),
            separator: ",",
        }
    }

    const fn positional(key: &'static str) -> Self {
        Self {
            key,
            flag: None,
            separator: ",",
        }
    }

    const fn joined_by(self, separator: &'static str) -> Self {
        Self { separator, ..self }
    }
}

const METASPADES_STRUCTURE: &[StructuralKey] = &[
    StructuralKey::named("out_dir", "-o"),
    StructuralKey::named("interleaved", "--12"),
    StructuralKey::named("forward", "-1"),
    StructuralKey::named("reverse", "-2"),
    StructuralKey::named("unpaired", "-s"),
];

const MEGAHIT_STRUCTURE: &[StructuralKey] = &[
    StructuralKey::named("forward", "-1"),
    StructuralKey::named("reverse", "-2"),
    StructuralKey::named("interleaved", "--12"),
    StructuralKey::named("unpaired", "-r"),
    StructuralKey::named("out_dir", "-o"),
];

const BOWTIE2_BUILD_STRUCTURE: &[StructuralKey] = &[
    StructuralKey::positional("contigs"),
    StructuralKey::positional("index"),
];

const BOWTIE2_STRUCTURE: &[StructuralKey] = &[
    StructuralKey::named("index", "-x"),
    StructuralKey::named("forward", "-1"),
    StructuralKey::named("reverse", "-2"),
    StructuralKey::named("unpaired", "-U"),
    StructuralKey::named("sam", "-S"),
];

const METAQUAST_STRUCTURE: &[StructuralKey] = &[
    StructuralKey::named("out_dir", "--output-dir"),
    StructuralKey::positional("contigs"),
];

const SORTMERNA_STRUCTURE: &[StructuralKey] = &[
    StructuralKey::named("ref", "--ref").joined_by(":"),
    StructuralKey::named("reads", "--reads"),
    StructuralKey::named("aligned", "--aligned"),
    StructuralKey::named("other", "--other"),
];

const INDEXDB_RNA_STRUCTURE: &[StructuralKey] = &[StructuralKey::named("ref", "--ref").joined_by(":")];

const GUNZIP_STRUCTURE: &[StructuralKey] = &[StructuralKey::positional("file")];

const METASPADES_FLAGS: &[(&str, &str)] = &[
    ("threads", "--threads"),
    ("memory", "--memory"),
    ("kmers", "-k"),
];

const MEGAHIT_FLAGS: &[(&str, &str)] = &[
    ("threads", "--num-cpu-threads"),
    ("memory", "--memory"),
];

const BOWTIE2_BUILD_FLAGS: &[(&str, &str)] = &[("threads", "--threads")];

const BOWTIE2_FLAGS: &[(&str, &str)] = &[
    ("threads", "-p"),
    ("all_alignments", "-a"),
    ("fastq", "-q"),
];

const METAQUAST_FLAGS: &[(&str, &str)] = &[("threads", "--threads")];

// sortmerna keeps underscores in its long options
const SORTMERNA_FLAGS: &[(&str, &str)] = &[
    ("threads", "-a"),
    ("paired_in", "--paired_in"),
    ("paired_out", "--paired_out"),
    ("num_alignments", "--num_alignments"),
    ("otu_map", "--otu_map"),
];

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::MetaSpades,
        Tool::Megahit,
        Tool::Bowtie2Build,
        Tool::Bowtie2,
        Tool::MetaQuast,
        Tool::SortMeRna,
        Tool::IndexDbRna,
        Tool::Gunzip,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::MetaSpades => "metaspades",
            Tool::Megahit => "megahit",
            Tool::Bowtie2Build => "bowtie2-build",
            Tool::Bowtie2 => "bowtie2",
            Tool::MetaQuast => "metaquast",
            Tool::SortMeRna => "sortmerna",
            Tool::IndexDbRna => "indexdb-rna",
            Tool::Gunzip => "gunzip",
        }
    }

    /// Executable used when the configuration does not override it
    pub fn default_program(&self) -> &'static str {
        match self {
            Tool::MetaSpades => "metaspades.py",
            Tool::Megahit => "megahit",
            Tool::Bowtie2Build => "bowtie2-build",
            Tool::Bowtie2 => "bowtie2",
            Tool::MetaQuast => "metaquast.py",
            Tool::SortMeRna => "sortmerna",
            Tool::IndexDbRna => "indexdb_rna",
            Tool::Gunzip => "gunzip",
        }
    }

    /// Arguments always emitted right after the program
    pub fn leading_args(&self) -> &'static [&'static str] {
        match self {
            // overwrite an existing output directory
            Tool::Megahit => &["-f"],
            _ => &[],
        }
    }

    pub fn structural_keys(&self) -> &'static [StructuralKey] {
        match self {
            Tool::MetaSpades => METASPADES_STRUCTURE,
            Tool::Megahit => MEGAHIT_STRUCTURE,
            Tool::Bowtie2Build => BOWTIE2_BUILD_STRUCTURE,
            Tool::Bowtie2 => BOWTIE2_STRUCTURE,
            Tool::MetaQuast => METAQUAST_STRUCTURE,
            Tool::SortMeRna => SORTMERNA_STRUCTURE,
            Tool::IndexDbRna => INDEXDB_RNA_STRUCTURE,
            Tool::Gunzip => GUNZIP_STRUCTURE,
        }
    }

    pub fn is_structural(&self, key: &str) -> bool {
        self.structural_keys().iter().any(|s| s.key == key)
    }

    /// Static flag table for this tool
    pub fn flag_table(&self) -> FlagTable {
        let entries = match self {
            Tool::MetaSpades => METASPADES_FLAGS,
            Tool::Megahit => MEGAHIT_FLAGS,
            Tool::Bowtie2Build => BOWTIE2_BUILD_FLAGS,
            Tool::Bowtie2 => BOWTIE2_FLAGS,
            Tool::MetaQuast => METAQUAST_FLAGS,
            Tool::SortMeRna => SORTMERNA_FLAGS,
            Tool::IndexDbRna | Tool::Gunzip => &[],
        };
        FlagTable::from_static(entries)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mapping from semantic option name to the literal CLI flag
///
/// Keys missing from the table fall back to `--` followed by the key with
/// underscores turned into hyphens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagTable(BTreeMap<String, String>);

impl FlagTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_static(entries: &[(&str, &str)]) -> Self {
        entries.iter().copied().collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, flag: impl Into<String>) {
        self.0.insert(key.into(), flag.into());
    }

    /// Add every entry of `other`, overriding existing keys
    pub fn extend(&mut self, other: &FlagTable) {
        for (key, flag) in &other.0 {
            self.0.insert(key.clone(), flag.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Literal flag for an option key
    pub fn flag_for(&self, key: &str) -> String {
        match self.get(key) {
            Some(flag) => flag.to_string(),
            None => format!("--{}", key.replace('_', "-")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlagTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FlagTable(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
