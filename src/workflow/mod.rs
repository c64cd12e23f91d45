//! Ready-made stage chains for the metagenomics jobs

pub mod assembly;
pub mod rrna;

pub use assembly::{
    Assembler, AssemblyConfig, AssemblyLayout, AssemblyOutcome, AssemblyWorkflow, Orientation,
    PairedLibrary,
};
pub use rrna::RrnaFilterConfig;
