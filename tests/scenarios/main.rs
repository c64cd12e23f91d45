//! Scenario-based tests for metassembly, driven by a scripted runner

mod helpers;

mod assembly_flow;
mod rrna_flow;
