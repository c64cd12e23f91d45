//! Core domain models
//!
//! Configuration records, the tool catalogue, command construction and the
//! pipeline/stage structures built on top of them.

pub mod command;
pub mod config;
pub mod pipeline;
pub mod record;
pub mod stage;
pub mod state;
pub mod tool;

pub use command::{build_command, Command, CommandBuilder};
pub use pipeline::*;
pub use record::{ConfigRecord, OptionValue};
pub use stage::*;
pub use state::*;
pub use tool::{FlagTable, Tool};
