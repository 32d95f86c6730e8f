//! Process I/O helpers for running external tools.

mod runner;

pub use runner::{CommandOutput, CommandRunner, ToolError};
