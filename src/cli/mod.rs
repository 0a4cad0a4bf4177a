//! Command-line interface module
//!
//! Provides argument parsing and command execution for the demo binary.

pub mod args;
pub mod commands;

pub use args::{Args, parse_args};
pub use commands::{build_tree, execute_command};
