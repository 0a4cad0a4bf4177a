//! Command-line argument parsing for the demo binary
//!
//! Only the binary's own switches are parsed here; everything after them is
//! handed untouched to the command tree.

use clap::Parser;

/// cmdtree - run a sample command tree
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "cmdtree")]
pub struct Args {
    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Fail when arguments are left unconsumed
    #[arg(long)]
    pub strict: bool,

    /// Command path followed by its flags and arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    Args::parse()
}
