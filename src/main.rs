#![allow(clippy::cargo_common_metadata)]
use anyhow::Result;
use cmdtree::{Outcome, cli, config::Settings, setup_logging};
use serde_json::Value;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = cli::parse_args();

    // Setup logging based on debug flag
    setup_logging(args.debug)?;

    // Initialize settings
    let settings = Settings::from_args(&args)?;

    // Run the arguments through the command tree
    match cli::execute_command(&settings, &args.args)? {
        Outcome::Exit(exit) => exit.terminate(),
        Outcome::Value(Value::Null) => {}
        Outcome::Value(Value::String(text)) => println!("{text}"),
        Outcome::Value(value) => println!("{value}"),
    }

    Ok(())
}
