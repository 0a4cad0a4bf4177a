//! # cmdtree
//!
//! A recursive sub-command dispatcher for command-line tools. A root
//! [`CommandNode`] owns named sub-commands, each a full parser level with its
//! own flags and further sub-commands, to any depth.
//!
//! ## Features
//!
//! - Level-by-level flag parsing with positional residue handed downward
//! - Exact sub-command lookup with optional lazy loading through a [`ModuleLoader`]
//! - State shared by reference across a whole subtree
//! - Pre-parse, on-resolve and post-parse hooks
//! - Automatic `help` sub-commands and composed help text
//!
//! ## Example
//!
//! ```
//! use cmdtree::{CommandNode, Flag};
//!
//! let root = CommandNode::new("prog");
//! let greet = root.add_command("greet", "Say hello")?;
//! greet.on(Flag::parse(&["-n", "--name=NAME"])?.describe("Who to greet"));
//! greet.set_body(|node, args| {
//!     let name = node.shared_state().get("name");
//!     Ok(format!("hello {:?} {:?}", name, args))
//! });
//!
//! let outcome = root.call(["greet", "world"])?;
//! assert!(outcome.value().is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use crate::core::{
    CommandNode, Exit, Flag, FlagTable, HandlerCalls, ModuleLoader, NO_ARGS, OptionLayer, Outcome,
    Registry, Resolution, ValueKind, Values,
};
pub use error::{CommandError, Result};
pub use utils::SharedState;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with appropriate verbosity
pub fn setup_logging(debug: bool) -> anyhow::Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
