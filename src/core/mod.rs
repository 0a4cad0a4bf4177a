//! Core command tree
//!
//! Contains the node data model, child resolution (including lazy loading),
//! and the recursive parse/call dispatcher.

pub mod dispatch;
pub mod loader;
pub mod node;
pub mod options;
pub mod resolver;

pub use dispatch::{Exit, NO_ARGS, Outcome, Resolution};
pub use loader::{ModuleLoader, Registry};
pub use node::{CommandNode, HELP_COMMAND};
pub use options::{
    Flag, FlagTable, HandlerCalls, OptionError, OptionLayer, ValueKind, Values,
};
pub use resolver::lazy_path;
