//! Configuration for building a command tree
//!
//! Centralizes the root-level policies and provides validation.

use crate::{cli::Args, error::CommandError};
use serde::{Deserialize, Serialize};

/// Root-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Program name, the first segment of every command path
    pub program: String,
    /// Fail calls that leave positional arguments unconsumed
    pub raise_unknown: bool,
    /// Where unknown commands are looked up lazily; `None` disables lazy loading
    pub lazy_load_root: Option<String>,
    /// Enable debug logging
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            program: env!("CARGO_PKG_NAME").to_string(),
            raise_unknown: false,
            lazy_load_root: None,
            debug: false,
        }
    }
}

impl Settings {
    /// Create settings from command line arguments
    pub fn from_args(args: &Args) -> Result<Self, CommandError> {
        let settings = Self {
            raise_unknown: args.strict,
            debug: args.debug,
            lazy_load_root: Some(crate::cli::commands::BUILTIN_ROOT.to_string()),
            ..Self::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.program.trim().is_empty() {
            return Err(CommandError::config("program name must not be empty"));
        }

        if let Some(root) = &self.lazy_load_root {
            if root.trim().is_empty() {
                return Err(CommandError::config(
                    "lazy load root must not be empty; use none to disable lazy loading",
                ));
            }
        }

        Ok(())
    }
}
