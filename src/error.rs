//! Error types for the command tree
//!
//! Every failure aborts the current `call`/`parse` and is surfaced to the
//! embedder unchanged; nothing is retried internally.

use crate::core::options::OptionError;
use thiserror::Error;

/// Main error type for command resolution and dispatch
#[derive(Error, Debug)]
pub enum CommandError {
    /// A node was resolved but its author never gave it a body
    #[error("No command defined for `{path}`")]
    NoCommand { path: String },

    /// Positional residue left over while the calling node requires strict consumption
    #[error("Unconsumed arguments: {}", args.join(" "))]
    UnknownArguments { args: Vec<String> },

    /// The lazy loader could not find or run the expected resource
    #[error("Failed to load `{path}`: {message}")]
    ModuleLoad {
        path: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Flag syntax errors raised by the option layer
    #[error("Option error: {0}")]
    OptionSyntax(#[from] OptionError),

    /// Registering a name that already names a materialized child
    #[error("Command `{name}` is already registered under `{path}`")]
    DuplicateCommand { name: String, path: String },

    /// A body ran and failed
    #[error("Command `{path}` failed")]
    Body {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Invalid settings
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CommandError {
    /// Create a new missing-body error
    pub fn no_command(path: impl Into<String>) -> Self {
        Self::NoCommand { path: path.into() }
    }

    /// Create a new unconsumed-arguments error
    pub fn unknown_arguments(args: Vec<String>) -> Self {
        Self::UnknownArguments { args }
    }

    /// Create a new module load error
    pub fn module_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModuleLoad {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a new module load error caused by another error
    pub fn module_load_with_source<E>(path: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ModuleLoad {
            path: path.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new duplicate registration error
    pub fn duplicate_command(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::DuplicateCommand {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Wrap a body failure, passing through errors that already are `CommandError`s
    pub fn body(path: impl Into<String>, source: anyhow::Error) -> Self {
        match source.downcast::<CommandError>() {
            Ok(err) => err,
            Err(source) => Self::Body {
                path: path.into(),
                source,
            },
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CommandError>;
