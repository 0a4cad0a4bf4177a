//! Lazy command loading
//!
//! A [`ModuleLoader`] is asked to provide a command that is not registered
//! yet. Loading succeeds only if, as a side effect, the command ends up
//! registered on the node that asked.

use super::node::CommandNode;
use crate::error::{CommandError, Result};
use std::{collections::HashMap, fmt, rc::Rc};
use tracing::debug;

/// Loads the module found at `path`, which should register `name` on `node`
pub trait ModuleLoader {
    fn load(&self, node: &CommandNode, name: &str, path: &str) -> Result<()>;
}

impl<F> ModuleLoader for F
where
    F: Fn(&CommandNode, &str, &str) -> Result<()>,
{
    fn load(&self, node: &CommandNode, name: &str, path: &str) -> Result<()> {
        self(node, name, path)
    }
}

/// Registration run when a module is loaded
pub type Registration = Rc<dyn Fn(&CommandNode, &str) -> Result<()>>;

/// In-process loader: module paths mapped to registration functions
#[derive(Clone, Default)]
pub struct Registry {
    modules: HashMap<String, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module that receives the requesting node and the command
    /// name and is expected to call `add_command` itself.
    pub fn register<F>(&mut self, path: impl Into<String>, registration: F) -> &mut Self
    where
        F: Fn(&CommandNode, &str) -> Result<()> + 'static,
    {
        self.modules.insert(path.into(), Rc::new(registration));
        self
    }

    /// Register a module that adds the command with `description` and hands
    /// the new node to `configure`.
    pub fn command<F>(
        &mut self,
        path: impl Into<String>,
        description: impl Into<String>,
        configure: F,
    ) -> &mut Self
    where
        F: Fn(&CommandNode) -> Result<()> + 'static,
    {
        let description = description.into();
        self.register(path, move |node, name| {
            let command = node.add_command(name, description.clone())?;
            configure(&command)
        })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for Registry {
    fn load(&self, node: &CommandNode, name: &str, path: &str) -> Result<()> {
        let registration = self
            .modules
            .get(path)
            .cloned()
            .ok_or_else(|| CommandError::module_load(path, "module not found"))?;

        debug!("Running module {} for `{}`", path, name);
        registration(node, name).map_err(|e| CommandError::module_load_with_source(path, e))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<&String> = self.modules.keys().collect();
        paths.sort();
        f.debug_struct("Registry").field("modules", &paths).finish()
    }
}
