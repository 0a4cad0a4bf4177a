//! Child lookup
//!
//! Turns the leading positional argument into a child node: an exact,
//! case-sensitive match among materialized children first, then the lazy
//! loader when the node has a lazy-load root.

use super::node::{CommandNode, Entry};
use crate::error::{CommandError, Result};
use tracing::{debug, instrument, trace, warn};

/// Module path for a lazily loaded command.
///
/// Defaults to `<root>/<segments below the program>/<name>_command`; an
/// explicit `load_path` is taken relative to `root` instead.
pub fn lazy_path(root: &str, node_path: &[String], name: &str, load_path: Option<&str>) -> String {
    let root = root.trim_end_matches('/');
    if let Some(load_path) = load_path {
        return format!("{root}/{}", load_path.trim_start_matches('/'));
    }

    let leaf = format!("{name}_command");
    let segments: Vec<&str> = node_path
        .iter()
        .skip(1)
        .map(String::as_str)
        .chain(std::iter::once(leaf.as_str()))
        .collect();
    format!("{root}/{}", segments.join("/"))
}

impl CommandNode {
    /// Find the child named `name`, loading it lazily when enabled.
    ///
    /// Returns `Ok(None)` when `name` is not a command here. A failing loader
    /// is an error, never "not a command".
    pub fn resolve(&self, name: &str) -> Result<Option<CommandNode>> {
        if let Some(child) = self.child(name) {
            return Ok(Some(child));
        }

        let (lazy_root, load_path) = {
            let state = self.inner.borrow();
            let load_path = match state.entries.get(name) {
                Some(Entry::Documented(doc)) => doc.load_path.clone(),
                _ => None,
            };
            (state.lazy_root.clone(), load_path)
        };

        let Some(lazy_root) = lazy_root else {
            trace!("Lazy loading disabled under `{}`", self.path_string());
            return Ok(None);
        };

        let path = lazy_path(&lazy_root, &self.path(), name, load_path.as_deref());
        self.load_command(name, &path)
    }

    #[instrument(skip(self), fields(command = %self.path_string()))]
    fn load_command(&self, name: &str, path: &str) -> Result<Option<CommandNode>> {
        let loader = self
            .inner
            .borrow()
            .loader
            .clone()
            .ok_or_else(|| CommandError::module_load(path, "no module loader configured"))?;

        debug!("Loading `{}` from {}", name, path);
        loader.load(self, name, path)?;

        match self.child(name) {
            Some(child) => Ok(Some(child)),
            None => {
                warn!("Loading {} did not register `{}`", path, name);
                Ok(None)
            }
        }
    }
}
