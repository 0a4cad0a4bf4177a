//! Command tree nodes
//!
//! A [`CommandNode`] is one parser level: its own flag table, its body, its
//! registered children and the metadata tying it into the tree (path, parent
//! link, shared state). Nodes are handles; cloning one yields another handle
//! to the same level.
//!
//! Bodies and hooks receive the node they belong to as their first argument,
//! so they never need to capture a handle to their own node.

use super::{
    dispatch::{Exit, Outcome},
    loader::ModuleLoader,
    options::{Flag, FlagTable, OptionLayer},
};
use crate::{
    config::Settings,
    error::{CommandError, Result},
    utils::SharedState,
};
use indexmap::IndexMap;
use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};
use tracing::debug;

/// Name of the automatically generated help command
pub const HELP_COMMAND: &str = "help";

const HELP_DESCRIPTION: &str = "Print help.";

pub(crate) type Body = Rc<dyn Fn(&CommandNode, Vec<String>) -> anyhow::Result<Outcome>>;
pub(crate) type Hook = Rc<dyn Fn(&CommandNode, Vec<String>) -> Result<Vec<String>>>;

#[derive(Debug, Clone, Copy)]
pub(crate) enum HookKind {
    PreParse,
    OnResolve,
    PostParse,
}

/// A named entry in a node's command listing
pub(crate) enum Entry {
    Loaded(CommandNode),
    /// Listed in help but not materialized yet; resolution goes through the loader
    Documented(DocEntry),
}

#[derive(Debug, Clone)]
pub(crate) struct DocEntry {
    pub(crate) description: String,
    pub(crate) load_path: Option<String>,
}

pub(crate) struct NodeState {
    pub(crate) path: Vec<String>,
    pub(crate) parent: Weak<RefCell<NodeState>>,
    pub(crate) description: String,
    pub(crate) entries: IndexMap<String, Entry>,
    pub(crate) body: Option<Body>,
    pub(crate) options: Rc<RefCell<dyn OptionLayer>>,
    pub(crate) shared: SharedState,
    pub(crate) raise_unknown: bool,
    pub(crate) lazy_root: Option<String>,
    pub(crate) loader: Option<Rc<dyn ModuleLoader>>,
    pub(crate) on_resolve: Option<Hook>,
    pub(crate) pre_parse: Option<Hook>,
    pub(crate) post_parse: Option<Hook>,
}

/// Handle to one level of a command tree
#[derive(Clone)]
pub struct CommandNode {
    pub(crate) inner: Rc<RefCell<NodeState>>,
}

fn usage_banner(path: &[String]) -> String {
    format!("Usage: {} [options]", path.join(" "))
}

impl CommandNode {
    /// Create a root node for `program` with the default flag table
    pub fn new(program: impl Into<String>) -> Self {
        let path = vec![program.into()];
        let options = FlagTable::new(usage_banner(&path));
        Self::with_state(path, Weak::new(), Rc::new(RefCell::new(options)))
            .configured(SharedState::new(), false, None, None)
    }

    /// Create a root node that parses its flags with a custom option layer.
    ///
    /// Children registered under it still use [`FlagTable`].
    pub fn with_options<L>(program: impl Into<String>, options: L) -> Self
    where
        L: OptionLayer + 'static,
    {
        Self::with_state(vec![program.into()], Weak::new(), Rc::new(RefCell::new(options)))
            .configured(SharedState::new(), false, None, None)
    }

    /// Create a root node from validated settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let root = Self::new(settings.program.clone());
        root.set_raise_unknown(settings.raise_unknown);
        root.set_lazy_load_root(settings.lazy_load_root.clone());
        Ok(root)
    }

    fn with_state(
        path: Vec<String>,
        parent: Weak<RefCell<NodeState>>,
        options: Rc<RefCell<dyn OptionLayer>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeState {
                path,
                parent,
                description: String::new(),
                entries: IndexMap::new(),
                body: None,
                options,
                shared: SharedState::new(),
                raise_unknown: false,
                lazy_root: None,
                loader: None,
                on_resolve: None,
                pre_parse: None,
                post_parse: None,
            })),
        }
    }

    fn configured(
        self,
        shared: SharedState,
        raise_unknown: bool,
        lazy_root: Option<String>,
        loader: Option<Rc<dyn ModuleLoader>>,
    ) -> Self {
        {
            let mut state = self.inner.borrow_mut();
            state.shared = shared;
            state.raise_unknown = raise_unknown;
            state.lazy_root = lazy_root;
            state.loader = loader;
        }
        self
    }

    /// Create an unregistered child of `self` that inherits shared state,
    /// strictness and lazy-load settings.
    fn new_child(&self, name: &str) -> Self {
        let state = self.inner.borrow();
        let mut path = state.path.clone();
        path.push(name.to_string());
        let options = FlagTable::new(usage_banner(&path));

        Self::with_state(path, Rc::downgrade(&self.inner), Rc::new(RefCell::new(options)))
            .configured(
                state.shared.clone(),
                state.raise_unknown,
                state.lazy_root.clone(),
                state.loader.clone(),
            )
    }

    /// Register a sub-command named `name` and return it for configuration.
    ///
    /// Every command except one named `help` gets its own `help` child that
    /// prints the composed help text. A doc-only entry with the same name is
    /// replaced in place.
    pub fn add_command(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<CommandNode> {
        let name = name.into();
        if self.child(&name).is_some() {
            return Err(CommandError::duplicate_command(name, self.path_string()));
        }

        let child = self.new_child(&name);
        child.set_description(description);
        if name != HELP_COMMAND {
            child.install_help();
        }

        self.insert_entry(name, Entry::Loaded(child.clone()));
        debug!("Registered command `{}`", child.path_string());
        Ok(child)
    }

    fn install_help(&self) {
        let help = self.new_child(HELP_COMMAND);
        help.set_description(HELP_DESCRIPTION);
        help.set_lazy_load_root(None);
        help.set_body(|node, _args| {
            let target = node
                .parent()
                .ok_or_else(|| anyhow::anyhow!("help command has no parent"))?;
            Ok(Exit::success(target.composed_help()))
        });
        self.insert_entry(HELP_COMMAND.to_string(), Entry::Loaded(help));
    }

    /// Insert keeping an existing entry's position; new entries go before a
    /// trailing `help` entry so it stays last in the listing.
    fn insert_entry(&self, name: String, entry: Entry) {
        let mut state = self.inner.borrow_mut();
        let entries = &mut state.entries;
        if entries.contains_key(&name) {
            entries.insert(name, entry);
            return;
        }
        let help_last = entries
            .last()
            .is_some_and(|(key, _)| key.as_str() == HELP_COMMAND);
        if help_last && name != HELP_COMMAND {
            let index = entries.len() - 1;
            entries.shift_insert(index, name, entry);
        } else {
            entries.insert(name, entry);
        }
    }

    /// List `name` in help without materializing it. Resolving it still goes
    /// through the lazy loader; `load_path`, relative to the lazy-load root,
    /// overrides the derived module path.
    pub fn add_doc_only(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        load_path: Option<&str>,
    ) {
        let name = name.into();
        if self.child(&name).is_some() {
            debug!("`{}` is already loaded; ignoring doc-only entry", name);
            return;
        }
        let entry = DocEntry {
            description: description.into(),
            load_path: load_path.map(str::to_string),
        };
        self.insert_entry(name, Entry::Documented(entry));
    }

    /// Replace the body run when resolution stops at this node
    pub fn set_body<F, R>(&self, body: F)
    where
        F: Fn(&CommandNode, Vec<String>) -> anyhow::Result<R> + 'static,
        R: Into<Outcome>,
    {
        let body: Body = Rc::new(move |node: &CommandNode, args: Vec<String>| {
            body(node, args).map(Into::into)
        });
        self.inner.borrow_mut().body = Some(body);
    }

    pub fn has_body(&self) -> bool {
        self.inner.borrow().body.is_some()
    }

    /// Hook run after this node's flags are parsed and before the leading
    /// positional argument is looked up. It may register commands on demand.
    pub fn set_on_resolve<F>(&self, hook: F)
    where
        F: Fn(&CommandNode, Vec<String>) -> Result<Vec<String>> + 'static,
    {
        self.inner.borrow_mut().on_resolve = Some(Rc::new(hook));
    }

    /// Hook run before this node's flags are parsed
    pub fn set_pre_parse<F>(&self, hook: F)
    where
        F: Fn(&CommandNode, Vec<String>) -> Result<Vec<String>> + 'static,
    {
        self.inner.borrow_mut().pre_parse = Some(Rc::new(hook));
    }

    /// Hook run when parsing stops at this node, before the residue is returned
    pub fn set_post_parse<F>(&self, hook: F)
    where
        F: Fn(&CommandNode, Vec<String>) -> Result<Vec<String>> + 'static,
    {
        self.inner.borrow_mut().post_parse = Some(Rc::new(hook));
    }

    /// Register a flag on this node's option layer
    pub fn on(&self, flag: Flag) -> &Self {
        self.options().borrow_mut().register(flag);
        self
    }

    pub fn banner(&self) -> String {
        self.options().borrow().banner().to_string()
    }

    pub fn set_banner(&self, banner: impl Into<String>) {
        self.options().borrow_mut().set_banner(banner.into());
    }

    /// The rendered flag table alone
    pub fn options_summary(&self) -> String {
        self.options().borrow().summary()
    }

    pub(crate) fn options(&self) -> Rc<RefCell<dyn OptionLayer>> {
        self.inner.borrow().options.clone()
    }

    pub(crate) fn hook(&self, kind: HookKind) -> Option<Hook> {
        let state = self.inner.borrow();
        match kind {
            HookKind::PreParse => state.pre_parse.clone(),
            HookKind::OnResolve => state.on_resolve.clone(),
            HookKind::PostParse => state.post_parse.clone(),
        }
    }

    /// Listing of commands framed by blank lines, or empty when there are none
    pub fn command_listing(&self) -> String {
        let state = self.inner.borrow();
        if state.entries.is_empty() {
            return String::new();
        }

        let mut listing = String::from("\n\n");
        for (name, entry) in &state.entries {
            let description = match entry {
                Entry::Loaded(child) => child.description(),
                Entry::Documented(doc) => doc.description.clone(),
            };
            listing.push_str(&format!("{name} - {description}\n"));
        }
        listing.push('\n');
        listing
    }

    /// This node's help: banner, command listing and flag table
    pub fn help(&self) -> String {
        let options = self.options();
        let options = options.borrow();
        let mut text = format!("{}{}", options.banner(), self.command_listing());
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&options.summary());
        text
    }

    /// Help for every node from the root down to this one
    pub fn composed_help(&self) -> String {
        match self.parent() {
            Some(parent) => format!("{}\n{}", parent.composed_help(), self.help()),
            None => self.help(),
        }
    }

    /// Materialized child named `name`
    pub fn child(&self, name: &str) -> Option<CommandNode> {
        match self.inner.borrow().entries.get(name) {
            Some(Entry::Loaded(child)) => Some(child.clone()),
            _ => None,
        }
    }

    /// Names of materialized children in declaration order
    pub fn children(&self) -> Vec<String> {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Loaded(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Whether `name` is listed but not yet materialized
    pub fn is_doc_only(&self, name: &str) -> bool {
        matches!(
            self.inner.borrow().entries.get(name),
            Some(Entry::Documented(_))
        )
    }

    pub fn parent(&self) -> Option<CommandNode> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| CommandNode { inner })
    }

    /// Segments from the program name down to this node
    pub fn path(&self) -> Vec<String> {
        self.inner.borrow().path.clone()
    }

    pub fn path_string(&self) -> String {
        self.inner.borrow().path.join(" ")
    }

    /// Last path segment
    pub fn name(&self) -> String {
        self.inner.borrow().path.last().cloned().unwrap_or_default()
    }

    pub fn description(&self) -> String {
        self.inner.borrow().description.clone()
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.inner.borrow_mut().description = description.into();
    }

    pub fn shared_state(&self) -> SharedState {
        self.inner.borrow().shared.clone()
    }

    /// Rebind the shared state of this subtree. Descendants that shared this
    /// node's previous state are rebound too; descendants that were given
    /// their own state keep it.
    pub fn set_shared_state(&self, shared: SharedState) {
        let previous = std::mem::replace(&mut self.inner.borrow_mut().shared, shared.clone());
        self.rebind_descendants(&previous, &shared);
    }

    fn rebind_descendants(&self, previous: &SharedState, shared: &SharedState) {
        let children: Vec<CommandNode> = self
            .inner
            .borrow()
            .entries
            .values()
            .filter_map(|entry| match entry {
                Entry::Loaded(child) => Some(child.clone()),
                Entry::Documented(_) => None,
            })
            .collect();

        for child in children {
            let rebound = {
                let mut state = child.inner.borrow_mut();
                if state.shared.ptr_eq(previous) {
                    state.shared = shared.clone();
                    true
                } else {
                    false
                }
            };
            if rebound {
                child.rebind_descendants(previous, shared);
            }
        }
    }

    pub fn raise_unknown(&self) -> bool {
        self.inner.borrow().raise_unknown
    }

    /// Fail `call` when positional arguments are left over
    pub fn set_raise_unknown(&self, raise_unknown: bool) {
        self.inner.borrow_mut().raise_unknown = raise_unknown;
    }

    pub fn lazy_load_root(&self) -> Option<String> {
        self.inner.borrow().lazy_root.clone()
    }

    /// Enable lazy loading of unknown commands below `root`, or disable it
    pub fn set_lazy_load_root(&self, root: Option<String>) {
        self.inner.borrow_mut().lazy_root = root;
    }

    pub fn set_loader(&self, loader: Rc<dyn ModuleLoader>) {
        self.inner.borrow_mut().loader = Some(loader);
    }

    /// Whether both handles refer to the same node
    pub fn ptr_eq(&self, other: &CommandNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("CommandNode")
            .field("path", &state.path)
            .field("description", &state.description)
            .field("entries", &state.entries.keys().collect::<Vec<_>>())
            .field("raise_unknown", &state.raise_unknown)
            .field("lazy_root", &state.lazy_root)
            .finish_non_exhaustive()
    }
}
