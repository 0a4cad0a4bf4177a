//! Recursive parse and call
//!
//! Starting at the node `call` is invoked on, each level strips its own
//! flags, then tries to resolve the first positional argument as a child and
//! descends. Descent stops at the first node whose leading argument names no
//! child; that node's body receives whatever is left.

use super::{
    node::{CommandNode, HookKind},
    options::Values,
};
use crate::error::{CommandError, Result};
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

/// Empty argument list, for calling a tree without arguments
pub const NO_ARGS: [&str; 0] = [];

/// What a body produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Value),
    /// The body asked for the process to end, e.g. after printing help
    Exit(Exit),
}

impl Outcome {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Value(value) => Some(value),
            Outcome::Exit(_) => None,
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Outcome::Exit(_))
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Value(value)
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::Value(Value::Null)
    }
}

impl From<String> for Outcome {
    fn from(value: String) -> Self {
        Outcome::Value(Value::String(value))
    }
}

impl From<&str> for Outcome {
    fn from(value: &str) -> Self {
        Outcome::Value(Value::String(value.to_string()))
    }
}

impl From<i64> for Outcome {
    fn from(value: i64) -> Self {
        Outcome::Value(Value::from(value))
    }
}

impl From<bool> for Outcome {
    fn from(value: bool) -> Self {
        Outcome::Value(Value::Bool(value))
    }
}

impl From<Exit> for Outcome {
    fn from(exit: Exit) -> Self {
        Outcome::Exit(exit)
    }
}

/// Terminal request: print `output` and end the process with `code`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    pub code: i32,
    pub output: String,
}

impl Exit {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            code: 0,
            output: output.into(),
        }
    }

    pub fn failure(code: i32, output: impl Into<String>) -> Self {
        Self {
            code,
            output: output.into(),
        }
    }

    /// Print the output (stdout on success, stderr otherwise) and exit
    pub fn terminate(self) -> ! {
        use std::io::Write;

        if self.code == 0 {
            print!("{}", self.output);
            if let Err(e) = std::io::stdout().flush() {
                warn!("Failed to flush stdout: {}", e);
            }
        } else {
            eprint!("{}", self.output);
        }
        std::process::exit(self.code)
    }
}

/// The node a parse stopped at, and the arguments left for its body
#[derive(Debug, Clone)]
pub struct Resolution {
    pub node: CommandNode,
    pub residue: Vec<String>,
}

impl Resolution {
    /// Run the resolved node's body with the residue
    pub fn invoke(self) -> Result<Outcome> {
        self.node.invoke(self.residue)
    }
}

fn collect_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter().map(Into::into).collect()
}

impl CommandNode {
    /// Resolve `args` without running any body
    pub fn parse<I, S>(&self, args: I) -> Result<Resolution>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parse_with(args, None)
    }

    /// Resolve `args`, writing decoded flag values of every level to `dest`
    pub fn parse_with<I, S>(&self, args: I, dest: Option<&mut Values>) -> Result<Resolution>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = collect_args(args);
        let node = self.parse_in_place(&mut argv, dest)?;
        Ok(Resolution {
            node,
            residue: argv,
        })
    }

    /// Resolve in place: consumed flags and command names are removed from
    /// `argv`, leaving the residue for the returned node.
    pub fn parse_in_place(
        &self,
        argv: &mut Vec<String>,
        mut dest: Option<&mut Values>,
    ) -> Result<CommandNode> {
        if let Some(hook) = self.hook(HookKind::PreParse) {
            *argv = hook(self, std::mem::take(argv))?;
        }

        let calls = self
            .options()
            .borrow()
            .parse_in_place(argv, dest.as_deref_mut())?;
        calls.run();

        if let Some(hook) = self.hook(HookKind::OnResolve) {
            *argv = hook(self, std::mem::take(argv))?;
        }

        if let Some(head) = argv.first().cloned() {
            if let Some(child) = self.resolve(&head)? {
                argv.remove(0);
                trace!("Descending into `{}`", child.path_string());
                return child.parse_in_place(argv, dest);
            }
            trace!("`{}` is not a command of `{}`", head, self.path_string());
        }

        if let Some(hook) = self.hook(HookKind::PostParse) {
            *argv = hook(self, std::mem::take(argv))?;
        }

        debug!(
            "Resolved `{}` with {} residual argument(s)",
            self.path_string(),
            argv.len()
        );
        Ok(self.clone())
    }

    /// Resolve `args` and run the resolved body
    pub fn call<I, S>(&self, args: I) -> Result<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.call_with(args, None)
    }

    /// Resolve `args`, writing decoded flag values to `dest`, and run the
    /// resolved body. Strictness is governed by this node, not the resolved one.
    #[instrument(skip_all, fields(command = %self.path_string()))]
    pub fn call_with<I, S>(&self, args: I, dest: Option<&mut Values>) -> Result<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Resolution { node, residue } = self.parse_with(args, dest)?;

        if self.raise_unknown() && !residue.is_empty() {
            return Err(CommandError::unknown_arguments(residue));
        }

        node.invoke(residue)
    }

    /// Run this node's body with `args`
    pub fn invoke(&self, args: Vec<String>) -> Result<Outcome> {
        let body = self.inner.borrow().body.clone();
        let Some(body) = body else {
            return Err(CommandError::no_command(self.path_string()));
        };

        debug!("Running `{}` with {:?}", self.path_string(), args);
        body(self, args).map_err(|e| CommandError::body(self.path_string(), e))
    }
}
