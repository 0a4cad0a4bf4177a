//! The sample command tree run by the demo binary

use crate::{
    config::Settings,
    core::{CommandNode, Exit, Flag, Outcome, Registry},
    error::Result,
};
use anyhow::Context;
use std::rc::Rc;
use tracing::{debug, instrument};

/// Lazy-load root under which the built-in modules are registered
pub const BUILTIN_ROOT: &str = "builtin";

/// Build the sample tree described by `settings`
pub fn build_tree(settings: &Settings) -> Result<CommandNode> {
    let root = CommandNode::from_settings(settings)?;
    root.set_description("Sample command tree");
    root.set_loader(Rc::new(builtin_modules()));
    // Any leftover word is handed to the loader first, so the root body only
    // runs without arguments.
    root.set_body(|node, _| Ok(Exit::success(node.help())));

    let greet = root.add_command("greet", "Print a greeting")?;
    greet.set_lazy_load_root(None);
    let state = greet.shared_state();
    greet.on(
        Flag::parse(&["-n", "--name=NAME"])?
            .describe("Who to greet")
            .on(move |value| {
                state.set("name", value.clone());
            }),
    );
    let state = greet.shared_state();
    greet.on(
        Flag::parse(&["--shout"])?
            .describe("Print in upper case")
            .on(move |value| {
                state.set("shout", value.clone());
            }),
    );
    greet.set_body(|node, args| {
        let state = node.shared_state();
        let name = state
            .get("name")
            .and_then(|v| v.as_str().map(str::to_string))
            .or_else(|| args.first().cloned())
            .unwrap_or_else(|| "world".to_string());
        let greeting = format!("Hello, {name}!");
        let shout = state.get("shout").and_then(|v| v.as_bool()).unwrap_or(false);
        Ok(if shout { greeting.to_uppercase() } else { greeting })
    });

    // `math` has no body of its own; only its sub-commands run.
    let math = root.add_command("math", "Integer arithmetic")?;
    let add = math.add_command("add", "Sum the given integers")?;
    add.set_lazy_load_root(None);
    add.set_body(|_, args| {
        let mut total: i64 = 0;
        for arg in &args {
            let n = arg
                .parse::<i64>()
                .with_context(|| format!("not an integer: {arg}"))?;
            total = total
                .checked_add(n)
                .with_context(|| format!("sum overflows at {arg}"))?;
        }
        Ok(total)
    });

    root.add_doc_only("version", "Print version information", None);

    debug!("Built command tree with {:?}", root.children());
    Ok(root)
}

/// Modules available for lazy loading under [`BUILTIN_ROOT`]
fn builtin_modules() -> Registry {
    let mut registry = Registry::new();
    registry.command(
        format!("{BUILTIN_ROOT}/version_command"),
        "Print version information",
        |node| {
            node.set_lazy_load_root(None);
            node.set_body(|_, _| {
                Ok(format!(
                    "{} {}",
                    env!("CARGO_PKG_NAME"),
                    env!("CARGO_PKG_VERSION")
                ))
            });
            Ok(())
        },
    );
    registry
}

/// Run `args` through the sample tree
#[instrument(skip(settings))]
pub fn execute_command(settings: &Settings, args: &[String]) -> anyhow::Result<Outcome> {
    let root = build_tree(settings).context("Failed to build command tree")?;
    let outcome = root.call(args.iter().cloned())?;
    Ok(outcome)
}
