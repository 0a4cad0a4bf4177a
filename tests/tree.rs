use cmdtree::{
    CommandError, CommandNode, Exit, Flag, HandlerCalls, NO_ARGS, OptionLayer, Outcome, Registry,
    ModuleLoader, SharedState, ValueKind, Values, core::OptionError,
};
use serde_json::{Value, json};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

fn counter_body(
    counter: Rc<Cell<i32>>,
    value: i32,
) -> impl Fn(&CommandNode, Vec<String>) -> anyhow::Result<()> + 'static {
    move |_, _| {
        counter.set(value);
        Ok(())
    }
}

#[test]
fn test_full_tree_dispatch() {
    let i = Rc::new(Cell::new(0));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let root = CommandNode::new("rspec");
    root.set_body(counter_body(i.clone(), 1));
    root.add_command("a", "").unwrap().set_body(counter_body(i.clone(), 2));
    let b = root.add_command("b", "").unwrap();
    b.on(Flag::parse(&["-q"]).unwrap());
    b.set_body(counter_body(i.clone(), 3));
    let c = b.add_command("c", "").unwrap();
    let sink = seen.clone();
    let counter = i.clone();
    c.set_body(move |_, args| {
        counter.set(4);
        *sink.borrow_mut() = args;
        Ok(())
    });

    assert_eq!(i.get(), 0);
    root.call(NO_ARGS).unwrap();
    assert_eq!(i.get(), 1);
    root.call(["a"]).unwrap();
    assert_eq!(i.get(), 2);
    root.call(["b"]).unwrap();
    assert_eq!(i.get(), 3);
    root.call(["b", "c", "-q", "--a=3"]).unwrap();
    assert_eq!(i.get(), 4);
    assert_eq!(*seen.borrow(), vec!["--a=3"]);
    root.call(["1", "c"]).unwrap();
    assert_eq!(i.get(), 1);

    root.set_raise_unknown(true);
    let err = root.call(["b", "c", "-q", "--a=3"]).unwrap_err();
    match err {
        CommandError::UnknownArguments { args } => assert_eq!(args, vec!["--a=3"]),
        other => panic!("Expected UnknownArguments, got {other:?}"),
    }
}

#[test]
fn test_strictness_is_checked_on_the_calling_node() {
    let root = CommandNode::new("prog");
    let a = root.add_command("a", "").unwrap();
    a.set_body(|_, args| Ok(json!(args)));
    a.set_raise_unknown(true);

    // The root is lenient, so leftovers reach `a` even though `a` is strict.
    let outcome = root.call(["a", "extra"]).unwrap();
    assert_eq!(outcome.value(), Some(&json!(["extra"])));

    assert!(matches!(
        a.call(["extra"]),
        Err(CommandError::UnknownArguments { .. })
    ));
}

#[test]
fn test_root_residue_reaches_root_body() {
    let root = CommandNode::new("prog");
    root.add_command("a", "").unwrap();
    root.set_body(|_, args| Ok(json!(args)));

    let outcome = root.call(["1", "c"]).unwrap();
    assert_eq!(outcome.value(), Some(&json!(["1", "c"])));
}

#[test]
fn test_custom_sub_command_lookup() {
    let x = Rc::new(Cell::new(0_i64));
    let root = CommandNode::new("rspec");
    let sink = x.clone();
    root.set_on_resolve(move |node, argv| {
        if node.child("subcmd1").is_none() {
            let sub = node.add_command("subcmd1", "Set x.")?;
            let sink = sink.clone();
            sub.on(
                Flag::parse(&["-x=int"])?
                    .kind(ValueKind::Integer)
                    .describe("Set an int.")
                    .on(move |v| sink.set(v.as_i64().unwrap_or_default())),
            );
            sub.set_body(|_, _| Ok(()));
        }
        Ok(argv)
    });

    root.call(["subcmd1", "-x", "3"]).unwrap();
    assert_eq!(x.get(), 3);

    x.set(0);
    root.call(["subcmd1", "-x", "3"]).unwrap();
    assert_eq!(x.get(), 3);

    assert_eq!(root.help(), "Usage: rspec [options]\n\nsubcmd1 - Set x.\n\n");
}

#[test]
fn test_shared_state_is_identical_across_the_tree() {
    let shared = SharedState::new();
    let root = CommandNode::new("prog");
    root.set_shared_state(shared.clone());

    let a = root.add_command("a", "A sub command").unwrap();
    let b = a.add_command("b", "B sub command of a").unwrap();
    b.set_body(|node, args| {
        node.shared_state().set("args", json!(args));
        Ok(())
    });

    root.call(["a", "b", "--extra-arg", "foo"]).unwrap();

    assert_eq!(shared.get("args"), Some(json!(["--extra-arg", "foo"])));
    assert!(shared.ptr_eq(&root.child("a").unwrap().shared_state()));
    assert!(shared.ptr_eq(&a.child("b").unwrap().shared_state()));

    a.shared_state().set("from_a", 1);
    assert_eq!(b.shared_state().get("from_a"), Some(json!(1)));
}

#[test]
fn test_shared_state_merge_from_a_body() {
    let shared = SharedState::new();
    shared.set("args", json!(["first"]));
    let root = CommandNode::new("prog");
    root.set_shared_state(shared.clone());
    let b = root.add_command("a", "").unwrap().add_command("b", "").unwrap();
    b.set_body(|node, args| {
        node.shared_state().merge(json!({ "args": args }));
        Ok(())
    });

    root.call(["a", "b", "--extra-arg", "foo"]).unwrap();
    assert_eq!(shared.get("args"), Some(json!(["first", "--extra-arg", "foo"])));
}

#[test]
fn test_pre_and_post_parse_hooks() {
    let pre = Rc::new(Cell::new(0));
    let post = Rc::new(Cell::new(0));
    let root = CommandNode::new("prog");
    let a = root.add_command("a", "").unwrap();
    let count = pre.clone();
    a.set_pre_parse(move |_, argv| {
        count.set(count.get() + 1);
        Ok(argv)
    });
    let count = post.clone();
    a.set_post_parse(move |_, argv| {
        count.set(count.get() + 1);
        Ok(argv)
    });
    a.set_body(|_, _| Ok(()));

    root.call(["a"]).unwrap();
    assert_eq!(pre.get(), 1);
    assert_eq!(post.get(), 1);
}

#[test]
fn test_hooks_rewrite_arguments() {
    let root = CommandNode::new("prog");
    root.set_pre_parse(|_, argv| {
        Ok(argv
            .into_iter()
            .map(|arg| if arg == "ls" { "list".to_string() } else { arg })
            .collect())
    });
    root.set_post_parse(|_, mut argv| {
        argv.push("from-root".to_string());
        Ok(argv)
    });
    let list = root.add_command("list", "").unwrap();
    list.set_post_parse(|_, mut argv| {
        argv.retain(|arg| arg != "--ignored");
        Ok(argv)
    });
    list.set_body(|_, args| Ok(json!(args)));

    let outcome = root.call(["ls", "--ignored", "x"]).unwrap();
    assert_eq!(outcome.value(), Some(&json!(["x"])));

    // Post hooks of nodes passed through on the way down do not run.
    let resolution = root.parse(["list", "--ignored"]).unwrap();
    assert!(resolution.node.ptr_eq(&list));
    assert!(resolution.residue.is_empty());
}

#[test]
fn test_help_is_added_below_every_command_but_help() {
    let root = CommandNode::new("prog");
    assert!(root.child("help").is_none());

    let a = root.add_command("a", "").unwrap();
    let b = a.add_command("b", "").unwrap();
    assert!(a.child("help").is_some());
    assert!(b.child("help").is_some());
    assert!(a.child("help").unwrap().child("help").is_none());

    let explicit = root.add_command("help", "Top-level help").unwrap();
    assert!(explicit.child("help").is_none());
}

#[test]
fn test_help_command_prints_composed_help() {
    let root = CommandNode::new("rspec");
    let a = root.add_command("a", "").unwrap();
    a.on(Flag::parse(&["--foo", "-f"]).unwrap().describe("Do the foos."));

    let outcome = root.call(["a", "help"]).unwrap();
    assert_eq!(
        outcome,
        Outcome::Exit(Exit::success(
            "Usage: rspec [options]\n\
             \n\
             a - \n\
             \n\
             \n\
             Usage: rspec a [options]\n\
             \n\
             help - Print help.\n\
             \n\
             \x20   -f, --foo                        Do the foos.\n"
        ))
    );
}

fn autoreq_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register("autoreqtest/a_command", |node, name| {
        let a = node.add_command(name, "A command.")?;
        a.add_doc_only("b", "B is an empty, intermediate command.", None);
        a.set_body(|node, _| Ok(Exit::success(node.help())));
        Ok(())
    });
    registry.command(
        "autoreqtest/a/b_command",
        "B is an empty, intermediate command.",
        |_| Ok(()),
    );
    registry.command("autoreqtest/a/b/c_command", "A command.", |c| {
        c.set_body(|node, _| {
            node.shared_state().set("x", 3);
            Ok(())
        });
        Ok(())
    });
    registry
}

#[test]
fn test_lazy_loading_materializes_once() {
    let registry = autoreq_registry();
    let loads = Rc::new(Cell::new(0));
    let counter = loads.clone();
    let loader = move |node: &CommandNode, name: &str, path: &str| -> cmdtree::Result<()> {
        counter.set(counter.get() + 1);
        registry.load(node, name, path)
    };

    let root = CommandNode::new("prog");
    root.set_lazy_load_root(Some("autoreqtest".to_string()));
    root.set_loader(Rc::new(loader));

    let a = root.resolve("a").unwrap().unwrap();
    assert_eq!(
        a.command_listing(),
        "\n\nb - B is an empty, intermediate command.\nhelp - Print help.\n\n"
    );
    assert_eq!(loads.get(), 1);

    root.call(["a", "b", "c"]).unwrap();
    assert_eq!(root.shared_state().get("x"), Some(json!(3)));
    assert_eq!(loads.get(), 3);

    root.call(["a", "b", "c"]).unwrap();
    assert_eq!(loads.get(), 3);
}

#[test]
fn test_doc_only_entries_with_explicit_paths() {
    let mut registry = Registry::new();
    registry.command("autoreqtest2/commands/deploy", "Deployed.", |node| {
        node.set_lazy_load_root(None);
        node.set_body(|_, args| Ok(json!(args)));
        Ok(())
    });

    let root = CommandNode::new("prog");
    root.set_lazy_load_root(Some("autoreqtest2".to_string()));
    root.set_loader(Rc::new(registry));
    root.add_doc_only("deploy", "Deploy the thing.", Some("commands/deploy"));

    assert_eq!(
        root.help(),
        "Usage: prog [options]\n\ndeploy - Deploy the thing.\n\n"
    );

    let outcome = root.call(["deploy", "now"]).unwrap();
    assert_eq!(outcome.value(), Some(&json!(["now"])));
    assert_eq!(root.help(), "Usage: prog [options]\n\ndeploy - Deployed.\n\n");
}

#[test]
fn test_load_errors_for_missing_commands() {
    let root = CommandNode::new("prog");
    root.set_lazy_load_root(Some("set/to/enable/autoloading".to_string()));
    root.set_loader(Rc::new(Registry::new()));
    let a = root.add_command("a", "A").unwrap();
    a.set_description("A command that exists.");
    a.set_body(|_, _| Ok("x"));

    assert_eq!(root.call(["a"]).unwrap(), Outcome::from("x"));
    match root.call(["a", "b"]).unwrap_err() {
        CommandError::ModuleLoad { path, .. } => {
            assert_eq!(path, "set/to/enable/autoloading/a/b_command")
        }
        other => panic!("Expected ModuleLoad, got {other:?}"),
    }
}

#[test]
fn test_unknown_word_without_lazy_loading_is_residue() {
    let root = CommandNode::new("prog");
    root.set_body(|_, args| Ok(json!(args)));
    let outcome = root.call(["nope"]).unwrap();
    assert_eq!(outcome.value(), Some(&json!(["nope"])));
}

/// Option layer that treats `+name` tokens as switches
struct PlusSwitches {
    banner: String,
}

impl OptionLayer for PlusSwitches {
    fn register(&mut self, _flag: Flag) {}

    fn banner(&self) -> &str {
        &self.banner
    }

    fn set_banner(&mut self, banner: String) {
        self.banner = banner;
    }

    fn parse_in_place(
        &self,
        argv: &mut Vec<String>,
        dest: Option<&mut Values>,
    ) -> Result<HandlerCalls, OptionError> {
        let (switches, residue): (Vec<String>, Vec<String>) = std::mem::take(argv)
            .into_iter()
            .partition(|token| token.starts_with('+'));
        if let Some(dest) = dest {
            for switch in switches {
                dest.insert(switch[1..].to_string(), Value::Bool(true));
            }
        }
        *argv = residue;
        Ok(HandlerCalls::default())
    }

    fn summary(&self) -> String {
        "    +NAME    Enable NAME.\n".to_string()
    }
}

#[test]
fn test_custom_option_layer_on_the_root() {
    let root = CommandNode::with_options(
        "prog",
        PlusSwitches {
            banner: "Usage: prog [+switches]".to_string(),
        },
    );
    let a = root.add_command("a", "Does a.").unwrap();
    a.set_body(|_, args| Ok(json!(args)));

    let mut dest = Values::new();
    let outcome = root.call_with(["+fast", "a", "x"], Some(&mut dest)).unwrap();
    assert_eq!(outcome.value(), Some(&json!(["x"])));
    assert_eq!(dest.get("fast"), Some(&json!(true)));

    assert_eq!(
        root.help(),
        "Usage: prog [+switches]\n\na - Does a.\n\n    +NAME    Enable NAME.\n"
    );

    // children parse with the default flag table
    assert_eq!(a.banner(), "Usage: prog a [options]");
    let outcome = a.call(["+slow"]).unwrap();
    assert_eq!(outcome.value(), Some(&json!(["+slow"])));
}
