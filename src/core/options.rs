//! Flat flag parsing for a single command level
//!
//! A node never interprets flags itself. It hands its argument list to an
//! [`OptionLayer`], which strips the flags it recognizes and leaves the
//! positional residue behind for sub-command lookup.

use regex::Regex;
use serde_json::{Map, Number, Value};
use std::{fmt, rc::Rc, sync::OnceLock};
use thiserror::Error;
use tracing::trace;

/// Destination map for decoded flag values
pub type Values = Map<String, Value>;

/// Callback invoked with every decoded value of a flag
pub type FlagHandler = Rc<dyn Fn(&Value)>;

/// Flag handler calls collected during a parse.
///
/// The layer only records them; the node runs them once the layer is no
/// longer borrowed, so a handler may register flags on its own node.
#[derive(Default)]
pub struct HandlerCalls(Vec<(FlagHandler, Value)>);

impl HandlerCalls {
    pub fn push(&mut self, handler: FlagHandler, value: Value) {
        self.0.push((handler, value));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Run every handler in parse order
    pub fn run(self) {
        for (handler, value) in self.0 {
            handler(&value);
        }
    }
}

impl fmt::Debug for HandlerCalls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCalls")
            .field("pending", &self.0.len())
            .finish()
    }
}

const SUMMARY_INDENT: &str = "    ";
const SUMMARY_WIDTH: usize = 32;

/// Flag syntax errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("needless argument: {0}")]
    NeedlessArgument(String),

    #[error("invalid argument: {flag} {value}")]
    InvalidArgument { flag: String, value: String },

    #[error("invalid flag declaration: {0}")]
    InvalidDeclaration(String),
}

/// The operations a command node needs from its flag parser
pub trait OptionLayer {
    /// Register a flag
    fn register(&mut self, flag: Flag);

    /// Usage line printed at the top of the help text
    fn banner(&self) -> &str;

    fn set_banner(&mut self, banner: String);

    /// Remove every recognized flag (and its value) from `argv`, writing
    /// decoded values to `dest` when one is given. Positional tokens keep
    /// their relative order. Flag handlers are returned, not run.
    fn parse_in_place(
        &self,
        argv: &mut Vec<String>,
        dest: Option<&mut Values>,
    ) -> Result<HandlerCalls, OptionError>;

    /// Rendered flag table, one line per flag
    fn summary(&self) -> String;
}

/// How a flag's value is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// No value; decodes to `true`
    Switch,
    Integer,
    Float,
    Text,
}

/// A single flag declaration
#[derive(Clone)]
pub struct Flag {
    short: Option<char>,
    long: Option<String>,
    placeholder: Option<String>,
    kind: ValueKind,
    description: String,
    handler: Option<FlagHandler>,
}

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:-(?P<short>[A-Za-z0-9?])|--(?P<long>[A-Za-z0-9][A-Za-z0-9_-]*))(?:[= ](?P<arg>\S+))?$")
            .expect("flag declaration regex is valid")
    })
}

impl Flag {
    /// Parse OptionParser-style declarations such as `"-i=int"`,
    /// `"--foo"` or `"--name NAME"`. Several declarations name the same flag:
    /// `Flag::parse(&["--foo", "-f"])`. A placeholder makes the flag take a
    /// text value; use [`Flag::kind`] to decode it differently.
    pub fn parse(declarations: &[&str]) -> Result<Self, OptionError> {
        let mut flag = Self {
            short: None,
            long: None,
            placeholder: None,
            kind: ValueKind::Switch,
            description: String::new(),
            handler: None,
        };

        for declaration in declarations {
            let caps = declaration_regex()
                .captures(declaration.trim())
                .ok_or_else(|| OptionError::InvalidDeclaration(declaration.to_string()))?;

            if let Some(short) = caps.name("short") {
                flag.short = short.as_str().chars().next();
            }
            if let Some(long) = caps.name("long") {
                flag.long = Some(long.as_str().to_string());
            }
            if let Some(arg) = caps.name("arg") {
                flag.placeholder = Some(arg.as_str().to_string());
                flag.kind = ValueKind::Text;
            }
        }

        if flag.short.is_none() && flag.long.is_none() {
            return Err(OptionError::InvalidDeclaration(declarations.join(" ")));
        }
        Ok(flag)
    }

    /// Set how the value is decoded
    pub fn kind(mut self, kind: ValueKind) -> Self {
        if kind != ValueKind::Switch && self.placeholder.is_none() {
            self.placeholder = Some("VALUE".to_string());
        }
        if kind == ValueKind::Switch {
            self.placeholder = None;
        }
        self.kind = kind;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Call `handler` with every decoded value
    pub fn on<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Value) + 'static,
    {
        self.handler = Some(Rc::new(handler));
        self
    }

    /// Key used in the destination map: the long name, else the short letter
    pub fn key(&self) -> String {
        match (&self.long, self.short) {
            (Some(long), _) => long.clone(),
            (None, Some(short)) => short.to_string(),
            (None, None) => String::new(),
        }
    }

    pub fn takes_value(&self) -> bool {
        self.kind != ValueKind::Switch
    }

    fn decode(&self, shown: &str, raw: &str) -> Result<Value, OptionError> {
        let invalid = || OptionError::InvalidArgument {
            flag: shown.to_string(),
            value: raw.to_string(),
        };
        match self.kind {
            ValueKind::Switch => Ok(Value::Bool(true)),
            ValueKind::Integer => raw.parse::<i64>().map(Value::from).map_err(|_| invalid()),
            ValueKind::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid),
            ValueKind::Text => Ok(Value::String(raw.to_string())),
        }
    }

    fn left_column(&self) -> String {
        let mut parts = Vec::new();
        if let Some(short) = self.short {
            parts.push(format!("-{short}"));
        }
        if let Some(long) = &self.long {
            parts.push(format!("--{long}"));
        }
        let mut left = parts.join(", ");
        if let Some(placeholder) = &self.placeholder {
            left.push('=');
            left.push_str(placeholder);
        }
        left
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("short", &self.short)
            .field("long", &self.long)
            .field("kind", &self.kind)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Default option layer: a table of [`Flag`]s
#[derive(Debug, Clone)]
pub struct FlagTable {
    banner: String,
    flags: Vec<Flag>,
    ignore_unknown: bool,
}

impl FlagTable {
    /// Create a table that leaves unknown flags in place
    pub fn new(banner: impl Into<String>) -> Self {
        Self {
            banner: banner.into(),
            flags: Vec::new(),
            ignore_unknown: true,
        }
    }

    /// Fail on unknown flags instead of leaving them in the residue
    pub fn strict(mut self) -> Self {
        self.ignore_unknown = false;
        self
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    fn find_long(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|f| f.long.as_deref() == Some(name))
    }

    fn find_short(&self, short: char) -> Option<&Flag> {
        self.flags.iter().find(|f| f.short == Some(short))
    }

    fn unknown(&self, token: String, residue: &mut Vec<String>) -> Result<(), OptionError> {
        if self.ignore_unknown {
            trace!("Leaving unknown flag in place: {}", token);
            residue.push(token);
            Ok(())
        } else {
            Err(OptionError::InvalidOption(token))
        }
    }

    fn apply(
        flag: &Flag,
        shown: &str,
        raw: Option<&str>,
        dest: &mut Option<&mut Values>,
        calls: &mut HandlerCalls,
    ) -> Result<(), OptionError> {
        let value = match raw {
            Some(raw) => flag.decode(shown, raw)?,
            None => Value::Bool(true),
        };
        trace!("Parsed flag {} = {}", shown, value);
        if let Some(dest) = dest.as_deref_mut() {
            dest.insert(flag.key(), value.clone());
        }
        if let Some(handler) = &flag.handler {
            calls.push(handler.clone(), value);
        }
        Ok(())
    }

    /// Handle `--name`, `--name=value` and `--name value`
    fn parse_long(
        &self,
        token: String,
        rest: &mut std::vec::IntoIter<String>,
        residue: &mut Vec<String>,
        dest: &mut Option<&mut Values>,
        calls: &mut HandlerCalls,
    ) -> Result<(), OptionError> {
        let body = &token[2..];
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };
        let Some(flag) = self.find_long(name) else {
            return self.unknown(token, residue);
        };
        let shown = format!("--{name}");

        if !flag.takes_value() {
            if inline.is_some() {
                return Err(OptionError::NeedlessArgument(token));
            }
            return Self::apply(flag, &shown, None, dest, calls);
        }

        let value = match inline {
            Some(value) => value,
            None => rest
                .next()
                .ok_or_else(|| OptionError::MissingArgument(shown.clone()))?,
        };
        Self::apply(flag, &shown, Some(&value), dest, calls)
    }

    /// Handle `-x`, `-xVALUE`, `-x=VALUE`, `-x VALUE` and bundled switches `-ab`
    fn parse_short(
        &self,
        token: String,
        rest: &mut std::vec::IntoIter<String>,
        residue: &mut Vec<String>,
        dest: &mut Option<&mut Values>,
        calls: &mut HandlerCalls,
    ) -> Result<(), OptionError> {
        let chars: Vec<char> = token[1..].chars().collect();
        let Some(flag) = self.find_short(chars[0]) else {
            return self.unknown(token, residue);
        };
        let shown = format!("-{}", chars[0]);

        if flag.takes_value() {
            let attached: String = chars[1..].iter().collect();
            let attached = attached.strip_prefix('=').unwrap_or(&attached).to_string();
            let value = if attached.is_empty() && chars.len() == 1 {
                rest.next()
                    .ok_or_else(|| OptionError::MissingArgument(shown.clone()))?
            } else {
                attached
            };
            return Self::apply(flag, &shown, Some(&value), dest, calls);
        }

        // Bundled switches are only taken when every letter is a known switch.
        let bundle: Option<Vec<&Flag>> = chars
            .iter()
            .map(|c| self.find_short(*c).filter(|f| !f.takes_value()))
            .collect();
        match bundle {
            Some(flags) => {
                for (flag, c) in flags.into_iter().zip(chars.iter()) {
                    Self::apply(flag, &format!("-{c}"), None, dest, calls)?;
                }
                Ok(())
            }
            None if chars.get(1) == Some(&'=') => Err(OptionError::NeedlessArgument(token)),
            None => self.unknown(token, residue),
        }
    }
}

impl OptionLayer for FlagTable {
    fn register(&mut self, flag: Flag) {
        self.flags.push(flag);
    }

    fn banner(&self) -> &str {
        &self.banner
    }

    fn set_banner(&mut self, banner: String) {
        self.banner = banner;
    }

    fn parse_in_place(
        &self,
        argv: &mut Vec<String>,
        mut dest: Option<&mut Values>,
    ) -> Result<HandlerCalls, OptionError> {
        let mut tokens = std::mem::take(argv).into_iter();
        let mut residue = Vec::new();
        let mut calls = HandlerCalls::default();

        while let Some(token) = tokens.next() {
            if token == "--" {
                residue.extend(tokens.by_ref());
                break;
            }
            if token.starts_with("--") {
                self.parse_long(token, &mut tokens, &mut residue, &mut dest, &mut calls)?;
            } else if token.starts_with('-') && token.len() > 1 {
                self.parse_short(token, &mut tokens, &mut residue, &mut dest, &mut calls)?;
            } else {
                residue.push(token);
            }
        }

        *argv = residue;
        Ok(calls)
    }

    fn summary(&self) -> String {
        let mut out = String::new();
        for flag in &self.flags {
            let left = flag.left_column();
            if flag.description.is_empty() {
                out.push_str(&format!("{SUMMARY_INDENT}{left}\n"));
            } else if left.len() <= SUMMARY_WIDTH {
                out.push_str(&format!(
                    "{SUMMARY_INDENT}{left:<width$} {}\n",
                    flag.description,
                    width = SUMMARY_WIDTH
                ));
            } else {
                out.push_str(&format!("{SUMMARY_INDENT}{left}\n"));
                out.push_str(&format!(
                    "{SUMMARY_INDENT}{:width$} {}\n",
                    "",
                    flag.description,
                    width = SUMMARY_WIDTH
                ));
            }
        }
        out
    }
}
