use std::{any::Any, fmt, path::PathBuf, sync::Arc};

use clap::{builder::ValueParser, Arg, ArgAction, ArgMatches, Command};
use serde::{Deserialize, Serialize};

use crate::types::Value;

const PROBE_COMMAND: &str = "cligui-probe";
const PROBE_ARG: &str = "value";

/// Behavior an argument requests from the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Store the given value.
    Store,
    /// Store `true` when the flag is present.
    StoreTrue,
    /// Store `false` when the flag is present.
    StoreFalse,
    /// Store a fixed constant when the flag is present.
    StoreConst,
    /// Append each given value to a list.
    Append,
    /// Append a fixed constant to a list.
    AppendConst,
    /// Count flag occurrences.
    Count,
    /// Print help and exit.
    Help,
}

impl ActionKind {
    /// Every action kind, in declaration order.
    pub const ALL: [ActionKind; 8] = [
        ActionKind::Store,
        ActionKind::StoreTrue,
        ActionKind::StoreFalse,
        ActionKind::StoreConst,
        ActionKind::Append,
        ActionKind::AppendConst,
        ActionKind::Count,
        ActionKind::Help,
    ];

    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::StoreTrue => "store_true",
            Self::StoreFalse => "store_false",
            Self::StoreConst => "store_const",
            Self::Append => "append",
            Self::AppendConst => "append_const",
            Self::Count => "count",
            Self::Help => "help",
        }
    }

    /// Maps a clap action onto the closest action kind.
    ///
    /// Version flags are informational like help, so they map to [`ActionKind::Help`].
    pub fn from_clap(action: &ArgAction) -> Option<Self> {
        match action {
            ArgAction::Set => Some(Self::Store),
            ArgAction::Append => Some(Self::Append),
            ArgAction::SetTrue => Some(Self::StoreTrue),
            ArgAction::SetFalse => Some(Self::StoreFalse),
            ArgAction::Count => Some(Self::Count),
            ArgAction::Help | ArgAction::HelpShort | ArgAction::HelpLong | ArgAction::Version => {
                Some(Self::Help)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type CoercionFn = dyn Fn(&str) -> std::result::Result<Value, String> + Send + Sync;

/// Named conversion from entered text to a typed [`Value`].
#[derive(Clone)]
pub struct Coercion {
    name: String,
    function: Arc<CoercionFn>,
}

impl Coercion {
    /// Wraps an arbitrary conversion function.
    pub fn custom<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            function: Arc::new(function),
        }
    }

    /// Keeps the text as a string.
    pub fn string() -> Self {
        Self::custom("str", |text| Ok(Value::Str(text.to_owned())))
    }

    /// Parses a signed integer.
    pub fn integer() -> Self {
        Self::custom("int", |text| {
            text.trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("expected an integer, got `{text}`"))
        })
    }

    /// Parses a floating-point number.
    pub fn float() -> Self {
        Self::custom("float", |text| {
            text.trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("expected a number, got `{text}`"))
        })
    }

    /// Parses `true/false`, `yes/no`, `on/off`, or `1/0`.
    pub fn boolean() -> Self {
        Self::custom("bool", |text| {
            match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("expected true or false, got `{text}`")),
            }
        })
    }

    /// Treats the text as a filesystem path.
    pub fn path() -> Self {
        Self::custom("path", |text| Ok(Value::Path(PathBuf::from(text))))
    }

    /// Coerces through a clap value parser so validation matches the CLI exactly.
    pub fn from_value_parser(parser: ValueParser) -> Self {
        Self::custom("clap", move |text| coerce_with_parser(&parser, text))
    }

    /// Parses a schema type name such as `int` or `path`.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "str" | "string" => Some(Self::string()),
            "int" | "integer" => Some(Self::integer()),
            "float" | "number" => Some(Self::float()),
            "bool" | "boolean" => Some(Self::boolean()),
            "path" => Some(Self::path()),
            _ => None,
        }
    }

    /// Display name of the coercion.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the coercion.
    pub fn apply(&self, text: &str) -> std::result::Result<Value, String> {
        (self.function)(text)
    }
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercion").field("name", &self.name).finish()
    }
}

fn coerce_with_parser(parser: &ValueParser, text: &str) -> std::result::Result<Value, String> {
    let probe = Command::new(PROBE_COMMAND).no_binary_name(true).arg(
        Arg::new(PROBE_ARG)
            .long(PROBE_ARG)
            .num_args(1)
            .allow_hyphen_values(true)
            .action(ArgAction::Set)
            .value_parser(parser.clone()),
    );
    let matches = probe
        .try_get_matches_from([format!("--{PROBE_ARG}={text}")])
        .map_err(|error| clap_error_message(&error))?;
    Ok(typed_probe_value(&matches, text))
}

fn clap_error_message(error: &clap::Error) -> String {
    let rendered = error.to_string();
    let first_line = rendered.lines().next().unwrap_or_default();
    first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_owned()
}

fn probe_one<T: Any + Clone + Send + Sync + 'static>(matches: &ArgMatches) -> Option<T> {
    matches.try_get_one::<T>(PROBE_ARG).ok().flatten().cloned()
}

fn typed_probe_value(matches: &ArgMatches, text: &str) -> Value {
    if let Some(value) = probe_one::<String>(matches) {
        return Value::Str(value);
    }
    if let Some(value) = probe_one::<i64>(matches) {
        return Value::Int(value);
    }
    if let Some(value) = probe_one::<i32>(matches) {
        return Value::Int(i64::from(value));
    }
    if let Some(value) = probe_one::<u32>(matches) {
        return Value::Int(i64::from(value));
    }
    if let Some(value) = probe_one::<u16>(matches) {
        return Value::Int(i64::from(value));
    }
    if let Some(value) = probe_one::<u8>(matches) {
        return Value::Int(i64::from(value));
    }
    if let Some(value) = probe_one::<u64>(matches) {
        return i64::try_from(value)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Str(value.to_string()));
    }
    if let Some(value) = probe_one::<usize>(matches) {
        return i64::try_from(value)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Str(value.to_string()));
    }
    if let Some(value) = probe_one::<f64>(matches) {
        return Value::Float(value);
    }
    if let Some(value) = probe_one::<f32>(matches) {
        return Value::Float(f64::from(value));
    }
    if let Some(value) = probe_one::<bool>(matches) {
        return Value::Bool(value);
    }
    if let Some(value) = probe_one::<PathBuf>(matches) {
        return Value::Path(value);
    }
    // Opaque parser output (value enums, custom types): the text already validated.
    Value::Str(text.to_owned())
}

/// Declarative description of one command-line argument.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    dest: String,
    flags: Vec<String>,
    required: bool,
    help: Option<String>,
    coercion: Option<Coercion>,
    default: Option<String>,
    action: ActionKind,
}

impl ArgSpec {
    /// Creates a spec with no flags (positional), no help, and no default.
    pub fn new(dest: impl Into<String>, action: ActionKind) -> Self {
        Self {
            dest: dest.into(),
            flags: Vec::new(),
            required: false,
            help: None,
            coercion: None,
            default: None,
            action,
        }
    }

    /// Adds an option string such as `--name` or `-n`.
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Marks the argument as required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the help caption.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Declares a coercion for entered text.
    pub fn coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = Some(coercion);
        self
    }

    /// Sets the default value in string form.
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Destination name in the result namespace.
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Option strings; empty for positionals.
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Whether the argument takes no option string.
    pub fn is_positional(&self) -> bool {
        self.flags.is_empty()
    }

    /// Whether the argument is required.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Help caption.
    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Declared coercion.
    pub fn coercion_fn(&self) -> Option<&Coercion> {
        self.coercion.as_ref()
    }

    /// Default value in string form.
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Declared action kind.
    pub fn action(&self) -> ActionKind {
        self.action
    }
}
