use std::{collections::HashSet, fs, path::Path, sync::Arc};

use serde::Deserialize;

use crate::{
    error::{CliGuiError, Result},
    spec::{ActionKind, ArgSpec, Coercion},
};

/// Argument specs plus program metadata, ready for a form.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Program name shown as the window title.
    pub program: Option<String>,
    /// One-line description.
    pub description: Option<String>,
    /// Specs in declaration order.
    pub specs: Vec<Arc<ArgSpec>>,
}

/// Raw JSON shape of a schema file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    /// Program name.
    #[serde(default)]
    pub program: Option<String>,
    /// One-line description.
    #[serde(default)]
    pub description: Option<String>,
    /// Arguments in declaration order.
    pub arguments: Vec<ArgumentEntry>,
}

/// Raw JSON shape of one argument.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ArgumentEntry {
    /// Destination name.
    pub dest: String,
    /// Option strings; empty for positionals.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Action kind.
    #[serde(default = "default_action")]
    pub action: ActionKind,
    /// Coercion type name.
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,
    /// Whether the argument is required.
    #[serde(default)]
    pub required: bool,
    /// Help caption.
    #[serde(default)]
    pub help: Option<String>,
    /// Default value; scalars are stored in string form.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

fn default_action() -> ActionKind {
    ActionKind::Store
}

/// Reads and validates a JSON schema file.
pub fn load_schema_file(path: &Path) -> Result<Schema> {
    let raw = fs::read_to_string(path)?;
    parse_schema(&raw).map_err(|error| match error {
        CliGuiError::Schema(message) => {
            CliGuiError::Schema(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Parses and validates JSON schema text.
pub fn parse_schema(raw: &str) -> Result<Schema> {
    let file: SchemaFile =
        serde_json::from_str(raw).map_err(|error| CliGuiError::Schema(error.to_string()))?;
    schema_from_file(file)
}

/// Validates a parsed schema file and builds specs.
pub fn schema_from_file(file: SchemaFile) -> Result<Schema> {
    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(file.arguments.len());
    for entry in file.arguments {
        if entry.dest.trim().is_empty() {
            return Err(CliGuiError::Schema(
                "argument `dest` must not be empty".to_owned(),
            ));
        }
        if !seen.insert(entry.dest.clone()) {
            return Err(CliGuiError::Schema(format!(
                "duplicate argument `{}`",
                entry.dest
            )));
        }
        if let Some(flag) = entry.flags.iter().find(|flag| !flag.starts_with('-')) {
            return Err(CliGuiError::Schema(format!(
                "flag `{flag}` of `{}` must start with `-`",
                entry.dest
            )));
        }
        specs.push(Arc::new(spec_from_entry(entry)?));
    }
    tracing::debug!(arguments = specs.len(), "schema parsed");
    Ok(Schema {
        program: file.program,
        description: file.description,
        specs,
    })
}

fn spec_from_entry(entry: ArgumentEntry) -> Result<ArgSpec> {
    let mut spec = ArgSpec::new(entry.dest.clone(), entry.action).required(entry.required);
    for flag in entry.flags {
        spec = spec.flag(flag);
    }
    if let Some(help) = entry.help {
        spec = spec.help(help);
    }
    if let Some(type_name) = entry.value_type.as_deref() {
        let coercion = Coercion::from_type_name(type_name).ok_or_else(|| {
            CliGuiError::Schema(format!(
                "unknown type `{type_name}` for `{}` (expected str, int, float, bool, or path)",
                entry.dest
            ))
        })?;
        spec = spec.coercion(coercion);
    }
    match entry.default {
        None | Some(serde_json::Value::Null) => {}
        Some(serde_json::Value::String(text)) => spec = spec.default_value(text),
        Some(
            scalar @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_)),
        ) => spec = spec.default_value(scalar.to_string()),
        Some(_) => {
            return Err(CliGuiError::Schema(format!(
                "default of `{}` must be a string, number, or boolean",
                entry.dest
            )))
        }
    }
    Ok(spec)
}

/// Converts the arguments of a clap command into specs.
///
/// Hidden arguments and subcommands are skipped. Store arguments coerce
/// through the argument's own value parser.
pub fn specs_from_command(command: &clap::Command) -> Result<Vec<Arc<ArgSpec>>> {
    let mut command = command.clone();
    command.build();
    let mut specs = Vec::new();
    for arg in command.get_arguments() {
        if arg.is_hide_set() {
            continue;
        }
        let dest = arg.get_id().as_str().to_owned();
        let action = ActionKind::from_clap(arg.get_action()).ok_or_else(|| {
            CliGuiError::Schema(format!("argument `{dest}` uses an unsupported clap action"))
        })?;

        let mut spec = ArgSpec::new(dest, action).required(arg.is_required_set());
        if let Some(long) = arg.get_long() {
            spec = spec.flag(format!("--{long}"));
        }
        if let Some(short) = arg.get_short() {
            spec = spec.flag(format!("-{short}"));
        }
        if let Some(help) = arg.get_help() {
            spec = spec.help(help.to_string());
        }
        if action == ActionKind::Store {
            spec = spec.coercion(Coercion::from_value_parser(arg.get_value_parser().clone()));
            if let Some(default) = arg.get_default_values().first() {
                spec = spec.default_value(default.to_string_lossy().into_owned());
            }
        }
        specs.push(Arc::new(spec));
    }
    tracing::debug!(
        command = command.get_name(),
        arguments = specs.len(),
        "clap command converted"
    );
    Ok(specs)
}

/// Builds a schema from a clap command, using its name and about text.
pub fn schema_from_command(command: &clap::Command) -> Result<Schema> {
    Ok(Schema {
        program: Some(command.get_name().to_owned()),
        description: command.get_about().map(|about| about.to_string()),
        specs: specs_from_command(command)?,
    })
}

#[cfg(test)]
mod unit_tests {
    use clap::{Arg, ArgAction, Command};

    use super::{parse_schema, specs_from_command};
    use crate::{
        error::CliGuiError,
        spec::ActionKind,
        types::Value,
    };

    fn greeter() -> Command {
        Command::new("greet")
            .about("Say hello")
            .arg(Arg::new("name").required(true).help("Who to greet"))
            .arg(
                Arg::new("times")
                    .long("times")
                    .short('t')
                    .value_parser(clap::value_parser!(u8))
                    .default_value("1"),
            )
            .arg(Arg::new("loud").long("loud").action(ArgAction::SetTrue))
            .arg(Arg::new("secret").long("secret").hide(true))
    }

    #[test]
    fn clap_arguments_become_specs_in_order() {
        let specs = specs_from_command(&greeter()).unwrap();
        let summary = specs
            .iter()
            .map(|spec| (spec.dest(), spec.action()))
            .collect::<Vec<_>>();
        assert!(summary.starts_with(&[
            ("name", ActionKind::Store),
            ("times", ActionKind::Store),
            ("loud", ActionKind::StoreTrue),
        ]));
        assert!(summary.contains(&("help", ActionKind::Help)));
        assert!(!summary.iter().any(|(dest, _)| *dest == "secret"));
    }

    #[test]
    fn clap_spec_carries_flags_default_and_parser() {
        let specs = specs_from_command(&greeter()).unwrap();
        let times = specs.iter().find(|spec| spec.dest() == "times").unwrap();
        assert_eq!(times.flags(), ["--times", "-t"]);
        assert_eq!(times.default(), Some("1"));
        let coercion = times.coercion_fn().unwrap();
        assert_eq!(coercion.apply("7"), Ok(Value::Int(7)));
        assert!(coercion.apply("300").is_err());

        let name = specs.iter().find(|spec| spec.dest() == "name").unwrap();
        assert!(name.is_positional());
        assert!(name.is_required());
        assert_eq!(name.help_text(), Some("Who to greet"));
    }

    #[test]
    fn clap_count_maps_to_count_kind() {
        let command = Command::new("tool").arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count),
        );
        let specs = specs_from_command(&command).unwrap();
        assert!(specs
            .iter()
            .any(|spec| spec.dest() == "verbose" && spec.action() == ActionKind::Count));
    }

    #[test]
    fn json_schema_parses_types_and_defaults() {
        let schema = parse_schema(
            r#"{
                "program": "resize",
                "arguments": [
                    {"dest": "input", "required": true, "type": "path"},
                    {"dest": "width", "flags": ["--width"], "type": "int", "default": 640},
                    {"dest": "keep_ratio", "flags": ["--keep-ratio"], "action": "store_true"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(schema.program.as_deref(), Some("resize"));
        assert_eq!(schema.specs.len(), 3);
        assert_eq!(schema.specs[1].default(), Some("640"));
        assert_eq!(schema.specs[1].coercion_fn().unwrap().name(), "int");
        assert_eq!(schema.specs[2].action(), ActionKind::StoreTrue);
        assert_eq!(schema.specs[0].action(), ActionKind::Store);
    }

    #[test]
    fn json_schema_rejects_unknown_action_and_type() {
        let unknown_action =
            parse_schema(r#"{"arguments": [{"dest": "x", "action": "toggle"}]}"#).unwrap_err();
        assert!(matches!(unknown_action, CliGuiError::Schema(_)));

        let unknown_type =
            parse_schema(r#"{"arguments": [{"dest": "x", "type": "uuid"}]}"#).unwrap_err();
        assert!(unknown_type.to_string().contains("unknown type `uuid`"));
    }

    #[test]
    fn json_schema_rejects_duplicates_and_bad_flags() {
        let duplicate =
            parse_schema(r#"{"arguments": [{"dest": "x"}, {"dest": "x"}]}"#).unwrap_err();
        assert!(duplicate.to_string().contains("duplicate argument `x`"));

        let bad_flag =
            parse_schema(r#"{"arguments": [{"dest": "x", "flags": ["x"]}]}"#).unwrap_err();
        assert!(bad_flag.to_string().contains("must start with `-`"));
    }

    #[test]
    fn json_schema_keeps_unsupported_kinds_for_the_factory() {
        let schema =
            parse_schema(r#"{"arguments": [{"dest": "v", "flags": ["-v"], "action": "count"}]}"#)
                .unwrap();
        assert_eq!(schema.specs[0].action(), ActionKind::Count);
    }
}
