use std::{env::VarError, path::Path};

use serde::Serialize;

use crate::{
    config::{resolve_config_path, CliGuiConfig, CONFIG_ENV_VAR},
    error::{explain_error_code, known_error_codes, normalize_error_code, CliGuiError, Result},
    factory::WidgetFactory,
    form::{CliForm, RunCallback},
    logging,
    runner::ProcessRunner,
    schema::{load_schema_file, schema_from_command, Schema},
    widget::Widget,
};

use super::{
    demo,
    output::{self, OutputStatus},
    Cli, Command,
};

#[derive(Debug, Serialize)]
struct CheckOutput<'a> {
    program: Option<&'a str>,
    fields: Vec<FieldSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct FieldSummary<'a> {
    dest: &'a str,
    action: &'static str,
    flags: &'a [String],
    required: bool,
    coercion: Option<&'a str>,
    default: Option<&'a str>,
    help: Option<&'a str>,
}

pub(crate) fn run(cli: Cli) -> Result<i32> {
    let Cli {
        config: config_path,
        no_config,
        log_file,
        command,
    } = cli;
    let session = SessionOptions {
        config_path: config_path.as_deref(),
        no_config,
        log_file: log_file.as_deref(),
    };

    match command {
        Command::Explain { code } => return run_explain(&code),
        Command::Demo => {
            let config = start_session(&session)?;
            let schema = schema_from_command(&demo::command())?;
            open_form(&config, schema, demo::callback())?;
        }
        Command::Wrap {
            schema,
            program,
            args,
        } => {
            let config = start_session(&session)?;
            let mut schema = load_schema_file(&schema)?;
            if schema.program.is_none() {
                schema.program = Some(program.clone());
            }
            let runner = ProcessRunner::new(program, schema.specs.clone()).with_base_args(args);
            open_form(&config, schema, runner.into_callback())?;
        }
        Command::Check { schema, json } => {
            let config = start_session(&session)?;
            let schema = load_schema_file(&schema)?;
            let form = CliForm::build_with(
                &WidgetFactory::new(),
                schema.specs.clone(),
                None,
                config.max_output_lines,
            )?;
            if let Some(code) = print_check(&schema, &form, json)? {
                return Ok(code);
            }
        }
    }
    Ok(0)
}

/// Global flags that shape config loading and logging.
struct SessionOptions<'a> {
    config_path: Option<&'a Path>,
    no_config: bool,
    log_file: Option<&'a Path>,
}

/// Loads the effective config and installs the log subscriber.
fn start_session(session: &SessionOptions<'_>) -> Result<CliGuiConfig> {
    let config = load_effective_config(session.config_path, session.no_config)?;
    let log_file = session.log_file.or(config.log_file.as_deref());
    logging::init(log_file, config.log_filter.as_deref())?;
    if let Some(source) = config.source_path.as_deref() {
        tracing::info!(path = %source.display(), "config loaded");
    }
    Ok(config)
}

fn open_form(config: &CliGuiConfig, schema: Schema, callback: RunCallback) -> Result<()> {
    let title = schema
        .program
        .clone()
        .unwrap_or_else(|| config.window_title.clone());
    let mut form = CliForm::build_with(
        &WidgetFactory::new(),
        schema.specs,
        Some(callback),
        config.max_output_lines,
    )?
    .with_title(title);
    form.geometry = config.geometry;
    if let Some(description) = schema.description.as_deref() {
        form.mirror_text(&format!("{description}\n"));
    }
    form.show()?;
    tracing::info!(runs = form.run_count(), "form closed");
    Ok(())
}

fn print_check(schema: &Schema, form: &CliForm, json: bool) -> Result<Option<i32>> {
    let widgets = form.content().widgets();
    if json {
        let output = CheckOutput {
            program: schema.program.as_deref(),
            fields: widgets.iter().map(field_summary).collect(),
        };
        return stdout_line_or_exit(&serde_json::to_string_pretty(&output)?);
    }
    for widget in widgets {
        if let Some(code) = stdout_line_or_exit(&check_line(widget))? {
            return Ok(Some(code));
        }
    }
    stdout_line_or_exit(&format!("ok: {} field(s)", widgets.len()))
}

fn field_summary(widget: &Widget) -> FieldSummary<'_> {
    let spec = widget.spec();
    FieldSummary {
        dest: spec.dest(),
        action: spec.action().as_str(),
        flags: spec.flags(),
        required: spec.is_required(),
        coercion: spec.coercion_fn().map(|coercion| coercion.name()),
        default: spec.default(),
        help: spec.help_text(),
    }
}

fn check_line(widget: &Widget) -> String {
    let spec = widget.spec();
    let flags = if spec.is_positional() {
        "<positional>".to_owned()
    } else {
        spec.flags().join(", ")
    };
    let mut line = format!("{:<24} {:<12} {flags}", widget.label(), widget.kind().as_str());
    if let Some(default) = spec.default() {
        line.push_str(&format!(" (default: {default})"));
    }
    line
}

fn run_explain(code: &str) -> Result<i32> {
    let normalized = normalize_error_code(code);
    let Some(explanation) = explain_error_code(&normalized) else {
        return Err(CliGuiError::InvalidInput(format!(
            "unknown error code `{normalized}` (known: {})",
            known_error_codes().join(", ")
        )));
    };
    if let Some(code) = stdout_line_or_exit(&format!("{normalized}: {explanation}"))? {
        return Ok(code);
    }
    Ok(0)
}

fn load_effective_config(config_path: Option<&Path>, no_config: bool) -> Result<CliGuiConfig> {
    let current_dir = std::env::current_dir()?;
    let env_path = read_config_env_var()?;
    let selection =
        resolve_config_path(config_path, env_path.as_deref(), no_config, &current_dir)?;
    CliGuiConfig::load_selected(&selection)
}

fn read_config_env_var() -> Result<Option<String>> {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(CliGuiError::Config(format!(
            "{CONFIG_ENV_VAR} must be valid UTF-8"
        ))),
    }
}

fn stdout_line_or_exit(line: &str) -> Result<Option<i32>> {
    match output::stdout_line(line) {
        Ok(OutputStatus::Written) => Ok(None),
        Ok(OutputStatus::BrokenPipe) => Ok(Some(0)),
        Err(error) => Err(CliGuiError::Io(error)),
    }
}

#[cfg(test)]
mod unit_tests {
    use std::sync::Arc;

    use super::check_line;
    use crate::{
        form::CliForm,
        spec::{ActionKind, ArgSpec},
    };

    #[test]
    fn check_line_marks_required_positionals_and_defaults() {
        let form = CliForm::build(
            vec![
                Arc::new(ArgSpec::new("input", ActionKind::Store).required(true)),
                Arc::new(
                    ArgSpec::new("width", ActionKind::Store)
                        .flag("--width")
                        .default_value("640"),
                ),
            ],
            None,
        )
        .unwrap();
        let lines = form
            .content()
            .widgets()
            .iter()
            .map(check_line)
            .collect::<Vec<_>>();
        assert!(lines[0].starts_with("input*:"));
        assert!(lines[0].contains("<positional>"));
        assert!(lines[1].contains("--width (default: 640)"));
    }
}
