use std::io;

use thiserror::Error;

use crate::spec::ActionKind;

/// Top-level application errors.
#[derive(Debug, Error)]
pub enum CliGuiError {
    /// No widget variant is registered for the argument's action kind.
    #[error("unsupported action `{action}` for argument `{dest}`")]
    UnsupportedAction {
        /// Destination name of the rejected argument.
        dest: String,
        /// Action kind that has no widget.
        action: ActionKind,
    },
    /// A declared coercion rejected the entered text.
    #[error("invalid value for `{dest}`: {message}")]
    Conversion {
        /// Destination name of the failing field.
        dest: String,
        /// Coercion failure message.
        message: String,
    },
    /// The run callback reported a failure.
    #[error("run failed: {0}")]
    Callback(String),
    /// Schema file or command could not be turned into argument specs.
    #[error("invalid schema: {0}")]
    Schema(String),
    /// Config file was readable but semantically invalid.
    #[error("invalid config: {0}")]
    Config(String),
    /// Input was syntactically valid but semantically unsupported.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// JSON serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Config file is not valid TOML for the expected layout.
    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A typed result used across the crate.
pub type Result<T> = std::result::Result<T, CliGuiError>;

/// Generic invalid-input error.
pub const ERROR_CODE_INVALID_INPUT: &str = "E100";
/// Interactive terminal is required but missing.
pub const ERROR_CODE_NO_TERMINAL: &str = "E101";
/// Argument action kind has no widget.
pub const ERROR_CODE_UNSUPPORTED_ACTION: &str = "E200";
/// Schema could not be loaded.
pub const ERROR_CODE_SCHEMA: &str = "E201";
/// Field value failed coercion.
pub const ERROR_CODE_CONVERSION: &str = "E300";
/// Run callback failed.
pub const ERROR_CODE_CALLBACK: &str = "E400";
/// Config file is invalid.
pub const ERROR_CODE_CONFIG: &str = "E500";
/// Filesystem or stream I/O failed.
pub const ERROR_CODE_IO: &str = "E900";
/// Internal serialization failure.
pub const ERROR_CODE_INTERNAL: &str = "E999";

const ERROR_EXPLANATION_E100: &str = r#"E100 invalid input

The command arguments are syntactically valid but semantically unsupported.

Common fixes:
  - Run `cligui help <command>` for exact argument usage."#;
const ERROR_EXPLANATION_E101: &str = r#"E101 interactive terminal required

`cligui demo` and `cligui wrap` draw a form and need stdin/stdout attached to a terminal.

Recovery:
  - Run the command from an interactive shell.
  - Use `cligui check --schema <file>` to validate a schema without a terminal."#;
const ERROR_EXPLANATION_E200: &str = r#"E200 unsupported argument action

The schema declares an argument whose action has no form widget.
Supported actions: store, store_true, help.

Recovery:
  - Change the argument to `store` (free text) or `store_true` (toggle).
  - Run `cligui check --schema <file>` to find the offending argument."#;
const ERROR_EXPLANATION_E201: &str = r#"E201 invalid schema

The schema file could not be parsed or contains an unknown action or type.

Recovery:
  - Check `action` is one of: store, store_true, store_false, store_const,
    append, append_const, count, help.
  - Check `type` is one of: str, int, float, bool, path."#;
const ERROR_EXPLANATION_E300: &str = r#"E300 invalid field value

A field's text could not be converted to the declared type.

Recovery:
  - Correct the highlighted field and press Run again."#;
const ERROR_EXPLANATION_E400: &str = r#"E400 run failed

The run callback or wrapped program reported an error.
The form stays open; adjust the fields and run again."#;
const ERROR_EXPLANATION_E500: &str = r#"E500 invalid config

The config file parsed but failed validation.

Recovery:
  - `version` must be 1.
  - `window.width`, `window.height`, and `output.max_lines` must be positive.
  - Use `--no-config` to bypass the file."#;
const ERROR_EXPLANATION_E900: &str = r#"E900 I/O failure

Filesystem, terminal, or process I/O failed.

Recovery:
  - Verify file paths and permissions.
  - Verify the wrapped program exists in PATH."#;
const ERROR_EXPLANATION_E999: &str = r#"E999 internal runtime failure

An internal serialization or decoding error occurred.

Recovery:
  - Retry once with the same inputs.
  - If it persists, collect command, inputs, and stderr for diagnosis."#;

const KNOWN_ERROR_CODES: [&str; 9] = [
    ERROR_CODE_INVALID_INPUT,
    ERROR_CODE_NO_TERMINAL,
    ERROR_CODE_UNSUPPORTED_ACTION,
    ERROR_CODE_SCHEMA,
    ERROR_CODE_CONVERSION,
    ERROR_CODE_CALLBACK,
    ERROR_CODE_CONFIG,
    ERROR_CODE_IO,
    ERROR_CODE_INTERNAL,
];

/// Returns the stable error code for a runtime error.
pub fn classify_error_code(error: &CliGuiError) -> &'static str {
    match error {
        CliGuiError::UnsupportedAction { .. } => ERROR_CODE_UNSUPPORTED_ACTION,
        CliGuiError::Conversion { .. } => ERROR_CODE_CONVERSION,
        CliGuiError::Callback(_) => ERROR_CODE_CALLBACK,
        CliGuiError::Schema(_) => ERROR_CODE_SCHEMA,
        CliGuiError::Config(_) | CliGuiError::Toml(_) => ERROR_CODE_CONFIG,
        CliGuiError::InvalidInput(message) => classify_invalid_input_code(message),
        CliGuiError::Io(_) => ERROR_CODE_IO,
        CliGuiError::Json(_) => ERROR_CODE_INTERNAL,
    }
}

fn classify_invalid_input_code(message: &str) -> &'static str {
    if message.to_ascii_lowercase().contains("interactive terminal") {
        return ERROR_CODE_NO_TERMINAL;
    }
    ERROR_CODE_INVALID_INPUT
}

/// Normalizes a user-provided error code for lookups.
pub fn normalize_error_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Returns an explanation block for a known error code.
pub fn explain_error_code(raw: &str) -> Option<&'static str> {
    let normalized = normalize_error_code(raw);
    match normalized.as_str() {
        ERROR_CODE_INVALID_INPUT => Some(ERROR_EXPLANATION_E100),
        ERROR_CODE_NO_TERMINAL => Some(ERROR_EXPLANATION_E101),
        ERROR_CODE_UNSUPPORTED_ACTION => Some(ERROR_EXPLANATION_E200),
        ERROR_CODE_SCHEMA => Some(ERROR_EXPLANATION_E201),
        ERROR_CODE_CONVERSION => Some(ERROR_EXPLANATION_E300),
        ERROR_CODE_CALLBACK => Some(ERROR_EXPLANATION_E400),
        ERROR_CODE_CONFIG => Some(ERROR_EXPLANATION_E500),
        ERROR_CODE_IO => Some(ERROR_EXPLANATION_E900),
        ERROR_CODE_INTERNAL => Some(ERROR_EXPLANATION_E999),
        _ => None,
    }
}

/// Stable list of explainable error codes.
pub fn known_error_codes() -> &'static [&'static str] {
    &KNOWN_ERROR_CODES
}
