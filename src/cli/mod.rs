mod commands;
mod demo;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

const ERROR_CODE_ARG_HELP: &str = "Error code from CLI stderr (example: `E300`).";
const CLI_AFTER_HELP: &str = r#"Examples:
  cligui demo
  cligui wrap --schema resize.json -- convert
  cligui check --schema resize.json
  cligui check --schema resize.json --json
  cligui explain E200

Config:
  --config PATH, then CLIGUI_CONFIG, then the nearest .cligui.toml upward.
"#;
const WRAP_COMMAND_AFTER_HELP: &str = r#"Examples:
  cligui wrap --schema resize.json -- convert
  cligui wrap --schema tool.json -- python3 tool.py --quiet

Notes:
  - Options are passed before positionals, in schema order.
  - Program stdout and stderr stream into the output pane.
"#;
const CHECK_COMMAND_AFTER_HELP: &str = r#"Examples:
  cligui check --schema resize.json
  cligui check --schema resize.json --json

Tip:
  Actions other than store, store_true and help are rejected with E200.
"#;
const EXPLAIN_COMMAND_AFTER_HELP: &str = r#"Examples:
  cligui explain E200
  cligui explain e300

Tip:
  Error codes are shown in stderr output, for example `error[E200]: ...`.
"#;
const FORM_CONTROLS_AFTER_HELP: &str = r#"Controls:
  - Up/Down or j/k: move between fields
  - Enter, Space or e: edit a text field or toggle a flag
  - x: reset the selected field to its default
  - Ctrl+R or F5: Run
  - Tab / Shift+Tab: switch between fields and output
  - Home/End in output: jump to top or follow the tail
  - c: clear output
  - q, Esc or Ctrl+C: Cancel
"#;

/// Top-level command line parser.
#[derive(Debug, Parser)]
#[command(
    name = "cligui",
    version,
    about = "Generate an interactive terminal form from a command-line argument schema.",
    after_help = CLI_AFTER_HELP,
    infer_subcommands = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Config file override path.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Disable config loading and discovery.
    #[arg(long, global = true)]
    pub no_config: bool,
    /// Append logs to this file; logs are dropped when unset.
    #[arg(long, global = true, env = "CLIGUI_LOG_FILE")]
    pub log_file: Option<PathBuf>,
    /// Subcommand.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Opens a form for a built-in greeting command.
    #[command(after_help = FORM_CONTROLS_AFTER_HELP)]
    Demo,
    /// Opens a form for a schema file and runs a program with the collected values.
    #[command(after_help = WRAP_COMMAND_AFTER_HELP)]
    Wrap {
        /// JSON schema describing the program's arguments.
        #[arg(long)]
        schema: PathBuf,
        /// Program to run.
        program: String,
        /// Arguments always passed before the generated ones.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Builds the form without a terminal and prints its fields.
    #[command(after_help = CHECK_COMMAND_AFTER_HELP)]
    Check {
        /// JSON schema describing the program's arguments.
        #[arg(long)]
        schema: PathBuf,
        /// Print structured JSON output.
        #[arg(long)]
        json: bool,
    },
    /// Explains a stable error code.
    #[command(after_help = EXPLAIN_COMMAND_AFTER_HELP)]
    Explain {
        /// Error code from stderr (for example: `E200`).
        #[arg(help = ERROR_CODE_ARG_HELP)]
        code: String,
    },
}

/// Runs CLI and returns process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    commands::run(cli)
}

#[cfg(test)]
mod unit_tests {
    use clap::{error::ErrorKind, CommandFactory, Parser};

    use super::{Cli, Command};

    #[test]
    fn cli_help_includes_examples() {
        let mut command = Cli::command();
        let help = command.render_long_help().to_string();
        assert!(help.contains("Examples:"));
        assert!(help.contains("cligui check --schema resize.json"));
    }

    #[test]
    fn cli_version_flag_is_available() {
        let error = Cli::try_parse_from(["cligui", "--version"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn wrap_keeps_hyphenated_program_arguments() {
        let cli = Cli::try_parse_from([
            "cligui", "wrap", "--schema", "tool.json", "--", "python3", "tool.py", "--quiet",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Wrap { program, args, .. } if program == "python3" && args == ["tool.py", "--quiet"]
        ));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli =
            Cli::try_parse_from(["cligui", "check", "--schema", "s.json", "--no-config"]).unwrap();
        assert!(cli.no_config);
        assert!(matches!(cli.command, Command::Check { json: false, .. }));
    }

    #[test]
    fn explain_help_mentions_error_codes() {
        let error = Cli::try_parse_from(["cligui", "help", "explain"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DisplayHelp);
        assert!(error.to_string().contains("error[E200]"));
    }

    #[test]
    fn infer_subcommand_allows_prefix() {
        let cli = Cli::try_parse_from(["cligui", "exp", "E100"]).unwrap();
        assert!(matches!(cli.command, Command::Explain { code } if code == "E100"));
    }
}
