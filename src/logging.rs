//! Logging initialization: logs go to a file or are dropped, never to the terminal.
//!
//! The form owns the screen while it is open, so console output would corrupt it.

use std::{fs::OpenOptions, path::Path, sync::Mutex};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{CliGuiError, Result};

/// Environment variable naming a log file.
pub const LOG_FILE_ENV_VAR: &str = "CLIGUI_LOG_FILE";

const DEFAULT_FILTER: &str = "info";

/// Builds the event filter: `RUST_LOG` wins, then `fallback`, then `info`.
pub fn build_filter(fallback: Option<&str>) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = fallback.unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directive)
        .map_err(|error| CliGuiError::Config(format!("invalid log filter `{directive}`: {error}")))
}

/// Installs the global subscriber.
///
/// With `file`, plain-text events are appended to it; otherwise they are
/// discarded.
pub fn init(file: Option<&Path>, fallback_filter: Option<&str>) -> Result<()> {
    let filter = build_filter(fallback_filter)?;
    let installed = match file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(filter);
            tracing_subscriber::registry().with(file_layer).try_init()
        }
        None => {
            let sink_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::sink)
                .with_filter(filter);
            tracing_subscriber::registry().with(sink_layer).try_init()
        }
    };
    installed.map_err(|error| {
        CliGuiError::InvalidInput(format!("failed to install log subscriber: {error}"))
    })?;
    if let Some(path) = file {
        tracing::info!(path = %path.display(), "cligui logging to file");
    }
    Ok(())
}
