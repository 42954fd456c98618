#![deny(missing_docs)]
//! cligui turns a command-line argument schema into an interactive terminal form.
//!
//! Each argument spec becomes one widget; Run collects the widgets into a
//! [`types::Namespace`] and hands it to a callback whose output is mirrored
//! into the form's read-only output region.

/// Command-line interface.
pub mod cli;
/// Config file selection, parsing and validation.
pub mod config;
/// Error types and stable error codes.
pub mod error;
/// Action-kind to widget factory.
pub mod factory;
/// Form controller.
pub mod form;
/// Log subscriber setup.
pub mod logging;
/// Output region and the mirror sink.
pub mod mirror;
/// External program runner.
pub mod runner;
/// Schema sources: clap commands and JSON files.
pub mod schema;
/// Argument specs, action kinds and coercions.
pub mod spec;
mod tui;
/// Collected values.
pub mod types;
/// Widget variants and their container.
pub mod widget;

pub use error::{CliGuiError, Result};
pub use factory::WidgetFactory;
pub use form::{CliForm, FormState, Geometry, RunCallback};
pub use spec::{ActionKind, ArgSpec, Coercion};
pub use types::{Namespace, Value};
