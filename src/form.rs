use std::{io::Write, sync::Arc};

use chrono::Local;

use crate::{
    error::{CliGuiError, Result},
    factory::WidgetFactory,
    mirror::{OutputMirror, OutputRegion, SinkWriter, TextSink, DEFAULT_MAX_OUTPUT_LINES},
    spec::ArgSpec,
    types::Namespace,
    widget::Container,
};

/// Error type a run callback may return.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked on Run with the collected namespace and an output writer.
pub type RunCallback =
    Box<dyn FnMut(&Namespace, &mut dyn Write) -> std::result::Result<(), CallbackError>>;

const DEFAULT_TITLE: &str = "cligui";
const CONTENT_CONTAINER: &str = "content";

/// Lifecycle of a form window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    /// Widgets are active and Run/Cancel are available.
    Editing,
    /// The window closed.
    Terminated,
}

/// Push buttons appended below the fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormButton {
    /// Collect values and invoke the callback.
    Run,
    /// Close the window.
    Cancel,
}

impl FormButton {
    /// Button caption.
    pub fn caption(self) -> &'static str {
        match self {
            Self::Run => "Run",
            Self::Cancel => "Cancel",
        }
    }
}

/// Window size and offset in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Width in columns.
    pub width: u16,
    /// Height in rows.
    pub height: u16,
    /// Column offset.
    pub x: u16,
    /// Row offset.
    pub y: u16,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: 100,
            height: 32,
            x: 0,
            y: 0,
        }
    }
}

/// Form generated from an ordered list of argument specs.
pub struct CliForm {
    /// Window title.
    pub title: String,
    /// Window geometry, read by [`CliForm::show`].
    pub geometry: Geometry,
    content: Container,
    buttons: Vec<FormButton>,
    output: OutputRegion,
    callback: Option<RunCallback>,
    state: FormState,
    run_count: u64,
}

impl std::fmt::Debug for CliForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliForm")
            .field("title", &self.title)
            .field("geometry", &self.geometry)
            .field("fields", &self.content.len())
            .field("state", &self.state)
            .field("run_count", &self.run_count)
            .finish()
    }
}

impl CliForm {
    /// Builds a form with the default widget factory.
    pub fn build(specs: Vec<Arc<ArgSpec>>, callback: Option<RunCallback>) -> Result<Self> {
        Self::build_with(&WidgetFactory::new(), specs, callback, DEFAULT_MAX_OUTPUT_LINES)
    }

    /// Builds a form: one widget per spec in declaration order, then the
    /// Run/Cancel buttons and the output region.
    ///
    /// Fails on the first spec whose action has no widget.
    pub fn build_with(
        factory: &WidgetFactory,
        specs: Vec<Arc<ArgSpec>>,
        callback: Option<RunCallback>,
        max_output_lines: usize,
    ) -> Result<Self> {
        let mut content = Container::new(CONTENT_CONTAINER);
        for spec in specs {
            factory.create(spec, &mut content)?;
        }
        tracing::info!(fields = content.len(), "form built");
        Ok(Self {
            title: DEFAULT_TITLE.to_owned(),
            geometry: Geometry::default(),
            content,
            buttons: vec![FormButton::Run, FormButton::Cancel],
            output: OutputRegion::new(max_output_lines),
            callback,
            state: FormState::Editing,
            run_count: 0,
        })
    }

    /// Sets the window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Field widgets in declaration order.
    pub fn content(&self) -> &Container {
        &self.content
    }

    /// Mutable field widgets.
    pub fn content_mut(&mut self) -> &mut Container {
        &mut self.content
    }

    /// Buttons below the fields.
    pub fn buttons(&self) -> &[FormButton] {
        &self.buttons
    }

    /// Output display region.
    pub fn output(&self) -> &OutputRegion {
        &self.output
    }

    /// Mutable output display region.
    pub fn output_mut(&mut self) -> &mut OutputRegion {
        &mut self.output
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FormState {
        self.state
    }

    /// Whether the window closed.
    pub fn is_terminated(&self) -> bool {
        self.state == FormState::Terminated
    }

    /// Number of Run presses that reached the callback stage.
    pub fn run_count(&self) -> u64 {
        self.run_count
    }

    /// Reads every non-help widget into a fresh namespace.
    pub fn collect(&self) -> Result<Namespace> {
        let mut namespace = Namespace::new();
        for widget in self.content.widgets() {
            if widget.is_help() {
                continue;
            }
            namespace.set(widget.spec().dest(), widget.get_value()?);
        }
        Ok(namespace)
    }

    /// Handles the Run button.
    ///
    /// Collects the namespace, invokes the callback with it and a writer that
    /// mirrors into the output region, and returns the namespace. Conversion
    /// errors propagate before the callback runs; a callback failure is
    /// returned as [`CliGuiError::Callback`] and leaves the widgets untouched.
    pub fn on_run(&mut self) -> Result<Namespace> {
        let namespace = self.collect()?;
        let Some(callback) = self.callback.as_mut() else {
            tracing::debug!(entries = namespace.len(), "run without callback");
            return Ok(namespace);
        };

        self.run_count += 1;
        let run_id = self.run_count;
        tracing::info!(run_id, entries = namespace.len(), "run started");
        let mut mirror = OutputMirror::new(&mut self.output);
        let outcome = {
            let mut writer = SinkWriter::new(&mut mirror);
            let _ = writeln!(
                writer,
                "-- run #{run_id:03} at {} --",
                Local::now().format("%H:%M:%S")
            );
            let outcome = callback(&namespace, &mut writer);
            if let Err(error) = &outcome {
                let _ = writeln!(writer, "error: {error}");
            }
            let _ = writer.flush();
            outcome
        };
        match outcome {
            Ok(()) => {
                tracing::info!(run_id, "run finished");
                Ok(namespace)
            }
            Err(error) => {
                tracing::warn!(run_id, %error, "run failed");
                Err(CliGuiError::Callback(error.to_string()))
            }
        }
    }

    /// Handles the Cancel button.
    pub fn on_cancel(&mut self) {
        self.terminate();
    }

    /// Stops the window's event processing.
    pub fn terminate(&mut self) {
        if self.state != FormState::Terminated {
            tracing::info!("form terminated");
        }
        self.state = FormState::Terminated;
    }

    /// Writes a chunk into the output region through the mirror.
    pub fn mirror_text(&mut self, text: &str) {
        OutputMirror::new(&mut self.output).write(text);
    }

    /// Opens the form in the terminal and runs until Cancel.
    pub fn show(&mut self) -> Result<()> {
        crate::tui::run_form(self)
    }
}
