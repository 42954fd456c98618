use std::sync::Arc;

use crate::{
    error::{CliGuiError, Result},
    spec::{ActionKind, ArgSpec},
    types::Value,
};

/// Single-line text input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    text: String,
}

impl TextInput {
    /// Creates an input holding `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Current text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the whole text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

/// Binary check box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toggle {
    checked: bool,
}

impl Toggle {
    /// Whether the box is checked.
    pub fn is_checked(self) -> bool {
        self.checked
    }

    /// Flips the state.
    pub fn toggle(&mut self) {
        self.checked = !self.checked;
    }

    /// Sets the state.
    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }
}

/// Free-text field for [`ActionKind::Store`].
#[derive(Debug, Clone)]
pub struct StoreWidget {
    spec: Arc<ArgSpec>,
    input: TextInput,
}

impl StoreWidget {
    fn new(spec: Arc<ArgSpec>) -> Self {
        let input = TextInput::with_text(spec.default().unwrap_or_default());
        Self { spec, input }
    }

    /// Mutable text input control.
    pub fn input_mut(&mut self) -> &mut TextInput {
        &mut self.input
    }

    fn get_value(&self) -> Result<Option<Value>> {
        let text = self.input.text();
        let Some(coercion) = self.spec.coercion_fn() else {
            return Ok(Some(Value::Str(text.to_owned())));
        };
        if text.is_empty() && !self.spec.is_required() {
            return Ok(None);
        }
        coercion
            .apply(text)
            .map(Some)
            .map_err(|message| CliGuiError::Conversion {
                dest: self.spec.dest().to_owned(),
                message,
            })
    }
}

/// Check box for [`ActionKind::StoreTrue`].
#[derive(Debug, Clone)]
pub struct StoreTrueWidget {
    spec: Arc<ArgSpec>,
    toggle: Toggle,
}

impl StoreTrueWidget {
    fn new(spec: Arc<ArgSpec>) -> Self {
        Self {
            spec,
            toggle: Toggle::default(),
        }
    }

    /// Mutable toggle control.
    pub fn toggle_mut(&mut self) -> &mut Toggle {
        &mut self.toggle
    }
}

/// Label-only row for [`ActionKind::Help`].
#[derive(Debug, Clone)]
pub struct HelpWidget {
    spec: Arc<ArgSpec>,
}

/// A form row bound to one argument spec.
///
/// The variant always matches the bound spec's action kind; widgets are only
/// built through [`crate::factory::WidgetFactory`].
#[derive(Debug, Clone)]
pub enum Widget {
    /// Free-text field.
    Store(StoreWidget),
    /// Check box.
    StoreTrue(StoreTrueWidget),
    /// Informational row.
    Help(HelpWidget),
}

impl Widget {
    pub(crate) fn store(spec: Arc<ArgSpec>) -> Self {
        Self::Store(StoreWidget::new(spec))
    }

    pub(crate) fn store_true(spec: Arc<ArgSpec>) -> Self {
        Self::StoreTrue(StoreTrueWidget::new(spec))
    }

    pub(crate) fn help(spec: Arc<ArgSpec>) -> Self {
        Self::Help(HelpWidget { spec })
    }

    /// Variant tag.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Store(_) => ActionKind::Store,
            Self::StoreTrue(_) => ActionKind::StoreTrue,
            Self::Help(_) => ActionKind::Help,
        }
    }

    /// Bound argument spec.
    pub fn spec(&self) -> &Arc<ArgSpec> {
        match self {
            Self::Store(widget) => &widget.spec,
            Self::StoreTrue(widget) => &widget.spec,
            Self::Help(widget) => &widget.spec,
        }
    }

    /// Label text: destination name, `*:` when required, `:` otherwise.
    pub fn label(&self) -> String {
        let spec = self.spec();
        let suffix = if spec.is_required() { "*:" } else { ":" };
        format!("{}{suffix}", spec.dest())
    }

    /// Help caption.
    pub fn help_caption(&self) -> &str {
        self.spec().help_text().unwrap_or_default()
    }

    /// Whether the row is informational and never collected.
    pub fn is_help(&self) -> bool {
        matches!(self, Self::Help(_))
    }

    /// Reads the current value.
    ///
    /// Store fields apply the declared coercion, or return the raw text when
    /// none is declared. An empty optional field with a coercion reads as
    /// `None`. Help rows always read as `None`.
    pub fn get_value(&self) -> Result<Option<Value>> {
        match self {
            Self::Store(widget) => widget.get_value(),
            Self::StoreTrue(widget) => Ok(Some(Value::Bool(widget.toggle.is_checked()))),
            Self::Help(_) => Ok(None),
        }
    }

    /// Text shown for the control.
    pub fn display_value(&self) -> String {
        match self {
            Self::Store(widget) => {
                if widget.input.text().is_empty() {
                    "<empty>".to_owned()
                } else {
                    widget.input.text().to_owned()
                }
            }
            Self::StoreTrue(widget) => {
                if widget.toggle.is_checked() {
                    "[x]".to_owned()
                } else {
                    "[ ]".to_owned()
                }
            }
            Self::Help(_) => String::new(),
        }
    }

    /// Text input when this is a store field.
    pub fn text_input_mut(&mut self) -> Option<&mut TextInput> {
        match self {
            Self::Store(widget) => Some(widget.input_mut()),
            _ => None,
        }
    }

    /// Toggle when this is a store-true field.
    pub fn toggle_mut(&mut self) -> Option<&mut Toggle> {
        match self {
            Self::StoreTrue(widget) => Some(widget.toggle_mut()),
            _ => None,
        }
    }

    /// Restores the initial control state.
    pub fn reset(&mut self) {
        match self {
            Self::Store(widget) => {
                let default = widget.spec.default().unwrap_or_default().to_owned();
                widget.input.set_text(default);
            }
            Self::StoreTrue(widget) => widget.toggle.set_checked(false),
            Self::Help(_) => {}
        }
    }
}

/// Ordered content area that widgets attach to.
#[derive(Debug, Clone, Default)]
pub struct Container {
    name: String,
    widgets: Vec<Widget>,
}

impl Container {
    /// Creates an empty container.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            widgets: Vec::new(),
        }
    }

    /// Container name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches a widget at the end and returns it.
    pub fn attach(&mut self, widget: Widget) -> &mut Widget {
        let index = self.widgets.len();
        self.widgets.push(widget);
        &mut self.widgets[index]
    }

    /// Attached widgets in attachment order.
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Mutable widget at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Widget> {
        self.widgets.get_mut(index)
    }

    /// Position of the widget bound to `dest`.
    pub fn position(&self, dest: &str) -> Option<usize> {
        self.widgets
            .iter()
            .position(|widget| widget.spec().dest() == dest)
    }

    /// Number of attached widgets.
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Whether nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}
