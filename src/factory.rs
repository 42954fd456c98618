use std::{collections::HashMap, sync::Arc};

use crate::{
    error::{CliGuiError, Result},
    spec::{ActionKind, ArgSpec},
    widget::{Container, Widget},
};

type Constructor = fn(Arc<ArgSpec>) -> Widget;

// Store-false, store-const, append, append-const and count have no widget:
// building them would silently drop the argument from the namespace.
const CONSTRUCTORS: [(ActionKind, Constructor); 3] = [
    (ActionKind::Store, Widget::store),
    (ActionKind::StoreTrue, Widget::store_true),
    (ActionKind::Help, Widget::help),
];

/// Builds form widgets from argument specs through a fixed kind table.
#[derive(Debug, Clone)]
pub struct WidgetFactory {
    constructors: HashMap<ActionKind, Constructor>,
}

impl Default for WidgetFactory {
    fn default() -> Self {
        Self {
            constructors: CONSTRUCTORS.into_iter().collect(),
        }
    }
}

impl WidgetFactory {
    /// Creates a factory with the built-in table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `kind` has a widget.
    pub fn supports(&self, kind: ActionKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Supported kinds in declaration order.
    pub fn supported_kinds(&self) -> Vec<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .collect()
    }

    /// Builds the widget for `spec` and attaches it to `parent`.
    ///
    /// Fails with [`CliGuiError::UnsupportedAction`] and leaves `parent`
    /// untouched when the kind is not registered.
    pub fn create<'a>(
        &self,
        spec: Arc<ArgSpec>,
        parent: &'a mut Container,
    ) -> Result<&'a mut Widget> {
        let Some(constructor) = self.constructors.get(&spec.action()) else {
            tracing::warn!(dest = spec.dest(), action = %spec.action(), "no widget for action");
            return Err(CliGuiError::UnsupportedAction {
                dest: spec.dest().to_owned(),
                action: spec.action(),
            });
        };
        tracing::debug!(
            dest = spec.dest(),
            action = %spec.action(),
            container = parent.name(),
            "attaching widget"
        );
        Ok(parent.attach(constructor(spec)))
    }
}
