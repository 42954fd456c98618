use std::{fmt, path::PathBuf};

use serde::{ser::SerializeMap, Serialize, Serializer};

/// Typed value collected from one form field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Free text.
    Str(String),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Boolean toggle or parsed boolean.
    Bool(bool),
    /// Filesystem path.
    Path(PathBuf),
    /// Several values for one destination.
    List(Vec<Value>),
}

impl Value {
    /// Returns the string payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the integer payload.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the float payload, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the path payload.
    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Path(value) => Some(value),
            _ => None,
        }
    }

    /// Renders the value as command-line argument strings.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            Self::List(values) => values.iter().flat_map(Value::to_args).collect(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Path(value) => write!(f, "{}", value.display()),
            Self::List(values) => {
                let joined = values
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                f.write_str(&joined)
            }
        }
    }
}

/// Values collected on one Run, keyed by destination name in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    entries: Vec<(String, Option<Value>)>,
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `dest`, replacing an earlier assignment.
    pub fn set(&mut self, dest: impl Into<String>, value: Option<Value>) {
        let dest = dest.into();
        match self.entries.iter_mut().find(|(name, _)| *name == dest) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((dest, value)),
        }
    }

    /// Whether `dest` was assigned, even if its value is none.
    pub fn contains(&self, dest: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == dest)
    }

    /// Value assigned to `dest`; `None` when missing or assigned none.
    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == dest)
            .and_then(|(_, value)| value.as_ref())
    }

    /// String value of `dest`.
    pub fn get_str(&self, dest: &str) -> Option<&str> {
        self.get(dest).and_then(Value::as_str)
    }

    /// Integer value of `dest`.
    pub fn get_int(&self, dest: &str) -> Option<i64> {
        self.get(dest).and_then(Value::as_int)
    }

    /// Float value of `dest`.
    pub fn get_float(&self, dest: &str) -> Option<f64> {
        self.get(dest).and_then(Value::as_float)
    }

    /// Boolean value of `dest`.
    pub fn get_bool(&self, dest: &str) -> Option<bool> {
        self.get(dest).and_then(Value::as_bool)
    }

    /// Path value of `dest`.
    pub fn get_path(&self, dest: &str) -> Option<&PathBuf> {
        self.get(dest).and_then(Value::as_path)
    }

    /// Number of assigned destinations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was assigned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }
}

impl Serialize for Namespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod unit_tests {
    use std::path::PathBuf;

    use super::{Namespace, Value};

    #[test]
    fn set_replaces_existing_destination() {
        let mut namespace = Namespace::new();
        namespace.set("name", Some(Value::Str("a".to_owned())));
        namespace.set("name", Some(Value::Str("b".to_owned())));
        assert_eq!(namespace.len(), 1);
        assert_eq!(namespace.get_str("name"), Some("b"));
    }

    #[test]
    fn none_value_counts_as_assigned() {
        let mut namespace = Namespace::new();
        namespace.set("port", None);
        assert!(namespace.contains("port"));
        assert!(namespace.get("port").is_none());
        assert!(!namespace.contains("host"));
    }

    #[test]
    fn typed_getters_check_the_variant() {
        let mut namespace = Namespace::new();
        namespace.set("count", Some(Value::Int(3)));
        namespace.set("dir", Some(Value::Path(PathBuf::from("/tmp"))));
        assert_eq!(namespace.get_int("count"), Some(3));
        assert_eq!(namespace.get_float("count"), Some(3.0));
        assert_eq!(namespace.get_bool("count"), None);
        assert_eq!(namespace.get_path("dir"), Some(&PathBuf::from("/tmp")));
    }

    #[test]
    fn serializes_as_json_object_in_order() {
        let mut namespace = Namespace::new();
        namespace.set("name", Some(Value::Str("ada".to_owned())));
        namespace.set("loud", Some(Value::Bool(true)));
        namespace.set("port", None);
        let json = serde_json::to_string(&namespace).unwrap();
        assert_eq!(json, r#"{"name":"ada","loud":true,"port":null}"#);
    }

    #[test]
    fn list_values_expand_to_several_args() {
        let value = Value::List(vec![Value::Int(1), Value::Str("two".to_owned())]);
        assert_eq!(value.to_args(), ["1", "two"]);
        assert_eq!(value.to_string(), "1,two");
    }
}
