//! Context data attached to log records
//!
//! A [`Context`] is an ordered map of extra values that do not fit in the
//! message. Plain values are JSON; error values are carried separately so
//! the logger can enforce that they only appear under [`EXCEPTION_KEY`].

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Reserved context key for an error value
pub const EXCEPTION_KEY: &str = "exception";

/// Error value stored in a [`Context`]
#[derive(Clone)]
pub struct ContextError {
    type_name: &'static str,
    error: Arc<dyn Error + Send + Sync>,
}

impl ContextError {
    /// Wrap an error, remembering its concrete type name
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<E>(),
            error: Arc::new(error),
        }
    }

    /// Concrete type name of the wrapped error
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The wrapped error
    #[must_use]
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }
}

impl fmt::Debug for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextError")
            .field("type", &self.type_name)
            .field("message", &self.error.to_string())
            .finish()
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// A single context entry
#[derive(Clone, Debug)]
pub enum ContextValue {
    /// Plain data
    Value(serde_json::Value),
    /// An error
    Error(ContextError),
}

impl ContextValue {
    /// Whether this entry holds an error
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Type name used in diagnostics
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Value(v) => value_type_name(v),
            Self::Error(e) => e.type_name(),
        }
    }

    /// Text form used by message interpolation
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Value(serde_json::Value::String(s)) => s.clone(),
            Self::Value(serde_json::Value::Null) => String::new(),
            Self::Value(v) => v.to_string(),
            Self::Error(e) => e.to_string(),
        }
    }
}

impl Serialize for ContextValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => v.serialize(serializer),
            Self::Error(e) => serializer.serialize_str(&e.to_string()),
        }
    }
}

/// Extra data passed alongside a message
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Context {
    entries: IndexMap<String, ContextValue>,
}

impl Context {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain value
    ///
    /// Values that fail to serialize are skipped.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.entries.insert(key.into(), ContextValue::Value(v));
        }
        self
    }

    /// Add an error value under an arbitrary key
    #[must_use]
    pub fn with_error<E>(mut self, key: impl Into<String>, error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.entries
            .insert(key.into(), ContextValue::Error(ContextError::new(error)));
        self
    }

    /// Add an error under [`EXCEPTION_KEY`]
    #[must_use]
    pub fn with_exception<E>(self, error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.with_error(EXCEPTION_KEY, error)
    }

    /// Insert an entry, returning the previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: ContextValue) -> Option<ContextValue> {
        self.entries.insert(key.into(), value)
    }

    /// Look an entry up
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    /// The error stored under [`EXCEPTION_KEY`], if any
    #[must_use]
    pub fn exception(&self) -> Option<&ContextError> {
        match self.entries.get(EXCEPTION_KEY) {
            Some(ContextValue::Error(e)) => Some(e),
            _ => None,
        }
    }

    /// Whether `key` is present
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keep only entries for which `keep` returns true, preserving order
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &ContextValue) -> bool) {
        self.entries.retain(|k, v| keep(k, v));
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, serde_json::Value)> for Context {
    fn from_iter<T: IntoIterator<Item = (K, serde_json::Value)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), ContextValue::Value(v)))
                .collect(),
        }
    }
}

/// Type name of a JSON value as reported in error messages and diagnostics
pub(crate) fn value_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_f64() => "float",
        serde_json::Value::Number(_) => "integer",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
