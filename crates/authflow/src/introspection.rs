//! State introspection for logging and diagnostics.
//!
//! Every machine state renders a stable, human-readable key-value
//! description: a status label plus the fields relevant to that phase. The
//! engine logs these labels on every transition, and hosts can surface them
//! on debug screens. The rendering is observability only and must never be
//! parsed programmatically.

use std::collections::HashMap;

/// Key-value description of a machine state.
#[derive(Debug, Clone)]
pub struct StateInfo {
    /// The current status/phase label (e.g., "initiating", "signedIn").
    pub status: String,

    /// Key-value pairs of state fields for display.
    pub fields: HashMap<String, FieldValue>,

    /// Whether this is a terminal state.
    pub is_terminal: bool,
}

impl StateInfo {
    /// Create a new state info with the given status label.
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            fields: HashMap::new(),
            is_terminal: false,
        }
    }

    /// Add a field to display.
    pub fn with_field(mut self, name: impl Into<String>, value: &impl std::fmt::Display) -> Self {
        self.fields
            .insert(name.into(), FieldValue::String(value.to_string()));
        self
    }

    /// Add a numeric field.
    pub fn with_numeric_field(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), FieldValue::Number(value));
        self
    }

    /// Add a boolean field.
    pub fn with_bool_field(mut self, name: impl Into<String>, value: bool) -> Self {
        self.fields.insert(name.into(), FieldValue::Bool(value));
        self
    }

    /// Mark this state as terminal.
    pub fn terminal(mut self, is_terminal: bool) -> Self {
        self.is_terminal = is_terminal;
        self
    }
}

/// A field value for display.
#[derive(Debug, Clone)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
        }
    }
}
