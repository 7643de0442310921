//! Variable store
//!
//! The mutable scope shared by every step of one invocation. Values are JSON;
//! keys are dotted paths (`a.b.c`) descending through nested objects.

use serde_json::{Map, Value as JsonValue};

use crate::chain::split::{is_quoted, unquote};
use crate::expression::values::number_to_json;

pub const ERROR_FLAG: &str = "_error";
pub const ERROR_MESSAGE: &str = "_error_message";
pub const CHAIN_CWD: &str = "_chain_cwd";
pub const INIT_CWD: &str = "_init_cwd";

/// Path-addressable variable scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    vars: Map<String, JsonValue>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set of bindings, stored as given
    pub fn from_vars(vars: Map<String, JsonValue>) -> Self {
        Self { vars }
    }

    /// Read a dotted path; a missing path yields `0`
    pub fn get(&self, path: &str) -> JsonValue {
        self.lookup(path).cloned().unwrap_or_else(|| JsonValue::from(0))
    }

    /// Read a dotted path, distinguishing absent values
    pub fn lookup(&self, path: &str) -> Option<&JsonValue> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut value = self.vars.get(first)?;
        for part in parts {
            value = match value {
                JsonValue::Object(map) => map.get(part)?,
                JsonValue::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(value)
    }

    /// True when the root key exists
    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Resolve a parameter token
    ///
    /// Quoted tokens (`"..."`, `'...'`) are literals: unquoted, then decoded
    /// as JSON when possible. Anything else is a variable path.
    pub fn get_literal(&self, token: &str) -> JsonValue {
        if is_quoted(token) {
            let inner = unquote(token);
            return serde_json::from_str(inner)
                .unwrap_or_else(|_| JsonValue::String(inner.to_string()));
        }
        self.get(token)
    }

    /// Write a dotted path, creating intermediate objects as needed
    ///
    /// Strings are trimmed and decoded as JSON when they parse, so `"42"`
    /// is stored as the number 42.
    pub fn set(&mut self, path: &str, value: JsonValue) {
        let value = coerce(value);
        let parts: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            return;
        };

        let mut scope = &mut self.vars;
        for part in parents {
            let entry = scope
                .entry(part.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if !entry.is_object() {
                *entry = JsonValue::Object(Map::new());
            }
            let JsonValue::Object(next) = entry else {
                return;
            };
            scope = next;
        }
        scope.insert(last.to_string(), value);
    }

    /// Store a top-level binding exactly as given
    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
        self.vars.insert(key.into(), value);
    }

    /// Global error flag, as written by the `error` shorthand
    pub fn error_raised(&self) -> bool {
        self.lookup(ERROR_FLAG).map(is_truthy).unwrap_or(false)
    }

    /// Message attached to the global error flag, if any
    pub fn error_message(&self) -> Option<String> {
        match self.lookup(ERROR_MESSAGE)? {
            JsonValue::Null => None,
            JsonValue::String(s) if s.is_empty() => None,
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) if n.as_f64() == Some(0.0) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn vars(&self) -> &Map<String, JsonValue> {
        &self.vars
    }

    pub fn into_vars(self) -> Map<String, JsonValue> {
        self.vars
    }
}

/// Trim string values and decode them as JSON when they parse
///
/// Decoded numbers with no fractional part are stored as integers, so
/// `"5.0"` and `"1e3"` become `5` and `1000`.
pub fn coerce(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::String(text) => {
            let trimmed = text.trim();
            match serde_json::from_str(trimmed) {
                Ok(decoded) => integral_numbers(decoded),
                Err(_) => JsonValue::String(trimmed.to_string()),
            }
        }
        other => other,
    }
}

fn integral_numbers(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) => number_to_json(f),
            None => JsonValue::Number(n),
        },
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(integral_numbers).collect()),
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(key, value)| (key, integral_numbers(value)))
                .collect(),
        ),
        other => other,
    }
}

/// JavaScript-style truthiness of a JSON value
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|n| n != 0.0 && !n.is_nan()).unwrap_or(false),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}
