//! Runtime value types

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Number, Value as JsonValue};

use super::ast::Lambda;

/// Variable bindings visible to an expression
pub type Scope = HashMap<String, Val>;

/// Native functions reachable from expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    String,
    Number,
    Boolean,
    JsonStringify,
    JsonParse,
}

/// Arrow function plus the scope it closed over
#[derive(Debug)]
pub struct Closure {
    pub lambda: Arc<Lambda>,
    pub captured: Scope,
}

/// Runtime value type
#[derive(Debug, Clone)]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Val>),
    Obj(BTreeMap<String, Val>),
    Func(Arc<Closure>),
    Builtin(Builtin),
}

impl Val {
    /// JavaScript truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Null => false,
            Val::Bool(b) => *b,
            Val::Num(n) => *n != 0.0 && !n.is_nan(),
            Val::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Val::Func(_) | Val::Builtin(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "boolean",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::List(_) => "array",
            Val::Obj(_) => "object",
            Val::Func(_) | Val::Builtin(_) => "function",
        }
    }

    /// Numeric conversion with JavaScript rules (`NaN` when not a number)
    pub fn to_number(&self) -> f64 {
        match self {
            Val::Null => 0.0,
            Val::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Val::Num(n) => *n,
            Val::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Val::List(items) if items.is_empty() => 0.0,
            Val::List(items) if items.len() == 1 => items[0].to_number(),
            _ => f64::NAN,
        }
    }

    /// String conversion with JavaScript rules
    pub fn to_js_string(&self) -> String {
        match self {
            Val::Null => "null".to_string(),
            Val::Bool(b) => b.to_string(),
            Val::Num(n) => format_number(*n),
            Val::Str(s) => s.clone(),
            Val::List(items) => items
                .iter()
                .map(|item| match item {
                    Val::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Val::Obj(_) => "[object Object]".to_string(),
            Val::Func(_) | Val::Builtin(_) => "function".to_string(),
        }
    }
}

/// Render a number the way JavaScript prints it
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{:.0}", n);
    }
    n.to_string()
}

pub fn json_to_val(value: &JsonValue) -> Val {
    match value {
        JsonValue::Null => Val::Null,
        JsonValue::Bool(b) => Val::Bool(*b),
        JsonValue::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => Val::Str(s.clone()),
        JsonValue::Array(items) => Val::List(items.iter().map(json_to_val).collect()),
        JsonValue::Object(map) => Val::Obj(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_val(v)))
                .collect(),
        ),
    }
}

/// Integral numbers become JSON integers; functions and non-finite numbers become null
pub fn val_to_json(value: &Val) -> JsonValue {
    match value {
        Val::Null | Val::Func(_) | Val::Builtin(_) => JsonValue::Null,
        Val::Bool(b) => JsonValue::Bool(*b),
        Val::Num(n) => number_to_json(*n),
        Val::Str(s) => JsonValue::String(s.clone()),
        Val::List(items) => JsonValue::Array(items.iter().map(val_to_json).collect()),
        Val::Obj(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), val_to_json(v)))
                .collect(),
        ),
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Integral values within the safe range become JSON integers
pub(crate) fn number_to_json(n: f64) -> JsonValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return JsonValue::from(n as i64);
    }
    Number::from_f64(n)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}
