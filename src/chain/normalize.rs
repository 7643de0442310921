//! Chain normalizer
//!
//! Rewrites every shorthand accepted in a chain definition into the canonical
//! tree of [`ChainNode`]s. Normalization runs in two passes:
//!
//! 1. A raw pass over the JSON object of each node (key synonyms, arrow
//!    notation, `ins` strings, `series`/`parallel` keys, `error` blocks,
//!    defaults), recursing into `chains`.
//! 2. A typed pass that builds [`ChainNode`] values from the raw objects.
//!
//! The root object is additionally wrapped so the user's pipeline becomes the
//! single child of an implicit node carrying `vars` and `verbose`.

use serde_json::{Map, Value as JsonValue};

use super::split::{smart_split, unquote};
use super::types::{Body, Chain, ChainNode, Mode, DEFAULT_OUT};
use crate::errors::ChainError;

/// Command substituted when arrow notation leaves the command empty:
/// returns the sole input, or all inputs as an array
pub const DEFAULT_COLLECT_COMMAND: &str = "(...args) => args.length == 1 ? args[0] : args";

const KEY_SYNONYMS: &[(&str, &str)] = &[
    ("process", "command"),
    ("input", "ins"),
    ("inputs", "ins"),
    ("output", "out"),
    ("outs", "out"),
    ("outputs", "out"),
];

type RawNode = Map<String, JsonValue>;

/* ===================== Public API ===================== */

/// Normalize a complete definition, including root wrapping
pub fn normalize(raw: JsonValue) -> Result<Chain, ChainError> {
    let mut root = preprocess_chain(raw)?;
    let vars = match root.remove("vars") {
        None | Some(JsonValue::Null) => Map::new(),
        Some(JsonValue::Object(vars)) => vars,
        Some(other) => {
            return Err(ChainError::Normalize(format!(
                "'vars' must be an object, got {}",
                type_name(&other)
            )))
        }
    };
    let verbose = root.remove("verbose").map(|v| is_enabled(&v)).unwrap_or(false);

    wrap_root(&mut root);

    Ok(Chain {
        vars,
        verbose,
        root: build_node(root)?,
    })
}

/// Normalize a single node (and its children) without root wrapping
pub fn normalize_node(raw: JsonValue) -> Result<ChainNode, ChainError> {
    build_node(preprocess_chain(raw)?)
}

/* ===================== Raw Pass ===================== */

fn preprocess_chain(raw: JsonValue) -> Result<RawNode, ChainError> {
    let mut node = match raw {
        JsonValue::Null => command_node(String::new()),
        JsonValue::String(command) => command_node(command),
        JsonValue::Object(map) => map,
        other => {
            return Err(ChainError::Normalize(format!(
                "expected a string or an object, got {}",
                type_name(&other)
            )))
        }
    };

    replace_synonyms(&mut node);
    preprocess_command(&mut node);
    preprocess_ins(&mut node);
    preprocess_mode(&mut node);
    preprocess_error(&mut node);
    assign_defaults(&mut node);

    if let Some(chains) = node.remove("chains") {
        let children = into_list(chains)
            .into_iter()
            .map(|child| preprocess_chain(child).map(JsonValue::Object))
            .collect::<Result<Vec<_>, _>>()?;
        node.insert("chains".to_string(), JsonValue::Array(children));
    }

    Ok(node)
}

fn command_node(command: String) -> RawNode {
    let mut node = Map::new();
    node.insert("command".to_string(), JsonValue::String(command));
    node
}

fn replace_synonyms(node: &mut RawNode) {
    for (synonym, canonical) in KEY_SYNONYMS {
        if let Some(value) = node.remove(*synonym) {
            node.insert(canonical.to_string(), value);
        }
    }
}

/// `ins --> out` and `(ins) -> command -> out` shorthands
fn preprocess_command(node: &mut RawNode) {
    let Some(raw_command) = node.get("command") else {
        return;
    };
    let command = as_text(raw_command);

    let long_parts = smart_split(&command, "-->");
    if long_parts.len() == 2 {
        node.insert("ins".to_string(), JsonValue::String(long_parts[0].clone()));
        node.insert("out".to_string(), JsonValue::String(long_parts[1].trim().to_string()));
        node.insert("command".to_string(), JsonValue::String(String::new()));
    } else {
        let parts: Vec<String> = smart_split(&command, "->")
            .iter()
            .map(|part| unquote(part.trim()).to_string())
            .collect();

        match parts.as_slice() {
            [ins, command, out] => {
                node.insert("ins".to_string(), JsonValue::String(ins.clone()));
                node.insert("command".to_string(), JsonValue::String(command.clone()));
                node.insert("out".to_string(), JsonValue::String(out.clone()));
            }
            [first, second] if first.starts_with('(') && first.ends_with(')') => {
                node.insert("ins".to_string(), JsonValue::String(first.clone()));
                node.insert("command".to_string(), JsonValue::String(second.clone()));
            }
            [command, out] => {
                node.insert("command".to_string(), JsonValue::String(command.clone()));
                node.insert("out".to_string(), JsonValue::String(out.clone()));
            }
            _ => {
                node.insert("command".to_string(), JsonValue::String(command));
            }
        }
    }

    if node.get("command").map(as_text).unwrap_or_default().is_empty() {
        node.insert(
            "command".to_string(),
            JsonValue::String(DEFAULT_COLLECT_COMMAND.to_string()),
        );
    }
}

/// `ins: "(a, b)"` becomes `ins: ["a", "b"]`
fn preprocess_ins(node: &mut RawNode) {
    let Some(ins) = node.remove("ins") else {
        return;
    };

    let list = match ins {
        JsonValue::String(text) => split_ins(&text),
        JsonValue::Array(items) => items.iter().map(ins_entry).collect(),
        JsonValue::Null => Vec::new(),
        other => vec![ins_entry(&other)],
    };

    node.insert(
        "ins".to_string(),
        JsonValue::Array(list.into_iter().map(JsonValue::String).collect()),
    );
}

fn split_ins(text: &str) -> Vec<String> {
    let text = text.trim();
    let text = match (text.strip_prefix('('), text.rfind(')')) {
        (Some(_), Some(close)) => format!("{}{}", &text[1..close], &text[close + 1..]),
        _ => text.to_string(),
    };
    smart_split(&text, ",")
        .iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Non-string entries are kept as quoted JSON literals
fn ins_entry(value: &JsonValue) -> String {
    match value {
        JsonValue::String(name) => name.trim().to_string(),
        other => format!("'{}'", other),
    }
}

/// `series: [...]` / `parallel: [...]`
fn preprocess_mode(node: &mut RawNode) {
    for (key, mode) in [("series", "series"), ("parallel", "parallel")] {
        if let Some(chains) = node.remove(key) {
            node.insert("mode".to_string(), JsonValue::String(mode.to_string()));
            node.insert("chains".to_string(), chains);
        }
    }
}

/// `error: <expr>` wraps the body into `[body, {if: <expr>, chains: [...]}]`
fn preprocess_error(node: &mut RawNode) {
    let has_group = node.contains_key("chains");
    if !node.contains_key("error") || !(has_group || node.contains_key("command")) {
        return;
    }
    let Some(error) = node.remove("error") else {
        return;
    };

    let mut body = Map::new();
    if has_group {
        for key in ["mode", "chains"] {
            if let Some(value) = node.remove(key) {
                body.insert(key.to_string(), value);
            }
        }
    } else {
        body.insert("mode".to_string(), JsonValue::String("series".to_string()));
        if let Some(command) = node.remove("command") {
            body.insert("command".to_string(), command);
        }
        for key in ["ins", "out"] {
            if let Some(value) = node.get(key) {
                body.insert(key.to_string(), value.clone());
            }
        }
    }

    let mut handlers = Vec::new();
    if let Some(message) = node.remove("error_message") {
        handlers.push(JsonValue::String(format!("({})-->_error_message", message)));
    }
    if let Some(actions) = node.remove("error_actions") {
        handlers.extend(into_list(actions));
    }
    handlers.push(JsonValue::String(r#"("true")-->_error"#.to_string()));

    let mut handler = Map::new();
    handler.insert("if".to_string(), error);
    handler.insert("mode".to_string(), JsonValue::String("series".to_string()));
    handler.insert("chains".to_string(), JsonValue::Array(handlers));

    node.insert("mode".to_string(), JsonValue::String("series".to_string()));
    node.insert(
        "chains".to_string(),
        JsonValue::Array(vec![JsonValue::Object(body), JsonValue::Object(handler)]),
    );
}

fn assign_defaults(node: &mut RawNode) {
    let defaults = [
        ("out", JsonValue::String(DEFAULT_OUT.to_string())),
        ("ins", JsonValue::Array(Vec::new())),
        ("mode", JsonValue::String("series".to_string())),
        ("if", JsonValue::Bool(true)),
        ("while", JsonValue::Bool(false)),
    ];
    for (key, value) in defaults {
        node.entry(key.to_string()).or_insert(value);
    }
}

/// Move the pipeline one level down under an implicit root
fn wrap_root(root: &mut RawNode) {
    let mut child = Map::new();
    if let Some(chains) = root.remove("chains") {
        child.insert("chains".to_string(), chains);
    } else if let Some(command) = root.remove("command") {
        root.insert("mode".to_string(), JsonValue::String("series".to_string()));
        child.insert("command".to_string(), command);
        for key in ["ins", "out"] {
            if let Some(value) = root.get(key) {
                child.insert(key.to_string(), value.clone());
            }
        }
    }

    for key in ["mode", "if", "while"] {
        if let Some(value) = root.get(key) {
            child.insert(key.to_string(), value.clone());
        }
        if key != "mode" {
            root.remove(key);
        }
    }

    root.insert(
        "chains".to_string(),
        JsonValue::Array(vec![JsonValue::Object(child)]),
    );
}

/* ===================== Typed Pass ===================== */

/// A node with neither `command` nor `chains` becomes an empty group
fn build_node(mut raw: RawNode) -> Result<ChainNode, ChainError> {
    let mode = raw
        .get("mode")
        .map(|m| Mode::parse(&as_text(m)))
        .unwrap_or_default();
    let condition = raw.get("if").map(as_text).unwrap_or_else(|| "true".to_string());
    let repeat = raw.get("while").map(as_text).unwrap_or_else(|| "false".to_string());
    let out = raw
        .get("out")
        .map(as_text)
        .filter(|out| !out.is_empty())
        .unwrap_or_else(|| DEFAULT_OUT.to_string());
    let ins = match raw.get("ins") {
        Some(JsonValue::Array(items)) => items.iter().map(ins_entry).collect(),
        _ => Vec::new(),
    };

    let body = match raw.remove("chains") {
        Some(chains) => {
            let children = into_list(chains)
                .into_iter()
                .map(|child| match child {
                    JsonValue::Object(map) => build_node(map),
                    other => normalize_node(other),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Body::Chains(children)
        }
        None => match raw.get("command") {
            Some(command) => Body::Command(as_text(command)),
            None => Body::Chains(Vec::new()),
        },
    };

    Ok(ChainNode {
        mode,
        condition,
        repeat,
        ins,
        out,
        body,
    })
}

/* ===================== Helpers ===================== */

/// Scalars as their source text; strings unchanged
fn as_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn into_list(value: JsonValue) -> Vec<JsonValue> {
    match value {
        JsonValue::Array(items) => items,
        JsonValue::Null => Vec::new(),
        other => vec![other],
    }
}

fn is_enabled(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        JsonValue::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
