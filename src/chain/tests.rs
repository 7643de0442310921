//! Normalizer tests - verify shorthand rewriting and the canonical tree shape

use serde_json::json;

use super::*;
use crate::errors::ChainError;

fn only_child(chain: &Chain) -> &ChainNode {
    let children = chain.root.children();
    assert_eq!(children.len(), 1, "root must wrap exactly one child");
    &children[0]
}

/* ===================== Bare Strings And Arrows ===================== */

#[test]
fn test_bare_string_becomes_command() {
    let node = normalize_node(json!("echo hi")).expect("Should normalize");

    assert_eq!(node.as_command(), Some("echo hi"));
    assert!(node.ins.is_empty());
    assert_eq!(node.out, "_ans");
    assert_eq!(node.mode, Mode::Series);
    assert_eq!(node.condition, "true");
    assert_eq!(node.repeat, "false");
}

#[test]
fn test_three_part_arrow() {
    let node = normalize_node(json!("(a,b)->add->c")).expect("Should normalize");

    assert_eq!(node.ins, vec!["a", "b"]);
    assert_eq!(node.as_command(), Some("add"));
    assert_eq!(node.out, "c");
}

#[test]
fn test_two_part_arrow_with_parenthesized_inputs() {
    let node = normalize_node(json!("(x, y) -> python add.py")).expect("Should normalize");

    assert_eq!(node.ins, vec!["x", "y"]);
    assert_eq!(node.as_command(), Some("python add.py"));
    assert_eq!(node.out, "_ans");
}

#[test]
fn test_two_part_arrow_with_output() {
    let node = normalize_node(json!("echo hello -> greeting")).expect("Should normalize");

    assert!(node.ins.is_empty());
    assert_eq!(node.as_command(), Some("echo hello"));
    assert_eq!(node.out, "greeting");
}

#[test]
fn test_quoted_arrow_parts_are_unquoted() {
    let node = normalize_node(json!(r#"(a)->"echo x->y"->b"#)).expect("Should normalize");

    assert_eq!(node.as_command(), Some("echo x->y"));
    assert_eq!(node.out, "b");
}

#[test]
fn test_long_arrow_uses_collect_command() {
    let node = normalize_node(json!("(a, b) --> pair")).expect("Should normalize");

    assert_eq!(node.ins, vec!["a", "b"]);
    assert_eq!(node.out, "pair");
    assert_eq!(node.as_command(), Some(DEFAULT_COLLECT_COMMAND));
}

#[test]
fn test_null_becomes_collect_command() {
    let node = normalize_node(json!(null)).expect("Should normalize");
    assert_eq!(node.as_command(), Some(DEFAULT_COLLECT_COMMAND));
}

#[test]
fn test_commandless_node_is_empty_group() {
    let node = normalize_node(json!({"out": "x", "if": "x > 1"})).expect("Should normalize");

    assert_eq!(node.as_command(), None);
    assert!(node.children().is_empty());
    assert_eq!(node.out, "x");
    assert_eq!(node.condition, "x > 1");
}

#[test]
fn test_vars_only_root_has_empty_child() {
    let chain = normalize(json!({"vars": {"greeting": "hi"}, "out": "greeting"})).expect("Should normalize");

    assert_eq!(chain.root.out, "greeting");
    let child = only_child(&chain);
    assert_eq!(child.as_command(), None);
    assert!(child.children().is_empty());
}

/* ===================== Keys ===================== */

#[test]
fn test_ins_comma_string() {
    let node = normalize_node(json!({"command": "echo", "ins": "a, b"})).expect("Should normalize");
    assert_eq!(node.ins, vec!["a", "b"]);
}

#[test]
fn test_ins_keeps_nested_commas() {
    let node = normalize_node(json!({"command": "echo", "ins": "(a, '1,2', [b, c])"}))
        .expect("Should normalize");
    assert_eq!(node.ins, vec!["a", "'1,2'", "[b, c]"]);
}

#[test]
fn test_ins_non_string_entries_are_literals() {
    let node = normalize_node(json!({"command": "echo", "ins": ["a", 5]})).expect("Should normalize");
    assert_eq!(node.ins, vec!["a", "'5'"]);
}

#[test]
fn test_key_synonyms() {
    let node = normalize_node(json!({
        "process": "python add.py",
        "inputs": ["a", "b"],
        "output": "c"
    }))
    .expect("Should normalize");

    assert_eq!(node.as_command(), Some("python add.py"));
    assert_eq!(node.ins, vec!["a", "b"]);
    assert_eq!(node.out, "c");
}

#[test]
fn test_series_shorthand() {
    let node = normalize_node(json!({"series": ["echo a", "echo b"]})).expect("Should normalize");

    assert_eq!(node.mode, Mode::Series);
    let commands: Vec<_> = node.children().iter().map(|c| c.as_command()).collect();
    assert_eq!(commands, vec![Some("echo a"), Some("echo b")]);
}

#[test]
fn test_parallel_shorthand() {
    let node = normalize_node(json!({"parallel": ["echo a", {"series": ["echo b"]}]}))
        .expect("Should normalize");

    assert_eq!(node.mode, Mode::Parallel);
    assert_eq!(node.children().len(), 2);
    assert_eq!(node.children()[1].mode, Mode::Series);
    assert_eq!(node.children()[1].children()[0].as_command(), Some("echo b"));
}

#[test]
fn test_single_child_is_wrapped_in_list() {
    let node = normalize_node(json!({"series": "echo a"})).expect("Should normalize");
    assert_eq!(node.children().len(), 1);
}

#[test]
fn test_conditions_are_kept_as_text() {
    let node = normalize_node(json!({"command": "echo", "if": "a > 1", "while": true}))
        .expect("Should normalize");
    assert_eq!(node.condition, "a > 1");
    assert_eq!(node.repeat, "true");
}

/* ===================== Error Shorthand ===================== */

#[test]
fn test_error_shorthand_wraps_command() {
    let node = normalize_node(json!({
        "command": "(a)=>a",
        "ins": "a",
        "out": "b",
        "error": "b > 5",
        "error_message": "too big",
        "error_actions": ["echo cleanup"]
    }))
    .expect("Should normalize");

    assert_eq!(node.mode, Mode::Series);
    let children = node.children();
    assert_eq!(children.len(), 2);

    let body = &children[0];
    assert_eq!(body.as_command(), Some("(a)=>a"));
    assert_eq!(body.ins, vec!["a"]);
    assert_eq!(body.out, "b");

    let handler = &children[1];
    assert_eq!(handler.condition, "b > 5");
    let steps = handler.children();
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0].ins, vec![r#""too big""#]);
    assert_eq!(steps[0].out, "_error_message");
    assert_eq!(steps[1].as_command(), Some("echo cleanup"));
    assert_eq!(steps[2].ins, vec![r#""true""#]);
    assert_eq!(steps[2].out, "_error");
}

#[test]
fn test_error_shorthand_wraps_group() {
    let node = normalize_node(json!({
        "parallel": ["echo a", "echo b"],
        "error": true
    }))
    .expect("Should normalize");

    let children = node.children();
    assert_eq!(children[0].mode, Mode::Parallel);
    assert_eq!(children[0].children().len(), 2);
    assert_eq!(children[1].condition, "true");
    assert_eq!(children[1].children().len(), 1);
}

/* ===================== Root Wrapping ===================== */

#[test]
fn test_root_wraps_command() {
    let chain = normalize(json!({
        "command": "(a,b)=>a+b",
        "ins": ["a", "b"],
        "out": "c",
        "vars": {"x": 1},
        "verbose": true
    }))
    .expect("Should normalize");

    assert!(chain.verbose);
    assert_eq!(chain.vars.get("x"), Some(&json!(1)));
    assert_eq!(chain.root.ins, vec!["a", "b"]);
    assert_eq!(chain.root.out, "c");

    let child = only_child(&chain);
    assert_eq!(child.as_command(), Some("(a,b)=>a+b"));
    assert_eq!(child.ins, vec!["a", "b"]);
    assert_eq!(child.out, "c");
}

#[test]
fn test_root_moves_guards_down() {
    let chain = normalize(json!({
        "series": ["echo a"],
        "if": "x > 0",
        "while": "x < 3"
    }))
    .expect("Should normalize");

    assert_eq!(chain.root.condition, "true");
    assert_eq!(chain.root.repeat, "false");
    assert!(chain.vars.is_empty());
    assert!(!chain.verbose);

    let child = only_child(&chain);
    assert_eq!(child.condition, "x > 0");
    assert_eq!(child.repeat, "x < 3");
    assert_eq!(child.children().len(), 1);
}

#[test]
fn test_root_bare_string() {
    let chain = normalize(json!("echo hi")).expect("Should normalize");
    assert_eq!(only_child(&chain).as_command(), Some("echo hi"));
}

#[test]
fn test_rejects_wrong_shape() {
    assert!(matches!(normalize(json!(42)), Err(ChainError::Normalize(_))));
    assert!(matches!(normalize(json!(["echo hi"])), Err(ChainError::Normalize(_))));
    assert!(matches!(
        normalize(json!({"command": "echo", "vars": [1]})),
        Err(ChainError::Normalize(_))
    ));
}

#[test]
fn test_normalized_tree_serializes_canonical_keys() {
    let node = normalize_node(json!("(a)->echo->b")).expect("Should normalize");
    let value = serde_json::to_value(&node).expect("serialize");

    assert_eq!(value["command"], json!("echo"));
    assert_eq!(value["if"], json!("true"));
    assert_eq!(value["while"], json!("false"));
    assert_eq!(value["mode"], json!("series"));
}
