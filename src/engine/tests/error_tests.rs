//! Tests for failures and the global error signal

use serde_json::json;

use super::helpers::{execute, execute_in};
use crate::errors::{ChainError, DEFAULT_ERROR_MESSAGE};

#[tokio::test]
async fn test_error_shorthand_with_message() {
    let result = execute(
        json!({
            "command": "(a) => a",
            "ins": "a",
            "out": "b",
            "error": true,
            "error_message": "boom"
        }),
        vec![json!(1)],
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.error_message, "boom");
    assert_eq!(result.output, json!(""));
}

#[tokio::test]
async fn test_error_shorthand_condition_not_met() {
    let result = execute(
        json!({
            "command": "(a) => a",
            "ins": "a",
            "out": "b",
            "error": "b > 5",
            "error_message": "too big"
        }),
        vec![json!(3)],
    )
    .await;

    assert!(result.success, "{}", result.error_message);
    assert_eq!(result.output, json!(3));
}

#[tokio::test]
async fn test_error_shorthand_condition_met() {
    let result = execute(
        json!({
            "command": "(a) => a",
            "ins": "a",
            "out": "b",
            "error": "b > 5",
            "error_message": "too big"
        }),
        vec![json!(30)],
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.error_message, "too big");
}

#[tokio::test]
async fn test_error_without_message_uses_default() {
    let result = execute(json!({"command": "(a) => a", "ins": "a", "error": true}), vec![]).await;

    assert!(!result.success);
    assert_eq!(result.error_message, DEFAULT_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_error_actions_run_before_stopping() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = execute_in(
        json!({
            "command": "echo working",
            "error": true,
            "error_message": "stopped",
            "error_actions": ["touch cleaned"]
        }),
        dir.path(),
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.error_message, "stopped");
    assert!(dir.path().join("cleaned").exists());
}

#[tokio::test]
async fn test_raised_error_stops_series() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = execute_in(
        json!({
            "series": [
                "(\"true\") --> _error",
                "touch after"
            ]
        }),
        dir.path(),
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.error_message, DEFAULT_ERROR_MESSAGE);
    assert!(!dir.path().join("after").exists());
}

#[tokio::test]
async fn test_raised_error_stops_enclosing_chains() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = execute_in(
        json!({
            "series": [
                {
                    "series": [
                        {"series": ["('nested failure') --> _error_message", "('true') --> _error"]},
                        "touch inner"
                    ]
                },
                "touch outer"
            ]
        }),
        dir.path(),
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.error_message, "nested failure");
    assert!(!dir.path().join("inner").exists());
    assert!(!dir.path().join("outer").exists());
}

#[tokio::test]
async fn test_error_in_parallel_branch_fails_run() {
    let result = execute(
        json!({
            "parallel": [
                "(a) => a",
                {"command": "exit 4", "out": "x"}
            ]
        }),
        vec![],
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.error_message, "Command exited with status 4");
}

#[tokio::test]
async fn test_shell_failure_message() {
    let result = execute(json!("echo 'no such thing' >&2; exit 1"), vec![]).await;

    assert!(!result.success);
    assert_eq!(result.error_message, "no such thing");
}

#[tokio::test]
async fn test_expression_failure_stops_chain() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = execute_in(
        json!({"series": ["() => missing_name", "touch after"]}),
        dir.path(),
    )
    .await;

    assert!(!result.success);
    assert!(result.error_message.contains("missing_name"));
    assert!(!dir.path().join("after").exists());
}

#[tokio::test]
async fn test_wrong_shape_fails_without_running() {
    let result = execute(json!(42), vec![]).await;

    assert!(!result.success);
    assert!(result.error_message.starts_with("Cannot normalize chain"));
}

#[tokio::test]
async fn test_into_result() {
    let ok = execute(json!({"command": "(a) => a", "ins": "a", "out": "a"}), vec![json!(9)]).await;
    assert_eq!(ok.into_result(), Ok(json!(9)));

    let failed = execute(json!({"command": "(a) => a", "error": true, "error_message": "nope"}), vec![]).await;
    assert_eq!(failed.into_result(), Err(ChainError::Raised("nope".to_string())));
}
