//! Tests for if/while guards and series/parallel composition

use serde_json::json;

use super::helpers::{execute, execute_in};

/* ===================== If ===================== */

#[tokio::test]
async fn test_false_if_has_no_effect() {
    let result = execute(
        json!({
            "out": "touched",
            "series": [
                {"command": "() => 'yes'", "out": "touched", "if": "false"}
            ]
        }),
        vec![],
    )
    .await;

    assert!(result.success);
    assert_eq!(result.output, json!(""));
}

#[tokio::test]
async fn test_if_reads_variables() {
    let definition = json!({
        "ins": "n",
        "out": "size",
        "series": [
            {"command": "() => 'big'", "out": "size", "if": "n > 10"},
            {"command": "() => 'small'", "out": "size", "if": "n <= 10"}
        ]
    });

    assert_eq!(execute(definition.clone(), vec![json!(50)]).await.output, json!("big"));
    assert_eq!(execute(definition, vec![json!(5)]).await.output, json!("small"));
}

#[tokio::test]
async fn test_broken_condition_skips_node() {
    let result = execute(
        json!({
            "out": "r",
            "series": [
                {"command": "() => 'ran'", "out": "r", "if": "this is not valid"}
            ]
        }),
        vec![],
    )
    .await;

    assert!(result.success);
    assert_eq!(result.output, json!(""));
}

#[tokio::test]
async fn test_root_guard_moves_to_child() {
    let definition = json!({"command": "(a) => a * 2", "ins": "a", "out": "r", "if": "a > 0"});

    assert_eq!(execute(definition.clone(), vec![json!(4)]).await.output, json!(8));
    assert_eq!(execute(definition, vec![json!(-4)]).await.output, json!(""));
}

/* ===================== While ===================== */

#[tokio::test]
async fn test_while_loops_until_false() {
    let result = execute(
        json!({
            "vars": {"i": 0},
            "out": "i",
            "series": [
                {"command": "(i) => i + 1", "ins": "i", "out": "i", "while": "i < 5"}
            ]
        }),
        vec![],
    )
    .await;

    assert_eq!(result.output, json!(5));
}

#[tokio::test]
async fn test_false_while_runs_once() {
    let result = execute(
        json!({
            "vars": {"i": 10},
            "out": "i",
            "series": [
                {"command": "(i) => i + 1", "ins": "i", "out": "i", "while": "i < 5"}
            ]
        }),
        vec![],
    )
    .await;

    assert_eq!(result.output, json!(11));
}

#[tokio::test]
async fn test_if_is_checked_once_before_loop() {
    let result = execute(
        json!({
            "vars": {"i": 0},
            "out": "i",
            "series": [
                {"command": "(i) => i + 1", "ins": "i", "out": "i", "if": "i < 1", "while": "i < 4"}
            ]
        }),
        vec![],
    )
    .await;

    assert_eq!(result.output, json!(4));
}

#[tokio::test]
async fn test_while_repeats_groups() {
    let result = execute(
        json!({
            "vars": {"i": 0, "trail": ""},
            "out": "trail",
            "series": [
                {
                    "series": [
                        {"command": "(i) => i + 1", "ins": "i", "out": "i"},
                        {"command": "(t, i) => t + ',' + i", "ins": ["trail", "i"], "out": "trail"}
                    ],
                    "while": "i < 3"
                }
            ]
        }),
        vec![],
    )
    .await;

    assert!(result.success, "{}", result.error_message);
    assert_eq!(result.output, json!(",1,2,3"));
}

/* ===================== Series And Parallel ===================== */

#[tokio::test]
async fn test_parallel_then_series() {
    let result = execute(
        json!({
            "ins": "a",
            "out": "z",
            "series": [
                {
                    "parallel": [
                        {"command": "(a) => a + 1", "ins": "a", "out": "x"},
                        {"command": "(a) => a * 10", "ins": "a", "out": "y"}
                    ]
                },
                {"command": "(x, y) => x + y", "ins": ["x", "y"], "out": "z"}
            ]
        }),
        vec![json!(2)],
    )
    .await;

    assert!(result.success, "{}", result.error_message);
    assert_eq!(result.output, json!(23));
}

#[tokio::test]
async fn test_parallel_shell_commands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = execute_in(
        json!({
            "out": "both",
            "series": [
                {
                    "parallel": [
                        "sleep 0.2; echo slow -> first",
                        "echo fast -> second"
                    ]
                },
                "(first, second) --> both"
            ]
        }),
        dir.path(),
    )
    .await;

    assert!(result.success, "{}", result.error_message);
    assert_eq!(result.output, json!(["slow", "fast"]));
}

#[tokio::test]
async fn test_parallel_result_is_order_independent() {
    let definition = |delay_a: &str, delay_b: &str| {
        json!({
            "out": "sum",
            "series": [
                {
                    "parallel": [
                        format!("sleep {}; echo 1 -> a", delay_a),
                        format!("sleep {}; echo 2 -> b", delay_b)
                    ]
                },
                {"command": "(a, b) => a + b", "ins": ["a", "b"], "out": "sum"}
            ]
        })
    };

    let a_first = execute(definition("0", "0.1"), vec![]).await;
    let b_first = execute(definition("0.1", "0"), vec![]).await;

    assert_eq!(a_first.output, json!(3));
    assert_eq!(a_first, b_first);
}

#[tokio::test]
async fn test_series_order_is_preserved() {
    let result = execute(
        json!({
            "vars": {"trail": ""},
            "out": "trail",
            "series": [
                {"command": "(t) => t + 'a'", "ins": "trail", "out": "trail"},
                {"command": "(t) => t + 'b'", "ins": "trail", "out": "trail"},
                {"command": "(t) => t + 'c'", "ins": "trail", "out": "trail"}
            ]
        }),
        vec![],
    )
    .await;

    assert_eq!(result.output, json!("abc"));
}
