//! Tests for `[name path]` steps

use serde_json::{json, Map, Value as JsonValue};

use std::sync::Arc;

use crate::chain::{normalize, ChainSource};
use crate::config::Config;
use crate::dispatch::{CapabilityOutput, CapabilityRegistry, Dispatcher, Export};
use crate::engine::executor::Execution;
use crate::engine::{ChainOutput, Engine};
use crate::errors::ChainError;
use crate::store::VariableStore;

fn registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register_fn("add", |args: Vec<JsonValue>| async move {
        let total: i64 = args.iter().filter_map(JsonValue::as_i64).sum();
        CapabilityOutput::ok(json!(total))
    });
    registry.register(
        "text",
        Export::namespace().with(
            "upper",
            Export::function(|args: Vec<JsonValue>| async move {
                match args.first().and_then(JsonValue::as_str) {
                    Some(s) => CapabilityOutput::ok(json!(s.to_uppercase())),
                    None => CapabilityOutput::failed("upper expects a string"),
                }
            }),
        ),
    );
    registry
}

async fn execute(definition: JsonValue, args: Vec<JsonValue>) -> ChainOutput {
    Engine::new(Config::default())
        .with_capabilities(registry())
        .execute_chain(ChainSource::from_value(definition), args, Map::new())
        .await
}

#[tokio::test]
async fn test_registered_capability() {
    let result = execute(
        json!({"command": "[add]", "ins": ["a", "b"], "out": "c"}),
        vec![json!(2), json!(3)],
    )
    .await;

    assert!(result.success, "{}", result.error_message);
    assert_eq!(result.output, json!(5));
}

#[tokio::test]
async fn test_nested_export() {
    let result = execute(
        json!({"command": "[text upper]", "ins": "s", "out": "loud"}),
        vec![json!("quiet")],
    )
    .await;

    assert_eq!(result.output, json!("QUIET"));
}

#[tokio::test]
async fn test_structured_arguments_pass_through() {
    let result = execute(
        json!({"command": "[add]", "ins": ["n", "'1'"], "out": "c"}),
        vec![json!(41)],
    )
    .await;

    assert_eq!(result.output, json!(42));
}

#[tokio::test]
async fn test_capability_failure_stops_chain() {
    let result = execute(json!({"command": "[text upper]", "ins": "s"}), vec![json!(5)]).await;

    assert!(!result.success);
    assert_eq!(result.error_message, "upper expects a string");
}

#[tokio::test]
async fn test_failed_capability_still_writes_output() {
    let mut registry = registry();
    registry.register_fn("partial", |_args: Vec<JsonValue>| async {
        CapabilityOutput {
            result: Some(json!("half done")),
            success: Some(false),
            error_message: Some("gave up".to_string()),
        }
    });
    let chain = normalize(json!({"command": "[partial]", "out": "progress"})).expect("Should normalize");
    let dispatcher = Dispatcher::new(
        std::env::current_dir().expect("cwd"),
        &Config::default(),
        Arc::new(registry),
    );
    let execution = Execution::new(VariableStore::new(), dispatcher, false);

    let result = execution.run_node(&chain.root).await;

    assert_eq!(
        result,
        Err(ChainError::Step {
            command: "[partial]".to_string(),
            message: "gave up".to_string(),
        })
    );
    assert_eq!(execution.store.lock().await.get("progress"), json!("half done"));
}

#[tokio::test]
async fn test_unresolved_capability() {
    let result = execute(json!("[missing thing]"), vec![]).await;

    assert!(!result.success);
    assert_eq!(result.error_message, "Cannot get executable function from: [missing thing]");
}

#[cfg(unix)]
#[tokio::test]
async fn test_plugin_next_to_chain() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let plugin = dir.path().join("double");
    std::fs::write(&plugin, "#!/bin/sh\nread input\necho \"$input\" | tr -d '[]' | awk '{print $1 * 2}'\n")
        .expect("write");
    std::fs::set_permissions(&plugin, std::fs::Permissions::from_mode(0o755)).expect("chmod");

    let result = Engine::new(Config::default())
        .execute_chain(
            ChainSource::from_value(json!({"command": "[double]", "ins": "n", "out": "r"})).with_cwd(dir.path()),
            vec![json!(21)],
            Map::new(),
        )
        .await;

    assert!(result.success, "{}", result.error_message);
    assert_eq!(result.output, json!(42));
}
