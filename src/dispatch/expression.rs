//! Expression runner

use serde_json::Value as JsonValue;

use crate::errors::ChainError;
use crate::expression;

/// Evaluate `command` to a function and apply it to `params`
pub fn run(command: &str, params: &[JsonValue]) -> Result<JsonValue, ChainError> {
    expression::apply(command, params).map_err(|e| ChainError::Step {
        command: command.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_applies_parameters() {
        let result = run("(a, b) => a + b", &[json!(5), json!(6)]).expect("Should run");
        assert_eq!(result, json!(11));
    }

    #[test]
    fn test_structured_parameters() {
        let result = run("(cfg) => cfg.items.length", &[json!({"items": [1, 2, 3]})])
            .expect("Should run");
        assert_eq!(result, json!(3));
    }

    #[test]
    fn test_failure_is_step_error() {
        let err = run("(a) => a.b.c", &[json!(null)]).unwrap_err();
        assert!(matches!(err, ChainError::Step { command, .. } if command == "(a) => a.b.c"));
    }
}
