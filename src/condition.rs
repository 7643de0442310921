//! Condition evaluator for `if` and `while` guards
//!
//! A condition sees only the store variables its text mentions. Anything that
//! goes wrong while evaluating it counts as false.

use tracing::error;

use crate::expression::{self, json_to_val, Scope};
use crate::store::VariableStore;

/// Evaluate `condition` against the current store
pub fn is_true(condition: &str, store: &VariableStore) -> bool {
    let scope = bind_tokens(condition, store);
    match expression::evaluate(condition, &scope) {
        Ok(value) => value.is_truthy(),
        Err(e) => {
            error!(condition = %condition, error = %e, "Condition evaluation failed, treating as false");
            false
        }
    }
}

/// Bind every mentioned token that names a top-level store variable
fn bind_tokens(condition: &str, store: &VariableStore) -> Scope {
    let mut scope = Scope::new();
    for token in tokens(condition) {
        if scope.contains_key(token) {
            continue;
        }
        if let Some(value) = store.vars().get(token) {
            scope.insert(token.to_string(), json_to_val(value));
        }
    }
    scope
}

/// Maximal runs of `[A-Za-z0-9_-]`, plus the hyphen-separated pieces of each run
fn tokens(text: &str) -> Vec<&str> {
    let mut found: Vec<&str> = Vec::new();
    let is_token_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';

    for run in text.split(|c: char| !is_token_char(c)).filter(|s| !s.is_empty()) {
        if !found.contains(&run) {
            found.push(run);
        }
        if run.contains('-') {
            for piece in run.split('-').filter(|s| !s.is_empty()) {
                if !found.contains(&piece) {
                    found.push(piece);
                }
            }
        }
    }

    found
}
