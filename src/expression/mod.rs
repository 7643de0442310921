//! Restricted expression language
//!
//! Inline steps (`(a, b) => a + b`) and `if`/`while` conditions are written in
//! a small JavaScript-like subset: literals, operators, member access, calls,
//! ternaries and arrow functions. Expressions are pure; the only data they
//! see is what is bound into their [`Scope`] plus a few builtins (`String`,
//! `Number`, `Boolean`, `JSON.stringify`, `JSON.parse`).

pub mod ast;
pub mod eval;
pub mod parser;
pub mod values;


pub use eval::{call_value, eval_expr};
pub use parser::parse;
pub use values::{json_to_val, val_to_json, Scope, Val};

use crate::errors::ExpressionError;

/// Parse and evaluate `source` in one go
pub fn evaluate(source: &str, scope: &Scope) -> Result<Val, ExpressionError> {
    let expr = parse(source)?;
    eval_expr(&expr, scope)
}

/// Evaluate `source` to a function and apply it to JSON arguments
pub fn apply(
    source: &str,
    args: &[serde_json::Value],
) -> Result<serde_json::Value, ExpressionError> {
    let function = evaluate(source, &Scope::new())?;
    if !function.is_callable() {
        return Err(ExpressionError::Eval(format!(
            "{} is not a function",
            function.type_name()
        )));
    }
    let args = args.iter().map(json_to_val).collect();
    let result = call_value(&function, args)?;
    Ok(val_to_json(&result))
}
