//! Expression evaluation
//!
//! Evaluates an AST against a scope of bindings. There are no statements and
//! no side effects: the only way to produce a value is to compute it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::values::{json_to_val, val_to_json, Builtin, Closure, Scope, Val};
use crate::errors::ExpressionError;

const MAX_CALL_DEPTH: usize = 64;

type EvalResult = Result<Val, ExpressionError>;

fn eval_error(message: impl Into<String>) -> ExpressionError {
    ExpressionError::Eval(message.into())
}

/// Evaluate an expression to a value
pub fn eval_expr(expr: &Expr, scope: &Scope) -> EvalResult {
    Evaluator { depth: 0 }.eval(expr, scope)
}

/// Invoke a callable value with the given arguments
pub fn call_value(callee: &Val, args: Vec<Val>) -> EvalResult {
    Evaluator { depth: 0 }.call(callee, args)
}

struct Evaluator {
    depth: usize,
}

impl Evaluator {
    fn eval(&mut self, expr: &Expr, scope: &Scope) -> EvalResult {
        match expr {
            Expr::LitNull => Ok(Val::Null),
            Expr::LitBool { v } => Ok(Val::Bool(*v)),
            Expr::LitNum { v } => Ok(Val::Num(*v)),
            Expr::LitStr { v } => Ok(Val::Str(v.clone())),
            Expr::LitList { elements } => Ok(Val::List(
                elements
                    .iter()
                    .map(|e| self.eval(e, scope))
                    .collect::<Result<_, _>>()?,
            )),
            Expr::LitObj { properties } => {
                let mut map = BTreeMap::new();
                for (key, value) in properties {
                    map.insert(key.clone(), self.eval(value, scope)?);
                }
                Ok(Val::Obj(map))
            }
            Expr::Ident { name } => lookup(name, scope),
            Expr::Member { object, property } => {
                let target = self.eval(object, scope)?;
                get_property(&target, property)
            }
            Expr::Index { object, index } => {
                let target = self.eval(object, scope)?;
                let key = self.eval(index, scope)?;
                get_index(&target, &key)
            }
            Expr::Call { callee, args } => {
                let function = self.eval(callee, scope)?;
                let args = args
                    .iter()
                    .map(|a| self.eval(a, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(&function, args)
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Val::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Val::Num(-value.to_number()),
                    UnaryOp::Plus => Val::Num(value.to_number()),
                })
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, scope),
            Expr::Ternary {
                condition,
                consequent,
                alternate,
            } => {
                if self.eval(condition, scope)?.is_truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Lambda(lambda) => Ok(Val::Func(Arc::new(Closure {
                lambda: Arc::clone(lambda),
                captured: scope.clone(),
            }))),
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, scope: &Scope) -> EvalResult {
        let lhs = self.eval(left, scope)?;

        match op {
            BinaryOp::And if !lhs.is_truthy() => return Ok(lhs),
            BinaryOp::And => return self.eval(right, scope),
            BinaryOp::Or if lhs.is_truthy() => return Ok(lhs),
            BinaryOp::Or => return self.eval(right, scope),
            _ => {}
        }

        let rhs = self.eval(right, scope)?;
        Ok(match op {
            BinaryOp::Add => add(&lhs, &rhs),
            BinaryOp::Sub => Val::Num(lhs.to_number() - rhs.to_number()),
            BinaryOp::Mul => Val::Num(lhs.to_number() * rhs.to_number()),
            BinaryOp::Div => Val::Num(lhs.to_number() / rhs.to_number()),
            BinaryOp::Mod => Val::Num(lhs.to_number() % rhs.to_number()),
            BinaryOp::Eq => Val::Bool(loose_eq(&lhs, &rhs)),
            BinaryOp::Ne => Val::Bool(!loose_eq(&lhs, &rhs)),
            BinaryOp::StrictEq => Val::Bool(strict_eq(&lhs, &rhs)),
            BinaryOp::StrictNe => Val::Bool(!strict_eq(&lhs, &rhs)),
            BinaryOp::Lt => Val::Bool(compare(&lhs, &rhs) == Some(Ordering::Less)),
            BinaryOp::Lte => Val::Bool(matches!(
                compare(&lhs, &rhs),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::Gt => Val::Bool(compare(&lhs, &rhs) == Some(Ordering::Greater)),
            BinaryOp::Gte => Val::Bool(matches!(
                compare(&lhs, &rhs),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOp::And | BinaryOp::Or => rhs,
        })
    }

    fn call(&mut self, callee: &Val, args: Vec<Val>) -> EvalResult {
        match callee {
            Val::Func(closure) => {
                if self.depth >= MAX_CALL_DEPTH {
                    return Err(eval_error("Maximum call depth exceeded"));
                }
                let lambda = &closure.lambda;
                let mut scope = closure.captured.clone();
                for (i, name) in lambda.params.iter().enumerate() {
                    scope.insert(name.clone(), args.get(i).cloned().unwrap_or(Val::Null));
                }
                if let Some(rest) = &lambda.rest {
                    let remaining = args.iter().skip(lambda.params.len()).cloned().collect();
                    scope.insert(rest.clone(), Val::List(remaining));
                }

                self.depth += 1;
                let result = self.eval(&lambda.body, &scope);
                self.depth -= 1;
                result
            }
            Val::Builtin(builtin) => call_builtin(*builtin, args),
            other => Err(eval_error(format!(
                "{} is not a function",
                other.type_name()
            ))),
        }
    }
}

fn lookup(name: &str, scope: &Scope) -> EvalResult {
    if let Some(value) = scope.get(name) {
        return Ok(value.clone());
    }
    match name {
        "String" => Ok(Val::Builtin(Builtin::String)),
        "Number" => Ok(Val::Builtin(Builtin::Number)),
        "Boolean" => Ok(Val::Builtin(Builtin::Boolean)),
        "JSON" => {
            let mut json = BTreeMap::new();
            json.insert("stringify".to_string(), Val::Builtin(Builtin::JsonStringify));
            json.insert("parse".to_string(), Val::Builtin(Builtin::JsonParse));
            Ok(Val::Obj(json))
        }
        "NaN" => Ok(Val::Num(f64::NAN)),
        "Infinity" => Ok(Val::Num(f64::INFINITY)),
        _ => Err(eval_error(format!("{} is not defined", name))),
    }
}

fn get_property(target: &Val, property: &str) -> EvalResult {
    match (target, property) {
        (Val::Null, _) => Err(eval_error(format!(
            "Cannot read properties of null (reading '{}')",
            property
        ))),
        (Val::List(items), "length") => Ok(Val::Num(items.len() as f64)),
        (Val::Str(s), "length") => Ok(Val::Num(s.chars().count() as f64)),
        (Val::Obj(map), _) => Ok(map.get(property).cloned().unwrap_or(Val::Null)),
        _ => Ok(Val::Null),
    }
}

fn get_index(target: &Val, key: &Val) -> EvalResult {
    match target {
        Val::Null => Err(eval_error(format!(
            "Cannot read properties of null (reading '{}')",
            key.to_js_string()
        ))),
        Val::List(items) => match as_index(key) {
            Some(i) => Ok(items.get(i).cloned().unwrap_or(Val::Null)),
            None => get_property(target, &key.to_js_string()),
        },
        Val::Str(s) => match as_index(key) {
            Some(i) => Ok(s
                .chars()
                .nth(i)
                .map(|c| Val::Str(c.to_string()))
                .unwrap_or(Val::Null)),
            None => get_property(target, &key.to_js_string()),
        },
        _ => get_property(target, &key.to_js_string()),
    }
}

fn as_index(key: &Val) -> Option<usize> {
    let n = key.to_number();
    if n >= 0.0 && n.fract() == 0.0 {
        Some(n as usize)
    } else {
        None
    }
}

fn add(lhs: &Val, rhs: &Val) -> Val {
    let numeric = |v: &Val| matches!(v, Val::Null | Val::Bool(_) | Val::Num(_));
    if numeric(lhs) && numeric(rhs) {
        Val::Num(lhs.to_number() + rhs.to_number())
    } else {
        Val::Str(format!("{}{}", lhs.to_js_string(), rhs.to_js_string()))
    }
}

fn compare(lhs: &Val, rhs: &Val) -> Option<Ordering> {
    if let (Val::Str(a), Val::Str(b)) = (lhs, rhs) {
        return Some(a.cmp(b));
    }
    lhs.to_number().partial_cmp(&rhs.to_number())
}

fn strict_eq(lhs: &Val, rhs: &Val) -> bool {
    match (lhs, rhs) {
        (Val::Null, Val::Null) => true,
        (Val::Bool(a), Val::Bool(b)) => a == b,
        (Val::Num(a), Val::Num(b)) => a == b,
        (Val::Str(a), Val::Str(b)) => a == b,
        (Val::List(a), Val::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| strict_eq(x, y))
        }
        (Val::Obj(a), Val::Obj(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).map(|w| strict_eq(v, w)).unwrap_or(false))
        }
        (Val::Func(a), Val::Func(b)) => Arc::ptr_eq(a, b),
        (Val::Builtin(a), Val::Builtin(b)) => a == b,
        _ => false,
    }
}

fn loose_eq(lhs: &Val, rhs: &Val) -> bool {
    match (lhs, rhs) {
        (Val::Null, Val::Null) => true,
        (Val::Null, _) | (_, Val::Null) => false,
        (Val::Num(_), Val::Str(_))
        | (Val::Str(_), Val::Num(_))
        | (Val::Bool(_), _)
        | (_, Val::Bool(_)) => lhs.to_number() == rhs.to_number(),
        (Val::List(_) | Val::Obj(_), Val::Num(_) | Val::Str(_)) => {
            loose_eq(&Val::Str(lhs.to_js_string()), rhs)
        }
        (Val::Num(_) | Val::Str(_), Val::List(_) | Val::Obj(_)) => {
            loose_eq(lhs, &Val::Str(rhs.to_js_string()))
        }
        _ => strict_eq(lhs, rhs),
    }
}

fn call_builtin(builtin: Builtin, args: Vec<Val>) -> EvalResult {
    let first = args.into_iter().next();
    match builtin {
        Builtin::String => Ok(Val::Str(
            first.map(|v| v.to_js_string()).unwrap_or_default(),
        )),
        Builtin::Number => Ok(Val::Num(first.map(|v| v.to_number()).unwrap_or(0.0))),
        Builtin::Boolean => Ok(Val::Bool(first.map(|v| v.is_truthy()).unwrap_or(false))),
        Builtin::JsonStringify => match first {
            None | Some(Val::Func(_)) | Some(Val::Builtin(_)) => Ok(Val::Null),
            Some(value) => serde_json::to_string(&val_to_json(&value))
                .map(Val::Str)
                .map_err(|e| eval_error(e.to_string())),
        },
        Builtin::JsonParse => {
            let text = first.map(|v| v.to_js_string()).unwrap_or_default();
            serde_json::from_str::<serde_json::Value>(&text)
                .map(|value| json_to_val(&value))
                .map_err(|e| eval_error(format!("JSON.parse: {}", e)))
        }
    }
}
