//! PEST-based parser for the expression language

use std::sync::Arc;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::{BinaryOp, Expr, Lambda, UnaryOp};
use crate::errors::ExpressionError;

#[derive(Parser)]
#[grammar = "expression/expression.pest"]
struct ExpressionParser;

pub type ParseResult<T> = Result<T, ExpressionError>;

/* ===================== Public API ===================== */

/// Parse a complete expression source string
pub fn parse(source: &str) -> ParseResult<Expr> {
    let mut pairs = ExpressionParser::parse(Rule::program, source)?;
    let program = pairs
        .next()
        .ok_or_else(|| ExpressionError::Parse("empty program".to_string()))?;
    let expression = first_inner(program)?;
    build_expression(expression)
}

/* ===================== AST Builder ===================== */

fn first_inner(pair: Pair<Rule>) -> ParseResult<Pair<Rule>> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| ExpressionError::Parse(format!("Empty {:?}", rule)))
}

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::expression => build_expression(first_inner(pair)?),
        Rule::lambda => build_lambda(pair),
        Rule::ternary_expr => {
            let mut inner = pair.into_inner();
            let condition = match inner.next() {
                Some(p) => build_expression(p)?,
                None => return Err(ExpressionError::Parse("Empty ternary".to_string())),
            };
            match (inner.next(), inner.next()) {
                (Some(consequent), Some(alternate)) => Ok(Expr::Ternary {
                    condition: Box::new(condition),
                    consequent: Box::new(build_expression(consequent)?),
                    alternate: Box::new(build_expression(alternate)?),
                }),
                _ => Ok(condition),
            }
        }
        Rule::or_expr
        | Rule::and_expr
        | Rule::equality_expr
        | Rule::comparison_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => build_binary_expr(pair),
        Rule::unary_expr => {
            let mut inner = pair.into_inner();
            let first = inner
                .next()
                .ok_or_else(|| ExpressionError::Parse("Empty unary expression".to_string()))?;
            if first.as_rule() != Rule::op_unary {
                return build_expression(first);
            }
            let op = match first.as_str() {
                "!" => UnaryOp::Not,
                "-" => UnaryOp::Neg,
                _ => UnaryOp::Plus,
            };
            let operand = inner
                .next()
                .ok_or_else(|| ExpressionError::Parse("Missing unary operand".to_string()))?;
            Ok(Expr::Unary {
                op,
                operand: Box::new(build_expression(operand)?),
            })
        }
        Rule::postfix_expr => build_postfix_expr(pair),
        Rule::identifier => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
        }),
        Rule::number => {
            let text = pair.as_str();
            let v = text.parse::<f64>().map_err(|e| {
                ExpressionError::Parse(format!("Failed to parse number '{}': {}", text, e))
            })?;
            Ok(Expr::LitNum { v })
        }
        Rule::string => Ok(Expr::LitStr {
            v: build_string(pair)?,
        }),
        Rule::boolean => Ok(Expr::LitBool {
            v: pair.as_str() == "true",
        }),
        Rule::null_lit | Rule::undefined_lit => Ok(Expr::LitNull),
        Rule::array_lit => Ok(Expr::LitList {
            elements: pair
                .into_inner()
                .map(build_expression)
                .collect::<ParseResult<_>>()?,
        }),
        Rule::object_lit => build_object_literal(pair),
        rule => Err(ExpressionError::Parse(format!(
            "Unexpected expression rule: {:?}",
            rule
        ))),
    }
}

fn build_binary_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let first = inner
        .next()
        .ok_or_else(|| ExpressionError::Parse("Empty binary expression".to_string()))?;
    let mut left = build_expression(first)?;

    while let Some(op_pair) = inner.next() {
        let op = BinaryOp::from_symbol(op_pair.as_str()).ok_or_else(|| {
            ExpressionError::Parse(format!("Unknown operator '{}'", op_pair.as_str()))
        })?;
        let right_pair = inner.next().ok_or_else(|| {
            ExpressionError::Parse("Missing right operand after operator".to_string())
        })?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(build_expression(right_pair)?),
        };
    }

    Ok(left)
}

fn build_postfix_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let primary = inner
        .next()
        .ok_or_else(|| ExpressionError::Parse("Empty postfix expression".to_string()))?;
    let mut expr = build_expression(primary)?;

    for suffix in inner {
        expr = match suffix.as_rule() {
            Rule::call_suffix => Expr::Call {
                callee: Box::new(expr),
                args: suffix
                    .into_inner()
                    .map(build_expression)
                    .collect::<ParseResult<_>>()?,
            },
            Rule::member_suffix => Expr::Member {
                object: Box::new(expr),
                property: first_inner(suffix)?.as_str().to_string(),
            },
            Rule::index_suffix => Expr::Index {
                object: Box::new(expr),
                index: Box::new(build_expression(first_inner(suffix)?)?),
            },
            rule => {
                return Err(ExpressionError::Parse(format!(
                    "Unexpected postfix rule: {:?}",
                    rule
                )))
            }
        };
    }

    Ok(expr)
}

fn build_lambda(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut params = Vec::new();
    let mut rest = None;
    let mut body = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::lambda_params => {
                for param in part.into_inner() {
                    match param.as_rule() {
                        Rule::identifier => params.push(param.as_str().to_string()),
                        Rule::param => {
                            let target = first_inner(param)?;
                            if target.as_rule() == Rule::rest_param {
                                rest = Some(first_inner(target)?.as_str().to_string());
                            } else {
                                params.push(target.as_str().to_string());
                            }
                        }
                        rule => {
                            return Err(ExpressionError::Parse(format!(
                                "Unexpected parameter rule: {:?}",
                                rule
                            )))
                        }
                    }
                }
            }
            Rule::lambda_body => {
                let content = first_inner(part)?;
                let expr_pair = if content.as_rule() == Rule::block_body {
                    content
                        .into_inner()
                        .find(|p| p.as_rule() == Rule::expression)
                        .ok_or_else(|| {
                            ExpressionError::Parse("Missing return expression".to_string())
                        })?
                } else {
                    content
                };
                body = Some(build_expression(expr_pair)?);
            }
            rule => {
                return Err(ExpressionError::Parse(format!(
                    "Unexpected lambda rule: {:?}",
                    rule
                )))
            }
        }
    }

    let body = body.ok_or_else(|| ExpressionError::Parse("Missing lambda body".to_string()))?;
    Ok(Expr::Lambda(Arc::new(Lambda { params, rest, body })))
}

fn build_object_literal(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut properties = Vec::new();
    for property in pair.into_inner() {
        let mut inner = property.into_inner();
        let (Some(key_pair), Some(value_pair)) = (inner.next(), inner.next()) else {
            return Err(ExpressionError::Parse("Malformed object property".to_string()));
        };
        let key = match key_pair.as_rule() {
            Rule::string => build_string(key_pair)?,
            _ => key_pair.as_str().to_string(),
        };
        properties.push((key, build_expression(value_pair)?));
    }
    Ok(Expr::LitObj { properties })
}

fn build_string(pair: Pair<Rule>) -> ParseResult<String> {
    let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
    unescape(raw)
}

/// Decode backslash escapes, including `\uXXXX` and surrogate pairs
fn unescape(raw: &str) -> ParseResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let high = read_hex4(&mut chars)?;
                let code = if (0xD800..0xDC00).contains(&high) {
                    let mut lookahead = chars.clone();
                    if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
                        let low = read_hex4(&mut lookahead)?;
                        if (0xDC00..0xE000).contains(&low) {
                            chars = lookahead;
                            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                        } else {
                            high
                        }
                    } else {
                        high
                    }
                } else {
                    high
                };
                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    Ok(out)
}

fn read_hex4(chars: &mut std::str::Chars<'_>) -> ParseResult<u32> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 {
        return Err(ExpressionError::Parse(format!(
            "Invalid unicode escape '\\u{}'",
            digits
        )));
    }
    u32::from_str_radix(&digits, 16)
        .map_err(|_| ExpressionError::Parse(format!("Invalid unicode escape '\\u{}'", digits)))
}
