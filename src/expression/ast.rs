//! Expression AST node types

use std::sync::Arc;

/// Binary operators, including the short-circuit ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNe,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Lte,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Gte,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

/// Arrow function definition
#[derive(Debug, Clone)]
pub struct Lambda {
    pub params: Vec<String>,
    /// Name bound to the remaining arguments (`...rest`)
    pub rest: Option<String>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub enum Expr {
    LitNull,
    LitBool { v: bool },
    LitNum { v: f64 },
    LitStr { v: String },
    LitList { elements: Vec<Expr> },
    LitObj { properties: Vec<(String, Expr)> },
    Ident { name: String },
    Member { object: Box<Expr>, property: String },
    Index { object: Box<Expr>, index: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Ternary { condition: Box<Expr>, consequent: Box<Expr>, alternate: Box<Expr> },
    Lambda(Arc<Lambda>),
}
