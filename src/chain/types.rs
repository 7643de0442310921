//! Canonical chain tree produced by the normalizer

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Default variable receiving a step's result
pub const DEFAULT_OUT: &str = "_ans";

/// How the children of a node are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Series,
    Parallel,
}

impl Mode {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("parallel") {
            Mode::Parallel
        } else {
            Mode::Series
        }
    }
}

/// What a node does when it runs: a single command or a group of children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Body {
    Command(String),
    Chains(Vec<ChainNode>),
}

/// One node of the canonical tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainNode {
    pub mode: Mode,
    /// Guard expression, evaluated once before the node runs
    #[serde(rename = "if")]
    pub condition: String,
    /// Loop expression, re-evaluated after every run of the body
    #[serde(rename = "while")]
    pub repeat: String,
    pub ins: Vec<String>,
    pub out: String,
    #[serde(flatten)]
    pub body: Body,
}

impl ChainNode {
    /// Leaf node with default guards
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            mode: Mode::Series,
            condition: "true".to_string(),
            repeat: "false".to_string(),
            ins: Vec::new(),
            out: DEFAULT_OUT.to_string(),
            body: Body::Command(command.into()),
        }
    }

    pub fn as_command(&self) -> Option<&str> {
        match &self.body {
            Body::Command(command) => Some(command),
            Body::Chains(_) => None,
        }
    }

    pub fn children(&self) -> &[ChainNode] {
        match &self.body {
            Body::Chains(children) => children,
            Body::Command(_) => &[],
        }
    }
}

/// A normalized definition: the implicit root plus its global settings
///
/// `root.body` always holds exactly one child wrapping the user's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub vars: Map<String, JsonValue>,
    pub verbose: bool,
    pub root: ChainNode,
}
