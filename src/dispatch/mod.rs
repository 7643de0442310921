//! Step dispatcher
//!
//! Turns a leaf node into a runner call. The command's shape picks the
//! runner: `[name path]` is a capability, anything containing `=>` is an
//! inline expression, and everything else goes to the shell.

pub mod capability;
pub mod expression;
pub mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::chain::split::{is_quoted, quote};
use crate::config::{CapabilityConfig, Config, RunnerConfig};
use crate::errors::{ChainError, DEFAULT_ERROR_MESSAGE};
use crate::store::VariableStore;

pub use capability::{
    Capability, CapabilityOutput, CapabilityRef, CapabilityRegistry, Export, ProcessCapability,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Capability,
    Expression,
    Shell,
}

impl StepKind {
    pub fn classify(command: &str) -> Self {
        if command.starts_with('[') && command.ends_with(']') && command.len() >= 2 {
            StepKind::Capability
        } else if command.contains("=>") {
            StepKind::Expression
        } else {
            StepKind::Shell
        }
    }
}

/// Fetch the current value of every input token
pub fn resolve_params(ins: &[String], store: &VariableStore) -> Vec<JsonValue> {
    ins.iter().map(|token| store.get_literal(token)).collect()
}

/// Textual form of a parameter as a runner of `kind` sees it
///
/// Shell arguments are JSON text wrapped in double quotes unless the JSON is
/// already a quoted string. Expression arguments are plain JSON text.
pub fn render_param(kind: StepKind, value: &JsonValue) -> String {
    let text = value.to_string();
    match kind {
        StepKind::Shell if !is_quoted(&text) => quote(&text),
        _ => text,
    }
}

/// A failed step, plus the value its runner still produced for `out`
#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    pub error: ChainError,
    pub output: Option<JsonValue>,
}

impl From<ChainError> for StepFailure {
    fn from(error: ChainError) -> Self {
        Self { error, output: None }
    }
}

/// Runs leaf commands for one chain invocation
#[derive(Clone)]
pub struct Dispatcher {
    cwd: PathBuf,
    runner: RunnerConfig,
    discovery: CapabilityConfig,
    capabilities: Arc<CapabilityRegistry>,
}

impl Dispatcher {
    pub fn new(cwd: PathBuf, config: &Config, capabilities: Arc<CapabilityRegistry>) -> Self {
        Self {
            cwd,
            runner: config.runner.clone(),
            discovery: config.capabilities.clone(),
            capabilities,
        }
    }

    pub fn cwd(&self) -> &std::path::Path {
        &self.cwd
    }

    /// The command line as it will be executed, for logs
    pub fn describe(&self, command: &str, params: &[JsonValue]) -> String {
        match StepKind::classify(command) {
            StepKind::Capability => format!(
                "{} {}",
                command,
                JsonValue::Array(params.to_vec())
            ),
            StepKind::Expression => format!("({})({})", command, render_all(StepKind::Expression, params, ", ")),
            StepKind::Shell => shell_script(command, params),
        }
    }

    /// Run `command` with `params`, returning the value to store in `out`
    pub async fn dispatch(&self, command: &str, params: Vec<JsonValue>) -> Result<JsonValue, StepFailure> {
        match StepKind::classify(command) {
            StepKind::Capability => self.run_capability(command, params).await,
            StepKind::Expression => Ok(expression::run(command, &params)?),
            StepKind::Shell => {
                let script = shell_script(command, &params);
                Ok(shell::run(&self.runner, &self.cwd, &script).await?)
            }
        }
    }

    /// A failing capability still hands back its result
    async fn run_capability(&self, command: &str, params: Vec<JsonValue>) -> Result<JsonValue, StepFailure> {
        let capability = self
            .capabilities
            .resolve(command, &self.cwd, &self.discovery)?;
        let output = capability.call(params).await;

        if output.success() {
            return Ok(output.result());
        }
        let message = output
            .error_message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
        Err(StepFailure {
            error: ChainError::Step {
                command: command.to_string(),
                message,
            },
            output: Some(output.result()),
        })
    }
}

fn render_all(kind: StepKind, params: &[JsonValue], separator: &str) -> String {
    params
        .iter()
        .map(|p| render_param(kind, p))
        .collect::<Vec<_>>()
        .join(separator)
}

fn shell_script(command: &str, params: &[JsonValue]) -> String {
    if params.is_empty() {
        return command.to_string();
    }
    format!("{} {}", command, render_all(StepKind::Shell, params, " "))
}
