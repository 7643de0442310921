//! Tree walker for a single invocation

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value as JsonValue};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::chain::split::truncate;
use crate::chain::{Body, ChainNode, Mode};
use crate::condition;
use crate::dispatch::{resolve_params, Dispatcher};
use crate::engine::display_value;
use crate::errors::{ChainError, DEFAULT_ERROR_MESSAGE};
use crate::store::VariableStore;

const LOG_LIMIT: usize = 500;

/// Live state of one chain run
pub(crate) struct Execution {
    pub(crate) store: Arc<Mutex<VariableStore>>,
    dispatcher: Dispatcher,
    verbose: bool,
}

impl Execution {
    pub(crate) fn new(store: VariableStore, dispatcher: Dispatcher, verbose: bool) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            dispatcher,
            verbose,
        }
    }

    /// Run a node's body: a leaf command or its children
    pub(crate) fn run_node<'a>(&'a self, node: &'a ChainNode) -> BoxFuture<'a, Result<(), ChainError>> {
        async move {
            match &node.body {
                Body::Command(command) => self.run_leaf(node, command).await,
                Body::Chains(children) => match node.mode {
                    Mode::Series => {
                        for child in children {
                            self.run_guarded(child).await?;
                        }
                        Ok(())
                    }
                    Mode::Parallel => {
                        try_join_all(children.iter().map(|child| self.run_guarded(child))).await?;
                        Ok(())
                    }
                },
            }
        }
        .boxed()
    }

    /// `if` is checked once; the body then repeats while `while` holds
    async fn run_guarded(&self, node: &ChainNode) -> Result<(), ChainError> {
        if !self.check(&node.condition).await {
            debug!(condition = %node.condition, "Skipping node, condition is false");
            return Ok(());
        }
        loop {
            self.run_node(node).await?;
            if !self.check(&node.repeat).await {
                return Ok(());
            }
        }
    }

    async fn check(&self, condition: &str) -> bool {
        let store = self.store.lock().await;
        condition::is_true(condition, &store)
    }

    async fn run_leaf(&self, node: &ChainNode, command: &str) -> Result<(), ChainError> {
        let params = {
            let store = self.store.lock().await;
            resolve_params(&node.ins, &store)
        };
        let description = truncate(&self.dispatcher.describe(command, &params), LOG_LIMIT);

        let started_at = Utc::now();
        let timer = Instant::now();
        self.trace(format_args!("[INFO] START PROCESS {} : {}", started_at.to_rfc3339(), description));

        let value = match self.dispatcher.dispatch(command, params).await {
            Ok(value) => value,
            Err(failure) => {
                error!("[ERROR] Failed to execute: {}", description);
                error!("[ERROR] MESSAGE : {}", failure.error);
                if let Some(value) = failure.output {
                    self.store.lock().await.set(&node.out, value);
                }
                return Err(failure.error);
            }
        };

        let mut store = self.store.lock().await;
        store.set(&node.out, value);

        if self.verbose || tracing::enabled!(tracing::Level::DEBUG) {
            let ended_at = Utc::now();
            self.trace(format_args!(
                "[INFO] END PROCESS {} : {} (elapsed {} ns)",
                ended_at.to_rfc3339(),
                description,
                timer.elapsed().as_nanos()
            ));
            self.trace(format_args!("[INFO] STATE AFTER PROCESS : {}\n{}", description, dump_state(store.vars())));
        }

        if store.error_raised() {
            let message = store
                .error_message()
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
            error!("[ERROR] ERROR CONDITION DETECTED : _error=true");
            error!("[ERROR] ERROR MESSAGE : {}", message);
            error!("[ERROR] COMMAND : {}", description);
            return Err(ChainError::Raised(message));
        }

        Ok(())
    }

    fn trace(&self, message: std::fmt::Arguments<'_>) {
        if self.verbose {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }
}

const NEST_THRESHOLD: usize = 250;

/// Indented variable listing; long objects and arrays expand one level per indent
fn dump_state(vars: &Map<String, JsonValue>) -> String {
    let mut lines = Vec::new();
    let entries = vars.iter().map(|(key, value)| (key.clone(), value)).collect();
    dump_entries(entries, "  ", &mut lines);
    lines.join("\n")
}

fn dump_entries(entries: Vec<(String, &JsonValue)>, indent: &str, lines: &mut Vec<String>) {
    for (key, value) in entries {
        let text = display_value(value);
        match value {
            JsonValue::Object(map) if text.chars().count() > NEST_THRESHOLD => {
                lines.push(format!("{}{} :", indent, key));
                let nested = format!("{}  ", indent);
                dump_entries(map.iter().map(|(k, v)| (k.clone(), v)).collect(), &nested, lines);
            }
            JsonValue::Array(items) if text.chars().count() > NEST_THRESHOLD => {
                lines.push(format!("{}{} :", indent, key));
                let nested = format!("{}  ", indent);
                let entries = items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect();
                dump_entries(entries, &nested, lines);
            }
            _ => lines.push(format!("{}{} : {}", indent, key, truncate(&text, LOG_LIMIT))),
        }
    }
}
