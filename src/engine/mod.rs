//! Execution engine and invocation surface
//!
//! An [`Engine`] holds configuration and registered capabilities and can run
//! any number of chains. Each invocation gets a fresh variable store, so runs
//! never see each other's state.

mod executor;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

use crate::chain::loader::current_dir;
use crate::chain::{normalize, Chain, ChainSource};
use crate::config::Config;
use crate::dispatch::{CapabilityRegistry, Dispatcher};
use crate::errors::ChainError;
use crate::store::{VariableStore, CHAIN_CWD, INIT_CWD};

use executor::Execution;

/// Result of one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutput {
    /// Value of the root `out` variable; empty string on failure
    pub output: JsonValue,
    pub success: bool,
    pub error_message: String,
}

impl ChainOutput {
    pub fn succeeded(output: JsonValue) -> Self {
        Self {
            output,
            success: true,
            error_message: String::new(),
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            output: JsonValue::String(String::new()),
            success: false,
            error_message: error_message.into(),
        }
    }

    pub fn into_result(self) -> Result<JsonValue, ChainError> {
        if self.success {
            Ok(self.output)
        } else {
            Err(ChainError::Raised(self.error_message))
        }
    }

    /// Output as printed by the default callback
    pub fn display_output(&self) -> String {
        display_value(&self.output)
    }
}

pub struct Engine {
    config: Config,
    capabilities: Arc<CapabilityRegistry>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            capabilities: Arc::new(CapabilityRegistry::new()),
        }
    }

    pub fn with_capabilities(mut self, registry: CapabilityRegistry) -> Self {
        self.capabilities = Arc::new(registry);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a chain with positional arguments and preset variables
    ///
    /// Positional arguments bind, in order, to the root's `ins`. Presets
    /// replace same-named `vars` from the definition.
    pub async fn execute_chain(
        &self,
        source: ChainSource,
        args: Vec<JsonValue>,
        presets: Map<String, JsonValue>,
    ) -> ChainOutput {
        let span = info_span!(
            "chain_run",
            run_id = %Uuid::new_v4(),
            chain = %source.description
        );
        self.execute_inner(source, args, presets).instrument(span).await
    }

    /// [`execute_chain`](Self::execute_chain), reporting through `callback`
    pub async fn execute_chain_with<F>(
        &self,
        source: ChainSource,
        args: Vec<JsonValue>,
        presets: Map<String, JsonValue>,
        callback: F,
    ) -> ChainOutput
    where
        F: FnOnce(&JsonValue, bool, &str),
    {
        let result = self.execute_chain(source, args, presets).await;
        callback(&result.output, result.success, &result.error_message);
        result
    }

    /// Command-line style entry point
    ///
    /// The first argument names the chain (a file or an inline definition).
    /// If it ends with `/` it is a directory and the second argument is the
    /// file inside it. The rest are positional arguments. Prints the output
    /// on stdout or the error message on stderr.
    pub async fn run(&self, args: &[String]) -> ChainOutput {
        self.run_with(args, |output, success, error_message| {
            if success {
                println!("{}", display_value(output));
            } else {
                eprintln!("{}", error_message);
            }
        })
        .await
    }

    pub async fn run_with<F>(&self, args: &[String], callback: F) -> ChainOutput
    where
        F: FnOnce(&JsonValue, bool, &str),
    {
        let (chain, positional) = split_run_args(args);
        let source = match chain {
            Some(chain) => ChainSource::resolve(&chain),
            None => Err(ChainError::Load("no chain given".to_string())),
        };
        let result = match source {
            Ok(source) => {
                let positional = positional.iter().map(|a| JsonValue::String(a.clone())).collect();
                self.execute_chain(source, positional, Map::new()).await
            }
            Err(e) => {
                error!("{}", e);
                ChainOutput::failed(e.message())
            }
        };
        callback(&result.output, result.success, &result.error_message);
        result
    }

    async fn execute_inner(
        &self,
        source: ChainSource,
        args: Vec<JsonValue>,
        presets: Map<String, JsonValue>,
    ) -> ChainOutput {
        let chain = match normalize(source.definition) {
            Ok(chain) => chain,
            Err(e) => {
                error!("{}", e);
                return ChainOutput::failed(e.message());
            }
        };

        let store = prepare_store(&chain, &source.cwd, args, presets);
        let dispatcher = Dispatcher::new(source.cwd, &self.config, Arc::clone(&self.capabilities));
        let verbose = chain.verbose || self.config.runner.verbose;
        let execution = Execution::new(store, dispatcher, verbose);

        match execution.run_node(&chain.root).await {
            Ok(()) => {
                let store = execution.store.lock().await;
                let output = store
                    .lookup(&chain.root.out)
                    .cloned()
                    .unwrap_or_else(|| JsonValue::String(String::new()));
                ChainOutput::succeeded(output)
            }
            Err(e) => {
                error!("[ERROR] Chain execution failed: {}", e);
                ChainOutput::failed(e.message())
            }
        }
    }
}

/// Fresh store for one run: definition vars, presets, arguments, reserved names
fn prepare_store(
    chain: &Chain,
    cwd: &Path,
    args: Vec<JsonValue>,
    presets: Map<String, JsonValue>,
) -> VariableStore {
    let mut store = VariableStore::from_vars(chain.vars.clone());
    for (key, value) in presets {
        store.insert(key, value);
    }

    let mut args = args.into_iter();
    for key in &chain.root.ins {
        match args.next() {
            Some(value) => store.set(key, value),
            None if !store.contains(key) => store.set(key, JsonValue::from(0)),
            None => {}
        }
    }

    if !store.contains(&chain.root.out) {
        store.insert(chain.root.out.clone(), JsonValue::String(String::new()));
    }
    store.set(CHAIN_CWD, JsonValue::String(with_trailing_slash(cwd)));
    store.set(INIT_CWD, JsonValue::String(with_trailing_slash(&current_dir())));
    store
}

fn with_trailing_slash(path: &Path) -> String {
    let text = path.display().to_string();
    if text.ends_with('/') {
        text
    } else {
        format!("{}/", text)
    }
}

pub(crate) fn split_run_args(args: &[String]) -> (Option<String>, &[String]) {
    match args {
        [dir, file, rest @ ..] if dir.ends_with('/') => (Some(format!("{}{}", dir, file)), rest),
        [chain, rest @ ..] => (Some(chain.clone()), rest),
        [] => (None, args),
    }
}

/// Strings print as-is; everything else as JSON
pub fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
