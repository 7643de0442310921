//! Test helpers for engine tests

use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::chain::ChainSource;
use crate::config::Config;
use crate::engine::{ChainOutput, Engine};

pub fn engine() -> Engine {
    Engine::new(Config::default())
}

/// Run an inline definition with positional arguments and no presets
pub async fn execute(definition: JsonValue, args: Vec<JsonValue>) -> ChainOutput {
    engine()
        .execute_chain(ChainSource::from_value(definition), args, Map::new())
        .await
}

/// Run an inline definition with `cwd` as its working directory
pub async fn execute_in(definition: JsonValue, cwd: &Path) -> ChainOutput {
    engine()
        .execute_chain(
            ChainSource::from_value(definition).with_cwd(cwd),
            Vec::new(),
            Map::new(),
        )
        .await
}
