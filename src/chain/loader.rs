//! Resolving a chain argument into a raw definition
//!
//! A chain argument is either a path to a YAML/JSON file or the definition
//! itself (YAML, JSON, or a bare command string).

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::errors::ChainError;

/// A decoded definition plus where it came from
#[derive(Debug, Clone)]
pub struct ChainSource {
    pub definition: JsonValue,
    /// Working directory for shell steps and relative capability lookup
    pub cwd: PathBuf,
    pub description: String,
}

impl ChainSource {
    /// Resolve `text` as a file path first, then as an inline definition
    pub fn resolve(text: &str) -> Result<Self, ChainError> {
        let path = Path::new(text);
        if path.is_file() {
            return Self::from_file(path);
        }
        Self::inline(text)
    }

    /// Read and decode a definition file
    pub fn from_file(path: &Path) -> Result<Self, ChainError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ChainError::Load(format!("{}: {}", path.display(), e)))?;
        let definition = parse_definition(&content)?;

        let cwd = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let cwd = std::fs::canonicalize(&cwd).unwrap_or(cwd);

        Ok(Self {
            definition,
            cwd,
            description: format!("CHAIN FILE   : {}", path.display()),
        })
    }

    /// Decode `text` itself; runs in the process working directory
    pub fn inline(text: &str) -> Result<Self, ChainError> {
        Ok(Self {
            definition: parse_definition(text)?,
            cwd: current_dir(),
            description: format!("CHAIN SCRIPT : {}", text),
        })
    }

    /// Wrap an already decoded definition
    pub fn from_value(definition: JsonValue) -> Self {
        Self {
            definition,
            cwd: current_dir(),
            description: "No description available".to_string(),
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }
}

/// Decode YAML, falling back to JSON
pub fn parse_definition(text: &str) -> Result<JsonValue, ChainError> {
    match serde_yaml::from_str::<JsonValue>(text) {
        Ok(value) => Ok(value),
        Err(yaml_error) => serde_json::from_str::<JsonValue>(text).map_err(|json_error| {
            ChainError::Load(format!(
                "Not a valid YAML or JSON format\nYAML Error: {}\nJSON Error: {}",
                yaml_error, json_error
            ))
        }),
    }
}

pub(crate) fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
