//! Layered configuration
//!
//! Sources, lowest priority first: built-in defaults, an optional TOML file
//! (`chimera.toml`, `CHIMERA_CONFIG_PATH`, or an explicit path), then
//! `CHIMERA__SECTION__KEY` environment variables. A `.env` file is loaded
//! before the environment is read.

use std::path::PathBuf;

use config::{Environment, File, FileFormat};
use serde::Deserialize;

pub use config::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "chimera.toml";
pub const CONFIG_PATH_ENV: &str = "CHIMERA_CONFIG_PATH";
const ENV_PREFIX: &str = "CHIMERA";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runner: RunnerConfig,
    pub capabilities: CapabilityConfig,
    pub logging: LoggingConfig,
}

/// How shell steps are launched
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub shell: String,
    pub shell_flag: String,
    /// Log every step at info level even if the chain does not ask for it
    pub verbose: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            shell_flag: "-c".to_string(),
            verbose: false,
        }
    }
}

/// Where `[name ...]` commands look for executables not in the registry
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    pub plugin_paths: Vec<PathBuf>,
    pub discover_relative: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            plugin_paths: Vec::new(),
            discover_relative: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load with no overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    verbose: Option<bool>,
    load_env: Option<bool>,
}

impl ConfigBuilder {
    /// Explicit config file; it must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Override `runner.verbose` after all sources are merged
    pub fn verbose(mut self, verbose: Option<bool>) -> Self {
        self.verbose = verbose;
        self
    }

    /// Skip `.env` and environment variables (defaults to reading them)
    pub fn load_env(mut self, load_env: bool) -> Self {
        self.load_env = Some(load_env);
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let load_env = self.load_env.unwrap_or(true);
        if load_env {
            dotenvy::dotenv().ok();
        }

        let explicit = self.config_path.or_else(|| {
            load_env
                .then(|| std::env::var(CONFIG_PATH_ENV).ok())
                .flatten()
                .map(PathBuf::from)
        });

        let mut builder = config::Config::builder();
        builder = match explicit {
            Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml).required(true)),
            None => builder.add_source(
                File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
            ),
        };
        if load_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("capabilities.plugin_paths"),
            );
        }

        let mut config: Config = builder.build()?.try_deserialize()?;
        if let Some(verbose) = self.verbose {
            config.runner.verbose = verbose;
        }
        Ok(config)
    }
}
