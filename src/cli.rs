use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value as JsonValue};
use tracing_subscriber::EnvFilter;

use crate::chain::{normalize, ChainSource};
use crate::config::Config;
use crate::engine::{split_run_args, Engine};
use crate::store::coerce;

#[derive(Parser)]
#[command(name = "chimera")]
#[command(about = "Chimera - run declarative command chains", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a chain file or an inline chain definition
    Run {
        /// Chain file, directory ending in '/' followed by a file name, or inline definition
        chain: String,

        /// Positional arguments bound to the chain's ins
        args: Vec<String>,

        /// Preset variable (repeatable), e.g. --var name=world
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, JsonValue)>,

        /// Log every step at info level
        #[arg(short = 'v', long)]
        verbose: bool,
    },

    /// Print the normalized form of a chain as JSON
    Normalize {
        /// Chain file or inline chain definition
        chain: String,
    },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    let verbose = match &cli.command {
        Commands::Run { verbose: true, .. } => Some(true),
        _ => None,
    };
    let config = Config::builder()
        .config_path(cli.config)
        .verbose(verbose)
        .build()
        .context("Failed to load configuration")?;
    init_logging(&config);

    match cli.command {
        Commands::Run {
            chain, args, vars, ..
        } => {
            let mut all_args = Vec::with_capacity(args.len() + 1);
            all_args.push(chain);
            all_args.extend(args);
            let (chain, positional) = split_run_args(&all_args);
            let chain = chain.context("No chain given")?;

            let source = ChainSource::resolve(&chain)
                .with_context(|| format!("Failed to load chain {}", chain))?;
            let positional = positional.iter().cloned().map(JsonValue::String).collect();
            let presets: Map<String, JsonValue> = vars.into_iter().collect();

            let result = Engine::new(config).execute_chain(source, positional, presets).await;
            if result.success {
                println!("{}", result.display_output());
            } else {
                eprintln!("{}", result.error_message);
                std::process::exit(1);
            }
        }

        Commands::Normalize { chain } => {
            let source = ChainSource::resolve(&chain)
                .with_context(|| format!("Failed to load chain {}", chain))?;
            let normalized = normalize(source.definition)?;
            let json = serde_json::to_string_pretty(&normalized)
                .context("Failed to serialize normalized chain")?;
            println!("{}", json);
        }
    }

    Ok(())
}

/// Install the global subscriber; `RUST_LOG` wins over `logging.filter`
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn parse_var(raw: &str) -> Result<(String, JsonValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{}'", raw));
    }
    Ok((key.to_string(), coerce(JsonValue::String(value.to_string()))))
}
