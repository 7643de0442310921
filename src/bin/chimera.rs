//! Chimera command-line runner
//!
//! Runs chain definitions from files or inline text and prints the result.

use chimera_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
